use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where the proxy list for a run comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProxySource {
    /// Download a public list, persist it to `path`, then load it.
    Auto { url: String, path: String },
    /// Newline-delimited file maintained by the operator.
    Manual { path: String },
    /// Direct connections only.
    Disabled,
}

impl ProxySource {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, ProxySource::Disabled)
    }
}

/// The proxy mode chosen on the command line or at the startup prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    Auto,
    Manual,
    None,
}

impl ProxyMode {
    pub const ALL: [ProxyMode; 3] = [ProxyMode::Auto, ProxyMode::Manual, ProxyMode::None];

    pub fn label(&self) -> &'static str {
        match self {
            ProxyMode::Auto => "Run With Auto Proxy",
            ProxyMode::Manual => "Run With Manual Proxy",
            ProxyMode::None => "Run Without Proxy",
        }
    }
}

impl fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProxyMode::Auto => "auto",
            ProxyMode::Manual => "manual",
            ProxyMode::None => "none",
        };
        f.write_str(name)
    }
}

impl FromStr for ProxyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "1" => Ok(ProxyMode::Auto),
            "manual" | "2" => Ok(ProxyMode::Manual),
            "none" | "direct" | "3" => Ok(ProxyMode::None),
            other => Err(format!(
                "unknown proxy mode '{}', expected auto, manual or none",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_mode_parsing() {
        assert_eq!("auto".parse::<ProxyMode>().unwrap(), ProxyMode::Auto);
        assert_eq!("MANUAL".parse::<ProxyMode>().unwrap(), ProxyMode::Manual);
        assert_eq!("3".parse::<ProxyMode>().unwrap(), ProxyMode::None);
        assert!("socks".parse::<ProxyMode>().is_err());
    }

    #[test]
    fn test_disabled_source() {
        assert!(!ProxySource::Disabled.is_enabled());
        assert!(ProxySource::Manual {
            path: "manual_proxy.txt".to_string()
        }
        .is_enabled());
    }
}
