//! Orchestrator message envelopes.
//!
//! Outbound frames are `{workerID, msgType, workerType, message}`. Inbound
//! frames are classified into [`InboundMessage`] by `msgType`, falling back
//! to `type` when `msgType` is absent.

use crate::account::Account;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

pub const WORKER_TYPE: &str = "LWEXT";

pub const MSG_REGISTER: &str = "REGISTER";
pub const MSG_HEARTBEAT: &str = "HEARTBEAT";
pub const MSG_JOB: &str = "JOB";
pub const MSG_JOB_ASSIGNED: &str = "JOB_ASSIGNED";
pub const MSG_RESPONSE: &str = "RESPONSE";

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    #[serde(rename = "workerID")]
    pub worker_id: String,
    #[serde(rename = "msgType")]
    pub msg_type: &'static str,
    #[serde(rename = "workerType")]
    pub worker_type: &'static str,
    pub message: T,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerInfo {
    pub host: String,
    pub identity: String,
    pub owner_address: String,
    #[serde(rename = "type")]
    pub worker_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RegisterBody {
    pub id: String,
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub worker: WorkerInfo,
}

/// Synthetic capacity advertised with every heartbeat.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Capacity {
    pub available_memory: f64,
    pub available_storage: String,
    #[serde(rename = "AvailableGPU")]
    pub available_gpu: String,
    pub available_models: Vec<String>,
}

impl Default for Capacity {
    fn default() -> Self {
        Self {
            available_memory: 32.0,
            available_storage: "500.00".to_string(),
            available_gpu: String::new(),
            available_models: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HeartbeatBody {
    pub worker: WorkerInfo,
    pub capacity: Capacity,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobAssignedBody {
    pub status: bool,
    #[serde(rename = "Ref")]
    pub reference: Value,
}

/// Builds outbound envelopes for one account.
#[derive(Debug, Clone)]
pub struct EnvelopeFactory {
    worker_id: String,
    worker: WorkerInfo,
}

impl EnvelopeFactory {
    pub fn new(account: &Account, host: &str) -> Self {
        let worker_id = account.identity().as_str().to_string();
        Self {
            worker: WorkerInfo {
                host: host.to_string(),
                identity: worker_id.clone(),
                owner_address: account.id().to_string(),
                worker_type: WORKER_TYPE,
            },
            worker_id,
        }
    }

    fn wrap<T>(&self, msg_type: &'static str, message: T) -> Envelope<T> {
        Envelope {
            worker_id: self.worker_id.clone(),
            msg_type,
            worker_type: WORKER_TYPE,
            message,
        }
    }

    pub fn register(&self) -> Envelope<RegisterBody> {
        self.wrap(
            MSG_REGISTER,
            RegisterBody {
                id: uuid::Uuid::new_v4().to_string(),
                msg_type: MSG_REGISTER,
                worker: self.worker.clone(),
            },
        )
    }

    pub fn heartbeat(&self) -> Envelope<HeartbeatBody> {
        self.wrap(
            MSG_HEARTBEAT,
            HeartbeatBody {
                worker: self.worker.clone(),
                capacity: Capacity::default(),
            },
        )
    }

    pub fn job_assigned(&self, reference: Value) -> Envelope<JobAssignedBody> {
        self.wrap(
            MSG_JOB_ASSIGNED,
            JobAssignedBody {
                status: true,
                reference,
            },
        )
    }
}

#[derive(Debug, Default, Deserialize)]
struct StatusBody {
    #[serde(rename = "Status", default)]
    status: bool,
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    RegisterAck,
    HeartbeatAck { acknowledged: bool },
    /// `reference` is the job's `UUID` field, `null` when absent
    Job { reference: Value },
    Response,
    Unknown(String),
    /// JSON without `msgType` or `type`; ignored
    Untyped,
}

impl InboundMessage {
    pub fn from_value(value: Value) -> Self {
        let kind = value
            .get("msgType")
            .and_then(Value::as_str)
            .or_else(|| value.get("type").and_then(Value::as_str));

        let Some(kind) = kind else {
            return InboundMessage::Untyped;
        };

        match kind {
            MSG_REGISTER => InboundMessage::RegisterAck,
            MSG_HEARTBEAT => {
                let body: StatusBody = value
                    .get("message")
                    .and_then(|m| serde_json::from_value(m.clone()).ok())
                    .unwrap_or_default();
                InboundMessage::HeartbeatAck {
                    acknowledged: body.status,
                }
            }
            MSG_JOB => InboundMessage::Job {
                reference: value.get("UUID").cloned().unwrap_or(Value::Null),
            },
            MSG_RESPONSE => InboundMessage::Response,
            other => InboundMessage::Unknown(other.to_string()),
        }
    }
}

impl FromStr for InboundMessage {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str::<Value>(s).map(InboundMessage::from_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn factory() -> EnvelopeFactory {
        EnvelopeFactory::new(
            &Account::new("0xABCDEF1234567890"),
            "chrome-extension://ekbbplmjjgoobhdlffmgeokalelnmjjc",
        )
    }

    #[test]
    fn test_register_envelope_shape() {
        let value = serde_json::to_value(factory().register()).expect("serializes");
        assert_eq!(value["workerID"], "MHhBQkNERUYxMjM0NTY3ODkw");
        assert_eq!(value["msgType"], "REGISTER");
        assert_eq!(value["workerType"], "LWEXT");
        assert_eq!(value["message"]["type"], "REGISTER");
        assert_eq!(value["message"]["worker"]["ownerAddress"], "0xABCDEF1234567890");
        assert_eq!(value["message"]["worker"]["type"], "LWEXT");
        assert_eq!(value["message"]["id"].as_str().map(str::len), Some(36));
    }

    #[test]
    fn test_heartbeat_capacity() {
        let value = serde_json::to_value(factory().heartbeat()).expect("serializes");
        assert_eq!(
            value["message"]["Capacity"],
            json!({
                "AvailableMemory": 32.0,
                "AvailableStorage": "500.00",
                "AvailableGPU": "",
                "AvailableModels": []
            })
        );
        assert_eq!(
            value["message"]["Worker"]["identity"],
            "MHhBQkNERUYxMjM0NTY3ODkw"
        );
    }

    #[test]
    fn test_job_reply_carries_reference() {
        let value = serde_json::to_value(factory().job_assigned(json!("job-1"))).expect("serializes");
        assert_eq!(value["msgType"], "JOB_ASSIGNED");
        assert_eq!(value["message"], json!({"Status": true, "Ref": "job-1"}));
    }

    #[test]
    fn test_inbound_classification() {
        let parse = |s: &str| s.parse::<InboundMessage>().expect("json");

        assert_eq!(parse(r#"{"msgType":"REGISTER"}"#), InboundMessage::RegisterAck);
        assert_eq!(
            parse(r#"{"msgType":"HEARTBEAT","message":{"Status":true}}"#),
            InboundMessage::HeartbeatAck { acknowledged: true }
        );
        assert_eq!(
            parse(r#"{"type":"HEARTBEAT"}"#),
            InboundMessage::HeartbeatAck {
                acknowledged: false
            }
        );
        assert_eq!(
            parse(r#"{"msgType":"JOB","UUID":"abc"}"#),
            InboundMessage::Job {
                reference: json!("abc")
            }
        );
        assert_eq!(parse(r#"{"msgType":"RESPONSE"}"#), InboundMessage::Response);
        assert_eq!(
            parse(r#"{"msgType":"PING_X"}"#),
            InboundMessage::Unknown("PING_X".to_string())
        );
        assert_eq!(parse(r#"{"data":1}"#), InboundMessage::Untyped);
        assert!("not json".parse::<InboundMessage>().is_err());
    }
}
