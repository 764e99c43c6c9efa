#![allow(dead_code)]

use core_logic::LinearBackoff;
use openledger_bot::tasks::{ErrorEvent, ErrorSink, TaskContext};
use openledger_bot::{Account, ApiClient, TokenCell, TokenManager};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const ACCOUNT: &str = "0xABCDEF1234567890";

pub fn account() -> Account {
    Account::new(ACCOUNT)
}

pub fn token_manager(base: &str, attempts: u32) -> TokenManager {
    TokenManager::new(
        reqwest::Client::new(),
        account(),
        format!("{}/api/v1/auth/generate_token", base),
        "https://testnet.openledger.xyz".to_string(),
        "test-agent".to_string(),
    )
    .with_policy(
        LinearBackoff::new(attempts, Duration::from_millis(10)),
        Duration::from_secs(5),
    )
}

pub fn client_for(base: &str, token: &str) -> ApiClient {
    ApiClient::new(
        reqwest::Client::new(),
        base,
        token_manager(base, 2),
        TokenCell::new(token.to_string()),
    )
}

pub fn context(client: ApiClient) -> (TaskContext, mpsc::Receiver<ErrorEvent>) {
    let (tx, rx) = mpsc::channel(4);
    let account = account();
    let ctx = TaskContext {
        errors: ErrorSink::new(&account, tx),
        account,
        client: Arc::new(client),
        cancel: CancellationToken::new(),
        error_penalty: Duration::from_secs(60),
    };
    (ctx, rx)
}

/// Minimal HTTP/1.1 responder that answers each connection with the next
/// scripted `(status, body)`; the last entry repeats. Returns the base URL and
/// a hit counter.
pub async fn scripted_http(script: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let index = counter.fetch_add(1, Ordering::SeqCst);
            let (status, body) = script[index.min(script.len() - 1)];
            if read_request(&mut stream).await.is_err() {
                continue;
            }
            let response = format!(
                "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (format!("http://{}", addr), hits)
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..pos]).to_ascii_lowercase();
            let body_len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= pos + 4 + body_len {
                return Ok(());
            }
        }
    }
}
