//! Local stand-ins for the HTTP APIs and RPC nodes, used by tests

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{SolCall, SolValue};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::onchain::abi::{IMulticall3, MULTICALL3};

type Handler = Arc<dyn Fn(&str, &[u8]) -> Option<String> + Send + Sync>;

// ============================================
// HTTP
// ============================================

/// Serve `handler(path, body)` on an ephemeral port; `None` answers 404.
/// Returns the base URL.
pub async fn serve_http<F>(handler: F) -> String
where
    F: Fn(&str, &[u8]) -> Option<String> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let handler: Handler = Arc::new(handler);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(respond(stream, handler.clone()));
        }
    });
    url
}

async fn respond(mut stream: TcpStream, handler: Handler) {
    let Some((path, body)) = read_request(&mut stream).await else {
        return;
    };
    let (status, body) = match handler(&path, &body) {
        Some(body) => ("200 OK", body),
        None => ("404 Not Found", String::new()),
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await.ok();
    stream.shutdown().await.ok();
}

/// Request path and body
async fn read_request(stream: &mut TcpStream) -> Option<(String, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let path = head.split_whitespace().nth(1)?.to_string();
    let length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Some((path, buf[header_end..header_end + length].to_vec()))
}

// ============================================
// JSON-RPC
// ============================================

/// Node answering `eth_call` through `answer(target, calldata)`.
/// Multicall3 batches are unpacked; one unanswered call reverts the request.
pub async fn serve_rpc<F>(answer: F) -> String
where
    F: Fn(Address, &[u8]) -> Option<Vec<u8>> + Send + Sync + 'static,
{
    serve_http(move |_, body| {
        let request: Value = serde_json::from_slice(body).ok()?;
        let id = request["id"].clone();

        let reply = match request["method"].as_str() {
            Some("eth_call") => match eth_call(&request["params"][0], &answer) {
                Some(output) => json!({ "jsonrpc": "2.0", "id": id, "result": output }),
                None => json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": 3, "message": "execution reverted" }
                }),
            },
            _ => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": "method not found" }
            }),
        };
        Some(reply.to_string())
    })
    .await
}

fn eth_call<F>(tx: &Value, answer: &F) -> Option<Bytes>
where
    F: Fn(Address, &[u8]) -> Option<Vec<u8>>,
{
    let to: Address = tx["to"].as_str()?.parse().ok()?;
    let input: Bytes = tx
        .get("input")
        .or_else(|| tx.get("data"))?
        .as_str()?
        .parse()
        .ok()?;

    if to != MULTICALL3 {
        return answer(to, &input).map(Bytes::from);
    }

    let batch = <IMulticall3::aggregate3Call as SolCall>::abi_decode(&input).ok()?;
    let results = batch
        .calls
        .iter()
        .map(|call| {
            answer(call.target, &call.callData).map(|data| IMulticall3::Result {
                success: true,
                returnData: data.into(),
            })
        })
        .collect::<Option<Vec<_>>>()?;
    Some(results.abi_encode().into())
}
