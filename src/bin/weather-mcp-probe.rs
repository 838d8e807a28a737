//! Smoke-test client: lists the server's tools and calls `ping` when present.
//!
//! Usage: `weather-mcp-probe [URL]` (default `http://localhost:8000/mcp`).

use reqwest::Client;
use serde_json::{json, Value};

const DEFAULT_URL: &str = "http://localhost:8000/mcp";

async fn rpc(
    client: &Client,
    url: &str,
    id: u64,
    method: &str,
    params: Value,
) -> Result<Value, Box<dyn std::error::Error>> {
    let response: Value = client
        .post(url)
        .json(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    if let Some(error) = response.get("error") {
        return Err(format!("{method} failed: {error}").into());
    }

    Ok(response.get("result").cloned().unwrap_or(Value::Null))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string());
    let client = Client::new();

    rpc(
        &client,
        &url,
        1,
        "initialize",
        json!({
            "protocolVersion": "2025-06-18",
            "clientInfo": { "name": "weather-mcp-probe", "version": env!("CARGO_PKG_VERSION") },
            "capabilities": {}
        }),
    )
    .await?;

    let tools = rpc(&client, &url, 2, "tools/list", json!({})).await?;
    let names: Vec<&str> = tools["tools"]
        .as_array()
        .map(|tools| tools.iter().filter_map(|tool| tool["name"].as_str()).collect())
        .unwrap_or_default();
    println!("TOOLS: {names:?}");

    if names.contains(&"ping") {
        let result = rpc(
            &client,
            &url,
            3,
            "tools/call",
            json!({ "name": "ping", "arguments": {} }),
        )
        .await?;
        println!("PING RESULT: {result}");
    }

    Ok(())
}
