//! The central Model Context Protocol engine
//!
//! Decodes JSON-RPC messages, negotiates `initialize`, and routes `tools/*`
//! calls into the weather tool registry.

use rust_mcp_sdk::schema::{
    CallToolRequest, Implementation, InitializeRequest, InitializeResult, JsonrpcMessage,
    JsonrpcRequest, ListToolsRequest, ListToolsResult, PingRequest, ServerCapabilities,
    ServerCapabilitiesTools,
};
use serde_json::{json, Value};
use tracing::info;

use crate::domain::tools::{build_tools_list, handle_tools_call};
use crate::mcp::rpc::{
    app_error_to_json_rpc, is_json_rpc_error, json_rpc_error, json_rpc_result, request_id_to_value,
};
use crate::{errors::AppError, AppState};

/// Oldest first; the last entry is offered when a client asks for anything else.
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2024-11-05", "2025-03-26", "2025-06-18"];

pub async fn handle_json_rpc_value(state: &AppState, payload: Value) -> Option<Value> {
    if !payload.is_object() {
        return Some(json_rpc_error(None, -32600, "Invalid Request"));
    }

    let request_id = payload.get("id").cloned();
    let parsed: JsonrpcMessage = match serde_json::from_value(payload) {
        Ok(message) => message,
        Err(_) => return Some(json_rpc_error(request_id, -32600, "Invalid Request")),
    };

    match parsed {
        JsonrpcMessage::Request(request) => {
            if let Err(error_response) = validate_request_shape(&request) {
                return Some(error_response);
            }

            let request_id = request_id_to_value(request.id);
            if request.method.trim().is_empty() {
                return Some(json_rpc_error(Some(request_id), -32600, "Invalid Request"));
            }

            Some(
                handle_json_rpc_request(
                    state,
                    Some(request_id),
                    request.method,
                    request.params.map(Value::Object),
                )
                .await,
            )
        }
        JsonrpcMessage::Notification(notification) => {
            if notification.method.trim().is_empty() {
                return None;
            }

            let _ = handle_json_rpc_request(
                state,
                None,
                notification.method,
                notification.params.map(Value::Object),
            )
            .await;
            None
        }
        JsonrpcMessage::ResultResponse(_) | JsonrpcMessage::ErrorResponse(_) => {
            Some(json_rpc_error(request_id, -32600, "Invalid Request"))
        }
    }
}

pub fn validate_request_shape(request: &JsonrpcRequest) -> Result<(), Value> {
    let payload = serde_json::to_value(request).expect("jsonrpc request serialization");
    let request_id = Some(request_id_to_value(request.id.clone()));

    let valid = match request.method.as_str() {
        "tools/call" => serde_json::from_value::<CallToolRequest>(payload).is_ok(),
        "tools/list" => serde_json::from_value::<ListToolsRequest>(payload).is_ok(),
        "ping" => serde_json::from_value::<PingRequest>(payload).is_ok(),
        "initialize" => serde_json::from_value::<InitializeRequest>(payload).is_ok(),
        _ => true,
    };

    if valid {
        Ok(())
    } else {
        Err(json_rpc_error(request_id, -32602, "Invalid params"))
    }
}

pub async fn handle_json_rpc_request(
    state: &AppState,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
) -> Value {
    let tool_name = tool_name_of(params.as_ref());

    let response = match method.as_str() {
        "initialize" => {
            let protocol_version = match negotiate_protocol_version(params.as_ref()) {
                Ok(version) => version,
                Err(err) => return app_error_to_json_rpc(id, err),
            };

            let initialize_result = InitializeResult {
                server_info: Implementation {
                    name: env!("CARGO_PKG_NAME").to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    title: None,
                    description: None,
                    icons: vec![],
                    website_url: None,
                },
                capabilities: ServerCapabilities {
                    tools: Some(ServerCapabilitiesTools {
                        list_changed: Some(false),
                    }),
                    resources: None,
                    prompts: None,
                    ..Default::default()
                },
                protocol_version: protocol_version.to_string(),
                instructions: None,
                meta: None,
            };

            json_rpc_result(
                id,
                serde_json::to_value(initialize_result).expect("initialize result serialization"),
            )
        }
        "ping" => json_rpc_result(id, json!({})),
        "tools/list" => json_rpc_result(
            id,
            serde_json::to_value(ListToolsResult {
                meta: None,
                next_cursor: None,
                tools: build_tools_list(),
            })
            .expect("tools list result serialization"),
        ),
        "tools/call" => handle_tools_call(state, id, params).await,
        _ => json_rpc_error(id, -32601, "Method not found"),
    };

    info!(
        method = %method,
        tool = tool_name.as_deref().unwrap_or("-"),
        outcome = outcome_of(&response),
        "mcp action audited"
    );

    response
}

pub fn negotiate_protocol_version(params: Option<&Value>) -> Result<&'static str, AppError> {
    let offered_version = params
        .and_then(Value::as_object)
        .and_then(|object| object.get("protocolVersion"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|version| !version.is_empty())
        .ok_or_else(|| {
            AppError::bad_request(
                "invalid_protocol_version",
                "initialize params.protocolVersion is required",
            )
        })?;

    let latest = SUPPORTED_PROTOCOL_VERSIONS[SUPPORTED_PROTOCOL_VERSIONS.len() - 1];
    Ok(SUPPORTED_PROTOCOL_VERSIONS
        .into_iter()
        .find(|version| *version == offered_version)
        .unwrap_or(latest))
}

/// `tool_error` marks a call that ran but reported `isError`, e.g. an upstream failure.
fn outcome_of(response: &Value) -> &'static str {
    if is_json_rpc_error(response) {
        "failure"
    } else if response["result"]["isError"] == Value::Bool(true) {
        "tool_error"
    } else {
        "success"
    }
}

fn tool_name_of(params: Option<&Value>) -> Option<String> {
    params
        .and_then(|params| params.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{negotiate_protocol_version, outcome_of, tool_name_of, SUPPORTED_PROTOCOL_VERSIONS};
    use serde_json::json;

    #[test]
    fn negotiate_protocol_version_echoes_supported_version() {
        for offered in SUPPORTED_PROTOCOL_VERSIONS {
            let params = json!({ "protocolVersion": offered });
            let version = negotiate_protocol_version(Some(&params)).expect("supported version");
            assert_eq!(version, offered);
        }
    }

    #[test]
    fn negotiate_protocol_version_falls_back_to_latest() {
        let params = json!({
            "protocolVersion": "2099-01-01"
        });

        let version = negotiate_protocol_version(Some(&params)).expect("fallback version");
        assert_eq!(version, "2025-06-18");
    }

    #[test]
    fn negotiate_protocol_version_requires_version() {
        let error = negotiate_protocol_version(Some(&json!({}))).expect_err("missing version");
        assert!(error.to_string().contains("bad request"));
    }

    #[test]
    fn tool_name_is_read_from_call_params() {
        let params = json!({"name": "get_weather", "arguments": {"city": "Boston"}});
        assert_eq!(tool_name_of(Some(&params)).as_deref(), Some("get_weather"));
        assert_eq!(tool_name_of(None), None);
    }

    #[test]
    fn outcome_distinguishes_tool_errors() {
        assert_eq!(outcome_of(&json!({"error": {"code": -32601}})), "failure");
        assert_eq!(outcome_of(&json!({"result": {"isError": true}})), "tool_error");
        assert_eq!(outcome_of(&json!({"result": {"content": []}})), "success");
    }
}
