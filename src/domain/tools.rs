//! Weather tools exposed via Model Context Protocol
//!
//! `get_weather` and `health` pass upstream JSON straight through, `ping`
//! answers locally, and `search`/`fetch` wrap the same weather lookup in the
//! connector document shape (a JSON string inside one text block).

use rust_mcp_sdk::{
    macros,
    schema::{CallToolRequestParams, CallToolResult, ContentBlock, TextContent, Tool},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::mcp::rpc::{
    app_error_to_json_rpc, json_rpc_error, json_rpc_error_with_data, json_rpc_result,
};
use crate::upstream::{UpstreamRequest, WeatherUpstream};
use crate::{errors::AppError, AppState};

pub const DEFAULT_UNITS: &str = "imperial";
pub const WEATHER_PATH: &str = "/api/weather";
pub const HEALTH_PATH: &str = "/health";
pub const NO_CITY_TEXT: &str = "No city provided.";

#[macros::mcp_tool(
    name = "get_weather",
    description = "Get current weather for a city from the upstream weather API"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetWeatherTool {
    /// City name, e.g. "Boston" or "Jerusalem"
    pub city: String,
    /// "imperial" or "metric"; defaults to "imperial"
    pub units: Option<String>,
}

#[macros::mcp_tool(name = "health", description = "Check the upstream weather API health endpoint")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct HealthTool {}

#[macros::mcp_tool(name = "ping", description = "Liveness check that never calls upstream")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct PingTool {}

#[macros::mcp_tool(
    name = "search",
    description = "Search for weather documents; the query is treated as a city name"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct SearchTool {
    /// City name to look up
    pub query: String,
}

#[macros::mcp_tool(
    name = "fetch",
    description = "Fetch the weather document for a city returned by search"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct FetchTool {
    /// Document id from search, i.e. the city name
    pub id: String,
}

pub fn build_tools_list() -> Vec<Tool> {
    vec![
        GetWeatherTool::tool(),
        HealthTool::tool(),
        PingTool::tool(),
        SearchTool::tool(),
        FetchTool::tool(),
    ]
}

pub fn weather_request(city: &str, units: &str) -> UpstreamRequest {
    UpstreamRequest::new(WEATHER_PATH)
        .with_query("city", city)
        .with_query("units", units)
}

/// Human-facing link for a city. The city is inserted verbatim.
pub fn weather_url(api_base: &str, city: &str) -> String {
    format!("{api_base}{WEATHER_PATH}?city={city}")
}

pub async fn get_weather(
    upstream: &dyn WeatherUpstream,
    params: GetWeatherTool,
) -> Result<Value, AppError> {
    let units = params.units.as_deref().unwrap_or(DEFAULT_UNITS);
    upstream.get_json(&weather_request(&params.city, units)).await
}

pub async fn health(upstream: &dyn WeatherUpstream) -> Result<Value, AppError> {
    upstream.get_json(&UpstreamRequest::new(HEALTH_PATH)).await
}

pub fn ping() -> Value {
    json!({ "ok": true })
}

pub fn search_results(api_base: &str, query: &str) -> Value {
    let city = query.trim();
    if city.is_empty() {
        return json!({ "results": [] });
    }

    json!({
        "results": [{
            "id": city,
            "title": format!("Weather for {city}"),
            "url": weather_url(api_base, city),
        }]
    })
}

pub async fn fetch_document(
    upstream: &dyn WeatherUpstream,
    api_base: &str,
    id: &str,
) -> Result<Value, AppError> {
    let city = id.trim();
    if city.is_empty() {
        return Ok(json!({
            "id": "",
            "title": "Weather",
            "text": NO_CITY_TEXT,
            "url": api_base,
        }));
    }

    let weather = upstream
        .get_json(&weather_request(city, DEFAULT_UNITS))
        .await?;
    let text = serde_json::to_string_pretty(&weather)
        .map_err(|err| AppError::internal(format!("failed to render weather: {err}")))?;

    Ok(json!({
        "id": city,
        "title": format!("Weather for {city}"),
        "text": text,
        "url": weather_url(api_base, city),
    }))
}

/// Pass-through framing: JSON text block plus structured content.
pub fn value_result(value: Value) -> CallToolResult {
    let text = value.to_string();
    let structured = match value {
        Value::Object(map) => map,
        other => Map::from_iter([("result".to_string(), other)]),
    };

    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(text, None, None))],
        is_error: None,
        meta: None,
        structured_content: Some(structured),
    }
}

/// Connector framing: the document travels only as a JSON string.
pub fn document_result(document: &Value) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(
            document.to_string(),
            None,
            None,
        ))],
        is_error: None,
        meta: None,
        structured_content: None,
    }
}

fn parse_arguments<T: DeserializeOwned>(
    id: &Option<Value>,
    arguments: Option<Map<String, Value>>,
) -> Result<T, Value> {
    serde_json::from_value(Value::Object(arguments.unwrap_or_default()))
        .map_err(|_| json_rpc_error(id.clone(), -32602, "Invalid params"))
}

/// Execution failure framing: the caller sees the error text, not a protocol fault.
pub fn error_result(message: String) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(message, None, None))],
        is_error: Some(true),
        meta: None,
        structured_content: None,
    }
}

fn tool_response(
    id: Option<Value>,
    tool: &str,
    result: Result<CallToolResult, AppError>,
) -> Value {
    let result = match result {
        Ok(result) => result,
        Err(AppError::Upstream { status, message }) => {
            warn!(tool, status = ?status, error = %message, "tool call failed upstream");
            error_result(format!("Error calling tool '{tool}': {message}"))
        }
        Err(AppError::Internal { message, .. }) => {
            warn!(tool, error = %message, "tool call failed");
            error_result(format!("Error calling tool '{tool}': {message}"))
        }
        Err(err @ AppError::BadRequest { .. }) => return app_error_to_json_rpc(id, err),
    };

    json_rpc_result(
        id,
        serde_json::to_value(result).expect("tool result serialization"),
    )
}

pub async fn handle_tools_call(
    state: &AppState,
    id: Option<Value>,
    params: Option<Value>,
) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, -32602, "Invalid params");
    };

    let tool_call: CallToolRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, -32602, "Invalid params"),
    };

    let upstream = state.upstream.as_ref();
    match tool_call.name.as_str() {
        "get_weather" => {
            let params: GetWeatherTool = match parse_arguments(&id, tool_call.arguments) {
                Ok(params) => params,
                Err(response) => return response,
            };
            let weather = get_weather(upstream, params).await;
            tool_response(id, "get_weather", weather.map(value_result))
        }
        "health" => tool_response(id, "health", health(upstream).await.map(value_result)),
        "ping" => tool_response(id, "ping", Ok(value_result(ping()))),
        "search" => {
            let params: SearchTool = match parse_arguments(&id, tool_call.arguments) {
                Ok(params) => params,
                Err(response) => return response,
            };
            let results = search_results(&state.api_base, &params.query);
            tool_response(id, "search", Ok(document_result(&results)))
        }
        "fetch" => {
            let params: FetchTool = match parse_arguments(&id, tool_call.arguments) {
                Ok(params) => params,
                Err(response) => return response,
            };
            let document = fetch_document(upstream, &state.api_base, &params.id).await;
            tool_response(id, "fetch", document.map(|document| document_result(&document)))
        }
        _ => json_rpc_error_with_data(
            id,
            -32601,
            "Method not found",
            Some(json!({
                "code": "tool_not_found",
                "message": "unknown tool name",
                "details": {
                    "name": tool_call.name,
                },
            })),
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;

    const BASE: &str = "https://weather.example";

    struct RecordingUpstream {
        requests: Mutex<Vec<UpstreamRequest>>,
        response: Value,
    }

    impl RecordingUpstream {
        fn returning(response: Value) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                response,
            }
        }

        fn requests(&self) -> Vec<UpstreamRequest> {
            self.requests.lock().expect("requests lock").clone()
        }
    }

    #[async_trait]
    impl WeatherUpstream for RecordingUpstream {
        async fn get_json(&self, request: &UpstreamRequest) -> Result<Value, AppError> {
            self.requests
                .lock()
                .expect("requests lock")
                .push(request.clone());
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn get_weather_defaults_to_imperial() {
        let upstream = RecordingUpstream::returning(json!({"temp": 70}));
        let value = get_weather(
            &upstream,
            GetWeatherTool {
                city: "Boston".to_string(),
                units: None,
            },
        )
        .await
        .expect("weather lookup");

        assert_eq!(value, json!({"temp": 70}));
        assert_eq!(upstream.requests(), vec![weather_request("Boston", "imperial")]);
    }

    #[tokio::test]
    async fn get_weather_passes_units_through() {
        let upstream = RecordingUpstream::returning(json!({"temp": 21}));
        get_weather(
            &upstream,
            GetWeatherTool {
                city: "Jerusalem".to_string(),
                units: Some("metric".to_string()),
            },
        )
        .await
        .expect("weather lookup");

        let requests = upstream.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/api/weather");
        assert_eq!(
            requests[0].query,
            vec![
                ("city".to_string(), "Jerusalem".to_string()),
                ("units".to_string(), "metric".to_string()),
            ]
        );
    }

    #[test]
    fn search_with_blank_query_returns_no_results() {
        assert_eq!(search_results(BASE, ""), json!({"results": []}));
        assert_eq!(search_results(BASE, "   "), json!({"results": []}));
    }

    #[test]
    fn search_returns_single_trimmed_city() {
        assert_eq!(
            search_results(BASE, "  Boston "),
            json!({
                "results": [{
                    "id": "Boston",
                    "title": "Weather for Boston",
                    "url": "https://weather.example/api/weather?city=Boston"
                }]
            })
        );
    }

    #[tokio::test]
    async fn fetch_without_id_skips_upstream() {
        let upstream = RecordingUpstream::returning(json!({}));
        let document = fetch_document(&upstream, BASE, "  ")
            .await
            .expect("placeholder document");

        assert_eq!(document["text"], NO_CITY_TEXT);
        assert_eq!(document["id"], "");
        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn fetch_renders_weather_as_pretty_json() {
        let weather = json!({"city": "Jerusalem", "temp": 75});
        let upstream = RecordingUpstream::returning(weather.clone());
        let document = fetch_document(&upstream, BASE, "Jerusalem")
            .await
            .expect("weather document");

        assert_eq!(
            upstream.requests(),
            vec![weather_request("Jerusalem", "imperial")]
        );
        assert_eq!(document["id"], "Jerusalem");
        assert_eq!(document["title"], "Weather for Jerusalem");
        assert_eq!(
            document["url"],
            "https://weather.example/api/weather?city=Jerusalem"
        );
        assert_eq!(
            document["text"],
            serde_json::to_string_pretty(&weather).expect("pretty json")
        );
    }

    #[test]
    fn value_result_wraps_non_objects() {
        let result = value_result(json!([1, 2]));
        let structured = result.structured_content.expect("structured content");
        assert_eq!(structured.get("result"), Some(&json!([1, 2])));
    }

    #[test]
    fn upstream_failure_becomes_error_result() {
        let response = tool_response(
            Some(json!(4)),
            "health",
            Err(AppError::upstream(Some(503), "upstream responded with 503")),
        );

        assert!(response.get("error").is_none());
        assert_eq!(response["result"]["isError"], true);
        assert_eq!(
            response["result"]["content"][0]["text"],
            "Error calling tool 'health': upstream responded with 503"
        );
    }

    #[test]
    fn bad_request_stays_a_protocol_error() {
        let response = tool_response(
            Some(json!(5)),
            "get_weather",
            Err(AppError::bad_request("invalid_units", "units must be imperial or metric")),
        );

        assert_eq!(response["error"]["code"], -32602);
        assert!(response.get("result").is_none());
    }

    #[test]
    fn tools_list_has_fixed_order() {
        let names: Vec<String> = build_tools_list().into_iter().map(|tool| tool.name).collect();
        assert_eq!(names, vec!["get_weather", "health", "ping", "search", "fetch"]);
    }
}
