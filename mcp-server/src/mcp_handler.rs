use anyhow::Result;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::Arc;
use tracing::{info, warn};

use crate::use_cases::{ApiUseCase, DrawUseCase, FavoritesUseCase, NumberUseCase, ReportUseCase};

#[derive(Debug, serde::Deserialize)]
struct JsonRpcRequest {
    #[serde(default = "default_jsonrpc")]
    jsonrpc: String,
    method: String,
    params: Option<Value>,
    id: Option<Value>,
}

fn default_jsonrpc() -> String {
    "2.0".to_string()
}

#[derive(Debug, serde::Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Option<Value>,
}

#[derive(Debug, serde::Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

#[derive(Debug, serde::Serialize)]
struct Tool {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

pub struct MCPHandler {
    number_use_case: Arc<NumberUseCase>,
    draw_use_case: Arc<DrawUseCase>,
    api_use_case: Arc<ApiUseCase>,
    favorites_use_case: Arc<FavoritesUseCase>,
    report_use_case: Arc<ReportUseCase>,
}

impl MCPHandler {
    pub fn new(
        number_use_case: Arc<NumberUseCase>,
        draw_use_case: Arc<DrawUseCase>,
        api_use_case: Arc<ApiUseCase>,
        favorites_use_case: Arc<FavoritesUseCase>,
        report_use_case: Arc<ReportUseCase>,
    ) -> Self {
        Self {
            number_use_case,
            draw_use_case,
            api_use_case,
            favorites_use_case,
            report_use_case,
        }
    }

    pub async fn serve<R, W>(self, reader: R, mut writer: W) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(req) => req,
                Err(e) => {
                    warn!("Failed to parse request: {} - Line: {}", e, line);
                    let error_response = JsonRpcResponse {
                        jsonrpc: "2.0".to_string(),
                        result: None,
                        error: Some(JsonRpcError {
                            code: -32700,
                            message: "Parse error".to_string(),
                            data: Some(json!(e.to_string())),
                        }),
                        id: None,
                    };
                    let response_json = serde_json::to_string(&error_response)?;
                    writeln!(writer, "{}", response_json)?;
                    writer.flush()?;
                    continue;
                }
            };

            // Notifications never get a response.
            let is_notification =
                request.id.is_none() || request.method.starts_with("notifications/");

            if is_notification {
                if request.method == "notifications/initialized" {
                    info!("🎱 Client initialized");
                }
                continue;
            }

            let response = self.handle_request(request).await;
            let response_json = serde_json::to_string(&response)?;
            writeln!(writer, "{}", response_json)?;
            writer.flush()?;
        }

        Ok(())
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        if request.jsonrpc != "2.0" {
            return JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                result: None,
                error: Some(JsonRpcError {
                    code: -32600,
                    message: format!("Invalid Request: unsupported jsonrpc version {}", request.jsonrpc),
                    data: None,
                }),
                id: Some(request.id.unwrap_or(json!(1))),
            };
        }

        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id).await,
            "tools/list" => self.handle_list_tools(request.id).await,
            "tools/call" => self.handle_call_tool(request.params, request.id).await,
            _ => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                result: None,
                error: Some(JsonRpcError {
                    code: -32601,
                    message: format!("Method not found: {}", request.method),
                    data: None,
                }),
                id: Some(request.id.unwrap_or(json!(1))),
            },
        }
    }

    async fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("🎱 Initializing lotto645 MCP server");
        JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "lotto645-mcp-server",
                    "version": "0.1.0"
                }
            })),
            error: None,
            id: Some(id.unwrap_or(json!(1))),
        }
    }

    async fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        let tools = self.get_tools();
        JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(json!({ "tools": tools })),
            error: None,
            id: Some(id.unwrap_or(json!(1))),
        }
    }

    async fn handle_call_tool(&self, params: Option<Value>, id: Option<Value>) -> JsonRpcResponse {
        let params = match params {
            Some(p) => p,
            None => {
                return JsonRpcResponse {
                    jsonrpc: "2.0".to_string(),
                    result: None,
                    error: Some(JsonRpcError {
                        code: -32602,
                        message: "Missing params".to_string(),
                        data: None,
                    }),
                    id: Some(id.unwrap_or(json!(1))),
                };
            }
        };

        let tool_name = match params.get("name").and_then(|n| n.as_str()) {
            Some(name) => name,
            None => {
                return JsonRpcResponse {
                    jsonrpc: "2.0".to_string(),
                    result: None,
                    error: Some(JsonRpcError {
                        code: -32602,
                        message: "Missing tool name".to_string(),
                        data: None,
                    }),
                    id: Some(id.unwrap_or(json!(1))),
                };
            }
        };

        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
        let arguments_map: HashMap<String, Value> =
            serde_json::from_value(arguments).unwrap_or_default();

        let result = self.execute_tool(tool_name, &arguments_map).await;

        match result {
            Ok(content) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                result: Some(json!({
                    "content": [
                        {
                            "type": "text",
                            "text": content
                        }
                    ]
                })),
                error: None,
                id: Some(id.unwrap_or(json!(1))),
            },
            Err(e) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                result: None,
                error: Some(JsonRpcError {
                    code: -32603,
                    message: format!("Tool execution error: {}", e),
                    data: None,
                }),
                id: Some(id.unwrap_or(json!(1))),
            },
        }
    }

    async fn execute_tool(&self, tool_name: &str, arguments: &HashMap<String, Value>) -> Result<String> {
        match tool_name {
            "list_strategies" => self.number_use_case.list_strategies(arguments).await,
            "generate_numbers" => self.number_use_case.generate_numbers(arguments).await,
            "calculate_tax" => self.number_use_case.calculate_tax(arguments).await,
            "verify_numbers" => self.draw_use_case.verify_numbers(arguments).await,
            "get_draw" => self.draw_use_case.get_draw(arguments).await,
            "get_latest_draws" => self.draw_use_case.get_latest_draws(arguments).await,
            "fetch_draws" => self.api_use_case.fetch_draws(arguments).await,
            "import_history_json" => self.draw_use_case.import_history_json(arguments).await,
            "get_statistics" => self.draw_use_case.get_statistics(arguments).await,
            "add_favorite_numbers" => self.favorites_use_case.add_favorite_numbers(arguments).await,
            "list_favorite_numbers" => self.favorites_use_case.list_favorite_numbers(arguments).await,
            "remove_favorite_numbers" => {
                self.favorites_use_case.remove_favorite_numbers(arguments).await
            }
            "add_favorite_store" => self.favorites_use_case.add_favorite_store(arguments).await,
            "remove_favorite_store" => self.favorites_use_case.remove_favorite_store(arguments).await,
            "list_favorite_stores" => self.favorites_use_case.list_favorite_stores(arguments).await,
            "submit_winner" => self.favorites_use_case.submit_winner(arguments).await,
            "list_winners" => self.favorites_use_case.list_winners(arguments).await,
            "generate_and_save_report" => self.report_use_case.generate_and_save_report(arguments).await,
            _ => Err(anyhow::anyhow!("Unknown tool: {}", tool_name)),
        }
    }

    fn get_tools(&self) -> Vec<Tool> {
        let numbers_schema = json!({
            "type": "array",
            "description": "Six distinct numbers between 1 and 45",
            "items": {"type": "integer", "minimum": 1, "maximum": 45},
            "minItems": 6,
            "maxItems": 6
        });
        let empty_schema = json!({
            "type": "object",
            "properties": {}
        });

        vec![
            Tool {
                name: "list_strategies".to_string(),
                description: "List the available number generation strategies".to_string(),
                input_schema: empty_schema.clone(),
            },
            Tool {
                name: "generate_numbers".to_string(),
                description: "Generate lotto number sets with a strategy".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "strategy": {
                            "type": "string",
                            "enum": ["hot", "cold", "balanced", "oddEven", "highNumber", "random"],
                            "description": "Strategy id (default: random)"
                        },
                        "count": {
                            "type": "integer",
                            "description": "Number of sets to generate, 1-20 (default: 1)"
                        }
                    }
                }),
            },
            Tool {
                name: "calculate_tax".to_string(),
                description: "Calculate withholding tax and net payout for a prize amount in won"
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "amount": {
                            "type": "integer",
                            "description": "Prize amount in won"
                        }
                    },
                    "required": ["amount"]
                }),
            },
            Tool {
                name: "verify_numbers".to_string(),
                description: "Check numbers against a stored draw and report the prize tier"
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "numbers": numbers_schema.clone(),
                        "round": {
                            "type": "integer",
                            "description": "Draw round (default: latest stored)"
                        }
                    },
                    "required": ["numbers"]
                }),
            },
            Tool {
                name: "get_draw".to_string(),
                description: "Get the stored draw for a round".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "round": {
                            "type": "integer",
                            "description": "Draw round"
                        }
                    },
                    "required": ["round"]
                }),
            },
            Tool {
                name: "get_latest_draws".to_string(),
                description: "Get the most recent stored draws".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "limit": {
                            "type": "integer",
                            "description": "Number of draws to return (default: 10)"
                        }
                    }
                }),
            },
            Tool {
                name: "fetch_draws".to_string(),
                description: "Fetch missing draws from the lottery API and save them".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "rounds": {
                            "type": "array",
                            "description": "Rounds to fetch (default: next missing rounds)",
                            "items": {"type": "integer"}
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum missing rounds to fetch when rounds is omitted (default: 20)"
                        }
                    }
                }),
            },
            Tool {
                name: "import_history_json".to_string(),
                description: "Import a draw history JSON array into the database".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "raw_json": {
                            "type": "string",
                            "description": "JSON array of draw records"
                        },
                        "path": {
                            "type": "string",
                            "description": "Path to a JSON file, used when raw_json is absent"
                        }
                    }
                }),
            },
            Tool {
                name: "get_statistics".to_string(),
                description: "Frequency, hot/cold, section, odd/even, consecutive and sum analysis"
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "period": {
                            "type": "string",
                            "enum": ["recent", "quarter", "half", "year"],
                            "description": "Analysis window (default: recent)"
                        }
                    }
                }),
            },
            Tool {
                name: "add_favorite_numbers".to_string(),
                description: "Save a number set as a favorite".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "numbers": numbers_schema.clone()
                    },
                    "required": ["numbers"]
                }),
            },
            Tool {
                name: "list_favorite_numbers".to_string(),
                description: "List saved favorite number sets, newest first".to_string(),
                input_schema: empty_schema.clone(),
            },
            Tool {
                name: "remove_favorite_numbers".to_string(),
                description: "Remove a saved favorite number set".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "id": {
                            "type": "integer",
                            "description": "Favorite id"
                        }
                    },
                    "required": ["id"]
                }),
            },
            Tool {
                name: "add_favorite_store".to_string(),
                description: "Save a lottery store as a favorite".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "name": {"type": "string", "description": "Store name"},
                        "address": {"type": "string", "description": "Store address"}
                    },
                    "required": ["name"]
                }),
            },
            Tool {
                name: "remove_favorite_store".to_string(),
                description: "Remove a favorite store by name".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "name": {"type": "string", "description": "Store name"}
                    },
                    "required": ["name"]
                }),
            },
            Tool {
                name: "list_favorite_stores".to_string(),
                description: "List favorite stores".to_string(),
                input_schema: empty_schema.clone(),
            },
            Tool {
                name: "submit_winner".to_string(),
                description: "Record a winning ticket in the shared winner log".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "numbers": numbers_schema,
                        "round": {"type": "integer", "description": "Draw round (default: latest stored)"},
                        "nickname": {"type": "string"},
                        "store_name": {"type": "string"},
                        "store_location": {"type": "string"},
                        "message": {"type": "string"},
                        "agree_to_share": {"type": "boolean"}
                    },
                    "required": ["numbers", "nickname", "agree_to_share"]
                }),
            },
            Tool {
                name: "list_winners".to_string(),
                description: "List submitted winners, newest first".to_string(),
                input_schema: empty_schema,
            },
            Tool {
                name: "generate_and_save_report".to_string(),
                description: "Generate and save the HTML report for a round".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "round": {
                            "type": "integer",
                            "description": "Draw round"
                        }
                    },
                    "required": ["round"]
                }),
            },
        ]
    }
}

pub fn stdio() -> (BufReader<io::Stdin>, io::Stdout) {
    (BufReader::new(io::stdin()), io::stdout())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lotto645::database::init_schema;
    use rusqlite::Connection;
    use std::io::Cursor;

    const HISTORY: &str = r#"[
        {"round": 1189, "date": "2025-09-13", "numbers": [9, 19, 29, 35, 37, 38], "bonus": 31},
        {"round": 1190, "date": "2025-09-20", "numbers": [7, 9, 19, 27, 36, 41], "bonus": 12,
         "firstPrizeAmount": 2317935750, "firstPrizeWinners": 12}
    ]"#;

    fn handler() -> MCPHandler {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        lotto645::database::import_history_json(&conn, HISTORY).unwrap();
        let conn = Arc::new(conn);

        MCPHandler::new(
            Arc::new(NumberUseCase::new()),
            Arc::new(DrawUseCase::new(Arc::clone(&conn))),
            Arc::new(ApiUseCase::new(Arc::clone(&conn), "http://127.0.0.1:9".to_string())),
            Arc::new(FavoritesUseCase::new(Arc::clone(&conn))),
            Arc::new(ReportUseCase::new(conn, std::env::temp_dir().display().to_string())),
        )
    }

    async fn roundtrip(lines: &[Value]) -> Vec<Value> {
        let input: String = lines.iter().map(|l| format!("{}\n", l)).collect();
        let mut output = Vec::new();
        handler()
            .serve(Cursor::new(input), &mut output)
            .await
            .unwrap();

        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    async fn call(name: &str, arguments: Value) -> Value {
        let responses = roundtrip(&[json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments}
        })])
        .await;
        responses[0].clone()
    }

    fn tool_text(response: &Value) -> Value {
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_and_list_tools() {
        let responses = roundtrip(&[
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        ])
        .await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "lotto645-mcp-server");

        let tools = responses[1]["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 18);
        assert!(tools.iter().any(|t| t["name"] == "calculate_tax"));
    }

    #[tokio::test]
    async fn test_parse_error_and_unknown_method() {
        let input = "not json\n{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"nope\"}\n";
        let mut output = Vec::new();
        handler()
            .serve(Cursor::new(input), &mut output)
            .await
            .unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[1]["error"]["code"], -32601);
        assert_eq!(responses[1]["id"], 7);
    }

    #[tokio::test]
    async fn test_rejects_wrong_jsonrpc_version() {
        let responses = roundtrip(&[
            json!({"jsonrpc": "1.0", "id": 3, "method": "tools/list"}),
            json!({"id": 4, "method": "tools/list"}),
        ])
        .await;

        assert_eq!(responses[0]["error"]["code"], -32600);
        assert_eq!(responses[0]["id"], 3);
        assert!(responses[1]["result"]["tools"].is_array());
    }

    #[tokio::test]
    async fn test_calculate_tax_tool() {
        let body = tool_text(&call("calculate_tax", json!({"amount": 300_000_001i64})).await);
        assert_eq!(body["tax"]["incomeTax"], 99_000_000);
        assert_eq!(body["tax"]["localTax"], 9_900_000);
        assert_eq!(body["tax"]["netAmount"], 191_100_001);

        let rejected = call("calculate_tax", json!({"amount": 0})).await;
        assert_eq!(rejected["error"]["code"], -32603);
    }

    #[tokio::test]
    async fn test_generate_numbers_tool() {
        let body = tool_text(&call("generate_numbers", json!({"strategy": "hot", "count": 3})).await);
        let sets = body["numbers"].as_array().unwrap();
        assert_eq!(sets.len(), 3);
        for set in sets {
            assert_eq!(set.as_array().unwrap().len(), 6);
        }

        let unknown = call("generate_numbers", json!({"strategy": "lucky"})).await;
        assert!(unknown["error"]["message"].as_str().unwrap().contains("lucky"));
    }

    #[tokio::test]
    async fn test_verify_numbers_tool_defaults_to_latest_draw() {
        let body = tool_text(
            &call("verify_numbers", json!({"numbers": [7, 9, 19, 27, 36, 12]})).await,
        );
        assert_eq!(body["isWinner"], true);
        assert_eq!(body["result"]["matchCount"], 5);
        assert_eq!(body["result"]["bonusMatched"], true);
        assert_eq!(body["result"]["prizeTier"], "second");
    }

    #[tokio::test]
    async fn test_ticket_errors_come_before_draw_lookup() {
        let duplicate = call(
            "verify_numbers",
            json!({"numbers": [1, 1, 2, 3, 4, 5], "round": 9999}),
        )
        .await;
        let message = duplicate["error"]["message"].as_str().unwrap();
        assert!(message.contains("number 1 appears more than once"), "{}", message);

        let short = call(
            "submit_winner",
            json!({"numbers": [1, 2, 3], "round": 9999, "nickname": "lucky", "agree_to_share": true}),
        )
        .await;
        let message = short["error"]["message"].as_str().unwrap();
        assert!(message.contains("expected 6 numbers, got 3"), "{}", message);
    }

    #[tokio::test]
    async fn test_get_statistics_tool() {
        let body = tool_text(&call("get_statistics", json!({"period": "recent"})).await);
        assert_eq!(body["statistics"]["rounds"], 2);
        assert_eq!(body["statistics"]["mostRecentDraw"]["round"], 1190);
    }

    #[tokio::test]
    async fn test_favorites_tools_share_one_store() {
        let responses = roundtrip(&[
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call",
                   "params": {"name": "add_favorite_numbers", "arguments": {"numbers": [1, 2, 3, 4, 5, 6]}}}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
                   "params": {"name": "list_favorite_numbers"}}),
        ])
        .await;

        let listed = tool_text(&responses[1]);
        assert_eq!(listed["favorites"].as_array().unwrap().len(), 1);
        assert_eq!(listed["favorites"][0]["name"], "번호조합 1");
    }

    #[tokio::test]
    async fn test_submit_winner_rejects_losing_ticket() {
        let response = call(
            "submit_winner",
            json!({"numbers": [1, 2, 3, 4, 5, 6], "nickname": "lucky", "agree_to_share": true}),
        )
        .await;
        assert_eq!(response["error"]["code"], -32603);
    }
}
