//! MCP stdio interface: line-delimited JSON-RPC 2.0 over stdin/stdout.
//!
//! Each `tools/call` re-invokes this executable with the mapped argument
//! vector, so tool semantics stay identical to the CLI.

use std::io::{self, BufRead, Write};
use std::process::Command;

use serde_json::{Value, json};

const PROTOCOL_VERSION: &str = "2024-11-05";

pub fn serve() -> Result<(), String> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line.map_err(|error| format!("stdin read failed: {error}"))?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(&line) {
            Ok(request) => handle_request(&request),
            Err(_) => Some(error_response(Value::Null, -32700, "parse error")),
        };
        if let Some(response) = response {
            writeln!(stdout, "{response}").map_err(|error| format!("stdout write failed: {error}"))?;
            stdout
                .flush()
                .map_err(|error| format!("stdout flush failed: {error}"))?;
        }
    }
    Ok(())
}

fn handle_request(request: &Value) -> Option<Value> {
    let id = request.get("id").cloned();
    let method = request
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default();

    match method {
        "initialize" => Some(result_response(
            id?,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": "mem",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        )),
        "notifications/initialized" => None,
        "tools/list" => Some(result_response(id?, json!({ "tools": tool_definitions() }))),
        "tools/call" => Some(handle_tool_call(id?, request.get("params"))),
        // notifications for unknown methods are dropped silently
        _ => id.map(|id| error_response(id, -32601, "method not found")),
    }
}

fn handle_tool_call(id: Value, params: Option<&Value>) -> Value {
    let name = params
        .and_then(|params| params.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let arguments = params
        .and_then(|params| params.get("arguments"))
        .cloned()
        .unwrap_or_else(|| json!({}));

    let Some(argv) = tool_argv(name, &arguments) else {
        return error_response(id, -32602, &format!("unknown tool '{name}'"));
    };

    match invoke_self(&argv) {
        Ok(outcome) => result_response(
            id,
            json!({
                "content": [ { "type": "text", "text": outcome.text } ],
                "isError": !outcome.success,
            }),
        ),
        Err(message) => error_response(id, -32603, &message),
    }
}

struct ToolOutcome {
    text: String,
    success: bool,
}

fn invoke_self(argv: &[String]) -> Result<ToolOutcome, String> {
    let exe = std::env::current_exe()
        .map_err(|error| format!("cannot locate own executable: {error}"))?;
    tracing::debug!(?argv, "mcp tool call");
    let output = Command::new(exe)
        .args(argv)
        .output()
        .map_err(|error| format!("failed to run command: {error}"))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let text = if !stdout.trim().is_empty() {
        stdout
    } else {
        String::from_utf8_lossy(&output.stderr).to_string()
    };
    Ok(ToolOutcome {
        text,
        success: output.status.success(),
    })
}

/// Map a tool call onto the CLI argument vector it is equivalent to.
fn tool_argv(name: &str, arguments: &Value) -> Option<Vec<String>> {
    fn required(arguments: &Value, key: &str) -> Option<String> {
        arguments
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }
    fn optional(base: Vec<String>, arguments: &Value, key: &str) -> Vec<String> {
        let mut argv = base;
        if let Some(value) = arguments.get(key).and_then(Value::as_str) {
            argv.push(value.to_string());
        }
        argv
    }

    let argv = match name {
        "mem_status" => vec!["status".to_string()],
        "mem_context" => vec!["context".to_string()],
        "mem_progress" => vec!["progress".to_string()],
        "mem_clear" => vec!["clear".to_string()],
        "mem_goal" => optional(vec!["goal".to_string()], arguments, "text"),
        "mem_next" => optional(vec!["next".to_string()], arguments, "text"),
        "mem_checkpoint" => vec!["checkpoint".to_string(), required(arguments, "message")?],
        "mem_learn" => vec!["learn".to_string(), required(arguments, "insight")?],
        "mem_stuck" => vec!["stuck".to_string(), required(arguments, "reason")?],
        "mem_criteria_add" => vec![
            "criteria".to_string(),
            "add".to_string(),
            required(arguments, "text")?,
        ],
        "mem_criteria_check" => {
            let number = arguments.get("number").and_then(Value::as_u64)?;
            vec![
                "criteria".to_string(),
                "check".to_string(),
                number.to_string(),
            ]
        }
        _ => return None,
    };
    Some(argv)
}

fn tool_definitions() -> Value {
    fn text_input(key: &str, description: &str, required: bool) -> Value {
        let mut schema = json!({
            "type": "object",
            "properties": { key: { "type": "string", "description": description } },
        });
        if required {
            schema["required"] = json!([key]);
        }
        schema
    }

    json!([
        {
            "name": "mem_status",
            "description": "Show the current task's store, branch, status, and progress.",
            "inputSchema": { "type": "object", "properties": {} },
        },
        {
            "name": "mem_context",
            "description": "Dump goal, state, memory, and playbook for a fresh agent.",
            "inputSchema": { "type": "object", "properties": {} },
        },
        {
            "name": "mem_goal",
            "description": "Show the goal, or replace the goal statement when text is given.",
            "inputSchema": text_input("text", "New goal statement.", false),
        },
        {
            "name": "mem_next",
            "description": "Show the next step, or replace it when text is given.",
            "inputSchema": text_input("text", "New next step.", false),
        },
        {
            "name": "mem_checkpoint",
            "description": "Record a dated progress checkpoint.",
            "inputSchema": text_input("message", "What was just accomplished.", true),
        },
        {
            "name": "mem_learn",
            "description": "Record a learning in task memory.",
            "inputSchema": text_input("insight", "The insight to remember.", true),
        },
        {
            "name": "mem_criteria_add",
            "description": "Add a Definition of Done criterion.",
            "inputSchema": text_input("text", "The criterion.", true),
        },
        {
            "name": "mem_criteria_check",
            "description": "Check off an open criterion by its current number.",
            "inputSchema": {
                "type": "object",
                "properties": { "number": { "type": "integer", "description": "1-based number among unchecked criteria." } },
                "required": ["number"],
            },
        },
        {
            "name": "mem_progress",
            "description": "Recompute and report progress.",
            "inputSchema": { "type": "object", "properties": {} },
        },
        {
            "name": "mem_stuck",
            "description": "Mark the task blocked with a reason.",
            "inputSchema": text_input("reason", "Why the task is blocked.", true),
        },
        {
            "name": "mem_clear",
            "description": "Mark a blocked task active again.",
            "inputSchema": { "type": "object", "properties": {} },
        },
    ])
}

fn result_response(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}
