//! End-to-end dispatch tests: register a realistic capability set, then
//! drive it through raw request envelopes the way a remote caller would.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use serde_json::{json, Value};
use switchboard::{
    Args, FieldSpec, HandlerError, OperationOutput, Router, RpcId, RpcRequest, RpcResponse,
    ServerBuilder, ServerInfo, Shape, SourceContents, TemplateMessage, TemplateOutput,
};

// ---------------------------------------------------------------------------
// Fixture: a small calculator adapter
// ---------------------------------------------------------------------------

async fn run_calculate(args: Args) -> Result<OperationOutput, HandlerError> {
    #[derive(serde::Deserialize)]
    struct Input {
        operation: String,
        a: f64,
        b: f64,
    }

    let input: Input = serde_json::from_value(Value::Object(args))
        .map_err(|e| HandlerError::new(format!("invalid arguments: {e}")))?;

    let value = match input.operation.as_str() {
        "add" => input.a + input.b,
        "subtract" => input.a - input.b,
        "multiply" => input.a * input.b,
        "divide" => {
            if input.b == 0.0 {
                return Ok(OperationOutput::error_text("division by zero"));
            }
            input.a / input.b
        }
        other => return Err(HandlerError::new(format!("unsupported operation: {other}"))),
    };

    Ok(OperationOutput::text(format_number(value)))
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn calculator_router() -> Router {
    let calculate_shape = Shape::new()
        .field(
            "operation",
            FieldSpec::choice(["add", "subtract", "multiply", "divide"])
                .describe("Arithmetic operation to perform"),
        )
        .field("a", FieldSpec::number().describe("Left operand"))
        .field("b", FieldSpec::number().describe("Right operand"));

    let server = ServerBuilder::new()
        .operation(
            "calculate",
            "Perform basic arithmetic",
            calculate_shape,
            run_calculate,
        )
        .data_source("readme", "doc://readme", "Adapter documentation", |uri| async move {
            Ok(SourceContents::text(uri, "A small calculator adapter."))
        })
        .template(
            "word-problem",
            "Phrase a calculation as a word problem",
            Shape::new().field("topic", FieldSpec::text().default_value("apples")),
            |args: Args| async move {
                let topic = args
                    .get("topic")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Ok(TemplateOutput::new(vec![TemplateMessage::user(format!(
                    "Write a word problem about {topic}."
                ))]))
            },
        )
        .build();

    Router::new(
        server,
        ServerInfo {
            name: "calculator".to_string(),
            version: "1.0.0".to_string(),
            description: "Arithmetic over the wire".to_string(),
        },
    )
}

fn make_request(method: &str, params: Value) -> RpcRequest {
    let raw = serde_json::value::RawValue::from_string(params.to_string()).unwrap();
    RpcRequest {
        jsonrpc: "2.0".to_string(),
        id: Some(RpcId::Num(1)),
        method: method.to_string(),
        params: Some(raw),
    }
}

fn make_request_no_params(method: &str) -> RpcRequest {
    RpcRequest {
        jsonrpc: "2.0".to_string(),
        id: Some(RpcId::Num(1)),
        method: method.to_string(),
        params: None,
    }
}

fn result_value(resp: &RpcResponse) -> Value {
    assert!(
        resp.error.is_none(),
        "Expected success, got error: {:?}",
        resp.error
    );
    serde_json::from_str(resp.result.as_ref().unwrap().get()).unwrap()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

/// Full handshake-then-call flow: initialize, list, call.
#[tokio::test]
async fn handshake_list_call_flow() {
    let router = calculator_router();

    let init = router
        .dispatch(make_request(
            "initialize",
            json!({"protocolVersion": "2025-06-18"}),
        ))
        .await
        .unwrap();
    let init_result = result_value(&init);
    assert_eq!(init_result["serverInfo"]["name"], "calculator");
    assert!(init_result["capabilities"]["operations"].is_object());

    let list = router
        .dispatch(make_request_no_params("operations/list"))
        .await
        .unwrap();
    let list_result = result_value(&list);
    let schema = &list_result["operations"][0]["inputSchema"];
    assert_eq!(
        schema["properties"]["operation"]["enum"],
        json!(["add", "subtract", "multiply", "divide"])
    );
    assert_eq!(schema["required"], json!(["operation", "a", "b"]));

    let call = router
        .dispatch(make_request(
            "operations/call",
            json!({"name": "calculate", "arguments": {"operation": "multiply", "a": 7, "b": 8}}),
        ))
        .await
        .unwrap();
    let call_result = result_value(&call);
    assert_eq!(call_result["isError"], false);
    assert!(call_result["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("56"));
}

/// The handler's own zero-check produces a result-level error, not a
/// framework fault.
#[tokio::test]
async fn divide_by_zero_is_handler_level_error() {
    let router = calculator_router();

    let resp = router
        .dispatch(make_request(
            "operations/call",
            json!({"name": "calculate", "arguments": {"operation": "divide", "a": 1, "b": 0}}),
        ))
        .await
        .unwrap();
    let result = result_value(&resp);
    assert_eq!(result["isError"], true);
    assert_eq!(result["content"][0]["text"], "division by zero");
}

/// Out-of-enum arguments never reach the handler; the rejection rides the
/// result payload.
#[tokio::test]
async fn bad_enum_value_is_rejected_before_the_handler() {
    let router = calculator_router();

    let resp = router
        .dispatch(make_request(
            "operations/call",
            json!({"name": "calculate", "arguments": {"operation": "modulo", "a": 1, "b": 2}}),
        ))
        .await
        .unwrap();
    let result = result_value(&resp);
    assert_eq!(result["isError"], true);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("operation"));
    assert!(!text.contains("unsupported operation"), "handler must not run");
}

/// Aggregated validation: both bad operands reported at once.
#[tokio::test]
async fn validation_reports_all_bad_fields_at_once() {
    let router = calculator_router();

    let resp = router
        .dispatch(make_request(
            "operations/call",
            json!({"name": "calculate", "arguments": {"operation": "add", "a": "x", "b": "y"}}),
        ))
        .await
        .unwrap();
    let result = result_value(&resp);
    assert_eq!(result["isError"], true);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("a:"));
    assert!(text.contains("b:"));
}

/// Extra caller-supplied fields are dropped before the handler sees them.
#[tokio::test]
async fn extra_fields_never_reach_the_handler() {
    let server = ServerBuilder::new()
        .operation(
            "inspect",
            "Echo the received argument names",
            Shape::new()
                .field("a", FieldSpec::number())
                .field("b", FieldSpec::number()),
            |args: Args| async move {
                let mut names: Vec<&str> = args.keys().map(String::as_str).collect();
                names.sort_unstable();
                Ok(OperationOutput::text(names.join(",")))
            },
        )
        .build();
    let router = Router::new(server, ServerInfo::default());

    let resp = router
        .dispatch(make_request(
            "operations/call",
            json!({"name": "inspect", "arguments": {"a": 1, "b": 2, "c": 3}}),
        ))
        .await
        .unwrap();
    let result = result_value(&resp);
    assert_eq!(result["content"][0]["text"], "a,b");
}

/// Defaults flow into the handler when the caller omits the field.
#[tokio::test]
async fn template_defaults_apply_on_omission() {
    let router = calculator_router();

    let resp = router
        .dispatch(make_request(
            "templates/get",
            json!({"name": "word-problem", "arguments": {}}),
        ))
        .await
        .unwrap();
    let result = result_value(&resp);
    assert_eq!(
        result["messages"][0]["content"]["text"],
        "Write a word problem about apples."
    );

    let resp = router
        .dispatch(make_request(
            "templates/get",
            json!({"name": "word-problem", "arguments": {"topic": "trains"}}),
        ))
        .await
        .unwrap();
    let result = result_value(&resp);
    assert_eq!(
        result["messages"][0]["content"]["text"],
        "Write a word problem about trains."
    );
}

/// Every recognized method answers; anything else is METHOD_NOT_FOUND.
#[tokio::test]
async fn dispatch_covers_all_recognized_methods() {
    let router = calculator_router();

    for method in [
        "initialize",
        "operations/list",
        "datasources/list",
        "templates/list",
    ] {
        let resp = router.dispatch(make_request_no_params(method)).await.unwrap();
        assert!(resp.error.is_none(), "{method} should succeed");
    }

    let read = router
        .dispatch(make_request(
            "datasources/read",
            json!({"uri": "doc://readme"}),
        ))
        .await
        .unwrap();
    assert!(read.error.is_none());

    for method in ["tools/call", "resources/read", "completely/made-up", "ping"] {
        let resp = router.dispatch(make_request_no_params(method)).await.unwrap();
        assert_eq!(
            resp.error.as_ref().map(|e| e.code),
            Some(switchboard::error::METHOD_NOT_FOUND),
            "{method} should be unknown"
        );
    }
}
