//! Switchboard demo server
//!
//! Serves a small demonstration capability set over HTTP: a calculator
//! operation, an echo operation, a process-status data source, and a
//! greeting template.
//!
//! # Environment Variables
//!
//! - `SWITCHBOARD_HOST` / `SWITCHBOARD_PORT`: bind address
//! - `SWITCHBOARD_RPC_PATH`: RPC endpoint path (default `/`)
//! - `SWITCHBOARD_AUTH_TOKENS`: comma-separated bearer tokens; unset
//!   disables auth
//! - `SWITCHBOARD_CORS_ORIGINS`: comma-separated origin allow-list;
//!   unset means permissive

use std::net::SocketAddr;

use clap::Parser;
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use switchboard::{
    Args, CapabilityServer, FieldSpec, HandlerError, OperationOutput, Router, ServerBuilder,
    ServerInfo, Shape, SourceContents, TemplateMessage, TemplateOutput,
};
use switchboard_http::{app, AppConfig};

#[derive(Parser, Debug)]
#[command(name = "switchboard-http")]
#[command(about = "Switchboard capability adapter over HTTP")]
struct Cli {
    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,
    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "switchboard_http=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let router = Router::new(
        demo_capabilities(),
        ServerInfo {
            name: "switchboard-demo".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Demonstration capability adapter".to_string(),
        },
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid host:port combination: {e}"))?;

    let app = app(router, &config).layer(TraceLayer::new_for_http());

    tracing::info!(rpc_path = %config.rpc_path, "Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// The demonstration capability set.
fn demo_capabilities() -> CapabilityServer {
    ServerBuilder::new()
        .operation(
            "calculate",
            "Perform basic arithmetic on two numbers",
            Shape::new()
                .field(
                    "operation",
                    FieldSpec::choice(["add", "subtract", "multiply", "divide"])
                        .describe("Arithmetic operation to perform"),
                )
                .field("a", FieldSpec::number().describe("Left operand"))
                .field("b", FieldSpec::number().describe("Right operand")),
            run_calculate,
        )
        .operation(
            "echo",
            "Echo a message back, optionally repeated",
            Shape::new()
                .field("message", FieldSpec::text().min_len(1).describe("Text to echo"))
                .field(
                    "repeat",
                    FieldSpec::integer()
                        .min(1.0)
                        .max(10.0)
                        .default_value(1)
                        .describe("How many times to repeat"),
                ),
            run_echo,
        )
        .data_source(
            "status",
            "system://status",
            "Current process status",
            |uri| async move {
                let status = serde_json::json!({
                    "status": "ok",
                    "version": env!("CARGO_PKG_VERSION"),
                });
                Ok(SourceContents::text(uri, status.to_string())
                    .with_mime_type("application/json"))
            },
        )
        .template(
            "greeting",
            "Compose a greeting request",
            Shape::new()
                .field("name", FieldSpec::text().min_len(1).describe("Who to greet"))
                .field(
                    "tone",
                    FieldSpec::choice(["formal", "casual"])
                        .default_value("casual")
                        .describe("Register of the greeting"),
                ),
            run_greeting,
        )
        .build()
}

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

async fn run_echo(args: Args) -> Result<OperationOutput, HandlerError> {
    #[derive(serde::Deserialize)]
    struct Input {
        message: String,
        repeat: u32,
    }

    let input: Input = serde_json::from_value(Value::Object(args))
        .map_err(|e| HandlerError::new(format!("invalid arguments: {e}")))?;

    let echoed = vec![input.message; input.repeat as usize].join(" ");
    Ok(OperationOutput::text(echoed))
}

async fn run_greeting(args: Args) -> Result<TemplateOutput, HandlerError> {
    #[derive(serde::Deserialize)]
    struct Input {
        name: String,
        tone: String,
    }

    let input: Input = serde_json::from_value(Value::Object(args))
        .map_err(|e| HandlerError::new(format!("invalid arguments: {e}")))?;

    let prompt = match input.tone.as_str() {
        "formal" => format!("Compose a formal greeting addressed to {}.", input.name),
        _ => format!("Say hi to {}!", input.name),
    };

    Ok(TemplateOutput::new(vec![TemplateMessage::user(prompt)]).describe("A greeting request"))
}
