//! Tool-dispatch surface
//!
//! `dispatch` is the transport-neutral contract; `ToolServer` wraps it in a
//! small HTTP API.

pub mod tools;

use anyhow::Result;
use axum::{
    extract::State,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::error::FioriError;
use crate::metadata::Metadata;
use crate::report::CommandReport;
use crate::runner::{execute_report, Command, Session};

pub use tools::{generate_tools, ToolDescriptor};

pub const DEFAULT_PORT: u16 = 3000;

/// A tool invocation: tool name plus its argument object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

fn to_command(call: &ToolCall) -> Result<Command> {
    let mut object = match &call.arguments {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => anyhow::bail!("arguments must be an object, got {}", other),
    };
    object.insert("command".to_string(), Value::String(call.name.clone()));
    Ok(serde_json::from_value(Value::Object(object))?)
}

/// Map a tool call onto a command and run it
pub async fn dispatch(session: &mut Session, call: ToolCall) -> CommandReport {
    let known = crate::parser::command_names().any(|n| n == call.name);
    if !known {
        let err = FioriError::not_found(
            "tool",
            call.name.clone(),
            crate::parser::command_names().map(str::to_string).collect(),
        );
        return CommandReport::from_result(&call.name, Err(err.into()), 0);
    }

    match to_command(&call) {
        Ok(command) => execute_report(session, &command).await,
        Err(e) => {
            warn!("Rejected call to {}: {:#}", call.name, e);
            CommandReport::from_result(&call.name, Err(e.context("invalid arguments")), 0)
        }
    }
}

/// Tool list for the session's metadata; empty enums before extraction
pub fn session_tools(session: &mut Session) -> Vec<ToolDescriptor> {
    let metadata = session.metadata().unwrap_or_else(|e| {
        info!("Serving tools without metadata: {:#}", e);
        Metadata::default()
    });
    generate_tools(&metadata)
}

struct ServerState {
    // One caller drives the page at a time
    session: Mutex<Session>,
}

pub struct ToolServer {
    port: u16,
}

impl ToolServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub fn router(session: Session) -> Router {
        let state = Arc::new(ServerState {
            session: Mutex::new(session),
        });
        Router::new()
            .route("/health", get(health))
            .route("/tools", get(list_tools))
            .route("/tools/call", post(call_tool))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    pub async fn start(&self, session: Session) -> Result<()> {
        let app = Self::router(session);
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));

        println!("\n🚀 Tool server started!");
        println!("   Tools: http://localhost:{}/tools", self.port);
        println!("   Call:  POST http://localhost:{}/tools/call", self.port);
        println!("\n   Press Ctrl+C to stop.\n");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_tools(State(state): State<Arc<ServerState>>) -> Json<Vec<ToolDescriptor>> {
    let mut session = state.session.lock().await;
    Json(session_tools(&mut session))
}

async fn call_tool(
    State(state): State<Arc<ServerState>>,
    Json(call): Json<ToolCall>,
) -> Json<CommandReport> {
    let started = Instant::now();
    let mut session = state.session.lock().await;
    let report = dispatch(&mut session, call).await;
    info!("{} finished in {}ms", report.command, started.elapsed().as_millis());
    Json(report)
}
