// shellgate-server/src/main.rs
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt, model::*,
    service::RequestContext, transport::stdio,
};
use serde_json::{Map, Value, json};
use shellgate_core::ops::{self, Operation};
use shellgate_core::{GateConfig, GateError, Router};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Terminal and filesystem tools over MCP, routed to a local or SSH context.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Path to a shellgate TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn create_schema_object(
    properties: Vec<(&str, Value)>,
    required: Vec<&str>,
) -> Arc<Map<String, Value>> {
    let props_map: Map<String, Value> = properties
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    let req_vec: Vec<Value> = required
        .into_iter()
        .map(|s| Value::String(s.to_string()))
        .collect();
    let schema = json!({
        "type": "object",
        "properties": props_map,
        "required": req_vec
    });
    let map = match schema {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Arc::new(map)
}

fn path_property(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn tool_catalog() -> HashMap<String, Tool> {
    let definitions: Vec<(&'static str, &'static str, Arc<Map<String, Value>>)> = vec![
        (
            ops::GET_CONFIG,
            "Shows the active context and its settings, with secrets masked.",
            create_schema_object(vec![], vec![]),
        ),
        (
            ops::TERMINAL_EXEC,
            "Runs a shell command in the active context and returns its combined output.",
            create_schema_object(
                vec![
                    ("command", json!({ "type": "string", "description": "The shell command to execute." })),
                    ("cwd", path_property("Optional working directory. Defaults to the context's current directory.")),
                ],
                vec!["command"],
            ),
        ),
        (
            ops::TERMINAL_LIST_DIR,
            "Lists a directory. Local listings are JSON; remote listings are `ls -la` output.",
            create_schema_object(
                vec![(
                    "dir",
                    json!({ "type": "string", "description": "Directory to list.", "default": "." }),
                )],
                vec![],
            ),
        ),
        (
            ops::TERMINAL_READ_FILE,
            "Reads the content of a file.",
            create_schema_object(vec![("path", path_property("File to read."))], vec!["path"]),
        ),
        (
            ops::TERMINAL_WRITE_FILE,
            "Writes text to a file, creating parent directories and replacing existing content.",
            create_schema_object(
                vec![
                    ("path", path_property("File to write.")),
                    ("content", json!({ "type": "string", "description": "Text to write." })),
                ],
                vec!["path", "content"],
            ),
        ),
        (
            ops::TERMINAL_RENAME,
            "Renames or moves a file or directory.",
            create_schema_object(
                vec![
                    ("old_path", path_property("Current path.")),
                    ("new_path", path_property("New path.")),
                ],
                vec!["old_path", "new_path"],
            ),
        ),
        (
            ops::TERMINAL_REMOVE,
            "Removes a file or directory. Non-empty directories need recursive=true.",
            create_schema_object(
                vec![
                    ("path", path_property("Path to remove.")),
                    (
                        "recursive",
                        json!({ "type": "boolean", "description": "Remove directories with their contents.", "default": false }),
                    ),
                ],
                vec!["path"],
            ),
        ),
        (
            ops::TERMINAL_MKDIR,
            "Creates a directory.",
            create_schema_object(
                vec![
                    ("path", path_property("Directory to create.")),
                    (
                        "recursive",
                        json!({ "type": "boolean", "description": "Create missing parent directories.", "default": true }),
                    ),
                ],
                vec!["path"],
            ),
        ),
        (
            ops::TERMINAL_EXISTS,
            "Checks whether a path exists. Locally also reports type, size and timestamps.",
            create_schema_object(vec![("path", path_property("Path to check."))], vec!["path"]),
        ),
        (
            ops::TERMINAL_PWD,
            "Returns the current working directory of the active context.",
            create_schema_object(vec![], vec![]),
        ),
        (
            ops::TERMINAL_CD,
            "Changes the working directory of the active context.",
            create_schema_object(vec![("dir", path_property("Directory to change into."))], vec!["dir"]),
        ),
        (
            ops::SET_CONTEXT,
            "Switches the execution context. ssh config: user:password@host[:port] [/path]. github config: owner/repo.",
            create_schema_object(
                vec![
                    (
                        "type",
                        json!({ "type": "string", "enum": ["local", "ssh", "github"], "description": "Context to switch to." }),
                    ),
                    ("config", json!({ "type": "string", "description": "Context configuration string." })),
                ],
                vec!["type"],
            ),
        ),
    ];

    definitions
        .into_iter()
        .map(|(name, description, schema)| (name.to_string(), Tool::new(name, description, schema)))
        .collect()
}

#[derive(Debug, Clone)]
struct ShellGateServer {
    router: Arc<Router>,
    tools: Arc<HashMap<String, Tool>>,
}

impl ShellGateServer {
    fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            tools: Arc::new(tool_catalog()),
        }
    }

    fn sorted_tools(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self.tools.values().cloned().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Decodes and runs one tool call. Operation failures are returned as
    /// text; only unknown tools and bad arguments become protocol errors.
    async fn dispatch(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<String, McpError> {
        let op = Operation::from_tool_call(name, arguments).map_err(|e| match e {
            GateError::UnknownTool(_) => McpError::method_not_found::<CallToolRequestMethod>(),
            other => McpError::invalid_params(other.to_string(), None),
        })?;
        Ok(self.router.perform(op).await)
    }
}

impl ServerHandler for ShellGateServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "shellgate-server".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "Shell and filesystem tools. Use set_context to switch between the local machine and an SSH host."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.sorted_tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let text = self.dispatch(request.name.as_ref(), request.arguments).await?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

fn init_tracing(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries the protocol; logs go to stderr only.
    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(false);

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()
    {
        eprintln!("Failed to initialize logging: {}", e);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = GateConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let router = Router::new(&config).context("Failed to initialise the execution router")?;
    let server = ShellGateServer::new(Arc::new(router));

    let ct = CancellationToken::new();
    let shutdown = ct.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down.");
            shutdown.cancel();
        }
    });

    info!("Starting shellgate MCP server...");
    let service = server
        .serve_with_ct(stdio(), ct)
        .await
        .map_err(|e| anyhow!("Server failed to start: {}", e))?;

    match service.waiting().await {
        Ok(reason) => info!(?reason, "shellgate MCP server stopped."),
        Err(e) => error!(error = %e, "Server loop failed"),
    }

    Ok(())
}
