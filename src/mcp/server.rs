//! MCP server implementation using pmcp (Pragmatic AI's rust-mcp-sdk).
//!
//! This module provides the MCP server implementation using the pmcp crate
//! for proper JSON-RPC handling over stdio and HTTP/SSE.
//!
//! Tool failures are reported as protocol errors whose message is the JSON
//! encoding of a [`ToolError`]: `invalid_params` for rejected requests,
//! `internal` for failures after dispatch.

use crate::bridge::TranslationBridge;
use crate::error::ToolError;
use crate::mcp::tools::ToolRegistry;
use async_trait::async_trait;
use pmcp::{
    server::streamable_http_server::StreamableHttpServer,
    Error, RequestHandlerExtra, Server, ServerCapabilities, ToolHandler, ToolInfo,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// The MCP server for BabelDOC translation
///
/// This server exposes `translate_pdf` and `get_translation_status` over
/// stdio or streamable HTTP.
#[derive(Debug, Clone)]
pub struct McpServer {
    server: Arc<Mutex<Server>>,
    tool_names: Vec<String>,
}

impl McpServer {
    /// Create a new MCP server backed by the given bridge
    pub fn new(bridge: Arc<TranslationBridge>) -> Result<Self, pmcp::Error> {
        let tools = ToolRegistry::from_bridge(bridge);
        let mut tool_names: Vec<String> = tools.all().iter().map(|t| t.name.clone()).collect();
        tool_names.sort();

        let server = Self::build_server_impl(tools)?;
        Ok(Self {
            server: Arc::new(Mutex::new(server)),
            tool_names,
        })
    }

    /// Names of the registered tools, sorted
    pub fn tool_names(&self) -> &[String] {
        &self.tool_names
    }

    /// Build the MCP server with tool handlers (internal implementation)
    fn build_server_impl(tools: ToolRegistry) -> Result<Server, pmcp::Error> {
        let mut builder = Server::builder()
            .name("babeldoc-mcp")
            .version(env!("CARGO_PKG_VERSION"))
            .capabilities(ServerCapabilities::default());

        for tool in tools.all() {
            let tool_handler = ToolWrapper {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                input_schema: tool.input_schema.clone(),
                handler: tool.handler.clone(),
            };
            builder = builder.tool(tool_handler.name.clone(), tool_handler);
        }

        builder.build()
    }

    /// Run the server in stdio mode (for Claude Desktop and other MCP clients)
    pub async fn run(self) -> Result<(), pmcp::Error> {
        tracing::info!("Starting MCP server in stdio mode");

        // run_stdio() takes ownership of the Server
        let server = Arc::try_unwrap(self.server)
            .map_err(|_| Error::internal("Cannot unwrap Arc - multiple references exist"))?
            .into_inner();

        tracing::info!(tools = ?self.tool_names, "MCP server initialized");

        server.run_stdio().await
    }

    /// Run the server in HTTP/SSE mode
    pub async fn run_http(&self, addr: &str) -> Result<(SocketAddr, JoinHandle<()>), pmcp::Error> {
        tracing::info!("Starting MCP server in HTTP/SSE mode on {}", addr);

        let socket_addr = parse_addr(addr)?;
        let http_server = StreamableHttpServer::new(socket_addr, self.server.clone());
        http_server.start().await
    }
}

fn parse_addr(addr: &str) -> Result<SocketAddr, pmcp::Error> {
    addr.parse()
        .map_err(|e| Error::invalid_params(format!("Invalid address: {}", e)))
}

/// Map a tool failure onto a protocol error
fn to_protocol_error(err: &ToolError) -> Error {
    let message = err.to_json();
    if err.validation {
        Error::invalid_params(message)
    } else {
        Error::internal(&message)
    }
}

/// Wrapper for adapting our Tool to pmcp's ToolHandler
#[derive(Clone)]
struct ToolWrapper {
    name: String,
    description: Option<String>,
    input_schema: Value,
    handler: Arc<dyn crate::mcp::tools::ToolHandler>,
}

#[async_trait]
impl ToolHandler for ToolWrapper {
    async fn handle(&self, args: Value, _extra: RequestHandlerExtra) -> Result<Value, Error> {
        self.handler.execute(args).await.map_err(|e| {
            tracing::debug!(tool = %self.name, kind = %e.kind, "Tool call failed");
            to_protocol_error(&e)
        })
    }

    fn metadata(&self) -> Option<ToolInfo> {
        Some(ToolInfo::new(
            self.name.clone(),
            self.description.clone(),
            self.input_schema.clone(),
        ))
    }
}
