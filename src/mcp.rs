//! MCP JSON-RPC protocol bridge.
//!
//! Adapts the [`ToolRegistry`] to the MCP protocol, over stdio (`fsearch
//! serve stdio`) or Streamable HTTP (`/mcp` on the HTTP server).
//!
//! * **Tools** are exposed via `list_tools` / `call_tool`.
//! * **Resources**: the usage guide at `search-help://guide`.
//! * **Logging**: scan notices are sent as `notifications/message`, and
//!   per-file counts as `notifications/progress` when the client supplied a
//!   progress token.
//!
//! Progress events go through an unbounded channel to a forwarding task
//! that owns the peer handle, so the scan never waits on the client and
//! notifications keep the order the scan produced them in. The tool result
//! is returned only after the forwarder has drained the channel.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::service::{Peer, RequestContext};
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, ServiceExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::Config;
use crate::guide::{render_guide, GUIDE_NAME, GUIDE_URI};
use crate::progress::{ProgressEvent, ScanProgress};
use crate::scan::Scanner;
use crate::traits::{validate_params, ToolContext, ToolRegistry};

const LOGGER_NAME: &str = "file_search";

/// Bridges the tool registry to the MCP JSON-RPC protocol.
///
/// Each MCP session receives a clone of this struct.
#[derive(Clone)]
pub struct McpBridge {
    config: Arc<Config>,
    scanner: Scanner,
    tools: Arc<ToolRegistry>,
}

impl McpBridge {
    pub fn new(config: Arc<Config>, scanner: Scanner, tools: Arc<ToolRegistry>) -> Self {
        Self {
            config,
            scanner,
            tools,
        }
    }

    /// Convert a tool into an rmcp `Tool` descriptor.
    fn to_mcp_tool(tool: &dyn crate::traits::Tool) -> Tool {
        let input_schema: Arc<serde_json::Map<String, serde_json::Value>> =
            match tool.parameters_schema() {
                serde_json::Value::Object(map) => Arc::new(map),
                _ => Arc::new(serde_json::Map::new()),
            };

        Tool {
            name: Cow::Owned(tool.name().to_string()),
            title: None,
            description: Some(Cow::Owned(tool.description().to_string())),
            input_schema,
            output_schema: None,
            annotations: Some(ToolAnnotations::new().read_only(true)),
            execution: None,
            icons: None,
            meta: None,
        }
    }

    fn guide_resource() -> Resource {
        let mut raw = RawResource::new(GUIDE_URI, GUIDE_NAME);
        raw.description = Some("How to search files and page through directory listings".to_string());
        raw.mime_type = Some("text/markdown".to_string());
        raw.no_annotation()
    }
}

/// Serve MCP over stdin/stdout until the client disconnects.
pub async fn run_stdio(bridge: McpBridge) -> anyhow::Result<()> {
    info!("MCP server running on stdio");
    let service = bridge.serve(rmcp::transport::stdio()).await?;
    let reason = service.waiting().await?;
    info!(?reason, "MCP stdio session ended");
    Ok(())
}

// ── Progress forwarding ──────────────────────────────────────────────────

/// [`ScanProgress`] sink that queues events for the forwarding task.
struct ChannelProgress {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ScanProgress for ChannelProgress {
    fn report(&self, event: ProgressEvent) {
        // The receiver only goes away when the client is gone.
        let _ = self.tx.send(event);
    }
}

/// JSON form of a progress event as an MCP notification, or `None` when
/// there is nothing to send (file counts without a progress token).
fn notification_json(event: &ProgressEvent, token: Option<&serde_json::Value>) -> Option<(bool, serde_json::Value)> {
    match event {
        ProgressEvent::Files { processed, total } => token.map(|token| {
            (
                true,
                serde_json::json!({
                    "progressToken": token,
                    "progress": processed,
                    "total": total,
                }),
            )
        }),
        ProgressEvent::Notice { level, message } => Some((
            false,
            serde_json::json!({
                "level": level.as_str(),
                "logger": LOGGER_NAME,
                "data": message,
            }),
        )),
    }
}

async fn forward_progress(
    peer: Peer<RoleServer>,
    token: Option<serde_json::Value>,
    mut rx: mpsc::UnboundedReceiver<ProgressEvent>,
) {
    while let Some(event) = rx.recv().await {
        let Some((is_progress, body)) = notification_json(&event, token.as_ref()) else {
            continue;
        };
        let sent = if is_progress {
            match serde_json::from_value::<ProgressNotificationParam>(body) {
                Ok(param) => peer.notify_progress(param).await.map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            }
        } else {
            match serde_json::from_value::<LoggingMessageNotificationParam>(body) {
                Ok(param) => peer
                    .notify_logging_message(param)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            }
        };
        if let Err(e) = sent {
            debug!(error = %e, "dropping MCP notification");
        }
    }
}

impl ServerHandler for McpBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_logging()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "file-search".to_string(),
                title: Some("File Search".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Keyword search over slide decks, PDFs, Word documents and text files. \
                 Use search_files to find documents containing a keyword, \
                 get_directory_listing to page through a directory, and \
                 get_supported_file_types to see what can be searched. \
                 Read search-help://guide for usage tips."
                    .to_string(),
            ),
        }
    }

    // ── Tools ────────────────────────────────────────────────────────────

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = self
            .tools
            .tools()
            .iter()
            .map(|t| Self::to_mcp_tool(t.as_ref()))
            .collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.tools.find(name).map(Self::to_mcp_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool = self.tools.find(&request.name).ok_or_else(|| {
            McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {}", request.name),
                None,
            )
        })?;

        let params = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));
        let params = match validate_params(&tool.parameters_schema(), &params) {
            Ok(p) => p,
            Err(e) => return Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        };

        let token = context
            .meta
            .get_progress_token()
            .and_then(|t| serde_json::to_value(t).ok());
        let (tx, rx) = mpsc::unbounded_channel();
        let forwarder = tokio::spawn(forward_progress(context.peer.clone(), token, rx));

        let ctx = ToolContext::new(self.config.clone(), self.scanner.clone())
            .with_progress(Arc::new(ChannelProgress { tx }));
        let outcome = tool.execute(params, &ctx).await;
        drop(ctx);
        if let Err(e) = forwarder.await {
            debug!(error = %e, "progress forwarder ended abnormally");
        }

        match outcome {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_default();
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }

    // ── Resources ────────────────────────────────────────────────────────

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListResourcesResult::with_all_items(vec![
            Self::guide_resource(),
        ])))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        if request.uri != GUIDE_URI {
            return Err(McpError::resource_not_found(
                format!("no resource with uri: {}", request.uri),
                None,
            ));
        }
        let text = render_guide(self.scanner.registry(), &self.config.listing);
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, GUIDE_URI)],
        })
    }
}
