//! Tool extension point shared by the HTTP API and the MCP bridge.
//!
//! Every operation the service exposes is a [`Tool`]: a name, a
//! description, a JSON Schema for its parameters, and an async `execute`.
//! The [`ToolRegistry`] holds them in registration order, and both
//! transports dispatch through it.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                ToolRegistry                  │
//! │  search_files · get_directory_listing ·      │
//! │  get_supported_file_types · (custom tools)   │
//! └──────────────┬───────────────────────────────┘
//!                ▼
//!     server.rs (HTTP)        mcp.rs (JSON-RPC)
//! ```
//!
//! # Usage
//!
//! ```rust
//! use file_search::traits::ToolRegistry;
//!
//! let mut tools = ToolRegistry::with_builtins();
//! // tools.register(Box::new(MyTool::new()));
//! assert!(tools.find("search_files").is_some());
//! ```

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::Config;
use crate::directory::{get_directory_listing, ListingQuery};
use crate::progress::{LogProgress, ScanProgress};
use crate::registry::ExtractorRegistry;
use crate::scan::Scanner;
use crate::search::{search_files, RequestError, SearchQuery};

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

/// An operation that agents can discover and call.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use serde_json::{json, Value};
/// use file_search::traits::{Tool, ToolContext};
///
/// pub struct CountTypesTool;
///
/// #[async_trait]
/// impl Tool for CountTypesTool {
///     fn name(&self) -> &str { "count_types" }
///     fn description(&self) -> &str { "Count registered file types" }
///
///     fn parameters_schema(&self) -> Value {
///         json!({ "type": "object", "properties": {} })
///     }
///
///     async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
///         Ok(json!({ "count": ctx.registry().len() }))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Route name (`POST /tools/{name}`) and MCP tool name.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn is_builtin(&self) -> bool {
        false
    }

    /// JSON Schema of the parameters object.
    fn parameters_schema(&self) -> Value;

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

/// Serializable tool info for the `/tools/list` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub builtin: bool,
    pub parameters: Value,
}

impl ToolInfo {
    pub fn of(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            builtin: tool.is_builtin(),
            parameters: tool.parameters_schema(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// ToolContext
// ═══════════════════════════════════════════════════════════════════════

/// Everything a tool call may use: configuration, the scanner (and its
/// extractor registry), and where to send progress.
#[derive(Clone)]
pub struct ToolContext {
    config: Arc<Config>,
    scanner: Scanner,
    progress: Arc<dyn ScanProgress>,
}

impl ToolContext {
    /// Progress goes to the tracing log until [`with_progress`](Self::with_progress) replaces it.
    pub fn new(config: Arc<Config>, scanner: Scanner) -> Self {
        Self {
            config,
            scanner,
            progress: Arc::new(LogProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ScanProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        self.scanner.registry()
    }

    pub fn progress(&self) -> &dyn ScanProgress {
        self.progress.as_ref()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Parameter handling
// ═══════════════════════════════════════════════════════════════════════

/// Check `params` against a tool's schema and inject declared defaults.
///
/// JSON `null` counts as an absent value.
pub fn validate_params(schema: &Value, params: &Value) -> Result<Value> {
    let mut params_obj = match params {
        Value::Object(map) => map.clone(),
        Value::Null => serde_json::Map::new(),
        other => bail!("invalid parameters: expected an object, got {}", json_type_name(other)),
    };
    params_obj.retain(|_, v| !v.is_null());

    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();
    let required: Vec<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    for field in required {
        if !params_obj.contains_key(field) {
            bail!("invalid parameters: missing required parameter: {}", field);
        }
    }

    let mut result = params_obj.clone();
    for (name, prop) in &properties {
        match params_obj.get(name) {
            Some(value) => {
                if let Some(expected) = prop.get("type").and_then(|t| t.as_str()) {
                    let ok = match expected {
                        "string" => value.is_string(),
                        "integer" => value.is_i64() || value.is_u64(),
                        "number" => value.is_number(),
                        "boolean" => value.is_boolean(),
                        "array" => value.is_array(),
                        "object" => value.is_object(),
                        _ => true,
                    };
                    if !ok {
                        bail!(
                            "invalid parameters: '{}' must be of type '{}', got {}",
                            name,
                            expected,
                            json_type_name(value)
                        );
                    }
                }
            }
            None => {
                if let Some(default) = prop.get("default") {
                    result.insert(name.clone(), default.clone());
                }
            }
        }
    }
    Ok(Value::Object(result))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `{error, traceback}` payload for unexpected failures.
pub fn error_payload(context: &str, err: &anyhow::Error) -> Value {
    serde_json::json!({
        "error": format!("{}: {}", context, err),
        "traceback": format!("{:?}", err),
    })
}

/// Map a request outcome to the tool's JSON result.
///
/// Parameter errors stay `Err` so transports can reject the call; a missing
/// directory and unexpected faults become error payloads.
fn into_tool_result<T: Serialize>(context: &str, outcome: Result<T>) -> Result<Value> {
    match outcome {
        Ok(value) => Ok(serde_json::to_value(value)?),
        Err(e) => match e.downcast_ref::<RequestError>() {
            Some(RequestError::NoValidDirectory) => Ok(serde_json::json!({ "error": e.to_string() })),
            Some(_) => Err(e),
            None => {
                tracing::error!(error = ?e, "{}", context);
                Ok(error_payload(context, &e))
            }
        },
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Tool Implementations
// ═══════════════════════════════════════════════════════════════════════

pub struct SearchFilesTool;

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        "Search slide decks, PDFs, Word documents and text files for a keyword (whole word, case-insensitive)"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "keywords": { "type": "string", "description": "Keyword to search for" },
                "directory": { "type": "string", "description": "Directory to search (default: all configured directories)" },
                "file_type": { "type": "string", "description": "Only search this type, e.g. \"pdf\" or \"word\"" }
            },
            "required": ["keywords"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let query: SearchQuery = serde_json::from_value(params)
            .map_err(|e| RequestError::InvalidParameter(e.to_string()))?;
        let outcome = search_files(ctx.config(), ctx.scanner(), query, ctx.progress()).await;
        into_tool_result("search failed", outcome)
    }
}

pub struct GetDirectoryListingTool;

#[async_trait]
impl Tool for GetDirectoryListingTool {
    fn name(&self) -> &str {
        "get_directory_listing"
    }

    fn description(&self) -> &str {
        "List one page of the supported files in a directory"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Directory to list (default: first configured directory)" },
                "page": { "type": "integer", "description": "Page number, starting at 1", "default": 1 },
                "limit": { "type": "integer", "description": "Files per page" },
                "file_type": { "type": "string", "description": "Only list this type" }
            }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let query: ListingQuery = serde_json::from_value(params)
            .map_err(|e| RequestError::InvalidParameter(e.to_string()))?;
        let outcome = get_directory_listing(ctx.config(), ctx.registry(), query, ctx.progress()).await;
        into_tool_result("directory listing failed", outcome)
    }
}

pub struct GetSupportedFileTypesTool;

#[async_trait]
impl Tool for GetSupportedFileTypesTool {
    fn name(&self) -> &str {
        "get_supported_file_types"
    }

    fn description(&self) -> &str {
        "List the file types and extensions that can be searched"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
        Ok(serde_json::json!({
            "supported_file_types": ctx.registry().supported_file_types()
        }))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SearchFilesTool));
        registry.register(Box::new(GetDirectoryListingTool));
        registry.register(Box::new(GetSupportedFileTypesTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
