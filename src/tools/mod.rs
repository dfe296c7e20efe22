pub mod user_info;
pub mod weather;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, instrument, warn};

pub use user_info::GetUserInfoTool;
pub use weather::GetWeatherTool;

pub type SharedTool = Arc<dyn Tool>;

/// A function the model may call. Failures are reported inside the
/// returned JSON value, never as an `Err`, so a conversation can always
/// continue after a bad call.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the argument object.
    fn parameters(&self) -> Value;
    async fn call(&self, args: Value) -> Value;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolCallError {
    #[error("tool call is missing a tool name")]
    MissingName,
    #[error("tool arguments must be a JSON object: {0}")]
    InvalidArguments(String),
}

/// A `TOOL:<NAME> {json}` directive lifted out of model output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCall {
    pub name: String,
    pub args: Value,
}

impl ToolCall {
    pub const PREFIX: &'static str = "TOOL:";

    /// `None` when the output holds no directive at all.
    pub fn parse(output: &str) -> Option<Result<Self, ToolCallError>> {
        let idx = output.find(Self::PREFIX)?;
        Some(Self::parse_directive(&output[idx + Self::PREFIX.len()..]))
    }

    fn parse_directive(rest: &str) -> Result<Self, ToolCallError> {
        let rest = rest.trim_start();
        let name_len = rest
            .find(|c: char| c.is_whitespace() || c == '{')
            .unwrap_or(rest.len());
        let name = rest[..name_len].trim().to_lowercase();
        if name.is_empty() {
            return Err(ToolCallError::MissingName);
        }

        let json_part = rest[name_len..].trim_start();
        if json_part.is_empty() {
            return Ok(Self {
                name,
                args: json!({}),
            });
        }

        // The model sometimes trails prose after the object; read just the first value.
        let args = serde_json::Deserializer::from_str(json_part)
            .into_iter::<Value>()
            .next()
            .ok_or_else(|| ToolCallError::InvalidArguments("empty payload".into()))?
            .map_err(|err| ToolCallError::InvalidArguments(err.to_string()))?;

        if !args.is_object() {
            return Err(ToolCallError::InvalidArguments(format!(
                "expected an object, got {args}"
            )));
        }

        Ok(Self { name, args })
    }
}

/// Name-indexed set of tools offered to one agent.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, SharedTool>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool<T>(mut self, tool: T) -> Self
    where
        T: Tool + 'static,
    {
        let name = tool.name().to_lowercase();
        if self.tools.insert(name.clone(), Arc::new(tool)).is_none() {
            self.order.push(name);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    #[allow(dead_code)]
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Tool catalogue and calling convention appended to an agent's instruction.
    pub fn catalogue(&self) -> String {
        let mut text = String::from("Available tools:\n");
        for name in &self.order {
            let tool = &self.tools[name];
            text.push_str(&format!(
                "- {}: {} Arguments schema: {}\n",
                tool.name(),
                tool.description(),
                tool.parameters()
            ));
        }
        text.push_str(
            "To call a tool, respond exactly with: TOOL:<TOOL_NAME> {<json arguments>} and nothing else. \
             The result will be sent back to you as TOOL_RESULT.",
        );
        text
    }

    #[instrument(skip_all, fields(tool = %call.name))]
    pub async fn dispatch(&self, call: &ToolCall) -> Value {
        match self.tools.get(&call.name) {
            Some(tool) => {
                info!("Dispatching tool call");
                tool.call(call.args.clone()).await
            }
            None => {
                warn!("Model requested an unknown tool");
                json!({ "error": format!("Unknown tool '{}'", call.name) })
            }
        }
    }
}
