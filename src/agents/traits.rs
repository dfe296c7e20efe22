use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One user message handed to an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub input: String,
}

impl AgentRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Agent reply plus metadata describing how it was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub output: String,
    pub metadata: Option<serde_json::Value>,
}

impl AgentResponse {
    pub fn with_metadata(output: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self {
            output: output.into(),
            metadata: Some(metadata),
        }
    }
}

#[async_trait]
pub trait AgentBehavior: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn handle(&self, request: AgentRequest) -> anyhow::Result<AgentResponse>;
    /// Forget the current session so the next request starts fresh.
    async fn reset(&self);
}
