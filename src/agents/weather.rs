use async_trait::async_trait;
use tracing::instrument;

use crate::config::WEATHER_AGENT;
use crate::llm_client::SharedLlmClient;
use crate::tools::{GetWeatherTool, ToolRegistry};

use super::conversation::Conversation;
use super::traits::{AgentBehavior, AgentRequest, AgentResponse};

pub struct WeatherAgent {
    conversation: Conversation,
}

impl WeatherAgent {
    pub fn new(llm_client: SharedLlmClient, weather: GetWeatherTool) -> Self {
        let tools = ToolRegistry::new().with_tool(weather);
        Self {
            conversation: Conversation::new(WEATHER_AGENT, llm_client, tools),
        }
    }
}

#[async_trait]
impl AgentBehavior for WeatherAgent {
    fn name(&self) -> &'static str {
        self.conversation.profile().name
    }

    fn description(&self) -> &'static str {
        self.conversation.profile().description
    }

    #[instrument(skip_all, fields(role = "weather_agent", input = %request.input))]
    async fn handle(&self, request: AgentRequest) -> anyhow::Result<AgentResponse> {
        self.conversation.respond(&request).await
    }

    async fn reset(&self) {
        self.conversation.reset().await;
    }
}
