use async_trait::async_trait;
use tracing::instrument;

use crate::config::SURVEY_AGENT;
use crate::llm_client::SharedLlmClient;
use crate::members::SharedMemberStore;
use crate::tools::{GetUserInfoTool, ToolRegistry};

use super::conversation::Conversation;
use super::traits::{AgentBehavior, AgentRequest, AgentResponse};

/// Adaptive survey agent. Question limits and opt-out handling live in
/// the instruction text; the code only supplies member lookups.
pub struct SurveyAgent {
    conversation: Conversation,
}

impl SurveyAgent {
    pub fn new(llm_client: SharedLlmClient, members: SharedMemberStore) -> Self {
        let tools = ToolRegistry::new().with_tool(GetUserInfoTool::new(members));
        Self {
            conversation: Conversation::new(SURVEY_AGENT, llm_client, tools),
        }
    }
}

#[async_trait]
impl AgentBehavior for SurveyAgent {
    fn name(&self) -> &'static str {
        self.conversation.profile().name
    }

    fn description(&self) -> &'static str {
        self.conversation.profile().description
    }

    #[instrument(skip_all, fields(role = "survey_agent", input = %request.input))]
    async fn handle(&self, request: AgentRequest) -> anyhow::Result<AgentResponse> {
        self.conversation.respond(&request).await
    }

    async fn reset(&self) {
        self.conversation.reset().await;
    }
}
