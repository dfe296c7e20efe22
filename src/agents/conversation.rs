use chrono::Utc;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::config::AgentProfile;
use crate::llm_client::{ChatTurn, SharedLlmClient};
use crate::tools::{ToolCall, ToolRegistry};

use super::traits::{AgentRequest, AgentResponse};

/// A session transcript driven by one model with a fixed set of tools.
pub struct Conversation {
    profile: AgentProfile,
    llm_client: SharedLlmClient,
    tools: ToolRegistry,
    turns: Mutex<Vec<ChatTurn>>,
}

impl Conversation {
    pub const MAX_TOOL_ROUNDS: usize = 3;
    const BUDGET_EXHAUSTED: &'static str =
        "TOOL_RESULT: tool call limit reached for this turn. Answer the user without calling tools.";
    pub const TOOL_LOOP_FALLBACK: &'static str =
        "Sorry, I couldn't finish that request. Could you rephrase or try again?";

    pub fn new(profile: AgentProfile, llm_client: SharedLlmClient, tools: ToolRegistry) -> Self {
        Self {
            profile,
            llm_client,
            tools,
            turns: Mutex::new(Vec::new()),
        }
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    fn system_prompt(&self) -> String {
        if self.tools.is_empty() {
            return self.profile.instruction.to_string();
        }
        format!("{}\n\n{}", self.profile.instruction, self.tools.catalogue())
    }

    fn tool_result_message(call: &ToolCall, result: &serde_json::Value) -> String {
        format!("TOOL_RESULT {}: {result}", call.name)
    }

    /// Run one user turn to completion, executing any tool calls the model
    /// asks for. The transcript only keeps the turn if it succeeds.
    #[instrument(skip_all, fields(agent = self.profile.name))]
    pub async fn respond(&self, request: &AgentRequest) -> anyhow::Result<AgentResponse> {
        let mut turns = self.turns.lock().await;
        let mut working = turns.clone();
        working.push(ChatTurn::user(request.input.trim()));

        let system = self.system_prompt();
        let mut calls: Vec<ToolCall> = Vec::new();
        let mut reply = self.llm_client.complete(&system, &working).await?;

        for round in 1..=Self::MAX_TOOL_ROUNDS + 1 {
            let Some(parsed) = ToolCall::parse(&reply) else {
                break;
            };
            working.push(ChatTurn::assistant(reply.clone()));

            if round > Self::MAX_TOOL_ROUNDS {
                warn!(round, "Tool call limit reached; asking for a final answer");
                working.push(ChatTurn::user(Self::BUDGET_EXHAUSTED));
                reply = self.llm_client.complete(&system, &working).await?;
                if ToolCall::parse(&reply).is_some() {
                    warn!("Model kept calling tools after the limit; replying with fallback");
                    reply = Self::TOOL_LOOP_FALLBACK.to_string();
                }
                break;
            }

            let message = match parsed {
                Ok(call) => {
                    info!(tool = %call.name, round, "Model requested a tool");
                    let result = self.tools.dispatch(&call).await;
                    let message = Self::tool_result_message(&call, &result);
                    calls.push(call);
                    message
                }
                Err(err) => {
                    warn!(%err, "Model emitted a malformed tool call");
                    format!("TOOL_RESULT error: {err}")
                }
            };

            working.push(ChatTurn::user(message));
            reply = self.llm_client.complete(&system, &working).await?;
        }

        working.push(ChatTurn::assistant(reply.clone()));
        *turns = working;

        let metadata = json!({
            "agent": self.profile.name,
            "tool_calls": calls,
            "turns": turns.len(),
            "timestamp": Utc::now().to_rfc3339(),
        });
        Ok(AgentResponse::with_metadata(reply, metadata))
    }

    pub async fn reset(&self) {
        self.turns.lock().await.clear();
    }

    #[cfg(test)]
    pub async fn transcript(&self) -> Vec<ChatTurn> {
        self.turns.lock().await.clone()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex as StdMutex};

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::config::SURVEY_AGENT;
    use crate::llm_client::{LlmClient, Role};
    use crate::tools::Tool;

    /// Replays canned replies and records every transcript it was shown.
    #[derive(Default)]
    pub(crate) struct ScriptedLlmClient {
        replies: StdMutex<VecDeque<String>>,
        pub(crate) seen: StdMutex<Vec<(String, Vec<ChatTurn>)>>,
    }

    impl ScriptedLlmClient {
        pub(crate) fn new<I, S>(replies: I) -> Arc<Self>
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Arc::new(Self {
                replies: StdMutex::new(replies.into_iter().map(Into::into).collect()),
                seen: StdMutex::new(Vec::new()),
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.seen.lock().expect("seen lock").len()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlmClient {
        async fn complete(&self, system: &str, turns: &[ChatTurn]) -> anyhow::Result<String> {
            self.seen
                .lock()
                .expect("seen lock")
                .push((system.to_string(), turns.to_vec()));
            self.replies
                .lock()
                .expect("replies lock")
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("script exhausted"))
        }
    }

    struct CountingTool;

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &'static str {
            "count"
        }

        fn description(&self) -> &'static str {
            "Counts."
        }

        fn parameters(&self) -> Value {
            json!({ "type": "object" })
        }

        async fn call(&self, _args: Value) -> Value {
            json!({ "count": 1 })
        }
    }

    fn conversation(llm: Arc<ScriptedLlmClient>) -> Conversation {
        Conversation::new(
            SURVEY_AGENT,
            llm,
            ToolRegistry::new().with_tool(CountingTool),
        )
    }

    #[tokio::test]
    async fn plain_reply_is_returned_directly() {
        let llm = ScriptedLlmClient::new(["Hello! What is your member ID?"]);
        let convo = conversation(llm.clone());

        let response = convo.respond(&AgentRequest::new(" hi ")).await.expect("reply");
        assert_eq!(response.output, "Hello! What is your member ID?");
        assert_eq!(llm.calls(), 1);

        let transcript = convo.transcript().await;
        assert_eq!(
            transcript,
            [
                ChatTurn::user("hi"),
                ChatTurn::assistant("Hello! What is your member ID?")
            ]
        );

        let (system, _) = llm.seen.lock().expect("seen")[0].clone();
        assert!(system.starts_with(SURVEY_AGENT.instruction));
        assert!(system.contains("- count: Counts."));
    }

    #[tokio::test]
    async fn tool_result_is_fed_back_to_the_model() {
        let llm = ScriptedLlmClient::new(["TOOL:COUNT {}", "Counted once."]);
        let convo = conversation(llm.clone());

        let response = convo.respond(&AgentRequest::new("count")).await.expect("reply");
        assert_eq!(response.output, "Counted once.");

        let metadata = response.metadata.expect("metadata");
        assert_eq!(metadata["tool_calls"][0]["name"], json!("count"));
        assert_eq!(metadata["agent"], json!("survey_agent"));

        let seen = llm.seen.lock().expect("seen");
        let second = &seen[1].1;
        assert_eq!(second.last().map(|t| t.role), Some(Role::User));
        assert_eq!(
            second.last().map(|t| t.content.as_str()),
            Some(r#"TOOL_RESULT count: {"count":1}"#)
        );
    }

    #[tokio::test]
    async fn malformed_tool_call_is_reported_to_the_model() {
        let llm = ScriptedLlmClient::new(["TOOL:COUNT {oops", "Sorry about that."]);
        let convo = conversation(llm.clone());

        let response = convo.respond(&AgentRequest::new("count")).await.expect("reply");
        assert_eq!(response.output, "Sorry about that.");

        let seen = llm.seen.lock().expect("seen");
        let feedback = &seen[1].1.last().expect("feedback turn").content;
        assert!(feedback.starts_with("TOOL_RESULT error:"));
    }

    #[tokio::test]
    async fn tool_rounds_are_capped() {
        let llm = ScriptedLlmClient::new([
            "TOOL:COUNT {}",
            "TOOL:COUNT {}",
            "TOOL:COUNT {}",
            "TOOL:COUNT {}",
            "Done counting.",
        ]);
        let convo = conversation(llm.clone());

        let response = convo
            .respond(&AgentRequest::new("count forever"))
            .await
            .expect("reply");
        assert_eq!(response.output, "Done counting.");
        assert_eq!(llm.calls(), Conversation::MAX_TOOL_ROUNDS + 2);

        let metadata = response.metadata.expect("metadata");
        assert_eq!(
            metadata["tool_calls"].as_array().map(Vec::len),
            Some(Conversation::MAX_TOOL_ROUNDS)
        );
    }

    #[tokio::test]
    async fn directive_after_limit_is_replaced_with_fallback() {
        let llm = ScriptedLlmClient::new([
            "TOOL:COUNT {}",
            "TOOL:COUNT {}",
            "TOOL:COUNT {}",
            "TOOL:COUNT {}",
            "TOOL:COUNT {}",
        ]);
        let convo = conversation(llm.clone());

        let response = convo
            .respond(&AgentRequest::new("count forever"))
            .await
            .expect("reply");
        assert_eq!(response.output, Conversation::TOOL_LOOP_FALLBACK);
        assert_eq!(llm.calls(), Conversation::MAX_TOOL_ROUNDS + 2);

        let transcript = convo.transcript().await;
        assert_eq!(
            transcript.last(),
            Some(&ChatTurn::assistant(Conversation::TOOL_LOOP_FALLBACK))
        );
    }

    #[tokio::test]
    async fn failed_turn_leaves_transcript_untouched() {
        let llm = ScriptedLlmClient::new(["First answer."]);
        let convo = conversation(llm);

        convo.respond(&AgentRequest::new("one")).await.expect("first");
        assert!(convo.respond(&AgentRequest::new("two")).await.is_err());
        assert_eq!(convo.transcript().await.len(), 2);

        convo.reset().await;
        assert!(convo.transcript().await.is_empty());
    }
}
