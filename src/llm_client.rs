use std::sync::Arc;

use anyhow::{bail, Context};
use async_openai::config::{AzureConfig, Config, OpenAIConfig};
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client as AsyncOpenAiClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::LlmSettings;

pub type SharedLlmClient = Arc<dyn LlmClient>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One non-system message of a conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: &str, turns: &[ChatTurn]) -> anyhow::Result<String>;
}

/// Offline stand-in used when no model credentials are configured.
#[derive(Debug, Default, Clone)]
pub struct EchoLlmClient;

#[async_trait]
impl LlmClient for EchoLlmClient {
    async fn complete(&self, _system: &str, turns: &[ChatTurn]) -> anyhow::Result<String> {
        let last = turns
            .iter()
            .rev()
            .find(|turn| turn.role == Role::User)
            .map(|turn| turn.content.as_str())
            .unwrap_or_default();
        Ok(format!(
            "[offline agent response]\nI received: {last}\nSet AZURE_API_KEY or OPENAI_API_KEY to talk to a model."
        ))
    }
}

impl EchoLlmClient {
    pub fn shared() -> SharedLlmClient {
        Arc::new(Self)
    }
}

/// Chat-completions client for Azure deployments or any OpenAI-compatible endpoint.
pub struct OpenAiLlmClient<C: Config> {
    client: AsyncOpenAiClient<C>,
    model: String,
}

impl<C> OpenAiLlmClient<C>
where
    C: Config + Send + Sync + 'static,
{
    const TEMPERATURE: f32 = 0.2;

    pub fn new(config: C, model: impl Into<String>) -> Self {
        Self {
            client: AsyncOpenAiClient::with_config(config),
            model: model.into(),
        }
    }

    fn build_messages(
        system: &str,
        turns: &[ChatTurn],
    ) -> anyhow::Result<Vec<ChatCompletionRequestMessage>> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(turns.len() + 1);
        messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()?
                .into(),
        );

        for turn in turns {
            let message: ChatCompletionRequestMessage = match turn.role {
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(turn.content.as_str())
                    .build()?
                    .into(),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(turn.content.clone())
                    .build()?
                    .into(),
            };
            messages.push(message);
        }

        Ok(messages)
    }

    #[instrument(level = "debug", skip_all, fields(model = %self.model, turns = turns.len()))]
    async fn chat(&self, system: &str, turns: &[ChatTurn]) -> anyhow::Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(Self::TEMPERATURE)
            .messages(Self::build_messages(system, turns)?)
            .build()?;

        let response = self.client.chat().create(request).await?;
        let choice = response
            .choices
            .first()
            .context("LLM response did not contain any choices")?;

        let output = choice
            .message
            .content
            .clone()
            .unwrap_or_else(|| String::from("[empty LLM response]"));

        Ok(output)
    }
}

#[async_trait]
impl<C> LlmClient for OpenAiLlmClient<C>
where
    C: Config + Send + Sync + 'static,
{
    async fn complete(&self, system: &str, turns: &[ChatTurn]) -> anyhow::Result<String> {
        self.chat(system, turns).await
    }
}

fn shared_from_settings(settings: &LlmSettings) -> anyhow::Result<SharedLlmClient> {
    if let (Some(api_base), Some(api_key)) = (&settings.azure_api_base, &settings.azure_api_key) {
        let config = AzureConfig::new()
            .with_api_base(api_base)
            .with_api_key(api_key)
            .with_api_version(&settings.azure_api_version)
            .with_deployment_id(&settings.model);
        tracing::debug!(model = %settings.model, "Using Azure chat deployment");
        return Ok(Arc::new(OpenAiLlmClient::new(config, &settings.model)));
    }

    let Some(api_key) = &settings.openai_api_key else {
        bail!("Set AZURE_API_BASE + AZURE_API_KEY (or OPENAI_API_KEY) to use a language model");
    };

    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(base_url) = &settings.openai_base_url {
        config = config.with_api_base(base_url);
    }
    Ok(Arc::new(OpenAiLlmClient::new(config, &settings.model)))
}

/// Build a model client from settings, optionally falling back to the echo client.
pub fn build_llm_client(
    settings: &LlmSettings,
    default_to_echo: bool,
) -> anyhow::Result<SharedLlmClient> {
    match shared_from_settings(settings) {
        Ok(client) => Ok(client),
        Err(err) if default_to_echo => {
            tracing::warn!(?err, "Falling back to EchoLlmClient");
            Ok(EchoLlmClient::shared())
        }
        Err(err) => Err(err),
    }
}
