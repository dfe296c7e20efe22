use std::env;
use std::path::PathBuf;

use crate::members::MemberStore;

/// Static identity of an agent: what it is called and what it is told.
#[derive(Debug, Clone, Copy)]
pub struct AgentProfile {
    pub name: &'static str,
    pub description: &'static str,
    pub instruction: &'static str,
}

pub const SURVEY_INSTRUCTIONS: &str = r#"You are a helpful survey agent that conducts surveys with members. Your goal is to gather information through survey questions about their preferences and experiences.

SAFETY GUARDRAILS:
1. Always validate member information before starting the survey
2. NEVER collect or store additional personal information beyond what is in the database
3. NEVER ask for sensitive financial or security information
4. NEVER share member information with other members
5. STRICTLY limit surveys to a maximum of 10 questions per session
6. IMMEDIATELY stop if the user asks to opt out or says "stop", "no", "quit", "exit"
7. Do NOT continue asking if the user seems uncomfortable or disengaged

SURVEY GUIDELINES:
1. Start by getting user information with the get_user_info tool using the member's name or ID
2. Generate survey questions one at a time based on the member's profile and previous responses
3. Ask follow-up questions relevant to their demographics and background
4. Be respectful and non-harassing; allow users to opt out at any time
5. Stop when you have sufficient information (usually after 5-7 quality responses) or when the user wants to stop
6. After each response, generate the next contextual question or conclude the survey
7. Summarize the survey findings at the end (without storing sensitive data)
8. Keep questions appropriate for all audiences, focused on preferences, experiences and general interests

STRICT LIMITS:
- Maximum 10 questions per survey
- Question counter: keep track and stop at 10
- Keep responses under 500 characters when possible
- Only reference existing member information; never request sensitive personal details"#;

pub const WEATHER_INSTRUCTIONS: &str = "You are a weather agent. When prompted with a city name, respond with the current weather information for that city using the get_weather tool. Narrate the forecast briefly: conditions, temperature, wind and what to expect over the next days.";

pub const SURVEY_AGENT: AgentProfile = AgentProfile {
    name: "survey_agent",
    description: "Survey agent that conducts adaptive surveys based on user information.",
    instruction: SURVEY_INSTRUCTIONS,
};

pub const WEATHER_AGENT: AgentProfile = AgentProfile {
    name: "weather_agent",
    description: "Weather agent that provides current weather information.",
    instruction: WEATHER_INSTRUCTIONS,
};

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub azure_api_base: Option<String>,
    pub azure_api_key: Option<String>,
    pub azure_api_version: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub model: String,
}

impl LlmSettings {
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    pub const DEFAULT_API_VERSION: &'static str = "2024-12-01-preview";

    const MODEL_VARS: [&'static str; 2] = ["SURVEY_LLM_MODEL", "AZURE_MODEL"];

    pub fn from_env() -> Self {
        Self {
            azure_api_base: read_env(&["AZURE_API_BASE"]),
            azure_api_key: read_env(&["AZURE_API_KEY"]),
            azure_api_version: read_env(&["AZURE_API_VERSION"])
                .unwrap_or_else(|| Self::DEFAULT_API_VERSION.to_string()),
            openai_api_key: read_env(&["OPENAI_API_KEY"]),
            openai_base_url: read_env(&["OPENAI_BASE_URL"]),
            model: read_env(&Self::MODEL_VARS).unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherSettings {
    pub base_url: String,
    pub http_timeout_ms: u64,
}

impl WeatherSettings {
    pub const DEFAULT_BASE_URL: &'static str = "https://wttr.in";

    pub fn from_env() -> Self {
        let http_timeout_ms = read_env(&["WEATHER_HTTP_TIMEOUT_MS"])
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(10_000);

        Self {
            base_url: read_env(&["WEATHER_BASE_URL"])
                .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
            http_timeout_ms,
        }
    }
}

/// Everything the binary reads from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct Settings {
    pub members_path: PathBuf,
    pub llm: LlmSettings,
    pub weather: WeatherSettings,
}

impl Settings {
    pub fn from_env() -> Self {
        let members_path = read_env(&["SURVEY_MEMBERS_PATH"])
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(MemberStore::DEFAULT_PATH));

        Self {
            members_path,
            llm: LlmSettings::from_env(),
            weather: WeatherSettings::from_env(),
        }
    }
}

fn read_env(candidates: &[&'static str]) -> Option<String> {
    candidates
        .iter()
        .find_map(|key| env::var(key).ok())
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_carry_their_tool_hints() {
        assert!(SURVEY_AGENT.instruction.contains("get_user_info"));
        assert!(WEATHER_AGENT.instruction.contains("get_weather"));
        assert_ne!(SURVEY_AGENT.name, WEATHER_AGENT.name);
    }

    #[test]
    fn unset_variables_read_as_none() {
        assert_eq!(read_env(&["SURVEY_AGENTS_TEST_UNSET_VARIABLE"]), None);
    }
}
