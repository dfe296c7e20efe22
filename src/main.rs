mod agents;
mod config;
mod llm_client;
mod members;
mod tools;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use agents::{AgentBehavior, AgentRequest, SurveyAgent, WeatherAgent};
use anyhow::Context;
use clap::{Parser, Subcommand};
use config::Settings;
use llm_client::build_llm_client;
use members::{MemberStore, SharedMemberStore};
use tools::{GetUserInfoTool, GetWeatherTool};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "survey-agents",
    about = "Conversational survey and weather agents backed by a member lookup tool"
)]
struct Cli {
    /// Member dataset to load (defaults to SURVEY_MEMBERS_PATH or data/members.json).
    #[arg(long, global = true)]
    members: Option<PathBuf>,

    /// Use the offline echo model when no LLM credentials are configured.
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the adaptive survey agent.
    Survey {
        /// Optional one-shot message; if omitted the CLI enters interactive mode.
        #[arg(short, long)]
        prompt: Option<String>,
    },
    /// Run the weather narration agent.
    Weather {
        /// Optional one-shot message; if omitted the CLI enters interactive mode.
        #[arg(short, long)]
        prompt: Option<String>,
    },
    /// Call get_user_info directly and print the JSON envelope.
    Lookup {
        /// Member ID (e.g. M001) or full name.
        identifier: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    if let Some(path) = cli.members {
        settings.members_path = path;
    }

    match cli.command {
        Commands::Lookup { identifier } => {
            let store = load_members(&settings);
            let response = GetUserInfoTool::new(store).get_user_info(&identifier);
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Commands::Survey { prompt } => {
            let llm_client = build_llm_client(&settings.llm, cli.offline)
                .context("LLM client initialization failed")?;
            let store = load_members(&settings);
            info!(members = store.len(), "Survey agent ready");
            let agent = SurveyAgent::new(llm_client, store);
            run_agent(&agent, prompt).await
        }
        Commands::Weather { prompt } => {
            let llm_client = build_llm_client(&settings.llm, cli.offline)
                .context("LLM client initialization failed")?;
            let tool = GetWeatherTool::new(&settings.weather)?;
            let agent = WeatherAgent::new(llm_client, tool);
            run_agent(&agent, prompt).await
        }
    }
}

fn load_members(settings: &Settings) -> SharedMemberStore {
    let store = MemberStore::load_or_empty(&settings.members_path);
    if store.is_empty() {
        warn!(
            path = %settings.members_path.display(),
            "Member dataset is empty; every lookup will report not found"
        );
    }
    Arc::new(store)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}

async fn run_agent(agent: &dyn AgentBehavior, prompt: Option<String>) -> anyhow::Result<()> {
    match prompt {
        Some(prompt) => run_single(agent, prompt).await,
        None => run_repl(agent).await,
    }
}

async fn run_single(agent: &dyn AgentBehavior, prompt: String) -> anyhow::Result<()> {
    let response = agent
        .handle(AgentRequest::new(prompt))
        .await
        .map_err(|err| {
            error!(?err, agent = agent.name(), "Agent request failed");
            err
        })?;

    println!("\n{}:\n{}\n", agent.name(), response.output);
    Ok(())
}

async fn run_repl(agent: &dyn AgentBehavior) -> anyhow::Result<()> {
    println!(
        "{} ready: {}\nType 'reset' to start over or 'exit' to quit.\n",
        agent.name(),
        agent.description()
    );
    let stdin = io::stdin();

    loop {
        print!("You > ");
        io::stdout().flush()?;

        let mut buffer = String::new();
        if stdin.read_line(&mut buffer)? == 0 {
            break;
        }
        let trimmed = buffer.trim();

        if trimmed.eq_ignore_ascii_case("exit") {
            info!("User exited CLI");
            break;
        }

        if trimmed.eq_ignore_ascii_case("reset") {
            agent.reset().await;
            println!("Session cleared.\n");
            continue;
        }

        if trimmed.is_empty() {
            continue;
        }

        run_single(agent, trimmed.to_owned()).await?;
    }

    Ok(())
}
