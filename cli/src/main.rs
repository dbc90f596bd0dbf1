//! Cadenza CLI: serve the HTTP/SSE API or chat from the terminal.

mod logging;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_stream::StreamExt;

use cadenza::{
    AgentConfig, AgentEvent, CachedStore, HttpCrmClient, OpenRouterClient, SalesAgent,
    SqliteStore,
};
use config::Settings;

#[derive(Parser)]
#[command(name = "cadenza", about = "Conversational sales-development assistant")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP/SSE server.
    Serve {
        /// Bind address (overrides config).
        #[arg(long)]
        addr: Option<String>,
    },
    /// Send one message and print the event stream.
    Chat {
        message: String,
        /// Session to continue; a fresh one is used when omitted.
        #[arg(long, default_value = "cli-session")]
        session: String,
        /// Model override for this turn.
        #[arg(long)]
        model: Option<String>,
    },
    /// List stored sessions.
    Sessions,
}

fn build_agent(settings: &Settings) -> Result<SalesAgent, Box<dyn std::error::Error + Send + Sync>> {
    let llm = Arc::new(OpenRouterClient::with_base_url(
        settings.openrouter_api_key.clone(),
        settings.openrouter_base_url.clone(),
    ));
    let crm = Arc::new(HttpCrmClient::new(
        settings.crm_base_url.clone(),
        settings.crm_token.clone(),
        "default",
    ));
    let store = Arc::new(CachedStore::new(Arc::new(SqliteStore::new(
        &settings.database_path,
    )?)));
    let agent_config = AgentConfig {
        model: settings.model.clone(),
        compression: cadenza::CompressionConfig {
            max_total_tokens: settings.compression_max_tokens,
            ..Default::default()
        },
        ..Default::default()
    };
    Ok(SalesAgent::new(llm, crm, store, agent_config)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    config::load_env();
    logging::init();

    let cli = Cli::parse();
    let settings = Settings::load()?;
    let agent = build_agent(&settings)?;

    match cli.command {
        Command::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| settings.bind_addr.clone());
            serve::run_serve(Some(&addr), agent).await?;
        }
        Command::Chat {
            message,
            session,
            model,
        } => {
            let mut stream = agent.chat(message, session, model);
            while let Some(event) = stream.next().await {
                print_event(&event);
            }
        }
        Command::Sessions => {
            for session in agent.list_sessions().await? {
                println!("{}\t{}", session.session_id, session.title);
            }
        }
    }
    Ok(())
}

fn print_event(event: &AgentEvent) {
    match event {
        AgentEvent::Connected { session_id, model } => {
            println!("connected: session={session_id} model={model}");
        }
        AgentEvent::TitleUpdateTriggered { .. } => println!("(title refresh queued)"),
        AgentEvent::PlanReview {
            plan_id, message, ..
        } => {
            println!("plan review required: {message}");
            println!("  approve with: APPROVE_PLAN:{plan_id}");
        }
        AgentEvent::Progress { progress, .. } => {
            println!(
                "  [{}] {:?} {}",
                progress.step_id, progress.status, progress.message
            );
        }
        AgentEvent::Result { result } => {
            println!("{}", result.message);
            if !result.suggested_actions.is_empty() {
                println!("next: {}", result.suggested_actions.join(" | "));
            }
        }
        AgentEvent::Done { .. } => println!("done"),
        AgentEvent::Error { error, message } => eprintln!("error: {message} ({error})"),
    }
}
