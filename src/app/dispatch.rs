use super::runtime::Runtime;
use crate::cli::chat;
use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::gateway::{self, AppState};
use crate::ui::style;
use anyhow::Result;
use std::sync::Arc;

pub async fn dispatch(cli: Cli, mut config: Config) -> Result<()> {
    match cli.command {
        Commands::Chat { message, model } => {
            if let Some(model) = model {
                config.agent.model = model;
            }
            let runtime = Runtime::load_tools(&config).await?;
            let sessions = runtime.session_manager(&config)?;
            let result = chat::run_chat(&sessions, message).await;
            sessions.shutdown().await;
            runtime.shutdown().await;
            result
        }
        Commands::Serve { port, host } => {
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            let runtime = Runtime::load_tools(&config).await?;
            let state = AppState {
                sessions: Arc::new(runtime.session_manager(&config)?),
                registry: Arc::clone(runtime.registry()),
            };
            let result =
                gateway::run_gateway(&host, port, config.gateway.allow_public_bind, state).await;
            runtime.shutdown().await;
            result
        }
        Commands::Tools { json } => {
            let runtime = Runtime::load_tools(&config).await?;
            let descriptors = runtime.registry().descriptors();
            if json {
                println!("{}", serde_json::to_string_pretty(&descriptors)?);
            } else {
                for tool in &descriptors {
                    let risk = if tool.mutating {
                        style::warn("requires approval")
                    } else {
                        style::dim("read-only")
                    };
                    println!("{} {risk}", style::accent(format!("{:<24}", tool.name)));
                    println!("  {}", tool.description);
                }
            }
            runtime.shutdown().await;
            Ok(())
        }
        Commands::Replay { path } => chat::replay(&path).await,
    }
}
