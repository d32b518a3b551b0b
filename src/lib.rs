pub mod cli;
pub mod client;
pub mod llm;
pub mod models;
pub mod relay;
pub mod server;
pub mod storage;

use cli::Args;
use log::info;
use relay::Relay;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Relay Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!(
        "Chat Model: {}",
        args.chat_model.as_deref().unwrap_or(llm::chat::groq::DEFAULT_MODEL)
    );
    info!(
        "Groq API Key Configured: {}",
        args.groq_api_key.as_deref().map(|k| !k.trim().is_empty()).unwrap_or(false)
    );
    info!("Custom System Prompt: {}", args.system_prompt.is_some());
    info!("TLS Enabled: {}", args.enable_tls);
    info!("---------------------------");

    let relay = Arc::new(Relay::from_args(&args)?);
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, relay, args);
    server.run().await?;

    Ok(())
}
