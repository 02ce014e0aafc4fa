use clap::Parser;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use theramind_core::TheramindConfig;
use theramind_memory::SqliteStore;
use theramind_reasoning::{OpenRouterClient, ReplyEngine, TurnContext};
use theramind_triage::country_from_hints;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the conversation database
    #[arg(short, long, default_value = "theramind.db")]
    db: String,

    /// Path to the TOML config file
    #[arg(short, long, default_value = "theramind.toml")]
    config: String,

    /// User id owning this session
    #[arg(short, long, default_value = "local")]
    user: String,

    /// Allow full history to be sent to the completion service.
    /// Without it, only a minimized recap of recent turns goes out.
    #[arg(long)]
    consent: bool,

    /// Two-letter country code for crisis resource lookup
    #[arg(long, env = "THERAMIND_COUNTRY")]
    country: Option<String>,

    /// Model override
    #[arg(short, long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = TheramindConfig::load_or_default(&args.config);
    if let Some(model) = args.model {
        config.llm.model = model;
    }
    if config.llm.api_key.is_none() {
        info!("No OPENROUTER_API_KEY set; every generated turn will use a canned fallback line");
    }

    info!("Opening conversation store at {}", args.db);
    let store = Arc::new(SqliteStore::new(&args.db).await?);
    let conv_id = store.current_conversation(&args.user).await?;

    let client = Arc::new(OpenRouterClient::new(config.llm.clone())?);
    let engine = ReplyEngine::new(store, client, config);

    let ctx = TurnContext {
        allow_remote_processing: args.consent,
        country: country_from_hints(args.country.as_deref(), None, None),
    };

    println!("Theramind is listening. Type a message, or 'quit' to leave.");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        let reply = engine.respond(conv_id, line, &ctx).await?;
        println!("{}", reply.text);
        if let Some(action) = &reply.action {
            println!("[action] {}", serde_json::to_string(action)?);
        }
    }

    println!("Take care. I’ll be here whenever you want to talk again.");
    Ok(())
}
