//! DocSage — document question answering server.

use std::path::PathBuf;
use std::sync::Arc;

use docsage_chat::LLMConfig;
use docsage_core::DocSageConfig;
use docsage_runtime::Orchestrator;
use docsage_server::{build_router, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn resolve_data_dir() -> PathBuf {
    std::env::var("DOCSAGE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

fn print_help() {
    println!("DocSage — document question answering server");
    println!();
    println!("Usage: docsage [command]");
    println!();
    println!("Commands:");
    println!("  (none)                   Start the server");
    println!("  init-config [data-dir]   Write a default llm-config.json");
    println!("  help                     Show this help message");
}

/// Write an empty provider config so keys can be filled in by hand.
fn init_config(data_dir: PathBuf) -> anyhow::Result<()> {
    let config = DocSageConfig::with_defaults(&data_dir)?;
    let path = config.data_paths.llm_config_file;
    if path.exists() {
        println!("{} already exists", path.display());
        return Ok(());
    }
    LLMConfig {
        config_path: path.clone(),
        ..LLMConfig::default()
    }
    .save()?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "init-config" => {
                let data_dir = args
                    .get(2)
                    .map(PathBuf::from)
                    .unwrap_or_else(resolve_data_dir);
                return init_config(data_dir);
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            "serve" => {}
            _ => {
                eprintln!("Unknown command: {}. Use 'docsage help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = DocSageConfig::from_env(&data_dir)?;
    let port = config.port;

    let orchestrator = Orchestrator::from_config(config)?;
    let state = Arc::new(AppState::new(orchestrator));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("DocSage server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
