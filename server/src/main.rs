use clap::Parser;
use common::config::{ConfigManager, FileContentConfigProvider};
use common::logger;
use nrow_server::ServerError;
use nrow_server::cleanup_task::CleanupTask;
use nrow_server::game_service::GameService;
use nrow_server::server_config::ServerConfig;
use nrow_server::web_server::run_web_server;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "nrow_server")]
struct Args {
    #[arg(long, default_value = "server_config.yaml")]
    config: String,

    /// Overrides the bind address from the config file.
    #[arg(long)]
    bind: Option<String>,

    #[arg(long)]
    use_log_prefix: bool,
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let args = Args::parse();

    let config_manager = ConfigManager::<FileContentConfigProvider, ServerConfig>::from_yaml_file(&args.config);
    let config = config_manager.get_config()?;

    let prefix = args.use_log_prefix.then(|| "Server".to_string());
    logger::init_logger(prefix, &config.log_level);

    let bind_address = args.bind.unwrap_or_else(|| config.bind_address.clone());
    info!(
        "Inactivity timeout {}s, config {}",
        config.inactivity_timeout_secs, args.config
    );

    let service = GameService::new(config.inactivity_timeout());

    if let Some(interval) = config.cleanup_interval() {
        let cleanup_task = CleanupTask::new(service.clone(), interval);
        tokio::spawn(async move {
            cleanup_task.run().await;
        });
    }

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    run_web_server(service, &bind_address, shutdown_signal).await?;

    info!("Server shut down gracefully");
    Ok(())
}
