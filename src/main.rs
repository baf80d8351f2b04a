use anyhow::Context;
use clap::Parser;
use repo_export::config::ensure_data_dir;
use repo_export::utils::error::{ExportError, ErrorSeverity};
use repo_export::utils::{logger, validation::Validate};
use repo_export::{CliConfig, ConfigProvider, DockerRuntime, ExportSettings, Exporter, TomlConfig};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting repo-export");

    let (settings, bind) = match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            let config = TomlConfig::from_file(path).unwrap_or_else(|e| exit_with(&e));
            check_config(&config);
            (ExportSettings::from_config(&config), config.bind_addr().to_string())
        }
        None => {
            check_config(&cli);
            (ExportSettings::from_config(&cli), cli.bind_addr().to_string())
        }
    };
    tracing::debug!("Export settings: {:?}", settings);

    let runtime = DockerRuntime::connect().unwrap_or_else(|e| exit_with(&e));
    let exporter = Arc::new(Exporter::new(Arc::new(runtime), settings));

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    tracing::info!(
        "Serving {} on http://{}",
        exporter.settings().repo_url,
        listener.local_addr()?
    );

    repo_export::serve(listener, exporter, shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Shut down");
    Ok(())
}

fn check_config<C: ConfigProvider + Validate>(config: &C) {
    if let Err(e) = config.validate() {
        exit_with(&e);
    }
    if let Err(e) = ensure_data_dir(config.data_dir()) {
        exit_with(&e);
    }
    tracing::info!("✅ Configuration loaded and validated successfully");
}

fn exit_with(e: &ExportError) -> ! {
    tracing::error!(
        "❌ Startup failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e);
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
