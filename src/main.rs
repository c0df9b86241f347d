use std::process::ExitCode;
use std::sync::Arc;

use log::{error, info, warn};
use scout_adapters::Collaborators;
use scout_core::CancellationToken;
use scout_guard::UrlGuard;
use scoutflow::demo::{EchoModelClient, SyntheticFetcher};
use scoutflow::{open_store, run_job, AppConfig, AppError, JobReport};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("scout-runner starting");

    match run().await {
        Ok(report) => match serde_json::to_string(&report) {
            Ok(line) => {
                println!("{line}");
                ExitCode::from(report.exit_code())
            }
            Err(e) => fail(AppError::Internal(format!("report serialization: {e}"))),
        },
        Err(err) => fail(err),
    }
}

async fn run() -> Result<JobReport, AppError> {
    let config = AppConfig::from_env()?;
    let store = open_store(config.database.as_ref()).await?;
    let collaborators = Collaborators::new(Arc::new(SyntheticFetcher::new()),
                                           Arc::new(EchoModelClient::new()),
                                           UrlGuard::new(config.guard.clone()));

    // Ctrl-C / SIGINT detiene el run en el siguiente límite de etapa.
    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling at next stage boundary");
            watcher.cancel();
        }
    });

    let outcome = run_job(store, &collaborators, &config, &cancel).await?;
    Ok(JobReport::from_outcome(&outcome))
}

fn fail(err: AppError) -> ExitCode {
    error!("{}: {err}", err.category());
    eprintln!("{}", serde_json::json!({ "error": format!("{}: {err}", err.category()) }));
    ExitCode::FAILURE
}
