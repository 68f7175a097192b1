mod app;
mod cli;
mod config;

use archiver_core::SyncMode;
use archiver_engine::Scheduler;
use archiver_logging::{engine_error, engine_info, LevelFilter};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    archiver_logging::initialize(cli.log_destination(), level);

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            // Fatal: no sync loop without a usable configuration.
            engine_error!("Configuration error: {}", err);
            return Err(
                anyhow::Error::new(err).context(format!("loading {}", cli.config.display()))
            );
        }
    };
    let mode = SyncMode::from(cli.mode);
    engine_info!(
        "Loaded {} accounts, mode {:?}, output {}",
        config.accounts.len(),
        mode,
        config.output_dir.display()
    );

    let controller = app::build_controller(&config, mode)?;

    if cli.once {
        let report = controller.run_cycle(&config.accounts).await?;
        app::log_report(&report);
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if app::watch_interrupts(tokio::signal::ctrl_c, watcher).await == app::Interrupt::Forced {
            std::process::exit(130);
        }
    });

    engine_info!(
        "Monitoring every {} minutes",
        config.check_interval.as_secs() / 60
    );
    let scheduler = Scheduler::new(config.check_interval, config.retry_interval);
    let controller = &controller;
    let accounts = &config.accounts;
    let summary = scheduler
        .run(&cancel, move || async move {
            let report = controller.run_cycle(accounts).await?;
            app::log_report(&report);
            Ok::<_, archiver_engine::SyncError>(())
        })
        .await;
    engine_info!(
        "Stopped after {} cycles ({} failed)",
        summary.cycles,
        summary.failures
    );
    Ok(())
}
