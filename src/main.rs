// ── sorng-drill – daily SFTP download drill ──────────────────────────────────

mod cli;
mod logging;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::Parser;
use sorng_sftp::sftp::progress::format_timestamp;
use sorng_sftp::sftp::{continue_after, ConsoleReporter, CycleRunner, DailyScheduler, SftpConnector};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::Cli;
use crate::logging::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, LogFormat::from_flag(cli.log_json))?;

    let config = cli.load_config()?;
    let trigger = config.validate().context("configuration rejected")?;
    info!(
        endpoint = ?config.endpoint,
        source = %config.job.source_path,
        count = config.job.repeat_count,
        "drill configured"
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping");
            interrupt.cancel();
        }
    });

    let connector = SftpConnector::new(config.endpoint.clone(), config.limits.clone());
    let reporter = ConsoleReporter::stdout(trigger.timezone());
    let runner = CycleRunner::new(connector, reporter, config.chunk_len());
    let job = config.job.clone();
    let cycle_cancel = cancel.clone();
    let cycle = Arc::new(move || runner.run(&job, &cycle_cancel));

    let scheduler = DailyScheduler::new(trigger);

    if cli.once {
        return match scheduler.fire(cycle).await {
            Some(Ok(_)) => Ok(()),
            Some(Err(failure)) => Err(failure.into()),
            None => bail!("cycle did not complete"),
        };
    }

    let next = trigger.next_after(Utc::now())?;
    println!(
        "Scheduled at: {} {} (next run {})",
        trigger.time_of_day().format("%H:%M"),
        trigger.timezone(),
        format_timestamp(next.with_timezone(&Utc), trigger.timezone())
    );

    if cli.run_now {
        continue_after(scheduler.fire(Arc::clone(&cycle)).await)?;
    }

    scheduler.run(cycle, cancel).await?;
    Ok(())
}
