pub mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;

use common::logger::init_tracing;
use slotboard::{
    BatchClassification, BatchError, BatchOperationResult, ListingWindow, RequestContext,
    SlotService,
    config::AppConfig,
    db::Db,
    metrics::counters::Counters,
    slot::{repository_sqlx::SqlxSlotRepository, store::SlotStore},
    time::SystemClock,
};

use cli::*;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut cfg = AppConfig::from_env();
    if let Some(url) = cli.database_url.clone() {
        cfg.database_url = url;
    }

    init_tracing("slotboard", cfg.log_json);

    let db = Db::connect(&cfg.database_url).await?;
    db.migrate().await?;

    if let Command::Seed = cli.command {
        let inserted = db.seed().await?;
        println!("{}", serde_json::json!({ "inserted": inserted }));
        return Ok(ExitCode::SUCCESS);
    }

    let service = build_service(&db, &cfg);
    let ctx = RequestContext::new(cli.actor.clone());

    match cli.command {
        Command::Seed => Ok(ExitCode::SUCCESS),
        Command::Status { ids } => {
            let rows = service.get_multiple_slots_status(&ctx, &ids_or_all(ids)).await;
            match rows {
                Ok(rows) => {
                    print_json(&rows)?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => Ok(request_failed(e)),
            }
        }
        Command::Verify { ids } => {
            report(service.verify_availability(&ctx, &ids_or_all(ids)).await)
        }
        Command::Maintenance { mode, ids } => {
            report(service.set_maintenance_status(&ctx, &ids, mode.into()).await)
        }
        Command::Clear { ids } => report(service.clear_multiple_slots(&ctx, &ids).await),
        Command::Reserve { until, by, ids } => {
            report(service.reserve_multiple_slots(&ctx, &ids, until, &by).await)
        }
        Command::Cancel { ids } => {
            report(service.cancel_multiple_reservations(&ctx, &ids).await)
        }
        Command::Assign {
            slot_id,
            product_id,
            start,
            end,
        } => {
            let window = ListingWindow {
                start_time: start,
                end_time: end,
            };
            report(service.assign_product(&ctx, slot_id, product_id, window).await)
        }
        Command::Draft { status, ids } => {
            report(service.set_draft_status_many(&ctx, &ids, status.into()).await)
        }
    }
}

fn build_service(db: &Db, cfg: &AppConfig) -> SlotService {
    let repo = Arc::new(SqlxSlotRepository::new(db.pool.clone()));
    let store = Arc::new(SlotStore::new(repo).with_call_timeout(cfg.store_timeout()));

    SlotService::new(
        store,
        cfg.batch(),
        Arc::new(SystemClock),
        Counters::default(),
    )
}

/// Print the result; the exit code mirrors how much of the batch succeeded.
fn report<T: Serialize>(
    res: Result<BatchOperationResult<T>, BatchError>,
) -> anyhow::Result<ExitCode> {
    let result = match res {
        Ok(r) => r,
        Err(e) => return Ok(request_failed(e)),
    };

    print_json(&result)?;

    Ok(match result.classification() {
        BatchClassification::CompleteFailure => ExitCode::from(2),
        BatchClassification::CompleteSuccess | BatchClassification::PartialSuccess => {
            ExitCode::SUCCESS
        }
    })
}

fn request_failed(e: BatchError) -> ExitCode {
    eprintln!("request rejected: {e}");
    ExitCode::from(1)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
