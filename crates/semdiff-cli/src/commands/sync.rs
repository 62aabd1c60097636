use std::future::Future;
use std::sync::Arc;

use semdiff_core::storage::{settings_keys, DEFAULT_API_BASE};
use semdiff_core::sync::{HttpTransport, PullOutcome, PushOutcome, SyncEngine, SyncReport};
use semdiff_core::{ChangeLog, StorageEngine};
use tracing::debug;

use crate::app::AppContext;
use crate::cli::SyncArgs;
use crate::ui::{
    badge, format_timestamp, kv, print, print_json, Badge, OutputMode, Spinner, UiContext,
};

/// Run a future to completion on a fresh single-threaded runtime.
pub(crate) fn block_on<F: Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

pub fn handle_sync(ctx: &AppContext, args: &SyncArgs) -> anyhow::Result<()> {
    if args.status {
        return handle_status(ctx, args.output.json);
    }

    let storage = ctx.storage()?;
    let transport = HttpTransport::from_settings(storage.as_ref(), ctx.sync_timeout()?)?;
    let api_base = transport.api_base().to_string();
    debug!(api_base = %api_base, "starting sync");
    let engine = SyncEngine::new(Arc::clone(&storage), Arc::new(transport));

    let ui_ctx = ctx.ui_context(args.output.json);
    let spinner = Spinner::new(&ui_ctx, &format!("Syncing with {}", api_base));
    spinner.start();
    let report = block_on(engine.sync_now())?;
    spinner.clear();

    if ui_ctx.mode.is_json() {
        print_json(&report_json(&report))?;
    } else if !ctx.quiet() {
        print_report(&ui_ctx, &report);
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Sync did not complete; queued changes are kept for the next attempt"
        ))
    }
}

fn handle_status(ctx: &AppContext, json: bool) -> anyhow::Result<()> {
    let storage = ctx.storage()?;
    let pending = storage.change_count()?;
    let last_sync = storage
        .get_setting(settings_keys::LAST_SYNC)?
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0);
    let api_base = storage
        .get_setting(settings_keys::API_BASE)?
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    let logged_in = storage
        .get_setting(settings_keys::TOKEN)?
        .is_some_and(|t| !t.is_empty());

    let ui_ctx = ctx.ui_context(json);
    match ui_ctx.mode {
        OutputMode::Json => print_json(&serde_json::json!({
            "pending_changes": pending,
            "last_sync": last_sync,
            "api_base": api_base,
            "logged_in": logged_in,
        }))?,
        OutputMode::Pretty => {
            let state = if pending == 0 {
                badge(&ui_ctx, Badge::Ok, "All saved")
            } else {
                badge(
                    &ui_ctx,
                    Badge::Warn,
                    &format!("{} changes waiting to be pushed", pending),
                )
            };
            print(&ui_ctx, &state);
            print(&ui_ctx, &kv(&ui_ctx, "Last sync", &format_timestamp(last_sync)));
            print(&ui_ctx, &kv(&ui_ctx, "Remote", &api_base));
            print(
                &ui_ctx,
                &kv(&ui_ctx, "Logged in", if logged_in { "yes" } else { "no" }),
            );
        }
        OutputMode::Plain => {
            println!("pending={}", pending);
            println!("last_sync={}", last_sync);
            println!("api_base={}", api_base);
            println!("logged_in={}", logged_in);
        }
    }
    Ok(())
}

fn report_json(report: &SyncReport) -> serde_json::Value {
    let push = match &report.push {
        PushOutcome::Skipped => serde_json::json!({ "status": "skipped" }),
        PushOutcome::Pushed {
            count,
            cleared_through,
        } => serde_json::json!({
            "status": "pushed",
            "count": count,
            "cleared_through": cleared_through,
        }),
        PushOutcome::Failed(error) => serde_json::json!({ "status": "failed", "error": error }),
    };
    let pull = match &report.pull {
        PullOutcome::Pulled { merge, watermark } => serde_json::json!({
            "status": "pulled",
            "applied": merge.applied(),
            "skipped": merge.skipped(),
            "watermark": watermark,
        }),
        PullOutcome::Failed(error) => serde_json::json!({ "status": "failed", "error": error }),
    };
    serde_json::json!({ "success": report.is_success(), "push": push, "pull": pull })
}

fn print_report(ui_ctx: &UiContext, report: &SyncReport) {
    let pretty = ui_ctx.mode.is_pretty();
    match &report.push {
        PushOutcome::Skipped if pretty => {
            print(ui_ctx, &badge(ui_ctx, Badge::Info, "Nothing to push"))
        }
        PushOutcome::Pushed { count, .. } if pretty => print(
            ui_ctx,
            &badge(ui_ctx, Badge::Ok, &format!("Pushed {} changes", count)),
        ),
        PushOutcome::Failed(error) if pretty => print(
            ui_ctx,
            &badge(ui_ctx, Badge::Err, &format!("Push failed: {}", error)),
        ),
        PushOutcome::Skipped => println!("push=skipped"),
        PushOutcome::Pushed { count, .. } => println!("pushed={}", count),
        PushOutcome::Failed(error) => println!("push_error={}", error),
    }
    match &report.pull {
        PullOutcome::Pulled { merge, .. } if pretty => print(
            ui_ctx,
            &badge(
                ui_ctx,
                Badge::Ok,
                &format!(
                    "Pulled {} records ({} already up to date)",
                    merge.applied(),
                    merge.skipped()
                ),
            ),
        ),
        PullOutcome::Failed(error) if pretty => print(
            ui_ctx,
            &badge(ui_ctx, Badge::Err, &format!("Pull failed: {}", error)),
        ),
        PullOutcome::Pulled { merge, .. } => {
            println!("applied={}", merge.applied());
            println!("skipped={}", merge.skipped());
        }
        PullOutcome::Failed(error) => println!("pull_error={}", error),
    }
}
