use std::io::Write;
use std::path::Path;

use semdiff_core::fs::write_atomic;
use semdiff_core::transfer::{
    export_ratings_csv, export_students_csv, import_ratings_csv, import_students_csv,
    DuplicateStrategy,
};

use crate::app::AppContext;
use crate::cli::{DuplicateArg, ExportArgs, ImportArgs, TransferKind};
use crate::errors::CliError;
use crate::ui::{badge, kv, print, Badge, OutputMode};

pub fn handle_export(ctx: &AppContext, args: &ExportArgs) -> anyhow::Result<()> {
    let storage = ctx.storage()?;
    let csv = match args.kind {
        TransferKind::Students => export_students_csv(storage.as_ref())?,
        TransferKind::Ratings => export_ratings_csv(storage.as_ref())?,
    };

    let Some(out) = args.out.as_deref() else {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(csv.as_bytes())?;
        stdout.flush()?;
        return Ok(());
    };

    write_atomic(Path::new(out), csv.as_bytes())?;
    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        let rows = csv.lines().count().saturating_sub(1);
        match ui_ctx.mode {
            OutputMode::Pretty => print(
                &ui_ctx,
                &badge(&ui_ctx, Badge::Ok, &format!("Exported {} rows to {}", rows, out)),
            ),
            OutputMode::Plain | OutputMode::Json => {
                println!("rows={}", rows);
                println!("file={}", out);
            }
        }
    }
    Ok(())
}

pub fn handle_import(ctx: &AppContext, args: &ImportArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.file).map_err(|e| {
        anyhow::Error::new(CliError::not_found(
            format!("Cannot read {}: {}", args.file, e),
            "",
        ))
    })?;
    let storage = ctx.storage()?;
    let ui_ctx = ctx.ui_context(false);

    match args.kind {
        TransferKind::Students => {
            let strategy = match args.on_duplicate {
                DuplicateArg::Merge => DuplicateStrategy::Merge,
                DuplicateArg::Skip => DuplicateStrategy::Skip,
            };
            let report = import_students_csv(storage.as_ref(), &text, strategy)?;
            if ctx.quiet() {
                return Ok(());
            }
            match ui_ctx.mode {
                OutputMode::Pretty => {
                    print(&ui_ctx, &badge(&ui_ctx, Badge::Ok, "Students imported"));
                    print(&ui_ctx, &kv(&ui_ctx, "Inserted", &report.inserted.to_string()));
                    print(&ui_ctx, &kv(&ui_ctx, "Merged", &report.merged.to_string()));
                    print(&ui_ctx, &kv(&ui_ctx, "Skipped", &report.skipped.to_string()));
                }
                OutputMode::Plain | OutputMode::Json => {
                    println!("inserted={}", report.inserted);
                    println!("merged={}", report.merged);
                    println!("skipped={}", report.skipped);
                }
            }
        }
        TransferKind::Ratings => {
            let report = import_ratings_csv(storage.as_ref(), &text, args.class.as_deref())?;
            if ctx.quiet() {
                return Ok(());
            }
            match ui_ctx.mode {
                OutputMode::Pretty => {
                    print(&ui_ctx, &badge(&ui_ctx, Badge::Ok, "Ratings imported"));
                    print(&ui_ctx, &kv(&ui_ctx, "Inserted", &report.inserted.to_string()));
                    if report.skipped > 0 {
                        print(
                            &ui_ctx,
                            &badge(
                                &ui_ctx,
                                Badge::Warn,
                                &format!("{} rows matched no student", report.skipped),
                            ),
                        );
                    }
                }
                OutputMode::Plain | OutputMode::Json => {
                    println!("inserted={}", report.inserted);
                    println!("skipped={}", report.skipped);
                }
            }
        }
    }
    Ok(())
}
