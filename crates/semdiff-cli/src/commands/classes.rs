use semdiff_core::StorageEngine;

use crate::app::AppContext;
use crate::cli::{ClassDeleteArgs, JsonArgs};
use crate::commands::confirm;
use crate::errors::CliError;
use crate::output::class_counts;
use crate::ui::{badge, print, print_json, simple_table, Badge, OutputMode};

pub fn handle_list(ctx: &AppContext, args: &JsonArgs) -> anyhow::Result<()> {
    let storage = ctx.storage()?;
    let counts = class_counts(&storage.list_students()?);

    let ui_ctx = ctx.ui_context(args.json);
    if ui_ctx.mode.is_json() {
        let value: Vec<serde_json::Value> = counts
            .iter()
            .map(|(name, students)| serde_json::json!({ "class_name": name, "students": students }))
            .collect();
        return print_json(&value);
    }

    if counts.is_empty() {
        if !ctx.quiet() {
            print(&ui_ctx, &badge(&ui_ctx, Badge::Info, "No classes yet"));
        }
        return Ok(());
    }
    let rows: Vec<Vec<String>> = counts
        .into_iter()
        .map(|(name, n)| vec![name, n.to_string()])
        .collect();
    println!("{}", simple_table(&ui_ctx, &["CLASS", "STUDENTS"], &rows));
    Ok(())
}

pub fn handle_delete(ctx: &AppContext, args: &ClassDeleteArgs) -> anyhow::Result<()> {
    let mut store = ctx.app_store()?;
    let members = store.storage().list_students_in_class(&args.class)?;
    if members.is_empty() {
        return Err(CliError::not_found(
            format!("Class \"{}\" not found", args.class),
            "Hint: Run `semdiff class list` to see class names.",
        )
        .into());
    }

    let ui_ctx = ctx.ui_context(false);
    if !args.yes
        && !confirm(
            &ui_ctx,
            &format!(
                "Delete class {} and its {} students with all their data?",
                args.class,
                members.len()
            ),
        )?
    {
        print(&ui_ctx, &badge(&ui_ctx, Badge::Warn, "Delete cancelled"));
        return Ok(());
    }

    let removed = store.delete_class(&args.class)?;
    if !ctx.quiet() {
        match ui_ctx.mode {
            OutputMode::Pretty => print(
                &ui_ctx,
                &badge(
                    &ui_ctx,
                    Badge::Ok,
                    &format!("Deleted class {} ({} students)", args.class, removed),
                ),
            ),
            OutputMode::Plain | OutputMode::Json => println!("deleted={}", removed),
        }
    }
    Ok(())
}
