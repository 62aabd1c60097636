use semdiff_core::storage::{CheckDef, CheckInput};
use semdiff_core::StorageEngine;

use crate::app::{require_student, AppContext};
use crate::cli::{CheckAddArgs, CheckDeleteArgs, CheckMarkArgs, CheckShowArgs, JsonArgs, ReorderArgs};
use crate::errors::CliError;
use crate::output::check_views;
use crate::ui::theme::{styled, styles};
use crate::ui::{badge, blank_line, header, print, print_json, simple_table, Badge, OutputMode};

fn require_check<S: StorageEngine + ?Sized>(storage: &S, id: &str) -> anyhow::Result<CheckDef> {
    storage.get_check(id)?.ok_or_else(|| {
        CliError::not_found(
            format!("Check \"{}\" not found", id),
            "Hint: Run `semdiff check list` to see available checks.",
        )
        .into()
    })
}

pub fn handle_add(ctx: &AppContext, args: &CheckAddArgs) -> anyhow::Result<()> {
    let storage = ctx.storage()?;

    // Renaming keeps the check in place.
    let existing = storage.get_check(&args.id)?;
    let mut input = CheckInput::new(&args.id, &args.label);
    if let Some(check) = existing.as_ref() {
        input = input.with_sort_index(check.sort_index);
    }
    let id = storage.upsert_check(&input)?;

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        match ui_ctx.mode {
            OutputMode::Pretty => {
                let verb = if existing.is_some() { "Renamed" } else { "Added" };
                print(
                    &ui_ctx,
                    &badge(&ui_ctx, Badge::Ok, &format!("{} check {}", verb, id)),
                );
            }
            OutputMode::Plain | OutputMode::Json => println!("id={}", id),
        }
    }
    Ok(())
}

pub fn handle_list(ctx: &AppContext, args: &JsonArgs) -> anyhow::Result<()> {
    let storage = ctx.storage()?;
    let checks = storage.list_checks()?;

    let ui_ctx = ctx.ui_context(args.json);
    if ui_ctx.mode.is_json() {
        return print_json(&checks);
    }
    if checks.is_empty() {
        if !ctx.quiet() {
            print(&ui_ctx, &badge(&ui_ctx, Badge::Info, "No checks defined"));
        }
        return Ok(());
    }

    let rows: Vec<Vec<String>> = checks
        .iter()
        .map(|c| vec![c.sort_index.to_string(), c.id.clone(), c.label.clone()])
        .collect();
    println!("{}", simple_table(&ui_ctx, &["#", "ID", "LABEL"], &rows));
    Ok(())
}

pub fn handle_delete(ctx: &AppContext, args: &CheckDeleteArgs) -> anyhow::Result<()> {
    let storage = ctx.storage()?;
    require_check(storage.as_ref(), &args.id)?;
    storage.delete_check(&args.id)?;

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        match ui_ctx.mode {
            OutputMode::Pretty => print(
                &ui_ctx,
                &badge(&ui_ctx, Badge::Ok, &format!("Deleted check {}", args.id)),
            ),
            OutputMode::Plain | OutputMode::Json => println!("deleted={}", args.id),
        }
    }
    Ok(())
}

pub fn handle_reorder(ctx: &AppContext, args: &ReorderArgs) -> anyhow::Result<()> {
    let storage = ctx.storage()?;
    let checks = storage.update_checks_order(&args.ids)?;

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        let order: Vec<&str> = checks.iter().map(|c| c.id.as_str()).collect();
        match ui_ctx.mode {
            OutputMode::Pretty => print(
                &ui_ctx,
                &badge(&ui_ctx, Badge::Ok, &format!("Check order: {}", order.join(", "))),
            ),
            OutputMode::Plain | OutputMode::Json => println!("order={}", order.join(",")),
        }
    }
    Ok(())
}

pub fn handle_mark(ctx: &AppContext, args: &CheckMarkArgs) -> anyhow::Result<()> {
    let mut store = ctx.app_store()?;
    let student = require_student(store.storage().as_ref(), args.student)?;
    let check = require_check(store.storage().as_ref(), &args.check)?;
    let value = !args.clear;
    store.set_check_mark(student.id, &check.id, value)?;

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        match ui_ctx.mode {
            OutputMode::Pretty => {
                let state = if value { "checked" } else { "cleared" };
                print(
                    &ui_ctx,
                    &badge(
                        &ui_ctx,
                        Badge::Ok,
                        &format!("{} {} for {}", check.label, state, student.display_name()),
                    ),
                );
            }
            OutputMode::Plain | OutputMode::Json => println!("{}={}", check.id, value),
        }
    }
    Ok(())
}

pub fn handle_show(ctx: &AppContext, args: &CheckShowArgs) -> anyhow::Result<()> {
    let mut store = ctx.app_store()?;
    let student = require_student(store.storage().as_ref(), args.student)?;
    store.load_checks()?;
    store.load_check_marks_for_student(student.id)?;
    let marks = store.check_marks_for(student.id).cloned().unwrap_or_default();
    let views = check_views(store.checks(), &marks);

    let ui_ctx = ctx.ui_context(args.output.json);
    if ui_ctx.mode.is_json() {
        return print_json(&views);
    }

    if ui_ctx.mode.is_pretty() && !ctx.quiet() {
        print(&ui_ctx, &header(&ui_ctx, "checks", Some(&student.display_name())));
        blank_line(&ui_ctx);
    }
    let rows: Vec<Vec<String>> = views
        .iter()
        .map(|v| {
            let mark = if !ui_ctx.mode.is_pretty() {
                v.value.to_string()
            } else if v.value {
                styled("✓", styles::ok(), ui_ctx.color)
            } else {
                styled("·", styles::dim(), ui_ctx.color)
            };
            vec![v.check_id.to_string(), v.label.to_string(), mark]
        })
        .collect();
    println!("{}", simple_table(&ui_ctx, &["ID", "LABEL", "DONE"], &rows));
    Ok(())
}
