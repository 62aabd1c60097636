use semdiff_core::storage::ScaleInput;
use semdiff_core::StorageEngine;

use crate::app::{require_scale, AppContext};
use crate::cli::{JsonArgs, ReorderArgs, ScaleAddArgs, ScaleDeleteArgs};
use crate::ui::{badge, format_value, print, print_json, simple_table, Badge, OutputMode};

pub fn handle_add(ctx: &AppContext, args: &ScaleAddArgs) -> anyhow::Result<()> {
    let mut store = ctx.app_store()?;

    // Keep the stored position and any bound not given on the command line.
    let existing = store.storage().get_scale(&args.id)?;
    let mut input = ScaleInput::new(&args.id, &args.left, &args.right)
        .with_higher_is_better(!args.lower_is_better);
    if let Some(scale) = existing.as_ref() {
        input = input
            .with_range(scale.min, scale.max)
            .with_sort_index(scale.sort_index);
    }
    if let Some(min) = args.min {
        input.min = Some(min);
    }
    if let Some(max) = args.max {
        input.max = Some(max);
    }

    let scale = store.upsert_scale(&input)?;

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        match ui_ctx.mode {
            OutputMode::Pretty => {
                let verb = if existing.is_some() { "Updated" } else { "Added" };
                print(
                    &ui_ctx,
                    &badge(
                        &ui_ctx,
                        Badge::Ok,
                        &format!(
                            "{} scale {} ({} .. {})",
                            verb,
                            scale.id,
                            format_value(scale.min),
                            format_value(scale.max)
                        ),
                    ),
                );
            }
            OutputMode::Plain | OutputMode::Json => println!("id={}", scale.id),
        }
    }
    Ok(())
}

pub fn handle_list(ctx: &AppContext, args: &JsonArgs) -> anyhow::Result<()> {
    let storage = ctx.storage()?;
    let scales = storage.list_scales()?;

    let ui_ctx = ctx.ui_context(args.json);
    if ui_ctx.mode.is_json() {
        return print_json(&scales);
    }
    if scales.is_empty() {
        if !ctx.quiet() {
            print(&ui_ctx, &badge(&ui_ctx, Badge::Info, "No scales defined"));
        }
        return Ok(());
    }

    let rows: Vec<Vec<String>> = scales
        .iter()
        .map(|s| {
            vec![
                s.sort_index.to_string(),
                s.id.clone(),
                s.left_label.clone(),
                s.right_label.clone(),
                format!("{}..{}", format_value(s.min), format_value(s.max)),
                if s.higher_is_better { "high" } else { "low" }.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        simple_table(&ui_ctx, &["#", "ID", "LEFT", "RIGHT", "RANGE", "BETTER"], &rows)
    );
    Ok(())
}

pub fn handle_delete(ctx: &AppContext, args: &ScaleDeleteArgs) -> anyhow::Result<()> {
    let mut store = ctx.app_store()?;
    require_scale(store.storage().as_ref(), &args.id)?;
    store.delete_scale(&args.id)?;

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        match ui_ctx.mode {
            OutputMode::Pretty => print(
                &ui_ctx,
                &badge(&ui_ctx, Badge::Ok, &format!("Deleted scale {}", args.id)),
            ),
            OutputMode::Plain | OutputMode::Json => println!("deleted={}", args.id),
        }
    }
    Ok(())
}

pub fn handle_reorder(ctx: &AppContext, args: &ReorderArgs) -> anyhow::Result<()> {
    let mut store = ctx.app_store()?;
    store.reorder_scales(&args.ids)?;

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        let order: Vec<&str> = store.scales().iter().map(|s| s.id.as_str()).collect();
        match ui_ctx.mode {
            OutputMode::Pretty => print(
                &ui_ctx,
                &badge(&ui_ctx, Badge::Ok, &format!("Scale order: {}", order.join(", "))),
            ),
            OutputMode::Plain | OutputMode::Json => println!("order={}", order.join(",")),
        }
    }
    Ok(())
}
