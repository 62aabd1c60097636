use semdiff_core::StorageEngine;

use crate::app::{require_scale, require_student, AppContext};
use crate::cli::{RateArgs, RatingsArgs};
use crate::output::rating_views;
use crate::ui::theme::{percent_style, styled};
use crate::ui::{
    badge, blank_line, format_percent, format_timestamp, format_value, header, print, print_json,
    simple_table, Badge, OutputMode,
};

pub fn handle_rate(ctx: &AppContext, args: &RateArgs) -> anyhow::Result<()> {
    let mut store = ctx.app_store()?;
    let student = require_student(store.storage().as_ref(), args.student)?;
    let scale = require_scale(store.storage().as_ref(), &args.scale)?;

    let stored = if args.delta {
        store.load_ratings_for_student(student.id)?;
        store.adjust_rating(student.id, &scale.id, args.value)?
    } else {
        store.set_rating(student.id, &scale.id, args.value)?
    };

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        match ui_ctx.mode {
            OutputMode::Pretty => {
                let pct = scale.percent(stored);
                let mut message = format!(
                    "{} \u{00B7} {} = {} ({})",
                    student.display_name(),
                    scale.id,
                    format_value(stored),
                    styled(&format_percent(pct), percent_style(pct), ui_ctx.color)
                );
                if !args.delta && stored != args.value {
                    message.push_str(" [clamped]");
                }
                print(&ui_ctx, &badge(&ui_ctx, Badge::Ok, &message));
            }
            OutputMode::Plain | OutputMode::Json => println!("value={}", format_value(stored)),
        }
    }
    Ok(())
}

pub fn handle_ratings(ctx: &AppContext, args: &RatingsArgs) -> anyhow::Result<()> {
    let storage = ctx.storage()?;
    let student = require_student(storage.as_ref(), args.student)?;
    let ui_ctx = ctx.ui_context(args.output.json);

    if args.history {
        let events = storage.list_ratings_by_student(student.id)?;
        if ui_ctx.mode.is_json() {
            return print_json(&events);
        }
        let rows: Vec<Vec<String>> = events
            .iter()
            .map(|r| {
                vec![
                    format_timestamp(r.recorded_at),
                    r.scale_id.clone(),
                    format_value(r.value),
                ]
            })
            .collect();
        println!("{}", simple_table(&ui_ctx, &["WHEN", "SCALE", "VALUE"], &rows));
        return Ok(());
    }

    let scales = storage.list_scales()?;
    let current = storage.current_ratings(student.id)?;
    let views = rating_views(&scales, &current);
    if ui_ctx.mode.is_json() {
        return print_json(&views);
    }

    if ui_ctx.mode.is_pretty() && !ctx.quiet() {
        print(&ui_ctx, &header(&ui_ctx, "ratings", Some(&student.display_name())));
        blank_line(&ui_ctx);
    }
    let rows: Vec<Vec<String>> = views
        .iter()
        .map(|v| {
            let (value, pct) = match (v.value, v.percent) {
                (Some(value), Some(pct)) => (
                    format_value(value),
                    styled(&format_percent(pct), percent_style(pct), ui_ctx.color),
                ),
                _ => ("-".to_string(), "-".to_string()),
            };
            vec![
                v.scale_id.clone(),
                v.left_label.clone(),
                v.right_label.clone(),
                value,
                pct,
            ]
        })
        .collect();
    println!(
        "{}",
        simple_table(&ui_ctx, &["SCALE", "LEFT", "RIGHT", "VALUE", "PERCENT"], &rows)
    );
    Ok(())
}
