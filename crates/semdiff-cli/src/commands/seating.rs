use std::collections::HashMap;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use semdiff_core::storage::{SeatingPlan, Student, SEAT_COUNT};
use semdiff_core::StorageEngine;

use crate::app::AppContext;
use crate::cli::{SeatingShowArgs, SeatingSwapArgs};
use crate::errors::CliError;
use crate::ui::{badge, blank_line, header, print, print_json, truncate, Badge, OutputMode};

const SEATS_PER_ROW: usize = 8;
const SEAT_LABEL_MAX: usize = 12;

fn require_class<S: StorageEngine + ?Sized>(
    storage: &S,
    class_name: &str,
) -> anyhow::Result<Vec<Student>> {
    let students = storage.list_students_in_class(class_name)?;
    if students.is_empty() {
        return Err(CliError::not_found(
            format!("Class \"{}\" not found", class_name),
            "Hint: Run `semdiff class list` to see class names.",
        )
        .into());
    }
    Ok(students)
}

fn seat_label(student: Option<&Student>) -> String {
    match student {
        Some(s) => {
            let initial: String = s.first_name.chars().take(1).collect();
            truncate(&format!("{} {}.", s.last_name, initial), SEAT_LABEL_MAX)
        }
        None => String::new(),
    }
}

fn render_grid(plan: &SeatingPlan, by_id: &HashMap<i64, &Student>) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    for row in plan.seats.chunks(SEATS_PER_ROW) {
        table.add_row(
            row.iter()
                .map(|seat| seat_label(seat.and_then(|id| by_id.get(&id).copied())))
                .collect::<Vec<_>>(),
        );
    }
    table.to_string()
}

pub fn handle_show(ctx: &AppContext, args: &SeatingShowArgs) -> anyhow::Result<()> {
    let storage = ctx.storage()?;
    let students = require_class(storage.as_ref(), &args.class)?;
    let plan = storage.ensure_seating_for_class(&args.class)?;

    let ui_ctx = ctx.ui_context(args.output.json);
    if ui_ctx.mode.is_json() {
        return print_json(&plan);
    }

    let by_id: HashMap<i64, &Student> = students.iter().map(|s| (s.id, s)).collect();
    match ui_ctx.mode {
        OutputMode::Pretty => {
            if !ctx.quiet() {
                print(&ui_ctx, &header(&ui_ctx, "seating", Some(&args.class)));
                blank_line(&ui_ctx);
            }
            println!("{}", render_grid(&plan, &by_id));
            let unseated = students
                .iter()
                .filter(|s| !plan.seats.contains(&Some(s.id)))
                .count();
            if unseated > 0 && !ctx.quiet() {
                print(
                    &ui_ctx,
                    &badge(
                        &ui_ctx,
                        Badge::Warn,
                        &format!("{} students without a seat", unseated),
                    ),
                );
            }
        }
        OutputMode::Plain | OutputMode::Json => {
            for (slot, seat) in plan.seats.iter().enumerate() {
                if let Some(id) = seat {
                    let name = by_id.get(id).map(|s| s.display_name()).unwrap_or_default();
                    println!("{}\t{}\t{}", slot, id, name);
                }
            }
        }
    }
    Ok(())
}

pub fn handle_swap(ctx: &AppContext, args: &SeatingSwapArgs) -> anyhow::Result<()> {
    for slot in [args.a, args.b] {
        if slot >= SEAT_COUNT {
            return Err(CliError::invalid_input(format!(
                "Seat {} is out of range (0..{})",
                slot, SEAT_COUNT
            ))
            .into());
        }
    }

    let storage = ctx.storage()?;
    require_class(storage.as_ref(), &args.class)?;
    let plan = storage.swap_seats(&args.class, args.a, args.b)?;

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        match ui_ctx.mode {
            OutputMode::Pretty => print(
                &ui_ctx,
                &badge(
                    &ui_ctx,
                    Badge::Ok,
                    &format!("Swapped seats {} and {} in {}", args.a, args.b, plan.class_name),
                ),
            ),
            OutputMode::Plain | OutputMode::Json => {
                let show = |slot: usize| {
                    plan.seats
                        .get(slot)
                        .copied()
                        .flatten()
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".to_string())
                };
                println!("{}={}", args.a, show(args.a));
                println!("{}={}", args.b, show(args.b));
            }
        }
    }
    Ok(())
}
