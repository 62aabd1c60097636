use semdiff_core::StorageEngine;

use crate::app::{require_student, AppContext};
use crate::cli::{NoteAddArgs, NoteDeleteArgs, NoteListArgs};
use crate::errors::CliError;
use crate::ui::{
    badge, blank_line, format_timestamp, header, print, print_json, simple_table, truncate, Badge,
    OutputMode,
};

const NOTE_TABLE_MAX: usize = 72;

pub fn handle_add(ctx: &AppContext, args: &NoteAddArgs) -> anyhow::Result<()> {
    if args.text.trim().is_empty() {
        return Err(CliError::invalid_input("Note text cannot be empty").into());
    }

    let mut store = ctx.app_store()?;
    let student = require_student(store.storage().as_ref(), args.student)?;
    let note = store.add_note(student.id, &args.text, args.tag.clone())?;

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        match ui_ctx.mode {
            OutputMode::Pretty => print(
                &ui_ctx,
                &badge(
                    &ui_ctx,
                    Badge::Ok,
                    &format!("Added note for {}", student.display_name()),
                ),
            ),
            OutputMode::Plain | OutputMode::Json => println!("id={}", note.id),
        }
    }
    Ok(())
}

pub fn handle_list(ctx: &AppContext, args: &NoteListArgs) -> anyhow::Result<()> {
    let mut store = ctx.app_store()?;
    let student = require_student(store.storage().as_ref(), args.student)?;
    store.load_notes_for_student(student.id)?;
    let notes = store.notes_for(student.id);

    let ui_ctx = ctx.ui_context(args.output.json);
    if ui_ctx.mode.is_json() {
        return print_json(notes);
    }

    if notes.is_empty() {
        if !ctx.quiet() {
            print(&ui_ctx, &badge(&ui_ctx, Badge::Info, "No notes for this student"));
        }
        return Ok(());
    }

    if ui_ctx.mode.is_pretty() && !ctx.quiet() {
        print(&ui_ctx, &header(&ui_ctx, "notes", Some(&student.display_name())));
        blank_line(&ui_ctx);
    }
    let rows: Vec<Vec<String>> = notes
        .iter()
        .map(|n| {
            let text = if ui_ctx.mode.is_pretty() {
                truncate(&n.text, NOTE_TABLE_MAX)
            } else {
                n.text.clone()
            };
            vec![
                n.id.clone(),
                format_timestamp(n.recorded_at),
                text,
                n.tags.join(","),
            ]
        })
        .collect();
    println!(
        "{}",
        simple_table(&ui_ctx, &["ID", "WHEN", "NOTE", "TAGS"], &rows)
    );
    Ok(())
}

pub fn handle_delete(ctx: &AppContext, args: &NoteDeleteArgs) -> anyhow::Result<()> {
    let storage = ctx.storage()?;
    if storage.get_note(&args.id)?.is_none() {
        return Err(CliError::not_found(
            format!("Note {} not found", args.id),
            "Hint: Run `semdiff note list <STUDENT>` to see note ids.",
        )
        .into());
    }
    storage.delete_note(&args.id)?;

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        match ui_ctx.mode {
            OutputMode::Pretty => print(&ui_ctx, &badge(&ui_ctx, Badge::Ok, "Deleted note")),
            OutputMode::Plain | OutputMode::Json => println!("deleted={}", args.id),
        }
    }
    Ok(())
}
