use semdiff_core::storage::{NewStudent, StudentUpdate};
use semdiff_core::store::FilterMode;
use semdiff_core::StorageEngine;

use crate::app::{require_student, AppContext};
use crate::cli::{
    StudentAddArgs, StudentDeleteArgs, StudentEditArgs, StudentListArgs, StudentShowArgs,
};
use crate::commands::confirm;
use crate::errors::CliError;
use crate::output::{check_views, rating_views, student_detail_json};
use crate::ui::theme::{percent_style, styled};
use crate::ui::{
    badge, blank_line, format_percent, format_timestamp, format_value, header, hint, kv, print,
    print_json, simple_table, truncate, Badge, OutputMode,
};

pub fn handle_add(ctx: &AppContext, args: &StudentAddArgs) -> anyhow::Result<()> {
    let mut store = ctx.app_store()?;

    let mut student = NewStudent::new(&args.class, args.number, &args.first, &args.last);
    if let Some(id) = args.id {
        student = student.with_id(id);
    }
    if let Some(gender) = args.gender.as_deref() {
        student = student.with_gender(gender);
    }
    let id = store.add_student(&student)?;

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        match ui_ctx.mode {
            OutputMode::Pretty => print(
                &ui_ctx,
                &badge(
                    &ui_ctx,
                    Badge::Ok,
                    &format!("Added {} {} ({}) as student {}", args.first, args.last, args.class, id),
                ),
            ),
            OutputMode::Plain | OutputMode::Json => println!("id={}", id),
        }
    }
    Ok(())
}

pub fn handle_list(ctx: &AppContext, args: &StudentListArgs) -> anyhow::Result<()> {
    let mut store = ctx.app_store()?;
    if let Some(query) = args.filter.as_deref() {
        let mode = if args.fuzzy {
            FilterMode::Fuzzy
        } else {
            FilterMode::Prefix
        };
        store.set_student_filter(query, Some(mode));
    }

    let students: Vec<_> = store
        .filtered_students()
        .into_iter()
        .filter(|s| args.class.as_deref().map_or(true, |c| s.class_name == c))
        .collect();

    let ui_ctx = ctx.ui_context(args.output.json);
    if ui_ctx.mode.is_json() {
        return print_json(&students);
    }

    if students.is_empty() {
        if !ctx.quiet() {
            print(&ui_ctx, &badge(&ui_ctx, Badge::Info, "No students found"));
            print(&ui_ctx, &hint(&ui_ctx, "semdiff student add --help"));
        }
        return Ok(());
    }

    if ui_ctx.mode.is_pretty() && !ctx.quiet() {
        print(&ui_ctx, &header(&ui_ctx, "students", args.class.as_deref()));
        blank_line(&ui_ctx);
    }
    let rows: Vec<Vec<String>> = students
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                s.class_name.clone(),
                s.number.to_string(),
                s.last_name.clone(),
                s.first_name.clone(),
            ]
        })
        .collect();
    println!(
        "{}",
        simple_table(&ui_ctx, &["ID", "CLASS", "NO", "LAST", "FIRST"], &rows)
    );
    Ok(())
}

pub fn handle_show(ctx: &AppContext, args: &StudentShowArgs) -> anyhow::Result<()> {
    let storage = ctx.storage()?;
    let student = require_student(storage.as_ref(), args.student)?;

    let scales = storage.list_scales()?;
    let current = storage.current_ratings(student.id)?;
    let ratings = rating_views(&scales, &current);
    let mut notes = storage.list_notes_by_student(student.id)?;
    notes.reverse();
    let checks = storage.list_checks()?;
    let marks = storage.check_marks_for_student(student.id)?;
    let checks = check_views(&checks, &marks);

    let ui_ctx = ctx.ui_context(args.output.json);
    if ui_ctx.mode.is_json() {
        return print_json(&student_detail_json(&student, &ratings, &notes, &checks));
    }

    print(&ui_ctx, &header(&ui_ctx, "student", Some(&student.id.to_string())));
    blank_line(&ui_ctx);
    print(&ui_ctx, &kv(&ui_ctx, "Name", &student.display_name()));
    print(&ui_ctx, &kv(&ui_ctx, "Class", &student.class_name));
    print(&ui_ctx, &kv(&ui_ctx, "Number", &student.number.to_string()));
    if let Some(gender) = student.gender.as_deref() {
        print(&ui_ctx, &kv(&ui_ctx, "Gender", gender));
    }

    let rated: Vec<Vec<String>> = ratings
        .iter()
        .filter_map(|r| {
            let value = r.value?;
            let pct = r.percent.unwrap_or(0.0);
            Some(vec![
                r.scale_id.clone(),
                format!("{} / {}", r.left_label, r.right_label),
                format_value(value),
                styled(&format_percent(pct), percent_style(pct), ui_ctx.color),
            ])
        })
        .collect();
    if !rated.is_empty() {
        blank_line(&ui_ctx);
        println!(
            "{}",
            simple_table(&ui_ctx, &["SCALE", "LABELS", "VALUE", "PERCENT"], &rated)
        );
    }

    let marked: Vec<&str> = checks.iter().filter(|c| c.value).map(|c| c.label).collect();
    if !marked.is_empty() {
        blank_line(&ui_ctx);
        print(&ui_ctx, &kv(&ui_ctx, "Checks", &marked.join(", ")));
    }

    if !notes.is_empty() {
        blank_line(&ui_ctx);
        let rows: Vec<Vec<String>> = notes
            .iter()
            .map(|n| {
                vec![
                    format_timestamp(n.recorded_at),
                    truncate(&n.text, 60),
                    n.tags.join(","),
                ]
            })
            .collect();
        println!("{}", simple_table(&ui_ctx, &["WHEN", "NOTE", "TAGS"], &rows));
    }
    Ok(())
}

pub fn handle_edit(ctx: &AppContext, args: &StudentEditArgs) -> anyhow::Result<()> {
    let mut update = StudentUpdate::new(args.student);
    if let Some(id) = args.id {
        update = update.new_id(id);
    }
    if let Some(class) = args.class.as_deref() {
        update = update.class_name(class);
    }
    if let Some(number) = args.number {
        update = update.number(number);
    }
    if let Some(first) = args.first.as_deref() {
        update = update.first_name(first);
    }
    if let Some(last) = args.last.as_deref() {
        update = update.last_name(last);
    }
    if let Some(gender) = args.gender.as_deref() {
        update = update.gender(gender);
    }
    if update == StudentUpdate::new(args.student) {
        return Err(CliError::invalid_input("Nothing to change; pass at least one field").into());
    }

    let mut store = ctx.app_store()?;
    require_student(store.storage().as_ref(), args.student)?;
    if let Some(new_id) = update.new_id.filter(|id| *id != args.student) {
        if store.storage().get_student(new_id)?.is_some() {
            return Err(CliError::Conflict(format!(
                "Student {} already exists; choose a free id",
                new_id
            ))
            .into());
        }
    }
    let final_id = if update.new_id.is_some_and(|id| id != args.student) {
        store.update_student_identity(&update)?
    } else {
        store.update_student(&update)?;
        args.student
    };

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        match ui_ctx.mode {
            OutputMode::Pretty => {
                let message = if final_id != args.student {
                    format!("Student {} is now {}", args.student, final_id)
                } else {
                    format!("Updated student {}", final_id)
                };
                print(&ui_ctx, &badge(&ui_ctx, Badge::Ok, &message));
            }
            OutputMode::Plain | OutputMode::Json => println!("id={}", final_id),
        }
    }
    Ok(())
}

pub fn handle_delete(ctx: &AppContext, args: &StudentDeleteArgs) -> anyhow::Result<()> {
    let mut store = ctx.app_store()?;
    let student = require_student(store.storage().as_ref(), args.student)?;

    let ui_ctx = ctx.ui_context(false);
    if !args.yes
        && !confirm(
            &ui_ctx,
            &format!(
                "Delete {} with all ratings, notes and check marks?",
                student.display_name()
            ),
        )?
    {
        print(&ui_ctx, &badge(&ui_ctx, Badge::Warn, "Delete cancelled"));
        return Ok(());
    }

    store.delete_student(student.id)?;
    if !ctx.quiet() {
        match ui_ctx.mode {
            OutputMode::Pretty => print(
                &ui_ctx,
                &badge(&ui_ctx, Badge::Ok, &format!("Deleted student {}", student.id)),
            ),
            OutputMode::Plain | OutputMode::Json => println!("deleted={}", student.id),
        }
    }
    Ok(())
}
