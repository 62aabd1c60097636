//! SemDiff CLI - offline-first classroom observation tracker
//!
//! Command-line interface over the SemDiff core library: students, scales,
//! ratings, notes, checks, seating plans, CSV transfer and remote sync.

mod app;
mod cli;
mod commands;
mod config;
mod constants;
mod errors;
mod output;
mod ui;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use semdiff_core::VERSION;

use crate::app::AppContext;
use crate::cli::{
    CheckCommand, ClassCommand, Cli, Commands, NoteCommand, RemoteCommand, ScaleCommand,
    SeatingCommand, StudentCommand,
};
use crate::commands::{
    checks, classes, init, misc, notes, ratings, remote, scales, seating, students, sync, transfer,
};
use crate::errors::exit_code_for;
use crate::ui::print_error;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let ctx = AppContext::new(&cli);

    if let Err(e) = run(&ctx, &cli) {
        let ui_ctx = ctx.ui_context(false);
        let error_msg = format!("{}", e);
        let (message, hint) = split_hint(&error_msg);
        print_error(&ui_ctx, message, hint);
        std::process::exit(exit_code_for(&e));
    }
}

/// Logs go to stderr so stdout stays parseable.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(constants::env::LOG)
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Split a trailing "Hint: ..." line off an error message.
fn split_hint(error: &str) -> (&str, Option<&str>) {
    match error.find("\nHint:") {
        Some(idx) => (
            &error[..idx],
            Some(error[idx + "\nHint:".len()..].trim()),
        ),
        None => (error, None),
    }
}

fn run(ctx: &AppContext, cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Some(Commands::Init(args)) => {
            init::handle_init(ctx, args)?;
        }
        Some(Commands::Student(command)) => match command {
            StudentCommand::Add(args) => students::handle_add(ctx, args)?,
            StudentCommand::List(args) => students::handle_list(ctx, args)?,
            StudentCommand::Show(args) => students::handle_show(ctx, args)?,
            StudentCommand::Edit(args) => students::handle_edit(ctx, args)?,
            StudentCommand::Delete(args) => students::handle_delete(ctx, args)?,
        },
        Some(Commands::Class(command)) => match command {
            ClassCommand::List(args) => classes::handle_list(ctx, args)?,
            ClassCommand::Delete(args) => classes::handle_delete(ctx, args)?,
        },
        Some(Commands::Scale(command)) => match command {
            ScaleCommand::Add(args) => scales::handle_add(ctx, args)?,
            ScaleCommand::List(args) => scales::handle_list(ctx, args)?,
            ScaleCommand::Delete(args) => scales::handle_delete(ctx, args)?,
            ScaleCommand::Reorder(args) => scales::handle_reorder(ctx, args)?,
        },
        Some(Commands::Rate(args)) => {
            ratings::handle_rate(ctx, args)?;
        }
        Some(Commands::Ratings(args)) => {
            ratings::handle_ratings(ctx, args)?;
        }
        Some(Commands::Note(command)) => match command {
            NoteCommand::Add(args) => notes::handle_add(ctx, args)?,
            NoteCommand::List(args) => notes::handle_list(ctx, args)?,
            NoteCommand::Delete(args) => notes::handle_delete(ctx, args)?,
        },
        Some(Commands::Check(command)) => match command {
            CheckCommand::Add(args) => checks::handle_add(ctx, args)?,
            CheckCommand::List(args) => checks::handle_list(ctx, args)?,
            CheckCommand::Delete(args) => checks::handle_delete(ctx, args)?,
            CheckCommand::Reorder(args) => checks::handle_reorder(ctx, args)?,
            CheckCommand::Mark(args) => checks::handle_mark(ctx, args)?,
            CheckCommand::Show(args) => checks::handle_show(ctx, args)?,
        },
        Some(Commands::Seating(command)) => match command {
            SeatingCommand::Show(args) => seating::handle_show(ctx, args)?,
            SeatingCommand::Swap(args) => seating::handle_swap(ctx, args)?,
        },
        Some(Commands::Export(args)) => {
            transfer::handle_export(ctx, args)?;
        }
        Some(Commands::Import(args)) => {
            transfer::handle_import(ctx, args)?;
        }
        Some(Commands::Sync(args)) => {
            sync::handle_sync(ctx, args)?;
        }
        Some(Commands::Remote(command)) => match command {
            RemoteCommand::Url(args) => remote::handle_url(ctx, args)?,
            RemoteCommand::Login(args) => remote::handle_login(ctx, args)?,
            RemoteCommand::Logout => remote::handle_logout(ctx)?,
        },
        Some(Commands::Completions(args)) => {
            misc::handle_completions(args)?;
        }
        None => {
            println!("SemDiff v{}", VERSION);
            println!("\nQuickstart:");
            println!("  semdiff init");
            println!("  semdiff student add --class 3A --number 1 --first Léa --last Martin");
            println!("  semdiff rate 1 actif 2");
            println!("  semdiff student show 1");
            println!("  semdiff sync");
            println!("\nRun `semdiff --help` for full usage.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_hint() {
        let (message, hint) = split_hint("Student 9 not found\nHint: Run `semdiff student list`.");
        assert_eq!(message, "Student 9 not found");
        assert_eq!(hint, Some("Run `semdiff student list`."));
    }

    #[test]
    fn test_split_hint_without_hint() {
        assert_eq!(split_hint("boom"), ("boom", None));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
