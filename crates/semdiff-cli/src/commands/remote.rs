use dialoguer::Password;

use semdiff_core::storage::{settings_keys, DEFAULT_API_BASE};
use semdiff_core::sync::login_and_store;
use semdiff_core::StorageEngine;

use crate::app::AppContext;
use crate::cli::{RemoteLoginArgs, RemoteUrlArgs};
use crate::commands::sync::block_on;
use crate::errors::CliError;
use crate::ui::{badge, print, Badge, OutputMode};

pub fn handle_url(ctx: &AppContext, args: &RemoteUrlArgs) -> anyhow::Result<()> {
    let storage = ctx.storage()?;
    let ui_ctx = ctx.ui_context(false);

    let Some(url) = args.url.as_deref() else {
        let current = storage
            .get_setting(settings_keys::API_BASE)?
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        println!("{}", current);
        return Ok(());
    };

    let url = url.trim().trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(CliError::invalid_input(format!(
            "Invalid URL \"{}\": expected http:// or https://",
            url
        ))
        .into());
    }
    storage.set_setting(settings_keys::API_BASE, url)?;

    if !ctx.quiet() {
        match ui_ctx.mode {
            OutputMode::Pretty => print(
                &ui_ctx,
                &badge(&ui_ctx, Badge::Ok, &format!("Remote set to {}", url)),
            ),
            OutputMode::Plain | OutputMode::Json => println!("api_base={}", url),
        }
    }
    Ok(())
}

pub fn handle_login(ctx: &AppContext, args: &RemoteLoginArgs) -> anyhow::Result<()> {
    let storage = ctx.storage()?;
    let ui_ctx = ctx.ui_context(false);

    let password = match args.password.clone() {
        Some(password) => password,
        None if ui_ctx.is_interactive() => Password::new().with_prompt("Password").interact()?,
        None => {
            return Err(CliError::invalid_input(
                "No password given; pass --password or set SEMDIFF_PASSWORD",
            )
            .into())
        }
    };

    block_on(login_and_store(
        storage.as_ref(),
        &args.username,
        &password,
        ctx.sync_timeout()?,
    ))??;

    if !ctx.quiet() {
        match ui_ctx.mode {
            OutputMode::Pretty => print(
                &ui_ctx,
                &badge(&ui_ctx, Badge::Ok, &format!("Logged in as {}", args.username)),
            ),
            OutputMode::Plain | OutputMode::Json => println!("status=ok"),
        }
    }
    Ok(())
}

pub fn handle_logout(ctx: &AppContext) -> anyhow::Result<()> {
    let storage = ctx.storage()?;
    storage.delete_setting(settings_keys::TOKEN)?;

    if !ctx.quiet() {
        let ui_ctx = ctx.ui_context(false);
        match ui_ctx.mode {
            OutputMode::Pretty => print(&ui_ctx, &badge(&ui_ctx, Badge::Ok, "Logged out")),
            OutputMode::Plain | OutputMode::Json => println!("status=ok"),
        }
    }
    Ok(())
}
