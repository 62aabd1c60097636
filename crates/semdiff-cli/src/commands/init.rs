use std::path::PathBuf;

use semdiff_core::seed::seed_default_scales;
use semdiff_core::SqliteStorage;

use crate::app::{resolve_config_path, AppContext};
use crate::cli::InitArgs;
use crate::config::{write_config, SemdiffConfig};
use crate::ui::{badge, blank_line, hint, kv, print, Badge, OutputMode};

pub fn handle_init(ctx: &AppContext, args: &InitArgs) -> anyhow::Result<()> {
    let target = match args.path.as_deref() {
        Some(path) => PathBuf::from(path),
        None => ctx.database_path()?,
    };
    let existed = target.exists();

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            anyhow::anyhow!(
                "Failed to create database directory {}: {}",
                parent.display(),
                e
            )
        })?;
    }

    let storage = SqliteStorage::open(&target)?;
    let seeded = if args.no_seed {
        0
    } else {
        seed_default_scales(&storage)?
    };

    // Remember the location unless the config already points somewhere.
    let config_path = resolve_config_path()?;
    let config_written = if config_path.exists() {
        false
    } else {
        write_config(&config_path, &SemdiffConfig::new(&target))?;
        true
    };

    if ctx.quiet() {
        return Ok(());
    }

    let ui_ctx = ctx.ui_context(false);
    let path = target.display().to_string();
    let message = if existed {
        format!("Database ready at {}", path)
    } else {
        format!("Initialized new database at {}", path)
    };
    match ui_ctx.mode {
        OutputMode::Pretty => {
            print(&ui_ctx, &badge(&ui_ctx, Badge::Ok, &message));
            print(&ui_ctx, &kv(&ui_ctx, "Schema version", &storage.schema_version()?.to_string()));
            print(&ui_ctx, &kv(&ui_ctx, "Scales seeded", &seeded.to_string()));
            if config_written {
                print(&ui_ctx, &kv(&ui_ctx, "Config", &config_path.display().to_string()));
            }
            blank_line(&ui_ctx);
            print(
                &ui_ctx,
                &hint(&ui_ctx, "semdiff student add --class 3A --number 1 --first Léa --last Martin"),
            );
        }
        OutputMode::Plain | OutputMode::Json => {
            println!("status=ok");
            println!("database={}", path);
            println!("seeded_scales={}", seeded);
            if config_written {
                println!("config={}", config_path.display());
            }
        }
    }
    Ok(())
}
