use std::env;

use clap::Parser;
use cli::{Args, Commands};
use hop_core::{error::ErrorContext, HopResult};
use hop_operations::HopContext;
use logging::setup_logging;
use tracing::debug;

mod cli;
mod commands;
mod logging;
mod sink;
mod status;
mod utils;

fn handle_cli() -> HopResult<()> {
    let args = Args::parse();

    if args.no_color {
        utils::disable_color();
    }
    setup_logging(&args);

    let directory = match &args.directory {
        Some(directory) => directory.clone(),
        None => env::current_dir().with_context(|| "reading the current directory".to_string())?,
    };

    let command = match args.command {
        Some(Commands::New {
            name,
            devel,
        }) => return commands::new_package(&directory, &name, devel),
        command => command,
    };

    let Some(root) = HopContext::discover(&directory) else {
        return status::display_uninitialized(args.json);
    };
    debug!("using hop repository at {}", root.display());
    let ctx = HopContext::open(&root, commands::log_sink())?;

    match command {
        None => status::display_status(&ctx, args.json)?,
        Some(Commands::New { .. }) => {}
        Some(Commands::Prepare {
            level,
            message,
        }) => commands::prepare_release(&ctx, &level, message.as_deref())?,
        Some(Commands::Stage {
            file,
            down,
        }) => commands::stage_patch(&ctx, &file, down.as_deref())?,
        Some(Commands::Apply) => commands::apply_release(&ctx)?,
        Some(Commands::Undo {
            database_only,
        }) => commands::undo_release(&ctx, database_only)?,
        Some(Commands::Release {
            push,
        }) => commands::commit_release(&ctx, push)?,
        Some(Commands::Restore {
            release,
            force,
        }) => commands::restore_release(&ctx, &release, force)?,
        Some(Commands::Upgrade) => commands::upgrade_database(&ctx)?,
        Some(Commands::SyncPackage) => commands::sync_package(&ctx)?,
    }

    Ok(())
}

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli() {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
