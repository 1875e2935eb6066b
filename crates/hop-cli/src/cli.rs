use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Run as if hop was started in <DIRECTORY>
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub directory: Option<PathBuf>,

    /// Without a subcommand, prints the repository status
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new hop repository
    #[command(arg_required_else_help = true)]
    New {
        /// Name of the package, also the directory created
        name: String,

        /// Author releases in this repository instead of only syncing the package
        #[arg(required = false, long)]
        devel: bool,
    },

    /// Prepare the next release on its own branch
    Prepare {
        /// Which part of the version to bump: patch, minor or major
        #[arg(required = false, short, long, default_value = "patch")]
        level: String,

        /// Short description of the release
        #[arg(required = false, short, long)]
        message: Option<String>,
    },

    /// Add a SQL patch to the release in progress
    #[command(arg_required_else_help = true)]
    Stage {
        /// SQL script to stage
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,

        /// SQL script undoing FILE
        #[arg(required = false, short, long, value_hint = ValueHint::FilePath)]
        down: Option<PathBuf>,
    },

    /// Apply the release in progress to the development database
    Apply,

    /// Roll the release in progress back
    Undo {
        /// Only revert the database; keep the release branch
        #[arg(required = false, long)]
        database_only: bool,
    },

    /// Commit, merge and tag the applied release
    Release {
        /// Push the main branch and the new tag
        #[arg(required = false, long)]
        push: bool,
    },

    /// Move the database to a committed release
    #[command(arg_required_else_help = true)]
    Restore {
        /// Release to restore, e.g. 1.2.0
        release: String,

        /// Allow restoring a development database
        #[arg(required = false, short, long)]
        force: bool,
    },

    /// Apply every committed release the database is missing
    Upgrade,

    /// Regenerate the package from the database schema
    #[clap(name = "sync-package")]
    SyncPackage,
}
