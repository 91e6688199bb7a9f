#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use loadpath_core::ImportConfig;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "loadpath")]
#[command(
    author,
    version,
    about = "Resolve, load and precompile units from a search path",
    long_about = None
)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Search path entry, consulted before LOADPATH_PATH (repeatable)
    #[arg(long = "path", global = true, value_name = "DIR")]
    path: Vec<PathBuf>,

    /// Never persist compiled artifacts
    #[arg(long, global = true)]
    no_write_artifacts: bool,

    /// Match file names case-insensitively
    #[arg(long, global = true)]
    case_ok: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Import a unit and report it along with the registry
    Import {
        /// Absolute dotted name (e.g. "pkg.mod")
        name: String,

        /// Names to pull from the unit, as in `from NAME import ATTR` (repeatable)
        #[arg(long = "from", value_name = "ATTR")]
        from: Vec<String>,
    },

    /// Report which loader would handle a name, without loading it
    Find {
        /// Absolute dotted name
        name: String,
    },

    /// Write artifacts for every source file under a directory
    Compile {
        /// Directory to walk
        dir: PathBuf,

        /// Recompile even when an artifact is current
        #[arg(long)]
        force: bool,
    },

    /// Show an artifact's header and whether it is current
    Inspect {
        /// Path to a `.srcc` artifact
        artifact: PathBuf,
    },
}

impl Cli {
    fn import_config(&self) -> ImportConfig {
        let prepended = self
            .path
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();

        let mut config = ImportConfig::from_env().with_prepended_path(prepended);
        if self.no_write_artifacts {
            config = config.with_dont_write_artifacts(true);
        }
        if self.case_ok {
            config = config.with_case_ok(true);
        }
        config
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json);

    let config = cli.import_config();
    tracing::debug!(search_path = ?config.search_path, "configured");

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(cli.json),
        Some(Commands::Import { name, from }) => {
            let span = tracing::info_span!("import", cmd = "import", name = %name);
            let _guard = span.enter();
            commands::import::run(&config, &name, &from, cli.json)
        }
        Some(Commands::Find { name }) => commands::find::run(&config, &name, cli.json),
        Some(Commands::Compile { dir, force }) => {
            let span = tracing::info_span!("compile", cmd = "compile", dir = %dir.display());
            let _guard = span.enter();
            commands::compile::run(&config, &dir, force, cli.json)
        }
        Some(Commands::Inspect { artifact }) => commands::inspect::run(&artifact, cli.json),
    }
}
