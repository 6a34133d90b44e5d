//! kicad-openpnp: convert KiCad footprints to OpenPnP packages
//!
//! Writes the package XML to stdout. Diagnostics go to stderr, so the
//! output can be redirected straight into a packages file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use kicad_openpnp::config::Config;
use kicad_openpnp::openpnp::Style;
use kicad_openpnp::{convert_board, convert_footprint};

/// Convert KiCad footprints to OpenPnP packages.
///
/// Reads footprint pads and 3D model sizes from KiCad libraries and prints
/// OpenPnP `<package>` XML.
#[derive(Parser, Debug)]
#[command(name = "kicad-openpnp")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// KiCad configuration directory (default: the per-user KiCad 8.0 directory)
    #[arg(long, value_name = "DIR", global = true)]
    kicad_config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a single library footprint to a <package>
    Footprint {
        /// Library directory (.pretty) or nickname
        #[arg(short, long, value_name = "LIB")]
        library: Option<String>,

        /// Footprint name, optionally qualified as Lib:Name
        #[arg(short, long, value_name = "NAME")]
        footprint: String,

        /// Indent the output, closing empty elements with " />"
        #[arg(short, long)]
        pretty: bool,
    },

    /// Convert every footprint placed on a board to <openpnp-packages>
    Board {
        /// KiCad board file
        #[arg(short, long, value_name = "BOARD")]
        board: PathBuf,

        /// Join with an existing packages file; its packages take precedence
        #[arg(short, long, value_name = "FILE")]
        join: Option<PathBuf>,

        /// Close empty elements with " />" instead of OpenPnP's "/>"
        #[arg(short, long)]
        pretty: bool,
    },
}

/// Determines the log level from CLI arguments.
const fn get_log_level(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Directory holding the board, used as the project directory.
fn project_dir(board: &Path) -> PathBuf {
    match board.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Entry point for kicad-openpnp.
fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(get_log_level(args.verbose, args.quiet));

    info!(version = env!("CARGO_PKG_VERSION"), "Starting kicad-openpnp");

    let config = Config::load(args.kicad_config.as_deref());

    // The document is built completely before anything reaches stdout.
    let result = match &args.command {
        Command::Footprint {
            library,
            footprint,
            pretty,
        } => convert_footprint(
            &config,
            library.as_deref(),
            footprint,
            Style::footprint(*pretty),
        ),
        Command::Board {
            board,
            join,
            pretty,
        } => {
            let config = config.with_project(&project_dir(board));
            convert_board(&config, board, join.as_deref(), Style::board(*pretty))
        }
    };

    match result {
        Ok(xml) => {
            println!("{xml}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Conversion failed");
            ExitCode::FAILURE
        }
    }
}
