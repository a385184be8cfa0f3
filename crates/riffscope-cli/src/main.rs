/// riffscope command-line tool: dump, summarize, and validate AVI files
/// down to the bit level.
///
/// # Command overview
///
/// ```text
/// riffscope <COMMAND> [OPTIONS]
///
/// Commands:
///   dump       Print the full field tree of an AVI file
///   streams    Print a per-stream summary table
///   validate   Check an AVI file for structural correctness
///   help       Print help information
///
/// Global options:
///   -v, --verbose    Log tolerated oddities (skipped index entries etc.)
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                 |
/// |------|-----------------------------------------|
/// | 0    | Success                                 |
/// | 1    | Error (I/O failure, invalid file, etc.) |
///
/// All errors and log lines go to stderr so stdout can be piped cleanly.
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cmd_dump;
mod cmd_streams;
mod cmd_validate;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// The riffscope command-line tool.
///
/// Dump, summarize, and validate AVI containers.
#[derive(Parser)]
#[command(name = "riffscope", version, about = "AVI container dissector")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (tolerated index oddities and the like).
    #[arg(short, long, global = true)]
    verbose: bool,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Print the full field tree of an AVI file.
    Dump(DumpArgs),
    /// Print a per-stream summary table.
    Streams(StreamsArgs),
    /// Check an AVI file for structural correctness.
    Validate(ValidateArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `riffscope dump`.
///
/// Decodes the file and prints every field the dissection produced:
/// chunk headers, flag bits, index entries, and the per-stream sample
/// arrays, each with its absolute position in the file.
#[derive(clap::Args)]
pub struct DumpArgs {
    /// Path to the AVI file to dump.
    pub file: PathBuf,

    /// Emit the tree as JSON instead of the text rendering.
    #[arg(long)]
    pub json: bool,

    /// Leave payload chunks and indexed samples as raw byte ranges
    /// instead of handing them to registered codecs.
    #[arg(long)]
    pub raw_samples: bool,
}

/// Arguments for `riffscope streams`.
///
/// Prints one line per declared stream: kind, handler, mapped codec,
/// which index located its samples, and how much sample data they cover.
#[derive(clap::Args)]
pub struct StreamsArgs {
    /// Path to the AVI file to summarize.
    pub file: PathBuf,
}

/// Arguments for `riffscope validate`.
///
/// Attempts a full decode and reports either a set of success
/// checkmarks or a diagnostic error. Exit code 0 on a valid file,
/// 1 on any structural problem.
#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Path to the AVI file to validate.
    pub file: PathBuf,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Dump(args) => cmd_dump::run(&args),
        Commands::Streams(args) => cmd_streams::run(&args),
        Commands::Validate(args) => cmd_validate::run(&args),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// `RUST_LOG` wins when set; otherwise the verbose flag picks a default.
fn init_logging(verbose: bool) {
    let fallback = if verbose {
        "riffscope_avi=debug"
    } else {
        "riffscope_avi=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
