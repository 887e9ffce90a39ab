//! keepsake — keep small values in step between memory, disk and FTP.
//!
//! # Usage
//!
//! ```text
//! keepsake pull <namespace> [--config <yaml>] [--local-path <dir>] [--remote-path <prefix>] [--blob]
//! keepsake push <namespace> [...]
//! keepsake show <namespace> [--json] [...]
//! keepsake watch <namespace> [...]
//! ```
//!
//! Remote access reads `FTP_HOST`, `FTP_USER` and `FTP_PASS`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{pull::PullArgs, push::PushArgs, show::ShowArgs, watch::WatchArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "keepsake",
    version,
    about = "Persist namespaced values to disk and an FTP mirror",
    long_about = None,
)]
struct Cli {
    /// Log every sync step.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download the remote copy over the local file once.
    Pull(PullArgs),

    /// Upload the local file to the remote mirror once.
    Push(PushArgs),

    /// Print the local value of a namespace.
    Show(ShowArgs),

    /// Register a namespace and keep persisting it until ctrl-c.
    Watch(WatchArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Pull(args) => args.run(cli.verbose),
        Commands::Push(args) => args.run(cli.verbose),
        Commands::Show(args) => args.run(),
        Commands::Watch(args) => args.run(cli.verbose),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
