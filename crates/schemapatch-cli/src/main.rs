//! Schemapatch CLI - patch CRD manifests with generated schemata

use clap::{Args, Parser, Subcommand};
use schemapatch_core::CancellationToken;
use std::path::PathBuf;
use tracing::Level;

mod commands;
mod display;
mod error;
mod exit_codes;
mod telemetry;

#[derive(Parser)]
#[command(name = "schemapatch")]
#[command(author = "Schemapatch Contributors")]
#[command(version)]
#[command(
    about = "Patch CustomResourceDefinition manifests with generated schemata",
    long_about = None
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: ./schemapatch.yaml)
    #[arg(long, global = true, env = "SCHEMAPATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Log what is written
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log every decision, including skipped files and schemata
    #[arg(long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Patch manifests and write them out
    Patch {
        #[command(flatten)]
        input: InputArgs,

        /// Write patched manifests here instead of in place
        #[arg(long, env = "SCHEMAPATCH_OUTPUT_DIR", conflicts_with = "stdout")]
        output_dir: Option<PathBuf>,

        /// Print patched manifests to stdout
        #[arg(long)]
        stdout: bool,
    },

    /// Show what `patch` would change, failing when anything would
    Check {
        #[command(flatten)]
        input: InputArgs,
    },
}

/// Settings shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Directory holding the CRD manifests
    #[arg(long, env = "SCHEMAPATCH_MANIFESTS")]
    pub manifests: Option<PathBuf>,

    /// Schema bundle file(s), merged in order
    #[arg(short = 's', long = "schemas", env = "SCHEMAPATCH_SCHEMAS", value_delimiter = ',')]
    pub schemas: Vec<PathBuf>,

    /// Truncate descriptions to this many bytes (0 drops them)
    #[arg(long, env = "SCHEMAPATCH_MAX_DESC_LEN")]
    pub max_desc_len: Option<usize>,
}

fn main() {
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            // help and version go to stdout
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };
    telemetry::init_tracing(cli.json_logs, level);

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Patch {
            input,
            output_dir,
            stdout,
        } => commands::patch::run(config, &input, output_dir, stdout, cancel),
        Commands::Check { input } => commands::check::run(config, &input, cancel),
    };

    let code = match result {
        Ok(code) => code,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}

/// Cancel `token` on Ctrl-C; the generator stops before the next file
fn cancel_on_interrupt(token: CancellationToken) {
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build();
        let runtime = match runtime {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::debug!(error = %e, "cannot watch for interrupts");
                return;
            }
        };
        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, stopping before the next file");
                token.cancel();
            }
        });
    });
}
