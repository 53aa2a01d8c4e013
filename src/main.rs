//! Portext command-line interface
//!
//! Resolves native extension modules for a CUDA or host-only build

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use portext::TargetMode;
use std::process;

/// Display an error with optional backtrace information
fn display_error(err: &anyhow::Error, backtrace_enabled: bool) {
    eprintln!("error: {err}");

    let mut source = err.source();
    while let Some(err) = source {
        eprintln!("caused by: {err}");
        source = err.source();
    }

    if backtrace_enabled {
        let backtrace = err.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            eprintln!("\nBacktrace:");
            eprintln!("{backtrace}");
        }
    }
}

#[derive(Parser)]
#[command(name = "portext")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Resolve native extension modules for a CUDA or host-only build",
    long_about = None
)]
pub(crate) struct Cli {
    /// Print debug output to stderr
    #[arg(long, global = true)]
    debug: bool,

    /// Show a backtrace for errors (requires `RUST_BACKTRACE=1`)
    #[arg(long, global = true)]
    backtrace: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by commands that read configuration
#[derive(Debug, Args)]
pub(crate) struct ConfigArgs {
    /// Path to a config file (default: ./.portext.toml or ~/.config/portext/config.toml)
    #[arg(long)]
    pub(crate) config: Option<String>,

    /// Ignore config files
    #[arg(long, conflicts_with = "config")]
    pub(crate) no_config: bool,

    /// CUDA toolkit path to probe (default: /usr/local/cuda)
    #[arg(long)]
    pub(crate) toolkit_path: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the CUDA toolkit is installed
    Detect {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Resolve the extension modules declared in portext.toml
    Resolve {
        /// Path to the manifest (default: nearest portext.toml)
        #[arg(long)]
        manifest: Option<String>,

        /// How to choose the build target
        #[arg(long, value_enum)]
        target: Option<TargetMode>,

        /// Preprocessor macro used as the capability marker
        #[arg(long)]
        capability_macro: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = commands::resolve::OutputFormat::Json)]
        format: commands::resolve::OutputFormat,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Show version, platform and effective configuration
    Env {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    portext::init_debug(cli.debug);

    let result = match cli.command {
        Commands::Detect { config } => commands::detect::run(&config),
        Commands::Resolve {
            manifest,
            target,
            capability_macro,
            format,
            config,
        } => commands::resolve::run(
            manifest.as_deref(),
            target,
            capability_macro,
            format,
            &config,
        ),
        Commands::Env { config } => commands::env::run(&config),
        Commands::Completion { shell } => commands::completion::run(shell),
    };

    if let Err(e) = result {
        display_error(&e, cli.backtrace);
        process::exit(1);
    }
}

mod commands;
