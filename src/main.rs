use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod engine;
mod error;
mod gallery;
mod outcome;
mod program;
mod sandbox;
mod store;
mod submission;
mod templates;
mod workspace;

use commands::files::{parse_file_arg, FileArg};
use commands::setup::Overrides;
use commands::{RenderArgs, EXIT_CALLER_ERROR, EXIT_INTERNAL_ERROR};
use error::EngineError;

#[derive(Parser)]
#[command(name = "plotbox")]
#[command(
    author,
    version,
    about = "Run plotting code in a sandbox and keep a gallery of the results"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ./plotbox.toml if present)
    #[arg(long, global = true, env = "PLOTBOX_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database holding stored plots
    #[arg(long, global = true, env = "PLOTBOX_DB")]
    db: Option<PathBuf>,

    /// Directory to create execution workspaces in
    #[arg(long, global = true)]
    tmpdir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default plotbox.toml in the current directory
    Init {
        /// Force overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Execute code and save the image without storing anything
    Run {
        /// File with the code to run, or - for stdin
        code: String,

        /// Extra input file, staged under NAME
        #[arg(long = "file", value_name = "NAME=PATH", value_parser = parse_file_arg)]
        files: Vec<FileArg>,

        #[command(flatten)]
        render: RenderArgs,

        /// Where to write the image (default: plot.<format>)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Execute code and store it if it renders
    Plot {
        /// File with the code to run, or - for stdin
        code: String,

        /// Extra input file, staged under NAME
        #[arg(long = "file", value_name = "NAME=PATH", value_parser = parse_file_arg)]
        files: Vec<FileArg>,

        #[command(flatten)]
        render: RenderArgs,

        /// Where to write the image (default: <id>.<format>)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show the code and files of a stored plot
    Show {
        /// Plot id
        id: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a stored plot again
    Render {
        /// Plot id
        id: String,

        #[command(flatten)]
        render: RenderArgs,

        /// Where to write the image (default: <id>.<format>)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Re-execute a stored plot with replaced files and store the result
    Replot {
        /// Plot id
        id: String,

        /// Replacement for a file of the stored plot
        #[arg(long = "file", value_name = "NAME=PATH", value_parser = parse_file_arg)]
        files: Vec<FileArg>,

        #[command(flatten)]
        render: RenderArgs,

        /// Where to write the image (default: <new id>.<format>)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("plotbox=debug")
    } else {
        EnvFilter::new("plotbox=info")
    };

    let text_layer = (!cli.json_logs).then(|| fmt::layer().with_writer(std::io::stderr));
    let json_layer = cli
        .json_logs
        .then(|| fmt::layer().json().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(text_layer)
        .with(json_layer)
        .with(filter)
        .init();

    match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => report(&err),
    }
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let overrides = Overrides {
        config: cli.config,
        db: cli.db,
        tmpdir: cli.tmpdir,
    };
    let config = || commands::setup::load_config(&overrides);

    match cli.command {
        Commands::Init { force } => {
            commands::init::run(force)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run {
            code,
            files,
            render,
            out,
        } => commands::run::run(&config()?, &code, &files, &render, out.as_deref()).await,
        Commands::Plot {
            code,
            files,
            render,
            out,
        } => commands::plot::run(&config()?, &code, &files, &render, out.as_deref()).await,
        Commands::Show { id, json } => {
            commands::show::run(&config()?, &id, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Render { id, render, out } => {
            commands::render::run(&config()?, &id, &render, out.as_deref()).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Replot {
            id,
            files,
            render,
            out,
        } => commands::replot::run(&config()?, &id, &files, &render, out.as_deref()).await,
    }
}

/// Prints an error and picks the exit status. Server faults are logged in
/// full but shown only as a generic message.
fn report(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<EngineError>() {
        Some(engine_err) if engine_err.is_server_fault() => {
            error!("{:#}", err);
            eprintln!("{} {}", "Error:".red().bold(), engine_err.public_message());
            ExitCode::from(EXIT_INTERNAL_ERROR)
        }
        Some(engine_err) => {
            eprintln!("{} {}", "Error:".red().bold(), engine_err.public_message());
            ExitCode::from(EXIT_CALLER_ERROR)
        }
        None => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            ExitCode::from(EXIT_CALLER_ERROR)
        }
    }
}
