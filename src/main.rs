#[cfg(not(feature = "cli"))]
compile_error!("The `mybinlog` binary requires the `cli` feature. Build with `--features cli`.");

use clap::Parser;
use std::fs::File;
use std::io::Write;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mysqlbinlog::cli;
use mysqlbinlog::cli::app::{Cli, ColorMode, Commands};
use mysqlbinlog::BinlogError;

fn main() {
    let cli = Cli::parse();

    init_logging(cli.debug);

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {} // colored auto-detects tty
    }

    let writer_result: Result<Box<dyn Write>, BinlogError> = match &cli.output {
        Some(path) => File::create(path)
            .map(|f| Box::new(f) as Box<dyn Write>)
            .map_err(|e| BinlogError::Io(format!("Cannot create {}: {}", path, e))),
        None => Ok(Box::new(std::io::stdout()) as Box<dyn Write>),
    };

    let mut writer = match writer_result {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Events {
            file,
            json,
            limit,
            strict,
        } => cli::events::execute(
            &cli::events::EventsOptions {
                file,
                json,
                limit,
                strict,
            },
            &mut writer,
        ),

        Commands::Info { file, json } => {
            cli::info::execute(&cli::info::InfoOptions { file, json }, &mut writer)
        }

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "mybinlog", &mut writer);
            Ok(())
        }
    };

    let result = result.and_then(|_| {
        writer
            .flush()
            .map_err(|e| BinlogError::Io(format!("Cannot flush output: {}", e)))
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Diagnostics go to stderr so decoded events on stdout stay parseable.
fn init_logging(debug: bool) {
    let env_filter = if debug {
        EnvFilter::new("mysqlbinlog=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mysqlbinlog=warn"))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
