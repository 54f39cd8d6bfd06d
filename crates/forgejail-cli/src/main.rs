//! Forgejail CLI
//!
//! A command-line tool for running Python and JavaScript under nsjail.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use forgejail::{
    Config, EXAMPLE_CONFIG, ExecutionRequest, Language, Platform, ResourceLimits, Runner,
};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "forgejail")]
#[command(about = "Run untrusted code under nsjail with a wall-clock watchdog")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: forgejail.toml)
        #[arg(short, long, default_value = "forgejail.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Run a source file in the jail
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language (python, javascript, py or js)
        #[arg(short, long)]
        language: Language,

        /// Input file fed to the program's stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Time limit in seconds
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Memory limit in KB
        #[arg(short, long)]
        memory_limit: Option<u64>,

        /// Print the whole result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available languages
    Languages,

    /// Show effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Run {
            source,
            language,
            input,
            time_limit,
            memory_limit,
            json,
        } => {
            let limits = (time_limit.is_some() || memory_limit.is_some()).then_some(
                ResourceLimits {
                    time_limit,
                    memory_limit,
                },
            );
            let success =
                run_execute(config, &source, language, input.as_deref(), limits, json).await?;
            if !success {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Languages => list_languages(&config),
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

/// Materialize the source in a fresh working directory and execute it.
///
/// Returns whether the program ran successfully. The working directory is
/// removed when this returns, whatever the outcome.
async fn run_execute(
    config: Config,
    source: &Path,
    language: Language,
    input: Option<&Path>,
    limits: Option<ResourceLimits>,
    json: bool,
) -> Result<bool> {
    let source_content = tokio::fs::read(source)
        .await
        .context("failed to read source file")?;

    let input_data = match input {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .context("failed to read input file")?,
        ),
        None => None,
    };

    let work_dir = tempfile::Builder::new()
        .prefix("forgejail_")
        .tempdir()
        .context("failed to create working directory")?;
    let source_path = work_dir.path().join(language.source_name());
    tokio::fs::write(&source_path, &source_content)
        .await
        .context("failed to write source to working directory")?;

    let mut request = ExecutionRequest::new(source_path, language, work_dir.path());
    if let Some(data) = input_data {
        request = request.with_input(data);
    }
    if let Some(limits) = limits {
        request = request.with_limits(limits);
    }

    info!(%language, work_dir = %work_dir.path().display(), "running program");

    let runner = Runner::new(config);
    let result = runner.execute(&request).await.context("execution failed")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("failed to serialize result")?
        );
    } else {
        print!("{}", result.stdout);
        if !result.stderr.is_empty() {
            eprintln!("{}", result.stderr);
        }
    }

    // Log execution info via tracing (stderr), keeping stdout clean for piping
    info!(
        message = %result.message,
        exit_code = ?result.exit_code,
        elapsed = ?result.elapsed_seconds.map(|s| format!("{s:.3}s")),
        memory = ?result.memory_mb.map(|mb| format!("{mb:.3} MB")),
        timed_out = result.timed_out,
        error = ?result.error,
        "execution result"
    );

    Ok(result.is_success())
}

fn list_languages(config: &Config) -> Result<()> {
    let platform = Platform::current().context("unsupported platform")?;
    println!("Available languages on {platform}:\n");

    for language in Language::ALL {
        match config.interpreters.resolve(platform, language) {
            Ok(interpreter) => println!(
                "  {:<12} .{:<4} {}",
                language.id(),
                language.extension(),
                interpreter.command.join(" ")
            ),
            Err(_) => println!(
                "  {:<12} .{:<4} (not configured)",
                language.id(),
                language.extension()
            ),
        }
    }
    Ok(())
}

fn show_config(config: &Config) {
    println!("Default resource limits:");
    println!("  Time limit: {:?} s", config.default_limits.time_limit);
    println!("  Memory limit: {:?} KB", config.default_limits.memory_limit);
    println!();
    println!("Watchdog:");
    println!("  Grace: {} s", config.watchdog.grace);
    println!("  Reap timeout: {} s", config.watchdog.reap_timeout);
    println!();
    println!("nsjail binary: {}", config.nsjail_path.display());
    println!("time binary: {}", config.time_path.display());
    println!(
        "Sandbox identity: {}:{}",
        config.sandbox.user, config.sandbox.group
    );
    println!("Mounts configured: {}", config.sandbox.mounts.len());
    println!();
    println!(
        "Interpreters configured: {}",
        config.interpreters.entries().count()
    );
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
