use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ringlog::rotation::{find_log_files, SlotNaming};
use ringlog::{RingLogConfig, Severity, UserLog, UserLogLayer};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(long, global = true, help = "Path to configuration file")]
    config: Option<PathBuf>,

    /// Set log directory
    #[arg(long, global = true, help = "Directory for log files")]
    log_dir: Option<PathBuf>,

    /// Minimum severity written to the ring
    #[arg(long, global = true, help = "Severity threshold (debug, info, warning, error, fatal)")]
    threshold: Option<String>,

    /// Number of files in the ring
    #[arg(long, global = true)]
    slots: Option<usize>,

    /// Rotation size in bytes
    #[arg(long, global = true)]
    max_size: Option<u64>,

    /// Disable collapsing of repeated messages
    #[arg(long, global = true)]
    no_dedup: bool,

    /// Also copy this tool's own diagnostics into the ring
    #[arg(long, global = true)]
    mirror_diagnostics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write messages from arguments or stdin
    Write {
        #[arg(short, long, default_value = "warning")]
        severity: String,

        /// Emit any pending repeat summary before exiting
        #[arg(long)]
        flush: bool,

        messages: Vec<String>,
    },
    /// Log from many threads at once and report counters
    Stress {
        #[arg(long, default_value_t = 8)]
        threads: usize,

        #[arg(long, default_value_t = 1000)]
        messages: usize,

        /// How many times each message is repeated back to back
        #[arg(long, default_value_t = 1)]
        repeat: usize,
    },
    /// List slot files currently on disk
    List,
    /// Print the effective configuration
    Config {
        /// Save it to this path as well
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

/// Create writer configuration from CLI arguments
async fn create_ring_config(cli: &Cli) -> Result<RingLogConfig> {
    let mut config = RingLogConfig::load(cli.config.as_deref())
        .await
        .context("Failed to load ringlog configuration")?;

    if let Some(log_dir) = &cli.log_dir {
        config.log_dir = log_dir.clone();
    }
    if let Some(threshold) = &cli.threshold {
        config.threshold = threshold
            .parse()
            .with_context(|| format!("Invalid threshold '{}'", threshold))?;
    }
    if let Some(slots) = cli.slots {
        config.slot_count = slots;
    }
    if let Some(max_size) = cli.max_size {
        config.max_file_size_bytes = max_size;
    }
    if cli.no_dedup {
        config.dedup_enabled = false;
    }

    config.validate()?;
    Ok(config)
}

fn init_diagnostics(writer: Option<Arc<UserLog>>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false));

    match writer {
        Some(writer) => registry.with(UserLogLayer::new(writer)).init(),
        None => registry.init(),
    }
}

fn run_write(writer: &UserLog, severity: Severity, flush: bool, messages: &[String]) -> Result<()> {
    if messages.is_empty() {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = line.context("Failed to read stdin")?;
            writer.log(severity, format_args!("{}\n", line));
        }
    } else {
        for message in messages {
            writer.log(severity, format_args!("{}\n", message));
        }
    }

    if flush {
        writer.flush_repeats();
    }
    Ok(())
}

async fn run_stress(writer: Arc<UserLog>, threads: usize, messages: usize, repeat: usize) -> Result<()> {
    let started = std::time::Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let writer = Arc::clone(&writer);
            tokio::task::spawn_blocking(move || {
                for m in 0..messages {
                    for _ in 0..repeat.max(1) {
                        writer.log(
                            Severity::Fatal,
                            format_args!("stress worker {} message {}\n", t, m),
                        );
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.context("Stress worker panicked")?;
    }
    writer.flush_repeats();

    let stats = writer.stats();
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        lines = stats.lines_written,
        summaries = stats.repeat_summaries,
        rotations = stats.rotations,
        dropped = stats.dropped_writes,
        "Stress run finished"
    );
    if stats.dropped_writes > 0 {
        warn!("{} writes were dropped", stats.dropped_writes);
    }
    Ok(())
}

fn run_list(config: &RingLogConfig) -> Result<()> {
    let naming = SlotNaming::new(&config.log_dir, &config.base_name);
    let files = find_log_files(&naming).context("Failed to list log files")?;

    if files.is_empty() {
        println!("No log files in {}", config.log_dir.display());
    }
    for file in files {
        println!("slot {:>3}  {:>10} bytes  {}", file.slot, file.size, file.path.display());
    }
    Ok(())
}

async fn run_config(config: &RingLogConfig, save: Option<&std::path::Path>) -> Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    if let Some(path) = save {
        config
            .save(Some(path))
            .await
            .with_context(|| format!("Failed to save configuration to {}", path.display()))?;
        info!("Configuration saved to {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before parsing configuration
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = create_ring_config(&cli).await?;

    match &cli.command {
        Command::List => {
            init_diagnostics(None);
            run_list(&config)
        }
        Command::Config { save } => {
            init_diagnostics(None);
            run_config(&config, save.as_deref()).await
        }
        Command::Write {
            severity,
            flush,
            messages,
        } => {
            let severity: Severity = severity
                .parse()
                .with_context(|| format!("Invalid severity '{}'", severity))?;
            let writer = Arc::new(UserLog::standalone(config).context("Failed to open log ring")?);
            init_diagnostics(cli.mirror_diagnostics.then(|| Arc::clone(&writer)));
            run_write(&writer, severity, *flush, messages)
        }
        Command::Stress {
            threads,
            messages,
            repeat,
        } => {
            let writer = Arc::new(UserLog::standalone(config).context("Failed to open log ring")?);
            init_diagnostics(cli.mirror_diagnostics.then(|| Arc::clone(&writer)));
            info!(threads, messages, repeat, "Starting stress run");
            run_stress(writer, *threads, *messages, *repeat).await
        }
    }
}
