use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use simplelog::{Config, LevelFilter, WriteLogger};

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Render PDF pages and draw rectangular tags on them from an event script.
#[derive(Parser, Debug)]
#[command(name = "pagetag")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// PDF file to open
    file: PathBuf,

    /// Settings file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Event script to run after the first page renders, `-` for stdin
    #[arg(short, long)]
    script: Option<String>,

    /// Write the final page with its tags to this PNG
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Let renders settle only on `wait` instead of after every command
    #[arg(long)]
    no_auto_wait: bool,

    /// How long to wait for a single render, in milliseconds
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    #[arg(long, default_value = "pagetag.log")]
    log_file: PathBuf,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

fn main() -> Result<()> {
    let args = Args::parse();

    WriteLogger::init(
        args.log_level.into(),
        Config::default(),
        File::create(&args.log_file)
            .with_context(|| format!("Failed to create log file {}", args.log_file.display()))?,
    )?;
    info!("Starting pagetag on {}", args.file.display());

    let result = run(&args);
    if let Err(e) = &result {
        log::error!("Application error: {e:?}");
    }
    info!("Shutting down pagetag");
    result
}

#[cfg(feature = "pdf")]
fn run(args: &Args) -> Result<()> {
    use std::fs;
    use std::io::{self, BufReader, Write};
    use std::sync::Arc;
    use std::time::Duration;

    use pagetag::Viewer;
    use pagetag::pdf::{MupdfBackend, sniff_mime};
    use pagetag::script::ScriptRunner;
    use pagetag::settings::load_settings;

    let settings = load_settings(args.config.as_deref());
    let timeout = Duration::from_millis(args.timeout_ms);

    let bytes =
        fs::read(&args.file).with_context(|| format!("Failed to read {}", args.file.display()))?;
    if sniff_mime(&bytes).is_none() {
        anyhow::bail!("{} is not a PDF document", args.file.display());
    }

    let mut viewer = Viewer::new(Arc::new(MupdfBackend), &settings);
    viewer
        .load(bytes)
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {e}", args.file.display()))?;
    viewer.wait_for_render(timeout);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Some(script) = &args.script {
        let mut runner =
            ScriptRunner::new(&mut viewer, &mut out, timeout).auto_wait(!args.no_auto_wait);
        if script == "-" {
            runner.run_reader(io::stdin().lock())?;
        } else {
            let file =
                File::open(script).with_context(|| format!("Failed to open script {script}"))?;
            runner.run_reader(BufReader::new(file))?;
        }
    }

    viewer.wait_for_render(timeout);
    if let Some(path) = &args.snapshot {
        viewer
            .snapshot(path)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
    }

    viewer.pump();
    for notification in viewer.notifications().all().iter().rev() {
        eprintln!("{:?}: {}", notification.level, notification.message);
    }

    let tags: Vec<_> = viewer.tags().iter().collect();
    writeln!(out, "{}", serde_json::to_string_pretty(&tags)?)?;
    Ok(())
}

#[cfg(not(feature = "pdf"))]
fn run(_args: &Args) -> Result<()> {
    anyhow::bail!("pagetag was built without the `pdf` feature; no document backend available")
}
