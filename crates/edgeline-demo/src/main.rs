//! Edgeline demo entrypoint: a minimal interactive shell prompt wiring the
//! core read-eval loop into a real terminal.

mod fs_completion;

use anyhow::{Context, Result};
use clap::Parser;
use edgeline_config::Config;
use edgeline_core::{Core, LineResult};
use edgeline_history::{History, HistoryPolicy};
use edgeline_terminal::CrosstermTerminalIo;
use fs_completion::FsCompletionSource;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

const PROMPT: &str = "edgeline> ";

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "edgeline", version, about = "Edgeline line-editing demo shell")]
struct Args {
    /// Optional configuration file path. Falls back to $EDGELINE_CONFIG, then
    /// ~/.config/edgeline/config.toml.
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Optional history file path. Falls back to ~/.edgeline_history.
    #[arg(long = "history")]
    history: Option<PathBuf>,
}

impl Args {
    fn config_path(&self) -> PathBuf {
        if let Some(path) = &self.config {
            return path.clone();
        }
        if let Ok(path) = std::env::var("EDGELINE_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .map(|d| d.join("edgeline").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("edgeline.toml"))
    }

    fn history_path(&self) -> PathBuf {
        if let Some(path) = &self.history {
            return path.clone();
        }
        dirs::home_dir()
            .map(|d| d.join(".edgeline_history"))
            .unwrap_or_else(|| PathBuf::from(".edgeline_history"))
    }
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("edgeline.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, "edgeline.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(_) => Some(guard),
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();

    let args = Args::parse();
    info!(target: "runtime", "startup");

    let config = Config::load(&args.config_path()).context("loading configuration")?;

    let history_path = args.history_path();
    let policy = HistoryPolicy {
        ignore_duplicates: config.history.ignore_duplicates,
        ignore_space: config.history.ignore_space,
        max_line_bytes: config.history.max_line_bytes,
        case_sensitive: config.history.case_sensitive,
    };
    let mut history = History::new(config.history.capacity as usize, policy)
        .context("constructing history ring")?;
    if let Err(e) = history.load(&history_path) {
        warn!(target: "runtime", error = %e, "failed to load history file");
    }

    let io = CrosstermTerminalIo::new();
    let mut core = Core::new(io, config, PROMPT.len(), history);
    let source = FsCompletionSource;

    let exit_code = run_loop(&mut core, &source);

    if let Err(e) = core.session().history().save(&history_path) {
        warn!(target: "runtime", error = %e, "failed to save history file");
    }

    info!(target: "runtime", "shutdown");
    std::process::exit(exit_code);
}

fn run_loop(core: &mut Core<CrosstermTerminalIo>, source: &FsCompletionSource) -> i32 {
    let guard = match core.enter_guard() {
        Ok(g) => g,
        Err(e) => {
            eprintln!("failed to enter raw mode: {e}");
            return 1;
        }
    };

    loop {
        print!("{PROMPT}");
        let _ = std::io::stdout().flush();

        match core.run_line(source) {
            LineResult::Accepted(line) => {
                print!("\r\n");
                let _ = std::io::stdout().flush();
                if line.trim() == "exit" {
                    drop(guard);
                    return 0;
                }
                println!("{line}\r");
            }
            LineResult::Cancelled => {
                print!("\r\n");
                let _ = std::io::stdout().flush();
            }
            LineResult::Eof => {
                print!("\r\n");
                let _ = std::io::stdout().flush();
                drop(guard);
                return 0;
            }
            LineResult::Error(e) => {
                eprintln!("\r\nedgeline: {e}\r");
                drop(guard);
                return 1;
            }
        }
    }
}
