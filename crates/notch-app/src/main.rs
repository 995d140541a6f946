mod cli;
mod commands;
mod panel;

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use notch_common::{BackendKind, DropSubmitPolicy};
use notch_config::schema::NotchConfig;
use notch_terminal::{
    CommandHistory, DirectPipeBackend, FileHistoryStore, HttpBridgeBackend, PortAllocator,
    ProcessSupervisor, SessionBackend, SessionOptions, TerminalSession,
};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::commands::parse_line;
use crate::panel::{Flow, TerminalPanel};

/// How often the main loop drains session events while stdin is idle.
const PUMP_INTERVAL: Duration = Duration::from_millis(30);

fn init_logging(directive: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                directive
                    .parse()
                    .unwrap_or_else(|_| LevelFilter::INFO.into()),
            ),
        )
        .init();
}

fn build_history(config: &NotchConfig) -> CommandHistory {
    let capacity = config.terminal.history_capacity as usize;
    if !config.terminal.persist_history {
        return CommandHistory::new(capacity);
    }
    match notch_platform::history_file() {
        Ok(path) => CommandHistory::with_store(capacity, Box::new(FileHistoryStore::new(path))),
        Err(e) => {
            tracing::warn!("History file unavailable, keeping history in memory: {e}");
            CommandHistory::new(capacity)
        }
    }
}

fn build_backend(
    kind: BackendKind,
    config: &NotchConfig,
    runtime: &tokio::runtime::Runtime,
) -> Box<dyn SessionBackend> {
    let supervisor = ProcessSupervisor::new(config.environment.extra_path.clone());
    match kind {
        BackendKind::DirectPipe => Box::new(DirectPipeBackend::new(supervisor)),
        BackendKind::HttpBridge => Box::new(HttpBridgeBackend::new(
            supervisor,
            PortAllocator::new(),
            config.bridge.clone(),
            runtime.handle().clone(),
        )),
    }
}

/// Forward stdin lines to the main loop until EOF.
fn spawn_stdin_reader(tx: mpsc::Sender<String>) {
    let result = thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!("stdin read error: {e}");
                        break;
                    }
                }
            }
        });
    if let Err(e) = result {
        tracing::error!("Failed to spawn stdin reader: {e}");
    }
}

fn run<W: std::io::Write>(panel: &mut TerminalPanel<W>, lines: mpsc::Receiver<String>) {
    loop {
        match lines.recv_timeout(PUMP_INTERVAL) {
            Ok(line) => {
                if panel.handle(parse_line(&line)) == Flow::Exit {
                    break;
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::info!("stdin closed");
                break;
            }
        }
        if panel.pump() == Flow::Exit {
            break;
        }
    }
}

fn main() {
    notch_platform::install_panic_hook();

    let args = cli::parse();

    // Config comes first so its log level can apply; problems are logged
    // once logging is up.
    let config_path = args.config.as_deref().map(Path::new);
    let loaded = notch_config::load_config(config_path);
    let config = loaded.as_ref().cloned().unwrap_or_default();

    let directive = args
        .log_level
        .as_deref()
        .map(|level| format!("notch={level}"))
        .unwrap_or_else(|| config.logging.directive());
    init_logging(&directive);

    tracing::info!("notch v{} starting...", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &args.config {
        tracing::info!("Using config override: {path}");
    }
    if let Err(e) = &loaded {
        tracing::warn!("Config load failed, using defaults: {e}");
    }

    if let Err(e) = notch_platform::ensure_dirs() {
        tracing::warn!("Failed to create directories: {e}");
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    let kind = args.backend.map(BackendKind::from).unwrap_or(config.terminal.backend);
    let mut options = SessionOptions::from_config(&config);
    if let Some(dir) = &args.directory {
        options.cwd = Some(PathBuf::from(dir));
    }
    if args.drop_submit {
        options.drop_policy = DropSubmitPolicy::InsertAndSubmit;
    }

    let shell = config.shell.resolved_program();
    let shell_args = match &args.execute {
        Some(cmd) => vec!["-c".to_string(), cmd.clone()],
        None => config.shell.interactive_args(),
    };

    let (session, events) = TerminalSession::with_channel(
        options,
        build_backend(kind, &config, &runtime),
        build_history(&config),
    );
    tracing::info!(backend = %kind, session_id = %session.id().short(), "Session created");

    let mut panel = TerminalPanel::new(session, events, std::io::stdout());
    if let Err(e) = panel.open(&shell, &shell_args) {
        tracing::error!("Failed to open terminal session: {e}");
        panel.close();
        std::process::exit(1);
    }

    let (line_tx, line_rx) = mpsc::channel();
    spawn_stdin_reader(line_tx);
    run(&mut panel, line_rx);

    panel.close();
    if !panel.is_finished() {
        tracing::warn!("Session did not reach a final state");
    }
    drop(panel);
    runtime.shutdown_timeout(Duration::from_secs(1));
    tracing::info!("Shutdown complete");
}
