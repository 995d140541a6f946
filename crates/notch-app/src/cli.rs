use clap::{Parser, ValueEnum};
use notch_common::BackendKind;

/// notch: an embedded terminal panel, driven from stdin.
#[derive(Parser, Debug)]
#[command(name = "notch", version, about)]
pub struct Args {
    /// Execute a command instead of the default shell.
    #[arg(short = 'e', long)]
    pub execute: Option<String>,

    /// Working directory to start in.
    #[arg(short = 'd', long)]
    pub directory: Option<String>,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Session backend; defaults to the configured one.
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Press Enter after dropped paths or pasted text.
    #[arg(long)]
    pub drop_submit: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    Direct,
    Http,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Direct => BackendKind::DirectPipe,
            BackendArg::Http => BackendKind::HttpBridge,
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
