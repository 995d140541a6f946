pub mod crash_report;
pub mod paths;

pub use crash_report::install_panic_hook;
pub use paths::{config_dir, crash_report_dir, data_dir, ensure_dirs, history_file, log_dir};
