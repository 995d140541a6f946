//! Commented default config written on first launch.

/// Generate the default TOML config content with comments.
pub(super) fn default_config_toml() -> &'static str {
    r##"# Notch terminal configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[terminal]
# backend = "direct_pipe"         # direct_pipe, http_bridge
# cols = 80                       # 10-500
# rows = 24                       # 5-500
# read_chunk_bytes = 8192         # 512-65536
# drop_submit = "insert_only"     # insert_only, insert_and_submit
# history_capacity = 100          # 1-10000
# persist_history = true

[shell]
# program = ""                    # empty = $SHELL
# args = []
# working_directory = "~/src"
# login_shell = true

[shell.env]
# EDITOR = "nvim"

[bridge]
# program = "ttyd"
# args = ["--port", "{port}", "--interface", "127.0.0.1", "--writable", "{shell}"]
# port_start = 7681               # 1024-65535
# port_range = 10                 # 1-1000
# grace_period_ms = 1000
# retry_interval_ms = 2000
# max_attempts = 30               # 1-1000

[environment]
# extra_path = ["/opt/homebrew/bin", "/usr/local/bin", "~/.cargo/bin"]

[logging]
# level = "info"                  # trace, debug, info, warn, error
"##
}
