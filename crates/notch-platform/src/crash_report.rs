use std::backtrace::Backtrace;
use std::panic::PanicHookInfo;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::paths::crash_report_dir;

/// Patterns for credentials that can leak into a panic message from typed
/// shell input or the child environment. Order matters: specific first.
static SECRET_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"AKIA[0-9A-Z]{16}",
        r"sk-[a-zA-Z0-9_\-]{20,}",
        r"gh[pos]_[a-zA-Z0-9]{16,}",
        r"Bearer [a-zA-Z0-9._\-]+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static secret pattern"))
    .collect()
});

/// `NAME=value` assignments whose name looks like a credential, as typed in
/// `export GITHUB_TOKEN=...`. The name is kept, the value redacted.
static SECRET_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([A-Z0-9_]*(?:KEY|TOKEN|SECRET|PASSWORD|PASSWD)[A-Z0-9_]*=)\S+")
        .expect("static assignment pattern")
});

/// Redact credential-looking substrings before anything is written to disk.
pub fn sanitize_secrets(input: &str) -> String {
    let mut result = SECRET_ASSIGNMENT
        .replace_all(input, "${1}[REDACTED]")
        .into_owned();
    for re in SECRET_PATTERNS.iter() {
        result = re.replace_all(&result, "[REDACTED]").into_owned();
    }
    result
}

/// Write a JSON crash report for a panic.
///
/// Runs inside the panic hook, so every failure is swallowed and `None`
/// returned instead.
pub fn write_crash_report(info: &PanicHookInfo) -> Option<PathBuf> {
    let dir = crash_report_dir().ok()?;
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string();
    let path = dir.join(format!("crash_{timestamp}.json"));

    let message = if let Some(s) = info.payload().downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };

    let location = info.location().map(|loc| {
        serde_json::json!({
            "file": loc.file(),
            "line": loc.line(),
            "column": loc.column(),
        })
    });

    let report = serde_json::json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "os": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "thread": std::thread::current().name().unwrap_or("unnamed"),
        "panic_message": sanitize_secrets(&message),
        "location": location,
        "backtrace": sanitize_secrets(&Backtrace::force_capture().to_string()),
    });

    std::fs::create_dir_all(&dir).ok()?;
    std::fs::write(&path, serde_json::to_string_pretty(&report).ok()?).ok()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600));
    }

    Some(path)
}

/// Chain a crash-report writer in front of the default panic hook.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let path = write_crash_report(info);

        eprintln!("\n--- notch crashed ---");
        if let Some(p) = &path {
            eprintln!("Crash report written to: {}", p.display());
        }
        eprintln!("---------------------\n");

        default_hook(info);
    }));
}
