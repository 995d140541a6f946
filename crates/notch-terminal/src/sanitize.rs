//! Stripping of terminal control sequences from child output.
//!
//! The panel renders plain text, so cursor movement, colors, mode toggles
//! and window-title updates are removed rather than interpreted. Rules are
//! stateless and applied per chunk: a sequence split across two reads
//! survives partially.

use std::sync::LazyLock;

use regex::Regex;

/// One class of control sequence to remove.
#[derive(Debug, Clone)]
pub struct AnsiRule {
    name: &'static str,
    kind: RuleKind,
}

#[derive(Debug, Clone)]
enum RuleKind {
    Pattern(Regex),
    Literal(&'static str),
}

impl AnsiRule {
    /// Rule matching `pattern`. Returns `None` for an invalid regex.
    pub fn pattern(name: &'static str, pattern: &str) -> Option<Self> {
        match Regex::new(pattern) {
            Ok(re) => Some(Self {
                name,
                kind: RuleKind::Pattern(re),
            }),
            Err(e) => {
                tracing::warn!(rule = name, error = %e, "invalid ANSI rule pattern");
                None
            }
        }
    }

    pub fn literal(name: &'static str, text: &'static str) -> Self {
        Self {
            name,
            kind: RuleKind::Literal(text),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Remove every match from `input`.
    pub fn apply(&self, input: &str) -> String {
        match &self.kind {
            RuleKind::Pattern(re) => re.replace_all(input, "").into_owned(),
            RuleKind::Literal(text) => input.replace(text, ""),
        }
    }
}

// Private modes are listed before the generic CSI rule so they are named
// individually; the CSI rule would remove them either way.
const LITERALS: &[(&str, &str)] = &[
    ("bracketed-paste-on", "\x1b[?2004h"),
    ("bracketed-paste-off", "\x1b[?2004l"),
    ("app-cursor-keys-on", "\x1b[?1h"),
    ("app-cursor-keys-off", "\x1b[?1l"),
];

const PATTERNS: &[(&str, &str)] = &[
    ("osc", r"\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)"),
    ("csi", r"\x1b\[[0-?]*[ -/]*[@-~]"),
    ("charset", r"\x1b[()*+][0-9A-Za-z]"),
    ("keypad-mode", r"\x1b[=>]"),
    ("bell", r"\x07"),
];

static STANDARD: LazyLock<Sanitizer> = LazyLock::new(Sanitizer::standard);

/// An ordered list of rules.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    rules: Vec<AnsiRule>,
}

impl Sanitizer {
    /// The rule set used for every session.
    pub fn standard() -> Self {
        let mut rules: Vec<AnsiRule> = LITERALS
            .iter()
            .map(|&(name, text)| AnsiRule::literal(name, text))
            .collect();
        rules.extend(
            PATTERNS
                .iter()
                .filter_map(|&(name, pattern)| AnsiRule::pattern(name, pattern)),
        );
        Self { rules }
    }

    pub fn with_rules(rules: Vec<AnsiRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[AnsiRule] {
        &self.rules
    }

    pub fn sanitize(&self, input: &str) -> String {
        self.rules
            .iter()
            .fold(input.to_string(), |text, rule| rule.apply(&text))
    }
}

/// Sanitize with the standard rule set.
pub fn sanitize(input: &str) -> String {
    STANDARD.sanitize(input)
}
