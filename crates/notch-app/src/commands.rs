//! Stdin lines to panel actions.
//!
//! Lines starting with `:` name a key or action; everything else is a
//! command typed into the terminal.

use std::path::PathBuf;

use notch_terminal::{ControlKey, DroppedContent, Input};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCommand {
    Send(Input),
    HistoryUp,
    HistoryDown,
    Quit,
}

pub fn parse_line(line: &str) -> PanelCommand {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(rest) = line.strip_prefix(':') else {
        return PanelCommand::Send(Input::Typed(line.to_string()));
    };
    let (name, arg) = match rest.split_once(' ') {
        Some((name, arg)) => (name, arg),
        None => (rest, ""),
    };

    let key = |k| PanelCommand::Send(Input::Control(k));
    match name {
        "up" => key(ControlKey::Up),
        "down" => key(ControlKey::Down),
        "left" => key(ControlKey::Left),
        "right" => key(ControlKey::Right),
        "esc" => key(ControlKey::Escape),
        "tab" => key(ControlKey::Tab),
        "int" => key(ControlKey::Interrupt),
        "eof" => key(ControlKey::EndOfFile),
        "hist-up" => PanelCommand::HistoryUp,
        "hist-down" => PanelCommand::HistoryDown,
        "quit" => PanelCommand::Quit,
        "drop" => PanelCommand::Send(Input::Drop(DroppedContent::Paths(
            split_paths(arg).into_iter().map(PathBuf::from).collect(),
        ))),
        "paste" => PanelCommand::Send(Input::Drop(DroppedContent::Text(arg.to_string()))),
        _ => PanelCommand::Send(Input::Typed(line.to_string())),
    }
}

/// Whitespace-separated paths; double quotes group a path with spaces.
fn split_paths(arg: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in arg.chars() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    paths.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        paths.push(current);
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_typed() {
        assert_eq!(parse_line("ls -la\n"), PanelCommand::Send(Input::Typed("ls -la".into())));
        assert_eq!(parse_line(""), PanelCommand::Send(Input::Typed(String::new())));
    }

    #[test]
    fn keys() {
        assert_eq!(parse_line(":up"), PanelCommand::Send(Input::Control(ControlKey::Up)));
        assert_eq!(parse_line(":int"), PanelCommand::Send(Input::Control(ControlKey::Interrupt)));
        assert_eq!(parse_line(":eof"), PanelCommand::Send(Input::Control(ControlKey::EndOfFile)));
        assert_eq!(parse_line(":hist-up"), PanelCommand::HistoryUp);
        assert_eq!(parse_line(":hist-down"), PanelCommand::HistoryDown);
        assert_eq!(parse_line(":quit"), PanelCommand::Quit);
    }

    #[test]
    fn drop_groups_quoted_paths() {
        assert_eq!(
            parse_line(r#":drop "/tmp/a file.txt" /tmp/b.txt"#),
            PanelCommand::Send(Input::Drop(DroppedContent::Paths(vec![
                PathBuf::from("/tmp/a file.txt"),
                PathBuf::from("/tmp/b.txt"),
            ])))
        );
    }

    #[test]
    fn paste_keeps_text_verbatim() {
        assert_eq!(
            parse_line(":paste echo  two  spaces"),
            PanelCommand::Send(Input::Drop(DroppedContent::Text("echo  two  spaces".into())))
        );
    }

    #[test]
    fn unknown_colon_command_is_typed() {
        assert_eq!(parse_line(":wq"), PanelCommand::Send(Input::Typed(":wq".into())));
    }
}
