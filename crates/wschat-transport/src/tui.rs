//! Terminal input bridge for crossterm front ends.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use wschat_core::UiAction;

/// Composer line of a terminal chat client.
///
/// Collects typed characters into a draft and turns submitted lines into
/// [`UiAction`]s. Lines starting with `/` are commands:
/// `/connect [nick]`, `/disconnect`, `/join <room>`, `/nick <name>`,
/// `/ping`, `/quit`.
#[derive(Debug, Default)]
pub struct ChatInput {
    draft: String,
}

impl ChatInput {
    /// Create an empty composer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current draft.
    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Discard the draft.
    pub fn clear(&mut self) {
        self.draft.clear();
    }

    /// Put a submitted line back, e.g. when sending was refused.
    pub fn restore(&mut self, line: String) {
        self.draft = line;
    }

    /// Handle a crossterm event.
    ///
    /// Returns an action when the event completes one.
    pub fn handle_event(&mut self, event: &Event) -> Option<UiAction> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key),
            Event::Paste(text) => {
                self.draft.push_str(text);
                None
            }
            _ => None,
        }
    }

    /// Handle a key press.
    pub fn handle_key(&mut self, key: &KeyEvent) -> Option<UiAction> {
        match key.code {
            KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(UiAction::Quit)
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.draft.clear();
                None
            }
            KeyCode::Char(c) => {
                self.draft.push(c);
                None
            }
            KeyCode::Backspace => {
                self.draft.pop();
                None
            }
            KeyCode::Esc => {
                self.draft.clear();
                None
            }
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.draft);
                let action = parse_line(&line);
                // Plain messages stay in the draft until the caller confirms
                // they went out.
                if matches!(action, Some(UiAction::Send { .. })) {
                    self.draft = line;
                }
                action
            }
            _ => None,
        }
    }
}

/// Parse a submitted composer line.
///
/// Returns `None` for blank lines and incomplete commands.
#[must_use]
pub fn parse_line(line: &str) -> Option<UiAction> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Some(command) = trimmed.strip_prefix('/') else {
        return Some(UiAction::Send {
            text: trimmed.to_string(),
        });
    };

    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, arg)| (name, arg.trim()));

    match name {
        "connect" => Some(UiAction::Connect {
            nickname: (!arg.is_empty()).then(|| arg.to_string()),
        }),
        "disconnect" => Some(UiAction::Disconnect),
        "join" if !arg.is_empty() => Some(UiAction::Join {
            room: arg.to_string(),
        }),
        "nick" if !arg.is_empty() => Some(UiAction::Nick {
            nickname: arg.to_string(),
        }),
        "ping" => Some(UiAction::Ping),
        "quit" | "exit" => Some(UiAction::Quit),
        _ => {
            tracing::debug!("Unknown or incomplete command: /{command}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_line("/join tecnologia"),
            Some(UiAction::Join {
                room: "tecnologia".to_string()
            })
        );
        assert_eq!(
            parse_line("/nick  Ana "),
            Some(UiAction::Nick {
                nickname: "Ana".to_string()
            })
        );
        assert_eq!(
            parse_line("/connect"),
            Some(UiAction::Connect { nickname: None })
        );
        assert_eq!(parse_line("/disconnect"), Some(UiAction::Disconnect));
        assert_eq!(parse_line("/ping"), Some(UiAction::Ping));
        assert_eq!(parse_line("/quit"), Some(UiAction::Quit));
    }

    #[test]
    fn test_parse_rejects_blank_and_incomplete() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("/join"), None);
        assert_eq!(parse_line("/join   "), None);
        assert_eq!(parse_line("/dance"), None);
    }

    #[test]
    fn test_parse_plain_message() {
        assert_eq!(
            parse_line("  oi pessoal "),
            Some(UiAction::Send {
                text: "oi pessoal".to_string()
            })
        );
    }

    #[test]
    fn test_typing_and_submit() {
        let mut input = ChatInput::new();
        for c in "oi!".chars() {
            assert!(input.handle_key(&key(KeyCode::Char(c))).is_none());
        }
        input.handle_key(&key(KeyCode::Backspace));
        assert_eq!(input.draft(), "oi");

        let action = input.handle_key(&key(KeyCode::Enter));
        assert_eq!(
            action,
            Some(UiAction::Send {
                text: "oi".to_string()
            })
        );
        // Kept until the caller clears it.
        assert_eq!(input.draft(), "oi");
        input.clear();
        assert_eq!(input.draft(), "");
    }

    #[test]
    fn test_command_clears_draft() {
        let mut input = ChatInput::new();
        input.restore("/join random".to_string());
        let action = input.handle_key(&key(KeyCode::Enter));
        assert!(matches!(action, Some(UiAction::Join { .. })));
        assert_eq!(input.draft(), "");
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut input = ChatInput::new();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(input.handle_key(&ctrl_c), Some(UiAction::Quit));
    }
}
