//! Slash commands shared by the REPL and the web endpoint.

/// Help text listing every command.
pub const HELP_TEXT: &str = "Commands:
  /profile  - View your profile
  /new      - Start new conversation (keeps profile)
  /clear    - Same as /new
  /reset    - Reset everything (profile + history)
  /help     - Show this help
  /quit     - Exit";

/// Reply after `/new` or `/clear`.
pub const NEW_CONVERSATION_TEXT: &str = "New conversation started. Profile retained.";

/// Reply after `/reset`.
pub const RESET_TEXT: &str = "Profile and history reset.";

/// Farewell printed when the REPL exits.
pub const FAREWELL_TEXT: &str = "Take care!";

/// A parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/profile`
    Profile,
    /// `/new` or `/clear`
    NewConversation,
    /// `/reset`
    Reset,
    /// `/help`
    Help,
    /// `/quit` or `/exit`
    Quit,
    /// Anything else starting with `/`, as typed
    Unknown(String),
}

impl Command {
    /// Parse user input. Returns `None` for ordinary chat messages.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if !trimmed.starts_with('/') {
            return None;
        }

        let command = match trimmed.to_ascii_lowercase().as_str() {
            "/profile" => Self::Profile,
            "/new" | "/clear" => Self::NewConversation,
            "/reset" => Self::Reset,
            "/help" => Self::Help,
            "/quit" | "/exit" => Self::Quit,
            _ => Self::Unknown(trimmed.to_string()),
        };
        Some(command)
    }

    /// Message shown for an unrecognised command.
    #[must_use]
    pub fn unknown_text(input: &str) -> String {
        format!("Unknown command: {input}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(Command::parse("I want to lose 20 lbs"), None);
        assert_eq!(Command::parse("what about /profile?"), None);
    }

    #[test]
    fn test_parse_is_case_and_space_insensitive() {
        assert_eq!(Command::parse("/profile"), Some(Command::Profile));
        assert_eq!(Command::parse("  /PROFILE \n"), Some(Command::Profile));
        assert_eq!(Command::parse("/Clear"), Some(Command::NewConversation));
        assert_eq!(Command::parse("/new"), Some(Command::NewConversation));
        assert_eq!(Command::parse("/reset"), Some(Command::Reset));
        assert_eq!(Command::parse("/help"), Some(Command::Help));
        assert_eq!(Command::parse("/exit"), Some(Command::Quit));
        assert_eq!(Command::parse("/quit"), Some(Command::Quit));
    }

    #[test]
    fn test_unknown_keeps_input() {
        assert_eq!(
            Command::parse("/Weigh-in"),
            Some(Command::Unknown("/Weigh-in".to_string()))
        );
        assert_eq!(Command::unknown_text("/x"), "Unknown command: /x");
    }
}
