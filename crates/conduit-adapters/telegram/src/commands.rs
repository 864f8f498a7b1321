//! Bot commands answered by the adapter itself.

/// Prefix that marks a message as a command.
pub const COMMAND_PREFIX: char = '/';

/// A parsed bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start`: greet the user.
    Start,
    /// Any other command, with its name.
    Unknown(String),
}

impl Command {
    /// Parses `text` as a command.
    ///
    /// Returns `None` when `text` does not start with [`COMMAND_PREFIX`].
    /// Only the first word counts, and an `@botname` suffix is ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.strip_prefix(COMMAND_PREFIX)?;
        let token = rest.split_whitespace().next().unwrap_or_default();
        let name = token.split('@').next().unwrap_or_default();

        Some(match name {
            "start" => Self::Start,
            other => Self::Unknown(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/start@conduit_bot"), Some(Command::Start));
        assert_eq!(Command::parse("/start now please"), Some(Command::Start));
        assert_eq!(
            Command::parse("/help"),
            Some(Command::Unknown("help".to_string()))
        );
        assert_eq!(Command::parse("/"), Some(Command::Unknown(String::new())));
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(Command::parse("hello /start"), None);
        assert_eq!(Command::parse(" /start"), None);
    }
}
