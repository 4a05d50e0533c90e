//! Control strings recognized by the server.
//!
//! The client never interprets these beyond recognizing them. They travel as
//! ordinary lines and the server decides what happens.

use std::fmt;

/// Pre-defined control commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Ask the server for the list of connected participants.
    ListUsers,
    /// Ask the server to end the session.
    Quit,
}

impl Command {
    /// Every known command.
    pub const ALL: [Command; 2] = [Command::ListUsers, Command::Quit];

    /// Canonical wire text.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ListUsers => "/listar",
            Self::Quit => "/quitar",
        }
    }

    /// Recognize a command in user text.
    ///
    /// Matching ignores ASCII case and surrounding whitespace. The leading
    /// slash is required.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::ALL.into_iter().find(|cmd| cmd.as_str().eq_ignore_ascii_case(text))
    }

    /// Recognize a command the way the server does: like [`Command::parse`],
    /// but the leading slash is optional.
    pub fn recognize(text: &str) -> Option<Self> {
        let text = text.trim();
        let bare = text.strip_prefix('/').unwrap_or(text);
        Self::ALL.into_iter().find(|cmd| cmd.as_str().trim_start_matches('/').eq_ignore_ascii_case(bare))
    }

    /// Whether the server will treat `text` as the logout command.
    pub fn is_logout(text: &str) -> bool {
        Self::recognize(text) == Some(Self::Quit)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Command::parse("/LISTAR"), Some(Command::ListUsers));
        assert_eq!(Command::parse("  /Quitar "), Some(Command::Quit));
    }

    #[test]
    fn parse_requires_slash() {
        assert_eq!(Command::parse("quitar"), None);
        assert_eq!(Command::parse("/quitarx"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn recognize_accepts_bare_form() {
        assert_eq!(Command::recognize("listar"), Some(Command::ListUsers));
        assert_eq!(Command::recognize(" QUITAR "), Some(Command::Quit));
        assert_eq!(Command::recognize("/quitar"), Some(Command::Quit));
        assert_eq!(Command::recognize("//quitar"), None);
        assert_eq!(Command::recognize("/"), None);
        assert_eq!(Command::recognize("hola"), None);
    }

    #[test]
    fn is_logout_only_matches_quit() {
        assert!(Command::is_logout("/QUITAR"));
        assert!(Command::is_logout("quitar"));
        assert!(!Command::is_logout("/listar"));
        assert!(!Command::is_logout("quitarme"));
    }

    #[test]
    fn display_is_wire_text() {
        assert_eq!(Command::Quit.to_string(), "/quitar");
    }
}
