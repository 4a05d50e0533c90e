//! Console presentation: classifying typed input and printing inbox traffic.

use std::io::{self, Write};

use parlor_client::{Command, Incoming};

/// One line typed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input<'a> {
    /// Blank line; ignored.
    Empty,
    /// Text the server will treat as a control command. Sent as typed.
    Command {
        /// The recognized command.
        command: Command,
        /// Trimmed text as the user typed it.
        text: &'a str,
    },
    /// Anything else, sent as a chat line.
    Text(&'a str),
}

impl<'a> Input<'a> {
    /// Classify a raw stdin line.
    pub fn classify(raw: &'a str) -> Self {
        let text = raw.trim();
        if text.is_empty() {
            return Self::Empty;
        }
        match Command::recognize(text) {
            Some(command) => Self::Command { command, text },
            None => Self::Text(text),
        }
    }

    /// Wire text to send, if any.
    pub fn text(self) -> Option<&'a str> {
        match self {
            Self::Empty => None,
            Self::Command { text, .. } | Self::Text(text) => Some(text),
        }
    }
}

/// Writes inbox messages and client notices to an output stream.
pub struct Console<W> {
    out: W,
}

impl<W: Write> Console<W> {
    /// Wrap an output stream.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Print every queued message. Returns `true` once the terminal message
    /// has been printed.
    pub fn show_all<I>(&mut self, messages: I) -> io::Result<bool>
    where
        I: IntoIterator<Item = Incoming>,
    {
        let mut closed = false;
        for msg in messages {
            writeln!(self.out, "{msg}")?;
            closed |= msg.is_closed();
        }
        self.out.flush()?;
        Ok(closed)
    }

    /// Print a client-side notice.
    pub fn notice(&mut self, text: impl std::fmt::Display) -> io::Result<()> {
        writeln!(self.out, "[client] {text}")?;
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use parlor_client::CloseReason;

    use super::*;

    #[test]
    fn classify_input() {
        assert_eq!(Input::classify("   "), Input::Empty);
        assert_eq!(Input::classify("/listar"), Input::Command {
            command: Command::ListUsers,
            text: "/listar",
        });
        assert_eq!(Input::classify("quitar"), Input::Command {
            command: Command::Quit,
            text: "quitar",
        });
        assert_eq!(Input::classify("  hola  "), Input::Text("hola"));
        assert_eq!(Input::classify("/unknown"), Input::Text("/unknown"));
    }

    #[test]
    fn commands_keep_the_typed_text() {
        let input = Input::classify(" /QUITAR \n");
        assert_eq!(input, Input::Command { command: Command::Quit, text: "/QUITAR" });
        assert_eq!(input.text(), Some("/QUITAR"));
        assert_eq!(Input::classify("").text(), None);
    }

    #[test]
    fn show_all_reports_terminal_message() {
        let mut console = Console::new(Vec::new());
        let closed = console
            .show_all([Incoming::Line("hi".into()), Incoming::Closed(CloseReason::PeerClosed)])
            .unwrap();

        assert!(closed);
        let out = String::from_utf8(console.into_inner()).unwrap();
        assert_eq!(out, "hi\n[client] connection closed by server.\n");
    }

    #[test]
    fn show_all_without_terminal() {
        let mut console = Console::new(Vec::new());
        assert!(!console.show_all([Incoming::Line("a".into())]).unwrap());
        assert!(!console.show_all(Vec::new()).unwrap());
    }

    #[test]
    fn notice_is_prefixed() {
        let mut console = Console::new(Vec::new());
        console.notice("disconnected").unwrap();
        assert_eq!(String::from_utf8(console.into_inner()).unwrap(), "[client] disconnected\n");
    }
}
