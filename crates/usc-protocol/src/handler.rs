//! Callbacks invoked by a [`Command`] decoder.

use crate::{Command, ParseError, Params};

/// Receives decoded commands and decode failures.
///
/// Callbacks run synchronously inside [`Command::process`]. While a
/// callback runs, the handler is detached from its decoder, so it cannot
/// re-enter it.
pub trait CommandHandler {
    /// A command addressed to this endpoint (or broadcast) was decoded.
    fn on_command(
        &mut self,
        broadcast: bool,
        component: u16,
        action: Option<&str>,
        params: Params<'_>,
    );

    /// A frame was rejected. `command` holds whatever was captured before
    /// the failure.
    fn on_error(&mut self, _error: &ParseError, _command: &Command) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CommandConfig, Status};

    #[derive(Default)]
    struct CountCommands(usize);

    impl CommandHandler for CountCommands {
        fn on_command(&mut self, _: bool, _: u16, _: Option<&str>, _: Params<'_>) {
            self.0 += 1;
        }
    }

    #[test]
    fn test_default_on_error_is_silent() {
        let mut command = Command::with_handler(CommandConfig::default(), CountCommands::default());
        assert!(command.process_slice(b"!1:x").1.is_err());
        assert_eq!(command.process_slice(b"!1/a$").1, Ok(Status::Complete));
    }
}
