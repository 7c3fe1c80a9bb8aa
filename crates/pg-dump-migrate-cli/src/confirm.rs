//! Terminal prompts for the yes/no questions asked during a run.

use dialoguer::Confirm;
use pg_dump_migrate::{Confirmer, LineConfirmer, MigrateError};
use std::io::IsTerminal;

/// Asks on the terminal; the default answer is no.
pub struct TerminalConfirmer;

impl Confirmer for TerminalConfirmer {
    fn confirm(&mut self, question: &str) -> pg_dump_migrate::Result<bool> {
        Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
            .map_err(|e| MigrateError::Prompt(e.to_string()))
    }
}

/// Interactive prompt on a terminal, plain line reading when stdin is piped.
pub fn for_stdin() -> Box<dyn Confirmer> {
    if std::io::stdin().is_terminal() {
        Box::new(TerminalConfirmer)
    } else {
        Box::new(LineConfirmer::stdio())
    }
}
