//! Operator confirmation.

use crate::error::{MigrateError, Result};
use std::collections::VecDeque;
use std::io::{BufRead, Write};

/// Answers the yes/no questions asked before destructive or optional stages.
pub trait Confirmer: Send + Sync {
    fn confirm(&mut self, question: &str) -> Result<bool>;
}

impl<C: Confirmer + ?Sized> Confirmer for Box<C> {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        (**self).confirm(question)
    }
}

/// `y` or `yes` in any case is affirmative. Everything else, including an
/// empty line, is negative.
pub fn parse_answer(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Reads answers line by line, e.g. from a non-interactive stdin.
pub struct LineConfirmer<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> LineConfirmer<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl LineConfirmer<std::io::BufReader<std::io::Stdin>, std::io::Stderr> {
    /// Confirmer on the process's stdin, prompting on stderr.
    pub fn stdio() -> Self {
        Self::new(std::io::BufReader::new(std::io::stdin()), std::io::stderr())
    }
}

impl<R: BufRead + Send + Sync, W: Write + Send + Sync> Confirmer for LineConfirmer<R, W> {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        write!(self.writer, "{} [y/N]: ", question)
            .and_then(|_| self.writer.flush())
            .map_err(|e| MigrateError::Prompt(e.to_string()))?;

        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .map_err(|e| MigrateError::Prompt(e.to_string()))?;
        if read == 0 {
            // EOF: nobody is there to say yes
            let _ = writeln!(self.writer);
            return Ok(false);
        }
        Ok(parse_answer(&line))
    }
}

/// Pre-recorded answers. Runs out to "no".
#[derive(Debug, Default, Clone)]
pub struct ScriptedConfirmer {
    answers: VecDeque<bool>,
    asked: Vec<String>,
}

impl ScriptedConfirmer {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    /// Questions asked so far.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        self.asked.push(question.to_string());
        Ok(self.answers.pop_front().unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_answer() {
        assert!(parse_answer("y"));
        assert!(parse_answer("Y\n"));
        assert!(parse_answer(" yes "));
        assert!(parse_answer("YES"));
        assert!(!parse_answer(""));
        assert!(!parse_answer("n"));
        assert!(!parse_answer("yep"));
        assert!(!parse_answer("sure"));
    }

    #[test]
    fn test_line_confirmer_reads_successive_lines() {
        let mut out = Vec::new();
        let mut confirmer = LineConfirmer::new(Cursor::new("Y\nno\n"), &mut out);
        assert!(confirmer.confirm("Reset?").unwrap());
        assert!(!confirmer.confirm("Remove?").unwrap());
        // EOF
        assert!(!confirmer.confirm("Again?").unwrap());
        drop(confirmer);
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.starts_with("Reset? [y/N]: Remove? [y/N]: "));
    }

    #[test]
    fn test_scripted_confirmer_records_questions() {
        let mut confirmer = ScriptedConfirmer::new([true]);
        assert!(confirmer.confirm("first").unwrap());
        assert!(!confirmer.confirm("second").unwrap());
        assert_eq!(confirmer.asked(), ["first", "second"]);
    }
}
