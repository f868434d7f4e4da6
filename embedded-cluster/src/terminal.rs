//! Operator-facing terminal I/O.

use embedded_cluster_shared::errors::ClusterResult;
use std::io::{BufRead, Write};

/// Prompts and plain output for the operator.
pub trait Terminal: Send + Sync {
    /// Ask a yes/no question. An empty answer picks `default`.
    fn confirm(&self, question: &str, default: bool) -> ClusterResult<bool>;

    /// Print a block of text (tables, instructions) as-is.
    fn print(&self, text: &str);
}

/// Terminal backed by the process stdin/stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdTerminal;

impl Terminal for StdTerminal {
    fn confirm(&self, question: &str, default: bool) -> ClusterResult<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();

        loop {
            write!(stdout, "{question} [{hint}] ")?;
            stdout.flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                return Ok(default);
            }
            match parse_answer(&line, default) {
                Some(answer) => return Ok(answer),
                None => writeln!(stdout, "Please answer yes or no.")?,
            }
        }
    }

    fn print(&self, text: &str) {
        println!("{text}");
    }
}

fn parse_answer(line: &str, default: bool) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("\n", false), Some(false));
        assert_eq!(parse_answer("\n", true), Some(true));
        assert_eq!(parse_answer("YES\n", false), Some(true));
        assert_eq!(parse_answer(" n ", true), Some(false));
        assert_eq!(parse_answer("maybe", true), None);
    }
}
