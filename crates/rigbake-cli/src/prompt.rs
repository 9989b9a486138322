//! Interactive path prompt on stdin.

use rigbake_hik::PathPrompt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Reads a path from a line of input. An empty line declines.
pub struct LinePrompt<R> {
    input: R,
}

impl<R: BufRead> LinePrompt<R> {
    /// Prompts on `input`.
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl LinePrompt<io::StdinLock<'static>> {
    /// Prompts on stdin.
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> PathPrompt for LinePrompt<R> {
    fn prompt_path(&mut self, title: &str) -> Option<PathBuf> {
        eprint!("{}: ", title);
        let _ = io::stderr().flush();
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => parse_answer(&line),
        }
    }
}

fn parse_answer(line: &str) -> Option<PathBuf> {
    let path = line.trim().trim_matches('"').trim();
    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_quoted_path() {
        let mut prompt = LinePrompt::new("\"/takes/walk 01.fbx\"\n".as_bytes());
        assert_eq!(
            prompt.prompt_path("Mocap Skeleton Path"),
            Some(PathBuf::from("/takes/walk 01.fbx"))
        );
    }

    #[test]
    fn test_empty_line_declines() {
        let mut prompt = LinePrompt::new("\n".as_bytes());
        assert_eq!(prompt.prompt_path("Mocap Skeleton Path"), None);
        let mut prompt = LinePrompt::new("".as_bytes());
        assert_eq!(prompt.prompt_path("Mocap Skeleton Path"), None);
    }
}
