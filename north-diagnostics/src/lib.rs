// Diagnostic reporting for the North compiler.
//
// A `Diagnostic` is a plain value carrying a severity, an error code, a
// message and an optional source span; rendering against a `SourceFile`
// produces the `<file>:<line>:<column>: error: <message>` layout with the
// offending line and a caret range underneath.

use colored::Colorize;
use std::fmt;

/// Byte range of the offending source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub offset: usize,
    pub length: usize,
}

impl Span {
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// Span covering both inputs.
    pub fn to(self, other: Span) -> Span {
        let start = self.offset.min(other.offset);
        let end = (self.offset + self.length).max(other.offset + other.length);
        Span::new(start, end - start)
    }
}

/// A named source buffer with a line-start table for offset translation.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            name: name.into(),
            text,
            line_starts,
        }
    }

    /// 1-based line and column of a byte offset.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|&s| s <= offset) - 1;
        (line + 1, offset - self.line_starts[line] + 1)
    }

    /// The text of a 1-based line, without its newline.
    pub fn line_text(&self, line: usize) -> &str {
        let start = self.line_starts[line - 1];
        let end = self
            .line_starts
            .get(line)
            .map_or(self.text.len(), |&next| next - 1);
        &self.text[start..end]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "{}", "error".red().bold()),
            Level::Warning => write!(f, "{}", "warning".yellow().bold()),
        }
    }
}

/// A single compiler message.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct Diagnostic {
    pub level: Level,
    pub code: &'static str,
    pub message: String,
    pub span: Option<Span>,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            code,
            message: message.into(),
            span: None,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            ..Self::error(code, message)
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Render against the source: location header, offending line, carets.
    pub fn render(&self, file: &SourceFile) -> String {
        let mut out = String::new();

        match self.span {
            Some(span) => {
                let (line, column) = file.line_col(span.offset);
                out.push_str(&format!(
                    "{}:{}:{}: {}: {}\n",
                    file.name,
                    line,
                    column,
                    self.level,
                    self.message.clone().bold()
                ));

                let text = file.line_text(line);
                out.push_str(&format!("  {}\n", text));

                let caret_len = span.length.clamp(1, text.len().saturating_sub(column - 1).max(1));
                out.push_str(&format!(
                    "  {}{}\n",
                    " ".repeat(column - 1),
                    "^".repeat(caret_len).red().bold()
                ));
            }
            None => {
                out.push_str(&format!(
                    "{}: {}: {}\n",
                    file.name,
                    self.level,
                    self.message.clone().bold()
                ));
            }
        }

        for note in &self.notes {
            out.push_str(&format!("  {}: {}\n", "note".cyan().bold(), note));
        }
        if let Some(help) = &self.help {
            out.push_str(&format!("  {}: {}\n", "help".green().bold(), help));
        }

        out
    }
}

/// Closest name to `target` among `candidates`, for "did you mean" hints.
/// Only reasonably close matches are suggested.
pub fn find_similar_name<'a, I>(target: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let max_distance = (target.len() / 3).max(1);
    candidates
        .into_iter()
        .map(|c| (strsim::levenshtein(target, c), c))
        .filter(|&(d, _)| d <= max_distance)
        .min_by_key(|&(d, _)| d)
        .map(|(_, c)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_translation() {
        let file = SourceFile::new("test.n", "abc\ndef\n  ghi");
        assert_eq!(file.line_col(0), (1, 1));
        assert_eq!(file.line_col(4), (2, 1));
        assert_eq!(file.line_col(10), (3, 3));
        assert_eq!(file.line_text(2), "def");
        assert_eq!(file.line_text(3), "  ghi");
    }

    #[test]
    fn test_render_layout() {
        colored::control::set_override(false);
        let file = SourceFile::new("main.n", "def f():\n  return foo\n");
        let diag = Diagnostic::error("E0201", "unknown symbol `foo`")
            .with_span(Span::new(18, 3));
        let rendered = diag.render(&file);
        assert!(rendered.starts_with("main.n:2:10: error: unknown symbol `foo`"));
        assert!(rendered.contains("  return foo"));
        assert!(rendered.contains("         ^^^"));
    }

    #[test]
    fn test_span_join() {
        let joined = Span::new(4, 2).to(Span::new(10, 5));
        assert_eq!(joined, Span::new(4, 11));
    }

    #[test]
    fn test_find_similar_name() {
        let names = ["printf", "mult", "origin"];
        assert_eq!(find_similar_name("prntf", names), Some("printf"));
        assert_eq!(find_similar_name("zzz", names), None);
    }
}
