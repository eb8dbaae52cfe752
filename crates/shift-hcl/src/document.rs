//! A parsed configuration file
//!
//! The tree is an `hcl-edit` [`Body`]: whitespace, comments and the exact
//! text of every expression live in the decor of the nodes they surround, so
//! untouched structures serialize byte-for-byte. The grammar only knows `\n`;
//! CRLF files are normalized before parsing and restored on output.

use std::borrow::Cow;
use std::fmt;

use crate::tree::Body;

/// Line terminator of a configuration file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    /// Terminator of the first line break in `src`
    #[must_use]
    pub fn detect(src: &str) -> Self {
        match src.find('\n') {
            Some(at) if src[..at].ends_with('\r') => Self::CrLf,
            _ => Self::Lf,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// `\r\n` rewritten to `\n`
pub(crate) fn normalize(src: &str) -> Cow<'_, str> {
    if src.contains("\r\n") {
        Cow::Owned(src.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(src)
    }
}

/// Configuration body plus the line terminator it is written with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub body: Body,
    line_ending: LineEnding,
}

impl Document {
    #[inline]
    #[must_use]
    pub fn new(body: Body) -> Self {
        Self {
            body,
            line_ending: LineEnding::Lf,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    #[inline]
    #[must_use]
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    #[inline]
    #[must_use]
    pub fn into_body(self) -> Body {
        self.body
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.body.to_string();
        match self.line_ending {
            LineEnding::Lf => f.write_str(&text),
            LineEnding::CrLf => f.write_str(&text.replace('\n', "\r\n")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_first_terminator() {
        assert_eq!(LineEnding::detect("a = 1\r\nb = 2\r\n"), LineEnding::CrLf);
        assert_eq!(LineEnding::detect("a = 1\nb = 2\r\n"), LineEnding::Lf);
        assert_eq!(LineEnding::detect(""), LineEnding::Lf);
    }

    #[test]
    fn normalize_borrows_lf_text() {
        assert!(matches!(normalize("a = 1\n"), Cow::Borrowed(_)));
        assert_eq!(normalize("a = 1\r\n\r\nb = 2"), "a = 1\n\nb = 2");
    }
}
