//! Source text decoding.
//!
//! A source file is UTF-8 unless it starts with a UTF-8 byte-order mark or
//! declares `coding: <name>` (or `coding=<name>`) in a comment on its first
//! or second line. The second line is only consulted when the first one is
//! blank or a comment. A BOM combined with a non-UTF-8 declaration is an
//! error.

use crate::error::SyntaxError;
use regex_lite::Regex;
use std::sync::OnceLock;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Encodings the decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    Latin1,
    Ascii,
}

impl SourceEncoding {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "iso-8859-1",
            Self::Ascii => "ascii",
        }
    }

    /// Map a declared encoding name onto a supported encoding.
    #[must_use]
    pub fn from_declared(name: &str) -> Option<Self> {
        let normal = name.to_ascii_lowercase().replace('_', "-");
        let is = |canonical: &str| {
            normal == canonical || normal.starts_with(&format!("{canonical}-"))
        };

        if is("utf-8") || normal == "utf8" {
            Some(Self::Utf8)
        } else if is("latin-1") || is("iso-8859-1") || is("iso-latin-1") || normal == "latin1" {
            Some(Self::Latin1)
        } else if normal == "ascii" || normal == "us-ascii" {
            Some(Self::Ascii)
        } else {
            None
        }
    }
}

/// Why detection or decoding failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingProblem {
    /// 1-based line the problem was found on.
    pub line: usize,
    pub message: String,
}

impl EncodingProblem {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }

    fn into_syntax_error(self, origin: &str) -> SyntaxError {
        SyntaxError::new(origin, Some(self.line), self.message)
    }
}

fn cookie_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[ \t\x0c]*#.*?coding[:=][ \t]*([-\w.]+)").ok())
        .as_ref()
}

fn blank_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[ \t\x0c]*(?:[#\r\n]|$)").ok())
        .as_ref()
}

/// Split off the first line (terminator included), accepting CR, LF and CRLF.
fn split_line(bytes: &[u8]) -> (&[u8], &[u8]) {
    match bytes.iter().position(|&b| b == b'\n' || b == b'\r') {
        Some(i) => {
            let end = if bytes[i] == b'\r' && bytes.get(i + 1) == Some(&b'\n') {
                i + 2
            } else {
                i + 1
            };
            bytes.split_at(end)
        }
        None => (bytes, &[]),
    }
}

fn find_cookie(
    line: &[u8],
    line_no: usize,
    has_bom: bool,
) -> Result<Option<SourceEncoding>, EncodingProblem> {
    let text = String::from_utf8_lossy(line);
    let Some(caps) = cookie_re().and_then(|re| re.captures(&text)) else {
        return Ok(None);
    };
    let declared = &caps[1];
    let encoding = SourceEncoding::from_declared(declared)
        .ok_or_else(|| EncodingProblem::new(line_no, format!("unknown encoding: {declared}")))?;
    if has_bom && encoding != SourceEncoding::Utf8 {
        return Err(EncodingProblem::new(line_no, "encoding problem: utf-8"));
    }
    Ok(Some(encoding))
}

/// Detect the encoding of `bytes`, returning it with the bytes that follow
/// any byte-order mark.
pub fn detect_encoding(bytes: &[u8]) -> Result<(SourceEncoding, &[u8]), EncodingProblem> {
    let (has_bom, rest) = match bytes.strip_prefix(UTF8_BOM) {
        Some(rest) => (true, rest),
        None => (false, bytes),
    };

    let (first, after_first) = split_line(rest);
    if let Some(encoding) = find_cookie(first, 1, has_bom)? {
        return Ok((encoding, rest));
    }
    let first_text = String::from_utf8_lossy(first);
    if !blank_re().is_some_and(|re| re.is_match(&first_text)) {
        return Ok((SourceEncoding::Utf8, rest));
    }

    let (second, _) = split_line(after_first);
    if let Some(encoding) = find_cookie(second, 2, has_bom)? {
        return Ok((encoding, rest));
    }
    Ok((SourceEncoding::Utf8, rest))
}

fn line_of_offset(bytes: &[u8], offset: usize) -> usize {
    let mut line = 1;
    let mut i = 0;
    while i < offset.min(bytes.len()) {
        match bytes[i] {
            b'\n' => line += 1,
            b'\r' if bytes.get(i + 1) != Some(&b'\n') => line += 1,
            _ => {}
        }
        i += 1;
    }
    line
}

fn decode(encoding: SourceEncoding, bytes: &[u8]) -> Result<String, EncodingProblem> {
    match encoding {
        SourceEncoding::Utf8 => std::str::from_utf8(bytes).map(str::to_string).map_err(|e| {
            EncodingProblem::new(
                line_of_offset(bytes, e.valid_up_to()),
                "(unicode error) 'utf-8' codec can't decode byte",
            )
        }),
        SourceEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        SourceEncoding::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
            Some(pos) => Err(EncodingProblem::new(
                line_of_offset(bytes, pos),
                "(unicode error) 'ascii' codec can't decode byte",
            )),
            None => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        },
    }
}

/// Normalize CR and CRLF line endings to LF.
#[must_use]
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Decode raw source bytes into text with LF line endings.
pub fn decode_source(bytes: &[u8], origin: &str) -> Result<String, SyntaxError> {
    let (encoding, rest) = detect_encoding(bytes).map_err(|p| p.into_syntax_error(origin))?;
    let text = decode(encoding, rest).map_err(|p| p.into_syntax_error(origin))?;
    Ok(normalize_newlines(&text))
}
