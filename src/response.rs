//! Tagged command responses and LIST entry parsing

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Completion status of a tagged response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Status {
    Ok,
    No,
    Bad,
}

impl Status {
    fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "OK" => Some(Self::Ok),
            "NO" => Some(Self::No),
            "BAD" => Some(Self::Bad),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::No => "NO",
            Self::Bad => "BAD",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the server sent for one command: the untagged lines in
/// arrival order and the tagged completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub tag: String,
    pub status: Status,
    pub text: String,
    pub untagged: Vec<String>,
}

impl Response {
    /// Split a completion line such as `TAG3 NO [TRYCREATE] no such
    /// mailbox` into tag, status and text.
    #[must_use]
    pub fn parse_tagged(line: &str) -> Option<(String, Status, String)> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (tag, rest) = line.split_once(' ')?;
        let (status, text) = rest.split_once(' ').unwrap_or((rest, ""));
        let status = Status::parse(status)?;
        Some((tag.to_string(), status, text.to_string()))
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Pass an `OK` response through; turn `NO` and `BAD` into an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Response`] carrying the completion line.
    pub fn validated(self) -> Result<Self> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(Error::Response(format!(
                "{} {} {}",
                self.tag, self.status, self.text
            )))
        }
    }

    /// The untagged `LIST` replies, in server order. Lines that are not
    /// well-formed `LIST` replies are skipped.
    #[must_use]
    pub fn list_entries(&self) -> Vec<ListEntry> {
        self.untagged
            .iter()
            .filter_map(|line| ListEntry::parse(line))
            .collect()
    }
}

/// One mailbox from a `LIST` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListEntry {
    pub name: String,
    pub flags: Vec<String>,
    /// Hierarchy delimiter; empty when the server answers `NIL`.
    pub delimiter: String,
}

impl ListEntry {
    /// Parse `* LIST (<flags>) <delimiter> <name>`.
    ///
    /// ```
    /// use imap_connection::ListEntry;
    ///
    /// let entry = ListEntry::parse(r#"* LIST (\HasNoChildren) "/" "INBOX/Work""#).unwrap();
    /// assert_eq!(entry.name, "INBOX/Work");
    /// assert_eq!(entry.delimiter, "/");
    /// assert_eq!(entry.flags, vec![r"\HasNoChildren".to_string()]);
    /// ```
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let rest = line.strip_prefix("* ")?;
        let (keyword, rest) = rest.split_once(' ')?;
        if !keyword.eq_ignore_ascii_case("LIST") {
            return None;
        }

        let rest = rest.trim_start().strip_prefix('(')?;
        let (flags, rest) = rest.split_once(')')?;
        let flags = flags.split_whitespace().map(str::to_string).collect();

        let (delimiter, rest) = take_nstring(rest.trim_start())?;
        let (name, _) = take_string(rest.trim_start())?;

        Some(Self {
            name,
            flags,
            delimiter: delimiter.unwrap_or_default(),
        })
    }
}

/// `NIL` or a string.
fn take_nstring(input: &str) -> Option<(Option<String>, &str)> {
    match input.get(..3) {
        Some(nil) if nil.eq_ignore_ascii_case("NIL") => Some((None, &input[3..])),
        _ => take_string(input).map(|(s, rest)| (Some(s), rest)),
    }
}

/// A quoted string, a `{n}` literal followed by its bytes, or an atom.
fn take_string(input: &str) -> Option<(String, &str)> {
    if let Some(quoted) = input.strip_prefix('"') {
        let mut out = String::new();
        let mut chars = quoted.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => out.push(chars.next()?.1),
                '"' => return Some((out, &quoted[i + 1..])),
                _ => out.push(c),
            }
        }
        return None;
    }

    if let Some(literal) = input.strip_prefix('{') {
        let (len, rest) = literal.split_once('}')?;
        let len: usize = len.trim_end_matches('+').parse().ok()?;
        let body = rest.strip_prefix("\r\n")?;
        let value = body.get(..len)?;
        return Some((value.to_string(), &body[len..]));
    }

    let end = input.find(' ').unwrap_or(input.len());
    if end == 0 {
        return None;
    }
    Some((input[..end].to_string(), &input[end..]))
}
