//! Shared I/O helpers for the fake IMAP server.
//!
//! Writes flush eagerly. Real IMAP servers would batch writes, but
//! flushing after every line keeps the test server deterministic.

use std::io::{self, Write};

/// Write a string to the stream and flush.
pub fn write_line<W: Write>(stream: &mut W, line: &str) -> io::Result<()> {
    stream.write_all(line.as_bytes())?;
    stream.flush()
}

/// The arguments of a command line, after the tag and command name.
/// Quoted strings are unescaped; anything else is split on spaces.
pub fn arguments(line: &str) -> Vec<String> {
    let mut rest = line.trim_end().splitn(3, ' ').nth(2).unwrap_or("");
    let mut args = Vec::new();

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        if let Some(quoted) = rest.strip_prefix('"') {
            let mut value = String::new();
            let mut end = quoted.len();
            let mut chars = quoted.char_indices();
            while let Some((i, c)) = chars.next() {
                match c {
                    '\\' => {
                        if let Some((_, escaped)) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => {
                        end = i + 1;
                        break;
                    }
                    _ => value.push(c),
                }
            }
            args.push(value);
            rest = &quoted[end..];
        } else {
            let end = rest.find(' ').unwrap_or(rest.len());
            args.push(rest[..end].to_string());
            rest = &rest[end..];
        }
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_line_writes_everything() {
        let mut out = Vec::new();
        write_line(&mut out, "* OK\r\n").unwrap();
        assert_eq!(out, b"* OK\r\n");
    }

    #[test]
    fn quoted_and_atom_arguments() {
        assert_eq!(
            arguments("TAG1 LIST \"\" \"INBOX/*\"\r\n"),
            ["", "INBOX/*"]
        );
        assert_eq!(
            arguments(r#"TAG2 LOGIN "alice" "pa\"ss""#),
            ["alice", "pa\"ss"]
        );
        assert_eq!(arguments("TAG3 SELECT INBOX"), ["INBOX"]);
        assert!(arguments("TAG4 EXPUNGE").is_empty());
    }
}
