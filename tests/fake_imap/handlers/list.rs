//! LIST command handler.
//!
//! Responds with one `* LIST` line per folder matching the reference
//! and pattern, followed by the tagged OK. The format follows RFC 3501
//! Section 7.2.2:
//!
//! ```text
//! * LIST (\HasChildren) "/" "INBOX"
//! * LIST (\HasNoChildren) "/" "INBOX/Work"
//! TAG2 OK LIST completed
//! ```
//!
//! `*` matches anything, `%` anything except the delimiter.

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use std::io::{self, Write};

/// Handle the LIST command.
pub fn handle_list<W: Write>(
    tag: &str,
    reference: &str,
    pattern: &str,
    mailbox: &Mailbox,
    stream: &mut W,
) -> io::Result<()> {
    let full = format!("{reference}{pattern}");
    let delimiter = mailbox.delimiter.as_bytes().first().copied().unwrap_or(b'/');

    for folder in &mailbox.folders {
        if !wildcard_match(full.as_bytes(), folder.name.as_bytes(), delimiter) {
            continue;
        }
        let children = if mailbox.has_children(&folder.name) {
            "\\HasChildren"
        } else {
            "\\HasNoChildren"
        };
        let line = format!(
            "* LIST ({children}) \"{}\" \"{}\"\r\n",
            mailbox.delimiter, folder.name
        );
        write_line(stream, &line)?;
    }

    write_line(stream, &format!("{tag} OK LIST completed\r\n"))
}

fn wildcard_match(pattern: &[u8], name: &[u8], delimiter: u8) -> bool {
    match pattern.split_first() {
        None => name.is_empty(),
        Some((b'*', rest)) => (0..=name.len()).any(|i| wildcard_match(rest, &name[i..], delimiter)),
        Some((b'%', rest)) => (0..=name.len())
            .take_while(|&i| !name[..i].contains(&delimiter))
            .any(|i| wildcard_match(rest, &name[i..], delimiter)),
        Some((c, rest)) => name.first() == Some(c) && wildcard_match(rest, &name[1..], delimiter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;

    fn run(tag: &str, reference: &str, pattern: &str, mailbox: &Mailbox) -> String {
        let mut out = Vec::new();
        handle_list(tag, reference, pattern, mailbox, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn mailbox() -> Mailbox {
        MailboxBuilder::new()
            .folder("INBOX")
            .folder("INBOX/Work")
            .folder("Sent")
            .build()
    }

    #[test]
    fn star_lists_everything() {
        let output = run("A1", "", "*", &mailbox());

        assert!(output.contains("\"INBOX\""));
        assert!(output.contains("\"INBOX/Work\""));
        assert!(output.contains("\"Sent\""));
        assert!(output.ends_with("A1 OK LIST completed\r\n"));
    }

    #[test]
    fn prefix_pattern_filters() {
        let output = run("A1", "", "INBOX*", &mailbox());
        assert!(output.contains("\"INBOX/Work\""));
        assert!(!output.contains("\"Sent\""));
    }

    #[test]
    fn percent_stops_at_delimiter() {
        let output = run("A1", "", "%", &mailbox());
        assert!(output.contains("\"INBOX\""));
        assert!(!output.contains("\"INBOX/Work\""));
    }

    #[test]
    fn children_flags() {
        let output = run("A1", "", "*", &mailbox());
        assert!(output.contains("* LIST (\\HasChildren) \"/\" \"INBOX\"\r\n"));
        assert!(output.contains("* LIST (\\HasNoChildren) \"/\" \"INBOX/Work\"\r\n"));
    }

    #[test]
    fn empty_mailbox_returns_only_ok() {
        let output = run("T2", "", "*", &MailboxBuilder::new().build());
        assert_eq!(output, "T2 OK LIST completed\r\n");
    }
}
