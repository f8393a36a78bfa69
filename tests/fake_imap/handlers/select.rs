//! SELECT command handler.
//!
//! Opens a folder and responds with its metadata:
//!
//! - `* N EXISTS` -- total number of messages in the folder.
//! - `* OK [UIDVALIDITY V]` -- a value that changes if the folder's
//!   UID space is reset.
//!
//! Returns the selected folder name (or `None` if not found).

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use std::io::{self, Write};

/// Handle the SELECT command. Returns the selected folder name.
pub fn handle_select<W: Write>(
    tag: &str,
    folder_name: &str,
    mailbox: &Mailbox,
    stream: &mut W,
) -> io::Result<Option<String>> {
    let Some(folder) = mailbox.get_folder(folder_name) else {
        write_line(stream, &format!("{tag} NO Folder not found\r\n"))?;
        return Ok(None);
    };

    // RFC 3501 Section 6.3.1: required FLAGS, EXISTS and RECENT
    write_line(
        stream,
        "* FLAGS (\\Seen \\Answered \\Flagged \\Deleted \\Draft)\r\n",
    )?;
    write_line(stream, &format!("* {} EXISTS\r\n", folder.messages.len()))?;
    write_line(stream, "* 0 RECENT\r\n")?;
    write_line(stream, "* OK [UIDVALIDITY 1]\r\n")?;

    let uidnext = folder
        .messages
        .iter()
        .map(|m| m.uid)
        .max()
        .map_or(1, |max| max + 1);
    write_line(stream, &format!("* OK [UIDNEXT {uidnext}]\r\n"))?;

    write_line(stream, &format!("{tag} OK [READ-WRITE] SELECT completed\r\n"))?;
    Ok(Some(folder_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;

    fn run(tag: &str, folder_name: &str, mailbox: &Mailbox) -> (String, Option<String>) {
        let mut out = Vec::new();
        let selected = handle_select(tag, folder_name, mailbox, &mut out).unwrap();
        (String::from_utf8(out).unwrap(), selected)
    }

    #[test]
    fn selects_existing_folder() {
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .message(5, false)
            .message(10, true)
            .build();

        let (output, selected) = run("A1", "INBOX", &mailbox);

        assert_eq!(selected, Some("INBOX".to_string()));
        assert!(output.contains("* 2 EXISTS"));
        assert!(output.contains("* OK [UIDNEXT 11]"));
        assert!(output.ends_with("A1 OK [READ-WRITE] SELECT completed\r\n"));
    }

    #[test]
    fn returns_none_for_missing_folder() {
        let mailbox = MailboxBuilder::new().folder("INBOX").build();

        let (output, selected) = run("A1", "NoSuchFolder", &mailbox);

        assert!(selected.is_none());
        assert_eq!(output, "A1 NO Folder not found\r\n");
    }
}
