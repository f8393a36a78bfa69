//! CREATE command handler.
//!
//! Adds a folder to the shared mailbox. Creating a folder that already
//! exists fails with the `ALREADYEXISTS` response code (RFC 5530).

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::{Folder, Mailbox};
use std::io::{self, Write};
use std::sync::Mutex;

/// Handle the CREATE command.
pub fn handle_create<W: Write>(
    tag: &str,
    name: &str,
    mailbox: &Mutex<Mailbox>,
    stream: &mut W,
) -> io::Result<()> {
    let created = {
        let mut mb = mailbox.lock().unwrap();
        if mb.get_folder(name).is_some() {
            false
        } else {
            mb.folders.push(Folder {
                name: name.to_string(),
                messages: Vec::new(),
            });
            true
        }
    };

    let resp = if created {
        format!("{tag} OK CREATE completed\r\n")
    } else {
        format!("{tag} NO [ALREADYEXISTS] Mailbox already exists\r\n")
    };
    write_line(stream, &resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;

    fn run(tag: &str, name: &str, mailbox: &Mutex<Mailbox>) -> String {
        let mut out = Vec::new();
        handle_create(tag, name, mailbox, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn creates_new_folder() {
        let mb = Mutex::new(MailboxBuilder::new().folder("INBOX").build());

        let output = run("A1", "INBOX/New", &mb);

        assert_eq!(output, "A1 OK CREATE completed\r\n");
        assert!(mb.lock().unwrap().get_folder("INBOX/New").is_some());
    }

    #[test]
    fn existing_folder_is_no() {
        let mb = Mutex::new(MailboxBuilder::new().folder("INBOX").build());

        let output = run("A1", "INBOX", &mb);

        assert!(output.starts_with("A1 NO [ALREADYEXISTS]"));
        assert_eq!(mb.lock().unwrap().folders.len(), 1);
    }
}
