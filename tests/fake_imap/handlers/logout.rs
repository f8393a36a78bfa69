//! LOGOUT command handler.
//!
//! The server sends a BYE untagged response (indicating the connection
//! is ending) followed by the tagged OK.

use crate::fake_imap::io::write_line;
use std::io::{self, Write};

/// Handle the LOGOUT command. Sends BYE + tagged OK.
pub fn handle_logout<W: Write>(tag: &str, stream: &mut W) -> io::Result<()> {
    write_line(stream, "* BYE Logging out\r\n")?;
    write_line(stream, &format!("{tag} OK LOGOUT completed\r\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bye_comes_before_ok() {
        let mut out = Vec::new();
        handle_logout("X1", &mut out).unwrap();
        let output = String::from_utf8(out).unwrap();

        let bye_pos = output.find("* BYE").unwrap();
        let ok_pos = output.find("X1 OK LOGOUT completed\r\n").unwrap();
        assert!(bye_pos < ok_pos);
    }
}
