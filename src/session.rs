//! Tagged IMAP command exchange over a [`Connection`]

use crate::config::{DEFAULT_DELIMITER, ImapConfig};
use crate::connection::{Connection, Encryption};
use crate::error::{Error, Result};
use crate::folder::FolderSession;
use crate::response::Response;
use crate::stream::{SocketStream, Stream};
use tracing::{debug, info, warn};

const TAG_PREFIX: &str = "TAG";

/// Quote `value` as an IMAP string, rejecting line breaks.
fn quote(value: &str) -> Result<String> {
    if let Some(c) = value.chars().find(|c| matches!(c, '\r' | '\n')) {
        return Err(Error::Validate(c));
    }
    Ok(format!(
        "\"{}\"",
        value.replace('\\', r"\\").replace('"', "\\\"")
    ))
}

/// Length of the `{n}` literal announced at the end of `line`.
fn literal_len(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\r\n").or_else(|| line.strip_suffix(b"\n"))?;
    let line = line.strip_suffix(b"}")?;
    let open = line.iter().rposition(|b| *b == b'{')?;
    let digits = line[open + 1..].strip_suffix(b"+").unwrap_or(&line[open + 1..]);
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// An IMAP session: a connection plus the tag counter and folder
/// delimiter that go with it.
#[derive(Debug)]
pub struct ImapSession<S: Stream = SocketStream> {
    connection: Connection<S>,
    tag: u32,
    delimiter: String,
}

impl<S: Stream> ImapSession<S> {
    pub fn new(connection: Connection<S>) -> Self {
        Self {
            connection,
            tag: 0,
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }

    /// A session over `stream` configured from `config`. Nothing is
    /// sent until [`Self::establish`] or [`Self::connect`].
    pub fn from_config(config: &ImapConfig, stream: S) -> Self {
        let mut connection = Connection::new(stream);
        connection.set_encryption(config.encryption);
        connection.set_cert_validation(config.validate_cert);
        connection.set_connection_timeout(config.timeout);
        connection.set_proxy(config.proxy.clone());

        Self::new(connection).with_delimiter(config.delimiter.clone())
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn set_delimiter(&mut self, delimiter: impl Into<String>) {
        self.delimiter = delimiter.into();
    }

    pub const fn connection(&self) -> &Connection<S> {
        &self.connection
    }

    pub const fn connection_mut(&mut self) -> &mut Connection<S> {
        &mut self.connection
    }

    pub fn into_connection(self) -> Connection<S> {
        self.connection
    }

    /// Connect and log in with the host and credentials in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if connecting or logging in fails.
    pub fn establish(&mut self, config: &ImapConfig) -> Result<()> {
        self.connect(&config.host, config.port)?;
        self.login(&config.username, &config.password)
    }

    /// Open the connection, read the greeting and, for STARTTLS,
    /// upgrade the channel before anything else is sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionFailed`] if the stream cannot be
    /// opened, the server greets with `BYE` or the TLS upgrade fails.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        self.connection.open(host, port)?;
        let timeout = self.connection.connection_timeout();
        self.connection.set_stream_timeout(timeout)?;

        let greeting = self.next_line()?;
        let greeting = greeting.trim_end();
        if !greeting.starts_with("* OK") && !greeting.starts_with("* PREAUTH") {
            self.connection.close();
            return Err(Error::ConnectionFailed(format!(
                "Unexpected greeting: {greeting}"
            )));
        }
        debug!("S: {}", greeting);

        if self.connection.encryption() == Some(Encryption::StartTls) {
            self.send("STARTTLS")?.validated()?;
            let method = self.connection.enable_crypto()?;
            debug!("Upgraded connection with {}", method);
        }

        info!("Connected to IMAP server at {}:{}", host, port);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`Error::Validate`] if a credential contains a line
    /// break, [`Error::Response`] if the server rejects them.
    pub fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let command = format!("LOGIN {} {}", quote(username)?, quote(password)?);
        self.send(&command)?.validated()?;
        info!("Logged in");
        Ok(())
    }

    /// Send `LOGOUT` and close the connection whatever the answer.
    ///
    /// # Errors
    ///
    /// Returns the error of the `LOGOUT` exchange, after closing.
    pub fn logout(&mut self) -> Result<()> {
        let result = self.send("LOGOUT").and_then(Response::validated);
        self.connection.close();
        result.map(|_| ())
    }

    /// # Errors
    ///
    /// Returns [`Error::Response`] if the folder cannot be selected.
    pub fn select_folder(&mut self, folder: &str) -> Result<Response> {
        let command = format!("SELECT {}", quote(folder)?);
        self.send(&command)?.validated()
    }

    /// Send `LIST` and return the raw response.
    ///
    /// # Errors
    ///
    /// Returns an error if an argument cannot be quoted or the exchange
    /// fails.
    pub fn list_folders(&mut self, reference: &str, pattern: &str) -> Result<Response> {
        let command = format!("LIST {} {}", quote(reference)?, quote(pattern)?);
        self.send(&command)
    }

    /// Send `CREATE` and return the raw response.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be quoted or the exchange
    /// fails.
    pub fn create_folder(&mut self, path: &str) -> Result<Response> {
        let command = format!("CREATE {}", quote(path)?);
        self.send(&command)
    }

    /// Send `EXPUNGE` and return the raw response.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails.
    pub fn expunge(&mut self) -> Result<Response> {
        self.send("EXPUNGE")
    }

    /// Send `command` under a fresh tag and collect everything up to its
    /// completion. `NO` and `BAD` completions are returned, not raised.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionFailed`] if the command cannot be
    /// written or the stream ends first, [`Error::Response`] if the
    /// server sends something unparseable.
    pub fn send(&mut self, command: &str) -> Result<Response> {
        self.tag += 1;
        let tag = format!("{TAG_PREFIX}{}", self.tag);

        if command.get(..6).is_some_and(|p| p.eq_ignore_ascii_case("LOGIN ")) {
            debug!("C: {} LOGIN <credentials>", tag);
        } else {
            debug!("C: {} {}", tag, command);
        }

        let line = format!("{tag} {command}\r\n");
        if self.connection.write(line.as_bytes()).is_none() {
            return Err(Error::ConnectionFailed(format!(
                "Failed to send command {tag}"
            )));
        }

        self.read_response(&tag)
    }

    fn read_response(&mut self, tag: &str) -> Result<Response> {
        let mut untagged = Vec::new();
        loop {
            let line = self.next_line()?;
            if line.starts_with("* ") || line.starts_with("+ ") || line == "+" {
                untagged.push(line);
                continue;
            }

            let Some((got, status, text)) = Response::parse_tagged(&line) else {
                return Err(Error::Response(format!("Malformed response line: {line}")));
            };
            if got != tag {
                warn!("Expected completion for {}, got {}", tag, got);
                return Err(Error::Response(format!(
                    "Unexpected tag {got}, expected {tag}"
                )));
            }

            return Ok(Response {
                tag: got,
                status,
                text,
                untagged,
            });
        }
    }

    /// Next logical response line without its CRLF. A line announcing a
    /// `{n}` literal is extended with the literal bytes and whatever
    /// follows them.
    fn next_line(&mut self) -> Result<String> {
        let mut data = self.read_raw_line()?;
        let mut scan_from = 0;
        while let Some(len) = literal_len(&data[scan_from..]) {
            let literal_start = data.len();
            while data.len() - literal_start < len {
                let more = self.read_raw_line()?;
                data.extend_from_slice(&more);
            }
            scan_from = literal_start + len;
        }

        let line = String::from_utf8_lossy(&data);
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn read_raw_line(&mut self) -> Result<Vec<u8>> {
        self.connection.read_line().ok_or_else(|| {
            Error::ConnectionFailed("Connection closed while reading a response".to_string())
        })
    }
}

impl<S: Stream> FolderSession for ImapSession<S> {
    fn default_delimiter(&self) -> &str {
        &self.delimiter
    }

    fn list(&mut self, reference: &str, pattern: &str) -> Result<Response> {
        self.list_folders(reference, pattern)
    }

    fn create(&mut self, path: &str) -> Result<Response> {
        self.create_folder(path)
    }

    fn expunge(&mut self) -> Result<Response> {
        Self::expunge(self)
    }
}
