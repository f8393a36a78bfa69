//! Scripted in-memory stream
//!
//! Responses are queued with [`FakeStream::feed`] and handed out one
//! line per [`Stream::read_line`]; everything written is recorded so a
//! test can check which commands went out with
//! [`FakeStream::assert_written`].
//!
//! ```
//! use imap_connection::stream::{FakeStream, Stream};
//!
//! let mut stream = FakeStream::opened();
//! stream.feed(["* OK ready", "TAG1 OK done\n"]);
//!
//! assert_eq!(stream.read_line().unwrap(), b"* OK ready\r\n");
//! assert_eq!(stream.read_line().unwrap(), b"TAG1 OK done\r\n");
//! ```

use super::{MetaKey, MetaValue, SocketOptions, Stream, StreamMeta, Transport};
use crate::error::Result;
use crate::tls::CryptoMethod;
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FakeStream {
    open: bool,
    pending: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    meta: StreamMeta,
    opened_with: Option<SocketOptions>,
}

impl Default for FakeStream {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeStream {
    /// A closed stream with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self {
            open: false,
            pending: VecDeque::new(),
            written: Vec::new(),
            meta: StreamMeta::new("c", "fake"),
            opened_with: None,
        }
    }

    /// A stream that is already open, as if `open` had succeeded.
    #[must_use]
    pub fn opened() -> Self {
        Self {
            open: true,
            ..Self::new()
        }
    }

    /// Queue response lines.
    pub fn feed<I, L>(&mut self, lines: I)
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u8]>,
    {
        for line in lines {
            self.feed_line(line);
        }
    }

    /// Queue a single response line. Whatever terminator it carries is
    /// replaced by exactly one CRLF.
    pub fn feed_line(&mut self, line: impl AsRef<[u8]>) {
        let line = line.as_ref();
        let end = line
            .iter()
            .rposition(|b| *b != b'\r' && *b != b'\n')
            .map_or(0, |i| i + 1);
        let mut normalized = line[..end].to_vec();
        normalized.extend_from_slice(b"\r\n");
        self.pending.push_back(normalized);
    }

    /// Update one metadata field by its dotted name.
    ///
    /// # Errors
    ///
    /// Fails if the key is not part of the metadata record or if the
    /// value is of a different kind than the one it replaces.
    pub fn set_meta(&mut self, key: &str, value: impl Into<MetaValue>) -> Result<()> {
        let key: MetaKey = key.parse()?;
        self.meta.set(key, value.into())
    }

    /// Look up one metadata field by its dotted name.
    ///
    /// # Errors
    ///
    /// Fails if the key is not part of the metadata record.
    pub fn meta_value(&self, key: &str) -> Result<MetaValue> {
        let key: MetaKey = key.parse()?;
        Ok(self.meta.get(key))
    }

    /// Lines still waiting to be read.
    #[must_use]
    pub const fn pending(&self) -> &VecDeque<Vec<u8>> {
        &self.pending
    }

    /// Options passed to the last successful `open`.
    #[must_use]
    pub const fn opened_with(&self) -> Option<&SocketOptions> {
        self.opened_with.as_ref()
    }

    /// Writes not yet consumed by an assertion.
    #[must_use]
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    /// Remove and return the first recorded write containing `expected`.
    pub fn take_written(&mut self, expected: &str) -> Option<Vec<u8>> {
        let needle = expected.as_bytes();
        let index = self
            .written
            .iter()
            .position(|block| contains(block, needle))?;
        Some(self.written.remove(index))
    }

    /// Assert that some recorded write contains `expected`, consuming
    /// the first one that does.
    ///
    /// # Panics
    ///
    /// Panics if no recorded write contains `expected`.
    #[track_caller]
    pub fn assert_written(&mut self, expected: &str) {
        if self.take_written(expected).is_none() {
            let remaining: Vec<_> = self
                .written
                .iter()
                .map(|block| String::from_utf8_lossy(block).into_owned())
                .collect();
            panic!("nothing written contains {expected:?}; remaining writes: {remaining:?}");
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

impl Stream for FakeStream {
    fn open(
        &mut self,
        _transport: Transport,
        _host: &str,
        _port: u16,
        _timeout: Duration,
        options: &SocketOptions,
    ) -> bool {
        self.open = true;
        self.opened_with = Some(options.clone());
        true
    }

    fn close(&mut self) {
        self.open = false;
        self.pending.clear();
    }

    fn read(&mut self, max: usize) -> Option<Vec<u8>> {
        if !self.open {
            return None;
        }
        if self.pending.is_empty() {
            return if self.meta.eof { None } else { Some(Vec::new()) };
        }

        let mut data: Vec<u8> = self.pending.drain(..).flatten().collect();
        if data.len() > max {
            let rest = data.split_off(max);
            self.pending.push_back(rest);
        }
        Some(data)
    }

    fn read_line(&mut self) -> Option<Vec<u8>> {
        if !self.open || self.meta.timed_out || self.meta.eof {
            return None;
        }
        self.pending.pop_front()
    }

    fn write(&mut self, data: &[u8]) -> Option<usize> {
        if !self.open {
            return None;
        }
        self.written.push(data.to_vec());
        Some(data.len())
    }

    fn metadata(&self) -> StreamMeta {
        self.meta.clone()
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn set_timeout(&mut self, _timeout: Duration) -> bool {
        true
    }

    fn set_crypto_enabled(&mut self, _enabled: bool, _method: CryptoMethod) -> bool {
        true
    }
}
