//! Live TCP/TLS stream
//!
//! The socket is opened directly or through an HTTP `CONNECT` tunnel,
//! then optionally wrapped in a rustls session, either right away
//! (`ssl`/`tls` transports) or later through
//! [`Stream::set_crypto_enabled`] for STARTTLS.

use super::{ProxyOptions, SocketOptions, Stream, StreamMeta, TlsOptions, Transport};
use crate::error::{Error, Result};
use crate::tls::{self, CryptoMethod};
use rustls::{ClientConnection, StreamOwned};
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, trace, warn};

const CHUNK_SIZE: usize = 8192;

/// Largest proxy response head accepted before the tunnel is abandoned.
const MAX_PROXY_HEAD: usize = 4096;

/// A TLS session over TCP.
type TlsStream = StreamOwned<ClientConnection, TcpStream>;

enum Channel {
    Plain(TcpStream),
    Tls(Box<TlsStream>),
}

impl Channel {
    fn tcp(&self) -> &TcpStream {
        match self {
            Self::Plain(tcp) => tcp,
            Self::Tls(tls) => &tls.sock,
        }
    }
}

impl Read for Channel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(tcp) => tcp.read(buf),
            Self::Tls(tls) => tls.read(buf),
        }
    }
}

impl Write for Channel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(tcp) => tcp.write(buf),
            Self::Tls(tls) => tls.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(tcp) => tcp.flush(),
            Self::Tls(tls) => tls.flush(),
        }
    }
}

/// A blocking socket to the server.
pub struct SocketStream {
    channel: Option<Channel>,
    buffer: Vec<u8>,
    host: String,
    tls_options: TlsOptions,
    eof: bool,
    timed_out: bool,
}

impl Default for SocketStream {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SocketStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketStream")
            .field("host", &self.host)
            .field("open", &self.channel.is_some())
            .field("tls", &self.is_tls())
            .field("unread_bytes", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

impl SocketStream {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            channel: None,
            buffer: Vec::new(),
            host: String::new(),
            tls_options: TlsOptions::verified(true),
            eof: false,
            timed_out: false,
        }
    }

    /// Whether the channel currently runs inside a TLS session.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self.channel, Some(Channel::Tls(_)))
    }

    fn connect(
        &self,
        transport: Transport,
        port: u16,
        timeout: Duration,
        options: &SocketOptions,
    ) -> Result<Channel> {
        let tcp = match options.proxy_for(transport) {
            Some(proxy) => tunnel(proxy, &self.host, port, timeout)?,
            None => connect_tcp(&self.host, port, timeout)?,
        };
        set_tcp_timeouts(&tcp, timeout)?;

        if transport.is_implicit_tls() {
            let tls = handshake(tcp, &self.host, CryptoMethod::TlsClient, self.tls_options)?;
            Ok(Channel::Tls(Box::new(tls)))
        } else {
            Ok(Channel::Plain(tcp))
        }
    }

    /// Pull one chunk from the socket into the buffer, returning the
    /// number of bytes read. Timeouts and errors are recorded in the
    /// stream flags and surface as `None`.
    fn fill(&mut self, max: usize) -> Option<usize> {
        let channel = self.channel.as_mut()?;
        let mut chunk = vec![0; max.max(1)];
        match channel.read(&mut chunk) {
            Ok(0) => {
                self.eof = true;
                Some(0)
            }
            Ok(n) => {
                self.timed_out = false;
                self.buffer.extend_from_slice(&chunk[..n]);
                Some(n)
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                self.timed_out = true;
                None
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                self.eof = true;
                Some(0)
            }
            Err(e) => {
                warn!("Read from {} failed: {}", self.host, e);
                self.timed_out = false;
                self.eof = true;
                None
            }
        }
    }

    fn enable_tls(&mut self, method: CryptoMethod) -> bool {
        if !self.buffer.is_empty() {
            warn!("Refusing to start TLS with {} unread plaintext bytes", self.buffer.len());
            return false;
        }
        match self.channel.take() {
            Some(Channel::Plain(tcp)) => match handshake(tcp, &self.host, method, self.tls_options) {
                Ok(tls) => {
                    debug!("TLS established with {} using {}", self.host, method);
                    self.channel = Some(Channel::Tls(Box::new(tls)));
                    true
                }
                Err(e) => {
                    warn!("TLS handshake with {} failed: {}", self.host, e);
                    false
                }
            },
            Some(tls @ Channel::Tls(_)) => {
                self.channel = Some(tls);
                true
            }
            None => false,
        }
    }

    fn disable_tls(&mut self) -> bool {
        match self.channel.take() {
            Some(Channel::Tls(mut tls)) => {
                tls.conn.send_close_notify();
                if let Err(e) = tls.flush() {
                    warn!("Failed to send close_notify to {}: {}", self.host, e);
                }
                self.channel = Some(Channel::Plain(tls.sock));
                true
            }
            Some(plain @ Channel::Plain(_)) => {
                self.channel = Some(plain);
                true
            }
            None => false,
        }
    }
}

impl Stream for SocketStream {
    fn open(
        &mut self,
        transport: Transport,
        host: &str,
        port: u16,
        timeout: Duration,
        options: &SocketOptions,
    ) -> bool {
        self.close();
        self.host = host.to_string();
        self.tls_options = options.tls_or_default();

        debug!("Opening {}://{}:{}", transport, host, port);
        match self.connect(transport, port, timeout, options) {
            Ok(channel) => {
                self.channel = Some(channel);
                true
            }
            Err(e) => {
                warn!("Could not open {}://{}:{}: {}", transport, host, port, e);
                false
            }
        }
    }

    fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            if let Channel::Tls(tls) = &mut channel {
                tls.conn.send_close_notify();
                if let Err(e) = tls.conn.write_tls(&mut tls.sock) {
                    debug!("Failed to send close_notify to {}: {}", self.host, e);
                }
            }
            if let Err(e) = channel.tcp().shutdown(Shutdown::Both) {
                debug!("Shutdown of {} failed: {}", self.host, e);
            }
        }
        self.buffer.clear();
        self.eof = false;
        self.timed_out = false;
    }

    fn read(&mut self, max: usize) -> Option<Vec<u8>> {
        self.channel.as_ref()?;
        if self.buffer.is_empty() {
            if self.eof {
                return None;
            }
            match self.fill(max) {
                Some(0) => return None,
                Some(_) => {}
                None if self.timed_out => return Some(Vec::new()),
                None => return None,
            }
        }

        let take = max.min(self.buffer.len());
        Some(self.buffer.drain(..take).collect())
    }

    fn read_line(&mut self) -> Option<Vec<u8>> {
        self.channel.as_ref()?;
        loop {
            if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=pos).collect();
                trace!("S: {}", String::from_utf8_lossy(&line).trim_end());
                return Some(line);
            }
            if self.eof {
                return None;
            }
            self.fill(CHUNK_SIZE)?;
        }
    }

    fn write(&mut self, data: &[u8]) -> Option<usize> {
        let channel = self.channel.as_mut()?;
        match channel.write_all(data).and_then(|()| channel.flush()) {
            Ok(()) => Some(data.len()),
            Err(e) => {
                warn!("Write to {} failed: {}", self.host, e);
                None
            }
        }
    }

    fn metadata(&self) -> StreamMeta {
        let Some(channel) = &self.channel else {
            return StreamMeta::disconnected();
        };

        let mut meta = StreamMeta::new("r+", "tcp_socket");
        meta.eof = self.eof;
        meta.timed_out = self.timed_out;
        meta.blocked = true;
        meta.unread_bytes = self.buffer.len();

        if let Channel::Tls(tls) = channel {
            meta.stream_type = "tcp_socket/ssl".to_string();
            if let Some(version) = tls.conn.protocol_version() {
                meta.crypto.protocol = protocol_name(version);
                meta.crypto.cipher_version.clone_from(&meta.crypto.protocol);
            }
            if let Some(suite) = tls.conn.negotiated_cipher_suite() {
                let name = format!("{:?}", suite.suite());
                meta.crypto.cipher_bits = cipher_bits(&name);
                meta.crypto.cipher_name = name;
            }
        }
        meta
    }

    fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    fn set_timeout(&mut self, timeout: Duration) -> bool {
        let Some(channel) = &self.channel else {
            return false;
        };
        match set_tcp_timeouts(channel.tcp(), timeout) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to set timeout on {}: {}", self.host, e);
                false
            }
        }
    }

    fn set_crypto_enabled(&mut self, enabled: bool, method: CryptoMethod) -> bool {
        if enabled {
            self.enable_tls(method)
        } else {
            self.disable_tls()
        }
    }
}

fn connect_tcp(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        match connect_addr(&addr, timeout) {
            Ok(tcp) => return Ok(tcp),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.map_or_else(
        || Error::ConnectionFailed(format!("{host}:{port} did not resolve")),
        Error::Io,
    ))
}

fn connect_addr(addr: &std::net::SocketAddr, timeout: Duration) -> io::Result<TcpStream> {
    if timeout.is_zero() {
        TcpStream::connect(addr)
    } else {
        TcpStream::connect_timeout(addr, timeout)
    }
}

/// Open a TCP connection to `host:port` through an HTTP `CONNECT`
/// tunnel.
fn tunnel(proxy: &ProxyOptions, host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let endpoint = proxy
        .proxy
        .split_once("://")
        .map_or(proxy.proxy.as_str(), |(_, rest)| rest);
    let (proxy_host, proxy_port) = endpoint
        .rsplit_once(':')
        .and_then(|(h, p)| p.parse::<u16>().ok().map(|p| (h, p)))
        .ok_or_else(|| Error::Config(format!("Invalid proxy endpoint: {}", proxy.proxy)))?;

    debug!("Tunneling to {}:{} through {}", host, port, endpoint);
    let mut tcp = connect_tcp(proxy_host, proxy_port, timeout)?;
    set_tcp_timeouts(&tcp, timeout)?;

    let mut request = format!("CONNECT {host}:{port} HTTP/1.1\r\nHost: {host}:{port}\r\n");
    if let Some(header) = &proxy.header {
        request.push_str(header);
        request.push_str("\r\n");
    }
    request.push_str("\r\n");
    tcp.write_all(request.as_bytes())?;

    let status = read_proxy_head(&mut tcp)?;
    let code = status.split_whitespace().nth(1).unwrap_or_default();
    if code.starts_with('2') {
        Ok(tcp)
    } else {
        Err(Error::ConnectionFailed(format!(
            "Proxy refused tunnel: {}",
            status.trim_end()
        )))
    }
}

/// Read the proxy's response head byte by byte so nothing past the
/// blank line is consumed. Returns the status line.
fn read_proxy_head<R: Read>(tcp: &mut R) -> Result<String> {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") && !head.ends_with(b"\n\n") {
        if head.len() >= MAX_PROXY_HEAD {
            return Err(Error::ConnectionFailed(format!(
                "Proxy response head exceeds {MAX_PROXY_HEAD} bytes"
            )));
        }
        if tcp.read(&mut byte)? == 0 {
            return Err(Error::ConnectionFailed(
                "Proxy closed the connection".to_string(),
            ));
        }
        head.push(byte[0]);
    }
    let head = String::from_utf8_lossy(&head);
    Ok(head.lines().next().unwrap_or_default().to_string())
}

fn handshake(
    mut tcp: TcpStream,
    host: &str,
    method: CryptoMethod,
    options: TlsOptions,
) -> Result<TlsStream> {
    let config = tls::client_config(method, options)?;
    let mut conn = ClientConnection::new(config, tls::server_name(host)?)
        .map_err(|e| Error::Tls(e.to_string()))?;
    while conn.is_handshaking() {
        conn.complete_io(&mut tcp)
            .map_err(|e| Error::Tls(e.to_string()))?;
    }
    Ok(StreamOwned::new(conn, tcp))
}

fn set_tcp_timeouts(tcp: &TcpStream, timeout: Duration) -> io::Result<()> {
    let timeout = (!timeout.is_zero()).then_some(timeout);
    tcp.set_read_timeout(timeout)?;
    tcp.set_write_timeout(timeout)
}

fn protocol_name(version: rustls::ProtocolVersion) -> String {
    match version {
        rustls::ProtocolVersion::TLSv1_2 => "TLSv1.2".to_string(),
        rustls::ProtocolVersion::TLSv1_3 => "TLSv1.3".to_string(),
        other => format!("{other:?}"),
    }
}

fn cipher_bits(suite_name: &str) -> u32 {
    if suite_name.contains("AES_128") {
        128
    } else if suite_name.contains("AES_256") || suite_name.contains("CHACHA20") {
        256
    } else {
        0
    }
}
