//! IMAP transport and session layer
//!
//! A synchronous IMAP client core: a byte [`stream::Stream`] abstraction
//! with a live TCP/TLS implementation and a scripted fake, a
//! [`Connection`] that opens it with the right transport, TLS checks,
//! proxy and timeouts, an [`ImapSession`] that frames tagged commands,
//! and a [`FolderManager`] for listing, finding and creating folders.
//!
//! ```no_run
//! use imap_connection::{FolderManager, ImapConfig, ImapSession};
//! use imap_connection::stream::SocketStream;
//!
//! # fn main() -> imap_connection::Result<()> {
//! let config = ImapConfig::from_env()?;
//! let mut session = ImapSession::from_config(&config, SocketStream::new());
//! session.establish(&config)?;
//!
//! for folder in FolderManager::new(&mut session).get(None)? {
//!     println!("{}", folder.path);
//! }
//! session.logout()?;
//! # Ok(())
//! # }
//! ```

mod config;
mod connection;
mod error;
mod folder;
mod proxy;
mod response;
mod session;
pub mod stream;
pub mod tls;

pub use config::{DEFAULT_DELIMITER, ImapConfig};
pub use connection::{
    Connection, DEFAULT_CONNECTION_TIMEOUT, Encryption, Identifier, build_uid_command, uid_key,
};
pub use error::{Error, Result};
pub use folder::{Folder, FolderManager, FolderNode, FolderSession};
pub use proxy::{ProxyConfig, ProxyPatch};
pub use response::{ListEntry, Response, Status};
pub use session::ImapSession;
