//! Fake IMAP server for integration testing
//!
//! This module provides an in-process IMAP server that speaks enough
//! of the protocol to test the crate end-to-end over real sockets:
//!
//! TCP -> greeting -> [STARTTLS ->] TLS handshake -> LOGIN -> commands -> LOGOUT
//!
//! ## Module layout
//!
//! - `server` -- TCP listener, TLS setup, and connection dispatch
//! - `handlers/` -- one file per IMAP command (LIST, CREATE, etc.)
//! - `mailbox` -- test data model (folders, messages, builder)
//! - `proxy` -- HTTP CONNECT proxy, permissive or refusing
//! - `io` -- shared write and argument helpers

#![allow(dead_code, unused_imports)]

mod handlers;
mod io;
pub mod mailbox;
pub mod proxy;

pub use mailbox::MailboxBuilder;
pub use proxy::FakeProxy;
pub use server::{FakeImapServer, Security};
