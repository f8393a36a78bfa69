//! IMAP command handlers for the fake server.
//!
//! Each handler lives in its own module, processes a single IMAP
//! command (CREATE, EXPUNGE, LIST, LOGIN, LOGOUT, SELECT) and writes
//! its response to any `Write`, so it can be tested against a
//! `Vec<u8>`.

mod create;
mod list;
mod logout;
mod select;

pub use create::handle_create;
pub use expunge::handle_expunge;
pub use list::handle_list;
pub use login::handle_login;
pub use logout::handle_logout;
pub use select::handle_select;
