//! Test data model for the fake IMAP server
//!
//! Provides a builder-style API for constructing mailbox state:
//!
//! ```ignore
//! let mailbox = MailboxBuilder::new()
//!     .folder("INBOX")
//!         .message(1, false)
//!         .message(2, true)
//!     .folder("INBOX/Work")
//!     .credentials("alice", "secret")
//!     .build();
//! ```
//!
//! The `Mailbox` is shared with the fake IMAP server behind a `Mutex`
//! so CREATE and EXPUNGE can change it while the server runs.

/// A complete mailbox: a collection of folders addressed by full path.
#[derive(Debug, Clone)]
pub struct Mailbox {
    pub delimiter: String,
    pub folders: Vec<Folder>,
    /// Accepted LOGIN credentials; `None` accepts anything.
    pub credentials: Option<(String, String)>,
}

impl Mailbox {
    /// Look up a folder by path (case-sensitive, matching real IMAP).
    pub fn get_folder(&self, name: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.name == name)
    }

    pub fn get_folder_mut(&mut self, name: &str) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|f| f.name == name)
    }

    /// Whether any folder lives below `name`.
    pub fn has_children(&self, name: &str) -> bool {
        let prefix = format!("{name}{}", self.delimiter);
        self.folders.iter().any(|f| f.name.starts_with(&prefix))
    }

    pub fn accepts(&self, username: &str, password: &str) -> bool {
        self.credentials
            .as_ref()
            .is_none_or(|(u, p)| u == username && p == password)
    }
}

/// A single IMAP folder (e.g. "INBOX", "INBOX/Work").
#[derive(Debug, Clone)]
pub struct Folder {
    pub name: String,
    pub messages: Vec<TestMessage>,
}

/// A message stored in a folder. Only what EXPUNGE needs.
#[derive(Debug, Clone)]
pub struct TestMessage {
    pub uid: u32,
    /// Whether the `\Deleted` flag is set.
    pub deleted: bool,
}

/// Builder for constructing a `Mailbox` step by step.
///
/// Call `.folder(name)` to start a new folder, then chain
/// `.message(uid, deleted)` calls to add messages to it.
/// Finish with `.build()` to get the final `Mailbox`.
pub struct MailboxBuilder {
    mailbox: Mailbox,
}

impl MailboxBuilder {
    pub fn new() -> Self {
        Self {
            mailbox: Mailbox {
                delimiter: "/".to_string(),
                folders: Vec::new(),
                credentials: None,
            },
        }
    }

    /// Add a new folder. Subsequent `.message()` calls add to it.
    pub fn folder(mut self, name: &str) -> Self {
        self.mailbox.folders.push(Folder {
            name: name.to_string(),
            messages: Vec::new(),
        });
        self
    }

    /// Add a message to the most recently added folder.
    ///
    /// # Panics
    ///
    /// Panics if called before any `.folder()` call.
    pub fn message(mut self, uid: u32, deleted: bool) -> Self {
        self.mailbox
            .folders
            .last_mut()
            .expect("call .folder() before .message()")
            .messages
            .push(TestMessage { uid, deleted });
        self
    }

    /// Only accept these LOGIN credentials.
    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.mailbox.credentials = Some((username.to_string(), password.to_string()));
        self
    }

    pub fn delimiter(mut self, delimiter: &str) -> Self {
        self.mailbox.delimiter = delimiter.to_string();
        self
    }

    /// Consume the builder and return the finished `Mailbox`.
    pub fn build(self) -> Mailbox {
        self.mailbox
    }
}
