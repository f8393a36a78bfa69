//! IMAP folder directory
//!
//! [`FolderManager`] lists, looks up and creates folders through any
//! [`FolderSession`]. Listings are fetched fresh on every call; nothing
//! is cached between operations.
//!
//! ```
//! use imap_connection::stream::FakeStream;
//! use imap_connection::{Connection, FolderManager, ImapSession};
//!
//! let mut stream = FakeStream::opened();
//! stream.feed([
//!     r#"* LIST (\HasChildren) "/" INBOX"#,
//!     r#"* LIST (\HasNoChildren) "/" "INBOX/Work""#,
//!     "TAG1 OK LIST completed",
//! ]);
//! let mut session = ImapSession::new(Connection::new(stream));
//!
//! let work = FolderManager::new(&mut session).find("INBOX/Work", None).unwrap().unwrap();
//! assert_eq!(work.name, "Work");
//! assert_eq!(work.parent_path(), Some("INBOX"));
//! ```

use crate::error::{Error, Result};
use crate::response::{ListEntry, Response};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// What the folder manager needs from an IMAP session.
pub trait FolderSession {
    /// Delimiter used by [`FolderManager::find`] when none is given.
    fn default_delimiter(&self) -> &str;

    /// # Errors
    ///
    /// Returns an error if the exchange fails.
    fn list(&mut self, reference: &str, pattern: &str) -> Result<Response>;

    /// # Errors
    ///
    /// Returns an error if the exchange fails.
    fn create(&mut self, path: &str) -> Result<Response>;

    /// # Errors
    ///
    /// Returns an error if the exchange fails.
    fn expunge(&mut self) -> Result<Response>;
}

/// A mailbox as reported by `LIST`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Folder {
    /// Full hierarchical name.
    pub path: String,
    /// Last component of the path.
    pub name: String,
    pub delimiter: String,
    pub flags: Vec<String>,
}

impl Folder {
    #[must_use]
    pub fn from_entry(entry: ListEntry) -> Self {
        let name = if entry.delimiter.is_empty() {
            entry.name.clone()
        } else {
            entry
                .name
                .rsplit(entry.delimiter.as_str())
                .next()
                .unwrap_or_default()
                .to_string()
        };

        Self {
            path: entry.name,
            name,
            delimiter: entry.delimiter,
            flags: entry.flags,
        }
    }

    /// Case-insensitive flag check, e.g. `has_flag("\\Noselect")`.
    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f.eq_ignore_ascii_case(flag))
    }

    #[must_use]
    pub fn has_children(&self) -> bool {
        self.has_flag(r"\HasChildren")
    }

    #[must_use]
    pub fn no_select(&self) -> bool {
        self.has_flag(r"\Noselect")
    }

    #[must_use]
    pub fn no_inferiors(&self) -> bool {
        self.has_flag(r"\Noinferiors")
    }

    #[must_use]
    pub fn marked(&self) -> bool {
        self.has_flag(r"\Marked")
    }

    /// Path of the enclosing folder, `None` at the top level.
    #[must_use]
    pub fn parent_path(&self) -> Option<&str> {
        if self.delimiter.is_empty() {
            return None;
        }
        self.path
            .rsplit_once(self.delimiter.as_str())
            .map(|(parent, _)| parent)
    }
}

/// A folder and the folders below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderNode {
    pub folder: Folder,
    pub children: Vec<Self>,
}

/// Folder operations on a borrowed session.
#[derive(Debug)]
pub struct FolderManager<'a, M: FolderSession + ?Sized> {
    session: &'a mut M,
}

impl<'a, M: FolderSession + ?Sized> FolderManager<'a, M> {
    pub const fn new(session: &'a mut M) -> Self {
        Self { session }
    }

    /// Look up a folder by path when `name_or_path` contains the
    /// delimiter, by name otherwise. `None` uses the session's
    /// delimiter.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails.
    pub fn find(&mut self, name_or_path: &str, delimiter: Option<&str>) -> Result<Option<Folder>> {
        let delimiter = delimiter.map_or_else(
            || self.session.default_delimiter().to_string(),
            str::to_string,
        );

        if !delimiter.is_empty() && name_or_path.contains(delimiter.as_str()) {
            self.find_by_path(name_or_path)
        } else {
            self.find_by_name(name_or_path)
        }
    }

    /// First folder whose last path component is exactly `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails.
    pub fn find_by_name(&mut self, name: &str) -> Result<Option<Folder>> {
        Ok(self.get(None)?.into_iter().find(|f| f.name == name))
    }

    /// First folder whose full path is exactly `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails.
    pub fn find_by_path(&mut self, path: &str) -> Result<Option<Folder>> {
        Ok(self.get(None)?.into_iter().find(|f| f.path == path))
    }

    /// All folders whose path starts with `parent`, in server order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Response`] if the server rejects the `LIST`.
    pub fn get(&mut self, parent: Option<&str>) -> Result<Vec<Folder>> {
        let pattern = format!("{}*", parent.unwrap_or_default());
        let response = self.session.list("", &pattern)?.validated()?;

        let folders: Vec<_> = response
            .list_entries()
            .into_iter()
            .map(Folder::from_entry)
            .collect();
        debug!("Listed {} folders matching {:?}", folders.len(), pattern);
        Ok(folders)
    }

    /// Create `path`, optionally expunge, and return the new folder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Response`] if a command is rejected and
    /// [`Error::FolderNotFound`] if the folder is not listed afterwards.
    pub fn create(&mut self, path: &str, expunge_after: bool) -> Result<Folder> {
        self.session.create(path)?.validated()?;
        if expunge_after {
            self.expunge()?;
        }

        self.find_by_path(path)?
            .ok_or_else(|| Error::FolderNotFound(path.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`Error::Response`] if the server rejects the `EXPUNGE`.
    pub fn expunge(&mut self) -> Result<Response> {
        self.session.expunge()?.validated()
    }

    /// The listing below `parent` arranged by hierarchy. Folders whose
    /// parent is not part of the listing become roots.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails.
    pub fn tree(&mut self, parent: Option<&str>) -> Result<Vec<FolderNode>> {
        Ok(build_tree(self.get(parent)?))
    }
}

fn build_tree(folders: Vec<Folder>) -> Vec<FolderNode> {
    fn attach(folder: Folder, children: &mut HashMap<String, Vec<Folder>>) -> FolderNode {
        let kids = children.remove(&folder.path).unwrap_or_default();
        FolderNode {
            children: kids.into_iter().map(|kid| attach(kid, children)).collect(),
            folder,
        }
    }

    let paths: HashSet<String> = folders.iter().map(|f| f.path.clone()).collect();
    let mut children: HashMap<String, Vec<Folder>> = HashMap::new();
    let mut roots = Vec::new();

    for folder in folders {
        let parent = folder
            .parent_path()
            .filter(|p| paths.contains(*p))
            .map(str::to_string);
        match parent {
            Some(parent) => children.entry(parent).or_default().push(folder),
            None => roots.push(folder),
        }
    }

    roots
        .into_iter()
        .map(|root| attach(root, &mut children))
        .collect()
}
