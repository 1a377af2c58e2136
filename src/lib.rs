//! A library for building POP3 servers.
//!
//! The library supplies the maildrop session semantics mandated by the
//! protocol: message numbers that stay stable for a whole session,
//! deletion deferred until commit, one active session per mailbox, and
//! cleartext or digest authentication checked in constant time. The
//! user of the library supplies I/O code, command parsing and a
//! [`Driver`] implementation that gives sessions access to stored
//! mail.
//!
//! The code using the library calls [`SessionBuilder::login`] once a
//! client has sent its credentials, then maps each transaction-state
//! command onto a [`Session`] method and translates the [`Error`]
//! taxonomy into negative responses.
//!
//! # Pseudo Code
//! ```rust,ignore
//! // Create a driver connected to the mail store
//! let driver = create_driver();
//!
//! // One builder per server; its sessions exclude each other
//! let mut builder = SessionBuilder::new();
//! builder.allow_delete(true);
//!
//! // When a client has sent USER/PASS or answered the APOP challenge
//! let mut session = builder.login(driver, "alice", password, client_ip, challenge)?;
//!
//! // Transaction state
//! let listing = session.list(None)?;
//! let bytes = session.retrieve(1)?;
//! session.mark_deleted(1)?;
//!
//! // QUIT: apply the marked deletions, then free the mailbox
//! session.commit_delete()?;
//! session.logout();
//! ```

#![forbid(unsafe_code)]
#![forbid(missing_docs)]

use std::collections::HashSet;

mod auth;
mod err;
mod ledger;
mod maildrop;
mod registry;
mod session;

pub use crate::err::{BackendError, Error};
pub use crate::maildrop::{ListEntry, Listing};
pub use crate::registry::Registry;
pub use crate::session::{Session, SessionBuilder};

/// A `Driver` reads and deletes stored mail on behalf of sessions.
///
/// A Driver implementation must be provided by code using the maildrop
/// library.
///
/// All methods have a default implementation that reports an empty
/// store. A separate driver instance should be created for each
/// connection; the session takes ownership of it at login.
///
/// # Examples
/// ```
/// # use maildrop::{BackendError, Driver, Inbox};
/// struct MyDriver {}
/// impl Driver for MyDriver {
///     fn get_inbox(&mut self, user: &str, _ip: &str) -> Result<Option<Inbox>, BackendError> {
///         if user == "alice" {
///             Ok(Some(Inbox {
///                 pass: "secret".to_owned(),
///                 item_count: 0,
///                 size: 0,
///                 address_id: "1".to_owned(),
///             }))
///         } else {
///             Ok(None)
///         }
///     }
/// }
/// ```
pub trait Driver {
    /// Look up the inbox for a mailbox identity.
    ///
    /// `ip` is the address the client connected from, for stores that
    /// restrict where a mailbox may be read from; it is empty when the
    /// inbox is re-resolved mid-session. Returns `Ok(None)` when no
    /// such inbox exists.
    fn get_inbox(&mut self, _user: &str, _ip: &str) -> Result<Option<Inbox>, BackendError> {
        Ok(None)
    }

    /// List an inbox in stable order.
    ///
    /// With a message id the listing holds at most that one message,
    /// without one it holds the whole inbox. The order of the full
    /// listing fixes the message numbers for a session, so it must not
    /// change between calls over an unchanged inbox.
    fn get_inbox_list(
        &mut self,
        _address_id: &str,
        _msg_id: Option<&str>,
    ) -> Result<Vec<InboxEntry>, BackendError> {
        Ok(Vec::new())
    }

    /// How many stored messages match the given id, 0 or 1 in practice
    fn msg_exists(&mut self, _address_id: &str, _msg_id: &str) -> Result<u64, BackendError> {
        Ok(0)
    }

    /// Fetch a complete raw message, headers and body
    fn fetch_raw_msg(
        &mut self,
        _address_id: &str,
        _msg_id: &str,
    ) -> Result<Option<Vec<u8>>, BackendError> {
        Ok(None)
    }

    /// Delete the given messages, returning how many were removed
    fn delete_marked(
        &mut self,
        _address_id: &str,
        _msg_ids: &HashSet<String>,
    ) -> Result<u64, BackendError> {
        Ok(0)
    }

    /// Probe the store, true when it is reachable and usable
    fn test_settings(&mut self) -> bool {
        false
    }
}

/// An inbox as resolved by a driver.
#[derive(Clone, Debug)]
pub struct Inbox {
    /// Password as stored by the backend
    pub pass: String,
    /// Number of messages in the inbox
    pub item_count: u64,
    /// Total size of the inbox in octets
    pub size: u64,
    /// Opaque key used for all further backend calls about this inbox
    pub address_id: String,
}

/// One row of a driver inbox listing.
#[derive(Clone, Debug)]
pub struct InboxEntry {
    /// Opaque, permanent backend key of the message
    pub msg_id: String,
    /// Content checksum, e.g. a hash of the stored message
    pub checksum: String,
    /// Message size in octets
    pub size: u64,
}
