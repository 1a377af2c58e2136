//! The maildrop session and its builder.

use crate::auth;
use crate::err::Error;
use crate::ledger::Ledger;
use crate::maildrop::{ListEntry, Listing, Maildrop};
use crate::registry::Registry;
use crate::Driver;
use either::{Either, Left, Right};
use log::debug;
use std::sync::Arc;
use ternop::ternary;

/// Builds maildrop `Session`s for one deployment.
///
/// The builder holds the deployment-wide switches and the session
/// registry that enforces one active session per mailbox. Sessions
/// obtained from the same builder exclude each other; builders that
/// must agree on exclusivity can share a registry with
/// [`with_registry`](SessionBuilder::with_registry).
///
/// # Examples
/// ```
/// # use maildrop::{Driver, SessionBuilder};
/// # struct MyDriver {}
/// # impl Driver for MyDriver {}
/// # let driver = MyDriver {};
/// // Create a builder that holds the deployment configuration
/// let mut builder = SessionBuilder::new();
/// builder.allow_delete(false);
/// // Then when a client authenticates
/// let res = builder.login(driver, "alice", "secret", "203.0.113.9", "");
/// # assert!(res.is_err());
/// ```
#[derive(Clone, Debug)]
pub struct SessionBuilder {
    registry: Arc<Registry>,
    allow_delete: bool,
    require_password: bool,
}

impl SessionBuilder {
    /// A builder with its own empty registry, deletion enabled and
    /// passwords required
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            allow_delete: true,
            require_password: true,
        }
    }

    /// Set whether commits really delete mail.
    ///
    /// With deletion off, [`Session::commit_delete`] reports success
    /// without ever contacting the backend.
    pub fn allow_delete(&mut self, allow: bool) -> &mut Self {
        self.allow_delete = allow;
        self
    }

    /// Set whether logins must present valid credentials.
    ///
    /// With passwords off, any credentials are admitted for an inbox
    /// that exists. Only intended for trusted test environments.
    pub fn require_password(&mut self, require: bool) -> &mut Self {
        self.require_password = require;
        self
    }

    /// Use a registry shared with other builders
    pub fn with_registry(&mut self, registry: Arc<Registry>) -> &mut Self {
        self.registry = registry;
        self
    }

    /// The registry enforcing exclusivity for this builder's sessions
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Authenticate a client and open its maildrop.
    ///
    /// An empty `ts` means `password` is the cleartext password; a
    /// non-empty `ts` means the client answered the digest challenge
    /// `ts` and `password` is its hex digest. `ip` is the address the
    /// client connected from and is passed through to the driver.
    ///
    /// On success the mailbox is locked until
    /// [`Session::logout`]. Fails with [`Error::InUse`] when another
    /// session holds the mailbox, and with
    /// [`Error::InvalidCredentials`] whether the inbox is missing or
    /// the password is wrong: the two are deliberately not
    /// distinguishable by the caller.
    pub fn login<D: Driver>(
        &self,
        mut driver: D,
        user: &str,
        password: &str,
        ip: &str,
        ts: &str,
    ) -> Result<Session<D>, Error> {
        let inbox = match driver.get_inbox(user, ip)? {
            Some(inbox) => inbox,
            None => {
                debug!("({}) login to unknown inbox", user);
                return Err(Error::InvalidCredentials);
            }
        };
        if self.registry.is_active(user) {
            return Err(Error::InUse);
        }
        let valid = ternary!(
            self.require_password,
            auth::verify(password, &inbox.pass, ts),
            true
        );
        debug!("({}) auth stat:{}", user, valid);
        if !valid {
            return Err(Error::InvalidCredentials);
        }
        // The peek above orders InUse ahead of the credential check;
        // this is the authoritative check-then-insert
        self.registry.acquire(user)?;
        Ok(Session {
            driver,
            registry: Arc::clone(&self.registry),
            allow_delete: self.allow_delete,
            user: user.to_owned(),
            address_id: inbox.address_id,
            snapshot: None,
            ledger: Ledger::new(),
        })
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A single maildrop session serving a single authenticated client.
///
/// Obtained from [`SessionBuilder::login`]; owns the driver for its
/// connection and is not shared between threads. Message numbers handed
/// out by [`list`](Session::list) stay stable until the session ends,
/// and deletions requested with
/// [`mark_deleted`](Session::mark_deleted) only reach the backend on
/// [`commit_delete`](Session::commit_delete).
///
/// Dropping a session without calling [`logout`](Session::logout)
/// leaves the mailbox locked in the registry.
pub struct Session<D: Driver> {
    driver: D,
    registry: Arc<Registry>,
    allow_delete: bool,
    user: String,
    address_id: String,
    snapshot: Option<Maildrop>,
    ledger: Ledger,
}

impl<D: Driver> std::fmt::Debug for Session<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("address_id", &self.address_id)
            .field("allow_delete", &self.allow_delete)
            .field("snapshot", &self.snapshot)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl<D: Driver> Session<D> {
    /// The mailbox identity this session serves
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Number of messages and total octets in the listed maildrop.
    ///
    /// Fails with [`Error::NotListed`] until [`list`](Session::list)
    /// has populated the maildrop.
    pub fn stat(&self) -> Result<(usize, u64), Error> {
        let snapshot = self.listed()?;
        Ok((snapshot.count(), snapshot.octets()))
    }

    /// List the maildrop.
    ///
    /// Without a message number, the first call takes the session's
    /// snapshot of the inbox — one backend listing, kept in backend
    /// order — and this and every later call return the full listing
    /// from that snapshot. With a message number, the message must
    /// already be in the snapshot; the backend is consulted again so
    /// that a message removed behind the session's back is reported as
    /// [`Error::MessageGone`] instead of with stale sizes.
    pub fn list(&mut self, msg: Option<u32>) -> Result<Either<Listing, ListEntry>, Error> {
        match msg {
            None => {
                if self.snapshot.is_none() {
                    let rows = self.driver.get_inbox_list(&self.address_id, None)?;
                    debug!("({}) listed {} messages", self.user, rows.len());
                    self.snapshot = Some(Maildrop::build(rows));
                }
                Ok(Left(self.listed()?.listing()))
            }
            Some(msg) => {
                let msg_id = self.resolve(msg)?;
                let row = self
                    .driver
                    .get_inbox_list(&self.address_id, Some(&msg_id))?
                    .into_iter()
                    .next()
                    .ok_or(Error::MessageGone)?;
                Ok(Right(ListEntry {
                    id: msg,
                    octets: row.size,
                    checksum: row.checksum,
                }))
            }
        }
    }

    /// Mark a message for deletion at commit.
    ///
    /// The message itself is left alone: it stays listed and
    /// retrievable for the rest of the session. The backend is only
    /// asked to confirm the message still exists and the returned count
    /// is that confirmation. Fails with [`Error::MessageGone`] when the
    /// message disappeared after listing.
    pub fn mark_deleted(&mut self, msg: u32) -> Result<u64, Error> {
        let msg_id = self.resolve(msg)?;
        let count = self.driver.msg_exists(&self.address_id, &msg_id)?;
        if count == 0 {
            return Err(Error::MessageGone);
        }
        self.ledger.mark(msg_id);
        Ok(count)
    }

    /// Abandon every deletion marked so far. Always succeeds.
    pub fn reset_deleted(&mut self) {
        self.ledger.reset();
    }

    /// Fetch the raw bytes of a message.
    ///
    /// Marked messages are still retrievable until commit. Fails with
    /// [`Error::MessageGone`] when the backend no longer has the
    /// message.
    pub fn retrieve(&mut self, msg: u32) -> Result<Vec<u8>, Error> {
        let msg_id = self.resolve(msg)?;
        self.driver
            .fetch_raw_msg(&self.address_id, &msg_id)?
            .ok_or(Error::MessageGone)
    }

    /// Apply the deletions marked during this session.
    ///
    /// With the deployment delete switch off this is a pure no-op that
    /// reports success. Otherwise the inbox is resolved once more
    /// ([`Error::NoSuchInbox`] when that fails), an empty ledger
    /// succeeds trivially, and anything marked is drained and deleted
    /// by the backend in one call; the returned count is the backend's.
    /// A backend failure is propagated as-is and not retried.
    pub fn commit_delete(&mut self) -> Result<u64, Error> {
        if !self.allow_delete {
            debug!("({}) deletion disabled, commit is a no-op", self.user);
            return Ok(0);
        }
        let inbox = self
            .driver
            .get_inbox(&self.user, "")?
            .ok_or(Error::NoSuchInbox)?;
        if self.ledger.is_empty() {
            return Ok(0);
        }
        let marked = self.ledger.drain();
        let affected = self.driver.delete_marked(&inbox.address_id, &marked)?;
        debug!("({}) committed {} deletions", self.user, affected);
        Ok(affected)
    }

    /// Probe the backend through this session's driver
    pub fn test_settings(&mut self) -> bool {
        self.driver.test_settings()
    }

    /// End the session and unlock the mailbox.
    ///
    /// Anything marked but not committed is forgotten. This is the only
    /// way to release the registry entry; a session that is dropped
    /// instead keeps its mailbox locked.
    pub fn logout(self) {
        debug!("({}) logout", self.user);
        self.registry.release(&self.user);
    }

    // The snapshot, or the contract violation for using it too early
    fn listed(&self) -> Result<&Maildrop, Error> {
        self.snapshot.as_ref().ok_or(Error::NotListed)
    }

    // Map a session message number to the backend message id
    fn resolve(&self, msg: u32) -> Result<String, Error> {
        Ok(self.listed()?.resolve(msg)?.msg_id.clone())
    }
}

//----- Tests ------------------------------------------------------------------
