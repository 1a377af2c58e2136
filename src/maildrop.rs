//! The per-session snapshot of a mailbox.

use crate::err::Error;
use crate::InboxEntry;

/// One line of a maildrop listing.
#[derive(Clone, Debug, PartialEq)]
pub struct ListEntry {
    /// Message number, 1-based, stable for the whole session
    pub id: u32,
    /// Message size in octets
    pub octets: u64,
    /// Content checksum as reported by the backend
    pub checksum: String,
}

/// A full maildrop listing.
#[derive(Clone, Debug, PartialEq)]
pub struct Listing {
    /// One entry per message, in message number order
    pub messages: Vec<ListEntry>,
    /// Total size of the maildrop in octets
    pub octets: u64,
}

// A message slot in the snapshot. The message number is the index + 1.
#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) msg_id: String,
    pub(crate) checksum: String,
    pub(crate) size: u64,
}

/// The ordered view of a mailbox taken at listing time.
///
/// Built once per session from a single backend listing. The message
/// numbers assigned here stay valid until the session ends, whatever
/// happens to the backend in the meantime. The snapshot only maps
/// numbers to backend ids; deleting is the backend's business.
#[derive(Debug)]
pub(crate) struct Maildrop {
    slots: Vec<Slot>,
    octets: u64,
}

impl Maildrop {
    /// Number the messages 1..N in the order the backend listed them
    pub(crate) fn build(rows: Vec<InboxEntry>) -> Self {
        let mut octets = 0;
        let slots: Vec<Slot> = rows
            .into_iter()
            .map(|row| {
                octets += row.size;
                Slot {
                    msg_id: row.msg_id,
                    checksum: row.checksum,
                    size: row.size,
                }
            })
            .collect();
        Self { slots, octets }
    }

    /// Look up a message number assigned at listing time
    pub(crate) fn resolve(&self, msg: u32) -> Result<&Slot, Error> {
        if msg == 0 {
            return Err(Error::SequenceNotFound(msg));
        }
        self.slots
            .get(msg as usize - 1)
            .ok_or(Error::SequenceNotFound(msg))
    }

    pub(crate) fn count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn octets(&self) -> u64 {
        self.octets
    }

    /// The client-facing listing, message ids withheld
    pub(crate) fn listing(&self) -> Listing {
        let messages = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, slot)| ListEntry {
                id: i as u32 + 1,
                octets: slot.size,
                checksum: slot.checksum.clone(),
            })
            .collect();
        Listing {
            messages,
            octets: self.octets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matches::assert_matches;

    fn rows() -> Vec<InboxEntry> {
        vec![
            InboxEntry {
                msg_id: "m7".to_owned(),
                checksum: "h7".to_owned(),
                size: 120,
            },
            InboxEntry {
                msg_id: "m3".to_owned(),
                checksum: "h3".to_owned(),
                size: 80,
            },
        ]
    }

    #[test]
    fn numbers_follow_listing_order() {
        let snapshot = Maildrop::build(rows());
        assert_eq!(snapshot.resolve(1).unwrap().msg_id, "m7");
        assert_eq!(snapshot.resolve(2).unwrap().msg_id, "m3");
        assert_eq!(snapshot.count(), 2);
        assert_eq!(snapshot.octets(), 200);
    }

    #[test]
    fn out_of_range_numbers() {
        let snapshot = Maildrop::build(rows());
        assert_matches!(snapshot.resolve(0), Err(Error::SequenceNotFound(0)));
        assert_matches!(snapshot.resolve(3), Err(Error::SequenceNotFound(3)));
    }

    #[test]
    fn listing_withholds_message_ids() {
        let listing = Maildrop::build(rows()).listing();
        assert_eq!(listing.octets, 200);
        assert_eq!(
            listing.messages,
            vec![
                ListEntry {
                    id: 1,
                    octets: 120,
                    checksum: "h7".to_owned(),
                },
                ListEntry {
                    id: 2,
                    octets: 80,
                    checksum: "h3".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn empty_maildrop() {
        let snapshot = Maildrop::build(Vec::new());
        assert_eq!(snapshot.count(), 0);
        assert_eq!(snapshot.octets(), 0);
        assert_matches!(snapshot.resolve(1), Err(Error::SequenceNotFound(1)));
        assert!(snapshot.listing().messages.is_empty());
    }
}
