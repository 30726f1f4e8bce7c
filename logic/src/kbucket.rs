use crate::contact::Contact;
use crate::id::Id;

/// Result of [`KBucket::touch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchOutcome {
    /// The contact was already present and has been moved to the head.
    Refreshed,
    /// The contact was new and the bucket had room for it.
    Inserted,
    /// The bucket is at capacity and does not contain this id. The bucket is
    /// left untouched; `candidate` is the current least-recently-seen
    /// (tail) contact the caller must liveness-probe before deciding whether
    /// to evict it in favor of the new contact.
    Full(Contact),
}

/// A bounded, ordered list of up to `capacity` contacts sharing a prefix
/// length with the local node. Head = most-recently-seen, tail =
/// least-recently-seen.
#[derive(Debug, Clone)]
pub struct KBucket {
    entries: Vec<Contact>,
    capacity: usize,
}

impl KBucket {
    pub fn new(capacity: usize) -> Self {
        KBucket {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: Id) -> bool {
        self.entries.iter().any(|c| c.id == id)
    }

    /// See [`TouchOutcome`].
    pub fn touch(&mut self, contact: Contact) -> TouchOutcome {
        if let Some(pos) = self.entries.iter().position(|c| c.id == contact.id) {
            let existing = self.entries.remove(pos);
            self.entries.insert(0, existing);
            return TouchOutcome::Refreshed;
        }

        if self.entries.len() < self.capacity {
            self.entries.insert(0, contact);
            return TouchOutcome::Inserted;
        }

        let tail = *self.entries.last().expect("full bucket is non-empty");
        TouchOutcome::Full(tail)
    }

    /// Evicts the tail and inserts `contact` at the head. Used by the state
    /// actor after a failed liveness probe on a full bucket's
    /// least-recently-seen entry.
    pub fn evict_tail_insert_head(&mut self, contact: Contact) {
        if !self.entries.is_empty() {
            self.entries.pop();
        }
        self.entries.insert(0, contact);
    }

    /// Removes a contact by id. Idempotent: returns whether anything was
    /// removed.
    pub fn remove(&mut self, id: Id) -> bool {
        if let Some(pos) = self.entries.iter().position(|c| c.id == id) {
            self.entries.remove(pos);
            true
        } else {
            false
        }
    }

    /// Returns every contact in the bucket, each stamped with its distance to
    /// `target`.
    pub fn contacts_with_distance(&self, target: Id) -> Vec<Contact> {
        self.entries
            .iter()
            .map(|c| c.with_distance(target))
            .collect()
    }
}
