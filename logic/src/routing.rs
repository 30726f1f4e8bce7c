use crate::contact::Contact;
use crate::id::{Id, ID_LEN_BITS};
use crate::kbucket::{KBucket, TouchOutcome};

/// Result of [`RoutingTable::add`]; mirrors [`TouchOutcome`] plus the
/// "own address appearing as a peer" case the routing table itself guards
/// against (§4.10: silently ignored).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Inserted,
    Refreshed,
    Full(Contact),
    SelfIgnored,
}

/// 160 k-buckets indexed by prefix length to the local id, plus the local
/// `Me` contact. Invariant: no bucket ever contains the local id.
pub struct RoutingTable {
    me: Contact,
    buckets: Vec<KBucket>,
}

impl RoutingTable {
    pub fn new(me: Contact, bucket_size: usize) -> Self {
        let buckets = (0..ID_LEN_BITS).map(|_| KBucket::new(bucket_size)).collect();
        RoutingTable { me, buckets }
    }

    pub fn me(&self) -> Contact {
        self.me
    }

    fn bucket_for(&self, id: Id) -> usize {
        id.prefix_index(&self.me.id)
    }

    /// Inserts/refreshes `contact` in its bucket. See [`AddOutcome`].
    pub fn add(&mut self, contact: Contact) -> AddOutcome {
        if contact.id == self.me.id {
            return AddOutcome::SelfIgnored;
        }
        let idx = self.bucket_for(contact.id);
        match self.buckets[idx].touch(contact) {
            TouchOutcome::Inserted => AddOutcome::Inserted,
            TouchOutcome::Refreshed => AddOutcome::Refreshed,
            TouchOutcome::Full(tail) => AddOutcome::Full(tail),
        }
    }

    /// Evicts the least-recently-seen contact in `contact`'s bucket and
    /// inserts `contact` at the head. Used after a failed liveness probe on
    /// the tail returned by a prior `Full` outcome.
    pub fn evict_tail_insert_head(&mut self, contact: Contact) {
        let idx = self.bucket_for(contact.id);
        self.buckets[idx].evict_tail_insert_head(contact);
    }

    pub fn remove(&mut self, id: Id) -> bool {
        if id == self.me.id {
            return false;
        }
        let idx = self.bucket_for(id);
        self.buckets[idx].remove(id)
    }

    pub fn contains(&self, id: Id) -> bool {
        if id == self.me.id {
            return false;
        }
        self.buckets[self.bucket_for(id)].contains(id)
    }

    /// Returns up to `n` contacts closest to `target`, strictly ascending by
    /// distance (stable tie-break by id). Begins at `target`'s own bucket and
    /// expands symmetrically outward until enough candidates are gathered or
    /// every bucket has been visited.
    pub fn closest(&self, target: Id, n: usize) -> Vec<Contact> {
        let idx = self.bucket_for(target);
        let mut candidates = self.buckets[idx].contacts_with_distance(target);

        let mut i = 1;
        while candidates.len() < n && (idx >= i || idx + i < self.buckets.len()) {
            if idx >= i {
                candidates.extend(self.buckets[idx - i].contacts_with_distance(target));
            }
            if idx + i < self.buckets.len() {
                candidates.extend(self.buckets[idx + i].contacts_with_distance(target));
            }
            i += 1;
        }

        candidates.sort_by(|a, b| {
            a.distance
                .expect("stamped by contacts_with_distance")
                .cmp(&b.distance.expect("stamped by contacts_with_distance"))
                .then_with(|| a.id.cmp(&b.id))
        });
        candidates.truncate(n);
        candidates
    }

    pub fn bucket_len(&self, id: Id) -> usize {
        self.buckets[self.bucket_for(id)].len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn addr() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    fn id_with_last_byte(b: u8) -> Id {
        let mut bytes = [0u8; 20];
        bytes[19] = b;
        Id(bytes)
    }

    #[test]
    fn local_id_is_never_stored() {
        let me = Contact::new(Id::ZERO, addr());
        let mut table = RoutingTable::new(me, 20);
        assert_eq!(table.add(me), AddOutcome::SelfIgnored);
        assert!(!table.contains(me.id));
    }

    #[test]
    fn bucket_for_matches_prefix_index() {
        let me = Contact::new(Id::ZERO, addr());
        let table = RoutingTable::new(me, 20);
        let other = id_with_last_byte(1);
        assert_eq!(table.bucket_for(other), other.prefix_index(&Id::ZERO));
    }

    #[test]
    fn closest_returns_ascending_distance() {
        let me = Contact::new(Id::ZERO, addr());
        let mut table = RoutingTable::new(me, 20);
        for b in [5u8, 1, 9, 3] {
            table.add(Contact::new(id_with_last_byte(b), addr()));
        }
        let closest = table.closest(Id::ZERO, 4);
        let distances: Vec<_> = closest.iter().map(|c| c.distance.unwrap()).collect();
        for w in distances.windows(2) {
            assert!(w[0].less(&w[1]) || w[0] == w[1]);
        }
    }

    #[test]
    fn closest_caps_at_n() {
        let me = Contact::new(Id::ZERO, addr());
        let mut table = RoutingTable::new(me, 20);
        for b in 1u8..=10 {
            table.add(Contact::new(id_with_last_byte(b), addr()));
        }
        assert_eq!(table.closest(Id::ZERO, 3).len(), 3);
    }

    #[test]
    fn full_bucket_reports_tail_for_eviction() {
        let me = Contact::new(Id::ZERO, addr());
        let mut table = RoutingTable::new(me, 2);
        // All three share a prefix index (same leading byte pattern on the
        // same bit position) by construction: using the last byte only keeps
        // every id within the lowest bucket.
        let a = Contact::new(id_with_last_byte(1), addr());
        let b = Contact::new(id_with_last_byte(2), addr());
        let c = Contact::new(id_with_last_byte(3), addr());
        assert_eq!(table.add(a), AddOutcome::Inserted);
        assert_eq!(table.add(b), AddOutcome::Inserted);
        match table.add(c) {
            AddOutcome::Full(tail) => assert_eq!(tail.id, a.id),
            other => panic!("expected Full, got {other:?}"),
        }
        assert_eq!(table.bucket_len(a.id), 2);
    }
}
