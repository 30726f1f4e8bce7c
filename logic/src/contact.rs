use std::fmt;
use std::net::SocketAddr;

use crate::id::Id;

/// A `{id, address, distance?}` record, the unit of currency routing
/// structures and lookups pass around.
///
/// The cached `distance` field is always relative to the local node; it is
/// populated on insertion into routing structures and when a contact is
/// emitted into a lookup shortlist. It plays no part in equality: two
/// contacts with the same id and address are the same contact regardless of
/// which distance (if any) happens to be stamped on them.
#[derive(Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Contact {
    pub id: Id,
    pub addr: SocketAddr,
    pub distance: Option<Id>,
}

impl Contact {
    pub fn new(id: Id, addr: SocketAddr) -> Self {
        Contact {
            id,
            addr,
            distance: None,
        }
    }

    /// Returns a copy of this contact with `distance` stamped relative to
    /// `target`.
    pub fn with_distance(mut self, target: Id) -> Self {
        self.distance = Some(self.id.xor(&target));
        self
    }
}

impl PartialEq for Contact {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Contact {}

impl fmt::Debug for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contact")
            .field("id", &self.id)
            .field("addr", &self.addr)
            .finish()
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.addr)
    }
}
