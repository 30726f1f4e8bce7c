use std::net::SocketAddr;

use tokio::sync::oneshot;

use crate::contact::Contact;
use crate::id::Id;

/// The single event queue consumed by the state actor (§4.9). Every mutation
/// of the routing table or value store flows through one of these variants;
/// nothing else is allowed to touch them.
pub enum Event {
    /// An RPC (inbound or a successful outbound response) surfaced a peer.
    ObservePeer { id: Id, addr: SocketAddr },

    /// A STORE RPC landed locally.
    StoreValue { key: Id, value: Vec<u8> },

    /// Read-only: compute the `n` closest contacts to `target`.
    LookupClosest {
        target: Id,
        n: usize,
        reply: oneshot::Sender<Vec<Contact>>,
    },

    /// Read-only: look up a stored value by key.
    LookupValue {
        key: Id,
        reply: oneshot::Sender<Option<Vec<u8>>>,
    },

    /// Diagnostic dump of the routing table to stdout.
    Print,

    /// Internal: the result of an off-thread liveness probe dispatched by the
    /// actor when a bucket was full (§4.9's "issue liveness probe... on
    /// failure, evict_tail_insert_head; on success, discard new contact").
    /// Never constructed outside this crate.
    EvictionProbeResult { candidate: Contact, alive: bool },
}
