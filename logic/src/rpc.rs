use async_trait::async_trait;
use thiserror::Error;

use crate::contact::Contact;
use crate::id::Id;

/// Typed failure surface for a single RPC call (§4.6/§4.7). Local to one
/// probe — never aborts a lookup, per §4.10.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum RpcError {
    #[error("request timed out")]
    Timeout,
    #[error("peer returned an invalid or error response")]
    PeerError,
    #[error("response could not be decoded")]
    DecodeError,
}

/// Outcome of a FIND_VALUE RPC: either the receiver held the key, or it
/// returns its k-closest contacts to the key (§4.7).
#[derive(Debug, Clone)]
pub enum FindValueResult {
    Value(Vec<u8>),
    Contacts(Vec<Contact>),
}

/// The four remote procedures a Kademlia node exposes to callers, abstracted
/// away from any particular wire transport.
///
/// This is the logic crate's half of the seam the teacher calls
/// `TransportSender`: the concrete transport crate implements it over UDP
/// datagrams, while the routing table, state actor and lookup engine only
/// ever depend on this trait.
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Liveness probe. Expects a PONG.
    async fn ping(&self, receiver: Contact) -> Result<(), RpcError>;

    /// Returns at most k contacts, sorted nearer-first by the receiver.
    async fn find_node(&self, receiver: Contact, target: Id) -> Result<Vec<Contact>, RpcError>;

    /// Returns the value if the receiver stores `key`, else its k-closest
    /// contacts to `key`.
    async fn find_value(&self, receiver: Contact, key: Id) -> Result<FindValueResult, RpcError>;

    /// Stores `value` under `key` on `receiver`. Expects STORE_OK.
    async fn store(&self, receiver: Contact, key: Id, value: Vec<u8>) -> Result<(), RpcError>;
}
