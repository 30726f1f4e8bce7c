//! Transport-agnostic Kademlia core: identifiers, routing table, value
//! store, the single-writer state actor and the iterative lookup engine.
//!
//! A concrete transport (UDP, in this workspace's `kadnet-transport` crate)
//! implements [`rpc::RpcClient`] and drives inbound RPCs through an
//! [`actor::ActorHandle`]; everything else in this crate is pure logic.

pub mod actor;
pub mod config;
pub mod contact;
pub mod event;
pub mod id;
pub mod kbucket;
pub mod lookup;
pub mod routing;
pub mod rpc;
pub mod storage;

pub use actor::ActorHandle;
pub use config::RoutingConfig;
pub use contact::Contact;
pub use id::{Id, IdError};
pub use lookup::{LookupMode, LookupOutcome};
pub use rpc::{FindValueResult, RpcClient, RpcError};
