//! UDP datagram transport for the Kademlia core in `kadnet-logic`: wire
//! codec, transaction-correlated request/response client, and the inbound
//! RPC server loop.

pub mod client;
pub mod handler;
pub mod socket;
pub mod wire;

pub use client::UdpRpcClient;
pub use socket::UdpTransport;
pub use wire::{Message, Payload, WireError};
