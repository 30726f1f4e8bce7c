use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kadnet_logic::{ActorHandle, Contact, FindValueResult, Id, RpcClient, RpcError};
use tracing::instrument;

use crate::socket::UdpTransport;
use crate::wire::Payload;

/// Outbound half of the UDP transport: implements [`RpcClient`] over
/// [`UdpTransport`], generalizing the teacher's `TransportSender`
/// implementations (`wdht-transport/src/wrtc/sender.rs`).
#[derive(Clone)]
pub struct UdpRpcClient {
    transport: Arc<UdpTransport>,
    me_addr: SocketAddr,
    handle: ActorHandle,
    timeout: Duration,
}

impl UdpRpcClient {
    pub fn new(
        transport: Arc<UdpTransport>,
        me_addr: SocketAddr,
        handle: ActorHandle,
        timeout: Duration,
    ) -> Self {
        UdpRpcClient {
            transport,
            me_addr,
            handle,
            timeout,
        }
    }

    /// Every successful response surfaces its sender as a newly-seen contact
    /// (§4.6: "the client publishes an observe-peer event... source of
    /// routing-table warming").
    fn observe(&self, id: Id, addr: SocketAddr) {
        self.handle.observe_peer(id, addr);
    }
}

#[async_trait]
impl RpcClient for UdpRpcClient {
    #[instrument(skip(self), fields(peer = %receiver.id))]
    async fn ping(&self, receiver: Contact) -> Result<(), RpcError> {
        let response = self
            .transport
            .request(receiver, self.me_addr, Payload::Ping, self.timeout)
            .await?;
        self.observe(response.sender_id, response.sender_addr);
        match response.payload {
            Payload::Pong => Ok(()),
            _ => Err(RpcError::PeerError),
        }
    }

    #[instrument(skip(self), fields(peer = %receiver.id, %target))]
    async fn find_node(&self, receiver: Contact, target: Id) -> Result<Vec<Contact>, RpcError> {
        let response = self
            .transport
            .request(
                receiver,
                self.me_addr,
                Payload::FindNode { target },
                self.timeout,
            )
            .await?;
        self.observe(response.sender_id, response.sender_addr);
        match response.payload {
            Payload::Nodes { contacts } => Ok(contacts),
            _ => Err(RpcError::PeerError),
        }
    }

    #[instrument(skip(self), fields(peer = %receiver.id, %key))]
    async fn find_value(&self, receiver: Contact, key: Id) -> Result<FindValueResult, RpcError> {
        let response = self
            .transport
            .request(
                receiver,
                self.me_addr,
                Payload::FindValue { key },
                self.timeout,
            )
            .await?;
        self.observe(response.sender_id, response.sender_addr);
        match response.payload {
            Payload::Value { value } => Ok(FindValueResult::Value(value)),
            Payload::Nodes { contacts } => Ok(FindValueResult::Contacts(contacts)),
            _ => Err(RpcError::PeerError),
        }
    }

    #[instrument(skip(self, value), fields(peer = %receiver.id, %key, len = value.len()))]
    async fn store(&self, receiver: Contact, key: Id, value: Vec<u8>) -> Result<(), RpcError> {
        let response = self
            .transport
            .request(
                receiver,
                self.me_addr,
                Payload::Store { key, value },
                self.timeout,
            )
            .await?;
        self.observe(response.sender_id, response.sender_addr);
        match response.payload {
            Payload::StoreOk => Ok(()),
            _ => Err(RpcError::PeerError),
        }
    }
}
