use std::net::SocketAddr;
use std::sync::Arc;

use kadnet_logic::{ActorHandle, RoutingConfig};
use tracing::{debug, warn};

use crate::socket::UdpTransport;
use crate::wire::{Message, Payload, WireError};

/// Drives the inbound side of the protocol (§4.7): reads requests off the
/// socket forever and answers each one from actor-provided snapshots.
/// Runs as its own task; never touches the routing table or value store
/// directly.
pub async fn serve(
    transport: Arc<UdpTransport>,
    me_addr: SocketAddr,
    handle: ActorHandle,
    config: RoutingConfig,
) {
    loop {
        match transport.recv().await {
            Ok(message) => {
                let transport = transport.clone();
                let handle = handle.clone();
                tokio::spawn(async move {
                    if let Err(err) =
                        handle_one(transport, me_addr, handle, config, message).await
                    {
                        warn!(%err, "failed to answer inbound request");
                    }
                });
            }
            Err(err) => {
                debug!(%err, "receive loop error, continuing");
            }
        }
    }
}

async fn closest_excluding(
    handle: &ActorHandle,
    target: kadnet_logic::Id,
    n: usize,
    excluded: kadnet_logic::Id,
) -> Vec<kadnet_logic::Contact> {
    let mut contacts = handle.lookup_closest(target, n + 1).await;
    contacts.retain(|c| c.id != excluded);
    contacts.truncate(n);
    contacts
}

async fn handle_one(
    transport: Arc<UdpTransport>,
    me_addr: SocketAddr,
    handle: ActorHandle,
    config: RoutingConfig,
    message: Message,
) -> Result<(), WireError> {
    handle.observe_peer(message.sender_id, message.sender_addr);

    let reply_to = message.sender_addr;
    let txn_id = message.txn_id;

    let sender_id = message.sender_id;
    let response_payload = match message.payload {
        Payload::Ping => Payload::Pong,
        Payload::FindNode { target } => {
            let contacts = closest_excluding(&handle, target, config.bucket_size, sender_id).await;
            Payload::Nodes { contacts }
        }
        Payload::FindValue { key } => match handle.lookup_value(key).await {
            Some(value) => Payload::Value { value },
            None => {
                let contacts = closest_excluding(&handle, key, config.bucket_size, sender_id).await;
                Payload::Nodes { contacts }
            }
        },
        Payload::Store { key, value } => {
            handle.store_value(key, value);
            Payload::StoreOk
        }
        // Responses to our own requests are consumed by the correlator in
        // `UdpTransport::recv` and never reach this handler.
        Payload::Pong | Payload::Nodes { .. } | Payload::Value { .. } | Payload::StoreOk => {
            debug!("ignoring unexpected response-shaped message routed to the request handler");
            return Ok(());
        }
    };

    transport
        .reply(reply_to, me_addr, txn_id, response_payload)
        .await
}
