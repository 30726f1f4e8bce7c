use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kadnet_logic::{Contact, Id, RpcError};
use tokio::net::UdpSocket;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

use crate::wire::{Message, Payload, WireError, MAX_DATAGRAM_SIZE};

/// Owns the UDP socket and the outstanding-transaction map (§4.5). Shared
/// behind an `Arc` by the RPC client (send path) and the receive loop
/// (wake/remove path); the map itself is a `Mutex` touched only to insert or
/// remove a slot, never held across I/O, per §5.
pub struct UdpTransport {
    socket: UdpSocket,
    me_id: Id,
    pending: Mutex<HashMap<u64, oneshot::Sender<Message>>>,
    next_txn: AtomicU64,
}

impl UdpTransport {
    pub async fn bind(addr: SocketAddr, me_id: Id) -> std::io::Result<Arc<UdpTransport>> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Arc::new(UdpTransport {
            socket,
            me_id,
            pending: Mutex::new(HashMap::new()),
            next_txn: AtomicU64::new(0),
        }))
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    fn next_txn_id(&self) -> u64 {
        self.next_txn.fetch_add(1, Ordering::Relaxed)
    }

    fn frame(&self, txn_id: u64, payload: Payload, sender_addr: SocketAddr) -> Message {
        Message {
            txn_id,
            sender_id: self.me_id,
            sender_addr,
            payload,
        }
    }

    /// Sends `payload` to `receiver` and awaits a correlated response,
    /// bounded by `timeout`. Inserts the completion slot before sending so a
    /// response racing the send can never be missed.
    pub async fn request(
        &self,
        receiver: Contact,
        me_addr: SocketAddr,
        payload: Payload,
        timeout: Duration,
    ) -> Result<Message, RpcError> {
        let txn_id = self.next_txn_id();
        let message = self.frame(txn_id, payload, me_addr);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(txn_id, tx);

        if let Err(err) = self.send_raw(receiver.addr, &message).await {
            self.pending.lock().await.remove(&txn_id);
            warn!(peer = %receiver.id, %err, "failed to send request");
            return Err(RpcError::PeerError);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(RpcError::PeerError),
            Err(_) => {
                self.pending.lock().await.remove(&txn_id);
                Err(RpcError::Timeout)
            }
        }
    }

    /// Sends a one-off message with no completion slot (a response, e.g.
    /// PONG or STORE_OK).
    pub async fn reply(
        &self,
        to: SocketAddr,
        me_addr: SocketAddr,
        txn_id: u64,
        payload: Payload,
    ) -> Result<(), WireError> {
        let message = self.frame(txn_id, payload, me_addr);
        self.send_raw(to, &message).await
    }

    async fn send_raw(&self, to: SocketAddr, message: &Message) -> Result<(), WireError> {
        let bytes = message.encode()?;
        self.socket.send_to(&bytes, to).await.map_err(WireError::Io)?;
        Ok(())
    }

    /// Reads inbound datagrams until one is a fresh request. Responses are
    /// consumed internally: a response with a live pending slot wakes that
    /// slot, and a response with no (or a stale) slot is dropped silently
    /// (§4.10's "duplicate responses for the same txn_id are dropped"
    /// generalizes naturally to unknown/expired ones too).
    pub async fn recv(&self) -> Result<Message, WireError> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            let (len, _from) = self.socket.recv_from(&mut buf).await.map_err(WireError::Io)?;
            let message = match Message::decode(&buf[..len]) {
                Ok(message) => message,
                Err(err) => {
                    debug!(%err, "dropping undecodable datagram");
                    continue;
                }
            };

            if message.is_response() {
                let mut pending = self.pending.lock().await;
                if let Some(tx) = pending.remove(&message.txn_id) {
                    drop(pending);
                    let _ = tx.send(message);
                } else {
                    debug!(txn_id = message.txn_id, "dropping response for unknown or stale transaction");
                }
                continue;
            }

            return Ok(message);
        }
    }
}
