use std::net::SocketAddr;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::config::RoutingConfig;
use crate::contact::Contact;
use crate::event::Event;
use crate::id::Id;
use crate::routing::{AddOutcome, RoutingTable};
use crate::rpc::RpcClient;
use crate::storage::ValueStore;

/// Cloneable front-end to the state actor. RPC handlers and the lookup
/// engine talk to the routing table and value store exclusively through
/// this handle — never directly — so the actor remains the sole writer.
#[derive(Clone)]
pub struct ActorHandle {
    tx: mpsc::UnboundedSender<Event>,
}

impl ActorHandle {
    pub fn observe_peer(&self, id: Id, addr: SocketAddr) {
        let _ = self.tx.send(Event::ObservePeer { id, addr });
    }

    pub fn store_value(&self, key: Id, value: Vec<u8>) {
        let _ = self.tx.send(Event::StoreValue { key, value });
    }

    /// Computes the `n` closest contacts to `target`. Resolves to an empty
    /// vec if the actor has shut down (§4.10: reply-slot closed is treated as
    /// graceful termination).
    pub async fn lookup_closest(&self, target: Id, n: usize) -> Vec<Contact> {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(Event::LookupClosest { target, n, reply })
            .is_err()
        {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    pub async fn lookup_value(&self, key: Id) -> Option<Vec<u8>> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Event::LookupValue { key, reply }).is_err() {
            return None;
        }
        rx.await.ok().flatten()
    }

    pub fn print(&self) {
        let _ = self.tx.send(Event::Print);
    }

    fn eviction_probe_result(&self, candidate: Contact, alive: bool) {
        let _ = self.tx.send(Event::EvictionProbeResult { candidate, alive });
    }
}

/// Owns the routing table and value store; the only task allowed to mutate
/// them. Spawn with [`spawn`].
struct Actor<R> {
    me: Contact,
    routing: RoutingTable,
    storage: ValueStore,
    rpc: R,
    handle: ActorHandle,
}

impl<R: RpcClient + Clone + 'static> Actor<R> {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Event>) {
        info!(me = %self.me.id, "state actor started");
        while let Some(event) = rx.recv().await {
            match event {
                Event::ObservePeer { id, addr } => self.on_observe_peer(id, addr),
                Event::StoreValue { key, value } => {
                    debug!(%key, len = value.len(), "storing value");
                    self.storage.put(key, value);
                }
                Event::LookupClosest { target, n, reply } => {
                    let _ = reply.send(self.routing.closest(target, n));
                }
                Event::LookupValue { key, reply } => {
                    let _ = reply.send(self.storage.get(key).cloned());
                }
                Event::Print => self.on_print(),
                Event::EvictionProbeResult { candidate, alive } => {
                    if alive {
                        debug!(tail = %candidate.id, "replacement candidate discarded, tail alive");
                    } else {
                        info!(new = %candidate.id, "evicting dead tail, inserting new contact");
                        self.routing.evict_tail_insert_head(candidate);
                    }
                }
            }
        }
        info!(me = %self.me.id, "state actor shutting down");
    }

    fn on_observe_peer(&mut self, id: Id, addr: SocketAddr) {
        let contact = Contact::new(id, addr);
        match self.routing.add(contact) {
            AddOutcome::Inserted | AddOutcome::Refreshed => {}
            AddOutcome::SelfIgnored => {
                debug!(%id, "ignoring own address observed as a peer");
            }
            AddOutcome::Full(tail) => {
                debug!(candidate = %id, tail = %tail.id, "bucket full, probing tail");
                let rpc = self.rpc.clone();
                let handle = self.handle.clone();
                tokio::spawn(async move {
                    let alive = rpc.ping(tail).await.is_ok();
                    handle.eviction_probe_result(contact, alive);
                });
            }
        }
    }

    fn on_print(&self) {
        println!("Routing table for {}:", self.me);
        self.print_all_buckets();
    }

    fn print_all_buckets(&self) {
        // The routing table does not expose raw bucket iteration (only
        // distance-ranked queries), so PRINT asks it for an over-sized
        // closest() from our own id, which walks every bucket exactly once
        // in the same outward-expansion order a full dump would use.
        let everyone = self.routing.closest(self.me.id, usize::MAX / 2);
        if everyone.is_empty() {
            println!("  (empty)");
            return;
        }
        for contact in everyone {
            println!("  {contact}");
        }
    }
}

/// Spawns the state actor as a background task and returns a handle to it.
///
/// `make_rpc` receives a clone of the actor's own handle before the actor
/// starts running, so an `RpcClient` implementation that itself needs an
/// `ActorHandle` (e.g. to publish `observe-peer` events on successful
/// responses) can be constructed without a chicken-and-egg cycle against
/// `spawn`'s return value.
pub fn spawn<R, F>(me: Contact, config: RoutingConfig, make_rpc: F) -> ActorHandle
where
    R: RpcClient + Clone + 'static,
    F: FnOnce(ActorHandle) -> R,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = ActorHandle { tx };
    let rpc = make_rpc(handle.clone());
    let actor = Actor {
        me,
        routing: RoutingTable::new(me, config.bucket_size),
        storage: ValueStore::new(),
        rpc,
        handle: handle.clone(),
    };
    tokio::spawn(actor.run(rx));
    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::FindValueResult;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct AlwaysAlive;

    #[async_trait::async_trait]
    impl RpcClient for AlwaysAlive {
        async fn ping(&self, _receiver: Contact) -> Result<(), crate::rpc::RpcError> {
            Ok(())
        }
        async fn find_node(
            &self,
            _receiver: Contact,
            _target: Id,
        ) -> Result<Vec<Contact>, crate::rpc::RpcError> {
            Ok(Vec::new())
        }
        async fn find_value(
            &self,
            _receiver: Contact,
            _key: Id,
        ) -> Result<FindValueResult, crate::rpc::RpcError> {
            Ok(FindValueResult::Contacts(Vec::new()))
        }
        async fn store(
            &self,
            _receiver: Contact,
            _key: Id,
            _value: Vec<u8>,
        ) -> Result<(), crate::rpc::RpcError> {
            Ok(())
        }
    }

    #[derive(Clone)]
    struct AlwaysDead(Arc<AtomicBool>);

    #[async_trait::async_trait]
    impl RpcClient for AlwaysDead {
        async fn ping(&self, _receiver: Contact) -> Result<(), crate::rpc::RpcError> {
            self.0.store(true, Ordering::SeqCst);
            Err(crate::rpc::RpcError::Timeout)
        }
        async fn find_node(
            &self,
            _receiver: Contact,
            _target: Id,
        ) -> Result<Vec<Contact>, crate::rpc::RpcError> {
            Ok(Vec::new())
        }
        async fn find_value(
            &self,
            _receiver: Contact,
            _key: Id,
        ) -> Result<FindValueResult, crate::rpc::RpcError> {
            Ok(FindValueResult::Contacts(Vec::new()))
        }
        async fn store(
            &self,
            _receiver: Contact,
            _key: Id,
            _value: Vec<u8>,
        ) -> Result<(), crate::rpc::RpcError> {
            Ok(())
        }
    }

    fn contact(byte: u8) -> Contact {
        let mut bytes = [0u8; 20];
        bytes[19] = byte;
        Contact::new(Id(bytes), "127.0.0.1:9000".parse().unwrap())
    }

    #[tokio::test]
    async fn store_and_lookup_value_round_trip() {
        let me = Contact::new(Id::ZERO, "127.0.0.1:9000".parse().unwrap());
        let config = RoutingConfig::default();
        let handle = spawn(me, config, |_| AlwaysAlive);

        handle.store_value(contact(1).id, b"hello".to_vec());
        // give the actor a chance to process the fire-and-forget event
        tokio::task::yield_now().await;
        let got = handle.lookup_value(contact(1).id).await;
        assert_eq!(got, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn lookup_closest_reflects_observed_peers() {
        let me = Contact::new(Id::ZERO, "127.0.0.1:9000".parse().unwrap());
        let mut config = RoutingConfig::default();
        config.bucket_size = 20;
        let handle = spawn(me, config, |_| AlwaysAlive);

        let peer = contact(7);
        handle.observe_peer(peer.id, peer.addr);
        tokio::task::yield_now().await;

        let closest = handle.lookup_closest(peer.id, 5).await;
        assert!(closest.iter().any(|c| c.id == peer.id));
    }

    #[tokio::test]
    async fn full_bucket_evicts_dead_tail() {
        let me = Contact::new(Id::ZERO, "127.0.0.1:9000".parse().unwrap());
        let mut config = RoutingConfig::default();
        config.bucket_size = 1;
        let probed = Arc::new(AtomicBool::new(false));
        let handle = spawn(me, config, |_| AlwaysDead(probed.clone()));

        let first = contact(1);
        let second = contact(2);
        handle.observe_peer(first.id, first.addr);
        tokio::task::yield_now().await;
        handle.observe_peer(second.id, second.addr);

        // wait for the off-thread probe + its reply event to land
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }

        assert!(probed.load(Ordering::SeqCst));
        let closest = handle.lookup_closest(second.id, 5).await;
        assert!(closest.iter().any(|c| c.id == second.id));
        assert!(!closest.iter().any(|c| c.id == first.id));
    }
}
