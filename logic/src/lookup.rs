use std::collections::HashSet;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tracing::{debug, instrument};

use crate::actor::ActorHandle;
use crate::config::RoutingConfig;
use crate::contact::Contact;
use crate::id::Id;
use crate::rpc::{FindValueResult, RpcClient};

/// Selects between the two RPCs the lookup engine drives a round with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LookupMode {
    NodeOnly,
    Value,
}

/// Result of a completed lookup (§4.8). `value` is only ever populated when
/// the lookup ran in [`LookupMode::Value`] and some peer held the key.
#[derive(Debug, Clone, Default)]
pub struct LookupOutcome {
    pub closest: Vec<Contact>,
    pub value: Option<(Vec<u8>, Contact)>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Probed {
    No,
    Yes,
}

struct ShortlistEntry {
    contact: Contact,
    probed: Probed,
}

fn sort_by_distance(entries: &mut [ShortlistEntry], target: Id) {
    entries.sort_by_key(|e| target.xor(&e.contact.id));
}

/// Drives one iterative lookup to completion, grounded on the teacher's
/// `BasicSearch` (`FuturesUnordered`-based α-parallel probing with a sorted
/// window) and on the original Go `NodeLookup`/`ShortList` for the
/// probed-state bookkeeping and convergence check.
#[instrument(skip(handle, rpc, config), fields(%target))]
pub async fn lookup<R: RpcClient>(
    handle: &ActorHandle,
    rpc: &R,
    me: Id,
    target: Id,
    mode: LookupMode,
    config: &RoutingConfig,
) -> LookupOutcome {
    let seed = handle.lookup_closest(target, config.alpha).await;
    if seed.is_empty() {
        return LookupOutcome::default();
    }

    let mut seen: HashSet<Id> = seed.iter().map(|c| c.id).collect();
    seen.insert(me);

    let mut shortlist: Vec<ShortlistEntry> = seed
        .into_iter()
        .map(|contact| ShortlistEntry {
            contact,
            probed: Probed::No,
        })
        .collect();
    sort_by_distance(&mut shortlist, target);

    loop {
        let to_probe: Vec<Contact> = shortlist
            .iter()
            .filter(|e| e.probed == Probed::No && e.contact.id != me)
            .take(config.alpha)
            .map(|e| e.contact)
            .collect();

        if to_probe.is_empty() {
            break;
        }

        let closest_before = shortlist.first().map(|e| e.contact.id);

        let mut pending: FuturesUnordered<_> = to_probe
            .into_iter()
            .map(|contact| {
                let rpc = rpc;
                async move {
                    let result = match mode {
                        LookupMode::NodeOnly => rpc
                            .find_node(contact, target)
                            .await
                            .map(FindValueResult::Contacts),
                        LookupMode::Value => rpc.find_value(contact, target).await,
                    };
                    (contact, result)
                }
            })
            .collect();

        let mut found: Option<(Vec<u8>, Contact)> = None;
        while let Some((contact, result)) = pending.next().await {
            if let Some(entry) = shortlist.iter_mut().find(|e| e.contact.id == contact.id) {
                entry.probed = Probed::Yes;
            }
            match result {
                Err(err) => {
                    debug!(peer = %contact.id, error = %err, "lookup probe failed");
                }
                Ok(FindValueResult::Value(value)) => {
                    debug!(peer = %contact.id, "lookup found value");
                    found = Some((value, contact));
                    break;
                }
                Ok(FindValueResult::Contacts(contacts)) => {
                    for discovered in contacts {
                        if seen.insert(discovered.id) {
                            shortlist.push(ShortlistEntry {
                                contact: discovered,
                                probed: Probed::No,
                            });
                        }
                    }
                    sort_by_distance(&mut shortlist, target);
                    shortlist.truncate(config.bucket_size);
                }
            }
        }

        if let Some((value, holder)) = found {
            return LookupOutcome {
                closest: shortlist.into_iter().map(|e| e.contact).collect(),
                value: Some((value, holder)),
            };
        }

        let closest_after = shortlist.first().map(|e| e.contact.id);
        let made_progress = match (closest_before, closest_after) {
            (Some(before), Some(after)) => {
                after != before && target.xor(&after) < target.xor(&before)
            }
            _ => false,
        };

        if made_progress {
            continue;
        }

        let no_unprobed_left = shortlist.iter().all(|e| e.probed == Probed::Yes);
        if no_unprobed_left {
            break;
        }

        // Convergence round: probe every remaining unprobed entry once more,
        // then stop regardless of whether it moved the head further.
        let remainder: Vec<Contact> = shortlist
            .iter()
            .filter(|e| e.probed == Probed::No && e.contact.id != me)
            .map(|e| e.contact)
            .collect();

        let mut final_round: FuturesUnordered<_> = remainder
            .into_iter()
            .map(|contact| {
                let rpc = rpc;
                async move {
                    let result = match mode {
                        LookupMode::NodeOnly => rpc
                            .find_node(contact, target)
                            .await
                            .map(FindValueResult::Contacts),
                        LookupMode::Value => rpc.find_value(contact, target).await,
                    };
                    (contact, result)
                }
            })
            .collect();

        while let Some((contact, result)) = final_round.next().await {
            if let Some(entry) = shortlist.iter_mut().find(|e| e.contact.id == contact.id) {
                entry.probed = Probed::Yes;
            }
            if let Ok(FindValueResult::Value(value)) = result {
                return LookupOutcome {
                    closest: shortlist.into_iter().map(|e| e.contact).collect(),
                    value: Some((value, contact)),
                };
            }
            if let Ok(FindValueResult::Contacts(contacts)) = result {
                for discovered in contacts {
                    if seen.insert(discovered.id) {
                        shortlist.push(ShortlistEntry {
                            contact: discovered,
                            probed: Probed::No,
                        });
                    }
                }
            }
        }
        sort_by_distance(&mut shortlist, target);
        shortlist.truncate(config.bucket_size);
        break;
    }

    shortlist.truncate(config.bucket_size);
    LookupOutcome {
        closest: shortlist.into_iter().map(|e| e.contact).collect(),
        value: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::RpcError;
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::Mutex;

    fn id_of(byte: u8) -> Id {
        let mut bytes = [0u8; 20];
        bytes[19] = byte;
        Id(bytes)
    }

    fn contact(byte: u8) -> Contact {
        let addr: SocketAddr = format!("127.0.0.1:{}", 9000 + byte as u16).parse().unwrap();
        Contact::new(id_of(byte), addr)
    }

    /// A scripted network: each node knows a fixed neighbor list and
    /// optionally holds the target value.
    struct FakeNetwork {
        neighbors: Mutex<HashMap<Id, Vec<Contact>>>,
        holder: Option<(Id, Vec<u8>)>,
    }

    #[async_trait::async_trait]
    impl RpcClient for FakeNetwork {
        async fn ping(&self, _receiver: Contact) -> Result<(), RpcError> {
            Ok(())
        }

        async fn find_node(&self, receiver: Contact, _target: Id) -> Result<Vec<Contact>, RpcError> {
            Ok(self
                .neighbors
                .lock()
                .unwrap()
                .get(&receiver.id)
                .cloned()
                .unwrap_or_default())
        }

        async fn find_value(&self, receiver: Contact, key: Id) -> Result<FindValueResult, RpcError> {
            if let Some((holder, value)) = &self.holder {
                if *holder == receiver.id && key == id_of(250) {
                    return Ok(FindValueResult::Value(value.clone()));
                }
            }
            Ok(FindValueResult::Contacts(
                self.neighbors
                    .lock()
                    .unwrap()
                    .get(&receiver.id)
                    .cloned()
                    .unwrap_or_default(),
            ))
        }

        async fn store(&self, _receiver: Contact, _key: Id, _value: Vec<u8>) -> Result<(), RpcError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn node_lookup_converges_and_collects_peers() {
        let me = Id::ZERO;
        let target = id_of(250);
        let mut neighbors = HashMap::new();
        neighbors.insert(contact(1).id, vec![contact(3), contact(4)]);
        neighbors.insert(contact(2).id, vec![contact(4), contact(5)]);
        neighbors.insert(contact(3).id, vec![]);
        neighbors.insert(contact(4).id, vec![]);
        neighbors.insert(contact(5).id, vec![]);
        let network = FakeNetwork {
            neighbors: Mutex::new(neighbors),
            holder: None,
        };

        let handle = crate::actor::spawn(
            Contact::new(me, "127.0.0.1:9000".parse().unwrap()),
            RoutingConfig::default(),
            |_| TestClient,
        );
        handle.observe_peer(contact(1).id, contact(1).addr);
        handle.observe_peer(contact(2).id, contact(2).addr);
        tokio::task::yield_now().await;

        let outcome = lookup(&handle, &network, me, target, LookupMode::NodeOnly, &RoutingConfig::default()).await;
        assert!(!outcome.closest.is_empty());
        assert!(outcome.value.is_none());
    }

    #[tokio::test]
    async fn value_lookup_terminates_early_on_hit() {
        let me = Id::ZERO;
        let target = id_of(250);
        let mut neighbors = HashMap::new();
        neighbors.insert(contact(1).id, vec![contact(2)]);
        neighbors.insert(contact(2).id, vec![]);
        let network = FakeNetwork {
            neighbors: Mutex::new(neighbors),
            holder: Some((contact(2).id, b"treasure".to_vec())),
        };

        let handle = crate::actor::spawn(
            Contact::new(me, "127.0.0.1:9000".parse().unwrap()),
            RoutingConfig::default(),
            |_| TestClient,
        );
        handle.observe_peer(contact(1).id, contact(1).addr);
        tokio::task::yield_now().await;

        let outcome = lookup(&handle, &network, me, target, LookupMode::Value, &RoutingConfig::default()).await;
        let (value, holder) = outcome.value.expect("value should be found");
        assert_eq!(value, b"treasure".to_vec());
        assert_eq!(holder.id, contact(2).id);
    }

    #[derive(Clone)]
    struct TestClient;

    #[async_trait::async_trait]
    impl RpcClient for TestClient {
        async fn ping(&self, _receiver: Contact) -> Result<(), RpcError> {
            Ok(())
        }
        async fn find_node(&self, _receiver: Contact, _target: Id) -> Result<Vec<Contact>, RpcError> {
            Ok(Vec::new())
        }
        async fn find_value(&self, _receiver: Contact, _key: Id) -> Result<FindValueResult, RpcError> {
            Ok(FindValueResult::Contacts(Vec::new()))
        }
        async fn store(&self, _receiver: Contact, _key: Id, _value: Vec<u8>) -> Result<(), RpcError> {
            Ok(())
        }
    }
}
