use kadnet_logic::{Contact, Id};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on an encoded datagram, matching §4.5's "at least 8 KiB".
pub const MAX_DATAGRAM_SIZE: usize = 16 * 1024;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("message encodes to {0} bytes, exceeding the {MAX_DATAGRAM_SIZE} byte datagram cap")]
    TooLarge(usize),
    #[error("failed to encode message: {0}")]
    Encode(#[source] bincode::Error),
    #[error("failed to decode message: {0}")]
    Decode(#[source] bincode::Error),
    #[error("socket I/O error: {0}")]
    Io(#[source] std::io::Error),
}

/// The eight message kinds of the wire protocol (§4.5), each carrying
/// exactly the fields that type needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Payload {
    Ping,
    Pong,
    FindNode { target: Id },
    FindValue { key: Id },
    Store { key: Id, value: Vec<u8> },
    Nodes { contacts: Vec<Contact> },
    Value { value: Vec<u8> },
    StoreOk,
}

/// A single self-delimited datagram. `txn_id` correlates a response with
/// the request that caused it; `sender_id`/`sender_addr` let the receiver
/// warm its routing table without a separate handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub txn_id: u64,
    pub sender_id: Id,
    pub sender_addr: std::net::SocketAddr,
    pub payload: Payload,
}

impl Message {
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let bytes = bincode::serialize(self).map_err(WireError::Encode)?;
        if bytes.len() > MAX_DATAGRAM_SIZE {
            return Err(WireError::TooLarge(bytes.len()));
        }
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Message, WireError> {
        bincode::deserialize(bytes).map_err(WireError::Decode)
    }

    pub fn is_response(&self) -> bool {
        matches!(
            self.payload,
            Payload::Pong | Payload::Nodes { .. } | Payload::Value { .. } | Payload::StoreOk
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn addr() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    #[test]
    fn ping_round_trips() {
        let msg = Message {
            txn_id: 42,
            sender_id: Id::random(),
            sender_addr: addr(),
            payload: Payload::Ping,
        };
        let bytes = msg.encode().unwrap();
        let decoded = Message::decode(&bytes).unwrap();
        assert_eq!(decoded.txn_id, 42);
        assert!(matches!(decoded.payload, Payload::Ping));
    }

    #[test]
    fn nodes_round_trips_with_contacts() {
        let contact = Contact::new(Id::random(), addr());
        let msg = Message {
            txn_id: 7,
            sender_id: Id::random(),
            sender_addr: addr(),
            payload: Payload::Nodes {
                contacts: vec![contact],
            },
        };
        let bytes = msg.encode().unwrap();
        let decoded = Message::decode(&bytes).unwrap();
        match decoded.payload {
            Payload::Nodes { contacts } => {
                assert_eq!(contacts.len(), 1);
                assert_eq!(contacts[0].id, contact.id);
            }
            _ => panic!("expected Nodes payload"),
        }
    }

    #[test]
    fn oversized_value_is_rejected() {
        let msg = Message {
            txn_id: 1,
            sender_id: Id::random(),
            sender_addr: addr(),
            payload: Payload::Value {
                value: vec![0u8; MAX_DATAGRAM_SIZE * 2],
            },
        };
        assert!(matches!(msg.encode(), Err(WireError::TooLarge(_))));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(Message::decode(&[0xff; 4]).is_err());
    }
}
