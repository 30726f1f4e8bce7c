use std::fmt;

use rand::Rng;
use thiserror::Error;

/// Length in bytes of a Kademlia identifier (160 bits).
pub const ID_LEN: usize = 20;
/// Length in bits of a Kademlia identifier.
pub const ID_LEN_BITS: usize = ID_LEN * 8;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdError {
    #[error("identifier must be exactly {expected} hex characters, got {actual}")]
    BadLength { expected: usize, actual: usize },
    #[error("identifier contains non-hexadecimal characters")]
    BadHex,
}

/// A 160-bit Kademlia identifier (node id or data key).
///
/// Equality and ordering are lexicographic over the 20 underlying bytes,
/// matching the original `KademliaID`'s big-endian byte comparisons.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Id(pub [u8; ID_LEN]);

impl Id {
    pub const ZERO: Id = Id([0u8; ID_LEN]);

    /// Parses a 40-character lowercase (or uppercase) hex string into an `Id`.
    pub fn parse(hex_str: &str) -> Result<Id, IdError> {
        if hex_str.len() != ID_LEN * 2 {
            return Err(IdError::BadLength {
                expected: ID_LEN * 2,
                actual: hex_str.len(),
            });
        }
        let mut bytes = [0u8; ID_LEN];
        hex::decode_to_slice(hex_str, &mut bytes).map_err(|_| IdError::BadHex)?;
        Ok(Id(bytes))
    }

    /// Draws a uniformly random identifier.
    pub fn random() -> Id {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; ID_LEN];
        rng.fill(&mut bytes);
        Id(bytes)
    }

    /// Bitwise XOR, used as the Kademlia distance metric.
    pub fn xor(&self, rhs: &Id) -> Id {
        let mut res = [0u8; ID_LEN];
        for i in 0..ID_LEN {
            res[i] = self.0[i] ^ rhs.0[i];
        }
        Id(res)
    }

    /// Total order over the big-endian unsigned interpretation of the id.
    ///
    /// Used both to compare ids directly and, via `xor`, to compare distances.
    pub fn less(&self, rhs: &Id) -> bool {
        self.0 < rhs.0
    }

    /// Index (0-based, 0 = highest order bit) of the most significant bit set
    /// in `self`. Returns `ID_LEN_BITS` if `self` is all-zero (no bit set) —
    /// callers combine this with [`Id::prefix_index`] which special-cases the
    /// zero-distance case separately.
    fn leading_zeros(&self) -> usize {
        for (byte_index, byte) in self.0.iter().enumerate() {
            if *byte != 0 {
                return byte_index * 8 + byte.leading_zeros() as usize;
            }
        }
        ID_LEN_BITS
    }

    /// Prefix index of `self` relative to `reference`: the 0-based position of
    /// the most-significant differing bit. An identifier equal to the
    /// reference has prefix index `ID_LEN_BITS - 1` (159).
    pub fn prefix_index(&self, reference: &Id) -> usize {
        let distance = self.xor(reference);
        let lz = distance.leading_zeros();
        lz.min(ID_LEN_BITS - 1)
    }

    pub fn as_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Id").field(&self.as_hex()).finish()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_hex())
    }
}

impl std::str::FromStr for Id {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Id::parse(s)
    }
}
