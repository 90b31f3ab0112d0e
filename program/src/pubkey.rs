//! 32-byte account addresses.
use std::{fmt, mem::size_of, str::FromStr};

use borsh::{BorshDeserialize, BorshSerialize};
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of bytes in a pubkey
pub const PUBKEY_BYTES: usize = 32;

/// Maximum string length of a base58 encoded pubkey
const MAX_BASE58_LEN: usize = 44;

/// The address of an account.
///
/// The layout is exactly the 32 bytes the loader serializes, which lets the
/// deserializer hand out `&Pubkey` references straight into the input buffer.
#[derive(
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
    Pod,
    Zeroable,
)]
#[repr(transparent)]
pub struct Pubkey(pub(crate) [u8; PUBKEY_BYTES]);

#[derive(Error, Debug, Serialize, Clone, PartialEq, Eq)]
pub enum ParsePubkeyError {
    #[error("String is the wrong size")]
    WrongSize,
    #[error("Invalid Base58 string")]
    Invalid,
}

impl FromStr for Pubkey {
    type Err = ParsePubkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > MAX_BASE58_LEN {
            return Err(ParsePubkeyError::WrongSize);
        }
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| ParsePubkeyError::Invalid)?;
        if bytes.len() != size_of::<Pubkey>() {
            Err(ParsePubkeyError::WrongSize)
        } else {
            Ok(Pubkey::from_slice(&bytes))
        }
    }
}

impl From<[u8; PUBKEY_BYTES]> for Pubkey {
    fn from(from: [u8; PUBKEY_BYTES]) -> Self {
        Self(from)
    }
}

impl Pubkey {
    pub const fn new_from_array(pubkey_array: [u8; PUBKEY_BYTES]) -> Self {
        Self(pubkey_array)
    }

    /// Creates a pubkey from the first 32 bytes of `data`.
    ///
    /// # Panics
    /// Panics if `data` is shorter than 32 bytes.
    pub fn from_slice(data: &[u8]) -> Self {
        let mut bytes = [0u8; PUBKEY_BYTES];
        bytes.copy_from_slice(&data[..PUBKEY_BYTES]);
        Self(bytes)
    }

    /// Unique pubkey for tests and benchmarks.
    #[cfg(not(target_os = "solana"))]
    pub fn new_unique() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static I: AtomicU64 = AtomicU64::new(1);

        let mut b = [0u8; PUBKEY_BYTES];
        let i = I.fetch_add(1, Ordering::Relaxed);
        // Big-endian so that unique keys sort in creation order.
        b[0..8].copy_from_slice(&i.to_be_bytes());
        Self::from(b)
    }

    pub const fn to_bytes(self) -> [u8; PUBKEY_BYTES] {
        self.0
    }

    pub const fn as_array(&self) -> &[u8; PUBKEY_BYTES] {
        &self.0
    }

    /// Returns the serialized form used on the wire.
    pub fn serialize(&self) -> [u8; PUBKEY_BYTES] {
        self.0
    }

    /// Log a `Pubkey` from a program
    pub fn log(&self) {
        crate::log::sol_log(&self.to_string());
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0[..]
    }
}

impl AsMut<[u8]> for Pubkey {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0[..]
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}
