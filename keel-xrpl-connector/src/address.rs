//! # Addresses and Account IDs
//!
//! A classic address is the base58check encoding of a 20-byte account ID,
//! using the ledger's base58 alphabet with a leading version byte of
//! `0x00` (which renders as the familiar `r` prefix). The account ID of a
//! signing key is `RIPEMD160(SHA256(public_key))`.
//!
//! [`Address`] is parse-don't-validate: once constructed it is known to
//! be well-formed, and it carries both the raw account ID and the classic
//! encoding so neither has to be re-derived.

use std::fmt;
use std::str::FromStr;

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::error::AddressError;

/// Version byte prefixed to an account ID before base58check encoding.
pub const ACCOUNT_ID_VERSION: u8 = 0x00;

/// Length in bytes of a raw account ID.
pub const ACCOUNT_ID_LEN: usize = 20;

/// A validated ledger account address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    id: [u8; ACCOUNT_ID_LEN],
    encoded: String,
}

impl Address {
    /// Builds an address from a raw 20-byte account ID.
    pub fn from_account_id(id: [u8; ACCOUNT_ID_LEN]) -> Self {
        let encoded = bs58::encode(&id)
            .with_alphabet(bs58::Alphabet::RIPPLE)
            .with_check_version(ACCOUNT_ID_VERSION)
            .into_string();
        Self { id, encoded }
    }

    /// Derives the address controlled by `public_key` (the raw key bytes,
    /// typically 33-byte compressed secp256k1 or prefixed ed25519).
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let sha = Sha256::digest(public_key);
        let digest = Ripemd160::digest(sha);
        let mut id = [0u8; ACCOUNT_ID_LEN];
        id.copy_from_slice(&digest);
        Self::from_account_id(id)
    }

    /// Whether `input` parses as a classic address.
    ///
    /// This is a purely syntactic check; it says nothing about whether
    /// the account exists in any ledger.
    pub fn is_valid(input: &str) -> bool {
        input.parse::<Self>().is_ok()
    }

    /// The raw 20-byte account ID.
    pub fn account_id(&self) -> &[u8; ACCOUNT_ID_LEN] {
        &self.id
    }

    /// The classic base58check encoding.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = bs58::decode(s)
            .with_alphabet(bs58::Alphabet::RIPPLE)
            .with_check(Some(ACCOUNT_ID_VERSION))
            .into_vec()
            .map_err(map_decode_error)?;
        // The version byte survives decoding; only the checksum is stripped.
        if decoded.len() != ACCOUNT_ID_LEN + 1 {
            return Err(AddressError::Length(decoded.len()));
        }
        let mut id = [0u8; ACCOUNT_ID_LEN];
        id.copy_from_slice(&decoded[1..]);
        Ok(Self {
            id,
            encoded: s.to_string(),
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl serde::Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.encoded)
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Resolves the signing address named by `public_key`.
///
/// Accepts either a classic address (returned unchanged) or a
/// hex-encoded public key (decoded and run through the account-ID
/// derivation). Anything else is rejected with
/// [`AddressError::PublicKeyFormat`]. No I/O happens here.
pub fn resolve_signing_address(public_key: &str) -> Result<Address, AddressError> {
    if let Ok(address) = public_key.parse::<Address>() {
        return Ok(address);
    }
    if !public_key.is_empty() && public_key.bytes().all(|b| b.is_ascii_hexdigit()) {
        if let Ok(bytes) = hex::decode(public_key) {
            return Ok(Address::from_public_key(&bytes));
        }
    }
    Err(AddressError::PublicKeyFormat)
}

fn map_decode_error(err: bs58::decode::Error) -> AddressError {
    use bs58::decode::Error;
    match err {
        Error::InvalidChecksum { .. } | Error::NoChecksum => AddressError::Checksum,
        Error::InvalidVersion { ver, .. } => AddressError::Version(ver),
        _ => AddressError::Encoding,
    }
}
