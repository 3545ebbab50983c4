//! Core data types: the 32-byte [`Address`], block [`Hash`], and consensus-relevant [`Header`].

use alloy_primitives::{keccak256, Bytes, B256, U256};
use alloy_rlp::{BufMut, Encodable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of leading bytes in an [`Address`] reserved for the signature-scheme tag.
pub const SIG_TAG_LENGTH: usize = 6;

/// A 32-byte account/signer identity.
///
/// The first [`SIG_TAG_LENGTH`] bytes encode a signature-scheme tag (two ECDSA
/// variants plus four post-quantum variants are reserved); the remaining 26
/// bytes carry the keccak-derived identity. A 32-byte value whose first 12
/// bytes are zero is treated specially during authorization matching -- see
/// [`crate::recovery::signer_matches`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The zero address.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Build an address from a 32-byte slice.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 32];
        buf.copy_from_slice(bytes);
        Self(buf)
    }

    /// Derive the 32-byte digest from an uncompressed secp256k1 public key
    /// (65 bytes, leading `0x04` tag included) the way [`crate::recovery`]
    /// does for recovered signers: keccak256 of the 64-byte body, with the
    /// signature-scheme tag slot zeroed.
    pub fn from_uncompressed_pubkey(pubkey: &[u8]) -> Self {
        debug_assert_eq!(pubkey.len(), 65, "expected uncompressed secp256k1 point");
        let digest = keccak256(&pubkey[1..]);
        let mut out = [0u8; 32];
        out.copy_from_slice(digest.as_slice());
        out[..SIG_TAG_LENGTH].fill(0);
        Self(out)
    }

    /// Whether the first 12 bytes are zero -- the legacy ECDSA-26 compatibility form.
    pub fn has_legacy_zero_prefix(&self) -> bool {
        self.0[..12].iter().all(|b| *b == 0)
    }

    /// The trailing 20 bytes, used for legacy-form comparisons.
    pub fn last_20(&self) -> &[u8] {
        &self.0[12..]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Encodable for Address {
    fn encode(&self, out: &mut dyn BufMut) {
        self.0.as_slice().encode(out)
    }

    fn length(&self) -> usize {
        self.0.as_slice().length()
    }
}

impl alloy_rlp::Decodable for Address {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let bytes = alloy_rlp::Bytes::decode(buf)?;
        if bytes.len() != 32 {
            return Err(alloy_rlp::Error::UnexpectedLength);
        }
        Ok(Self::from_slice(&bytes))
    }
}

/// A keccak-256 digest. Reused from `alloy_primitives` since the width and
/// semantics are identical to the rest of the Ethereum-shaped ecosystem.
pub type Hash = B256;

/// The 8-byte vote-sentinel nonce.
pub type Nonce = [u8; 8];

/// All-ones nonce: a vote to authorize `header.coinbase`.
pub const NONCE_AUTH_VOTE: Nonce = [0xff; 8];
/// All-zeros nonce: a vote to deauthorize `header.coinbase`.
pub const NONCE_DROP_VOTE: Nonce = [0x00; 8];

/// The consensus-relevant subset of a block header.
///
/// Fields specific to later EVM forks (withdrawals, blobs, the beacon root)
/// are modeled as `Option` so that a decoded header that carries them can be
/// rejected explicitly by [`crate::header::seal_hash`] rather than silently
/// accepted or misencoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub parent_hash: Hash,
    pub ommers_hash: Hash,
    pub coinbase: Address,
    pub state_root: Hash,
    pub transactions_root: Hash,
    pub receipts_root: Hash,
    pub logs_bloom: Box<[u8; 256]>,
    pub difficulty: U256,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    /// Milliseconds since the Unix epoch. See DESIGN.md for the
    /// seconds-vs-milliseconds resolution.
    pub timestamp: u64,
    pub extra_data: Bytes,
    pub mix_hash: Hash,
    pub nonce: Nonce,
    pub base_fee_per_gas: Option<u64>,
    pub withdrawals_root: Option<Hash>,
    pub blob_gas_used: Option<u64>,
    pub excess_blob_gas: Option<u64>,
    pub parent_beacon_block_root: Option<Hash>,
}

impl Header {
    /// The canonical "empty uncle list" hash: `keccak256(rlp([]))`.
    pub fn empty_ommers_hash() -> Hash {
        keccak256([0xc0u8])
    }

    /// Whether this header carries any field reserved for a later fork.
    pub fn has_post_merge_fields(&self) -> bool {
        self.withdrawals_root.is_some()
            || self.blob_gas_used.is_some()
            || self.excess_blob_gas.is_some()
            || self.parent_beacon_block_root.is_some()
    }
}

impl Default for Header {
    fn default() -> Self {
        Self {
            parent_hash: Hash::ZERO,
            ommers_hash: Hash::ZERO,
            coinbase: Address::ZERO,
            state_root: Hash::ZERO,
            transactions_root: Hash::ZERO,
            receipts_root: Hash::ZERO,
            logs_bloom: Box::new([0u8; 256]),
            difficulty: U256::ZERO,
            number: 0,
            gas_limit: 0,
            gas_used: 0,
            timestamp: 0,
            extra_data: Bytes::new(),
            mix_hash: Hash::ZERO,
            nonce: [0u8; 8],
            base_fee_per_gas: None,
            withdrawals_root: None,
            blob_gas_used: None,
            excess_blob_gas: None,
            parent_beacon_block_root: None,
        }
    }
}
