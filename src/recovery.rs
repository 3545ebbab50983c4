//! Signer recovery and the legacy-compatibility authorization match (spec §4.2, §4.3).
//!
//! Grounded on `fastClique.go`'s `ecrecover` (recovering the uncompressed
//! public key via `crypto.Ecrecover`, keccak-hashing its body, zeroing the
//! signature-scheme tag) and its `verifySeal` zero-prefix matching loop,
//! translated into a single reusable helper per DESIGN NOTES ("centralize
//! the §4.3 match rule").

use crate::cache::LruCache;
use crate::constants::EXTRA_SEAL_LENGTH;
use crate::errors::PoaConsensusError;
use crate::header::seal_hash;
use crate::types::{Address, Hash, Header};
use k256::ecdsa::{RecoveryId, Signature as K256Signature, VerifyingKey};
use std::sync::Mutex;

/// Thread-safe LRU mapping header hash -> recovered signer address.
///
/// Wraps [`LruCache`] behind a `Mutex`, matching the "thread-safe caches
/// with their own internal synchronization" resource model in spec §5.
pub struct SignerCache {
    inner: Mutex<LruCache<Hash, Address>>,
}

impl SignerCache {
    pub fn new(capacity: usize) -> Self {
        Self { inner: Mutex::new(LruCache::new(capacity)) }
    }

    fn get(&self, hash: &Hash) -> Option<Address> {
        self.inner.lock().expect("signer cache poisoned").get(hash).copied()
    }

    fn insert(&self, hash: Hash, address: Address) {
        self.inner.lock().expect("signer cache poisoned").insert(hash, address);
    }
}

/// Normalize a trailing recovery-id byte (0/1 or the Ethereum 27/28
/// convention) to the `0`/`1` form `k256` expects.
fn normalize_recovery_id(v: u8) -> Option<RecoveryId> {
    let id = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        _ => return None,
    };
    RecoveryId::from_byte(id)
}

/// `ecrecover(header, cache) -> address` (spec §4.2).
///
/// Returns the cached signer if `header`'s hash is already known. Otherwise
/// recovers the uncompressed secp256k1 public key from the trailing 65-byte
/// signature over `seal_hash(header)`, keccak-hashes the 64-byte body, and
/// zeroes the signature-scheme tag slot of the resulting address.
pub fn ecrecover(header: &Header, cache: &SignerCache) -> Result<Address, PoaConsensusError> {
    let hash = header.hash();
    if let Some(address) = cache.get(&hash) {
        return Ok(address);
    }

    if header.extra_data.len() < EXTRA_SEAL_LENGTH {
        return Err(PoaConsensusError::MissingSignature);
    }
    let sig_bytes = &header.extra_data[header.extra_data.len() - EXTRA_SEAL_LENGTH..];
    let (rs, v) = sig_bytes.split_at(64);

    let signature =
        K256Signature::from_slice(rs).map_err(|_| PoaConsensusError::MissingSignature)?;
    let recovery_id =
        normalize_recovery_id(v[0]).ok_or(PoaConsensusError::MissingSignature)?;

    let prehash = seal_hash(header)?;
    let verifying_key =
        VerifyingKey::recover_from_prehash(prehash.as_slice(), &signature, recovery_id)
            .map_err(|_| PoaConsensusError::MissingSignature)?;

    let uncompressed = verifying_key.to_encoded_point(false);
    let address = Address::from_uncompressed_pubkey(uncompressed.as_bytes());

    cache.insert(hash, address);
    Ok(address)
}

/// The §4.3 authorization match: does `signer` satisfy `auth`, either as a
/// byte-exact match or, when `auth` carries a zero legacy prefix, as a
/// last-20-bytes match?
pub fn signer_matches(signer: &Address, auth: &Address) -> bool {
    if auth.has_legacy_zero_prefix() {
        signer.last_20() == auth.last_20()
    } else {
        signer == auth
    }
}

/// Whether `signer` is authorized under any entry of `signers`, applying
/// [`signer_matches`] to each.
pub fn is_authorized(signer: &Address, signers: &[Address]) -> bool {
    signers.iter().any(|auth| signer_matches(signer, auth))
}

impl Header {
    /// Header hash used as the [`SignerCache`] key -- keccak256 of the full
    /// `extra_data` (including the seal) folded onto the seal hash, so that
    /// two headers differing only in their signature are cached separately.
    /// Distinct from [`seal_hash`], which intentionally excludes the seal.
    pub fn hash(&self) -> Hash {
        use alloy_primitives::keccak256;
        let unsigned = crate::header::clique_rlp(self).unwrap_or_default();
        let mut bytes = unsigned;
        bytes.extend_from_slice(&self.extra_data[self.extra_data.len().saturating_sub(EXTRA_SEAL_LENGTH)..]);
        keccak256(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_prefix_matches_last_twenty_bytes() {
        let mut auth_bytes = [0u8; 32];
        auth_bytes[12..].copy_from_slice(&[0xAB; 20]);
        let auth = Address(auth_bytes);

        let mut signer_bytes = [0xCD; 32];
        signer_bytes[12..].copy_from_slice(&[0xAB; 20]);
        let signer = Address(signer_bytes);

        assert!(signer_matches(&signer, &auth));
    }

    #[test]
    fn full_form_requires_byte_exact_match() {
        let mut auth_bytes = [0x11; 32];
        auth_bytes[0] = 0x01; // non-zero prefix
        let auth = Address(auth_bytes);

        let mut signer_bytes = auth_bytes;
        signer_bytes[12..].copy_from_slice(&[0xAB; 20]);
        let signer = Address(signer_bytes);

        assert!(!signer_matches(&signer, &auth));
        assert!(signer_matches(&auth, &auth));
    }
}
