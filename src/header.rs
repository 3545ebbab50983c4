//! Header codec and seal hash (spec §4.1).
//!
//! Grounded on `fastClique.go`'s `encodeSigHeader`/`SealHash`/`CliqueRLP` and
//! the teacher's `consensus::PoaConsensus::seal_hash`, generalized to the
//! custom [`Header`] shape and to fail instead of panic on later-fork fields.

use crate::constants::EXTRA_SEAL_LENGTH;
use crate::errors::PoaConsensusError;
use crate::types::{Address, Hash, Header, Nonce};
use alloy_primitives::{keccak256, Bytes, U256};
use alloy_rlp::RlpEncodable;

/// Mirrors [`Header`] field-for-field but owns a truncated `extra_data`
/// (the trailing 65-byte seal stripped) and derives a pure list `Encodable`.
/// `Option` fields are only emitted when `Some`; by the time this is built
/// the caller has already confirmed none of the later-fork fields are set.
#[derive(RlpEncodable)]
#[rlp(trailing)]
struct SigHeader {
    parent_hash: Hash,
    ommers_hash: Hash,
    coinbase: Address,
    state_root: Hash,
    transactions_root: Hash,
    receipts_root: Hash,
    logs_bloom: Bytes,
    difficulty: U256,
    number: u64,
    gas_limit: u64,
    gas_used: u64,
    timestamp: u64,
    extra_data: Bytes,
    mix_hash: Hash,
    nonce: NonceWord,
    base_fee_per_gas: Option<u64>,
}

/// Newtype so the fixed-width nonce encodes as an RLP byte-string like the rest
/// of the header, rather than as a list of eight integers.
struct NonceWord(Nonce);

impl alloy_rlp::Encodable for NonceWord {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.0.as_slice().encode(out)
    }

    fn length(&self) -> usize {
        self.0.as_slice().length()
    }
}

fn sig_header_of(header: &Header) -> Result<SigHeader, PoaConsensusError> {
    if header.has_post_merge_fields() {
        return Err(PoaConsensusError::UnsupportedFork);
    }
    if header.extra_data.len() < EXTRA_SEAL_LENGTH {
        return Err(PoaConsensusError::MissingSignature);
    }
    let truncated = &header.extra_data[..header.extra_data.len() - EXTRA_SEAL_LENGTH];

    Ok(SigHeader {
        parent_hash: header.parent_hash,
        ommers_hash: header.ommers_hash,
        coinbase: header.coinbase,
        state_root: header.state_root,
        transactions_root: header.transactions_root,
        receipts_root: header.receipts_root,
        logs_bloom: Bytes::copy_from_slice(header.logs_bloom.as_slice()),
        difficulty: header.difficulty,
        number: header.number,
        gas_limit: header.gas_limit,
        gas_used: header.gas_used,
        timestamp: header.timestamp,
        extra_data: Bytes::copy_from_slice(truncated),
        mix_hash: header.mix_hash,
        nonce: NonceWord(header.nonce),
        base_fee_per_gas: header.base_fee_per_gas,
    })
}

/// Same encoding as [`seal_hash`] but returned as the raw byte string, used
/// as the signing payload (spec: `clique_rlp`).
pub fn clique_rlp(header: &Header) -> Result<Vec<u8>, PoaConsensusError> {
    let sig_header = sig_header_of(header)?;
    Ok(alloy_rlp::encode(&sig_header))
}

/// `seal_hash(header) -> hash` (spec §4.1).
///
/// Encodes the header in canonical order with the trailing 65-byte seal
/// dropped from `extra_data`, and returns the keccak-256 of that encoding.
/// Fails if the header carries any field reserved for a later fork, or if
/// `extra_data` is too short to contain a seal.
pub fn seal_hash(header: &Header) -> Result<Hash, PoaConsensusError> {
    Ok(keccak256(clique_rlp(header)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::EXTRA_VANITY_LENGTH;

    fn signed_header() -> Header {
        Header { extra_data: vec![0u8; EXTRA_VANITY_LENGTH + EXTRA_SEAL_LENGTH].into(), ..Header::default() }
    }

    #[test]
    fn seal_hash_ignores_the_trailing_seal() {
        let mut a = signed_header();
        let mut b = signed_header();
        let extra_a = a.extra_data.to_vec();
        let mut extra_b = extra_a.clone();
        *extra_b.last_mut().unwrap() ^= 0xFF;
        a.extra_data = extra_a.into();
        b.extra_data = extra_b.into();

        assert_eq!(seal_hash(&a).unwrap(), seal_hash(&b).unwrap());
    }

    #[test]
    fn seal_hash_changes_with_non_seal_fields() {
        let a = signed_header();
        let b = Header { number: 1, ..signed_header() };
        assert_ne!(seal_hash(&a).unwrap(), seal_hash(&b).unwrap());
    }

    #[test]
    fn rejects_headers_with_later_fork_fields() {
        let header = Header { withdrawals_root: Some(Hash::ZERO), ..signed_header() };
        assert_eq!(seal_hash(&header), Err(PoaConsensusError::UnsupportedFork));
    }

    #[test]
    fn rejects_extra_data_without_room_for_a_seal() {
        let header = Header { extra_data: vec![0u8; 10].into(), ..Header::default() };
        assert_eq!(seal_hash(&header), Err(PoaConsensusError::MissingSignature));
    }
}
