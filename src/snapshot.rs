//! The authorization snapshot: signer set, vote tally, recent-signer window
//! (spec §3, §4.4, §4.11).
//!
//! The rolling-window and in-turn mechanics are grounded on `fastClique.go`'s
//! `snapshot`/`newSnapshot` construction-from-checkpoint path; the vote/tally
//! fold is grounded on `yiranlandtour-ethereum-rust`'s `process_vote`
//! (majority threshold, self-purge on removal) and on the
//! paritytech clique-variant `Snapshot::apply`/`rotate_recent_signers`
//! (functional apply, recents as a bounded deque).

use crate::config::KeyValueStore;
use crate::errors::PoaConsensusError;
use crate::recovery::{ecrecover, is_authorized, SignerCache};
use crate::types::{Address, Hash, Header, NONCE_AUTH_VOTE, NONCE_DROP_VOTE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single pending vote: `voter` proposes to authorize/deauthorize `candidate`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub signer: Address,
    pub block: u64,
    pub candidate: Address,
    pub authorize: bool,
}

/// The aggregate tally for one candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub authorize: bool,
    pub votes: usize,
}

/// Authorization state at a specific block (spec §3).
///
/// Snapshots are values: [`Snapshot::apply`] returns a new snapshot rather
/// than mutating `self`, per the "no shared mutable `recents`" resource
/// model in spec §5.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub epoch: u64,
    pub period_ms: u64,
    pub number: u64,
    pub hash: Hash,
    /// Signers sorted lexicographically by full address bytes.
    pub signers: Vec<Address>,
    /// Block number -> signer, covering the rolling recently-signed window.
    pub recents: HashMap<u64, Address>,
    pub votes: Vec<Vote>,
    pub tally: HashMap<Address, Tally>,
}

fn sorted(mut signers: Vec<Address>) -> Vec<Address> {
    signers.sort();
    signers.dedup();
    signers
}

fn recents_limit(signer_count: usize) -> u64 {
    (signer_count as u64) / 2 + 1
}

impl Snapshot {
    /// Seed a fresh snapshot, e.g. at genesis or from a trusted checkpoint
    /// (spec §4.4 "Construction from scratch").
    pub fn new(epoch: u64, period_ms: u64, number: u64, hash: Hash, signers: Vec<Address>) -> Self {
        Self {
            epoch,
            period_ms,
            number,
            hash,
            signers: sorted(signers),
            recents: HashMap::new(),
            votes: Vec::new(),
            tally: HashMap::new(),
        }
    }

    /// `inturn(number, signer)` (spec §4.4, glossary "In-turn signer").
    pub fn inturn(&self, number: u64, signer: &Address) -> bool {
        match self.signers.iter().position(|s| s == signer) {
            Some(pos) => (number % self.signers.len() as u64) == pos as u64,
            None => false,
        }
    }

    /// Whether proposing `(candidate, authorize)` would be an actionable
    /// vote against this snapshot: adding a non-member, or dropping a member.
    pub fn valid_vote(&self, candidate: &Address, authorize: bool) -> bool {
        let is_signer = self.signers.contains(candidate);
        (authorize && !is_signer) || (!authorize && is_signer)
    }

    fn remove_prior_vote(&mut self, voter: &Address, candidate: &Address) {
        if let Some(pos) = self
            .votes
            .iter()
            .position(|v| &v.signer == voter && &v.candidate == candidate)
        {
            let removed = self.votes.remove(pos);
            self.decrement_tally(&removed.candidate);
        }
    }

    fn decrement_tally(&mut self, candidate: &Address) {
        if let Some(t) = self.tally.get_mut(candidate) {
            if t.votes <= 1 {
                self.tally.remove(candidate);
            } else {
                t.votes -= 1;
            }
        }
    }

    fn purge_votes_about(&mut self, candidate: &Address) {
        let (by_candidate, remaining): (Vec<Vote>, Vec<Vote>) =
            self.votes.drain(..).partition(|v| &v.signer == candidate);
        self.votes = remaining;
        self.votes.retain(|v| &v.candidate != candidate);
        self.tally.remove(candidate);
        for vote in by_candidate {
            self.decrement_tally(&vote.candidate);
        }
    }

    /// Verify and fold a single header atop this snapshot, returning the
    /// recovered signer. Mutates `self` in place; callers needing a
    /// functional apply go through [`Snapshot::apply`].
    fn apply_one(&mut self, header: &Header, signer: Address) -> Result<(), PoaConsensusError> {
        if !is_authorized(&signer, &self.signers) {
            return Err(PoaConsensusError::UnauthorizedSigner { signer });
        }

        let number = header.number;
        let limit = recents_limit(self.signers.len());
        if number >= limit {
            self.recents.remove(&(number - limit));
        }
        if self.recents.values().any(|s| *s == signer) {
            return Err(PoaConsensusError::RecentlySigned { signer });
        }
        self.recents.insert(number, signer);

        let is_checkpoint = number % self.epoch == 0;
        let candidate = header.coinbase;
        let is_vote_nonce =
            header.nonce == NONCE_AUTH_VOTE || header.nonce == NONCE_DROP_VOTE;

        if is_vote_nonce && candidate != Address::ZERO {
            let authorize = header.nonce == NONCE_AUTH_VOTE;

            self.remove_prior_vote(&signer, &candidate);

            if self.valid_vote(&candidate, authorize) {
                self.votes.push(Vote { signer, block: number, candidate, authorize });
                let entry = self.tally.entry(candidate).or_insert(Tally { authorize, votes: 0 });
                entry.authorize = authorize;
                entry.votes += 1;

                if entry.votes > self.signers.len() / 2 {
                    if authorize {
                        self.signers = sorted({
                            let mut s = self.signers.clone();
                            s.push(candidate);
                            s
                        });
                    } else {
                        self.signers.retain(|s| s != &candidate);
                        self.purge_votes_about(&candidate);

                        // Re-establish the recents bound under the new, smaller limit.
                        let new_limit = recents_limit(self.signers.len());
                        if new_limit < limit {
                            self.recents.retain(|blk, _| *blk + new_limit > number);
                        }
                    }
                    self.tally.remove(&candidate);
                    self.votes.retain(|v| v.candidate != candidate);
                }
            }
        }

        if number % self.epoch == 0 {
            self.votes.clear();
            self.tally.clear();
        }

        let _ = is_checkpoint;
        Ok(())
    }

    /// Apply a contiguous, ascending sequence of headers atop this snapshot,
    /// returning the resulting snapshot without mutating `self` (spec §4.4,
    /// §5 "snapshots are functional").
    pub fn apply(
        &self,
        headers: &[Header],
        signatures: &SignerCache,
    ) -> Result<Snapshot, PoaConsensusError> {
        if headers.is_empty() {
            return Ok(self.clone());
        }
        for pair in headers.windows(2) {
            if pair[1].number != pair[0].number + 1 {
                return Err(PoaConsensusError::InvalidVotingChain);
            }
        }
        if headers[0].number != self.number + 1 {
            return Err(PoaConsensusError::InvalidVotingChain);
        }

        let mut next = self.clone();
        for header in headers {
            let signer = ecrecover(header, signatures)?;
            next.apply_one(header, signer)?;
        }
        next.number = headers.last().expect("checked non-empty").number;
        next.hash = headers.last().expect("checked non-empty").hash();
        Ok(next)
    }

    /// Namespaced key-value store key for persisting this snapshot (spec §6).
    pub fn storage_key(hash: &Hash) -> Vec<u8> {
        let mut key = b"clique-".to_vec();
        key.extend_from_slice(hash.as_slice());
        key
    }

    /// Persist this snapshot to the key-value store (spec §4.4 "Persistence").
    pub fn store(&self, db: &dyn KeyValueStore) -> Result<(), PoaConsensusError> {
        let bytes = serde_json::to_vec(self).map_err(|e| PoaConsensusError::Storage(e.to_string()))?;
        db.put(&Self::storage_key(&self.hash), &bytes).map_err(PoaConsensusError::Storage)
    }

    /// Load a previously persisted snapshot for the given block hash.
    pub fn load(db: &dyn KeyValueStore, hash: &Hash) -> Result<Snapshot, PoaConsensusError> {
        let bytes = db
            .get(&Self::storage_key(hash))
            .map_err(PoaConsensusError::Storage)?
            .ok_or_else(|| PoaConsensusError::Storage("snapshot not found".into()))?;
        serde_json::from_slice(&bytes).map_err(|e| PoaConsensusError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        let mut bytes = [0u8; 32];
        bytes[31] = byte;
        Address(bytes)
    }

    #[test]
    fn inturn_rotates_over_sorted_signers() {
        let signers = vec![addr(3), addr(1), addr(2)];
        let snap = Snapshot::new(30_000, 1000, 0, Hash::ZERO, signers);
        // sorted order is addr(1), addr(2), addr(3)
        assert!(snap.inturn(0, &addr(1)));
        assert!(snap.inturn(1, &addr(2)));
        assert!(snap.inturn(2, &addr(3)));
        assert!(snap.inturn(3, &addr(1)));
    }

    #[test]
    fn inturn_false_for_non_signer() {
        let snap = Snapshot::new(30_000, 1000, 0, Hash::ZERO, vec![addr(1)]);
        assert!(!snap.inturn(0, &addr(9)));
    }

    #[test]
    fn valid_vote_rules() {
        let snap = Snapshot::new(30_000, 1000, 0, Hash::ZERO, vec![addr(1), addr(2)]);
        assert!(snap.valid_vote(&addr(3), true)); // adding a non-member
        assert!(!snap.valid_vote(&addr(1), true)); // already a member
        assert!(snap.valid_vote(&addr(1), false)); // dropping a member
        assert!(!snap.valid_vote(&addr(3), false)); // not a member to begin with
    }

    #[test]
    fn vote_add_reaches_majority_and_purges() {
        let mut snap = Snapshot::new(30_000, 1000, 0, Hash::ZERO, vec![addr(1), addr(2), addr(3)]);
        let candidate = addr(4);

        // Two votes (threshold = 3/2 + 1 = 2) should add the candidate.
        let header_a = Header {
            number: 1,
            coinbase: candidate,
            nonce: NONCE_AUTH_VOTE,
            ..blank_header()
        };
        snap.apply_one(&header_a, addr(1)).unwrap();
        assert!(!snap.signers.contains(&candidate));

        let header_b = Header { number: 2, coinbase: candidate, nonce: NONCE_AUTH_VOTE, ..blank_header() };
        snap.apply_one(&header_b, addr(2)).unwrap();

        assert!(snap.signers.contains(&candidate));
        assert!(snap.tally.get(&candidate).is_none());
        assert!(!snap.votes.iter().any(|v| v.candidate == candidate));
    }

    #[test]
    fn removing_a_signer_decrements_tallies_the_signer_voted_on() {
        let mut snap =
            Snapshot::new(30_000, 1000, 0, Hash::ZERO, vec![addr(1), addr(2), addr(3), addr(4), addr(5)]);
        let other_candidate = addr(6);

        // addr(1) votes to add addr(6); only one vote cast so far (threshold = 3).
        let header_a = Header { number: 1, coinbase: other_candidate, nonce: NONCE_AUTH_VOTE, ..blank_header() };
        snap.apply_one(&header_a, addr(1)).unwrap();
        assert_eq!(snap.tally.get(&other_candidate), Some(&Tally { authorize: true, votes: 1 }));

        // Now drop addr(1) itself: three votes (2, 3, 5 voting on addr(4))... use addr(1) as the
        // drop candidate, with addr(2), addr(3), addr(4) reaching the majority.
        let drop_candidate = addr(1);
        let header_b = Header { number: 2, coinbase: drop_candidate, nonce: NONCE_DROP_VOTE, ..blank_header() };
        snap.apply_one(&header_b, addr(2)).unwrap();
        let header_c = Header { number: 3, coinbase: drop_candidate, nonce: NONCE_DROP_VOTE, ..blank_header() };
        snap.apply_one(&header_c, addr(3)).unwrap();
        let header_d = Header { number: 4, coinbase: drop_candidate, nonce: NONCE_DROP_VOTE, ..blank_header() };
        snap.apply_one(&header_d, addr(4)).unwrap();

        assert!(!snap.signers.contains(&drop_candidate));
        // addr(1)'s vote on addr(6) must be purged and its tally decremented, not left stale.
        assert!(!snap.votes.iter().any(|v| v.signer == drop_candidate));
        assert!(snap.tally.get(&other_candidate).is_none());
    }

    #[test]
    fn recently_signed_rejected_within_window() {
        let mut snap =
            Snapshot::new(30_000, 1000, 0, Hash::ZERO, vec![addr(1), addr(2), addr(3), addr(4), addr(5)]);
        let header = Header { number: 1, ..blank_header() };
        snap.apply_one(&header, addr(1)).unwrap();

        let next = Header { number: 2, ..blank_header() };
        let err = snap.apply_one(&next, addr(1)).unwrap_err();
        assert_eq!(err, PoaConsensusError::RecentlySigned { signer: addr(1) });
    }

    fn blank_header() -> Header {
        Header {
            parent_hash: Hash::ZERO,
            ommers_hash: Header::empty_ommers_hash(),
            coinbase: Address::ZERO,
            state_root: Hash::ZERO,
            transactions_root: Hash::ZERO,
            receipts_root: Hash::ZERO,
            logs_bloom: Box::new([0u8; 256]),
            difficulty: alloy_primitives::U256::from(1u64),
            number: 0,
            gas_limit: 30_000_000,
            gas_used: 0,
            timestamp: 0,
            extra_data: alloy_primitives::Bytes::new(),
            mix_hash: Hash::ZERO,
            nonce: NONCE_DROP_VOTE,
            base_fee_per_gas: None,
            withdrawals_root: None,
            blob_gas_used: None,
            excess_blob_gas: None,
            parent_beacon_block_root: None,
        }
    }
}
