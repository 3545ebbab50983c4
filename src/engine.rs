//! The consensus engine façade: header verification, sealing, and vote
//! management (spec §4.5-§4.10, §6).
//!
//! Grounded on the teacher's `consensus::PoaConsensus` for the overall shape
//! of a façade wrapping a chain spec (`verifyHeader`/cascading checks come
//! from `fastClique.go`'s `verifyHeader`/`verifyCascadingFields`), and on
//! `rpc/clique.rs`'s `CliqueRpc` for the `propose`/`discard`/`proposals`
//! vote-management surface, folded directly onto the engine per spec §6's
//! `APIs` (here a plain method set rather than a `jsonrpsee` transport, since
//! RPC transport is out of scope).

use crate::cache::LruCache;
use crate::config::{ChainHeaderReader, Clock, KeyValueStore, SignerFn};
use crate::constants::{
    CHECKPOINT_INTERVAL, EXTRA_SEAL_LENGTH, EXTRA_VANITY_LENGTH, FULL_IMMUTABILITY_THRESHOLD,
    FUTURE_TIME_SLACK_MS, GAS_LIMIT_BOUND_DIVISOR, IN_MEMORY_SIGNATURES, IN_MEMORY_SNAPSHOTS,
    MAX_BLOCKS_OOT, MAX_GAS_LIMIT, MIN_GAS_LIMIT, SIGNER_ENTRY_SIZE,
};
use crate::errors::PoaConsensusError;
use crate::header::seal_hash;
use crate::recovery::{ecrecover, SignerCache};
use crate::scheduler::{
    self, calc_difficulty, check_authorized, compute_delay, difficulty_matches_turn,
    recent_block_count, SealRequest,
};
use crate::snapshot::Snapshot;
use crate::types::{Address, Hash, Header, NONCE_AUTH_VOTE, NONCE_DROP_VOTE};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// The POA consensus engine.
///
/// `signer`/`sign_fn`/`proposals` are read far more often than written, so
/// each sits behind its own `RwLock` rather than one coarse lock guarding the
/// whole engine (spec §5 "read-many/write-rarely").
pub struct Engine {
    db: Arc<dyn KeyValueStore>,
    snapshots: Mutex<LruCache<Hash, Snapshot>>,
    signatures: SignerCache,
    local_signer: RwLock<Option<Address>>,
    sign_fn: RwLock<Option<Arc<dyn SignerFn>>>,
    proposals: RwLock<HashMap<Address, bool>>,
    rng: Mutex<StdRng>,
}

impl Engine {
    pub fn new(db: Arc<dyn KeyValueStore>) -> Self {
        Self {
            db,
            snapshots: Mutex::new(LruCache::new(IN_MEMORY_SNAPSHOTS)),
            signatures: SignerCache::new(IN_MEMORY_SIGNATURES),
            local_signer: RwLock::new(None),
            sign_fn: RwLock::new(None),
            proposals: RwLock::new(HashMap::new()),
            rng: Mutex::new(StdRng::seed_from_u64(rand::random::<u64>())),
        }
    }

    /// Construct an engine whose out-of-turn RNG is seeded deterministically,
    /// for reproducible tests (spec §9 "oot_wait RNG must be seedable").
    pub fn with_seed(db: Arc<dyn KeyValueStore>, seed: u64) -> Self {
        let engine = Self::new(db);
        *engine.rng.lock().expect("rng poisoned") = StdRng::seed_from_u64(seed);
        engine
    }

    /// `Authorize(signer, sign_fn)` (spec §6): install the local signing identity.
    pub fn authorize(&self, signer: Address, sign_fn: Arc<dyn SignerFn>) {
        *self.local_signer.write().expect("lock poisoned") = Some(signer);
        *self.sign_fn.write().expect("lock poisoned") = Some(sign_fn);
    }

    fn local_signer(&self) -> Option<Address> {
        *self.local_signer.read().expect("lock poisoned")
    }

    /// `Close()` (spec §6): a no-op, the engine owns no background resources
    /// beyond spawned seal tasks, which self-terminate.
    pub fn close(&self) {}

    // ── Vote management (propose/discard/proposals), folded in from the
    // teacher's RPC façade minus the transport layer. ──────────────────

    pub fn propose(&self, candidate: Address, authorize: bool) {
        self.proposals.write().expect("lock poisoned").insert(candidate, authorize);
    }

    pub fn discard(&self, candidate: &Address) {
        self.proposals.write().expect("lock poisoned").remove(candidate);
    }

    pub fn proposals(&self) -> HashMap<Address, bool> {
        self.proposals.read().expect("lock poisoned").clone()
    }

    // ── Snapshot lookup driver (spec §4.11) ─────────────────────────────

    /// Walk backward from `(number, hash)` collecting headers until a cached
    /// or persisted snapshot is found (or a construction point is reached),
    /// then apply forward. Persists at `CHECKPOINT_INTERVAL` boundaries.
    pub fn snapshot(
        &self,
        chain: &dyn ChainHeaderReader,
        number: u64,
        hash: Hash,
        genesis_signers: &[Address],
    ) -> Result<Snapshot, PoaConsensusError> {
        let mut headers = Vec::new();
        let mut walk_number = number;
        let mut walk_hash = hash;

        let snap = loop {
            if let Some(found) = self.snapshots.lock().expect("lock poisoned").get(&walk_hash) {
                break found.clone();
            }

            if walk_number % CHECKPOINT_INTERVAL == 0 {
                if let Ok(found) = Snapshot::load(self.db.as_ref(), &walk_hash) {
                    break found;
                }
            }

            let epoch = chain.config().epoch();
            let trust_checkpoint = walk_number == 0
                || (walk_number % epoch == 0
                    && (headers.len() as u64 > FULL_IMMUTABILITY_THRESHOLD
                        || chain.get_header_by_number(walk_number - 1).is_none()));
            if trust_checkpoint {
                let checkpoint = chain
                    .get_header_by_number(walk_number)
                    .ok_or(PoaConsensusError::UnknownAncestor)?;
                let config = chain.config();
                let signers = if walk_number == 0 {
                    genesis_signers.to_vec()
                } else {
                    decode_checkpoint_signers(&checkpoint)?
                };
                break Snapshot::new(config.epoch(), config.period_ms(), walk_number, checkpoint.hash(), signers);
            }

            let header = chain
                .get_header(&walk_hash, walk_number)
                .ok_or(PoaConsensusError::UnknownAncestor)?;
            let parent_hash = header.parent_hash;
            headers.push(header);
            walk_number -= 1;
            walk_hash = parent_hash;
        };

        headers.reverse();
        let result = snap.apply(&headers, &self.signatures)?;

        self.snapshots.lock().expect("lock poisoned").insert(result.hash, result.clone());
        if result.number % CHECKPOINT_INTERVAL == 0 && !headers.is_empty() {
            result.store(self.db.as_ref())?;
        }

        Ok(result)
    }

    // ── Header verification (spec §4.5) ─────────────────────────────────

    pub fn verify_header(
        &self,
        chain: &dyn ChainHeaderReader,
        header: &Header,
        genesis_signers: &[Address],
        clock: &dyn Clock,
    ) -> Result<(), PoaConsensusError> {
        if header.number == 0 {
            return Err(PoaConsensusError::UnknownBlock);
        }
        if header.timestamp > clock.now_ms() + FUTURE_TIME_SLACK_MS {
            return Err(PoaConsensusError::FutureBlock);
        }

        let is_checkpoint = header.number % chain.config().epoch() == 0;
        if !is_checkpoint {
            if header.nonce != NONCE_AUTH_VOTE && header.nonce != NONCE_DROP_VOTE {
                return Err(PoaConsensusError::InvalidVote);
            }
        } else if header.nonce != NONCE_DROP_VOTE {
            return Err(PoaConsensusError::InvalidCheckpointVote);
        }

        let min_extra = EXTRA_VANITY_LENGTH + EXTRA_SEAL_LENGTH;
        if header.extra_data.len() < EXTRA_VANITY_LENGTH {
            return Err(PoaConsensusError::MissingVanity);
        }
        if header.extra_data.len() < min_extra {
            return Err(PoaConsensusError::MissingSignature);
        }
        let signer_bytes_len = header.extra_data.len() - min_extra;
        if !is_checkpoint && signer_bytes_len != 0 {
            return Err(PoaConsensusError::ExtraSigners);
        }
        if is_checkpoint {
            if signer_bytes_len % SIGNER_ENTRY_SIZE != 0 {
                return Err(PoaConsensusError::InvalidCheckpointSigners);
            }
        }

        if header.mix_hash != Hash::ZERO {
            return Err(PoaConsensusError::InvalidMixDigest);
        }
        if header.ommers_hash != Header::empty_ommers_hash() {
            return Err(PoaConsensusError::InvalidOmmerHash);
        }
        if header.difficulty != alloy_primitives::U256::from(1u64)
            && header.difficulty != alloy_primitives::U256::from(2u64)
        {
            return Err(PoaConsensusError::InvalidDifficulty);
        }
        if header.gas_limit > MAX_GAS_LIMIT {
            return Err(PoaConsensusError::InvalidGasLimit(header.gas_limit));
        }
        if header.has_post_merge_fields() {
            return Err(PoaConsensusError::UnsupportedFork);
        }

        self.verify_cascading_fields(chain, header)?;

        let snapshot = self.snapshot(chain, header.number - 1, header.parent_hash, genesis_signers)?;
        if is_checkpoint {
            let decoded = decode_checkpoint_signers(header)?;
            let mut expected = snapshot.signers.clone();
            expected.sort();
            let mut got = decoded.clone();
            got.sort();
            if expected != got {
                return Err(PoaConsensusError::MismatchingCheckpointSigners);
            }
        }

        self.verify_seal(chain, header, &snapshot)?;
        Ok(())
    }

    fn verify_cascading_fields(
        &self,
        chain: &dyn ChainHeaderReader,
        header: &Header,
    ) -> Result<(), PoaConsensusError> {
        let parent = chain
            .get_header(&header.parent_hash, header.number - 1)
            .ok_or(PoaConsensusError::UnknownAncestor)?;

        if parent.number != header.number - 1 || parent.hash() != header.parent_hash {
            return Err(PoaConsensusError::UnknownAncestor);
        }
        if parent.timestamp + chain.config().period_ms() > header.timestamp {
            return Err(PoaConsensusError::InvalidTimestamp);
        }
        if header.gas_used > header.gas_limit {
            return Err(PoaConsensusError::GasUsedExceedsLimit {
                used: header.gas_used,
                limit: header.gas_limit,
            });
        }

        let is_london = chain.config().is_london(header.number);
        let parent_is_london = chain.config().is_london(parent.number);
        match (is_london, header.base_fee_per_gas) {
            (true, None) => return Err(PoaConsensusError::InvalidBaseFee),
            (false, Some(_)) => return Err(PoaConsensusError::InvalidBaseFee),
            _ => {}
        }
        let _ = parent_is_london;

        if !is_london {
            let diff = (header.gas_limit as i128 - parent.gas_limit as i128).abs();
            if diff >= (parent.gas_limit / GAS_LIMIT_BOUND_DIVISOR) as i128 {
                return Err(PoaConsensusError::InvalidGasLimit(header.gas_limit));
            }
            if header.gas_limit < MIN_GAS_LIMIT {
                return Err(PoaConsensusError::InvalidGasLimit(header.gas_limit));
            }
        }

        if chain.config().is_shanghai(header.number, header.timestamp)
            || chain.config().is_cancun(header.number, header.timestamp)
        {
            return Err(PoaConsensusError::UnsupportedFork);
        }

        Ok(())
    }

    /// Batch verification over a run of headers, in order, abortable via
    /// `cancel` (spec §5 "producer task yields results in input order").
    pub async fn verify_headers(
        &self,
        chain: Arc<dyn ChainHeaderReader>,
        headers: Vec<Header>,
        genesis_signers: Vec<Address>,
        clock: Arc<dyn Clock>,
        mut cancel: oneshot::Receiver<()>,
    ) -> Vec<Result<(), PoaConsensusError>> {
        let mut results = Vec::with_capacity(headers.len());
        for header in &headers {
            if cancel.try_recv().is_ok() {
                break;
            }
            results.push(self.verify_header(chain.as_ref(), header, &genesis_signers, clock.as_ref()));
        }
        results
    }

    /// `VerifyUncles` (spec §6): this consensus never has uncles.
    pub fn verify_uncles(&self) -> Result<(), PoaConsensusError> {
        Err(PoaConsensusError::UnclesNotAllowed)
    }

    // ── Seal verification (spec §4.6) ───────────────────────────────────

    fn verify_seal(
        &self,
        _chain: &dyn ChainHeaderReader,
        header: &Header,
        snapshot: &Snapshot,
    ) -> Result<(), PoaConsensusError> {
        let signer = ecrecover(header, &self.signatures)?;
        check_authorized(snapshot, &signer)?;

        let in_turn = snapshot.inturn(header.number, &signer);
        if !in_turn {
            let recent = recent_block_count(snapshot, &signer, header.number);
            if recent >= MAX_BLOCKS_OOT as usize {
                return Err(PoaConsensusError::RecentlySigned { signer });
            }
        }

        if !difficulty_matches_turn(header.difficulty.to::<u64>(), in_turn) {
            return Err(PoaConsensusError::WrongDifficulty);
        }

        Ok(())
    }

    // ── Prepare (spec §4.7) ──────────────────────────────────────────────

    pub fn prepare(
        &self,
        chain: &dyn ChainHeaderReader,
        parent: &Header,
        genesis_signers: &[Address],
        clock: &dyn Clock,
    ) -> Result<Header, PoaConsensusError> {
        let local = self.local_signer().ok_or(PoaConsensusError::UnauthorizedSigner {
            signer: Address::ZERO,
        })?;

        let number = parent.number + 1;
        let snapshot = self.snapshot(chain, parent.number, parent.hash(), genesis_signers)?;

        let mut coinbase = Address::ZERO;
        let mut nonce = NONCE_DROP_VOTE;

        let is_checkpoint = number % chain.config().epoch() == 0;
        if !is_checkpoint {
            let proposals = self.proposals();
            let mut candidates: Vec<(Address, bool)> = proposals
                .into_iter()
                .filter(|(candidate, authorize)| snapshot.valid_vote(candidate, *authorize))
                .collect();
            if !candidates.is_empty() {
                let idx = {
                    let mut rng = self.rng.lock().expect("lock poisoned");
                    rand::Rng::gen_range(&mut *rng, 0..candidates.len())
                };
                let (candidate, authorize) = candidates.remove(idx);
                coinbase = candidate;
                nonce = if authorize { NONCE_AUTH_VOTE } else { NONCE_DROP_VOTE };
            }
        }

        let difficulty = calc_difficulty(&snapshot, &local);

        let mut extra = Vec::with_capacity(EXTRA_VANITY_LENGTH + EXTRA_SEAL_LENGTH);
        extra.extend_from_slice(&[0u8; EXTRA_VANITY_LENGTH]);
        if is_checkpoint {
            let mut ordered = snapshot.signers.clone();
            ordered.sort();
            for signer in &ordered {
                extra.extend_from_slice(signer.as_bytes());
            }
        }
        extra.extend_from_slice(&[0u8; EXTRA_SEAL_LENGTH]);

        let timestamp = (parent.timestamp + chain.config().period_ms()).max(clock.now_ms());

        Ok(Header {
            parent_hash: parent.hash(),
            ommers_hash: Header::empty_ommers_hash(),
            coinbase,
            state_root: Hash::ZERO,
            transactions_root: Hash::ZERO,
            receipts_root: Hash::ZERO,
            logs_bloom: Box::new([0u8; 256]),
            difficulty: alloy_primitives::U256::from(difficulty),
            number,
            gas_limit: parent.gas_limit,
            gas_used: 0,
            timestamp,
            extra_data: extra.into(),
            mix_hash: Hash::ZERO,
            nonce,
            base_fee_per_gas: parent.base_fee_per_gas,
            withdrawals_root: None,
            blob_gas_used: None,
            excess_blob_gas: None,
            parent_beacon_block_root: None,
        })
    }

    // ── Finalize (spec §4.10) ────────────────────────────────────────────

    /// `Finalize()` (spec §4.10): no block rewards under this scheme.
    pub fn finalize(&self, _header: &Header) {}

    /// `FinalizeAndAssemble()` (spec §4.10): refuses withdrawals.
    pub fn finalize_and_assemble(
        &self,
        mut header: Header,
        state_root: Hash,
        withdrawals_present: bool,
    ) -> Result<Header, PoaConsensusError> {
        if withdrawals_present {
            return Err(PoaConsensusError::WithdrawalsNotSupported);
        }
        header.state_root = state_root;
        Ok(header)
    }

    // ── Difficulty (spec §4.9) ───────────────────────────────────────────

    pub fn calc_difficulty(
        &self,
        chain: &dyn ChainHeaderReader,
        parent: &Header,
        genesis_signers: &[Address],
    ) -> Result<u64, PoaConsensusError> {
        let local = self.local_signer().ok_or(PoaConsensusError::UnauthorizedSigner {
            signer: Address::ZERO,
        })?;
        let snapshot = self.snapshot(chain, parent.number, parent.hash(), genesis_signers)?;
        Ok(calc_difficulty(&snapshot, &local))
    }

    // ── Seal (spec §4.8) ─────────────────────────────────────────────────

    /// Spawn the scheduler's cancellable seal task for `header`, whose parent
    /// is already canonical. Configuration errors (no local signer, local
    /// signer unauthorized, out-of-turn budget exhausted) return
    /// synchronously; runtime failures inside the spawned task are logged and
    /// silently swallowed (spec §7 "sealing ... consumes runtime errors via
    /// logging and silent abort").
    pub fn seal(
        &self,
        chain: Arc<dyn ChainHeaderReader>,
        parent: &Header,
        header: Header,
        genesis_signers: &[Address],
        clock: Arc<dyn Clock>,
        results: mpsc::Sender<Header>,
        cancel: oneshot::Receiver<()>,
    ) -> Result<(), PoaConsensusError> {
        if parent.number == 0 && header.number == 0 {
            return Err(PoaConsensusError::UnknownBlock);
        }

        let local = self.local_signer().ok_or(PoaConsensusError::UnauthorizedSigner {
            signer: Address::ZERO,
        })?;
        let sign_fn = self
            .sign_fn
            .read()
            .expect("lock poisoned")
            .clone()
            .ok_or(PoaConsensusError::UnauthorizedSigner { signer: local })?;

        let snapshot = self.snapshot(chain.as_ref(), parent.number, parent.hash(), genesis_signers)?;
        check_authorized(&snapshot, &local)?;

        let in_turn = snapshot.inturn(header.number, &local);
        if !in_turn {
            let recent = recent_block_count(&snapshot, &local, header.number);
            if recent >= MAX_BLOCKS_OOT as usize {
                warn!(signer = %local, "out-of-turn budget exhausted, declining to seal");
                return Err(PoaConsensusError::RecentlySigned { signer: local });
            }
        }

        let delay = {
            let mut rng = self.rng.lock().expect("lock poisoned");
            compute_delay(
                in_turn,
                chain.config().period_ms(),
                parent.timestamp,
                clock.now_ms(),
                &mut *rng,
            )
        };

        debug!(number = header.number, ?delay, in_turn, "scheduling seal");
        scheduler::spawn_seal(
            SealRequest { header, snapshot, signer: local, delay, in_turn },
            chain,
            sign_fn,
            clock,
            results,
            cancel,
        );
        Ok(())
    }

    /// `SealHash(header)` (spec §6).
    pub fn seal_hash(&self, header: &Header) -> Result<Hash, PoaConsensusError> {
        seal_hash(header)
    }
}

fn decode_checkpoint_signers(header: &Header) -> Result<Vec<Address>, PoaConsensusError> {
    let body = &header.extra_data
        [EXTRA_VANITY_LENGTH..header.extra_data.len() - EXTRA_SEAL_LENGTH];
    if body.len() % SIGNER_ENTRY_SIZE != 0 {
        return Err(PoaConsensusError::InvalidCheckpointSigners);
    }
    Ok(body
        .chunks(SIGNER_ENTRY_SIZE)
        .map(|entry| Address::from_slice(&entry[..32]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::{MemoryStore, StaticChainConfig};
    use std::collections::HashMap as StdHashMap;

    struct FakeChain {
        headers_by_hash: StdHashMap<Hash, Header>,
        headers_by_number: StdHashMap<u64, Header>,
        config: StaticChainConfig,
    }

    impl ChainHeaderReader for FakeChain {
        fn current_header(&self) -> Option<Header> {
            self.headers_by_number.values().max_by_key(|h| h.number).cloned()
        }
        fn get_header(&self, hash: &Hash, _number: u64) -> Option<Header> {
            self.headers_by_hash.get(hash).cloned()
        }
        fn get_header_by_number(&self, number: u64) -> Option<Header> {
            self.headers_by_number.get(&number).cloned()
        }
        fn config(&self) -> &dyn crate::config::ChainConfig {
            &self.config
        }
    }

    #[test]
    fn decode_checkpoint_signers_roundtrips_sorted_entries() {
        let mut extra = vec![0u8; EXTRA_VANITY_LENGTH];
        let a = Address::from_slice(&[1u8; 32]);
        let b = Address::from_slice(&[2u8; 32]);
        extra.extend_from_slice(a.as_bytes());
        extra.extend_from_slice(&[0u8; 2656]);
        extra.extend_from_slice(b.as_bytes());
        extra.extend_from_slice(&[0u8; 2656]);
        extra.extend_from_slice(&[0u8; EXTRA_SEAL_LENGTH]);

        let header = Header { extra_data: extra.into(), ..Header::default() };
        let decoded = decode_checkpoint_signers(&header).unwrap();
        assert_eq!(decoded, vec![a, b]);
    }

    #[test]
    fn verify_uncles_always_rejected() {
        let engine = Engine::new(Arc::new(MemoryStore::default()));
        assert_eq!(engine.verify_uncles(), Err(PoaConsensusError::UnclesNotAllowed));
    }

    #[test]
    fn finalize_and_assemble_refuses_withdrawals() {
        let engine = Engine::new(Arc::new(MemoryStore::default()));
        let header = Header::default();
        let err = engine.finalize_and_assemble(header, Hash::ZERO, true).unwrap_err();
        assert_eq!(err, PoaConsensusError::WithdrawalsNotSupported);
    }

    #[test]
    fn propose_and_discard_round_trip() {
        let engine = Engine::new(Arc::new(MemoryStore::default()));
        let candidate = Address::from_slice(&[7u8; 32]);
        engine.propose(candidate, true);
        assert_eq!(engine.proposals().get(&candidate), Some(&true));
        engine.discard(&candidate);
        assert!(engine.proposals().get(&candidate).is_none());
    }

    #[test]
    fn verify_cascading_fields_rejects_gas_limit_jump_pre_london() {
        let engine = Engine::new(Arc::new(MemoryStore::default()));
        let config = StaticChainConfig { period_ms: 1000, epoch: 30_000 };
        let parent = Header { number: 1, gas_limit: 10_000_000, timestamp: 1000, ..Header::default() };
        let parent_hash = parent.hash();
        let header = Header {
            number: 2,
            parent_hash,
            gas_limit: parent.gas_limit + parent.gas_limit / 1024 + 1,
            timestamp: 2000,
            ..Header::default()
        };
        let chain = FakeChain {
            headers_by_hash: StdHashMap::from([(parent_hash, parent.clone())]),
            headers_by_number: StdHashMap::from([(1, parent)]),
            config,
        };
        let err = engine.verify_cascading_fields(&chain, &header).unwrap_err();
        assert_eq!(err, PoaConsensusError::InvalidGasLimit(header.gas_limit));
    }

    #[test]
    fn verify_cascading_fields_allows_gas_limit_within_bound_divisor() {
        let engine = Engine::new(Arc::new(MemoryStore::default()));
        let config = StaticChainConfig { period_ms: 1000, epoch: 30_000 };
        let parent = Header { number: 1, gas_limit: 10_000_000, timestamp: 1000, ..Header::default() };
        let parent_hash = parent.hash();
        let header = Header {
            number: 2,
            parent_hash,
            gas_limit: parent.gas_limit + 100,
            timestamp: 2000,
            ..Header::default()
        };
        let chain = FakeChain {
            headers_by_hash: StdHashMap::from([(parent_hash, parent.clone())]),
            headers_by_number: StdHashMap::from([(1, parent)]),
            config,
        };
        assert!(engine.verify_cascading_fields(&chain, &header).is_ok());
    }

    #[test]
    fn snapshot_trusts_checkpoint_when_parent_is_missing() {
        let engine = Engine::new(Arc::new(MemoryStore::default()));
        let config = StaticChainConfig { period_ms: 1000, epoch: 10 };
        let a = Address::from_slice(&[1u8; 32]);
        let b = Address::from_slice(&[2u8; 32]);

        let mut extra = vec![0u8; EXTRA_VANITY_LENGTH];
        let mut ordered = [a, b];
        ordered.sort();
        for signer in ordered {
            extra.extend_from_slice(signer.as_bytes());
            extra.extend_from_slice(&[0u8; 2656]);
        }
        extra.extend_from_slice(&[0u8; EXTRA_SEAL_LENGTH]);
        // Checkpoint block at number 10; its parent (number 9) is unknown to
        // the chain, so the checkpoint's own signer list must be trusted.
        let checkpoint = Header { number: 10, extra_data: extra.into(), ..Header::default() };
        let checkpoint_hash = checkpoint.hash();

        let chain = FakeChain {
            headers_by_hash: StdHashMap::from([(checkpoint_hash, checkpoint.clone())]),
            headers_by_number: StdHashMap::from([(10, checkpoint)]),
            config,
        };

        let snap = engine.snapshot(&chain, 10, checkpoint_hash, &[]).unwrap();
        assert_eq!(snap.signers, vec![a, b]);
        assert_eq!(snap.number, 10);
    }

    #[test]
    fn calc_difficulty_requires_authorized_local_signer() {
        let engine = Engine::new(Arc::new(MemoryStore::default()));
        let chain = FakeChain {
            headers_by_hash: StdHashMap::new(),
            headers_by_number: StdHashMap::new(),
            config: StaticChainConfig { period_ms: 1000, epoch: 30_000 },
        };
        let parent = Header::default();
        let err = engine.calc_difficulty(&chain, &parent, &[]).unwrap_err();
        assert_eq!(err, PoaConsensusError::UnauthorizedSigner { signer: Address::ZERO });
    }
}
