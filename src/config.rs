//! Configuration and the host-provided interfaces the engine depends on
//! (spec §6 "EXTERNAL INTERFACES").
//!
//! `CliqueConfig` is grounded on the teacher's `chainspec::config::PoaConfig`
//! (a plain `serde`-derived struct with period/epoch/signers and a
//! `Default` impl); the three host traits below replace what the teacher
//! gets for free from `reth_consensus`/`reth_storage_api` -- this crate
//! treats the block/state/trie/p2p layer purely as a named capability, per
//! spec §1 "Explicitly out of scope".

use crate::types::{Address, Hash, Header};
use serde::{Deserialize, Serialize};

/// Consensus engine configuration parameters (spec §6).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliqueConfig {
    /// Target inter-block interval, in milliseconds.
    pub period_ms: u64,
    /// Number of blocks between checkpoints; also the window after which
    /// pending votes are cleared. Defaults to `DEFAULT_EPOCH` if constructed
    /// as zero.
    pub epoch: u64,
}

impl CliqueConfig {
    pub fn new(period_ms: u64, epoch: u64) -> Self {
        let epoch = if epoch == 0 { crate::constants::DEFAULT_EPOCH } else { epoch };
        Self { period_ms, epoch }
    }
}

impl Default for CliqueConfig {
    fn default() -> Self {
        Self::new(1000, crate::constants::DEFAULT_EPOCH)
    }
}

/// Fork-activation flags the engine needs to reject later-fork headers
/// (spec §4.5 step 7).
pub trait ForkSchedule: Send + Sync {
    fn is_london(&self, block_number: u64) -> bool;
    fn is_shanghai(&self, block_number: u64, timestamp: u64) -> bool;
    fn is_cancun(&self, block_number: u64, timestamp: u64) -> bool;
    fn is_eip158(&self, block_number: u64) -> bool;
}

/// The chain-config surface `ChainHeaderReader::config()` exposes.
pub trait ChainConfig: ForkSchedule {
    fn period_ms(&self) -> u64;
    fn epoch(&self) -> u64;
}

/// Everything the engine needs to read from the header chain (spec §6).
///
/// Implemented by the host (block store, p2p-synced chain, or an in-memory
/// stub in tests); the engine never reaches past this trait into storage
/// internals.
pub trait ChainHeaderReader: Send + Sync {
    fn current_header(&self) -> Option<Header>;
    fn get_header(&self, hash: &Hash, number: u64) -> Option<Header>;
    fn get_header_by_number(&self, number: u64) -> Option<Header>;
    fn config(&self) -> &dyn ChainConfig;
}

/// Byte-keyed persistent store for snapshot checkpoints (spec §6).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, String>;
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), String>;
}

/// Given `(signer, message)`, produce a 65-byte secp256k1 signature, or fail.
///
/// Modeled as a trait object rather than a bare `Fn` so hosts can back it
/// with a hardware wallet, a remote signer, or (in tests / single-node
/// deployments) an in-process [`crate::signer::SignerManager`].
pub trait SignerFn: Send + Sync {
    fn sign(&self, signer: &Address, message: &[u8]) -> Result<[u8; 65], String>;
}

/// Wall clock providing millisecond epoch time (spec §6), abstracted so
/// tests can inject deterministic time.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// [`Clock`] backed by `std::time::SystemTime`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_millis() as u64
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// A deterministic clock for tests; advances only when told to.
    #[derive(Clone, Default)]
    pub struct FakeClock(Arc<Mutex<u64>>);

    impl FakeClock {
        pub fn new(start_ms: u64) -> Self {
            Self(Arc::new(Mutex::new(start_ms)))
        }

        pub fn advance(&self, ms: u64) {
            *self.0.lock().unwrap() += ms;
        }
    }

    impl Clock for FakeClock {
        fn now_ms(&self) -> u64 {
            *self.0.lock().unwrap()
        }
    }

    /// An in-memory [`KeyValueStore`] for tests.
    #[derive(Clone, Default)]
    pub struct MemoryStore(Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>);

    impl KeyValueStore for MemoryStore {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, String> {
            Ok(self.0.lock().unwrap().get(key).cloned())
        }

        fn put(&self, key: &[u8], value: &[u8]) -> Result<(), String> {
            self.0.lock().unwrap().insert(key.to_vec(), value.to_vec());
            Ok(())
        }
    }

    /// A chain config with every fork flag forced off, for exercising the
    /// pre-London/pre-Shanghai code paths.
    #[derive(Clone, Copy, Debug)]
    pub struct StaticChainConfig {
        pub period_ms: u64,
        pub epoch: u64,
    }

    impl ForkSchedule for StaticChainConfig {
        fn is_london(&self, _block_number: u64) -> bool {
            false
        }
        fn is_shanghai(&self, _block_number: u64, _timestamp: u64) -> bool {
            false
        }
        fn is_cancun(&self, _block_number: u64, _timestamp: u64) -> bool {
            false
        }
        fn is_eip158(&self, _block_number: u64) -> bool {
            true
        }
    }

    impl ChainConfig for StaticChainConfig {
        fn period_ms(&self) -> u64 {
            self.period_ms
        }
        fn epoch(&self) -> u64 {
            self.epoch
        }
    }
}
