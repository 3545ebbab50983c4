//! Protocol constants. Values are normative -- see spec §6 "EXTERNAL INTERFACES".

/// Number of blocks after which to persist the vote snapshot to the key-value store.
pub const CHECKPOINT_INTERVAL: u64 = 2048;
/// Number of recent vote snapshots kept in the in-memory LRU.
pub const IN_MEMORY_SNAPSHOTS: usize = 128;
/// Number of recent block signatures kept in the in-memory LRU.
pub const IN_MEMORY_SIGNATURES: usize = 4096;

/// Fixed number of extra-data prefix bytes reserved for signer vanity.
pub const EXTRA_VANITY_LENGTH: usize = 32;
/// Fixed number of extra-data suffix bytes reserved for the seal signature.
pub const EXTRA_SEAL_LENGTH: usize = 65;
/// Per-signer Multi-Key-Signature region reserved in checkpoint extra-data.
pub const EXTRA_MKS_PER_SIGNER: usize = 2656;
/// Length of an [`crate::types::Address`] in bytes.
pub const ADDRESS_LENGTH: usize = 32;
/// Size of one signer entry (address ‖ MKS) in checkpoint extra-data.
pub const SIGNER_ENTRY_SIZE: usize = ADDRESS_LENGTH + EXTRA_MKS_PER_SIGNER;

/// Maximum number of blocks a validator may sign out-of-turn within the rolling window.
pub const MAX_BLOCKS_OOT: u64 = 3;

/// Default number of blocks between checkpoints, used when a `CliqueConfig`
/// is constructed with `epoch == 0`.
pub const DEFAULT_EPOCH: u64 = 10_000;

/// Chain reorgs deeper than this are considered impossible; once the
/// backward snapshot walk has collected more headers than this, or the
/// parent of a checkpoint block can no longer be found locally, the
/// checkpoint's own signer list is trusted outright.
pub const FULL_IMMUTABILITY_THRESHOLD: u64 = 90_000;

/// Block difficulty for in-turn signatures.
pub const DIFF_IN_TURN: u64 = 2;
/// Block difficulty for out-of-turn signatures.
pub const DIFF_NO_TURN: u64 = 1;

/// Lower bound of the low out-of-turn wait band, in milliseconds.
pub const OOT_MIN: u64 = 3500;
/// Width of the low out-of-turn wait band, in milliseconds.
pub const OOT_LOWER: u64 = 6000;
/// Width of the high out-of-turn wait band, in milliseconds.
pub const OOT_UPPER: u64 = 8500;
/// Upper bound of the high out-of-turn wait band, in milliseconds.
pub const OOT_MAX: u64 = 16500;

/// How far into the future (in milliseconds) a header's timestamp may sit
/// before it is rejected as `FutureBlock`.
pub const FUTURE_TIME_SLACK_MS: u64 = 500;

/// Maximum permitted gas limit (2^63 - 1), mirroring the protocol ceiling.
pub const MAX_GAS_LIMIT: u64 = i64::MAX as u64;

/// Floor below which a gas limit may never drop, pre-London.
pub const MIN_GAS_LIMIT: u64 = 5000;
/// Pre-London, a child's gas limit may diverge from its parent's by at most
/// `parent.gas_limit / GAS_LIMIT_BOUND_DIVISOR` per block.
pub const GAS_LIMIT_BOUND_DIVISOR: u64 = 1024;
