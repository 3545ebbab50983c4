//! Consensus error taxonomy (spec §7).
//!
//! Grounded on the teacher's `consensus::errors::PoaConsensusError` (a
//! `thiserror` enum of distinct, named failure kinds) and on the error
//! variables declared in `fastClique.go`, which this taxonomy is a
//! line-for-line superset of.

use crate::types::Address;
use thiserror::Error;

/// Every distinct way a header, seal, or vote can fail consensus validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PoaConsensusError {
    #[error("unknown block")]
    UnknownBlock,

    #[error("timestamp too far in the future")]
    FutureBlock,

    #[error("vote nonce not 0x00..0 or 0xff..f")]
    InvalidVote,

    #[error("vote nonce in checkpoint block non-zero")]
    InvalidCheckpointVote,

    #[error("beneficiary in checkpoint block non-zero")]
    InvalidCheckpointBeneficiary,

    #[error("extra-data 32 byte vanity prefix missing")]
    MissingVanity,

    #[error("extra-data 65 byte signature suffix missing")]
    MissingSignature,

    #[error("non-checkpoint block contains extra signer list")]
    ExtraSigners,

    #[error("invalid signer list on checkpoint block")]
    InvalidCheckpointSigners,

    #[error("mismatching signer list on checkpoint block")]
    MismatchingCheckpointSigners,

    #[error("extra-data has incorrect MKS region size")]
    InvalidMksSize,

    #[error("non-zero mix digest")]
    InvalidMixDigest,

    #[error("non-empty uncle hash")]
    InvalidOmmerHash,

    #[error("invalid difficulty: must be 1 or 2")]
    InvalidDifficulty,

    #[error("wrong difficulty for signer's turn")]
    WrongDifficulty,

    #[error("invalid timestamp: too close to parent")]
    InvalidTimestamp,

    #[error("invalid gas limit: {0}")]
    InvalidGasLimit(u64),

    #[error("gas used {used} exceeds gas limit {limit}")]
    GasUsedExceedsLimit { used: u64, limit: u64 },

    #[error("base fee present before London / absent after it")]
    InvalidBaseFee,

    #[error("header carries a field reserved for a later fork")]
    UnsupportedFork,

    #[error("invalid voting chain: non-contiguous or out-of-range headers")]
    InvalidVotingChain,

    #[error("unknown ancestor")]
    UnknownAncestor,

    #[error("signer {signer} is not authorized")]
    UnauthorizedSigner { signer: Address },

    #[error("signer {signer} signed too recently")]
    RecentlySigned { signer: Address },

    #[error("uncles are not allowed")]
    UnclesNotAllowed,

    #[error("withdrawals are not supported")]
    WithdrawalsNotSupported,

    #[error("key-value store error: {0}")]
    Storage(String),

    #[error("snapshot not found for block {0}")]
    SnapshotNotFound(u64),
}
