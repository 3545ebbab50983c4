//! Signing-key management and block sealing.
//!
//! - [`manager::SignerManager`]: key storage, keyed by our derived [`crate::types::Address`].
//! - [`sealer::BlockSealer`]: seals a header and recovers a sealed header's signer.

pub mod dev;
pub mod errors;
pub mod manager;
pub mod sealer;

pub use errors::SignerError;
pub use manager::SignerManager;
pub use sealer::{BlockSealer, ManagerSignerFn};
