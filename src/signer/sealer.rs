use super::errors::SignerError;
use super::manager::SignerManager;
use crate::config::SignerFn;
use crate::constants::EXTRA_SEAL_LENGTH;
use crate::header::seal_hash;
use crate::recovery::{ecrecover, SignerCache};
use crate::types::{Address, Header};
use std::sync::Arc;

/// Block sealing utilities, grounded on the teacher's `BlockSealer`.
#[derive(Debug)]
pub struct BlockSealer {
    signer_manager: Arc<SignerManager>,
}

impl BlockSealer {
    pub fn new(signer_manager: Arc<SignerManager>) -> Self {
        Self { signer_manager }
    }

    /// Sign `header` with `signer_address`'s key, writing the seal into the
    /// trailing 65 bytes of `extra_data`.
    pub async fn seal_header(
        &self,
        mut header: Header,
        signer_address: &Address,
    ) -> Result<Header, SignerError> {
        let hash = seal_hash(&header).map_err(|e| SignerError::SigningFailed(e.to_string()))?;
        let signature = self.signer_manager.sign_hash(signer_address, *hash).await?;

        let mut extra = header.extra_data.to_vec();
        let tail_start = extra.len().saturating_sub(EXTRA_SEAL_LENGTH);
        extra.truncate(tail_start);
        extra.extend_from_slice(&signature);
        header.extra_data = extra.into();

        Ok(header)
    }

    /// Recover and return the signer of an already-sealed header.
    pub fn verify_signature(header: &Header, cache: &SignerCache) -> Result<Address, SignerError> {
        ecrecover(header, cache).map_err(|e| SignerError::SigningFailed(e.to_string()))
    }
}

/// Adapts [`SignerManager`] to the engine-facing [`SignerFn`] trait used by
/// [`crate::scheduler::spawn_seal`], which expects a synchronous callback.
/// Blocks the calling (scheduler task) thread on the manager's async lock --
/// acceptable since the manager only holds the lock briefly to sign.
pub struct ManagerSignerFn {
    manager: Arc<SignerManager>,
    handle: tokio::runtime::Handle,
}

impl ManagerSignerFn {
    pub fn new(manager: Arc<SignerManager>, handle: tokio::runtime::Handle) -> Self {
        Self { manager, handle }
    }
}

impl SignerFn for ManagerSignerFn {
    fn sign(&self, signer: &Address, message: &[u8]) -> Result<[u8; 65], String> {
        let hash = alloy_primitives::keccak256(message);
        let manager = self.manager.clone();
        let signer = *signer;
        tokio::task::block_in_place(|| {
            self.handle
                .block_on(async move { manager.sign_hash(&signer, *hash).await })
        })
        .map_err(|e| e.to_string())
    }
}
