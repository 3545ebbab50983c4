use super::errors::SignerError;
use crate::types::Address;
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature as K256Signature, SigningKey};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Manages signing keys for POA block production.
///
/// Keyed by our own derived [`Address`] (not `k256`'s notion of identity),
/// since the engine's signer comparisons go through
/// [`crate::recovery::signer_matches`] rather than a standard 20-byte
/// Ethereum address.
#[derive(Debug)]
pub struct SignerManager {
    signers: RwLock<HashMap<Address, SigningKey>>,
}

impl SignerManager {
    pub fn new() -> Self {
        Self { signers: RwLock::new(HashMap::new()) }
    }

    /// Add a signer from a 32-byte private key hex string (with or without `0x`).
    pub async fn add_signer_from_hex(&self, private_key_hex: &str) -> Result<Address, SignerError> {
        let hex = private_key_hex.trim_start_matches("0x");
        let bytes = hex::decode(hex).map_err(|_| SignerError::InvalidPrivateKey)?;
        let key = SigningKey::from_slice(&bytes).map_err(|_| SignerError::InvalidPrivateKey)?;
        Ok(self.add_signer(key).await)
    }

    /// Add a signer directly, deriving its address from the verifying key.
    pub async fn add_signer(&self, key: SigningKey) -> Address {
        let address = address_of(&key);
        self.signers.write().await.insert(address, key);
        address
    }

    pub async fn has_signer(&self, address: &Address) -> bool {
        self.signers.read().await.contains_key(address)
    }

    pub async fn signer_addresses(&self) -> Vec<Address> {
        self.signers.read().await.keys().copied().collect()
    }

    /// Sign a 32-byte prehash, returning the 65-byte `r ‖ s ‖ recovery_id` seal.
    pub async fn sign_hash(&self, address: &Address, hash: [u8; 32]) -> Result<[u8; 65], SignerError> {
        let signers = self.signers.read().await;
        let key = signers.get(address).ok_or(SignerError::NoSignerForAddress(*address))?;

        let (signature, recovery_id): (K256Signature, _) = key
            .sign_prehash_recoverable(&hash)
            .map_err(|e| SignerError::SigningFailed(e.to_string()))?;

        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&signature.r().to_bytes());
        out[32..64].copy_from_slice(&signature.s().to_bytes());
        out[64] = recovery_id.to_byte();
        Ok(out)
    }

    pub async fn remove_signer(&self, address: &Address) -> bool {
        self.signers.write().await.remove(address).is_some()
    }
}

impl Default for SignerManager {
    fn default() -> Self {
        Self::new()
    }
}

fn address_of(key: &SigningKey) -> Address {
    let point = key.verifying_key().to_encoded_point(false);
    Address::from_uncompressed_pubkey(point.as_bytes())
}
