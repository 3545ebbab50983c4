//! Fixed development private keys, for tests and local single-node runs.
//!
//! Grounded on the teacher's `genesis::dev_accounts` well-known key set;
//! values are arbitrary but fixed so dev-mode addresses are stable across
//! runs.

use super::manager::SignerManager;
use k256::ecdsa::SigningKey;
use std::sync::Arc;

pub const DEV_PRIVATE_KEYS: [&str; 10] = [
    "0x0000000000000000000000000000000000000000000000000000000000000001",
    "0x0000000000000000000000000000000000000000000000000000000000000002",
    "0x0000000000000000000000000000000000000000000000000000000000000003",
    "0x0000000000000000000000000000000000000000000000000000000000000004",
    "0x0000000000000000000000000000000000000000000000000000000000000005",
    "0x0000000000000000000000000000000000000000000000000000000000000006",
    "0x0000000000000000000000000000000000000000000000000000000000000007",
    "0x0000000000000000000000000000000000000000000000000000000000000008",
    "0x0000000000000000000000000000000000000000000000000000000000000009",
    "0x000000000000000000000000000000000000000000000000000000000000000a",
];

/// Parse the first dev key into a raw signing key, for callers that want to
/// drive [`SignerManager::add_signer`] directly.
pub fn first_dev_signer() -> SigningKey {
    parse_dev_key(DEV_PRIVATE_KEYS[0])
}

fn parse_dev_key(hex_key: &str) -> SigningKey {
    let bytes = hex::decode(hex_key.trim_start_matches("0x")).expect("dev key is valid hex");
    SigningKey::from_slice(&bytes).expect("dev key is a valid scalar")
}

/// Build a manager pre-loaded with the first three dev keys, the default
/// signer set used by local dev-mode networks.
pub async fn setup_dev_signers() -> Arc<SignerManager> {
    let manager = Arc::new(SignerManager::new());
    for key in &DEV_PRIVATE_KEYS[..3] {
        manager.add_signer_from_hex(key).await.expect("dev key is valid");
    }
    manager
}
