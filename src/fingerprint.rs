//! Check fingerprints
//!
//! A check depends on the contract, every contract reachable from it, and
//! the declared type. The fingerprint is a SHA-256 over their canonical JSON,
//! so an unchanged fingerprint means an unchanged verdict.

use sha2::{Digest, Sha256};

use crate::checker::Module;

/// Hex fingerprint of checking `contract` against `behavior` in `module`
pub fn fingerprint(module: &Module, contract: &str, behavior: &str) -> Result<String, serde_json::Error> {
    let mut hasher = Sha256::new();
    for callee in module.reachable(contract) {
        serde_json::to_writer(&mut hasher, callee)?;
        hasher.update(b"\n");
    }
    hasher.update(b"--\n");
    if let Some(decl) = module.type_decl(behavior) {
        serde_json::to_writer(&mut hasher, decl)?;
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Short form for human-readable reports
pub fn short(fingerprint: &str) -> &str {
    &fingerprint[..fingerprint.len().min(12)]
}
