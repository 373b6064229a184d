//! Configuration fingerprints for change detection.
//!
//! A fingerprint covers exactly the arguments that force replacement, so a
//! changed fingerprint means the remote resource must be recreated.

use sha2::{Digest, Sha256};

use super::spec::DomainServicesConfig;

/// Hasher for computing configuration fingerprints.
#[derive(Debug, Default)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Creates a new configuration hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the fingerprint of a Domain Services block.
    ///
    /// The resource group is compared case-insensitively by ARM, so it is
    /// lowercased first. The block's local name is not part of it.
    #[must_use]
    pub fn hash_domain_services(&self, block: &DomainServicesConfig) -> String {
        let mut hasher = Sha256::new();

        let resource_group = block.resource_group_name.to_ascii_lowercase();
        for field in [
            resource_group.as_str(),
            block.domain_name.as_str(),
            block.tenant_id.as_str(),
            block.virtual_network_id.as_str(),
            block.subnet_id.as_str(),
        ] {
            // Length prefix keeps ("ab", "c") and ("a", "bc") apart.
            hasher.update((field.len() as u64).to_be_bytes());
            hasher.update(field.as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Returns a short form of a fingerprint for display.
    #[must_use]
    pub fn short_hash(hash: &str) -> &str {
        hash.get(..12).unwrap_or(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> DomainServicesConfig {
        DomainServicesConfig {
            name: String::from("corp"),
            resource_group_name: String::from("Identity-RG"),
            domain_name: String::from("corp.example.com"),
            tenant_id: String::from("t"),
            virtual_network_id: String::from("/vnet"),
            subnet_id: String::from("/vnet/subnets/aadds"),
        }
    }

    #[test]
    fn test_hash_is_deterministic() {
        let hasher = ConfigHasher::new();
        assert_eq!(hasher.hash_domain_services(&block()), hasher.hash_domain_services(&block()));
        assert_eq!(hasher.hash_domain_services(&block()).len(), 64);
    }

    #[test]
    fn test_resource_group_case_is_ignored() {
        let hasher = ConfigHasher::new();
        let mut lower = block();
        lower.resource_group_name = String::from("identity-rg");
        assert_eq!(hasher.hash_domain_services(&block()), hasher.hash_domain_services(&lower));
    }

    #[test]
    fn test_replace_fields_change_hash() {
        let hasher = ConfigHasher::new();
        let base = hasher.hash_domain_services(&block());

        let mut changed = block();
        changed.subnet_id = String::from("/vnet/subnets/other");
        assert_ne!(base, hasher.hash_domain_services(&changed));

        let mut renamed = block();
        renamed.name = String::from("other");
        assert_eq!(base, hasher.hash_domain_services(&renamed));
    }

    #[test]
    fn test_short_hash() {
        assert_eq!(ConfigHasher::short_hash("0123456789abcdef"), "0123456789ab");
        assert_eq!(ConfigHasher::short_hash("abc"), "abc");
    }
}
