// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `registry.rs`

#[cfg(test)]
mod tests {
    use crate::config::ProviderCredentials;
    use crate::errors::ConfigError;
    use crate::providers::{Capability, REGISTRY};

    fn creds(provider_type: Option<&str>, pairs: &[(&str, &str)]) -> ProviderCredentials {
        ProviderCredentials {
            provider_type: provider_type.map(ToString::to_string),
            values: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_builtin_types_registered() {
        let types: Vec<&str> = REGISTRY.provider_types().collect();
        for expected in ["BIND", "MEMORY", "NONE", "POWERDNS", "RFC2136"] {
            assert!(types.contains(&expected), "{expected} missing");
        }
    }

    #[test]
    fn test_custom_type_owner() {
        assert_eq!(REGISTRY.custom_type_owner("CF_REDIRECT"), Some("CLOUDFLAREAPI"));
        assert_eq!(REGISTRY.custom_type_owner("AZURE_ALIAS"), Some("AZURE_DNS"));
        assert_eq!(REGISTRY.custom_type_owner("A"), None);
        assert!(REGISTRY.custom_types().contains("MIKROTIK_FWD"));
    }

    #[test]
    fn test_create_memory_provider() {
        let provider = REGISTRY
            .create_provider("mem", &creds(Some("memory"), &[]))
            .unwrap();
        assert_eq!(provider.name(), "mem");
        assert_eq!(provider.provider_type(), "MEMORY");
        assert!(provider.capabilities().has(Capability::CanConcur));
    }

    #[test]
    fn test_missing_type() {
        let err = REGISTRY.create_provider("x", &creds(None, &[])).err().unwrap();
        assert!(matches!(err, ConfigError::MissingType { .. }));
    }

    #[test]
    fn test_unknown_type() {
        let err = REGISTRY
            .create_provider("x", &creds(Some("GANDI_V9"), &[]))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::UnknownProviderType { .. }));
    }

    #[test]
    fn test_none_is_registrar_only() {
        assert!(REGISTRY.create_registrar("none", &creds(Some("NONE"), &[])).is_ok());
        assert!(REGISTRY.create_provider("none", &creds(Some("NONE"), &[])).is_err());
    }

    #[test]
    fn test_powerdns_reports_missing_keys() {
        let err = REGISTRY
            .create_provider("pdns", &creds(Some("POWERDNS"), &[("api_url", "http://localhost")]))
            .err()
            .unwrap();
        match err {
            ConfigError::MissingCredentials { keys, .. } => {
                assert_eq!(keys, vec!["api_key", "server_name"]);
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn test_registry_capabilities_lookup() {
        let caps = REGISTRY.capabilities("powerdns").unwrap();
        assert!(caps.has(Capability::CanAutoDnssec));
        assert!(REGISTRY.capabilities("nope").is_none());
    }
}
