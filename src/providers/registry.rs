// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Provider-type registry.
//!
//! Built once at startup and read-only afterwards. Maps each type name to its
//! constructors and capabilities, and each provider-custom record type to the
//! provider type that owns it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, LazyLock};
use tracing::debug;

use super::capabilities::Capabilities;
use super::{bind, memory, none, powerdns, rfc2136, DnsProvider, Registrar};
use crate::config::ProviderCredentials;
use crate::errors::ConfigError;

/// Builds a DNS provider from its configured name and credentials.
pub type ProviderCtor = fn(&str, &ProviderCredentials) -> Result<Arc<dyn DnsProvider>, ConfigError>;

/// Builds a registrar from its configured name and credentials.
pub type RegistrarCtor = fn(&str, &ProviderCredentials) -> Result<Arc<dyn Registrar>, ConfigError>;

/// Process-wide registry of built-in provider types.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::builtin);

/// Everything known about one provider type.
#[derive(Clone)]
pub struct ProviderType {
    /// DNS provider constructor, if the type hosts zones
    pub provider: Option<ProviderCtor>,
    /// Registrar constructor, if the type manages delegation
    pub registrar: Option<RegistrarCtor>,
    /// Capabilities every instance declares
    pub capabilities: fn() -> Capabilities,
}

/// Provider type registry.
#[derive(Clone, Default)]
pub struct Registry {
    types: BTreeMap<String, ProviderType>,
    custom_types: BTreeMap<String, String>,
}

impl Registry {
    /// Registry with every built-in type and the known custom record types.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        registry.register(
            rfc2136::PROVIDER_TYPE,
            ProviderType {
                provider: Some(rfc2136::new_provider),
                registrar: None,
                capabilities: rfc2136::capabilities,
            },
        );
        registry.register(
            powerdns::PROVIDER_TYPE,
            ProviderType {
                provider: Some(powerdns::new_provider),
                registrar: None,
                capabilities: powerdns::capabilities,
            },
        );
        registry.register(
            bind::PROVIDER_TYPE,
            ProviderType {
                provider: Some(bind::new_provider),
                registrar: None,
                capabilities: bind::capabilities,
            },
        );
        registry.register(
            memory::PROVIDER_TYPE,
            ProviderType {
                provider: Some(memory::new_provider),
                registrar: Some(memory::new_registrar),
                capabilities: memory::capabilities,
            },
        );
        registry.register(
            none::PROVIDER_TYPE,
            ProviderType {
                provider: None,
                registrar: Some(none::new_registrar),
                capabilities: Capabilities::default,
            },
        );

        for rtype in ["CF_REDIRECT", "CF_TEMP_REDIRECT", "CF_SINGLE_REDIRECT", "CF_WORKER_ROUTE"] {
            registry.register_custom_type(rtype, "CLOUDFLAREAPI");
        }
        registry.register_custom_type("AZURE_ALIAS", "AZURE_DNS");
        registry.register_custom_type("R53_ALIAS", "ROUTE53");
        registry.register_custom_type("AKAMAICDN", "AKAMAIEDGEDNS");
        for rtype in ["MIKROTIK_FWD", "MIKROTIK_NXDOMAIN", "MIKROTIK_FORWARDER"] {
            registry.register_custom_type(rtype, "MIKROTIK");
        }
        registry
    }

    /// Register or replace a provider type.
    pub fn register(&mut self, name: &str, entry: ProviderType) {
        debug!(provider_type = %name, "registering provider type");
        self.types.insert(name.to_ascii_uppercase(), entry);
    }

    /// Route a custom record type to the provider type that owns it.
    pub fn register_custom_type(&mut self, rtype: &str, owner: &str) {
        self.custom_types
            .insert(rtype.to_ascii_uppercase(), owner.to_ascii_uppercase());
    }

    /// Registered type names.
    pub fn provider_types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Every provider-custom record type.
    #[must_use]
    pub fn custom_types(&self) -> BTreeSet<String> {
        self.custom_types.keys().cloned().collect()
    }

    /// Provider type owning a custom record type.
    #[must_use]
    pub fn custom_type_owner(&self, rtype: &str) -> Option<&str> {
        self.custom_types.get(rtype).map(String::as_str)
    }

    /// Capabilities of a provider type.
    #[must_use]
    pub fn capabilities(&self, provider_type: &str) -> Option<Capabilities> {
        self.types
            .get(&provider_type.to_ascii_uppercase())
            .map(|t| (t.capabilities)())
    }

    fn lookup(&self, name: &str, creds: &ProviderCredentials) -> Result<&ProviderType, ConfigError> {
        let provider_type = creds
            .provider_type
            .as_deref()
            .ok_or_else(|| ConfigError::MissingType {
                provider: name.to_string(),
            })?;
        self.types
            .get(&provider_type.to_ascii_uppercase())
            .ok_or_else(|| ConfigError::UnknownProviderType {
                provider: name.to_string(),
                provider_type: provider_type.to_string(),
            })
    }

    /// Construct the DNS provider configured as `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is missing or unknown, the type cannot
    /// host zones, or the constructor rejects the credentials.
    pub fn create_provider(
        &self,
        name: &str,
        creds: &ProviderCredentials,
    ) -> Result<Arc<dyn DnsProvider>, ConfigError> {
        let entry = self.lookup(name, creds)?;
        let ctor = entry.provider.ok_or_else(|| ConfigError::InvalidCredential {
            provider: name.to_string(),
            key: crate::config::CREDS_TYPE_KEY.to_string(),
            reason: "type is not a DNS provider".to_string(),
        })?;
        ctor(name, creds)
    }

    /// Construct the registrar configured as `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is missing or unknown, the type is not a
    /// registrar, or the constructor rejects the credentials.
    pub fn create_registrar(
        &self,
        name: &str,
        creds: &ProviderCredentials,
    ) -> Result<Arc<dyn Registrar>, ConfigError> {
        let entry = self.lookup(name, creds)?;
        let ctor = entry.registrar.ok_or_else(|| ConfigError::InvalidCredential {
            provider: name.to_string(),
            key: crate::config::CREDS_TYPE_KEY.to_string(),
            reason: "type is not a registrar".to_string(),
        })?;
        ctor(name, creds)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;
