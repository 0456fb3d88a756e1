// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Configuration files: the `dnsconfig` intermediate representation and `creds.json`.
//!
//! The dnsconfig file is JSON, or YAML when the extension is `.yaml`/`.yml`.
//! Credentials map provider names to a `TYPE` plus provider-specific keys;
//! values starting with `$` are read from the environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::ConfigError;
use crate::models::{AutoDnssec, Record, UnmanagedConfig};

/// Key in a credentials entry naming the provider type.
pub const CREDS_TYPE_KEY: &str = "TYPE";

/// Top-level dnsconfig document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Registrars referenced by domains
    #[serde(default)]
    pub registrars: Vec<ProviderDecl>,
    /// DNS providers referenced by domains
    #[serde(default)]
    pub dns_providers: Vec<ProviderDecl>,
    /// Zones to reconcile
    #[serde(default)]
    pub domains: Vec<DomainSpec>,
}

/// A provider or registrar declared in the dnsconfig file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderDecl {
    /// Name used by domains and in `creds.json`
    pub name: String,
    /// Provider type; falls back to `TYPE` in the credentials
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,
    /// Provider-level metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

/// A zone as authored by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainSpec {
    /// Zone name, e.g. `example.com`
    pub name: String,
    /// Registrar holding the delegation, if managed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registrar: Option<String>,
    /// Names of the DNS providers serving the zone
    #[serde(default)]
    pub dns_providers: Vec<String>,
    /// Desired records
    #[serde(default)]
    pub records: Vec<RawRecord>,
    /// Nameservers to delegate to; empty means the providers' own
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nameservers: Vec<String>,
    /// Records left alone by label, type and target globs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmanaged: Vec<UnmanagedConfig>,
    /// Never delete existing records
    #[serde(default)]
    pub no_purge: bool,
    /// DNSSEC signing switch
    #[serde(default)]
    pub auto_dnssec: AutoDnssec,
    /// Leave records owned by external-dns alone
    #[serde(default)]
    pub ignore_external_dns: bool,
    /// Label prefix external-dns was run with
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_dns_prefix: String,
    /// Allow desired records that an unmanaged pattern also matches
    #[serde(default)]
    pub unmanaged_disable_safety_check: bool,
    /// Zone-level metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
    /// Metadata keyed by provider name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub provider_meta: BTreeMap<String, BTreeMap<String, String>>,
}

/// A record in presentation form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Type mnemonic, any case
    #[serde(rename = "type")]
    pub rtype: String,
    /// Short label, `@` for the apex
    pub name: String,
    /// Presentation-format content
    #[serde(default)]
    pub target: String,
    /// TTL; absent or zero means the default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
    /// Remove this record even under NO_PURGE
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ensure_absent: bool,
}

impl RawRecord {
    /// Presentation form of a normalized record, as printed by `get-zones`.
    #[must_use]
    pub fn from_record(record: &Record) -> Self {
        Self {
            rtype: record.rtype().to_string(),
            name: record.label.clone(),
            target: record.rdata.to_string(),
            ttl: Some(record.ttl),
            meta: record.metadata.clone(),
            ensure_absent: false,
        }
    }
}

impl DnsConfig {
    /// Keep only the named domains. An empty filter keeps everything.
    pub fn retain_domains(&mut self, names: &[String]) {
        if names.is_empty() {
            return;
        }
        self.domains.retain(|d| {
            names
                .iter()
                .any(|n| n.trim_end_matches('.').eq_ignore_ascii_case(d.name.trim_end_matches('.')))
        });
    }

    /// Declared type of a provider or registrar, if the dnsconfig names one.
    #[must_use]
    pub fn declared_type(&self, name: &str) -> Option<&str> {
        self.dns_providers
            .iter()
            .chain(&self.registrars)
            .find(|p| p.name == name)
            .and_then(|p| p.provider_type.as_deref())
    }
}

/// Load a dnsconfig document.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_dnsconfig(path: &Path) -> Result<DnsConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read dnsconfig {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    if is_yaml {
        serde_yaml::from_str(&raw).with_context(|| format!("invalid YAML in {}", path.display()))
    } else {
        serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
    }
}

/// Credentials for one provider, with environment references resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderCredentials {
    /// Value of `TYPE`, if present
    pub provider_type: Option<String>,
    /// Every other key
    pub values: BTreeMap<String, String>,
}

impl ProviderCredentials {
    /// Look up a credential value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// All credentials, keyed by provider name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    providers: BTreeMap<String, ProviderCredentials>,
}

impl Credentials {
    /// Build from already-parsed JSON, resolving `$VAR` references with `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced environment variable is unset.
    pub fn from_map<F>(
        raw: BTreeMap<String, BTreeMap<String, String>>,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut providers = BTreeMap::new();
        for (provider, entries) in raw {
            let mut creds = ProviderCredentials::default();
            for (key, value) in entries {
                let value = resolve_env(&provider, &key, &value, &lookup)?;
                if key == CREDS_TYPE_KEY {
                    creds.provider_type = Some(value);
                } else {
                    creds.values.insert(key, value);
                }
            }
            providers.insert(provider, creds);
        }
        Ok(Self { providers })
    }

    /// Credentials for a provider name.
    #[must_use]
    pub fn get(&self, provider: &str) -> Option<&ProviderCredentials> {
        self.providers.get(provider)
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, provider: impl Into<String>, creds: ProviderCredentials) {
        self.providers.insert(provider.into(), creds);
    }
}

fn resolve_env<F>(provider: &str, key: &str, value: &str, lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(var) = value.strip_prefix('$') else {
        return Ok(value.to_string());
    };
    if var.is_empty() {
        return Ok(value.to_string());
    }
    lookup(var).ok_or_else(|| ConfigError::MissingEnvironment {
        provider: provider.to_string(),
        key: key.to_string(),
        var: var.to_string(),
    })
}

/// Load `creds.json`. A missing file yields empty credentials.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be parsed, or a `$VAR` is unset.
pub fn load_credentials(path: &Path) -> Result<Credentials> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "credentials file not found, using none");
        return Ok(Credentials::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read credentials {}", path.display()))?;
    let parsed: BTreeMap<String, BTreeMap<String, String>> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid JSON in {}", path.display()))?;
    Ok(Credentials::from_map(parsed, |var| std::env::var(var).ok())?)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
