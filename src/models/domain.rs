// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-zone desired state after normalization.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::record::Record;

/// Tri-state DNSSEC signing switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoDnssec {
    /// Ask the provider to sign the zone
    On,
    /// Ask the provider to stop signing the zone
    Off,
    /// Leave signing as the provider has it
    #[default]
    #[serde(rename = "")]
    Unset,
}

/// Compiled form of an `UNMANAGED(labelGlob, typeList, targetGlob)` declaration.
///
/// Empty patterns mean `*`; an empty type set means any type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmanagedConfig {
    /// Glob over the short label
    #[serde(default)]
    pub label_pattern: String,
    /// Uppercase types; empty matches all
    #[serde(default)]
    pub rtypes: BTreeSet<String>,
    /// Glob over the record target
    #[serde(default)]
    pub target_pattern: String,
}

/// Everything the controller needs to reconcile one zone.
#[derive(Debug, Clone, Default)]
pub struct DomainConfig {
    /// Zone name, lowercase, no trailing dot
    pub name: String,
    /// Registrar name from the configuration, if any
    pub registrar: Option<String>,
    /// DNS provider names serving this zone
    pub dns_providers: Vec<String>,
    /// Desired records
    pub records: Vec<Record>,
    /// Desired apex nameservers (registrar delegation)
    pub nameservers: Vec<String>,
    /// Patterns of records left alone
    pub unmanaged: Vec<UnmanagedConfig>,
    /// Records that must be removed even when NO_PURGE protects the zone
    pub ensure_absent: Vec<Record>,
    /// Never delete records the configuration does not mention
    pub no_purge: bool,
    /// DNSSEC signing switch
    pub auto_dnssec: AutoDnssec,
    /// Leave records owned by external-dns alone
    pub ignore_external_dns: bool,
    /// Prefix external-dns was configured with (`--txt-prefix`)
    pub external_dns_prefix: String,
    /// Fail the zone when a desired record matches an UNMANAGED pattern
    pub unmanaged_safety_check: bool,
    /// Zone-level metadata
    pub metadata: BTreeMap<String, String>,
    /// Per-provider metadata, keyed by provider name
    pub provider_metadata: BTreeMap<String, BTreeMap<String, String>>,
}

impl DomainConfig {
    /// Metadata for a given provider, or an empty map.
    #[must_use]
    pub fn provider_meta(&self, provider: &str) -> BTreeMap<String, String> {
        self.provider_metadata
            .get(provider)
            .cloned()
            .unwrap_or_default()
    }

    /// Distinct record types present in the desired set.
    #[must_use]
    pub fn record_types(&self) -> BTreeSet<String> {
        self.records.iter().map(|r| r.rtype().to_string()).collect()
    }
}
