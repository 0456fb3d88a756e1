// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Provider contract and built-in providers.
//!
//! A DNS provider reads a zone, turns the difference between what it holds and
//! what the configuration declares into [`Correction`]s, and performs each one
//! when its thunk runs. Registrars only manage delegation.
//!
//! ## Built-in types
//!
//! - [`rfc2136`] - dynamic updates against any RFC 2136 server
//! - [`powerdns`] - PowerDNS authoritative HTTP API
//! - [`bind`] - zone files on disk
//! - [`memory`] - in-process store, also a registrar
//! - [`none`] - registrar that never changes delegation

pub mod bind;
pub mod capabilities;
pub mod memory;
pub mod none;
pub mod powerdns;
pub mod registrar;
pub mod registry;
pub mod retry;
pub mod rfc2136;

pub use capabilities::{check_capabilities, Capabilities, Capability, ProviderProfile};
pub use registry::{Registry, REGISTRY};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::config::ProviderCredentials;
use crate::diff::{annotate_dependencies, by_record, by_record_set, by_zone, Change, ChangeType};
use crate::errors::{ConfigError, ProviderError, ZoneError};
use crate::handsoff::HandsOffPolicy;
use crate::models::{ComparableFn, Correction, DomainConfig, Record};
use crate::ordering::order_changes;

/// How a provider's API edits a zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Granularity {
    /// One call per record
    #[default]
    ByRecord,
    /// One call per `(name, type)` RRset
    ByRecordSet,
    /// The whole zone is written at once
    ByZone,
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "by_record" | "record" => Ok(Self::ByRecord),
            "by_record_set" | "by_set" | "recordset" | "record_set" => Ok(Self::ByRecordSet),
            "by_zone" | "zone" => Ok(Self::ByZone),
            other => Err(format!("unknown granularity '{other}'")),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ByRecord => "by_record",
            Self::ByRecordSet => "by_record_set",
            Self::ByZone => "by_zone",
        })
    }
}

/// A backend hosting DNS zones.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Name this instance was configured under
    fn name(&self) -> &str;

    /// Registered type name, e.g. `POWERDNS`
    fn provider_type(&self) -> &str;

    /// Declared capabilities
    fn capabilities(&self) -> Capabilities;

    /// Zones this provider hosts.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Unsupported`] unless the provider can list zones.
    async fn list_zones(&self) -> Result<Vec<String>, ProviderError> {
        Err(ProviderError::Unsupported {
            provider: self.name().to_string(),
            operation: "list zones".to_string(),
        })
    }

    /// Make sure the zone exists, creating it where supported.
    ///
    /// # Errors
    ///
    /// Any error here is fatal for the zone.
    async fn ensure_zone_exists(&self, zone: &str) -> Result<(), ProviderError>;

    /// Nameservers the provider serves the zone from.
    ///
    /// # Errors
    ///
    /// Returns the provider error on failure.
    async fn get_nameservers(&self, zone: &str) -> Result<Vec<String>, ProviderError>;

    /// Records currently in the zone, with `original` populated.
    ///
    /// # Errors
    ///
    /// Returns the provider error on failure.
    async fn get_zone_records(
        &self,
        zone: &str,
        meta: &BTreeMap<String, String>,
    ) -> Result<Vec<Record>, ProviderError>;

    /// Plan the corrections that bring `existing` in line with `dc`.
    ///
    /// # Errors
    ///
    /// Returns an error if the hands-off policy fails or planning is impossible.
    fn get_zone_records_corrections(
        &self,
        dc: &DomainConfig,
        existing: Vec<Record>,
    ) -> Result<Vec<Correction>, ZoneError>;
}

/// A backend managing delegation for a domain.
#[async_trait]
pub trait Registrar: Send + Sync {
    /// Name this instance was configured under
    fn name(&self) -> &str;

    /// Corrections that point the domain at `dc.nameservers`.
    ///
    /// # Errors
    ///
    /// Returns the provider error if current delegation cannot be read.
    async fn get_registrar_corrections(
        &self,
        dc: &DomainConfig,
    ) -> Result<Vec<Correction>, ProviderError>;
}

/// Ordered plan for one zone.
#[derive(Debug, Default)]
pub struct Plan {
    /// Changes in execution order
    pub changes: Vec<Change>,
    /// Informational lines from hands-off and ordering
    pub messages: Vec<String>,
}

impl Plan {
    /// Wrap every change in a correction.
    ///
    /// Messages come first as reports; report changes stay reports; everything
    /// else goes through `correction_for`.
    pub fn into_corrections<F>(self, mut correction_for: F) -> Vec<Correction>
    where
        F: FnMut(Change) -> Correction,
    {
        let mut corrections: Vec<Correction> =
            self.messages.into_iter().map(Correction::report).collect();
        for change in self.changes {
            if change.kind == ChangeType::Report {
                corrections.push(Correction::report(change.msg()));
            } else {
                corrections.push(correction_for(change));
            }
        }
        corrections
    }
}

/// Hands-off, diff, dependency hints and ordering for one zone.
///
/// `desired` is the provider-massaged copy of `dc.records`.
///
/// # Errors
///
/// Returns an error if the hands-off policy cannot be compiled or its safety
/// check finds a conflict.
pub fn plan_changes(
    dc: &DomainConfig,
    existing: &[Record],
    desired: Vec<Record>,
    granularity: Granularity,
    extra: Option<&ComparableFn>,
) -> Result<Plan, ZoneError> {
    let policy = HandsOffPolicy::from_domain(dc)?;
    let handsoff = policy.apply(existing, desired)?;

    let mut changes = match granularity {
        Granularity::ByRecord => by_record(existing, &handsoff.desired, extra),
        Granularity::ByRecordSet => by_record_set(existing, &handsoff.desired, extra),
        Granularity::ByZone => by_zone(&dc.name, existing, &handsoff.desired, extra),
    };
    annotate_dependencies(&mut changes, &dc.name);
    let (changes, unresolved) = order_changes(changes);

    let mut messages = handsoff.messages;
    if let Some(err) = unresolved {
        messages.push(format!("WARNING: {err}"));
    }
    debug!(
        zone = %dc.name,
        granularity = %granularity,
        changes = changes.len(),
        ignored = handsoff.ignored.len(),
        foreign = handsoff.foreign.len(),
        "planned zone"
    );
    Ok(Plan { changes, messages })
}

/// Snap a TTL to the smallest bucket not below it, or the largest bucket.
#[must_use]
pub fn snap_ttl(ttl: u32, buckets: &[u32]) -> u32 {
    if buckets.is_empty() {
        return ttl;
    }
    buckets
        .iter()
        .copied()
        .filter(|b| *b >= ttl)
        .min()
        .or_else(|| buckets.iter().copied().max())
        .unwrap_or(ttl)
}

/// Check credential keys for a provider.
///
/// Every missing required key is reported in one error. Keys that are neither
/// required nor optional are logged and otherwise ignored.
///
/// # Errors
///
/// Returns [`ConfigError::MissingCredentials`] listing every missing key.
pub fn check_credentials(
    provider: &str,
    creds: &ProviderCredentials,
    required: &[&str],
    optional: &[&str],
) -> Result<(), ConfigError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|k| creds.get(k).map_or(true, str::is_empty))
        .map(ToString::to_string)
        .collect();

    for key in creds.values.keys() {
        if !required.contains(&key.as_str()) && !optional.contains(&key.as_str()) {
            warn!(provider = %provider, key = %key, "ignoring unknown credential key");
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::MissingCredentials {
            provider: provider.to_string(),
            keys: missing,
        })
    }
}

/// Parse a comma-separated list credential.
pub(crate) fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
