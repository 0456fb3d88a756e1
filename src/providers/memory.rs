// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `MEMORY` provider: zones held in process memory.
//!
//! Used for offline previews and as the backend of the end-to-end tests. The
//! store is shared between clones, so a test can keep a handle and inspect the
//! zone after corrections have run.
//!
//! Credentials (all optional):
//!
//! - `granularity`: `by_record` (default), `by_record_set` or `by_zone`
//! - `ttl_buckets`: comma-separated allowed TTLs
//! - `nameservers`: comma-separated nameservers reported for every zone
//! - `create_zones`: `false` to make missing zones an error

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use super::registrar::nameserver_corrections;
use super::{
    check_credentials, plan_changes, snap_ttl, split_list, Capabilities, Capability, DnsProvider,
    Granularity, Registrar,
};
use crate::config::ProviderCredentials;
use crate::diff::Change;
use crate::errors::{ConfigError, ProviderError, ZoneError};
use crate::models::{normalize_zone, Correction, DomainConfig, Original, Record};

/// Registered type name.
pub const PROVIDER_TYPE: &str = "MEMORY";

const OPTIONAL_KEYS: &[&str] = &["granularity", "ttl_buckets", "nameservers", "create_zones"];

/// Capabilities of every memory provider.
#[must_use]
pub fn capabilities() -> Capabilities {
    [
        Capability::CanGetZones,
        Capability::CanUseAlias,
        Capability::CanUseCaa,
        Capability::CanUseDs,
        Capability::CanUseNaptr,
        Capability::CanUseSrv,
        Capability::CanUseSshfp,
        Capability::CanUseTlsa,
        Capability::CanUsePtr,
        Capability::CanUseLoc,
        Capability::CanUseSvcb,
        Capability::CanUseHttps,
        Capability::CanAutoDnssec,
        Capability::CanConcur,
        Capability::DocCreateDomains,
        Capability::DocDualHost,
    ]
    .into_iter()
    .collect()
}

#[derive(Debug, Default)]
struct Store {
    zones: BTreeMap<String, Vec<Record>>,
    delegations: BTreeMap<String, Vec<String>>,
}

/// In-memory DNS provider and registrar.
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    name: String,
    granularity: Granularity,
    ttl_buckets: Vec<u32>,
    nameservers: Vec<String>,
    create_zones: bool,
    store: Arc<Mutex<Store>>,
}

/// Registry constructor for the DNS provider side.
///
/// # Errors
///
/// Returns an error if `granularity`, `ttl_buckets` or `create_zones` cannot be parsed.
pub fn new_provider(name: &str, creds: &ProviderCredentials) -> Result<Arc<dyn DnsProvider>, ConfigError> {
    Ok(Arc::new(MemoryProvider::from_credentials(name, creds)?))
}

/// Registry constructor for the registrar side.
///
/// # Errors
///
/// See [`new_provider`].
pub fn new_registrar(name: &str, creds: &ProviderCredentials) -> Result<Arc<dyn Registrar>, ConfigError> {
    Ok(Arc::new(MemoryProvider::from_credentials(name, creds)?))
}

impl MemoryProvider {
    /// Empty store with default settings.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            granularity: Granularity::ByRecord,
            ttl_buckets: Vec::new(),
            nameservers: Vec::new(),
            create_zones: true,
            store: Arc::new(Mutex::new(Store::default())),
        }
    }

    /// Build from credentials.
    ///
    /// # Errors
    ///
    /// Returns an error for unparseable values.
    pub fn from_credentials(name: &str, creds: &ProviderCredentials) -> Result<Self, ConfigError> {
        check_credentials(name, creds, &[], OPTIONAL_KEYS)?;
        let invalid = |key: &str, reason: String| ConfigError::InvalidCredential {
            provider: name.to_string(),
            key: key.to_string(),
            reason,
        };

        let mut provider = Self::new(name);
        if let Some(g) = creds.get("granularity") {
            provider.granularity = g.parse().map_err(|e| invalid("granularity", e))?;
        }
        provider.ttl_buckets = split_list(creds.get("ttl_buckets"))
            .iter()
            .map(|t| t.parse::<u32>().map_err(|e| invalid("ttl_buckets", e.to_string())))
            .collect::<Result<_, _>>()?;
        provider.nameservers = split_list(creds.get("nameservers"));
        if let Some(v) = creds.get("create_zones") {
            provider.create_zones = v
                .parse()
                .map_err(|e: std::str::ParseBoolError| invalid("create_zones", e.to_string()))?;
        }
        Ok(provider)
    }

    /// Set the diff granularity.
    #[must_use]
    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Restrict TTLs to a bucket list.
    #[must_use]
    pub fn with_ttl_buckets(mut self, buckets: Vec<u32>) -> Self {
        self.ttl_buckets = buckets;
        self
    }

    /// Nameservers reported for every zone.
    #[must_use]
    pub fn with_nameservers(mut self, nameservers: Vec<String>) -> Self {
        self.nameservers = nameservers;
        self
    }

    /// Seed a zone.
    #[must_use]
    pub fn with_zone(self, zone: &str, records: Vec<Record>) -> Self {
        self.lock().zones.insert(normalize_zone(zone), records);
        self
    }

    /// Seed a registrar delegation.
    #[must_use]
    pub fn with_delegation(self, zone: &str, nameservers: Vec<String>) -> Self {
        self.lock()
            .delegations
            .insert(normalize_zone(zone), nameservers);
        self
    }

    /// Snapshot of a zone's records, if the zone exists.
    #[must_use]
    pub fn records(&self, zone: &str) -> Option<Vec<Record>> {
        self.lock().zones.get(&normalize_zone(zone)).cloned()
    }

    /// Current delegation of a zone.
    #[must_use]
    pub fn delegation(&self, zone: &str) -> Vec<String> {
        self.lock()
            .delegations
            .get(&normalize_zone(zone))
            .cloned()
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_correction(&self, zone: String, change: Change) -> Correction {
        let store = self.store.clone();
        let provider = self.name.clone();
        let Change { old, new, .. } = change.clone();
        Correction::new(change.msg(), move || async move {
            let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(records) = store.zones.get_mut(&zone) else {
                return Err(ProviderError::ZoneNotFound { provider, zone });
            };
            for gone in &old {
                let comparable = gone.comparable();
                if let Some(pos) = records.iter().position(|r| {
                    r.name_fqdn == gone.name_fqdn
                        && r.rtype() == gone.rtype()
                        && r.comparable() == comparable
                }) {
                    records.remove(pos);
                }
            }
            records.extend(new.into_iter().map(|mut r| {
                r.original = None;
                r
            }));
            debug!(provider = %provider, zone = %zone, records = records.len(), "applied change");
            Ok(())
        })
    }
}

#[async_trait]
impl DnsProvider for MemoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider_type(&self) -> &str {
        PROVIDER_TYPE
    }

    fn capabilities(&self) -> Capabilities {
        capabilities()
    }

    async fn list_zones(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.lock().zones.keys().cloned().collect())
    }

    async fn ensure_zone_exists(&self, zone: &str) -> Result<(), ProviderError> {
        let zone = normalize_zone(zone);
        let mut store = self.lock();
        if store.zones.contains_key(&zone) {
            return Ok(());
        }
        if !self.create_zones {
            return Err(ProviderError::ZoneNotFound {
                provider: self.name.clone(),
                zone,
            });
        }
        info!(provider = %self.name, zone = %zone, "creating zone");
        store.zones.insert(zone, Vec::new());
        Ok(())
    }

    async fn get_nameservers(&self, _zone: &str) -> Result<Vec<String>, ProviderError> {
        Ok(self.nameservers.clone())
    }

    async fn get_zone_records(
        &self,
        zone: &str,
        _meta: &BTreeMap<String, String>,
    ) -> Result<Vec<Record>, ProviderError> {
        let zone = normalize_zone(zone);
        let store = self.lock();
        let records = store.zones.get(&zone).ok_or_else(|| ProviderError::ZoneNotFound {
            provider: self.name.clone(),
            zone: zone.clone(),
        })?;
        Ok(records
            .iter()
            .map(|r| {
                let handle = r.comparable();
                r.clone().with_original(Original::new(handle))
            })
            .collect())
    }

    fn get_zone_records_corrections(
        &self,
        dc: &DomainConfig,
        existing: Vec<Record>,
    ) -> Result<Vec<Correction>, ZoneError> {
        let desired: Vec<Record> = dc
            .records
            .iter()
            .cloned()
            .map(|mut r| {
                r.ttl = snap_ttl(r.ttl, &self.ttl_buckets);
                r
            })
            .collect();

        let plan = plan_changes(dc, &existing, desired, self.granularity, None)?;
        let zone = dc.name.clone();
        Ok(plan.into_corrections(|change| self.apply_correction(zone.clone(), change)))
    }
}

#[async_trait]
impl Registrar for MemoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_registrar_corrections(
        &self,
        dc: &DomainConfig,
    ) -> Result<Vec<Correction>, ProviderError> {
        let zone = normalize_zone(&dc.name);
        let current = self.delegation(&zone);
        let store = self.store.clone();
        Ok(nameserver_corrections(&current, &dc.nameservers, move |desired| async move {
            store
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .delegations
                .insert(zone, desired);
            Ok(())
        }))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod memory_tests;
