// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `BIND` provider: writes one zone file per zone.
//!
//! The whole zone is rewritten whenever anything in it changes, and the SOA
//! serial is bumped in `YYYYMMDDnn` form. Existing files may use any master
//! file syntax; files written here hold one record per line:
//!
//! ```text
//! $ORIGIN example.com.
//! @ 3600 IN SOA ns1.example.com. hostmaster.example.com. 2025010101 3600 600 604800 86400
//! www 300 IN A 192.0.2.1
//! ```
//!
//! Credentials (all optional):
//!
//! - `directory`: where zone files live (default `zones`)
//! - `filename_format`: file name, `%U` is replaced by the zone (default `%U.zone`)
//! - `soa_mname`, `soa_rname`: SOA names used when neither the file nor the
//!   configuration provides one

use async_trait::async_trait;
use chrono::Utc;
use hickory_proto::rr::{DNSClass, Name};
use hickory_proto::serialize::txt::Parser;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::rfc2136::rdata_from_wire;
use super::{check_credentials, plan_changes, Capabilities, Capability, DnsProvider, Granularity};
use crate::config::ProviderCredentials;
use crate::constants::{
    DEFAULT_SOA_EXPIRE_SECS, DEFAULT_SOA_NEGATIVE_TTL_SECS, DEFAULT_SOA_REFRESH_SECS,
    DEFAULT_SOA_RETRY_SECS,
};
use crate::diff::Change;
use crate::errors::{ConfigError, ProviderError, ZoneError};
use crate::models::{
    make_fqdn, normalize_zone, Correction, DomainConfig, Original, Rdata, Record, Soa,
};

/// Registered type name.
pub const PROVIDER_TYPE: &str = "BIND";

const OPTIONAL_KEYS: &[&str] = &["directory", "filename_format", "soa_mname", "soa_rname"];

const ZONE_PLACEHOLDER: &str = "%U";

/// TTL of a generated SOA record.
const SOA_TTL: u32 = 3600;

/// Capabilities of every BIND provider.
///
/// LOC and DS are absent: the zone-file reader cannot parse them back.
#[must_use]
pub fn capabilities() -> Capabilities {
    [
        Capability::CanGetZones,
        Capability::CanUseCaa,
        Capability::CanUseNaptr,
        Capability::CanUseSrv,
        Capability::CanUseSshfp,
        Capability::CanUseTlsa,
        Capability::CanUsePtr,
        Capability::CanUseSvcb,
        Capability::CanUseHttps,
        Capability::CanConcur,
        Capability::DocCreateDomains,
        Capability::DocOfficiallySupported,
    ]
    .into_iter()
    .collect()
}

/// Zone-file provider.
#[derive(Debug, Clone)]
pub struct BindProvider {
    name: String,
    directory: PathBuf,
    filename_format: String,
    soa_mname: Option<String>,
    soa_rname: Option<String>,
}

/// Registry constructor.
///
/// # Errors
///
/// Returns an error if `filename_format` does not contain `%U`.
pub fn new_provider(name: &str, creds: &ProviderCredentials) -> Result<Arc<dyn DnsProvider>, ConfigError> {
    Ok(Arc::new(BindProvider::from_credentials(name, creds)?))
}

/// Next serial after `current` on `today` (`YYYYMMDD`).
///
/// The first write of a day gets `YYYYMMDD00`; later writes count up. A serial
/// already ahead of today only ever increases.
#[must_use]
pub fn next_serial(current: u32, today: u32) -> u32 {
    let base = today.saturating_mul(100);
    if current >= base {
        current.saturating_add(1)
    } else {
        base
    }
}

fn today() -> u32 {
    Utc::now()
        .format("%Y%m%d")
        .to_string()
        .parse()
        .unwrap_or_default()
}

/// Parse zone-file text into records, SOA included.
///
/// Any RFC 1035 master file is accepted: `$ORIGIN` and `$TTL` directives,
/// parenthesised multi-line records, omitted owners and TTLs, and comments.
/// Names without an `$ORIGIN` are relative to `zone`.
///
/// # Errors
///
/// Returns a message if the file does not parse, holds a record outside class
/// `IN`, or holds record data this crate cannot represent.
pub fn parse_zone_file(zone: &str, text: &str) -> Result<Vec<Record>, String> {
    let origin = Name::from_str(&format!("{}.", normalize_zone(zone)))
        .map_err(|e| format!("invalid zone name '{zone}': {e}"))?;
    let (_, rrsets) = Parser::new(text, None, Some(origin))
        .parse()
        .map_err(|e| e.to_string())?;

    let mut records = Vec::new();
    for rr in rrsets.values().flat_map(|rrset| rrset.records_without_rrsigs()) {
        if rr.dns_class() != DNSClass::IN {
            return Err(format!("{}: unsupported class {}", rr.name(), rr.dns_class()));
        }
        let Some(data) = rr.data() else {
            continue;
        };
        let rdata = rdata_from_wire(data, rr.record_type())
            .map_err(|e| format!("{} {}: {e}", rr.name(), rr.record_type()))?;
        records.push(Record::from_fqdn(&rr.name().to_string(), zone, rr.ttl(), rdata));
    }
    Ok(records)
}

/// Render a zone file. The SOA comes first, then records in name order.
#[must_use]
pub fn render_zone_file(zone: &str, soa: &Soa, soa_ttl: u32, records: &[Record]) -> String {
    let mut sorted: Vec<&Record> = records.iter().filter(|r| r.rtype() != "SOA").collect();
    sorted.sort_by(|a, b| {
        (!a.is_apex(), a.name_fqdn.as_str(), a.rtype(), a.comparable())
            .cmp(&(!b.is_apex(), b.name_fqdn.as_str(), b.rtype(), b.comparable()))
    });

    let mut out = String::new();
    let _ = writeln!(out, "$ORIGIN {}.", normalize_zone(zone));
    let _ = writeln!(out, "@ {soa_ttl} IN SOA {}", Rdata::Soa(soa.clone()));
    for record in sorted {
        let _ = writeln!(
            out,
            "{} {} IN {} {}",
            record.label,
            record.ttl,
            record.rtype(),
            record.rdata
        );
    }
    out
}

impl BindProvider {
    /// Build from credentials.
    ///
    /// # Errors
    ///
    /// See [`new_provider`].
    pub fn from_credentials(name: &str, creds: &ProviderCredentials) -> Result<Self, ConfigError> {
        check_credentials(name, creds, &[], OPTIONAL_KEYS)?;
        let filename_format = creds.get("filename_format").unwrap_or("%U.zone").to_string();
        if !filename_format.contains(ZONE_PLACEHOLDER) {
            return Err(ConfigError::InvalidCredential {
                provider: name.to_string(),
                key: "filename_format".to_string(),
                reason: format!("must contain {ZONE_PLACEHOLDER}"),
            });
        }
        Ok(Self {
            name: name.to_string(),
            directory: PathBuf::from(creds.get("directory").unwrap_or("zones")),
            filename_format,
            soa_mname: creds.get("soa_mname").map(ToString::to_string),
            soa_rname: creds.get("soa_rname").map(ToString::to_string),
        })
    }

    /// Path of a zone's file.
    #[must_use]
    pub fn zone_path(&self, zone: &str) -> PathBuf {
        self.directory
            .join(self.filename_format.replace(ZONE_PLACEHOLDER, &normalize_zone(zone)))
    }

    fn io_error(&self, path: &Path, e: &std::io::Error) -> ProviderError {
        ProviderError::Other {
            provider: self.name.clone(),
            reason: format!("{}: {e}", path.display()),
        }
    }

    /// Read every record in a zone file, SOA included. A missing file is an empty zone.
    async fn read_zone(&self, zone: &str) -> Result<Vec<Record>, ProviderError> {
        let path = self.zone_path(zone);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(&path, &e)),
        };
        parse_zone_file(zone, &text).map_err(|reason| ProviderError::Other {
            provider: self.name.clone(),
            reason: format!("{}: {reason}", path.display()),
        })
    }

    fn default_soa(&self, zone: &str) -> Soa {
        Soa {
            mname: self
                .soa_mname
                .clone()
                .unwrap_or_else(|| format!("ns1.{zone}.")),
            rname: self
                .soa_rname
                .clone()
                .unwrap_or_else(|| format!("hostmaster.{zone}.")),
            serial: 0,
            refresh: DEFAULT_SOA_REFRESH_SECS,
            retry: DEFAULT_SOA_RETRY_SECS,
            expire: DEFAULT_SOA_EXPIRE_SECS,
            minimum: DEFAULT_SOA_NEGATIVE_TTL_SECS,
        }
    }

    fn write_correction(&self, zone: String, declared_soa: Option<Soa>, change: Change) -> Correction {
        let this = self.clone();
        let records = change.new.clone();
        Correction::new(change.msg(), move || async move {
            let current = this.read_zone(&zone).await?;
            let current_soa = current
                .iter()
                .find_map(|r| match &r.rdata {
                    Rdata::Soa(soa) => Some(soa.clone()),
                    _ => None,
                })
                .unwrap_or_else(|| this.default_soa(&zone));

            let mut soa = declared_soa.unwrap_or_else(|| current_soa.clone());
            soa.serial = next_serial(current_soa.serial.max(soa.serial), today());

            let text = render_zone_file(&zone, &soa, SOA_TTL, &records);
            let path = this.zone_path(&zone);
            let tmp = path.with_extension("tmp");
            tokio::fs::write(&tmp, text)
                .await
                .map_err(|e| this.io_error(&tmp, &e))?;
            tokio::fs::rename(&tmp, &path)
                .await
                .map_err(|e| this.io_error(&path, &e))?;
            info!(provider = %this.name, zone = %zone, serial = soa.serial, path = %path.display(), "wrote zone file");
            Ok(())
        })
    }
}

#[async_trait]
impl DnsProvider for BindProvider {
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
        let (prefix, suffix) = self
            .filename_format
            .split_once(ZONE_PLACEHOLDER)
            .unwrap_or((self.filename_format.as_str(), ""));
        let mut entries = tokio::fs::read_dir(&self.directory)
            .await
            .map_err(|e| self.io_error(&self.directory, &e))?;

        let mut zones = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| self.io_error(&self.directory, &e))?
        {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if let Some(zone) = file_name
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(suffix))
            {
                if !zone.is_empty() {
                    zones.push(zone.to_string());
                }
            }
        }
        zones.sort();
        Ok(zones)
    }

    async fn ensure_zone_exists(&self, zone: &str) -> Result<(), ProviderError> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| ProviderError::EnsureZoneFailed {
                provider: self.name.clone(),
                zone: zone.to_string(),
                reason: format!("{}: {e}", self.directory.display()),
            })?;
        debug!(provider = %self.name, zone = %zone, path = %self.zone_path(zone).display(), "zone file location ready");
        Ok(())
    }

    async fn get_nameservers(&self, zone: &str) -> Result<Vec<String>, ProviderError> {
        let apex = make_fqdn("@", zone);
        Ok(self
            .read_zone(zone)
            .await?
            .iter()
            .filter(|r| r.name_fqdn == apex && r.rtype() == "NS")
            .filter_map(|r| r.rdata.target().map(ToString::to_string))
            .collect())
    }

    async fn get_zone_records(
        &self,
        zone: &str,
        _meta: &BTreeMap<String, String>,
    ) -> Result<Vec<Record>, ProviderError> {
        let path = self.zone_path(zone);
        let records: Vec<Record> = self
            .read_zone(zone)
            .await?
            .into_iter()
            .filter(|r| r.rtype() != "SOA")
            .map(|r| r.with_original(Original::new(path.clone())))
            .collect();
        debug!(provider = %self.name, zone = %zone, count = records.len(), "read zone file");
        Ok(records)
    }

    fn get_zone_records_corrections(
        &self,
        dc: &DomainConfig,
        existing: Vec<Record>,
    ) -> Result<Vec<Correction>, ZoneError> {
        let declared_soa = dc.records.iter().find_map(|r| match &r.rdata {
            Rdata::Soa(soa) => Some(soa.clone()),
            _ => None,
        });
        if declared_soa.is_some() {
            warn!(zone = %dc.name, "SOA serial from the configuration is only used as a floor");
        }
        let desired: Vec<Record> = dc
            .records
            .iter()
            .filter(|r| r.rtype() != "SOA")
            .cloned()
            .collect();

        let plan = plan_changes(dc, &existing, desired, Granularity::ByZone, None)?;
        let zone = normalize_zone(&dc.name);
        Ok(plan.into_corrections(|change| {
            self.write_correction(zone.clone(), declared_soa.clone(), change)
        }))
    }
}

#[cfg(test)]
#[path = "bind_tests.rs"]
mod bind_tests;
