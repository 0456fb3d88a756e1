// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `POWERDNS` provider: PowerDNS authoritative server HTTP API.
//!
//! Each RRset change is one `PATCH` with a `REPLACE` or `DELETE` rrset.
//! Missing zones are created as `Native` zones. `AutoDNSSEC` is driven through
//! the cryptokeys endpoint.
//!
//! Credentials:
//!
//! - `api_url` (required): base URL, e.g. `http://pdns:8081`
//! - `api_key` (required): value of the `X-API-Key` header
//! - `server_name` (required): usually `localhost`
//! - `default_ns`: comma-separated nameservers for new zones
//! - `zone_kind`: kind of new zones (default `Native`)

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client as HttpClient, Method};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use super::retry::RetryPolicy;
use super::{
    check_credentials, plan_changes, split_list, Capabilities, Capability, DnsProvider,
    Granularity,
};
use crate::config::ProviderCredentials;
use crate::constants::HTTP_REQUEST_TIMEOUT_SECS;
use crate::diff::{Change, ChangeType};
use crate::errors::{ConfigError, ProviderError, ZoneError};
use crate::models::{normalize_zone, AutoDnssec, Correction, DomainConfig, Original, Rdata, Record};

/// Registered type name.
pub const PROVIDER_TYPE: &str = "POWERDNS";

const REQUIRED_KEYS: &[&str] = &["api_url", "api_key", "server_name"];
const OPTIONAL_KEYS: &[&str] = &["default_ns", "zone_kind"];

/// Capabilities of every PowerDNS provider.
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
        Capability::DocOfficiallySupported,
    ]
    .into_iter()
    .collect()
}

/// One record inside an rrset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdnsRecord {
    /// Presentation-format content
    pub content: String,
    /// Disabled records are served by nobody
    #[serde(default)]
    pub disabled: bool,
}

/// An rrset as the API sends and receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RrSet {
    /// Owner name with trailing dot
    pub name: String,
    /// Type mnemonic
    #[serde(rename = "type")]
    pub rtype: String,
    /// TTL shared by the set
    #[serde(default)]
    pub ttl: u32,
    /// `REPLACE` or `DELETE` in a patch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changetype: Option<String>,
    /// Member records
    #[serde(default)]
    pub records: Vec<PdnsRecord>,
}

#[derive(Debug, Deserialize)]
struct ZoneInfo {
    name: String,
    #[serde(default)]
    rrsets: Vec<RrSet>,
    #[serde(default)]
    dnssec: bool,
}

#[derive(Debug, Serialize)]
struct NewZone {
    name: String,
    kind: String,
    nameservers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Patch {
    rrsets: Vec<RrSet>,
}

#[derive(Debug, Deserialize)]
struct CryptoKey {
    id: u64,
}

#[derive(Debug, Serialize)]
struct NewCryptoKey {
    keytype: &'static str,
    active: bool,
}

/// HTTP plumbing shared by the provider and its thunks.
#[derive(Debug, Clone)]
struct Api {
    provider: String,
    client: HttpClient,
    base: String,
    api_key: String,
    retry: RetryPolicy,
}

impl Api {
    async fn request<T: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        zone: Option<&str>,
        body: Option<&T>,
    ) -> Result<String, ProviderError> {
        let operation = format!("{method} {path}");
        self.retry
            .run(&operation, || self.send_once(method.clone(), path, zone, body))
            .await
    }

    async fn send_once<T: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        zone: Option<&str>,
        body: Option<&T>,
    ) -> Result<String, ProviderError> {
        let url = format!("{}{path}", self.base);
        debug!(provider = %self.provider, method = %method, url = %url, "PowerDNS API request");

        let mut request = self
            .client
            .request(method, &url)
            .header("X-API-Key", &self.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|e| ProviderError::Transient {
            provider: self.provider.clone(),
            reason: format!("failed to send request to {url}: {e}"),
        })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        let text = response.text().await.map_err(|e| ProviderError::Transient {
            provider: self.provider.clone(),
            reason: format!("failed to read response from {url}: {e}"),
        })?;

        if status.is_success() {
            return Ok(text);
        }
        Err(
            match ProviderError::from_http_status(&self.provider, status.as_u16(), zone, &text) {
                ProviderError::RateLimited { provider, .. } => ProviderError::RateLimited {
                    provider,
                    retry_after,
                },
                other => other,
            },
        )
    }

    fn parse<T: for<'de> Deserialize<'de>>(&self, text: &str) -> Result<T, ProviderError> {
        serde_json::from_str(text).map_err(|e| ProviderError::Other {
            provider: self.provider.clone(),
            reason: format!("unexpected API response: {e}"),
        })
    }

    async fn zone(&self, zone: &str) -> Result<ZoneInfo, ProviderError> {
        let text = self
            .request::<()>(Method::GET, &zone_path(zone), Some(zone), None)
            .await?;
        self.parse(&text)
    }

    async fn set_dnssec(&self, zone: &str, enable: bool) -> Result<(), ProviderError> {
        let path = format!("{}/cryptokeys", zone_path(zone));
        if enable {
            let key = NewCryptoKey {
                keytype: "csk",
                active: true,
            };
            self.request(Method::POST, &path, Some(zone), Some(&key)).await?;
        } else {
            let text = self.request::<()>(Method::GET, &path, Some(zone), None).await?;
            let keys: Vec<CryptoKey> = self.parse(&text)?;
            for key in keys {
                self.request::<()>(Method::DELETE, &format!("{path}/{}", key.id), Some(zone), None)
                    .await?;
            }
        }
        info!(provider = %self.provider, zone = %zone, enable, "updated DNSSEC signing");
        Ok(())
    }
}

fn zone_path(zone: &str) -> String {
    format!("/zones/{}.", normalize_zone(zone))
}

/// PowerDNS provider.
#[derive(Debug)]
pub struct PowerDnsProvider {
    api: Api,
    default_ns: Vec<String>,
    zone_kind: String,
    // DNSSEC state seen by the last read of each zone.
    signed: Mutex<BTreeMap<String, bool>>,
}

/// Registry constructor.
///
/// # Errors
///
/// Returns an error listing every missing required key.
pub fn new_provider(name: &str, creds: &ProviderCredentials) -> Result<Arc<dyn DnsProvider>, ConfigError> {
    Ok(Arc::new(PowerDnsProvider::from_credentials(name, creds)?))
}

impl PowerDnsProvider {
    /// Build from credentials.
    ///
    /// # Errors
    ///
    /// See [`new_provider`].
    pub fn from_credentials(name: &str, creds: &ProviderCredentials) -> Result<Self, ConfigError> {
        check_credentials(name, creds, REQUIRED_KEYS, OPTIONAL_KEYS)?;
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ConfigError::InvalidCredential {
                provider: name.to_string(),
                key: "api_url".to_string(),
                reason: e.to_string(),
            })?;

        let raw_url = creds.get("api_url").unwrap_or_default();
        let parsed = url::Url::parse(raw_url).map_err(|e| ConfigError::InvalidCredential {
            provider: name.to_string(),
            key: "api_url".to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidCredential {
                provider: name.to_string(),
                key: "api_url".to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        let api_url = raw_url.trim_end_matches('/');
        let server_name = creds.get("server_name").unwrap_or_default();
        Ok(Self {
            api: Api {
                provider: name.to_string(),
                client,
                base: format!("{api_url}/api/v1/servers/{server_name}"),
                api_key: creds.get("api_key").unwrap_or_default().to_string(),
                retry: RetryPolicy::default(),
            },
            default_ns: split_list(creds.get("default_ns")),
            zone_kind: creds.get("zone_kind").unwrap_or("Native").to_string(),
            signed: Mutex::new(BTreeMap::new()),
        })
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.api.retry = retry;
        self
    }

    fn remember_signed(&self, zone: &str, signed: bool) {
        self.signed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(zone.to_string(), signed);
    }

    fn is_signed(&self, zone: &str) -> Option<bool> {
        self.signed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(zone)
            .copied()
    }

    fn patch_correction(&self, zone: &str, change: Change) -> Correction {
        let rrset = to_rrset(&change);
        let api = self.api.clone();
        let zone = zone.to_string();
        Correction::new(change.msg(), move || async move {
            let patch = Patch {
                rrsets: vec![rrset],
            };
            api.request(Method::PATCH, &zone_path(&zone), Some(&zone), Some(&patch))
                .await
                .map(|_| ())
        })
    }

    fn dnssec_correction(&self, dc: &DomainConfig) -> Option<Correction> {
        let signed = self.is_signed(&dc.name)?;
        let enable = match (dc.auto_dnssec, signed) {
            (AutoDnssec::On, false) => true,
            (AutoDnssec::Off, true) => false,
            _ => return None,
        };
        let api = self.api.clone();
        let zone = dc.name.clone();
        let msg = if enable {
            "Enable AutoDNSSEC"
        } else {
            "Disable AutoDNSSEC"
        };
        Some(Correction::new(msg, move || async move {
            api.set_dnssec(&zone, enable).await
        }))
    }
}

/// Rrset payload for one change.
#[must_use]
pub fn to_rrset(change: &Change) -> RrSet {
    let name = format!("{}.", change.key.name_fqdn);
    if change.kind == ChangeType::Delete {
        return RrSet {
            name,
            rtype: change.key.rtype.clone(),
            ttl: 0,
            changetype: Some("DELETE".to_string()),
            records: Vec::new(),
        };
    }
    RrSet {
        name,
        rtype: change.key.rtype.clone(),
        ttl: change.new.iter().map(|r| r.ttl).min().unwrap_or_default(),
        changetype: Some("REPLACE".to_string()),
        records: change
            .new
            .iter()
            .map(|r| PdnsRecord {
                content: r.rdata.to_string(),
                disabled: false,
            })
            .collect(),
    }
}

/// Convert an rrset read from the API into records.
///
/// Records whose content cannot be parsed are reported as errors.
///
/// # Errors
///
/// Returns the provider error for the first unparseable record.
pub fn from_rrset(provider: &str, zone: &str, rrset: &RrSet) -> Result<Vec<Record>, ProviderError> {
    rrset
        .records
        .iter()
        .filter(|r| !r.disabled)
        .map(|r| {
            let rdata = Rdata::parse(&rrset.rtype, &r.content).map_err(|e| ProviderError::Other {
                provider: provider.to_string(),
                reason: format!("cannot parse {} {}: {e}", rrset.name, rrset.rtype),
            })?;
            Ok(Record::from_fqdn(&rrset.name, zone, rrset.ttl, rdata)
                .with_original(Original::new(rrset.clone())))
        })
        .collect()
}

#[async_trait]
impl DnsProvider for PowerDnsProvider {
    fn name(&self) -> &str {
        &self.api.provider
    }

    fn provider_type(&self) -> &str {
        PROVIDER_TYPE
    }

    fn capabilities(&self) -> Capabilities {
        capabilities()
    }

    async fn list_zones(&self) -> Result<Vec<String>, ProviderError> {
        let text = self.api.request::<()>(Method::GET, "/zones", None, None).await?;
        let zones: Vec<ZoneInfo> = self.api.parse(&text)?;
        Ok(zones.iter().map(|z| normalize_zone(&z.name)).collect())
    }

    async fn ensure_zone_exists(&self, zone: &str) -> Result<(), ProviderError> {
        let zone = normalize_zone(zone);
        let failed = |reason: String| ProviderError::EnsureZoneFailed {
            provider: self.api.provider.clone(),
            zone: zone.clone(),
            reason,
        };
        match self.api.zone(&zone).await {
            Ok(_) => Ok(()),
            Err(ProviderError::ZoneNotFound { .. }) => {
                info!(provider = %self.api.provider, zone = %zone, "creating zone");
                let body = NewZone {
                    name: format!("{zone}."),
                    kind: self.zone_kind.clone(),
                    nameservers: self
                        .default_ns
                        .iter()
                        .map(|ns| format!("{}.", ns.trim_end_matches('.')))
                        .collect(),
                };
                self.api
                    .request(Method::POST, "/zones", None, Some(&body))
                    .await
                    .map(|_| ())
                    .map_err(|e| failed(e.to_string()))
            }
            Err(e) => Err(failed(e.to_string())),
        }
    }

    async fn get_nameservers(&self, zone: &str) -> Result<Vec<String>, ProviderError> {
        let zone = normalize_zone(zone);
        let info = self.api.zone(&zone).await?;
        let apex = format!("{zone}.");
        Ok(info
            .rrsets
            .iter()
            .filter(|s| s.rtype == "NS" && s.name == apex)
            .flat_map(|s| s.records.iter().map(|r| r.content.clone()))
            .collect())
    }

    async fn get_zone_records(
        &self,
        zone: &str,
        _meta: &BTreeMap<String, String>,
    ) -> Result<Vec<Record>, ProviderError> {
        let zone = normalize_zone(zone);
        let info = self.api.zone(&zone).await?;
        self.remember_signed(&zone, info.dnssec);

        let mut records = Vec::new();
        for rrset in info.rrsets.iter().filter(|s| s.rtype != "SOA") {
            records.extend(from_rrset(&self.api.provider, &zone, rrset)?);
        }
        debug!(provider = %self.api.provider, zone = %zone, count = records.len(), "read zone");
        Ok(records)
    }

    fn get_zone_records_corrections(
        &self,
        dc: &DomainConfig,
        mut existing: Vec<Record>,
    ) -> Result<Vec<Correction>, ZoneError> {
        // The server owns the apex NS set unless the configuration names one.
        let manages_apex_ns = dc.records.iter().any(|r| r.is_apex() && r.rtype() == "NS");
        if !manages_apex_ns {
            existing.retain(|r| !(r.is_apex() && r.rtype() == "NS"));
        }

        let plan = plan_changes(dc, &existing, dc.records.clone(), Granularity::ByRecordSet, None)?;
        let mut corrections = plan.into_corrections(|change| self.patch_correction(&dc.name, change));
        corrections.extend(self.dnssec_correction(dc));
        Ok(corrections)
    }
}

#[cfg(test)]
#[path = "powerdns_tests.rs"]
mod powerdns_tests;
