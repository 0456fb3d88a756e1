// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `RFC2136` provider: dynamic DNS updates (RFC 2136) with optional TSIG.
//!
//! Zones are read with AXFR over TCP. Plans are computed per record, every
//! replacement is split into a delete and a create, apex NS rotations are
//! wrapped in a placeholder NS, and changes at the same owner name are sent
//! together as one UPDATE message.
//!
//! Credentials:
//!
//! - `server` (required): `host` or `host:port`
//! - `key_name`, `key_algorithm`, `key_secret`: TSIG key, all or none
//! - `buggy_cname`: `true` for servers that reject a CNAME added in the same
//!   message that removes the name's other records

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hickory_client::client::{Client, SyncClient};
use hickory_client::op::{Message, MessageType, OpCode, Query, ResponseCode, UpdateMessage};
use hickory_client::rr::rdata::tsig::TsigAlgorithm;
use hickory_client::rr::{rdata, DNSClass, Name, RData, Record as DnsRecord, RecordType};
use hickory_client::tcp::TcpClientConnection;
use hickory_proto::rr::dnssec::tsig::TSigner;
use std::collections::BTreeMap;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    check_credentials, plan_changes, Capabilities, Capability, DnsProvider, Granularity,
};
use crate::config::ProviderCredentials;
use crate::constants::{DNS_EXCHANGE_TIMEOUT_SECS, DNS_PORT, TSIG_FUDGE_TIME_SECS};
use crate::diff::{split_changes, Change, ChangeType};
use crate::errors::{ConfigError, ProviderError, ZoneError};
use crate::models::{normalize_zone, split_txt, Correction, DomainConfig, Original, Rdata, Record};
use crate::ordering::{submission_batches, wrap_last_ns};

/// Registered type name.
pub const PROVIDER_TYPE: &str = "RFC2136";

const REQUIRED_KEYS: &[&str] = &["server"];
const OPTIONAL_KEYS: &[&str] = &["key_name", "key_algorithm", "key_secret", "buggy_cname"];

/// Types never read back from a transfer.
const SKIPPED_TYPES: &[RecordType] = &[
    RecordType::SOA,
    RecordType::RRSIG,
    RecordType::NSEC,
    RecordType::NSEC3,
    RecordType::NSEC3PARAM,
    RecordType::DNSKEY,
];

/// Capabilities of every RFC 2136 provider.
#[must_use]
pub fn capabilities() -> Capabilities {
    [
        Capability::CanUsePtr,
        Capability::CanUseSrv,
        Capability::CanConcur,
        Capability::DocOfficiallySupported,
    ]
    .into_iter()
    .collect()
}

/// TSIG key material.
#[derive(Debug, Clone)]
pub struct TsigKey {
    /// Key name
    pub name: String,
    /// HMAC algorithm
    pub algorithm: TsigAlgorithm,
    /// Decoded secret
    pub secret: Vec<u8>,
}

/// Connection settings.
#[derive(Debug, Clone)]
struct Settings {
    provider: String,
    server: String,
    tsig: Option<TsigKey>,
    buggy_cname: bool,
}

/// Flags an exchange as abandoned when the future awaiting it goes away.
struct AbandonOnDrop(Arc<AtomicBool>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// RFC 2136 provider.
#[derive(Debug, Clone)]
pub struct Rfc2136Provider {
    settings: Arc<Settings>,
}

/// Registry constructor.
///
/// # Errors
///
/// Returns an error if `server` is missing, the TSIG key is incomplete or
/// malformed, or `buggy_cname` is not a boolean.
pub fn new_provider(name: &str, creds: &ProviderCredentials) -> Result<Arc<dyn DnsProvider>, ConfigError> {
    Ok(Arc::new(Rfc2136Provider::from_credentials(name, creds)?))
}

/// Map an algorithm name to its TSIG algorithm.
///
/// Accepts `hmac-sha256` and `sha256` spellings, case-insensitively.
///
/// # Errors
///
/// Returns the unrecognised name.
pub fn parse_algorithm(name: &str) -> Result<TsigAlgorithm, String> {
    let lower = name.to_ascii_lowercase();
    let short = lower.trim_start_matches("hmac-");
    Ok(match short {
        "md5" | "md5.sig-alg.reg.int" => TsigAlgorithm::HmacMd5,
        "sha1" => TsigAlgorithm::HmacSha1,
        "sha224" => TsigAlgorithm::HmacSha224,
        "sha256" => TsigAlgorithm::HmacSha256,
        "sha384" => TsigAlgorithm::HmacSha384,
        "sha512" => TsigAlgorithm::HmacSha512,
        _ => return Err(format!("unsupported TSIG algorithm '{name}'")),
    })
}

impl Rfc2136Provider {
    /// Build from credentials.
    ///
    /// # Errors
    ///
    /// See [`new_provider`].
    pub fn from_credentials(name: &str, creds: &ProviderCredentials) -> Result<Self, ConfigError> {
        check_credentials(name, creds, REQUIRED_KEYS, OPTIONAL_KEYS)?;
        let invalid = |key: &str, reason: String| ConfigError::InvalidCredential {
            provider: name.to_string(),
            key: key.to_string(),
            reason,
        };

        let tsig = match (creds.get("key_name"), creds.get("key_secret")) {
            (None, None) => None,
            (Some(key_name), Some(secret)) => {
                let algorithm = parse_algorithm(creds.get("key_algorithm").unwrap_or("hmac-sha256"))
                    .map_err(|e| invalid("key_algorithm", e))?;
                let secret = BASE64
                    .decode(secret)
                    .map_err(|e| invalid("key_secret", e.to_string()))?;
                Some(TsigKey {
                    name: key_name.to_string(),
                    algorithm,
                    secret,
                })
            }
            (Some(_), None) => {
                return Err(ConfigError::MissingCredentials {
                    provider: name.to_string(),
                    keys: vec!["key_secret".to_string()],
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingCredentials {
                    provider: name.to_string(),
                    keys: vec!["key_name".to_string()],
                })
            }
        };

        let buggy_cname = match creds.get("buggy_cname") {
            Some(v) => v
                .parse()
                .map_err(|e: std::str::ParseBoolError| invalid("buggy_cname", e.to_string()))?,
            None => false,
        };

        Ok(Self {
            settings: Arc::new(Settings {
                provider: name.to_string(),
                server: creds.get("server").unwrap_or_default().to_string(),
                tsig,
                buggy_cname,
            }),
        })
    }

    /// Run a blocking DNS exchange off the async runtime.
    ///
    /// A blocking thread cannot be cancelled. If the awaiting future is dropped
    /// (the zone timed out) the flag passed to `operation` is set, and an
    /// exchange that has not sent anything yet must stop. One already on the
    /// wire runs to completion, bounded by the TCP timeout.
    async fn blocking<T, F>(&self, operation: F) -> Result<T, ProviderError>
    where
        T: Send + 'static,
        F: FnOnce(&Settings, &AtomicBool) -> Result<T, ProviderError> + Send + 'static,
    {
        let settings = self.settings.clone();
        let provider = settings.provider.clone();
        let abandoned = Arc::new(AtomicBool::new(false));
        let _guard = AbandonOnDrop(abandoned.clone());
        tokio::task::spawn_blocking(move || operation(&settings, &abandoned))
            .await
            .map_err(|e| ProviderError::Other {
                provider,
                reason: format!("DNS task failed: {e}"),
            })?
    }
}

/// Plan the UPDATE batches for a zone.
///
/// Returns the batches, in submission order, and informational messages.
///
/// # Errors
///
/// Returns an error if the hands-off policy rejects the zone.
pub fn plan_batches(
    dc: &DomainConfig,
    existing: &[Record],
    buggy_cname: bool,
) -> Result<(Vec<Vec<Change>>, Vec<String>), ZoneError> {
    let plan = plan_changes(dc, existing, dc.records.clone(), Granularity::ByRecord, None)?;
    let (reports, edits): (Vec<Change>, Vec<Change>) = plan
        .changes
        .into_iter()
        .partition(|c| c.kind == ChangeType::Report);

    let mut messages = plan.messages;
    messages.extend(reports.iter().map(Change::msg));

    let edits = wrap_last_ns(split_changes(edits), &dc.name);
    Ok((submission_batches(edits, buggy_cname), messages))
}

fn connect(settings: &Settings) -> Result<SyncClient<TcpClientConnection>, ProviderError> {
    let transient = |reason: String| ProviderError::Transient {
        provider: settings.provider.clone(),
        reason,
    };
    let addr = resolve(&settings.server).map_err(transient)?;
    let timeout = Duration::from_secs(DNS_EXCHANGE_TIMEOUT_SECS);
    let conn = TcpClientConnection::with_timeout(addr, timeout)
        .map_err(|e| transient(format!("failed to connect to {addr}: {e}")))?;

    match &settings.tsig {
        Some(key) => {
            let signer = TSigner::new(
                key.secret.clone(),
                key.algorithm.clone(),
                Name::from_str(&key.name).map_err(|e| ProviderError::Other {
                    provider: settings.provider.clone(),
                    reason: format!("invalid TSIG key name: {e}"),
                })?,
                u16::try_from(TSIG_FUDGE_TIME_SECS).unwrap_or(300),
            )
            .map_err(|e| ProviderError::Other {
                provider: settings.provider.clone(),
                reason: format!("failed to create TSIG signer: {e}"),
            })?;
            Ok(SyncClient::with_tsigner(conn, signer))
        }
        None => Ok(SyncClient::new(conn)),
    }
}

fn resolve(server: &str) -> Result<SocketAddr, String> {
    if let Ok(addr) = server.parse::<SocketAddr>() {
        return Ok(addr);
    }
    let with_port = if server.contains(':') {
        server.to_string()
    } else {
        format!("{server}:{DNS_PORT}")
    };
    with_port
        .to_socket_addrs()
        .map_err(|e| format!("cannot resolve {server}: {e}"))?
        .next()
        .ok_or_else(|| format!("no address for {server}"))
}

fn zone_name(provider: &str, zone: &str) -> Result<Name, ProviderError> {
    Name::from_str(&format!("{}.", normalize_zone(zone))).map_err(|e| ProviderError::Other {
        provider: provider.to_string(),
        reason: format!("invalid zone name '{zone}': {e}"),
    })
}

fn rcode_error(provider: &str, zone: &str, code: ResponseCode) -> ProviderError {
    match code {
        ResponseCode::NotAuth | ResponseCode::Refused => ProviderError::AuthenticationFailed {
            provider: provider.to_string(),
            reason: format!("server answered {code:?}"),
        },
        ResponseCode::NotZone | ResponseCode::NXDomain => ProviderError::ZoneNotFound {
            provider: provider.to_string(),
            zone: zone.to_string(),
        },
        ResponseCode::ServFail => ProviderError::Transient {
            provider: provider.to_string(),
            reason: "server answered SERVFAIL".to_string(),
        },
        other => ProviderError::UpdateRejected {
            provider: provider.to_string(),
            rcode: format!("{other:?}"),
        },
    }
}

/// Convert record data to its wire form.
///
/// # Errors
///
/// Returns a message for types this provider cannot send.
pub fn to_wire(rdata: &Rdata) -> Result<RData, String> {
    let name = |target: &str| Name::from_str(target).map_err(|e| format!("invalid name '{target}': {e}"));
    Ok(match rdata {
        Rdata::A(ip) => RData::A(rdata::A(*ip)),
        Rdata::Aaaa(ip) => RData::AAAA(rdata::AAAA(*ip)),
        Rdata::Cname(target) => RData::CNAME(rdata::CNAME(name(target)?)),
        Rdata::Ns(target) => RData::NS(rdata::NS(name(target)?)),
        Rdata::Ptr(target) => RData::PTR(rdata::PTR(name(target)?)),
        Rdata::Mx {
            preference,
            exchange,
        } => RData::MX(rdata::MX::new(*preference, name(exchange)?)),
        Rdata::Srv {
            priority,
            weight,
            port,
            target,
        } => RData::SRV(rdata::SRV::new(*priority, *weight, *port, name(target)?)),
        Rdata::Txt(segments) => RData::TXT(rdata::TXT::new(split_txt(&segments.concat()))),
        other => return Err(format!("{} records are not supported", other.rtype())),
    })
}

/// Convert hickory record data back into [`Rdata`].
///
/// TXT keeps its character-strings as segments; everything else goes through
/// its presentation form.
///
/// # Errors
///
/// Returns a message if the presentation form cannot be parsed.
pub fn rdata_from_wire(data: &RData, rtype: RecordType) -> Result<Rdata, String> {
    match data {
        RData::TXT(txt) => Ok(Rdata::Txt(
            txt.txt_data()
                .iter()
                .map(|bytes| String::from_utf8_lossy(bytes).to_string())
                .collect(),
        )),
        other => Rdata::parse(&rtype.to_string(), &other.to_string()).map_err(|e| e.to_string()),
    }
}

/// Convert a transferred record, if it is one the provider manages.
#[must_use]
pub fn from_wire(record: &DnsRecord, zone: &str) -> Option<Record> {
    if SKIPPED_TYPES.contains(&record.record_type()) {
        return None;
    }
    let rdata = match rdata_from_wire(record.data()?, record.record_type()) {
        Ok(rdata) => rdata,
        Err(e) => {
            warn!(name = %record.name(), error = %e, "skipping unparseable record");
            return None;
        }
    };
    let name = record.name().to_string();
    Some(Record::from_fqdn(&name, zone, record.ttl(), rdata).with_original(Original::new(record.clone())))
}

/// Build one UPDATE message for a batch.
///
/// # Errors
///
/// Returns an error if a record cannot be encoded.
pub fn build_update(provider: &str, zone: &str, batch: &[Change]) -> Result<Message, ProviderError> {
    let origin = zone_name(provider, zone)?;
    let mut query = Query::new();
    query
        .set_name(origin)
        .set_query_class(DNSClass::IN)
        .set_query_type(RecordType::SOA);

    let mut message = Message::new();
    message
        .set_id(rand::random())
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Update)
        .set_recursion_desired(false);
    message.add_zone(query);

    for change in batch {
        let (records, deleting) = match change.kind {
            ChangeType::Delete => (&change.old, true),
            ChangeType::Create => (&change.new, false),
            ChangeType::Report | ChangeType::Change => continue,
        };
        for record in records {
            let wire = to_wire(&record.rdata).map_err(|reason| ProviderError::Unsupported {
                provider: provider.to_string(),
                operation: reason,
            })?;
            let owner = zone_name(provider, &record.name_fqdn)?;
            let mut rr = DnsRecord::from_rdata(owner, if deleting { 0 } else { record.ttl }, wire);
            rr.set_dns_class(if deleting { DNSClass::NONE } else { DNSClass::IN });
            message.add_update(rr);
        }
    }
    Ok(message)
}

#[async_trait]
impl DnsProvider for Rfc2136Provider {
    fn name(&self) -> &str {
        &self.settings.provider
    }

    fn provider_type(&self) -> &str {
        PROVIDER_TYPE
    }

    fn capabilities(&self) -> Capabilities {
        capabilities()
    }

    async fn ensure_zone_exists(&self, zone: &str) -> Result<(), ProviderError> {
        let zone = normalize_zone(zone);
        self.blocking(move |settings, _| {
            let client = connect(settings)?;
            let origin = zone_name(&settings.provider, &zone)?;
            let response = client
                .query(&origin, DNSClass::IN, RecordType::SOA)
                .map_err(|e| ProviderError::EnsureZoneFailed {
                    provider: settings.provider.clone(),
                    zone: zone.clone(),
                    reason: e.to_string(),
                })?;
            if response.answers().iter().any(|r| r.record_type() == RecordType::SOA) {
                Ok(())
            } else {
                Err(ProviderError::EnsureZoneFailed {
                    provider: settings.provider.clone(),
                    zone,
                    reason: "zone has no SOA and cannot be created over RFC 2136".to_string(),
                })
            }
        })
        .await
    }

    async fn get_nameservers(&self, zone: &str) -> Result<Vec<String>, ProviderError> {
        let zone = normalize_zone(zone);
        self.blocking(move |settings, _| {
            let client = connect(settings)?;
            let origin = zone_name(&settings.provider, &zone)?;
            let response = client
                .query(&origin, DNSClass::IN, RecordType::NS)
                .map_err(|e| ProviderError::Transient {
                    provider: settings.provider.clone(),
                    reason: e.to_string(),
                })?;
            Ok(response
                .answers()
                .iter()
                .filter_map(|r| match r.data() {
                    Some(RData::NS(ns)) => Some(ns.0.to_string()),
                    _ => None,
                })
                .collect())
        })
        .await
    }

    async fn get_zone_records(
        &self,
        zone: &str,
        _meta: &BTreeMap<String, String>,
    ) -> Result<Vec<Record>, ProviderError> {
        let zone = normalize_zone(zone);
        self.blocking(move |settings, _| {
            let client = connect(settings)?;
            let origin = zone_name(&settings.provider, &zone)?;
            let transfer = client
                .zone_transfer(&origin, None)
                .map_err(|e| ProviderError::Transient {
                    provider: settings.provider.clone(),
                    reason: format!("AXFR failed: {e}"),
                })?;

            let mut records = Vec::new();
            for response in transfer {
                let response = response.map_err(|e| ProviderError::Transient {
                    provider: settings.provider.clone(),
                    reason: format!("AXFR failed: {e}"),
                })?;
                if response.response_code() != ResponseCode::NoError {
                    return Err(rcode_error(&settings.provider, &zone, response.response_code()));
                }
                records.extend(response.answers().iter().filter_map(|rr| from_wire(rr, &zone)));
            }
            debug!(provider = %settings.provider, zone = %zone, count = records.len(), "zone transferred");
            Ok(records)
        })
        .await
    }

    fn get_zone_records_corrections(
        &self,
        dc: &DomainConfig,
        existing: Vec<Record>,
    ) -> Result<Vec<Correction>, ZoneError> {
        let (batches, messages) = plan_batches(dc, &existing, self.settings.buggy_cname)?;
        let mut corrections: Vec<Correction> = messages.into_iter().map(Correction::report).collect();

        for batch in batches {
            let msg = batch.iter().map(Change::msg).collect::<Vec<_>>().join("\n");
            let zone = dc.name.clone();
            let this = self.clone();
            corrections.push(Correction::new(msg, move || async move {
                this.blocking(move |settings, abandoned| {
                    let message = build_update(&settings.provider, &zone, &batch)?;
                    let client = connect(settings)?;
                    if abandoned.load(Ordering::SeqCst) {
                        return Err(ProviderError::Other {
                            provider: settings.provider.clone(),
                            reason: "zone abandoned before the UPDATE was sent".to_string(),
                        });
                    }
                    let responses = client.send(message);
                    for response in responses {
                        let response = response.map_err(|e| ProviderError::Transient {
                            provider: settings.provider.clone(),
                            reason: format!("UPDATE failed: {e}"),
                        })?;
                        let code = response.response_code();
                        if code != ResponseCode::NoError {
                            return Err(rcode_error(&settings.provider, &zone, code));
                        }
                    }
                    info!(provider = %settings.provider, zone = %zone, changes = batch.len(), "UPDATE accepted");
                    Ok(())
                })
                .await
            }));
        }
        Ok(corrections)
    }
}

#[cfg(test)]
#[path = "rfc2136_tests.rs"]
mod rfc2136_tests;
