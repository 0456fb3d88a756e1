// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Turn user-authored zones into canonical [`DomainConfig`]s.
//!
//! Per zone: default TTLs, type and rdata validation, label checks, target
//! canonicalization, owner FQDNs, `IMPORT_TRANSFORM` expansion, per-record
//! `transform` metadata and the CNAME exclusivity check. Findings accumulate
//! across zones; a zone with errors is rejected without affecting the others.

pub mod import_transform;
pub mod ip_transform;
pub mod validate;

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::config::{DnsConfig, DomainSpec, RawRecord};
use crate::constants::{DEFAULT_DNS_RECORD_TTL_SECS, META_TRANSFORM_TABLE};
use crate::errors::ValidationError;
use crate::models::{normalize_zone, DomainConfig, Rdata, Record, UnmanagedConfig};

use import_transform::{apply_record_transforms, expand_import, PendingImport};
use validate::{canonicalize_rdata, check_cname_exclusivity, check_label, classify_type, TypeClass};

/// Result of normalizing a whole configuration.
#[derive(Debug, Default)]
pub struct Normalized {
    /// Zones that passed validation, in configuration order
    pub domains: Vec<DomainConfig>,
    /// Every error and warning found
    pub findings: Vec<ValidationError>,
    /// Zones dropped because of errors
    pub rejected: BTreeSet<String>,
}

impl Normalized {
    /// Findings that are errors.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationError> {
        self.findings.iter().filter(|f| !f.is_warning())
    }

    /// Findings that are warnings.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationError> {
        self.findings.iter().filter(|f| f.is_warning())
    }

    /// True if any finding is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }
}

/// Records of one zone after the per-record steps, before imports.
#[derive(Debug, Default)]
struct Stage {
    records: Vec<Record>,
    absent: Vec<Record>,
    imports: Vec<PendingImport>,
    findings: Vec<ValidationError>,
}

/// Normalize every domain in `config`.
///
/// `custom_types` lists the provider-owned record types that are accepted.
#[must_use]
pub fn normalize(config: &DnsConfig, custom_types: &BTreeSet<String>) -> Normalized {
    let stages: Vec<(String, Stage)> = config
        .domains
        .iter()
        .map(|spec| (normalize_zone(&spec.name), stage_records(spec, custom_types)))
        .collect();

    // Imports read the source zone as authored, before its own imports.
    let by_zone: BTreeMap<&str, &[Record]> = stages
        .iter()
        .map(|(zone, stage)| (zone.as_str(), stage.records.as_slice()))
        .collect();

    let mut expanded: Vec<(Vec<Record>, Vec<ValidationError>)> = Vec::with_capacity(stages.len());
    for (zone, stage) in &stages {
        let mut records = stage.records.clone();
        let mut findings = Vec::new();
        for import in &stage.imports {
            let Some(source) = by_zone.get(import.source_zone.as_str()) else {
                findings.push(ValidationError::ImportSourceMissing {
                    zone: zone.clone(),
                    source_zone: import.source_zone.clone(),
                });
                continue;
            };
            match expand_import(zone, import, source, &records) {
                Ok(imported) => {
                    debug!(zone = %zone, source = %import.source_zone, count = imported.len(), "expanded IMPORT_TRANSFORM");
                    records.extend(imported);
                }
                Err(e) => findings.push(e),
            }
        }
        expanded.push((records, findings));
    }

    let mut out = Normalized::default();
    for ((spec, (zone, stage)), (records, import_findings)) in
        config.domains.iter().zip(stages).zip(expanded)
    {
        let mut findings = stage.findings;
        findings.extend(import_findings);

        let records = match apply_record_transforms(&zone, records) {
            Ok(r) => r,
            Err(errors) => {
                findings.extend(errors);
                Vec::new()
            }
        };
        findings.extend(check_cname_exclusivity(&zone, &records));

        let failed = findings.iter().any(|f| !f.is_warning());
        out.findings.extend(findings);
        if failed {
            out.rejected.insert(zone);
            continue;
        }
        out.domains
            .push(build_domain(spec, zone, records, stage.absent));
    }
    out
}

fn stage_records(spec: &DomainSpec, custom_types: &BTreeSet<String>) -> Stage {
    let zone = normalize_zone(&spec.name);
    let mut stage = Stage::default();
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();

    for raw in &spec.records {
        let rtype = raw.rtype.trim().to_ascii_uppercase();
        let ttl = raw
            .ttl
            .filter(|t| *t != 0)
            .unwrap_or(DEFAULT_DNS_RECORD_TTL_SECS);

        match check_label(&zone, raw.name.trim(), &rtype) {
            Ok(Some(warning)) => stage.findings.push(warning),
            Ok(None) => {}
            Err(e) => {
                stage.findings.push(e);
                continue;
            }
        }

        let rdata = match classify_type(&rtype, custom_types) {
            TypeClass::Standard => match Rdata::parse(&rtype, &raw.target) {
                Ok(mut rdata) => {
                    canonicalize_rdata(&mut rdata, &zone);
                    rdata
                }
                Err(e) => {
                    stage.findings.push(ValidationError::InvalidRecordData {
                        zone: zone.clone(),
                        label: raw.name.clone(),
                        rtype,
                        reason: e.reason,
                    });
                    continue;
                }
            },
            TypeClass::Pseudo => {
                stage.imports.push(pending_import(raw, ttl));
                continue;
            }
            TypeClass::Custom => Rdata::Custom {
                rtype: rtype.clone(),
                content: raw.target.trim().to_string(),
            },
            TypeClass::Unknown => {
                stage.findings.push(ValidationError::UnknownRecordType {
                    zone: zone.clone(),
                    label: raw.name.clone(),
                    rtype,
                });
                continue;
            }
        };

        let mut record = Record::new(&raw.name, &zone, ttl, rdata);
        record.metadata = raw.meta.clone();

        if raw.ensure_absent {
            stage.absent.push(record);
            continue;
        }
        if !seen.insert((record.key().to_string(), record.comparable())) {
            stage.findings.push(ValidationError::InvalidRecordData {
                zone: zone.clone(),
                label: record.label.clone(),
                rtype: record.rtype().to_string(),
                reason: format!("duplicate record {}", record.rdata),
            });
            continue;
        }
        stage.records.push(record);
    }
    stage
}

fn pending_import(raw: &RawRecord, ttl: u32) -> PendingImport {
    PendingImport {
        source_zone: normalize_zone(&raw.target),
        table: raw
            .meta
            .get(META_TRANSFORM_TABLE)
            .cloned()
            .unwrap_or_default(),
        ttl,
    }
}

fn build_domain(
    spec: &DomainSpec,
    zone: String,
    records: Vec<Record>,
    absent: Vec<Record>,
) -> DomainConfig {
    let nameservers: Vec<String> = spec
        .nameservers
        .iter()
        .map(|ns| normalize_zone(ns))
        .filter(|ns| !ns.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let unmanaged = spec
        .unmanaged
        .iter()
        .map(|u| UnmanagedConfig {
            label_pattern: u.label_pattern.trim().to_string(),
            rtypes: u
                .rtypes
                .iter()
                .map(|t| t.trim().to_ascii_uppercase())
                .filter(|t| !t.is_empty() && t != "*")
                .collect(),
            target_pattern: u.target_pattern.trim().to_string(),
        })
        .collect();

    DomainConfig {
        name: zone,
        registrar: spec.registrar.clone(),
        dns_providers: spec.dns_providers.clone(),
        records,
        nameservers,
        unmanaged,
        ensure_absent: absent,
        no_purge: spec.no_purge,
        auto_dnssec: spec.auto_dnssec,
        ignore_external_dns: spec.ignore_external_dns,
        external_dns_prefix: spec.external_dns_prefix.trim().to_ascii_lowercase(),
        unmanaged_safety_check: !spec.unmanaged_disable_safety_check,
        metadata: spec.meta.clone(),
        provider_metadata: spec.provider_meta.clone(),
    }
}
