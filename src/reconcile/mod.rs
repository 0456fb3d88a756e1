// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation driver.
//!
//! For every zone:
//!
//! 1. **Check** - refuse records and features the zone's providers cannot serve
//! 2. **Read** - make sure the zone exists and load what is there
//! 3. **Plan** - ask each provider for its ordered corrections
//! 4. **Apply** - print each correction and run it unless previewing
//! 5. **Delegate** - point the registrar at the zone's nameservers
//!
//! Zones whose providers all declare `CanConcur` run in parallel; the rest run
//! one after another. Each zone has its own timeout and output buffer.

pub mod report;

use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::{Credentials, DnsConfig, ProviderCredentials};
use crate::constants::{DEFAULT_ZONE_CONCURRENCY, DEFAULT_ZONE_TIMEOUT_SECS};
use crate::errors::{ConfigError, ZoneError};
use crate::metrics::{record_correction, record_zone};
use crate::models::{Correction, DomainConfig};
use crate::providers::registrar::normalize_nameservers;
use crate::providers::{
    check_capabilities, Capabilities, Capability, DnsProvider, ProviderProfile, Registrar,
    Registry,
};

pub use report::{RunSummary, ZoneReport};

/// How a run behaves.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Print corrections without running them
    pub dry_run: bool,
    /// Per-zone time limit
    pub zone_timeout: Duration,
    /// Zones processed at once
    pub concurrency: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: true,
            zone_timeout: Duration::from_secs(DEFAULT_ZONE_TIMEOUT_SECS),
            concurrency: DEFAULT_ZONE_CONCURRENCY,
        }
    }
}

/// A zone and the backends it is pushed to.
#[derive(Clone)]
pub struct ZoneTarget {
    /// Normalized zone
    pub dc: DomainConfig,
    /// DNS providers serving the zone
    pub providers: Vec<Arc<dyn DnsProvider>>,
    /// Registrar holding the delegation, if managed
    pub registrar: Option<Arc<dyn Registrar>>,
}

impl ZoneTarget {
    /// True if every provider may run alongside other zones.
    #[must_use]
    pub fn can_concur(&self) -> bool {
        self.providers
            .iter()
            .all(|p| p.capabilities().has(Capability::CanConcur))
    }
}

/// Instantiate providers and pair them with zones.
///
/// Each provider and registrar is built once and shared by every zone that
/// names it. A non-empty `only_providers` drops every other provider and
/// registrar.
///
/// # Errors
///
/// Returns the first provider whose construction fails, or a zone naming a
/// provider with neither credentials nor a declared type.
pub fn build_targets(
    config: &DnsConfig,
    domains: Vec<DomainConfig>,
    creds: &Credentials,
    registry: &Registry,
    only_providers: &[String],
) -> Result<Vec<ZoneTarget>, ConfigError> {
    let wanted = |name: &str| only_providers.is_empty() || only_providers.iter().any(|p| p == name);
    let creds_for = |name: &str| {
        let mut c: ProviderCredentials = creds.get(name).cloned().unwrap_or_default();
        if c.provider_type.is_none() {
            c.provider_type = config.declared_type(name).map(ToString::to_string);
        }
        c
    };

    let mut providers: BTreeMap<String, Arc<dyn DnsProvider>> = BTreeMap::new();
    let mut registrars: BTreeMap<String, Arc<dyn Registrar>> = BTreeMap::new();
    let mut targets = Vec::with_capacity(domains.len());

    for dc in domains {
        let mut zone_providers = Vec::new();
        for name in dc.dns_providers.iter().filter(|n| wanted(n)) {
            if creds.get(name).is_none() && config.declared_type(name).is_none() {
                return Err(ConfigError::UndefinedProvider {
                    zone: dc.name.clone(),
                    provider: name.clone(),
                });
            }
            if let Some(p) = providers.get(name) {
                zone_providers.push(p.clone());
                continue;
            }
            let p = registry.create_provider(name, &creds_for(name))?;
            debug!(provider = %name, provider_type = %p.provider_type(), "provider ready");
            providers.insert(name.clone(), p.clone());
            zone_providers.push(p);
        }

        let registrar = match dc.registrar.as_deref().filter(|r| wanted(r)) {
            None => None,
            Some(name) => {
                if let Some(r) = registrars.get(name) {
                    Some(r.clone())
                } else {
                    let r = registry.create_registrar(name, &creds_for(name))?;
                    registrars.insert(name.to_string(), r.clone());
                    Some(r)
                }
            }
        };

        targets.push(ZoneTarget {
            dc,
            providers: zone_providers,
            registrar,
        });
    }
    Ok(targets)
}

/// Reconcile one zone, writing progress to `report`.
///
/// # Errors
///
/// Returns the error that stopped the zone: failed capability checks, an
/// unreachable or rejecting backend, or a hands-off conflict. Failures of
/// individual corrections are recorded in `report` instead.
pub async fn reconcile_zone(
    target: &ZoneTarget,
    registry: &Registry,
    opts: RunOptions,
    report: &mut ZoneReport,
) -> Result<(), ZoneError> {
    let dc = &target.dc;
    check_zone_capabilities(target, registry)?;

    for provider in &target.providers {
        report.line(format!("----- DNS Provider: {}", provider.name()));
        provider.ensure_zone_exists(&dc.name).await?;
        let existing = provider
            .get_zone_records(&dc.name, &dc.provider_meta(provider.name()))
            .await?;
        debug!(zone = %dc.name, provider = %provider.name(), existing = existing.len(), "loaded zone");

        let corrections = provider.get_zone_records_corrections(dc, existing)?;
        apply_corrections(provider.name(), corrections, opts, report).await?;
    }

    if let Some(registrar) = &target.registrar {
        report.line(format!("----- Registrar: {}", registrar.name()));
        let mut delegated = dc.clone();
        if delegated.nameservers.is_empty() {
            delegated.nameservers = provider_nameservers(target).await?;
        }
        if delegated.nameservers.is_empty() {
            report.line("no nameservers to delegate to, skipping registrar");
            return Ok(());
        }
        let corrections = registrar.get_registrar_corrections(&delegated).await?;
        apply_corrections(registrar.name(), corrections, opts, report).await?;
    }
    Ok(())
}

fn check_zone_capabilities(target: &ZoneTarget, registry: &Registry) -> Result<(), ZoneError> {
    let caps: Vec<Capabilities> = target.providers.iter().map(|p| p.capabilities()).collect();
    let profiles: Vec<ProviderProfile<'_>> = target
        .providers
        .iter()
        .zip(&caps)
        .map(|(p, capabilities)| ProviderProfile {
            name: p.name(),
            provider_type: p.provider_type(),
            capabilities,
        })
        .collect();
    let errors = check_capabilities(&target.dc, &profiles, |rtype| registry.custom_type_owner(rtype));
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ZoneError::Validation(errors))
    }
}

/// Nameservers reported by the zone's providers, normalized and deduplicated.
async fn provider_nameservers(target: &ZoneTarget) -> Result<Vec<String>, ZoneError> {
    let mut all = Vec::new();
    for provider in &target.providers {
        all.extend(provider.get_nameservers(&target.dc.name).await?);
    }
    Ok(normalize_nameservers(&all))
}

/// Print and run corrections in the order given.
///
/// A failed correction is recorded and the next one runs, unless the failure
/// is fatal, which stops the zone.
async fn apply_corrections(
    provider: &str,
    corrections: Vec<Correction>,
    opts: RunOptions,
    report: &mut ZoneReport,
) -> Result<(), ZoneError> {
    let actionable = corrections.iter().filter(|c| !c.is_report()).count();
    report.planned += actionable;
    report.line(format!("{actionable} correction(s)"));

    let mut n = 0;
    for correction in corrections {
        if correction.is_report() {
            report.line(&correction.msg);
            record_correction(provider, "report");
            continue;
        }
        n += 1;
        report.line(format!("#{n}: {}", correction.msg));
        if opts.dry_run {
            record_correction(provider, "skipped");
            continue;
        }
        match correction.execute().await {
            Ok(()) => {
                report.executed += 1;
                report.line("SUCCESS!");
                record_correction(provider, "executed");
            }
            Err(err) => {
                report.failed += 1;
                report.line(format!("FAILURE! {err}"));
                record_correction(provider, "failed");
                if err.is_fatal() {
                    return Err(err.into());
                }
                warn!(zone = %report.zone, provider = %provider, error = %err, "correction failed");
                report.record_error(err.into());
            }
        }
    }
    Ok(())
}

/// Run one zone under its timeout. Never fails; problems land in the report.
pub async fn process_zone(target: &ZoneTarget, registry: &Registry, opts: RunOptions) -> ZoneReport {
    let mut report = ZoneReport::new(&target.dc.name);
    report.line(format!("******************** Domain: {}", target.dc.name));
    let started = Instant::now();

    let result = tokio::time::timeout(
        opts.zone_timeout,
        reconcile_zone(target, registry, opts, &mut report),
    )
    .await;
    match result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            error!(zone = %target.dc.name, reason = err.reason(), error = %err, "zone aborted");
            report.abort(err);
        }
        Err(_) => {
            error!(zone = %target.dc.name, secs = opts.zone_timeout.as_secs(), "zone timed out");
            report.abort(ZoneError::Timeout {
                zone: target.dc.name.clone(),
                secs: opts.zone_timeout.as_secs(),
            });
        }
    }

    record_zone(report.outcome(), started.elapsed());
    report
}

/// Reconcile every target, flushing each zone's output to `out` as it finishes.
///
/// # Errors
///
/// Returns an error only if writing to `out` fails.
pub async fn run<W: Write>(
    targets: &[ZoneTarget],
    registry: &Registry,
    opts: RunOptions,
    out: &mut W,
) -> std::io::Result<RunSummary> {
    let (parallel, serial): (Vec<_>, Vec<_>) = targets
        .iter()
        .enumerate()
        .partition(|(_, t)| t.can_concur());
    info!(
        zones = targets.len(),
        parallel = parallel.len(),
        serial = serial.len(),
        dry_run = opts.dry_run,
        "starting run"
    );

    let mut done: Vec<(usize, ZoneReport)> = Vec::with_capacity(targets.len());

    let mut reports = stream::iter(parallel)
        .map(|(i, target)| async move { (i, process_zone(target, registry, opts).await) })
        .buffer_unordered(opts.concurrency.max(1));
    while let Some((i, report)) = reports.next().await {
        report.flush(out)?;
        done.push((i, report));
    }

    for (i, target) in serial {
        let report = process_zone(target, registry, opts).await;
        report.flush(out)?;
        done.push((i, report));
    }

    done.sort_by_key(|(i, _)| *i);
    Ok(RunSummary::new(done.into_iter().map(|(_, r)| r).collect()))
}
