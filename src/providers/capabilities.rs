// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Provider capability flags and the pre-planning capability check.

use std::collections::BTreeSet;
use std::fmt;

use crate::errors::ValidationError;
use crate::models::{AutoDnssec, DomainConfig};

/// Features a provider may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// Can list the zones it hosts
    CanGetZones,
    CanUseAlias,
    CanUseCaa,
    CanUseDs,
    CanUseNaptr,
    CanUseSrv,
    CanUseSshfp,
    CanUseTlsa,
    CanUsePtr,
    CanUseLoc,
    CanUseSvcb,
    CanUseHttps,
    /// Can sign zones on request
    CanAutoDnssec,
    /// Safe to drive several zones in parallel
    CanConcur,
    /// Creates zones that do not exist yet
    DocCreateDomains,
    /// Can serve a zone alongside another provider
    DocDualHost,
    /// Maintained alongside the core
    DocOfficiallySupported,
}

impl Capability {
    /// Capability needed to use a record type, if any.
    #[must_use]
    pub fn for_record_type(rtype: &str) -> Option<Self> {
        Some(match rtype {
            "ALIAS" => Self::CanUseAlias,
            "CAA" => Self::CanUseCaa,
            "DS" => Self::CanUseDs,
            "NAPTR" => Self::CanUseNaptr,
            "SRV" => Self::CanUseSrv,
            "SSHFP" => Self::CanUseSshfp,
            "TLSA" => Self::CanUseTlsa,
            "PTR" => Self::CanUsePtr,
            "LOC" => Self::CanUseLoc,
            "SVCB" => Self::CanUseSvcb,
            "HTTPS" => Self::CanUseHttps,
            _ => return None,
        })
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CanGetZones => "CanGetZones",
            Self::CanUseAlias => "CanUseAlias",
            Self::CanUseCaa => "CanUseCAA",
            Self::CanUseDs => "CanUseDS",
            Self::CanUseNaptr => "CanUseNAPTR",
            Self::CanUseSrv => "CanUseSRV",
            Self::CanUseSshfp => "CanUseSSHFP",
            Self::CanUseTlsa => "CanUseTLSA",
            Self::CanUsePtr => "CanUsePTR",
            Self::CanUseLoc => "CanUseLOC",
            Self::CanUseSvcb => "CanUseSVCB",
            Self::CanUseHttps => "CanUseHTTPS",
            Self::CanAutoDnssec => "CanAutoDNSSEC",
            Self::CanConcur => "CanConcur",
            Self::DocCreateDomains => "DocCreateDomains",
            Self::DocDualHost => "DocDualHost",
            Self::DocOfficiallySupported => "DocOfficiallySupported",
        };
        f.write_str(name)
    }
}

/// A provider's declared capability set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities(BTreeSet<Capability>);

impl Capabilities {
    /// True if the capability is declared.
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    /// Add a capability.
    #[must_use]
    pub fn with(mut self, capability: Capability) -> Self {
        self.0.insert(capability);
        self
    }

    /// Remove a capability.
    #[must_use]
    pub fn without(mut self, capability: Capability) -> Self {
        self.0.remove(&capability);
        self
    }

    /// Every declared capability.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// What the check needs to know about one provider serving the zone.
#[derive(Debug, Clone, Copy)]
pub struct ProviderProfile<'a> {
    /// Provider name from the configuration
    pub name: &'a str,
    /// Registered provider type
    pub provider_type: &'a str,
    /// Declared capabilities
    pub capabilities: &'a Capabilities,
}

/// Check the zone against every provider serving it.
///
/// `custom_owner` maps a custom record type to the provider type that owns it.
#[must_use]
pub fn check_capabilities<'o, F>(
    dc: &DomainConfig,
    providers: &[ProviderProfile<'_>],
    custom_owner: F,
) -> Vec<ValidationError>
where
    F: Fn(&str) -> Option<&'o str>,
{
    let mut errors = Vec::new();
    let types = dc.record_types();

    for provider in providers {
        for rtype in &types {
            if let Some(needed) = Capability::for_record_type(rtype) {
                if !provider.capabilities.has(needed) {
                    errors.push(ValidationError::UnsupportedCapability {
                        zone: dc.name.clone(),
                        provider: provider.name.to_string(),
                        capability: format!("{rtype} records ({needed})"),
                    });
                }
            } else if let Some(owner) = custom_owner(rtype) {
                if owner != provider.provider_type {
                    errors.push(ValidationError::CustomTypeUnroutable {
                        zone: dc.name.clone(),
                        rtype: rtype.clone(),
                        owner: owner.to_string(),
                    });
                }
            }
        }

        if dc.auto_dnssec != AutoDnssec::Unset
            && !provider.capabilities.has(Capability::CanAutoDnssec)
        {
            errors.push(ValidationError::UnsupportedCapability {
                zone: dc.name.clone(),
                provider: provider.name.to_string(),
                capability: Capability::CanAutoDnssec.to_string(),
            });
        }
    }
    errors
}
