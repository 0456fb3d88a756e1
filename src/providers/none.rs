// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `NONE` registrar: delegation is managed elsewhere.

use async_trait::async_trait;
use std::sync::Arc;

use super::Registrar;
use crate::config::ProviderCredentials;
use crate::errors::{ConfigError, ProviderError};
use crate::models::{Correction, DomainConfig};

/// Registered type name.
pub const PROVIDER_TYPE: &str = "NONE";

/// Registrar that never proposes a change.
#[derive(Debug, Clone)]
pub struct NoneRegistrar {
    name: String,
}

/// Registry constructor.
///
/// # Errors
///
/// Never fails; the signature matches the registry.
pub fn new_registrar(name: &str, creds: &ProviderCredentials) -> Result<Arc<dyn Registrar>, ConfigError> {
    super::check_credentials(name, creds, &[], &[])?;
    Ok(Arc::new(NoneRegistrar {
        name: name.to_string(),
    }))
}

#[async_trait]
impl Registrar for NoneRegistrar {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_registrar_corrections(
        &self,
        _dc: &DomainConfig,
    ) -> Result<Vec<Correction>, ProviderError> {
        Ok(Vec::new())
    }
}
