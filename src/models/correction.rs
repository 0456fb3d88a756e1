// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Corrections: a message paired with an optional deferred mutation.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;

use crate::errors::ProviderError;

/// Future returned by a correction thunk.
pub type CorrectionFuture = BoxFuture<'static, Result<(), ProviderError>>;

/// Zero-argument failable operation performing one change.
pub type CorrectionThunk = Box<dyn FnOnce() -> CorrectionFuture + Send>;

/// A human-readable description with an optional operation that performs it.
///
/// A correction without a thunk is a report: it is printed and never fails.
/// Thunks own everything they need; nothing is borrowed from the planning loop.
pub struct Correction {
    /// Message shown to the operator
    pub msg: String,
    thunk: Option<CorrectionThunk>,
}

impl Correction {
    /// Build a correction from an async closure.
    pub fn new<F, Fut>(msg: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ProviderError>> + Send + 'static,
    {
        Self {
            msg: msg.into(),
            thunk: Some(Box::new(move || f().boxed())),
        }
    }

    /// Build an informational correction with no operation.
    pub fn report(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            thunk: None,
        }
    }

    /// True if this correction only informs.
    #[must_use]
    pub fn is_report(&self) -> bool {
        self.thunk.is_none()
    }

    /// Run the operation. Reports succeed immediately.
    ///
    /// # Errors
    ///
    /// Returns whatever error the provider operation produced.
    pub async fn execute(self) -> Result<(), ProviderError> {
        match self.thunk {
            Some(thunk) => thunk().await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Correction")
            .field("msg", &self.msg)
            .field("report", &self.is_report())
            .finish()
    }
}
