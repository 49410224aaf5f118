// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for field queries and construction

use thiserror::Error;

/// Errors raised by the field kernel
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    /// A precondition on the caller's input was violated
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An iterative solve hit its iteration cap before reaching tolerance
    #[error("no convergence after {iterations} iterations (residual {residual:e})")]
    NoConvergence { iterations: usize, residual: f64 },

    /// The operation needs at least one primitive
    #[error("field model has no primitives")]
    EmptyModel,
}

impl FieldError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

/// Result alias used throughout the kernel
pub type Result<T> = std::result::Result<T, FieldError>;
