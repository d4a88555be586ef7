// Copyright 2026 the Orogeny Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for coordinate mapping.

use thiserror::Error;

/// Failure of an inverse mapping.
///
/// Forward mapping is total for every transform this crate ships; only the
/// inverse direction can fail, and a chain propagates the first failing
/// child's error unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MapError {
    /// The transform's matrix has determinant zero, so no inverse exists.
    #[error("matrix is singular and cannot be inverted")]
    SingularMatrix,
}
