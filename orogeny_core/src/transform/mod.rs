// Copyright 2026 the Orogeny Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The transform capability contract and its concrete variants.
//!
//! A *transform* maps 3-D coordinate arrays forward ([`Transform::map`]) and,
//! where defined, backward ([`Transform::imap`]), and emits WGSL fragments
//! ([`Transform::shader_map`] / [`Transform::shader_imap`]) implementing the
//! identical mapping on the GPU. Each transform also:
//!
//! - declares [`TransformFlags`] describing its algebraic guarantees, which
//!   consumers use to decide safe optimizations;
//! - owns an [`EventSource`](crate::event::EventSource) fired whenever its
//!   own parameters change (never by reads);
//! - participates in pairwise composition via [`TransformHandle::combine`]
//!   and the `*` operator.
//!
//! Concrete variants:
//!
//! - [`NullTransform`] — identity.
//! - [`STTransform`] — per-axis scale followed by translation.
//! - [`MatrixTransform`] — general 4×4 matrix.
//! - [`PolarTransform`] — nonlinear polar-to-Cartesian.
//! - [`ChainTransform`] — ordered composite of other transforms.
//!
//! Transforms are shared, not exclusively owned: the same instance may sit in
//! several chains (or none) at once, so the public currency is
//! [`TransformHandle`], a cheap reference-counted handle. Mutating a shared
//! child is visible to every holder; there is no snapshot-on-share.

mod chain;
mod linear;
mod polar;

use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;
use core::ops::{Deref, Mul};
use core::sync::atomic::{AtomicUsize, Ordering};

use orogeny_shader::ShaderFunction;

use crate::error::MapError;
use crate::event::EventSource;

pub use chain::{ChainItem, ChainTransform};
pub use linear::{MatrixTransform, NullTransform, STTransform};
pub use polar::PolarTransform;

bitflags::bitflags! {
    /// Algebraic guarantees a transform declares about itself.
    ///
    /// Flags are conservative declarations, not measurements: a
    /// [`MatrixTransform`] holding an identity matrix still only claims
    /// `LINEAR`. Consumers branch on flags to pick safe fast paths, so a
    /// transform must never claim a property it can violate.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct TransformFlags: u8 {
        /// Maps lines to lines (matrix-expressible).
        const LINEAR = 1 << 0;
        /// Preserves axis alignment (no rotation or shear).
        const ORTHOGONAL = 1 << 1;
        /// Applies no scaling.
        const NON_SCALING = 1 << 2;
        /// Preserves distances (rigid motion).
        const ISOMETRIC = 1 << 3;
    }
}

static NEXT_INSTANCE: AtomicUsize = AtomicUsize::new(0);

/// Allocates a process-unique id used to name a transform's WGSL fragments.
///
/// Instance-unique names let one composed shader source reference several
/// instances of the same variant without collisions.
pub(crate) fn next_instance_id() -> usize {
    NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed)
}

/// The capability set every transform implements.
///
/// Implementations are consumed through [`TransformHandle`]; the trait itself
/// only carries the per-instance behavior. `map` and `imap` must be exact (or
/// documented-approximate) inverses for invertible transforms, and neither may
/// mutate its input.
pub trait Transform {
    /// The variant name, as shown in human-readable descriptions.
    fn kind(&self) -> &'static str;

    /// The algebraic guarantees this transform declares.
    fn flags(&self) -> TransformFlags;

    /// Forward-maps a single point.
    fn map_point(&self, point: [f64; 3]) -> [f64; 3];

    /// Inverse-maps a single point.
    ///
    /// The failure contract is per-variant; see each variant's documentation.
    fn imap_point(&self, point: [f64; 3]) -> Result<[f64; 3], MapError>;

    /// Forward-maps an array of points into a new array.
    fn map(&self, coords: &[[f64; 3]]) -> Vec<[f64; 3]> {
        coords.iter().map(|&p| self.map_point(p)).collect()
    }

    /// Inverse-maps an array of points into a new array.
    fn imap(&self, coords: &[[f64; 3]]) -> Result<Vec<[f64; 3]>, MapError> {
        coords.iter().map(|&p| self.imap_point(p)).collect()
    }

    /// Emits the WGSL fragment implementing [`map_point`](Self::map_point).
    ///
    /// The fragment reflects the transform's parameters *at the time of the
    /// call*; callers caching fragments must refresh them when
    /// [`changed`](Self::changed) fires.
    fn shader_map(&self) -> ShaderFunction;

    /// Emits the WGSL fragment implementing [`imap_point`](Self::imap_point).
    fn shader_imap(&self) -> ShaderFunction;

    /// The change-notification channel, fired on parameter mutation.
    fn changed(&self) -> &EventSource;

    /// Attempts a closed-form merge of `self` applied after `rhs`.
    ///
    /// Returns a transform equivalent to `rhs` then `self`, or `None` when no
    /// closed form exists for this pair of variants. The default declines
    /// every pairing.
    fn merge(&self, rhs: &TransformHandle) -> Option<TransformHandle> {
        _ = rhs;
        None
    }

    /// Downcast seam for chain-aware operations.
    fn as_chain(&self) -> Option<&ChainTransform> {
        None
    }

    /// Downcast seam for variant-pair dispatch in [`merge`](Self::merge).
    fn as_any(&self) -> &dyn Any;
}

/// A shared, cheaply clonable handle to a transform.
///
/// Handles are the unit of composition: chains hold them, [`combine`]
/// produces them, and the `*` operator works on them. Cloning a handle never
/// copies the underlying transform.
///
/// [`combine`]: Self::combine
#[derive(Clone)]
pub struct TransformHandle(Rc<dyn Transform>);

impl TransformHandle {
    /// Wraps a concrete transform in a handle.
    #[must_use]
    pub fn new<T: Transform + 'static>(transform: T) -> Self {
        Self(Rc::new(transform))
    }

    /// Whether two handles refer to the same transform instance.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Composes `self` with `rhs` such that the result applies `rhs` first.
    ///
    /// For two leaf transforms this attempts the closed-form
    /// [`merge`](Transform::merge) and falls back to a two-element
    /// [`ChainTransform`] wrapping both operands. When either operand is
    /// itself a chain, the two sequences are concatenated (`self`'s elements
    /// first) into one flat chain with **no** algebraic merging — merging is
    /// the simplification engine's job.
    #[must_use]
    pub fn combine(&self, rhs: &Self) -> Self {
        if self.as_chain().is_some() || rhs.as_chain().is_some() {
            let mut seq = self.sequence();
            seq.extend(rhs.sequence());
            return Self::new(ChainTransform::new(seq));
        }
        if let Some(merged) = self.0.merge(rhs) {
            return merged;
        }
        Self::new(ChainTransform::new(vec![self.clone(), rhs.clone()]))
    }

    /// The handle viewed as a sequence: a chain's children, or `[self]`.
    fn sequence(&self) -> Vec<Self> {
        match self.as_chain() {
            Some(chain) => chain.transforms(),
            None => vec![self.clone()],
        }
    }
}

impl<T: Transform + 'static> From<Rc<T>> for TransformHandle {
    fn from(rc: Rc<T>) -> Self {
        Self(rc)
    }
}

impl Deref for TransformHandle {
    type Target = dyn Transform;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl fmt::Debug for TransformHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for TransformHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_chain() {
            Some(chain) => fmt::Display::fmt(chain, f),
            None => f.write_str(self.kind()),
        }
    }
}

impl Mul for &TransformHandle {
    type Output = TransformHandle;

    fn mul(self, rhs: &TransformHandle) -> TransformHandle {
        self.combine(rhs)
    }
}

impl Mul for TransformHandle {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.combine(&rhs)
    }
}
