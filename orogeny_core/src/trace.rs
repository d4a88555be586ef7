// Copyright 2026 the Orogeny Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the simplification engine.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! [`simplified_traced`](crate::transform::ChainTransform::simplified_traced)
//! calls as it rewrites a chain. All method bodies default to no-ops, so
//! implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted after the flatten step, before any merging.
#[derive(Clone, Copy, Debug)]
pub struct FlattenEvent {
    /// Number of direct children before expansion.
    pub input_len: usize,
    /// Number of leaves after nested chains were expanded.
    pub output_len: usize,
}

/// Emitted once per adjacent pair inspected during merging.
#[derive(Clone, Copy, Debug)]
pub struct MergeAttemptEvent {
    /// Variant name of the left operand.
    pub left: &'static str,
    /// Variant name of the right operand.
    pub right: &'static str,
    /// Whether the pair collapsed into a single transform.
    pub merged: bool,
}

/// Emitted when simplification reaches its fixed point.
#[derive(Clone, Copy, Debug)]
pub struct SimplifiedEvent {
    /// Leaf count entering the merge loop.
    pub input_len: usize,
    /// Transform count of the result.
    pub output_len: usize,
    /// Number of left-to-right scans performed, including the final
    /// merge-free one.
    pub scans: usize,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the simplification engine.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called after nested chains are expanded.
    fn on_flatten(&mut self, e: &FlattenEvent) {
        _ = e;
    }

    /// Called for every adjacent pair inspected.
    fn on_merge_attempt(&mut self, e: &MergeAttemptEvent) {
        _ = e;
    }

    /// Called when the rewrite terminates.
    fn on_simplified(&mut self, e: &SimplifiedEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FlattenEvent`].
    #[inline]
    pub fn flatten(&mut self, e: &FlattenEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_flatten(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`MergeAttemptEvent`].
    #[inline]
    pub fn merge_attempt(&mut self, e: &MergeAttemptEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_merge_attempt(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SimplifiedEvent`].
    #[inline]
    pub fn simplified(&mut self, e: &SimplifiedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_simplified(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

#[cfg(all(test, feature = "trace"))]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        merges: Vec<(&'static str, &'static str, bool)>,
        done: Option<SimplifiedEvent>,
    }

    impl TraceSink for Recorder {
        fn on_merge_attempt(&mut self, e: &MergeAttemptEvent) {
            self.merges.push((e.left, e.right, e.merged));
        }

        fn on_simplified(&mut self, e: &SimplifiedEvent) {
            self.done = Some(*e);
        }
    }

    #[test]
    fn tracer_dispatches_to_sink() {
        let mut rec = Recorder::default();
        let mut tracer = Tracer::new(&mut rec);
        tracer.merge_attempt(&MergeAttemptEvent {
            left: "STTransform",
            right: "STTransform",
            merged: true,
        });
        tracer.simplified(&SimplifiedEvent {
            input_len: 2,
            output_len: 1,
            scans: 2,
        });
        assert_eq!(rec.merges.len(), 1);
        assert_eq!(rec.done.expect("summary emitted").output_len, 1);
    }

    #[test]
    fn none_tracer_is_silent() {
        let mut tracer = Tracer::none();
        tracer.flatten(&FlattenEvent {
            input_len: 0,
            output_len: 0,
        });
    }
}
