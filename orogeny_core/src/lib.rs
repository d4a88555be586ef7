// Copyright 2026 the Orogeny Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composable coordinate transforms with synchronized host and shader
//! evaluation.
//!
//! `orogeny_core` provides an ordered-composition model for coordinate-space
//! transforms: the same chain of transforms maps numeric coordinate arrays on
//! the host and emits one composed WGSL function performing the identical
//! mapping on the GPU. The two representations are kept structurally
//! consistent under every mutation of the chain.
//!
//! # Architecture
//!
//! Mutation flows through the chain like this:
//!
//! ```text
//!   append / prepend / set_at / set_transforms
//!       │
//!       ├──► re-subscribe change notifications (exactly current children)
//!       ├──► rebuild forward + inverse FunctionChains
//!       └──► notify() the chain's own subscribers
//!
//!   child.set_*() ──► child.notify() ──► chain marks fragments stale,
//!                                        re-notifies (no rebuild)
//! ```
//!
//! **[`transform`]** — The [`Transform`](transform::Transform) capability
//! contract, the concrete variants, [`ChainTransform`](transform::ChainTransform),
//! and the simplification engine (`flat` / `simplified`).
//!
//! **[`event`]** — [`EventSource`](event::EventSource), the synchronous
//! subscribe/unsubscribe/notify channel every transform owns.
//!
//! **[`matrix`]** — [`Mat4`](matrix::Mat4), the minimal column-major 4×4
//! matrix type backing the linear variants.
//!
//! **[`error`]** — [`MapError`](error::MapError) for the fallible inverse
//! direction.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! simplification-engine instrumentation, with zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! Shader assembly itself lives in `orogeny_shader`; this crate passes
//! fragments through without inspecting them and never compiles or executes
//! shader code.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod error;
pub mod event;
pub mod matrix;
pub mod trace;
pub mod transform;
