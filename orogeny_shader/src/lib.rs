// Copyright 2026 the Orogeny Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! WGSL function fragments and ordered function-chain composition.
//!
//! `orogeny_shader` is the shader-assembly primitive underneath the transform
//! layer. It deals in exactly two things:
//!
//! **[`ShaderFunction`]** — a named WGSL function fragment of the fixed shape
//! `fn NAME(pos: vec4<f32>) -> vec4<f32>`. Fragments are produced elsewhere
//! (each transform emits its own); this crate treats their source text as
//! opaque and only ever passes it through.
//!
//! **[`FunctionChain`]** — a name plus an ordered sequence of fragments,
//! composed into one function that applies the fragments in sequence order
//! (first fragment innermost). The composed source is derived from the
//! current sequence on every read, so it can never go stale relative to the
//! sequence.
//!
//! This crate does not compile, validate, or execute shader code. Handing the
//! composed source to a GPU pipeline is the caller's concern.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

mod chain;
mod function;

pub use chain::FunctionChain;
pub use function::ShaderFunction;
