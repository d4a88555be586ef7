// Copyright 2026 the Orogeny Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Polar-to-Cartesian transform.

use alloc::format;
use core::any::Any;
use core::fmt;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use orogeny_shader::ShaderFunction;

use crate::error::MapError;
use crate::event::EventSource;

use super::{Transform, TransformFlags, next_instance_id};

/// Maps polar coordinates `(θ, ρ, z)` to Cartesian `(x, y, z)`.
///
/// `map` computes `(ρ·cos θ, ρ·sin θ, z)`; `imap` recovers
/// `(atan2(y, x), hypot(x, y), z)`. The round trip normalizes θ into
/// `(-π, π]` and ρ to a non-negative value, so inputs outside that range
/// come back as the equivalent canonical pair rather than bit-identically.
///
/// Nonlinear: declares no [`TransformFlags`] and never merges, so it acts as
/// a barrier the simplification engine cannot collapse across.
#[derive(Debug)]
pub struct PolarTransform {
    changed: EventSource,
    id: usize,
}

impl PolarTransform {
    /// Creates a polar transform.
    #[must_use]
    pub fn new() -> Self {
        Self {
            changed: EventSource::new(),
            id: next_instance_id(),
        }
    }
}

impl Default for PolarTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for PolarTransform {
    fn kind(&self) -> &'static str {
        "PolarTransform"
    }

    fn flags(&self) -> TransformFlags {
        TransformFlags::empty()
    }

    fn map_point(&self, point: [f64; 3]) -> [f64; 3] {
        let [theta, rho, z] = point;
        [rho * theta.cos(), rho * theta.sin(), z]
    }

    fn imap_point(&self, point: [f64; 3]) -> Result<[f64; 3], MapError> {
        let [x, y, z] = point;
        Ok([y.atan2(x), x.hypot(y), z])
    }

    fn shader_map(&self) -> ShaderFunction {
        let name = format!("polar_map_{}", self.id);
        let source = format!(
            "fn {name}(pos: vec4<f32>) -> vec4<f32> {{\n    return vec4<f32>(pos.y * cos(pos.x), pos.y * sin(pos.x), pos.z, pos.w);\n}}\n"
        );
        ShaderFunction::new(name, source)
    }

    fn shader_imap(&self) -> ShaderFunction {
        let name = format!("polar_imap_{}", self.id);
        let source = format!(
            "fn {name}(pos: vec4<f32>) -> vec4<f32> {{\n    return vec4<f32>(atan2(pos.y, pos.x), length(pos.xy), pos.z, pos.w);\n}}\n"
        );
        ShaderFunction::new(name, source)
    }

    fn changed(&self) -> &EventSource {
        &self.changed
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for PolarTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}
