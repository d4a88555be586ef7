// Copyright 2026 the Orogeny Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linear transform variants: identity, scale/translate, and general matrix.
//!
//! All three are matrix-expressible, which is what makes them the productive
//! targets of the simplification engine: any adjacent pair drawn from this
//! module merges into a single transform via [`Transform::merge`], with the
//! merged mapping equal to the exact matrix product of the pair.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::Cell;
use core::fmt;

use orogeny_shader::ShaderFunction;

use crate::error::MapError;
use crate::event::EventSource;
use crate::matrix::Mat4;

use super::{Transform, TransformFlags, TransformHandle, next_instance_id};

// ---------------------------------------------------------------------------
// WGSL literal helpers
// ---------------------------------------------------------------------------

/// Formats an `f64` as a WGSL float literal.
///
/// `Debug` formatting always includes a decimal point or exponent, both of
/// which WGSL accepts.
fn wgsl_f32(v: f64) -> String {
    format!("{v:?}")
}

fn wgsl_vec3(v: [f64; 3]) -> String {
    format!(
        "vec3<f32>({}, {}, {})",
        wgsl_f32(v[0]),
        wgsl_f32(v[1]),
        wgsl_f32(v[2])
    )
}

fn wgsl_mat4(m: Mat4) -> String {
    let cols: Vec<String> = m
        .cols
        .iter()
        .map(|c| {
            format!(
                "vec4<f32>({}, {}, {}, {})",
                wgsl_f32(c[0]),
                wgsl_f32(c[1]),
                wgsl_f32(c[2]),
                wgsl_f32(c[3])
            )
        })
        .collect();
    format!(
        "mat4x4<f32>(\n        {},\n        {},\n        {},\n        {})",
        cols[0], cols[1], cols[2], cols[3]
    )
}

// ---------------------------------------------------------------------------
// NullTransform
// ---------------------------------------------------------------------------

/// The identity transform.
///
/// Maps every coordinate to itself in both directions and merges with any
/// neighbor (the neighbor survives). [`ChainTransform::simplified`] returns
/// one of these for an empty chain.
///
/// [`ChainTransform::simplified`]: super::ChainTransform::simplified
#[derive(Debug)]
pub struct NullTransform {
    changed: EventSource,
    id: usize,
}

impl NullTransform {
    /// Creates an identity transform.
    #[must_use]
    pub fn new() -> Self {
        Self {
            changed: EventSource::new(),
            id: next_instance_id(),
        }
    }
}

impl Default for NullTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for NullTransform {
    fn kind(&self) -> &'static str {
        "NullTransform"
    }

    fn flags(&self) -> TransformFlags {
        TransformFlags::all()
    }

    fn map_point(&self, point: [f64; 3]) -> [f64; 3] {
        point
    }

    fn imap_point(&self, point: [f64; 3]) -> Result<[f64; 3], MapError> {
        Ok(point)
    }

    fn shader_map(&self) -> ShaderFunction {
        let name = format!("null_map_{}", self.id);
        let source = format!("fn {name}(pos: vec4<f32>) -> vec4<f32> {{\n    return pos;\n}}\n");
        ShaderFunction::new(name, source)
    }

    fn shader_imap(&self) -> ShaderFunction {
        let name = format!("null_imap_{}", self.id);
        let source = format!("fn {name}(pos: vec4<f32>) -> vec4<f32> {{\n    return pos;\n}}\n");
        ShaderFunction::new(name, source)
    }

    fn changed(&self) -> &EventSource {
        &self.changed
    }

    fn merge(&self, rhs: &TransformHandle) -> Option<TransformHandle> {
        // Identity absorbs into anything.
        Some(rhs.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for NullTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

// ---------------------------------------------------------------------------
// STTransform
// ---------------------------------------------------------------------------

/// Per-axis scale followed by translation.
///
/// `map` computes `p * scale + translate`; `imap` computes
/// `(p - translate) / scale`. A zero scale component makes the inverse
/// direction undefined — `imap` then yields non-finite coordinates rather
/// than an error, and [`simplified`] merges involving such a transform
/// produce a singular matrix. Both parameters are mutable in place and fire
/// the change notification on every set.
///
/// [`simplified`]: super::ChainTransform::simplified
#[derive(Debug)]
pub struct STTransform {
    scale: Cell<[f64; 3]>,
    translate: Cell<[f64; 3]>,
    changed: EventSource,
    id: usize,
}

impl STTransform {
    /// Creates a transform scaling by `scale` then translating by `translate`.
    #[must_use]
    pub fn new(scale: [f64; 3], translate: [f64; 3]) -> Self {
        Self {
            scale: Cell::new(scale),
            translate: Cell::new(translate),
            changed: EventSource::new(),
            id: next_instance_id(),
        }
    }

    /// Creates a unit-scale, zero-translation transform.
    #[must_use]
    pub fn identity() -> Self {
        Self::new([1.0, 1.0, 1.0], [0.0, 0.0, 0.0])
    }

    /// The current per-axis scale.
    #[inline]
    #[must_use]
    pub fn scale(&self) -> [f64; 3] {
        self.scale.get()
    }

    /// The current translation.
    #[inline]
    #[must_use]
    pub fn translate(&self) -> [f64; 3] {
        self.translate.get()
    }

    /// Sets the scale and fires the change notification.
    pub fn set_scale(&self, scale: [f64; 3]) {
        self.scale.set(scale);
        self.changed.notify();
    }

    /// Sets the translation and fires the change notification.
    pub fn set_translate(&self, translate: [f64; 3]) {
        self.translate.set(translate);
        self.changed.notify();
    }

    /// The equivalent 4×4 matrix.
    #[must_use]
    pub fn as_matrix(&self) -> Mat4 {
        let s = self.scale.get();
        let t = self.translate.get();
        Mat4::from_cols_array_2d([
            [s[0], 0.0, 0.0, 0.0],
            [0.0, s[1], 0.0, 0.0],
            [0.0, 0.0, s[2], 0.0],
            [t[0], t[1], t[2], 1.0],
        ])
    }
}

impl Transform for STTransform {
    fn kind(&self) -> &'static str {
        "STTransform"
    }

    fn flags(&self) -> TransformFlags {
        TransformFlags::LINEAR | TransformFlags::ORTHOGONAL
    }

    fn map_point(&self, point: [f64; 3]) -> [f64; 3] {
        let s = self.scale.get();
        let t = self.translate.get();
        [
            point[0] * s[0] + t[0],
            point[1] * s[1] + t[1],
            point[2] * s[2] + t[2],
        ]
    }

    fn imap_point(&self, point: [f64; 3]) -> Result<[f64; 3], MapError> {
        let s = self.scale.get();
        let t = self.translate.get();
        Ok([
            (point[0] - t[0]) / s[0],
            (point[1] - t[1]) / s[1],
            (point[2] - t[2]) / s[2],
        ])
    }

    fn shader_map(&self) -> ShaderFunction {
        let name = format!("st_map_{}", self.id);
        let source = format!(
            "fn {name}(pos: vec4<f32>) -> vec4<f32> {{\n    return vec4<f32>(pos.xyz * {} + {}, pos.w);\n}}\n",
            wgsl_vec3(self.scale.get()),
            wgsl_vec3(self.translate.get())
        );
        ShaderFunction::new(name, source)
    }

    fn shader_imap(&self) -> ShaderFunction {
        let name = format!("st_imap_{}", self.id);
        let source = format!(
            "fn {name}(pos: vec4<f32>) -> vec4<f32> {{\n    return vec4<f32>((pos.xyz - {}) / {}, pos.w);\n}}\n",
            wgsl_vec3(self.translate.get()),
            wgsl_vec3(self.scale.get())
        );
        ShaderFunction::new(name, source)
    }

    fn changed(&self) -> &EventSource {
        &self.changed
    }

    fn merge(&self, rhs: &TransformHandle) -> Option<TransformHandle> {
        let any = rhs.as_any();
        if any.downcast_ref::<NullTransform>().is_some() {
            return Some(TransformHandle::new(Self::new(
                self.scale.get(),
                self.translate.get(),
            )));
        }
        if let Some(st) = any.downcast_ref::<Self>() {
            // self(rhs(p)) = (p * s_r + t_r) * s + t = p * (s * s_r) + (t_r * s + t)
            let s = self.scale.get();
            let t = self.translate.get();
            let rs = st.scale.get();
            let rt = st.translate.get();
            let scale = [s[0] * rs[0], s[1] * rs[1], s[2] * rs[2]];
            let translate = [
                rt[0] * s[0] + t[0],
                rt[1] * s[1] + t[1],
                rt[2] * s[2] + t[2],
            ];
            return Some(TransformHandle::new(Self::new(scale, translate)));
        }
        if let Some(mat) = any.downcast_ref::<MatrixTransform>() {
            return Some(TransformHandle::new(MatrixTransform::new(
                self.as_matrix() * mat.matrix(),
            )));
        }
        None
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for STTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.scale.get();
        let t = self.translate.get();
        write!(f, "STTransform(scale={s:?}, translate={t:?})")
    }
}

// ---------------------------------------------------------------------------
// MatrixTransform
// ---------------------------------------------------------------------------

/// A general 4×4 matrix transform.
///
/// `imap` inverts the matrix per call and fails with
/// [`MapError::SingularMatrix`] when the determinant is zero. The emitted
/// inverse shader fragment of a singular matrix multiplies by the zero
/// matrix; callers are expected to consult `imap` before relying on the
/// inverse shader of an arbitrary matrix.
#[derive(Debug)]
pub struct MatrixTransform {
    matrix: Cell<Mat4>,
    changed: EventSource,
    id: usize,
}

impl MatrixTransform {
    /// Creates a transform applying `matrix`.
    #[must_use]
    pub fn new(matrix: Mat4) -> Self {
        Self {
            matrix: Cell::new(matrix),
            changed: EventSource::new(),
            id: next_instance_id(),
        }
    }

    /// The current matrix.
    #[inline]
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        self.matrix.get()
    }

    /// Replaces the matrix and fires the change notification.
    pub fn set_matrix(&self, matrix: Mat4) {
        self.matrix.set(matrix);
        self.changed.notify();
    }
}

impl Default for MatrixTransform {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY)
    }
}

impl Transform for MatrixTransform {
    fn kind(&self) -> &'static str {
        "MatrixTransform"
    }

    fn flags(&self) -> TransformFlags {
        TransformFlags::LINEAR
    }

    fn map_point(&self, point: [f64; 3]) -> [f64; 3] {
        self.matrix.get().transform_point(point)
    }

    fn imap_point(&self, point: [f64; 3]) -> Result<[f64; 3], MapError> {
        let inv = self.matrix.get().inverse().ok_or(MapError::SingularMatrix)?;
        Ok(inv.transform_point(point))
    }

    // Invert once for the whole array instead of once per point.
    fn imap(&self, coords: &[[f64; 3]]) -> Result<Vec<[f64; 3]>, MapError> {
        let inv = self.matrix.get().inverse().ok_or(MapError::SingularMatrix)?;
        Ok(coords.iter().map(|&p| inv.transform_point(p)).collect())
    }

    fn shader_map(&self) -> ShaderFunction {
        let name = format!("mat_map_{}", self.id);
        let source = format!(
            "fn {name}(pos: vec4<f32>) -> vec4<f32> {{\n    let m = {};\n    return m * pos;\n}}\n",
            wgsl_mat4(self.matrix.get())
        );
        ShaderFunction::new(name, source)
    }

    fn shader_imap(&self) -> ShaderFunction {
        let inv = self
            .matrix
            .get()
            .inverse()
            .unwrap_or(Mat4::from_cols_array([0.0; 16]));
        let name = format!("mat_imap_{}", self.id);
        let source = format!(
            "fn {name}(pos: vec4<f32>) -> vec4<f32> {{\n    let m = {};\n    return m * pos;\n}}\n",
            wgsl_mat4(inv)
        );
        ShaderFunction::new(name, source)
    }

    fn changed(&self) -> &EventSource {
        &self.changed
    }

    fn merge(&self, rhs: &TransformHandle) -> Option<TransformHandle> {
        let any = rhs.as_any();
        if any.downcast_ref::<NullTransform>().is_some() {
            return Some(TransformHandle::new(Self::new(self.matrix.get())));
        }
        if let Some(st) = any.downcast_ref::<STTransform>() {
            return Some(TransformHandle::new(Self::new(
                self.matrix.get() * st.as_matrix(),
            )));
        }
        if let Some(mat) = any.downcast_ref::<Self>() {
            return Some(TransformHandle::new(Self::new(
                self.matrix.get() * mat.matrix(),
            )));
        }
        None
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for MatrixTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}
