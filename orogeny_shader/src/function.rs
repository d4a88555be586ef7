// Copyright 2026 the Orogeny Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A single named WGSL function fragment.

use alloc::format;
use alloc::string::String;

/// A named WGSL function fragment.
///
/// The source is expected to define exactly one function with the signature
/// `fn NAME(pos: vec4<f32>) -> vec4<f32>`, where `NAME` matches
/// [`name`](Self::name). Nothing in this crate checks that expectation; the
/// fragment is carried as opaque text and the name is what composition uses
/// to reference it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderFunction {
    name: String,
    source: String,
}

impl ShaderFunction {
    /// Creates a fragment from a function name and its WGSL source.
    #[must_use]
    pub fn new(name: String, source: String) -> Self {
        Self { name, source }
    }

    /// The WGSL function name this fragment defines.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fragment's WGSL source text.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Renders a call expression applying this fragment to `arg`.
    #[must_use]
    pub fn call(&self, arg: &str) -> String {
        format!("{}({arg})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    fn passthrough() -> ShaderFunction {
        ShaderFunction::new(
            "noop".to_string(),
            "fn noop(pos: vec4<f32>) -> vec4<f32> {\n    return pos;\n}\n".to_string(),
        )
    }

    #[test]
    fn accessors() {
        let f = passthrough();
        assert_eq!(f.name(), "noop");
        assert!(f.source().starts_with("fn noop("));
    }

    #[test]
    fn call_wraps_argument() {
        let f = passthrough();
        assert_eq!(f.call("pos"), "noop(pos)");
        assert_eq!(f.call("inner(pos)"), "noop(inner(pos))");
    }
}
