// Copyright 2026 the Orogeny Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered composite transform with synchronized shader chains.
//!
//! [`ChainTransform`] holds an ordered sequence of child transforms and keeps
//! three derived views of that sequence consistent under mutation:
//!
//! 1. **Numeric** — [`map`](Transform::map) applies children *last element
//!    first*; [`imap`](Transform::imap) applies them first to last. Storing
//!    the sequence in application-order-reversed form matches mathematical
//!    composition notation: `chain.map(x)` for `[a, b]` equals
//!    `a.map(b.map(x))`.
//! 2. **Shader** — two [`FunctionChain`]s. The forward chain's fragment order
//!    is the *reverse* of the child sequence (so the last child's fragment is
//!    innermost); the inverse chain's order matches the sequence directly.
//! 3. **Subscriptions** — the chain is subscribed to exactly its current
//!    children's change notifications, one subscription per occurrence.
//!
//! Every structural mutation ([`append`], [`prepend`], [`set_at`],
//! [`set_transforms`]) updates subscriptions, rebuilds both shader chains,
//! and fires the chain's own notification before returning. A child's own
//! parameter change takes the cheaper path: the chain re-fires its
//! notification and marks the captured fragments stale; the fragment lists
//! are refreshed on the next shader read rather than on every keystroke of a
//! parameter animation.
//!
//! The simplification engine lives here as the read-only queries
//! [`flat`](ChainTransform::flat) and
//! [`simplified`](ChainTransform::simplified); neither mutates its input.
//!
//! [`append`]: ChainTransform::append
//! [`prepend`]: ChainTransform::prepend
//! [`set_at`]: ChainTransform::set_at
//! [`set_transforms`]: ChainTransform::set_transforms

use alloc::collections::VecDeque;
use alloc::format;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::{Cell, Ref, RefCell};
use core::fmt;

use orogeny_shader::{FunctionChain, ShaderFunction};

use crate::error::MapError;
use crate::event::{EventSource, SubscriptionId};
use crate::trace::{FlattenEvent, MergeAttemptEvent, SimplifiedEvent, Tracer};

use super::{NullTransform, Transform, TransformFlags, TransformHandle, next_instance_id};

/// One constructor argument of [`ChainTransform::from_items`]: a single
/// transform, or a sequence spliced in at its position (one level only —
/// nested chains inside the sequence stay nested; see
/// [`flat`](ChainTransform::flat) for deep expansion).
#[derive(Clone, Debug)]
pub enum ChainItem {
    /// A single transform.
    One(TransformHandle),
    /// A sequence of transforms spliced in at this position.
    Seq(Vec<TransformHandle>),
}

impl From<TransformHandle> for ChainItem {
    fn from(tr: TransformHandle) -> Self {
        Self::One(tr)
    }
}

impl From<Vec<TransformHandle>> for ChainItem {
    fn from(seq: Vec<TransformHandle>) -> Self {
        Self::Seq(seq)
    }
}

/// A composite transform applying its children in reverse-sequence order.
///
/// Children are shared: the same [`TransformHandle`] may sit in several
/// chains at once, and a mutation of a shared child is visible to every
/// chain holding it. The chain exclusively owns only its derived shader
/// chains and its subscriptions.
///
/// This type is single-threaded by construction (`Rc`-based handles); callers
/// needing cross-thread mutation must serialize access externally.
#[derive(Debug)]
pub struct ChainTransform {
    transforms: RefCell<Vec<TransformHandle>>,
    subscriptions: RefCell<Vec<SubscriptionId>>,
    shader_map: RefCell<FunctionChain>,
    shader_imap: RefCell<FunctionChain>,
    /// Set by child-change forwarding; cleared by the next fragment rebuild.
    shaders_stale: Rc<Cell<bool>>,
    changed: EventSource,
}

impl ChainTransform {
    /// Creates a chain over the given child sequence.
    ///
    /// The last element is the first transform applied by
    /// [`map`](Transform::map).
    #[must_use]
    pub fn new(transforms: Vec<TransformHandle>) -> Self {
        let id = next_instance_id();
        let chain = Self {
            transforms: RefCell::new(Vec::new()),
            subscriptions: RefCell::new(Vec::new()),
            shader_map: RefCell::new(FunctionChain::new(format!("chain_map_{id}"), Vec::new())),
            shader_imap: RefCell::new(FunctionChain::new(format!("chain_imap_{id}"), Vec::new())),
            shaders_stale: Rc::new(Cell::new(false)),
            changed: EventSource::new(),
        };
        for tr in transforms {
            let sub = chain.subscribe_child(&tr);
            chain.transforms.borrow_mut().push(tr);
            chain.subscriptions.borrow_mut().push(sub);
        }
        chain.rebuild_shaders();
        chain
    }

    /// Creates a chain from items, splicing sequence items in one level.
    ///
    /// This mirrors construction from a mixed argument list: a
    /// [`ChainItem::Seq`] contributes its elements in place. The splice is
    /// shallow and happens only at construction.
    #[must_use]
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = ChainItem>,
    {
        let mut flat = Vec::new();
        for item in items {
            match item {
                ChainItem::One(tr) => flat.push(tr),
                ChainItem::Seq(seq) => flat.extend(seq),
            }
        }
        Self::new(flat)
    }

    // -- Sequence access --

    /// The current child sequence (handles are cheap clones).
    #[must_use]
    pub fn transforms(&self) -> Vec<TransformHandle> {
        self.transforms.borrow().clone()
    }

    /// Number of direct children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transforms.borrow().len()
    }

    /// Whether the chain has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transforms.borrow().is_empty()
    }

    /// The forward [`FunctionChain`], fragment order reversed relative to the
    /// child sequence.
    ///
    /// Refreshes captured fragments first if a child changed since the last
    /// read.
    #[must_use]
    pub fn forward_chain(&self) -> Ref<'_, FunctionChain> {
        self.refresh_shaders();
        self.shader_map.borrow()
    }

    /// The inverse [`FunctionChain`], fragment order matching the child
    /// sequence.
    #[must_use]
    pub fn inverse_chain(&self) -> Ref<'_, FunctionChain> {
        self.refresh_shaders();
        self.shader_imap.borrow()
    }

    // -- Mutation (resubscribes, rebuilds shader chains, notifies) --

    /// Adds a transform at the end of the sequence (applied first).
    ///
    /// # Panics
    ///
    /// Panics if `transform` is, or transitively contains, this chain.
    pub fn append(&self, transform: TransformHandle) {
        self.assert_not_cyclic(&transform);
        let sub = self.subscribe_child(&transform);
        self.transforms.borrow_mut().push(transform);
        self.subscriptions.borrow_mut().push(sub);
        self.rebuild_shaders();
        self.changed.notify();
    }

    /// Adds a transform at the start of the sequence (applied last).
    ///
    /// # Panics
    ///
    /// Panics if `transform` is, or transitively contains, this chain.
    pub fn prepend(&self, transform: TransformHandle) {
        self.assert_not_cyclic(&transform);
        let sub = self.subscribe_child(&transform);
        self.transforms.borrow_mut().insert(0, transform);
        self.subscriptions.borrow_mut().insert(0, sub);
        self.rebuild_shaders();
        self.changed.notify();
    }

    /// Replaces the child at `index`.
    ///
    /// The old child is unsubscribed before the new one is subscribed, so no
    /// subscription leaks across the swap.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range (the chain is left untouched), or if
    /// `transform` is, or transitively contains, this chain.
    pub fn set_at(&self, index: usize, transform: TransformHandle) {
        let len = self.transforms.borrow().len();
        assert!(index < len, "index {index} out of range (len {len})");
        self.assert_not_cyclic(&transform);

        let old = self.transforms.borrow()[index].clone();
        let old_sub = self.subscriptions.borrow()[index];
        old.changed().unsubscribe(old_sub);

        let sub = self.subscribe_child(&transform);
        self.transforms.borrow_mut()[index] = transform;
        self.subscriptions.borrow_mut()[index] = sub;
        self.rebuild_shaders();
        self.changed.notify();
    }

    /// Replaces the whole child sequence.
    ///
    /// # Panics
    ///
    /// Panics if any element is, or transitively contains, this chain; the
    /// check runs before any state is touched, so a failing call leaves the
    /// chain unchanged.
    pub fn set_transforms(&self, transforms: Vec<TransformHandle>) {
        for tr in &transforms {
            self.assert_not_cyclic(tr);
        }

        {
            let old = self.transforms.borrow();
            let old_subs = self.subscriptions.borrow();
            for (tr, sub) in old.iter().zip(old_subs.iter()) {
                tr.changed().unsubscribe(*sub);
            }
        }

        let subs: Vec<SubscriptionId> = transforms.iter().map(|tr| self.subscribe_child(tr)).collect();
        *self.transforms.borrow_mut() = transforms;
        *self.subscriptions.borrow_mut() = subs;
        self.rebuild_shaders();
        self.changed.notify();
    }

    // -- Simplification engine (read-only queries) --

    /// Returns a new chain with every nested chain expanded in place.
    ///
    /// Expansion is deep: elements spliced out of a nested chain are
    /// re-examined, so chains inside chains inside chains all unfold into one
    /// flat sequence. A chain with no nested chains flattens to an equal but
    /// distinct instance. No algebraic merging happens here.
    #[must_use]
    pub fn flat(&self) -> Self {
        let mut worklist: VecDeque<TransformHandle> =
            self.transforms.borrow().iter().cloned().collect();
        let mut leaves = Vec::new();
        while let Some(tr) = worklist.pop_front() {
            let nested = tr.as_chain().map(Self::transforms);
            match nested {
                Some(children) => {
                    for child in children.into_iter().rev() {
                        worklist.push_front(child);
                    }
                }
                None => leaves.push(tr),
            }
        }
        Self::new(leaves)
    }

    /// Returns the algebraically simplified equivalent of this chain.
    ///
    /// Flattens, then repeatedly scans left to right, replacing the first
    /// adjacent pair whose [`combine`](TransformHandle::combine) collapses to
    /// a non-chain and restarting the scan (a merge can enable a further
    /// merge with its new neighbor). Terminates on a merge-free scan.
    ///
    /// The result is not necessarily a chain: an empty chain simplifies to a
    /// fresh [`NullTransform`], and a single survivor is returned unwrapped.
    ///
    /// This is a greedy local rewrite, exact by construction: every
    /// replacement step preserves the mapping because each variant's `merge`
    /// is exact.
    #[must_use]
    pub fn simplified(&self) -> TransformHandle {
        self.simplified_traced(&mut Tracer::none())
    }

    /// Like [`simplified`](Self::simplified), emitting engine events to
    /// `tracer`.
    #[must_use]
    pub fn simplified_traced(&self, tracer: &mut Tracer<'_>) -> TransformHandle {
        let flat = self.flat();
        let mut seq = flat.transforms();
        tracer.flatten(&FlattenEvent {
            input_len: self.transforms.borrow().len(),
            output_len: seq.len(),
        });

        if seq.is_empty() {
            tracer.simplified(&SimplifiedEvent {
                input_len: 0,
                output_len: 1,
                scans: 0,
            });
            return TransformHandle::new(NullTransform::new());
        }

        let input_len = seq.len();
        let mut scans = 0;
        'rescan: loop {
            scans += 1;
            for i in 0..seq.len() - 1 {
                let merged = seq[i].combine(&seq[i + 1]);
                let collapsed = merged.as_chain().is_none();
                tracer.merge_attempt(&MergeAttemptEvent {
                    left: seq[i].kind(),
                    right: seq[i + 1].kind(),
                    merged: collapsed,
                });
                if collapsed {
                    seq[i] = merged;
                    seq.remove(i + 1);
                    continue 'rescan;
                }
            }
            break;
        }
        tracer.simplified(&SimplifiedEvent {
            input_len,
            output_len: seq.len(),
            scans,
        });

        if seq.len() == 1 {
            seq.pop().expect("length checked above")
        } else {
            TransformHandle::new(Self::new(seq))
        }
    }

    // -- Internal helpers --

    /// Subscribes the chain to a child's change notification.
    ///
    /// The forwarding closure marks the captured fragments stale and re-fires
    /// the chain's own notification; it does not rebuild the sequence.
    fn subscribe_child(&self, child: &TransformHandle) -> SubscriptionId {
        let stale = Rc::clone(&self.shaders_stale);
        let source = self.changed.clone();
        child.changed().subscribe(move || {
            stale.set(true);
            source.notify();
        })
    }

    /// Panics if `candidate` is, or transitively contains, this chain.
    ///
    /// Identity is the change-notification registry, which every transform
    /// owns uniquely.
    fn assert_not_cyclic(&self, candidate: &TransformHandle) {
        assert!(
            !contains_source(candidate, &self.changed),
            "a chain must not contain itself, directly or transitively"
        );
    }

    /// Recaptures both fragment sequences from the current children.
    fn rebuild_shaders(&self) {
        let transforms = self.transforms.borrow();
        let map_fns: Vec<ShaderFunction> = transforms.iter().rev().map(|tr| tr.shader_map()).collect();
        let imap_fns: Vec<ShaderFunction> = transforms.iter().map(|tr| tr.shader_imap()).collect();
        self.shader_map.borrow_mut().set_functions(map_fns);
        self.shader_imap.borrow_mut().set_functions(imap_fns);
        self.shaders_stale.set(false);
    }

    fn refresh_shaders(&self) {
        if self.shaders_stale.get() {
            self.rebuild_shaders();
        }
    }
}

/// Whether `tr` is, or transitively contains, the transform owning `target`.
fn contains_source(tr: &TransformHandle, target: &EventSource) -> bool {
    if tr.changed().ptr_eq(target) {
        return true;
    }
    match tr.as_chain() {
        Some(chain) => chain
            .transforms
            .borrow()
            .iter()
            .any(|child| contains_source(child, target)),
        None => false,
    }
}

impl Default for ChainTransform {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Drop for ChainTransform {
    fn drop(&mut self) {
        let transforms = self.transforms.borrow();
        let subs = self.subscriptions.borrow();
        for (tr, sub) in transforms.iter().zip(subs.iter()) {
            tr.changed().unsubscribe(*sub);
        }
    }
}

impl Transform for ChainTransform {
    fn kind(&self) -> &'static str {
        "ChainTransform"
    }

    /// The intersection of every child's flags; vacuously
    /// [`all`](TransformFlags::all) for an empty chain.
    fn flags(&self) -> TransformFlags {
        self.transforms
            .borrow()
            .iter()
            .fold(TransformFlags::all(), |acc, tr| acc & tr.flags())
    }

    fn map_point(&self, point: [f64; 3]) -> [f64; 3] {
        self.transforms
            .borrow()
            .iter()
            .rev()
            .fold(point, |p, tr| tr.map_point(p))
    }

    fn imap_point(&self, point: [f64; 3]) -> Result<[f64; 3], MapError> {
        let mut p = point;
        for tr in self.transforms.borrow().iter() {
            p = tr.imap_point(p)?;
        }
        Ok(p)
    }

    // Run each child over the whole array so per-child setup (e.g. a matrix
    // inverse) happens once, not once per point.
    fn map(&self, coords: &[[f64; 3]]) -> Vec<[f64; 3]> {
        let mut out = coords.to_vec();
        for tr in self.transforms.borrow().iter().rev() {
            out = tr.map(&out);
        }
        out
    }

    fn imap(&self, coords: &[[f64; 3]]) -> Result<Vec<[f64; 3]>, MapError> {
        let mut out = coords.to_vec();
        for tr in self.transforms.borrow().iter() {
            out = tr.imap(&out)?;
        }
        Ok(out)
    }

    fn shader_map(&self) -> ShaderFunction {
        self.refresh_shaders();
        self.shader_map.borrow().to_function()
    }

    fn shader_imap(&self) -> ShaderFunction {
        self.refresh_shaders();
        self.shader_imap.borrow().to_function()
    }

    fn changed(&self) -> &EventSource {
        &self.changed
    }

    fn as_chain(&self) -> Option<&ChainTransform> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Display for ChainTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChainTransform([")?;
        for (i, tr) in self.transforms.borrow().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(tr.kind())?;
        }
        f.write_str("])")
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use core::cell::Cell;

    #[cfg(not(feature = "std"))]
    use kurbo::common::FloatFuncs as _;

    use crate::matrix::Mat4;
    use crate::transform::{MatrixTransform, PolarTransform, STTransform};

    use super::*;

    fn st(scale: [f64; 3], translate: [f64; 3]) -> TransformHandle {
        TransformHandle::new(STTransform::new(scale, translate))
    }

    fn assert_close(a: [f64; 3], b: [f64; 3]) {
        for i in 0..3 {
            assert!((a[i] - b[i]).abs() < 1e-9, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn last_child_is_applied_first() {
        let a = st([2.0, 2.0, 2.0], [0.0, 0.0, 0.0]);
        let b = st([1.0, 1.0, 1.0], [1.0, 0.0, 0.0]);
        let chain = ChainTransform::new(vec![a.clone(), b.clone()]);
        let x = [1.0, 1.0, 1.0];
        // chain.map(x) == a.map(b.map(x))
        assert_close(chain.map_point(x), a.map_point(b.map_point(x)));
        assert_close(chain.map_point(x), [4.0, 2.0, 2.0]);
    }

    #[test]
    fn map_array_matches_pointwise() {
        let chain = ChainTransform::new(vec![
            st([2.0, 1.0, 1.0], [0.0, 3.0, 0.0]),
            TransformHandle::new(PolarTransform::new()),
        ]);
        let pts = vec![[0.5, 2.0, 0.0], [1.0, 1.0, 1.0]];
        let mapped = chain.map(&pts);
        for (p, m) in pts.iter().zip(&mapped) {
            assert_close(chain.map_point(*p), *m);
        }
    }

    #[test]
    fn imap_inverts_map() {
        let chain = ChainTransform::new(vec![
            st([2.0, 0.5, 4.0], [1.0, -1.0, 0.0]),
            TransformHandle::new(MatrixTransform::new(Mat4::from_rotation_z(0.6))),
            st([1.0, 3.0, 1.0], [0.0, 0.0, 2.0]),
        ]);
        let p = [0.7, -1.2, 2.5];
        assert_close(chain.imap_point(chain.map_point(p)).unwrap(), p);
    }

    #[test]
    fn imap_propagates_child_error() {
        let chain = ChainTransform::new(vec![TransformHandle::new(MatrixTransform::new(
            Mat4::from_scale(0.0, 1.0, 1.0),
        ))]);
        assert_eq!(
            chain.imap(&[[1.0, 1.0, 1.0]]),
            Err(MapError::SingularMatrix)
        );
    }

    #[test]
    fn empty_chain_is_identity_with_vacuous_flags() {
        let chain = ChainTransform::default();
        let p = [3.0, -4.0, 5.0];
        assert_eq!(chain.map_point(p), p);
        assert_eq!(chain.imap_point(p).unwrap(), p);
        assert_eq!(chain.flags(), TransformFlags::all(), "vacuously true");
        let frag = chain.shader_map();
        assert!(frag.source().contains("return pos;"), "passthrough wrapper");
    }

    #[test]
    fn flags_are_the_conjunction_of_children() {
        let chain = ChainTransform::new(vec![
            st([1.0, 1.0, 1.0], [0.0, 0.0, 0.0]),
            st([2.0, 2.0, 2.0], [0.0, 0.0, 0.0]),
        ]);
        assert!(chain.flags().contains(TransformFlags::ORTHOGONAL));
        assert!(chain.flags().contains(TransformFlags::LINEAR));
        assert!(!chain.flags().contains(TransformFlags::ISOMETRIC));
    }

    #[test]
    fn positional_replace_flips_flags_on_next_read() {
        let chain = ChainTransform::new(vec![
            st([1.0, 1.0, 1.0], [0.0, 0.0, 0.0]),
            st([1.0, 1.0, 1.0], [0.0, 0.0, 0.0]),
        ]);
        assert!(chain.flags().contains(TransformFlags::ORTHOGONAL));
        chain.set_at(
            1,
            TransformHandle::new(MatrixTransform::new(Mat4::from_rotation_z(0.5))),
        );
        assert!(!chain.flags().contains(TransformFlags::ORTHOGONAL));
    }

    #[test]
    fn from_items_splices_one_level_only() {
        let a = st([1.0, 1.0, 1.0], [1.0, 0.0, 0.0]);
        let b = st([1.0, 1.0, 1.0], [0.0, 1.0, 0.0]);
        let c = st([1.0, 1.0, 1.0], [0.0, 0.0, 1.0]);
        let nested = TransformHandle::new(ChainTransform::new(vec![b.clone(), c.clone()]));

        let spliced = ChainTransform::from_items([a.clone().into(), vec![b.clone(), c.clone()].into()]);
        assert_eq!(spliced.len(), 3);

        // A nested *chain* is a single element, not spliced.
        let kept = ChainTransform::from_items([a.into(), nested.into()]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn flat_expands_nested_chain_in_place() {
        let a = st([1.0, 1.0, 1.0], [1.0, 0.0, 0.0]);
        let b = st([1.0, 1.0, 1.0], [0.0, 1.0, 0.0]);
        let c = st([1.0, 1.0, 1.0], [0.0, 0.0, 1.0]);
        let d = TransformHandle::new(PolarTransform::new());
        let inner = TransformHandle::new(ChainTransform::new(vec![b.clone(), c.clone()]));
        let chain = ChainTransform::new(vec![a.clone(), inner, d.clone()]);

        let flat = chain.flat();
        let seq = flat.transforms();
        assert_eq!(seq.len(), 4);
        assert!(seq[0].ptr_eq(&a));
        assert!(seq[1].ptr_eq(&b));
        assert!(seq[2].ptr_eq(&c));
        assert!(seq[3].ptr_eq(&d));
        assert_eq!(chain.len(), 3, "input chain untouched");
    }

    #[test]
    fn flat_expands_deeply_nested_chains() {
        let a = st([1.0, 1.0, 1.0], [1.0, 0.0, 0.0]);
        let b = st([1.0, 1.0, 1.0], [0.0, 1.0, 0.0]);
        let innermost = TransformHandle::new(ChainTransform::new(vec![b.clone()]));
        let inner = TransformHandle::new(ChainTransform::new(vec![innermost]));
        let chain = ChainTransform::new(vec![a.clone(), inner]);

        let seq = chain.flat().transforms();
        assert_eq!(seq.len(), 2);
        assert!(seq[0].ptr_eq(&a));
        assert!(seq[1].ptr_eq(&b));
    }

    #[test]
    fn flat_of_already_flat_chain_is_equal_but_distinct() {
        let a = st([2.0, 1.0, 1.0], [0.0, 0.0, 0.0]);
        let b = TransformHandle::new(PolarTransform::new());
        let chain = ChainTransform::new(vec![a.clone(), b.clone()]);
        let flat = chain.flat();
        let seq = flat.transforms();
        assert!(seq[0].ptr_eq(&a) && seq[1].ptr_eq(&b), "same elements, same order");
        assert!(
            !chain.changed().ptr_eq(flat.changed()),
            "distinct chain instance"
        );
    }

    #[test]
    fn simplified_collapses_affine_run_to_matrix_product() {
        let a = st([2.0, 3.0, 1.0], [1.0, 0.0, 0.0]);
        let m = TransformHandle::new(MatrixTransform::new(Mat4::from_rotation_z(0.4)));
        let b = st([1.0, 0.5, 2.0], [0.0, -1.0, 3.0]);
        let chain = ChainTransform::new(vec![a, m, b]);

        let simplified = chain.simplified();
        assert!(simplified.as_chain().is_none(), "collapsed to a single transform");
        assert_eq!(simplified.kind(), "MatrixTransform");
        for p in [[0.0, 0.0, 0.0], [1.0, 2.0, 3.0], [-2.5, 0.5, 1.0]] {
            assert_close(simplified.map_point(p), chain.map_point(p));
        }
    }

    #[test]
    fn simplified_empty_chain_is_null() {
        let simplified = ChainTransform::default().simplified();
        assert_eq!(simplified.kind(), "NullTransform");
        let p = [1.0, 2.0, 3.0];
        assert_eq!(simplified.map_point(p), p);
    }

    #[test]
    fn simplified_single_child_is_returned_unwrapped() {
        let polar = TransformHandle::new(PolarTransform::new());
        let chain = ChainTransform::new(vec![polar.clone()]);
        let simplified = chain.simplified();
        assert!(simplified.ptr_eq(&polar));
    }

    #[test]
    fn simplified_stops_at_nonlinear_barrier() {
        let chain = ChainTransform::new(vec![
            st([2.0, 2.0, 2.0], [0.0, 0.0, 0.0]),
            TransformHandle::new(PolarTransform::new()),
            st([1.0, 1.0, 1.0], [1.0, 1.0, 0.0]),
        ]);
        let simplified = chain.simplified();
        let result = simplified.as_chain().expect("polar cannot merge");
        assert_eq!(result.len(), 3);
        for p in [[0.3, 1.5, 0.0], [1.2, 2.0, -1.0]] {
            assert_close(simplified.map_point(p), chain.map_point(p));
        }
    }

    #[test]
    fn simplification_reaches_fixed_point_on_longer_chains() {
        // The ST pair right of the polar merges, then the merged result and
        // the null merge again — only rescanning discovers the second step.
        let chain = ChainTransform::new(vec![
            st([2.0, 1.0, 1.0], [0.0, 0.0, 0.0]),
            st([1.0, 2.0, 1.0], [3.0, 0.0, 0.0]),
            TransformHandle::new(PolarTransform::new()),
            st([1.0, 1.0, 4.0], [0.0, 1.0, 0.0]),
            TransformHandle::new(NullTransform::new()),
            st([0.5, 0.5, 0.5], [0.0, 0.0, 2.0]),
        ]);
        let simplified = chain.simplified();
        let result = simplified.as_chain().expect("barrier survives");
        assert_eq!(result.len(), 3, "one ST run on each side of the barrier");
        for p in [[0.4, 2.0, 1.0], [1.0, 1.0, 1.0]] {
            assert_close(simplified.map_point(p), chain.map_point(p));
        }
    }

    #[test]
    fn mul_concatenates_sequences_in_operand_order() {
        let a = st([2.0, 1.0, 1.0], [0.0, 0.0, 0.0]);
        let b = TransformHandle::new(PolarTransform::new());
        let c = st([1.0, 1.0, 1.0], [1.0, 0.0, 0.0]);
        let rhs = TransformHandle::new(ChainTransform::new(vec![b.clone(), c.clone()]));

        let forward = &a * &rhs;
        let fwd = forward.as_chain().expect("concatenation yields a chain");
        let seq = fwd.transforms();
        assert_eq!(seq.len(), 3);
        assert!(seq[0].ptr_eq(&a), "left operand's element first");
        assert!(seq[1].ptr_eq(&b) && seq[2].ptr_eq(&c));

        let backward = &rhs * &a;
        let seq = backward.as_chain().expect("chain").transforms();
        assert_eq!(seq.len(), 3);
        assert!(seq[2].ptr_eq(&a), "left operand's element last in mirrored order");
    }

    #[test]
    fn mul_of_two_leaves_merges_or_wraps() {
        let a = st([2.0, 2.0, 2.0], [0.0, 0.0, 0.0]);
        let b = st([1.0, 1.0, 1.0], [5.0, 0.0, 0.0]);
        let merged = &a * &b;
        assert_eq!(merged.kind(), "STTransform", "closed-form merge");

        let polar = TransformHandle::new(PolarTransform::new());
        let wrapped = &a * &polar;
        let chain = wrapped.as_chain().expect("no closed form, wrapped unmerged");
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn child_parameter_change_fires_exactly_one_notification() {
        let leaf = STTransform::identity();
        let handle = TransformHandle::new(leaf);
        let chain = ChainTransform::new(vec![handle.clone()]);

        let hits = Rc::new(Cell::new(0));
        {
            let hits = Rc::clone(&hits);
            chain.changed().subscribe(move || hits.set(hits.get() + 1));
        }

        let st = handle.as_any().downcast_ref::<STTransform>().unwrap();
        st.set_scale([3.0, 3.0, 3.0]);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn append_notifies_once_and_wires_the_new_child() {
        let chain = ChainTransform::default();
        let hits = Rc::new(Cell::new(0));
        {
            let hits = Rc::clone(&hits);
            chain.changed().subscribe(move || hits.set(hits.get() + 1));
        }

        let child = TransformHandle::new(STTransform::identity());
        chain.append(child.clone());
        assert_eq!(hits.get(), 1, "structural mutation fires once");

        let st = child.as_any().downcast_ref::<STTransform>().unwrap();
        st.set_translate([1.0, 0.0, 0.0]);
        assert_eq!(hits.get(), 2, "appended child's change is forwarded once");
    }

    #[test]
    fn nested_chain_forwards_grandchild_changes() {
        let leaf = TransformHandle::new(STTransform::identity());
        let inner = TransformHandle::new(ChainTransform::new(vec![leaf.clone()]));
        let outer = ChainTransform::new(vec![inner]);

        let hits = Rc::new(Cell::new(0));
        {
            let hits = Rc::clone(&hits);
            outer.changed().subscribe(move || hits.set(hits.get() + 1));
        }

        let st = leaf.as_any().downcast_ref::<STTransform>().unwrap();
        st.set_scale([2.0, 2.0, 2.0]);
        assert_eq!(hits.get(), 1, "cascade delivered through the inner chain");
    }

    #[test]
    fn subscriptions_exactly_match_children() {
        let a = TransformHandle::new(STTransform::identity());
        let b = TransformHandle::new(STTransform::identity());
        let chain = ChainTransform::new(vec![a.clone()]);
        assert_eq!(a.changed().listener_count(), 1);

        chain.set_at(0, b.clone());
        assert_eq!(a.changed().listener_count(), 0, "replaced child unsubscribed");
        assert_eq!(b.changed().listener_count(), 1);

        chain.set_transforms(vec![a.clone(), a.clone()]);
        assert_eq!(b.changed().listener_count(), 0);
        assert_eq!(
            a.changed().listener_count(),
            2,
            "one subscription per occurrence"
        );

        drop(chain);
        assert_eq!(a.changed().listener_count(), 0, "dropped chain unsubscribes");
    }

    #[test]
    fn forward_chain_order_is_reverse_of_sequence() {
        let a = st([2.0, 1.0, 1.0], [0.0, 0.0, 0.0]);
        let b = TransformHandle::new(PolarTransform::new());
        let chain = ChainTransform::new(vec![a.clone(), b.clone()]);

        let forward = chain.forward_chain();
        assert_eq!(forward.functions()[0].name(), b.shader_map().name());
        assert_eq!(forward.functions()[1].name(), a.shader_map().name());
        drop(forward);

        let inverse = chain.inverse_chain();
        assert_eq!(inverse.functions()[0].name(), a.shader_imap().name());
        assert_eq!(inverse.functions()[1].name(), b.shader_imap().name());
    }

    #[test]
    fn mutations_rebuild_shader_chains() {
        let chain = ChainTransform::default();
        assert!(chain.forward_chain().is_empty());
        chain.append(st([2.0, 1.0, 1.0], [0.0, 0.0, 0.0]));
        chain.prepend(TransformHandle::new(PolarTransform::new()));
        assert_eq!(chain.forward_chain().len(), 2);
        assert_eq!(chain.inverse_chain().len(), 2);
        let map = chain.shader_map();
        let src = map.source();
        assert!(src.contains("st_map_"), "fragment of the appended child");
        assert!(src.contains("polar_map_"), "fragment of the prepended child");
    }

    #[test]
    fn child_parameter_change_refreshes_emitted_source() {
        let child = TransformHandle::new(STTransform::new([2.0, 1.0, 1.0], [0.0, 0.0, 0.0]));
        let chain = ChainTransform::new(vec![child.clone()]);
        assert!(chain.shader_map().source().contains("vec3<f32>(2.0, 1.0, 1.0)"));

        let st = child.as_any().downcast_ref::<STTransform>().unwrap();
        st.set_scale([8.0, 1.0, 1.0]);
        assert!(
            chain.shader_map().source().contains("vec3<f32>(8.0, 1.0, 1.0)"),
            "stale fragments are refreshed on read"
        );
    }

    #[test]
    fn nested_chain_contributes_one_composed_fragment() {
        let inner = TransformHandle::new(ChainTransform::new(vec![
            st([2.0, 1.0, 1.0], [0.0, 0.0, 0.0]),
            st([1.0, 1.0, 1.0], [1.0, 0.0, 0.0]),
        ]));
        let outer = ChainTransform::new(vec![TransformHandle::new(PolarTransform::new()), inner]);

        let forward = outer.forward_chain();
        assert_eq!(forward.len(), 2, "the nested chain is one fragment");
        assert!(forward.functions()[0].name().starts_with("chain_map_"));
    }

    #[test]
    #[should_panic(expected = "must not contain itself")]
    fn inserting_a_chain_into_itself_panics() {
        let chain = Rc::new(ChainTransform::default());
        let handle = TransformHandle::from(Rc::clone(&chain));
        chain.append(handle);
    }

    #[test]
    #[should_panic(expected = "must not contain itself")]
    fn transitive_self_containment_panics() {
        let inner = Rc::new(ChainTransform::default());
        let outer = Rc::new(ChainTransform::new(vec![TransformHandle::from(Rc::clone(
            &inner,
        ))]));
        inner.append(TransformHandle::from(Rc::clone(&outer)));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn positional_replace_out_of_range_panics() {
        let chain = ChainTransform::new(vec![TransformHandle::new(STTransform::identity())]);
        chain.set_at(1, TransformHandle::new(STTransform::identity()));
    }

    #[test]
    fn display_lists_constituent_kinds() {
        let chain = ChainTransform::new(vec![
            st([1.0, 1.0, 1.0], [0.0, 0.0, 0.0]),
            TransformHandle::new(PolarTransform::new()),
        ]);
        assert_eq!(
            alloc::format!("{chain}"),
            "ChainTransform([STTransform, PolarTransform])"
        );
    }

    #[cfg(feature = "trace")]
    #[test]
    fn simplified_traced_reports_engine_activity() {
        use crate::trace::TraceSink;

        #[derive(Default)]
        struct Recorder {
            attempts: usize,
            merges: usize,
            summary: Option<SimplifiedEvent>,
        }

        impl TraceSink for Recorder {
            fn on_merge_attempt(&mut self, e: &MergeAttemptEvent) {
                self.attempts += 1;
                if e.merged {
                    self.merges += 1;
                }
            }

            fn on_simplified(&mut self, e: &SimplifiedEvent) {
                self.summary = Some(*e);
            }
        }

        let chain = ChainTransform::new(vec![
            st([2.0, 1.0, 1.0], [0.0, 0.0, 0.0]),
            st([1.0, 2.0, 1.0], [1.0, 0.0, 0.0]),
            TransformHandle::new(PolarTransform::new()),
        ]);

        let mut rec = Recorder::default();
        let _ = chain.simplified_traced(&mut Tracer::new(&mut rec));
        assert_eq!(rec.merges, 1, "the ST pair merges once");
        assert!(rec.attempts >= 2, "every adjacent pair was inspected");
        let summary = rec.summary.expect("summary emitted");
        assert_eq!(summary.input_len, 3);
        assert_eq!(summary.output_len, 2);
    }
}
