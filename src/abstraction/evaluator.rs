// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! This module defines the `Evaluator` trait -- the capability contract every
//! domain plugin (color-to-color, interval-to-bitset, pattern-to-hashmap, ...)
//! implements. The engine (`SubsetSolver`/`ConstraintSolver`) knows nothing
//! about graphics; it only ever calls through this trait.

use crate::{Move, Score};

/// Per-source evaluator. One is constructed per still-unmapped source and
/// carries arbitrary internal state (typically a cache keyed by destination
/// index) across repeated `update_moves_for_destination` calls.
///
/// # Contract
/// * `update_moves_for_destination` may be skipped by the engine once it has
///   cached a sticky negative result for a destination (see the crate-level
///   docs on the negative cache). This is safe only because feasibility is
///   monotone in destination state: filling slots never creates new capacity.
/// * `best_moves` must return `(Score::PosInfinity, vec![])` if and only if
///   no feasible move exists for this source in any destination seen so far.
/// * `apply_changes` and `is_destination_empty` are static: they operate on
///   a destination and change list without needing the evaluator's own
///   internal cache.
pub trait Evaluator: Sized {
    /// The type of the items being placed. Cloned once per evaluator at
    /// construction time since the engine's sources are read-only for the
    /// whole search and small domain value types are cheap to duplicate.
    type Source: Clone;
    /// The type of the output slots being filled. Cloned once per visited
    /// tree node: the engine replays a node's ancestor moves onto a fresh
    /// copy of the caller's destinations rather than keeping one working
    /// copy alive per branch.
    type Destination: Clone;
    /// Domain-defined description of how a move mutates a destination. The
    /// engine treats this as an opaque value; it is never inspected, only
    /// stored and passed back to `apply_changes`.
    type ChangeList: Clone;

    /// Constructs a fresh per-source evaluator.
    fn make(source_index: usize, source: Self::Source) -> Self;

    /// Re-evaluates feasibility of moving this source into `destination`
    /// under its current state. On infeasibility, the evaluator should
    /// record a sticky negative result internally. On feasibility, it
    /// should cache zero or more candidate change lists, each scored with a
    /// change-intrinsic `base_score`.
    fn update_moves_for_destination(&mut self, dest_index: usize, destination: &Self::Destination);

    /// Scans cached potential moves, applies any global adjustments (e.g. an
    /// "only one move available" bonus), and returns the minimum score along
    /// with every move that achieves it.
    fn best_moves(&self) -> (Score, Vec<Move<Self::ChangeList>>);

    /// Mutates `destination` in place to reflect `change_list`. The engine
    /// guarantees `destination` is always a subset solver's working copy,
    /// never the caller's original.
    fn apply_changes(source: &Self::Source, destination: &mut Self::Destination, change_list: &Self::ChangeList);

    /// True iff `destination` currently holds no committed assignment.
    /// Domains whose destinations are never empty (hash maps, pre-populated
    /// bitsets) should unconditionally return `false`.
    fn is_destination_empty(destination: &Self::Destination) -> bool;
}
