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

//! This module defines the most basic data types that are used throughout all
//! the code of our library (both at the abstraction and implementation levels).
//! These are also the types your evaluator implementations are likely to work
//! with directly.

use std::ops::Add;

// ----------------------------------------------------------------------------
// --- SCORE --------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The score of a potential move, totally ordered, lower is better.
///
/// `NegInfinity` is a sentinel meaning "free, take unconditionally"; it must
/// only be produced by an evaluator for a move that requires no change to the
/// destination. `PosInfinity` means "invalid, do not select" -- it is kept in
/// the evaluator's table (rather than simply absent) so that the source isn't
/// mistaken for one with no live evaluator at all.
///
/// This is a hand-rolled enum rather than `f64` so that comparisons stay total
/// and allocation-free; declaration order doubles as the `Ord` order, so do
/// not reorder these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Score {
    /// A move that is free to take: no state change is required.
    NegInfinity,
    /// An ordinary, finite cost.
    Finite(i64),
    /// An infeasible move, kept only to prove the source isn't dead-ended.
    PosInfinity,
}

impl Score {
    /// True for the sentinel meaning "take unconditionally".
    pub fn is_free(self) -> bool {
        matches!(self, Score::NegInfinity)
    }

    /// True for the sentinel meaning "do not select".
    pub fn is_invalid(self) -> bool {
        matches!(self, Score::PosInfinity)
    }
}

impl Add<i64> for Score {
    type Output = Score;

    /// Adds a finite adjustment to a score. Adjustments never move a finite
    /// score across a sentinel boundary; only an evaluator's explicit
    /// `NegInfinity`/`PosInfinity` sentinel construction does that.
    fn add(self, rhs: i64) -> Score {
        match self {
            Score::NegInfinity => Score::NegInfinity,
            Score::PosInfinity => Score::PosInfinity,
            Score::Finite(v) => Score::Finite(v + rhs),
        }
    }
}

impl Default for Score {
    /// The default score is `PosInfinity`: absent evidence of feasibility,
    /// a move is assumed infeasible.
    fn default() -> Self {
        Score::PosInfinity
    }
}

// ----------------------------------------------------------------------------
// --- MOVE ---------------------------------------------------------------
// ----------------------------------------------------------------------------
/// An immutable record pairing a source with a destination, plus the
/// domain-defined `change_list` describing how to mutate the destination to
/// absorb the source. The engine never inspects `change_list`; it is created
/// by an evaluator in `update_moves_for_destination`, stored by the subset
/// solver as a committed move, and handed back to the evaluator's
/// `apply_changes` unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move<C> {
    pub source_index: usize,
    pub dest_index: usize,
    pub change_list: C,
}

impl<C> Move<C> {
    pub fn new(source_index: usize, dest_index: usize, change_list: C) -> Self {
        Move { source_index, dest_index, change_list }
    }
}

// ----------------------------------------------------------------------------
// --- POTENTIAL MOVE -------------------------------------------------------
// ----------------------------------------------------------------------------
/// A candidate move cached by an evaluator between assess passes.
/// `base_score` reflects change-intrinsic cost only; global conditions (only
/// one move available, free) are re-added by the evaluator at `best_moves`
/// time, not stored here.
#[derive(Debug, Clone)]
pub struct PotentialMove<C> {
    pub change_move: Move<C>,
    pub base_score: Score,
}

impl<C> PotentialMove<C> {
    pub fn new(change_move: Move<C>, base_score: Score) -> Self {
        PotentialMove { change_move, base_score }
    }
}

// ----------------------------------------------------------------------------
// --- ERRORS ---------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The one real, programmer-facing error this crate raises. Every other
/// control-flow condition named by the specification (a subset fully mapped,
/// a subset with no moves left) is internal flow control, threaded through
/// `Result`-returning private methods, and is not an `std::error::Error`.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitSetError {
    /// Raised when combining two `BitSet`s of differing widths. This is a
    /// programmer error: the caller never constructs mismatched widths by
    /// accident if it sizes every `BitSet` from the same source/destination
    /// count.
    #[error("mismatched BitSet widths: {lhs} != {rhs}")]
    WidthMismatch { lhs: usize, rhs: usize },
}
