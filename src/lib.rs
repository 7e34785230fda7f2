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

//! # retrograph-solver
//! A generic constraint-search engine for mapping a list of *sources* onto a
//! list of *destinations* under per-domain feasibility and cost rules. It
//! began life solving the handful of combinatorial sub-problems a retro
//! graphics asset compiler runs into -- assigning colors to palette slots,
//! deduplicating tiles under flips, packing intervals into a VRAM bitmap,
//! covering pixels with the fewest hardware sprites -- and noticing that
//! every one of them is the *same* search dressed up differently. This crate
//! is that search, with the graphics stripped out: a branching best-first
//! search over `(source, destination)` assignments, driven entirely by a
//! small `Evaluator` trait your own domain implements.
//!
//! ## Side benefit
//! Because the engine has no idea what a color, a tile, or a sprite is, any
//! new "map these things onto those slots" problem that fits the same shape
//! -- feasibility monotone in destination state, a cost you can score -- gets
//! exhaustive, cost-ordered search for free.
//!
//! ## Quick Example
//! The following implements the simplest possible domain: entries that carry
//! an optional `color` and must be matched one-to-one onto slots that may
//! already carry a color. A slot accepts an entry if their colors agree (or
//! either is unset); assigning an unset slot's color costs 1, matching an
//! already-agreeing color is free.
//!
//! ```
//! # use retrograph_solver::*;
//! #[derive(Debug, Clone, PartialEq, Eq)]
//! struct Slot { color: Option<u8> }
//!
//! #[derive(Debug, Clone, PartialEq, Eq)]
//! struct ChangeList { color_to_set: Option<u8> }
//!
//! struct ColorEvaluator {
//!     source_index: usize,
//!     source: Slot,
//!     cache: std::collections::BTreeMap<usize, Option<PotentialMove<ChangeList>>>,
//! }
//!
//! impl Evaluator for ColorEvaluator {
//!     type Source = Slot;
//!     type Destination = Slot;
//!     type ChangeList = ChangeList;
//!
//!     fn make(source_index: usize, source: Slot) -> Self {
//!         ColorEvaluator { source_index, source, cache: Default::default() }
//!     }
//!
//!     fn update_moves_for_destination(&mut self, dest_index: usize, destination: &Slot) {
//!         if let Some(None) = self.cache.get(&dest_index) {
//!             return; // sticky negative cache
//!         }
//!         let feasible = match (self.source.color, destination.color) {
//!             (Some(a), Some(b)) => a == b,
//!             _ => true,
//!         };
//!         if !feasible {
//!             self.cache.insert(dest_index, None);
//!             return;
//!         }
//!         // Filling an empty slot is always a real change -- even a source
//!         // with no preference has to commit to *some* concrete color --
//!         // so only a destination that already carries a color can ever be
//!         // a free (no-op) match.
//!         let needs_set = destination.color.is_none();
//!         let change_list = ChangeList {
//!             color_to_set: if needs_set { Some(self.source.color.unwrap_or(0)) } else { None },
//!         };
//!         let score = if needs_set { Score::Finite(1) } else { Score::NegInfinity };
//!         let change_move = Move::new(self.source_index, dest_index, change_list);
//!         self.cache.insert(dest_index, Some(PotentialMove::new(change_move, score)));
//!     }
//!
//!     fn best_moves(&self) -> (Score, Vec<Move<ChangeList>>) {
//!         let mut best_score = Score::PosInfinity;
//!         let mut best_moves = Vec::new();
//!         for potential in self.cache.values().flatten() {
//!             match potential.base_score.cmp(&best_score) {
//!                 std::cmp::Ordering::Less => {
//!                     best_score = potential.base_score;
//!                     best_moves.clear();
//!                     best_moves.push(potential.change_move.clone());
//!                 }
//!                 std::cmp::Ordering::Equal => best_moves.push(potential.change_move.clone()),
//!                 std::cmp::Ordering::Greater => {}
//!             }
//!         }
//!         (best_score, best_moves)
//!     }
//!
//!     fn apply_changes(_source: &Slot, destination: &mut Slot, change_list: &ChangeList) {
//!         if let Some(color) = change_list.color_to_set {
//!             destination.color = Some(color);
//!         }
//!     }
//!
//!     fn is_destination_empty(destination: &Slot) -> bool {
//!         destination.color.is_none()
//!     }
//! }
//!
//! let sources = vec![Slot { color: Some(1) }, Slot { color: Some(2) }];
//! let destinations = vec![Slot { color: None }, Slot { color: Some(1) }];
//!
//! let mut solver = ConstraintSolver::<ColorEvaluator>::new(sources, destinations);
//! while !solver.is_exhausted() {
//!     solver.update();
//! }
//! assert!(!solver.solutions().is_empty());
//! ```
//!
//! ## Going further
//! Start with the `Evaluator` trait (the one thing every domain must
//! implement), then `ConstraintSolver` (the caller-facing driver) and
//! `SubsetSolver` (one exploration frontier, if you're curious how branching
//! and the free-move fast path work). `BitSet` and `Fsm` are the small
//! reusable substrates both of those are built from.

mod common;
mod abstraction;
mod implementation;

pub use common::*;
pub use abstraction::*;
pub use implementation::*;
