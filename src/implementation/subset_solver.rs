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

//! One exploration frontier. A `SubsetSolver` owns a mutable working copy of
//! the destination state, one live `Evaluator` per still-unmapped source, and
//! the dirty/empty destination bookkeeping described in the crate-level docs.
//! `ConstraintSolver` is the only caller; it drives a `SubsetSolver` through
//! alternating `assess_moves`/`choose_next_moves` rounds and replays
//! `execute_move` when resuming a previously-forked branch.

use std::rc::Rc;

use metrohash::MetroHashMap;

use crate::{BitSet, Evaluator, Move, Score};

/// Raised by `assess_moves` when every source is already mapped: this subset
/// solver is a solution leaf. Pure flow control, not a real error.
pub(crate) struct AllItemsMapped;

/// Raised by `choose_next_moves` when some live evaluator has no feasible
/// move left: this branch is a dead end. Pure flow control, not a real error.
pub(crate) struct NoMovesAvailable;

/// The outcome of one `choose_next_moves` round.
pub(crate) enum ChooseOutcome<C> {
    /// The global minimum score was `NegInfinity`: every tied move was
    /// applied to this same subset solver, in the order returned. No
    /// branching occurred; the caller should append these moves to the
    /// current tree node and keep going.
    FreeCommit(Vec<Move<C>>),
    /// The global minimum score was finite: `continued` was applied to this
    /// subset solver (the search keeps going in place). `forked` holds the
    /// remaining tied moves, none of which were applied here -- the caller
    /// materializes each as a new sibling tree node to visit later.
    Fork { continued: Move<C>, forked: Vec<Move<C>> },
}

pub(crate) struct SubsetSolver<E: Evaluator> {
    sources: Rc<Vec<E::Source>>,
    wip_destinations: Vec<E::Destination>,
    #[allow(dead_code)] // kept for parity with the spec's data model / future introspection
    unmapped_sources: BitSet,
    source_evaluators: MetroHashMap<usize, E>,
    dirty_destinations: BitSet,
    empty_destinations: BitSet,
}

impl<E: Evaluator> SubsetSolver<E> {
    /// Builds a fresh frontier over all sources unmapped. `destinations` must
    /// already be the working copy (a deep copy of the caller's originals);
    /// the engine never constructs a `SubsetSolver` directly over caller-owned
    /// state.
    pub(crate) fn new(sources: Rc<Vec<E::Source>>, destinations: Vec<E::Destination>) -> Self {
        let num_sources = sources.len();
        let num_destinations = destinations.len();

        let mut source_evaluators = MetroHashMap::default();
        for (index, source) in sources.iter().enumerate() {
            source_evaluators.insert(index, E::make(index, source.clone()));
        }

        let mut unmapped_sources = BitSet::new(num_sources);
        unmapped_sources.set_all();

        let mut dirty_destinations = BitSet::new(num_destinations);
        dirty_destinations.set_all();

        let mut empty_destinations = BitSet::new(num_destinations);
        let mut first_empty_found = false;
        for (dest_index, destination) in destinations.iter().enumerate() {
            if E::is_destination_empty(destination) {
                empty_destinations.set(dest_index);
                if !first_empty_found {
                    first_empty_found = true;
                } else {
                    // Hide all empties after the first: they'd all produce
                    // identical candidates, so evaluating more than one is
                    // wasted work.
                    dirty_destinations.clear(dest_index);
                }
            }
        }

        SubsetSolver {
            sources,
            wip_destinations: destinations,
            unmapped_sources,
            source_evaluators,
            dirty_destinations,
            empty_destinations,
        }
    }

    /// Re-propagates every dirty destination to every live evaluator, then
    /// clears its dirty bit. The only place an evaluator learns about
    /// destination state changes.
    pub(crate) fn assess_moves(&mut self) -> Result<(), AllItemsMapped> {
        if self.source_evaluators.is_empty() {
            return Err(AllItemsMapped);
        }

        let wip_destinations = &self.wip_destinations;
        let mut next_dirty = self.dirty_destinations.next_set(0);
        while let Some(dest_index) = next_dirty {
            let destination = &wip_destinations[dest_index];
            for evaluator in self.source_evaluators.values_mut() {
                evaluator.update_moves_for_destination(dest_index, destination);
            }
            self.dirty_destinations.clear(dest_index);
            next_dirty = self.dirty_destinations.next_set(dest_index + 1);
        }

        Ok(())
    }

    /// Polls every live evaluator for its best moves, reduces to the global
    /// minimum, and either commits all free ties at once or forks on a
    /// finite tie.
    pub(crate) fn choose_next_moves(&mut self) -> Result<ChooseOutcome<E::ChangeList>, NoMovesAvailable> {
        let mut best_score = Score::PosInfinity;
        let mut best_moves: Vec<Move<E::ChangeList>> = Vec::new();

        for evaluator in self.source_evaluators.values() {
            let (score, moves) = evaluator.best_moves();
            if moves.is_empty() {
                return Err(NoMovesAvailable);
            }
            match score.cmp(&best_score) {
                std::cmp::Ordering::Less => {
                    best_score = score;
                    best_moves = moves;
                }
                std::cmp::Ordering::Equal => best_moves.extend(moves),
                std::cmp::Ordering::Greater => {}
            }
        }

        if best_score.is_free() {
            for mv in &best_moves {
                self.execute_move(mv);
            }
            Ok(ChooseOutcome::FreeCommit(best_moves))
        } else {
            let mut remaining = best_moves;
            let continued = remaining
                .pop()
                .expect("a finite best_score always comes with at least one move");
            self.execute_move(&continued);
            Ok(ChooseOutcome::Fork { continued, forked: remaining })
        }
    }

    /// Applies `mv` to the working destination state, drops the now-mapped
    /// source's evaluator, and maintains the dirty/empty destination
    /// bookkeeping.
    pub(crate) fn execute_move(&mut self, mv: &Move<E::ChangeList>) {
        let source = &self.sources[mv.source_index];
        E::apply_changes(source, &mut self.wip_destinations[mv.dest_index], &mv.change_list);

        self.source_evaluators.remove(&mv.source_index);
        self.unmapped_sources.clear(mv.source_index);

        self.dirty_destinations.set(mv.dest_index);

        if self.empty_destinations.is_set(mv.dest_index) {
            let still_empty = E::is_destination_empty(&self.wip_destinations[mv.dest_index]);
            assert!(
                !still_empty,
                "evaluator bug: move left destination {} empty after being applied",
                mv.dest_index
            );
            self.empty_destinations.clear(mv.dest_index);

            if let Some(next_empty) = self.empty_destinations.next_set(mv.dest_index + 1) {
                self.dirty_destinations.set(next_empty);
            }
        }
    }
}
