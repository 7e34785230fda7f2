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

//! The outer driver. Where a `SubsetSolver` explores a single branch,
//! `ConstraintSolver` owns the whole search tree: every fork spawned by a
//! `SubsetSolver`'s finite-score ties becomes a child node, enqueued for a
//! later visit; the branch that "continues in place" keeps the live
//! `SubsetSolver` so the common case (no ties at all) never pays for a tree
//! walk. Finished branches (every source mapped) are recorded as solutions by
//! walking the node's ancestor chain back to the root and concatenating
//! `moves`.
//!
//! A node accumulates moves in its own `moves` list only while it is the
//! current, childless branch; the instant it forks, it is frozen (its moves
//! list never grows again) and its ties become children. This is what makes
//! ancestor-chain replay correct: a node's full move list is always exactly
//! what was committed to it before it stopped being the frontier.

use std::collections::VecDeque;
use std::rc::Rc;

use log::{debug, trace};

use crate::{Evaluator, Fsm, Move};

use super::subset_solver::{ChooseOutcome, SubsetSolver};

/// One node of the exploration tree. Nodes are never removed once created;
/// `ConstraintSolver` owns them all in a flat arena and addresses them by
/// index.
#[derive(Debug)]
pub struct SolverSubsetNode<C> {
    parent: Option<usize>,
    moves: Vec<Move<C>>,
    children: Vec<usize>,
}

impl<C> SolverSubsetNode<C> {
    fn root() -> Self {
        SolverSubsetNode { parent: None, moves: Vec::new(), children: Vec::new() }
    }

    /// The moves committed directly to this node (not including ancestors).
    pub fn moves(&self) -> &[Move<C>] {
        &self.moves
    }

    /// The parent node's index, or `None` for the root.
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Indices of this node's children.
    pub fn children(&self) -> &[usize] {
        &self.children
    }
}

/// Drives a best-first search over `(source, destination)` assignments for a
/// domain described by `E`. See the crate-level docs for a worked example.
pub struct ConstraintSolver<E: Evaluator> {
    sources: Rc<Vec<E::Source>>,
    destinations: Vec<E::Destination>,
    nodes: Vec<SolverSubsetNode<E::ChangeList>>,
    visit_queue: VecDeque<usize>,
    solutions: Vec<Vec<Move<E::ChangeList>>>,
    current: Option<(usize, SubsetSolver<E>)>,
    fsm: Fsm<ConstraintSolver<E>>,
}

impl<E: Evaluator> ConstraintSolver<E> {
    /// Builds a solver over every way to map `sources` onto `destinations`.
    /// `destinations` is kept as-is; `apply_solution` later mutates it in
    /// place to materialize whichever solution the caller picks.
    pub fn new(sources: Vec<E::Source>, destinations: Vec<E::Destination>) -> Self {
        debug!(
            "constraint solver starting: {} sources, {} destinations",
            sources.len(),
            destinations.len()
        );
        let mut solver = ConstraintSolver {
            sources: Rc::new(sources),
            destinations,
            nodes: vec![SolverSubsetNode::root()],
            visit_queue: VecDeque::from([0usize]),
            solutions: Vec::new(),
            current: None,
            fsm: Fsm::new(),
        };
        let mut fsm = std::mem::take(&mut solver.fsm);
        fsm.start(&mut solver, Box::new(states::AssessCompletion::<E>::new()));
        solver.fsm = fsm;
        solver
    }

    /// True once every branch of the tree has been fully explored (or failed)
    /// and the visit queue is drained.
    pub fn is_exhausted(&self) -> bool {
        self.fsm.is_terminal()
    }

    /// Advances the search by one FSM step. Call repeatedly (e.g. in a `while
    /// !is_exhausted()` loop) until `is_exhausted()` returns true.
    pub fn update(&mut self) {
        let mut fsm = std::mem::take(&mut self.fsm);
        fsm.update(self);
        self.fsm = fsm;
    }

    /// Every solution found so far, each a full sequence of moves from the
    /// root (one per source, in no particular order).
    pub fn solutions(&self) -> &[Vec<Move<E::ChangeList>>] {
        &self.solutions
    }

    /// Read access to the original sources.
    pub fn sources(&self) -> &[E::Source] {
        &self.sources
    }

    /// Read access to the destinations passed to `new`, as last mutated by
    /// `apply_solution`.
    pub fn destinations(&self) -> &[E::Destination] {
        &self.destinations
    }

    /// Replays `solution` onto the destinations this solver was built with,
    /// mutating them in place. The only operation that touches the caller's
    /// original destination state.
    pub fn apply_solution(&mut self, solution: &[Move<E::ChangeList>]) {
        for mv in solution {
            E::apply_changes(&self.sources[mv.source_index], &mut self.destinations[mv.dest_index], &mv.change_list);
        }
    }

    /// The exploration tree's nodes, for introspection (e.g. counting forks).
    pub fn nodes(&self) -> &[SolverSubsetNode<E::ChangeList>] {
        &self.nodes
    }

    fn ancestor_chain(&self, node_id: usize) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut cursor = Some(node_id);
        while let Some(id) = cursor {
            chain.push(id);
            cursor = self.nodes[id].parent;
        }
        chain.reverse();
        chain
    }

    fn build_subset_solver_for(&self, node_id: usize) -> SubsetSolver<E> {
        let mut subset = SubsetSolver::new(Rc::clone(&self.sources), self.destinations.clone());
        for ancestor_id in self.ancestor_chain(node_id) {
            for mv in &self.nodes[ancestor_id].moves {
                subset.execute_move(mv);
            }
        }
        subset
    }

    fn push_child(&mut self, parent_id: usize, moves: Vec<Move<E::ChangeList>>) -> usize {
        let child_id = self.nodes.len();
        self.nodes.push(SolverSubsetNode { parent: Some(parent_id), moves, children: Vec::new() });
        self.nodes[parent_id].children.push(child_id);
        child_id
    }

    fn apply_choose_outcome(&mut self, node_id: usize, outcome: ChooseOutcome<E::ChangeList>) {
        match outcome {
            ChooseOutcome::FreeCommit(moves) => {
                trace!("node {}: committing {} free move(s)", node_id, moves.len());
                self.nodes[node_id].moves.extend(moves);
            }
            ChooseOutcome::Fork { continued, forked } => {
                let fork_count = 1 + forked.len();
                trace!("node {}: forking into {} child/children", node_id, fork_count);
                let continued_id = self.push_child(node_id, vec![continued]);
                for mv in forked {
                    let child_id = self.push_child(node_id, vec![mv]);
                    self.visit_queue.push_back(child_id);
                }
                if let Some((current_id, _)) = self.current.as_mut() {
                    *current_id = continued_id;
                }
            }
        }
    }

    fn accept_current_as_successful(&mut self) {
        let (node_id, _) = self.current.take().expect("reached success with no live subset solver");
        let mut solution = Vec::new();
        for ancestor_id in self.ancestor_chain(node_id) {
            solution.extend(self.nodes[ancestor_id].moves.iter().cloned());
        }
        debug!("node {}: solution found with {} move(s)", node_id, solution.len());
        self.solutions.push(solution);
    }
}

mod states {
    use std::marker::PhantomData;

    use log::trace;

    use crate::{Evaluator, FsmState};

    use super::ConstraintSolver;

    /// No current subset solver: pull the next node off the visit queue and
    /// build one by replaying its ancestors, or settle into `Exhausted` if
    /// the queue is empty.
    pub(super) struct AssessCompletion<E>(PhantomData<E>);

    impl<E> AssessCompletion<E> {
        pub(super) fn new() -> Self {
            AssessCompletion(PhantomData)
        }
    }

    impl<E: Evaluator> FsmState<ConstraintSolver<E>> for AssessCompletion<E> {
        fn on_enter(&self, ctx: &mut ConstraintSolver<E>) -> Option<Box<dyn FsmState<ConstraintSolver<E>>>> {
            debug_assert!(ctx.current.is_none(), "AssessCompletion entered with a live subset solver");
            match ctx.visit_queue.pop_front() {
                None => Some(Box::new(Exhausted)),
                Some(node_id) => {
                    trace!("visiting node {}", node_id);
                    let subset = ctx.build_subset_solver_for(node_id);
                    ctx.current = Some((node_id, subset));
                    Some(Box::new(AssessMoves::<E>::new()))
                }
            }
        }
    }

    /// Re-propagates dirty destinations to the live evaluators. Either every
    /// source is already mapped (success) or there is more to evaluate.
    pub(super) struct AssessMoves<E>(PhantomData<E>);

    impl<E> AssessMoves<E> {
        pub(super) fn new() -> Self {
            AssessMoves(PhantomData)
        }
    }

    impl<E: Evaluator> FsmState<ConstraintSolver<E>> for AssessMoves<E> {
        fn on_update(&self, ctx: &mut ConstraintSolver<E>) -> Option<Box<dyn FsmState<ConstraintSolver<E>>>> {
            let (_, subset) =
                ctx.current.as_mut().expect("AssessMoves requires a live subset solver");
            match subset.assess_moves() {
                Ok(()) => Some(Box::new(SelectMoves::<E>::new())),
                Err(_all_items_mapped) => Some(Box::new(SuccessfulSubsetCompletion::<E>::new())),
            }
        }
    }

    /// Polls every live evaluator for its best moves and either commits a
    /// free tie, forks a finite tie, or discovers the branch is dead.
    pub(super) struct SelectMoves<E>(PhantomData<E>);

    impl<E> SelectMoves<E> {
        pub(super) fn new() -> Self {
            SelectMoves(PhantomData)
        }
    }

    impl<E: Evaluator> FsmState<ConstraintSolver<E>> for SelectMoves<E> {
        fn on_update(&self, ctx: &mut ConstraintSolver<E>) -> Option<Box<dyn FsmState<ConstraintSolver<E>>>> {
            let (node_id, subset) =
                ctx.current.as_mut().expect("SelectMoves requires a live subset solver");
            let node_id = *node_id;
            match subset.choose_next_moves() {
                Ok(outcome) => {
                    ctx.apply_choose_outcome(node_id, outcome);
                    Some(Box::new(AssessMoves::<E>::new()))
                }
                Err(_no_moves_available) => Some(Box::new(FailedSubsetCompletion::<E>::new())),
            }
        }
    }

    /// Every source mapped: record the solution and go looking for the next
    /// node to visit.
    pub(super) struct SuccessfulSubsetCompletion<E>(PhantomData<E>);

    impl<E> SuccessfulSubsetCompletion<E> {
        pub(super) fn new() -> Self {
            SuccessfulSubsetCompletion(PhantomData)
        }
    }

    impl<E: Evaluator> FsmState<ConstraintSolver<E>> for SuccessfulSubsetCompletion<E> {
        fn on_enter(&self, ctx: &mut ConstraintSolver<E>) -> Option<Box<dyn FsmState<ConstraintSolver<E>>>> {
            ctx.accept_current_as_successful();
            Some(Box::new(AssessCompletion::<E>::new()))
        }
    }

    /// Some source ran out of feasible destinations: drop this branch and go
    /// looking for the next node to visit.
    pub(super) struct FailedSubsetCompletion<E>(PhantomData<E>);

    impl<E> FailedSubsetCompletion<E> {
        pub(super) fn new() -> Self {
            FailedSubsetCompletion(PhantomData)
        }
    }

    impl<E: Evaluator> FsmState<ConstraintSolver<E>> for FailedSubsetCompletion<E> {
        fn on_enter(&self, ctx: &mut ConstraintSolver<E>) -> Option<Box<dyn FsmState<ConstraintSolver<E>>>> {
            trace!("node {}: dead end, no feasible move for some source", ctx.current.as_ref().unwrap().0);
            ctx.current = None;
            Some(Box::new(AssessCompletion::<E>::new()))
        }
    }

    /// The visit queue is drained: nothing left to explore.
    pub(super) struct Exhausted;

    impl<Ctx> FsmState<Ctx> for Exhausted {
        fn is_terminal(&self) -> bool {
            true
        }
    }
}
