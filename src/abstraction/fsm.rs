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

//! A trivial context-driven finite-state machine. States are stateless
//! handles with three hooks (`on_enter`, `on_update`, `on_exit`); `on_enter`
//! may return a next state, in which case the machine keeps chaining through
//! enters (and the matching exits) until a state's `on_enter` settles on
//! `None`. This is the skeleton that `ConstraintSolver` drives itself
//! through; see `implementation::constraint_solver` for the concrete states.

/// A state of a [`Fsm`]. `Ctx` is the context threaded through every hook --
/// for this crate's use, the `ConstraintSolver` being driven.
pub trait FsmState<Ctx> {
    /// Called when the machine transitions into this state. May return the
    /// next state to chain into immediately (entered before `update()` is
    /// ever called on this one).
    fn on_enter(&self, _ctx: &mut Ctx) -> Option<Box<dyn FsmState<Ctx>>> {
        None
    }

    /// Called once per `Fsm::update()` while this state is current.
    fn on_update(&self, _ctx: &mut Ctx) -> Option<Box<dyn FsmState<Ctx>>> {
        None
    }

    /// Called when the machine is about to leave this state, before the next
    /// state's `on_enter` runs. Exiting never itself causes a transition.
    fn on_exit(&self, _ctx: &mut Ctx) {}

    /// True for a terminal state. `Fsm` never calls `on_update` again once a
    /// terminal state is reached.
    fn is_terminal(&self) -> bool {
        false
    }
}

/// Drives a [`FsmState`] chain against a context.
pub struct Fsm<Ctx> {
    current: Option<Box<dyn FsmState<Ctx>>>,
}

impl<Ctx> Default for Fsm<Ctx> {
    fn default() -> Self {
        Fsm { current: None }
    }
}

impl<Ctx> Fsm<Ctx> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters `initial`, chaining through any states whose `on_enter`
    /// immediately redirects elsewhere.
    pub fn start(&mut self, ctx: &mut Ctx, initial: Box<dyn FsmState<Ctx>>) {
        self.transition(ctx, initial);
    }

    /// True once the machine has settled into a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.current.as_ref().map(|s| s.is_terminal()).unwrap_or(false)
    }

    /// Advances the machine by exactly one `on_update` hook. If that hook
    /// requests a transition, chains through `on_enter`s as `start` does.
    pub fn update(&mut self, ctx: &mut Ctx) {
        let next = match &self.current {
            Some(state) => state.on_update(ctx),
            None => None,
        };
        if let Some(next_state) = next {
            self.transition(ctx, next_state);
        }
    }

    fn transition(&mut self, ctx: &mut Ctx, mut new_state: Box<dyn FsmState<Ctx>>) {
        loop {
            if let Some(current) = self.current.take() {
                current.on_exit(ctx);
            }
            let chained = new_state.on_enter(ctx);
            self.current = Some(new_state);
            match chained {
                Some(next) => new_state = next,
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod test_fsm {
    use super::*;

    #[derive(Default)]
    struct Counter {
        entered: Vec<&'static str>,
        exited: Vec<&'static str>,
        updates: usize,
    }

    struct A;
    struct B;
    struct Done;

    impl FsmState<Counter> for A {
        fn on_enter(&self, ctx: &mut Counter) -> Option<Box<dyn FsmState<Counter>>> {
            ctx.entered.push("A");
            None
        }
        fn on_update(&self, _ctx: &mut Counter) -> Option<Box<dyn FsmState<Counter>>> {
            Some(Box::new(B))
        }
        fn on_exit(&self, ctx: &mut Counter) {
            ctx.exited.push("A");
        }
    }

    impl FsmState<Counter> for B {
        fn on_enter(&self, ctx: &mut Counter) -> Option<Box<dyn FsmState<Counter>>> {
            ctx.entered.push("B");
            Some(Box::new(Done))
        }
    }

    impl FsmState<Counter> for Done {
        fn on_enter(&self, ctx: &mut Counter) -> Option<Box<dyn FsmState<Counter>>> {
            ctx.entered.push("Done");
            None
        }
        fn on_update(&self, ctx: &mut Counter) -> Option<Box<dyn FsmState<Counter>>> {
            ctx.updates += 1;
            None
        }
        fn is_terminal(&self) -> bool {
            true
        }
    }

    #[test]
    fn chains_on_enter_until_none_returned() {
        let mut ctx = Counter::default();
        let mut fsm = Fsm::new();
        fsm.start(&mut ctx, Box::new(A));
        assert_eq!(ctx.entered, vec!["A"]);
        assert!(!fsm.is_terminal());

        fsm.update(&mut ctx);
        assert_eq!(ctx.exited, vec!["A"]);
        assert_eq!(ctx.entered, vec!["A", "B", "Done"]);
        assert!(fsm.is_terminal());

        fsm.update(&mut ctx);
        assert_eq!(ctx.updates, 1);
    }
}
