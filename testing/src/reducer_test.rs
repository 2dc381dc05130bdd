//! Given-When-Then harness for reducers

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use museum_tickets_core::{effect::Effect, reducer::Reducer};

type StateAssertion<S> = Box<dyn FnOnce(&S)>;

type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers
///
/// Several `when_action` calls are reduced in order against the same state.
/// Effect assertions see only the effects of the last action, which mirrors
/// what a caller observes after its final input.
///
/// # Example
///
/// ```ignore
/// ReducerTest::new(SessionReducer::new())
///     .with_env(env)
///     .given_state(SessionState::default())
///     .when_action(SessionAction::StartBooking)
///     .when_action(SessionAction::SelectDate { date: "2025-06-02".into() })
///     .then_state(|s| assert_eq!(s.step, SessionStep::NationalitySelection))
///     .then_effects(assertions::assert_no_effects)
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Queue an action (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Queue several actions (When)
    #[must_use]
    pub fn when_actions(mut self, actions: impl IntoIterator<Item = A>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the effects of the last action (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the reducer and every assertion
    ///
    /// # Panics
    ///
    /// Panics if the initial state, an action, or the environment is missing,
    /// or if any assertion fails.
    #[allow(clippy::panic, clippy::expect_used)]
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        let env = self
            .environment
            .expect("Environment must be set with with_env()");
        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }
        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use museum_tickets_core::effect::Effect;

    /// The action started no external call.
    ///
    /// `Effect::None` entries are ignored.
    ///
    /// # Panics
    ///
    /// Panics on any other effect.
    #[allow(clippy::panic)]
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        if let Some(effect) = effects.iter().find(|effect| !effect.is_none()) {
            panic!("no effects expected, got {effect:?} among {effects:?}");
        }
    }

    /// Exactly `expected` effects were returned.
    ///
    /// # Panics
    ///
    /// Panics on a different count.
    #[allow(clippy::panic)]
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        let actual = effects.len();
        assert!(actual == expected, "{expected} effect(s) expected, got {actual}");
    }

    /// Some effect is an async call whose result is fed back.
    ///
    /// # Panics
    ///
    /// Panics when none of `effects` is an `Effect::Future`.
    #[allow(clippy::panic)]
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        let futures = effects
            .iter()
            .filter(|effect| matches!(effect, Effect::Future(_)))
            .count();
        assert!(futures > 0, "a future effect was expected among {} effect(s)", effects.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::SmallVec;

    #[derive(Clone, Debug)]
    enum Step {
        Forward,
        Fetch,
    }

    struct StepReducer;

    impl Reducer for StepReducer {
        type State = u32;
        type Action = Step;
        type Environment = ();

        fn reduce(&self, state: &mut u32, action: Step, _env: &()) -> SmallVec<[Effect<Step>; 4]> {
            match action {
                Step::Forward => {
                    *state += 1;
                    SmallVec::new()
                },
                Step::Fetch => {
                    let mut effects = SmallVec::new();
                    effects.push(Effect::future(async { Some(Step::Forward) }));
                    effects
                },
            }
        }
    }

    #[test]
    fn actions_apply_in_order() {
        ReducerTest::new(StepReducer)
            .with_env(())
            .given_state(0)
            .when_actions([Step::Forward, Step::Forward])
            .when_action(Step::Fetch)
            .then_state(|n| assert_eq!(*n, 2))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn effects_reflect_last_action_only() {
        ReducerTest::new(StepReducer)
            .with_env(())
            .given_state(0)
            .when_action(Step::Fetch)
            .when_action(Step::Forward)
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}
