use std::sync::{Mutex, MutexGuard, PoisonError};

/// A generic state machine wrapper ensuring thread-safe state transitions.
///
/// This struct wraps a state `S` in a `Mutex` and provides a `transition`
/// method to perform atomic state updates and return an action/result. It is
/// the backbone of the blocker lifecycle (Inactive -> Active -> Inactive) and
/// the enforcement controller's Idle/Armed cycle: every transition, including
/// the precondition check that rejects it, happens under one lock acquisition.
///
/// # Example
///
/// ```rust
/// use hermit_common::state_machine::StateMachine;
///
/// #[derive(PartialEq)]
/// enum Lifecycle {
///     Inactive,
///     Active,
/// }
///
/// let machine = StateMachine::new(Lifecycle::Inactive);
///
/// let activated = machine.transition(|state| match state {
///     Lifecycle::Inactive => {
///         *state = Lifecycle::Active;
///         true
///     }
///     Lifecycle::Active => false,
/// });
/// assert!(activated);
/// ```
#[derive(Debug)]
pub struct StateMachine<S> {
    state: Mutex<S>,
}

impl<S> StateMachine<S> {
    /// Creates a new `StateMachine` in the given initial state.
    pub fn new(initial_state: S) -> Self {
        Self {
            state: Mutex::new(initial_state),
        }
    }

    /// Access the underlying state directly via a MutexGuard.
    ///
    /// Use this for simple reads or checks that don't require complex
    /// transitions. For transitions, prefer `transition`.
    ///
    /// A poisoned lock is recovered rather than propagated: the state a
    /// panicking holder left behind is exactly what forced-recovery paths
    /// (`reset`) need to observe.
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Perform an atomic transition on the state.
    ///
    /// The closure `f` is called with a mutable reference to the current
    /// state. The lock is held for the duration of the closure.
    ///
    /// Returns the result of the closure.
    pub fn transition<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut state = self.lock();
        f(&mut *state)
    }
}

impl<S: Clone> StateMachine<S> {
    /// Snapshot the current state.
    pub fn current(&self) -> S {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_concurrent_transitions() {
        let machine = Arc::new(StateMachine::new(0));
        let mut handles = vec![];

        for _ in 0..10 {
            let machine = machine.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    machine.transition(|state| {
                        *state += 1;
                    });
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*machine.lock(), 1000);
    }

    #[test]
    fn test_rejected_transition_leaves_state_unchanged() {
        #[derive(Clone, Debug, PartialEq)]
        enum Lifecycle {
            Inactive,
            Active,
        }

        let machine = StateMachine::new(Lifecycle::Active);

        let accepted = machine.transition(|state| match state {
            Lifecycle::Inactive => {
                *state = Lifecycle::Active;
                true
            }
            Lifecycle::Active => false,
        });

        assert!(!accepted);
        assert_eq!(machine.current(), Lifecycle::Active);
    }
}
