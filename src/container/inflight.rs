//! Container-wide bookkeeping for singletons under construction.
//!
//! A [`Resolution`](super::Resolution) only sees its own path, which misses
//! two kinds of cycle: a factory that starts a fresh path through
//! `container()`, and two threads each building one half of a cycle. Both
//! would block forever on the other's construction. This table records which
//! thread builds each singleton and which key every blocked thread is
//! waiting for, so a claim that would close a wait-for loop fails with
//! [`ResolveError::CyclicDependency`] instead of blocking.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

use super::error::ResolveError;
use super::key::ServiceKey;

#[derive(Default)]
struct State {
    /// Thread currently running each singleton's producer
    owners: HashMap<ServiceKey, ThreadId>,
    /// Singletons each thread is building, outermost first
    stacks: HashMap<ThreadId, Vec<ServiceKey>>,
    /// Key each blocked thread is waiting on
    waiting: HashMap<ThreadId, ServiceKey>,
}

#[derive(Default)]
pub(crate) struct InFlight {
    state: Mutex<State>,
    released: Condvar,
}

/// Outcome of [`InFlight::claim`].
pub(crate) enum Claim<'a> {
    /// Another thread finished the singleton while this one waited
    Ready,
    /// This thread owns construction until the guard drops
    Owned(ClaimGuard<'a>),
}

impl InFlight {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take ownership of building `key`, waiting while another thread holds
    /// it. `ready` reports whether the singleton has been stored, and is
    /// checked under the lock before every claim attempt.
    pub(crate) fn claim(
        &self,
        key: &ServiceKey,
        ready: impl Fn() -> bool,
    ) -> Result<Claim<'_>, ResolveError> {
        let me = thread::current().id();
        let mut state = self.lock();
        loop {
            if ready() {
                return Ok(Claim::Ready);
            }
            let Some(owner) = state.owners.get(key).copied() else {
                state.owners.insert(key.clone(), me);
                state.stacks.entry(me).or_default().push(key.clone());
                return Ok(Claim::Owned(ClaimGuard {
                    inflight: self,
                    key: key.clone(),
                    owner: me,
                }));
            };
            if owner == me {
                return Err(cycle(reentry_chain(&state, me, key)));
            }
            if let Some(chain) = wait_cycle(&state, me, key) {
                return Err(cycle(chain));
            }
            debug!(service = %key, "Waiting for singleton built by another thread");
            state.waiting.insert(me, key.clone());
            state = self
                .released
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
            state.waiting.remove(&me);
        }
    }
}

/// Releases a construction claim on drop, including when the producer panics.
pub(crate) struct ClaimGuard<'a> {
    inflight: &'a InFlight,
    key: ServiceKey,
    owner: ThreadId,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.inflight.lock();
        state.owners.remove(&self.key);
        if let Some(stack) = state.stacks.get_mut(&self.owner) {
            if let Some(pos) = stack.iter().rposition(|k| *k == self.key) {
                stack.remove(pos);
            }
            if stack.is_empty() {
                state.stacks.remove(&self.owner);
            }
        }
        drop(state);
        self.inflight.released.notify_all();
    }
}

/// `key` is already being built further up this thread's stack.
fn reentry_chain(state: &State, me: ThreadId, key: &ServiceKey) -> Vec<String> {
    let mut chain: Vec<String> = state
        .stacks
        .get(&me)
        .map(|stack| {
            stack
                .iter()
                .skip_while(|k| *k != key)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();
    chain.push(key.to_string());
    chain
}

/// Follow owner -> waited-on key edges from `key`. Reaching `me` means
/// waiting would deadlock; the chain starts at the singleton `me` is
/// building and ends back at it.
fn wait_cycle(state: &State, me: ThreadId, key: &ServiceKey) -> Option<Vec<String>> {
    let start = state.stacks.get(&me)?.last()?;
    let mut chain = vec![start.to_string(), key.to_string()];
    let mut current = key;
    // Each hop visits a distinct blocked thread.
    for _ in 0..=state.waiting.len() {
        let owner = state.owners.get(current)?;
        if *owner == me {
            return Some(chain);
        }
        current = state.waiting.get(owner)?;
        chain.push(current.to_string());
    }
    None
}

fn cycle(chain: Vec<String>) -> ResolveError {
    warn!(chain = ?chain, "Cyclic dependency detected");
    ResolveError::CyclicDependency { chain }
}
