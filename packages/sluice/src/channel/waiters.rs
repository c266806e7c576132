// per-channel, per-direction registry of blocked select calls.

use crate::channel::signal::Signal;
use std::{
    collections::VecDeque,
    sync::Arc,
};


// insertion-ordered registry of wake tokens.
//
// a token is an Arc reference to the private signal of one blocked select call, inserted
// while the channel's lock is held and removed (by pointer identity) before that call's
// blocking cycle ends. nodes are owned by reference counting and traversal is always
// iterative, so tearing down a long registry never recurses.
#[derive(Default)]
pub(crate) struct WaiterQueue {
    tokens: VecDeque<Arc<Signal>>,
}

impl WaiterQueue {
    // construct empty.
    pub(crate) fn new() -> Self {
        WaiterQueue::default()
    }

    // number of registered tokens.
    pub(crate) fn len(&self) -> usize {
        self.tokens.len()
    }

    // whether no tokens are registered.
    pub(crate) fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    // register a token at the back of the queue. the same token may appear more than
    // once (a select whose list names the same channel twice registers per entry).
    pub(crate) fn insert(&mut self, token: Arc<Signal>) {
        self.tokens.push_back(token);
    }

    // remove the first occurrence of the token, by pointer identity. returns whether an
    // occurrence was found.
    pub(crate) fn remove(&mut self, token: &Arc<Signal>) -> bool {
        match self.tokens.iter().position(|t| Arc::ptr_eq(t, token)) {
            Some(idx) => {
                self.tokens.remove(idx);
                true
            }
            None => false,
        }
    }

    // notify every registered token, in insertion order.
    pub(crate) fn notify_all(&self) {
        for token in &self.tokens {
            token.notify();
        }
    }

    // notify every registered token other than `except`, in insertion order. a call must
    // not wake its own token, or it would spin instead of blocking.
    pub(crate) fn notify_others(&self, except: &Arc<Signal>) {
        for token in &self.tokens {
            if !Arc::ptr_eq(token, except) {
                token.notify();
            }
        }
    }

    // drop every registered token.
    pub(crate) fn clear(&mut self) {
        self.tokens.clear();
    }
}
