// private wake signal for blocked select calls.
//
// design based on the signal half of a pollster-style executor: a mutex and condvar pair
// private to one blocked call, with a state byte that records a notification delivered
// before the call actually starts waiting.

use std::sync::{Condvar, Mutex};


// synchronization signal state
enum State {
    // no notification pending and no thread waiting.
    Empty,
    // the owning thread is blocked in wait.
    Waiting,
    // a notification arrived while no thread was waiting.
    Notified,
}

// synchronization signal owned by a single blocked call.
//
// each select call creates exactly one of these per invocation; the channels it
// references hold Arc clones of it in their waiter queues only while the call is blocked.
// no signal is ever shared between two calls.
pub(crate) struct Signal {
    state: Mutex<State>,
    cond: Condvar,
}

impl Signal {
    pub(crate) fn new() -> Self {
        Signal {
            state: Mutex::new(State::Empty),
            cond: Condvar::new(),
        }
    }

    // block the calling thread until notified, then consume the notification, leaving the
    // signal ready for reuse. returns immediately if a notification is already pending.
    pub(crate) fn wait(&self) {
        let mut lock = self.state.lock().unwrap();

        // if a notification is already present, consume it without blocking.
        if let State::Notified = *lock {
            *lock = State::Empty;
            return;
        }

        debug_assert!(matches!(*lock, State::Empty));
        *lock = State::Waiting;
        while let State::Waiting = *lock {
            lock = self.cond.wait(lock).unwrap();
        }
        *lock = State::Empty;
    }

    // wake the owning thread if it is waiting, or record the notification for its next
    // wait otherwise. signaling an already-notified signal is a no-op.
    pub(crate) fn notify(&self) {
        let mut lock = self.state.lock().unwrap();
        match *lock {
            State::Notified => (),
            State::Empty => {
                *lock = State::Notified;
            }
            State::Waiting => {
                *lock = State::Empty;
                self.cond.notify_one();
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::Arc,
        thread,
        time::Duration,
    };

    #[test]
    fn notify_before_wait_returns_immediately() {
        let signal = Signal::new();
        signal.notify();
        signal.wait();
    }

    #[test]
    fn notify_wakes_waiting_thread() {
        let signal = Arc::new(Signal::new());
        let waiter = thread::spawn({
            let signal = Arc::clone(&signal);
            move || signal.wait()
        });
        thread::sleep(Duration::from_millis(50));
        signal.notify();
        waiter.join().unwrap();
    }

    #[test]
    fn notification_is_consumed_and_signal_is_reusable() {
        let signal = Arc::new(Signal::new());
        for _ in 0..3 {
            let waiter = thread::spawn({
                let signal = Arc::clone(&signal);
                move || signal.wait()
            });
            thread::sleep(Duration::from_millis(10));
            signal.notify();
            waiter.join().unwrap();
        }
    }
}
