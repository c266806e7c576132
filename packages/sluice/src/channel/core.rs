// minimal safe core of the channel: the state machine and its signaling discipline. the
// exposed API is a convenience wrapper around this.
//
// every mutation of occupancy or state happens under the channel mutex and performs its
// associated signaling before the lock is released, so no wakeup is ever lost. every
// wait re-checks its predicate after waking, so broadcasts meant for other waiters and
// spurious wakeups are tolerated.

use crate::channel::{
    error::{
        AlreadyClosedError,
        ClosedError,
        EmptyError,
        FullError,
        SendError,
        TryRecvError,
        TrySendError,
    },
    waiters::WaiterQueue,
};
use ringqueue::RingQueue;
use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard, TryLockError},
    time::{Duration, Instant},
};


// grace period a non-blocking receive gives a registered select sender to complete the
// rendezvous handshake before giving up with Empty.
const HANDSHAKE_GRACE: Duration = Duration::from_millis(1);


// channel occupancy state. Closed is terminal and entered exactly once; the other three
// are always kept consistent with buffer occupancy.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum State {
    // capacity > 0: no values buffered. capacity == 0: no value staged.
    Empty,
    // capacity > 0 only: occupancy strictly between zero and capacity.
    Open,
    // capacity > 0: occupancy equals capacity. capacity == 0: a value is staged.
    Full,
    // terminal.
    Closed,
}

// handle to a channel.
pub(crate) struct Channel<T>(Arc<Shared<T>>);

// channel shared state.
pub(crate) struct Shared<T> {
    // mutex around lockable state.
    lockable: Mutex<Lockable<T>>,
    // signaled when a value becomes available to receive on a buffered channel.
    data_ready: Condvar,
    // signaled when room to send appears / the rendezvous staging slot clears.
    space_ready: Condvar,
    // signaled to wake a parked rendezvous receiver once a sender has staged a value.
    handshake_ready: Condvar,
}

// channel lockable state.
pub(crate) struct Lockable<T> {
    // immutable after construction. 0 means rendezvous mode.
    capacity: usize,
    // buffered values. for a rendezvous channel this is a single-slot staging area.
    buffer: RingQueue<T>,
    // invariant: consistent with buffer occupancy per the State mapping, until closed.
    state: State,
    // rendezvous receivers currently blocked awaiting a partner sender. always 0 on
    // buffered channels.
    parked_receivers: usize,
    // select registrations awaiting room to send.
    pub(crate) send_waiters: WaiterQueue,
    // select registrations awaiting a value to receive.
    pub(crate) recv_waiters: WaiterQueue,
}

impl<T> Lockable<T> {
    // whether this is a capacity-0 channel.
    pub(crate) fn is_rendezvous(&self) -> bool {
        self.capacity == 0
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    // whether the channel can physically take one more value: a buffered channel that is
    // not full, or a rendezvous channel whose staging slot is clear.
    fn has_room(&self) -> bool {
        if self.capacity == 0 {
            self.buffer.is_empty()
        } else {
            self.buffer.len() < self.capacity
        }
    }

    fn has_value(&self) -> bool {
        !self.buffer.is_empty()
    }

    // recompute state from buffer occupancy. must not be called once closed.
    fn sync_state(&mut self) {
        debug_assert!(self.state != State::Closed, "state sync after close (internal bug)");
        self.state = if self.buffer.is_empty() {
            State::Empty
        } else if self.capacity == 0 || self.buffer.len() == self.capacity {
            State::Full
        } else {
            State::Open
        };
    }
}

impl<T> Shared<T> {
    // move a value into the channel and perform the associated signaling, all under the
    // caller's lock hold. caller must have established that the channel is open and has
    // room.
    fn transfer_in(&self, lock: &mut Lockable<T>, msg: T) {
        debug_assert!(!lock.is_closed() && lock.has_room(), "transfer_in precondition (internal bug)");
        if lock.buffer.push(msg).is_err() {
            unreachable!("transfer into a full buffer (internal bug)");
        }
        lock.sync_state();
        if lock.is_rendezvous() {
            self.handshake_ready.notify_one();
        } else {
            self.data_ready.notify_one();
        }
        lock.recv_waiters.notify_all();
    }

    // move the front value out of the channel and perform the associated signaling, all
    // under the caller's lock hold. caller must have established that the channel is
    // open and has a value.
    fn transfer_out(&self, lock: &mut Lockable<T>) -> T {
        debug_assert!(!lock.is_closed(), "transfer_out precondition (internal bug)");
        let msg = lock.buffer.pop().expect("transfer out of an empty buffer (internal bug)");
        lock.sync_state();
        self.space_ready.notify_one();
        lock.send_waiters.notify_all();
        msg
    }

    // non-blocking send against the locked state. this is also the primitive select uses
    // while holding several channel locks, so it must never wait.
    pub(crate) fn try_send(&self, lock: &mut Lockable<T>, msg: T) -> Result<(), TrySendError<T>> {
        if lock.is_closed() {
            return Err(TrySendError { msg, cause: ClosedError.into() });
        }
        if lock.is_rendezvous() {
            // with no buffered slack, a non-blocking send can only succeed if the
            // complementary party is provably present: the staging slot is clear and a
            // receiver is either parked or registered through select. "possible" is not
            // enough.
            if !lock.has_room() || (lock.parked_receivers == 0 && lock.recv_waiters.is_empty()) {
                return Err(TrySendError { msg, cause: FullError.into() });
            }
        } else if !lock.has_room() {
            return Err(TrySendError { msg, cause: FullError.into() });
        }
        self.transfer_in(lock, msg);
        Ok(())
    }

    // non-blocking receive against the locked state, never waiting. this is the primitive
    // select uses; the exposed try_recv layers the bounded rendezvous handshake on top.
    pub(crate) fn try_recv_now(&self, lock: &mut Lockable<T>) -> Result<T, TryRecvError> {
        if lock.is_closed() {
            return Err(ClosedError.into());
        }
        if lock.has_value() {
            return Ok(self.transfer_out(lock));
        }
        Err(EmptyError.into())
    }
}

impl<T> Channel<T> {
    // construct an open, empty channel. capacity 0 selects rendezvous mode, which stages
    // values through a single-slot ring.
    pub(crate) fn new(capacity: usize) -> Self {
        let slots = if capacity == 0 { 1 } else { capacity };
        Channel(Arc::new(Shared {
            lockable: Mutex::new(Lockable {
                capacity,
                buffer: RingQueue::new(slots),
                state: State::Empty,
                parked_receivers: 0,
                send_waiters: WaiterQueue::new(),
                recv_waiters: WaiterQueue::new(),
            }),
            data_ready: Condvar::new(),
            space_ready: Condvar::new(),
            handshake_ready: Condvar::new(),
        }))
    }

    // clone another handle to the channel.
    pub(crate) fn clone(&self) -> Self {
        Channel(Arc::clone(&self.0))
    }

    // whether two handles refer to the same channel.
    pub(crate) fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn shared(&self) -> &Shared<T> {
        &self.0
    }

    // lock the channel.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Lockable<T>> {
        self.0.lockable.lock().unwrap()
    }

    // lock the channel if it is not currently locked.
    pub(crate) fn try_lock(&self) -> Option<MutexGuard<'_, Lockable<T>>> {
        match self.0.lockable.try_lock() {
            Ok(lock) => Some(lock),
            Err(TryLockError::WouldBlock) => None,
            Err(TryLockError::Poisoned(poisoned)) => Err(poisoned).unwrap(),
        }
    }

    // blocking send. waits while the channel cannot accept a value; fails once closed.
    pub(crate) fn send(&self, msg: T) -> Result<(), SendError<T>> {
        let shared = &*self.0;
        let mut lock = shared.lockable.lock().unwrap();
        while !lock.is_closed() && !lock.has_room() {
            lock = shared.space_ready.wait(lock).unwrap();
        }
        if lock.is_closed() {
            return Err(SendError { msg, cause: ClosedError });
        }
        shared.transfer_in(&mut lock, msg);
        Ok(())
    }

    // blocking receive. waits while the channel has nothing to offer; fails once closed.
    pub(crate) fn recv(&self) -> Result<T, ClosedError> {
        let shared = &*self.0;
        let mut lock = shared.lockable.lock().unwrap();
        loop {
            if lock.is_closed() {
                return Err(ClosedError);
            }
            if lock.has_value() {
                break;
            }
            if lock.is_rendezvous() {
                // park as a willing partner. a select sender may only stage a value once
                // it can observe one, so make this receiver observable before waiting.
                lock.parked_receivers += 1;
                lock.send_waiters.notify_all();
                lock = shared.handshake_ready.wait(lock).unwrap();
                lock.parked_receivers -= 1;
            } else {
                lock = shared.data_ready.wait(lock).unwrap();
            }
        }
        Ok(shared.transfer_out(&mut lock))
    }

    // non-blocking send.
    pub(crate) fn try_send(&self, msg: T) -> Result<(), TrySendError<T>> {
        let shared = &*self.0;
        let mut lock = shared.lockable.lock().unwrap();
        shared.try_send(&mut lock, msg)
    }

    // non-blocking receive. on a rendezvous channel with a select sender registered, the
    // value may not be physically staged yet even though a transfer is possible; in that
    // case this parks as a willing partner and gives the sender a bounded grace period
    // to stage before giving up with Empty.
    pub(crate) fn try_recv(&self) -> Result<T, TryRecvError> {
        let shared = &*self.0;
        let mut lock = shared.lockable.lock().unwrap();
        match shared.try_recv_now(&mut lock) {
            Err(TryRecvError::Empty(_)) if lock.is_rendezvous() && !lock.send_waiters.is_empty() => (),
            other => return other,
        }

        lock.parked_receivers += 1;
        lock.send_waiters.notify_all();
        let deadline = Instant::now() + HANDSHAKE_GRACE;
        while !lock.has_value() && !lock.is_closed() {
            let Some(remaining) = deadline.checked_duration_since(Instant::now())
                else { break };
            let (lock2, wait_result) = shared.handshake_ready.wait_timeout(lock, remaining).unwrap();
            lock = lock2;
            if wait_result.timed_out() {
                break;
            }
        }
        lock.parked_receivers -= 1;

        if lock.is_closed() {
            return Err(ClosedError.into());
        }
        if lock.has_value() {
            return Ok(shared.transfer_out(&mut lock));
        }
        Err(EmptyError.into())
    }

    // close the channel. every blocked send/receive/select referencing it wakes and
    // observes closure; every subsequent operation fails immediately with Closed.
    pub(crate) fn close(&self) -> Result<(), AlreadyClosedError> {
        let shared = &*self.0;
        let mut lock = shared.lockable.lock().unwrap();
        if lock.is_closed() {
            return Err(AlreadyClosedError);
        }
        lock.state = State::Closed;
        trace!(
            send_waiters = lock.send_waiters.len(),
            recv_waiters = lock.recv_waiters.len(),
            "closing channel"
        );
        // broadcast, not signal: every waiter must re-check its predicate and observe
        // closure, not just one.
        shared.data_ready.notify_all();
        shared.space_ready.notify_all();
        shared.handshake_ready.notify_all();
        lock.send_waiters.notify_all();
        lock.recv_waiters.notify_all();
        Ok(())
    }

    // release the buffered values and drain the registries. the channel must already be
    // closed; the memory itself is reclaimed when the last handle drops.
    pub(crate) fn purge(&self) {
        let mut lock = self.lock();
        debug_assert!(lock.is_closed(), "purge of a non-closed channel (internal bug)");
        lock.buffer.clear();
        lock.send_waiters.clear();
        lock.recv_waiters.clear();
    }

    // whether the channel has been closed. closure is terminal, so a true result never
    // goes stale.
    pub(crate) fn is_closed(&self) -> bool {
        self.lock().is_closed()
    }

    // point-in-time view of (capacity, occupancy, state), for introspection.
    pub(crate) fn snapshot(&self) -> (usize, usize, State) {
        let lock = self.lock();
        (lock.capacity, lock.buffer.len(), lock.state)
    }
}
