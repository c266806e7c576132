// exposed API of channels.

use super::{
    core,
    error::*,
};
use std::fmt::{self, Debug, Formatter};


/// Handle to a thread-safe message channel
///
/// A channel moves owned values between threads, either through a bounded FIFO buffer
/// (`capacity > 0`) or through rendezvous handoff (`capacity == 0`, see
/// [`rendezvous`](Self::rendezvous)). Handles are cheaply cloneable; every clone refers
/// to the same channel, and any handle may send, receive, or close it.
///
/// A channel is closed at most once, with [`close`](Self::close). Closing wakes every
/// blocked operation, which then fails with [`ClosedError`]; all later operations fail
/// the same way. After closing, [`destroy`](Self::destroy) releases the channel's
/// buffered values eagerly.
pub struct Channel<T> {
    core: core::Channel<T>,
}

impl<T> Channel<T> {
    /// Create an open, empty channel buffering up to `capacity` values.
    ///
    /// A capacity of zero creates a rendezvous channel.
    pub fn new(capacity: usize) -> Self {
        Channel { core: core::Channel::new(capacity) }
    }

    /// Create a rendezvous channel, equivalent to [`new(0)`](Self::new).
    ///
    /// A rendezvous channel has no buffered slack: a send stages a single value which
    /// the next receive consumes, and a second send cannot complete until the staged
    /// value has been taken.
    pub fn rendezvous() -> Self {
        Channel::new(0)
    }

    pub(crate) fn core(&self) -> &core::Channel<T> {
        &self.core
    }

    /// Send a value, blocking while the channel cannot accept one
    ///
    /// Blocks while a buffered channel is full, or while a rendezvous channel already
    /// has a staged value. Fails with the message handed back if the channel is closed,
    /// before or while blocked.
    pub fn send(&self, msg: T) -> Result<(), SendError<T>> {
        self.core.send(msg)
    }

    /// Receive a value, blocking while the channel has nothing to offer
    ///
    /// Blocks while a buffered channel is empty, or while a rendezvous channel has no
    /// staged value (parking this thread as a willing partner for senders). Fails if
    /// the channel is closed, before or while blocked.
    pub fn recv(&self) -> Result<T, ClosedError> {
        self.core.recv()
    }

    /// Send a value without blocking
    ///
    /// Fails with a [`FullError`] cause if a buffered channel is at capacity. On a
    /// rendezvous channel the transfer additionally requires a provably present
    /// partner: a receiver parked in [`recv`](Self::recv) or registered through
    /// [`select`](crate::select). Fails with a [`ClosedError`] cause once closed. The
    /// message is handed back inside the error either way.
    pub fn try_send(&self, msg: T) -> Result<(), TrySendError<T>> {
        self.core.try_send(msg)
    }

    /// Receive a value without blocking
    ///
    /// Fails with [`EmptyError`] if a buffered channel is empty, or if a rendezvous
    /// channel has nothing staged and no select sender registered. If a select sender
    /// *is* registered, the transfer is possible even though no value is physically
    /// staged yet; this call wakes that sender and waits out a short bounded handshake
    /// grace period before giving up with [`EmptyError`]. Fails with [`ClosedError`]
    /// once closed.
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.core.try_recv()
    }

    /// Close the channel
    ///
    /// Every operation blocked on this channel (including selects naming it) wakes and
    /// fails with [`ClosedError`], and every subsequent operation fails the same way
    /// immediately. Buffered values are not delivered after closing; they are released
    /// by [`destroy`](Self::destroy) or when the last handle drops.
    ///
    /// Closing is terminal: a second close fails with [`AlreadyClosedError`].
    pub fn close(&self) -> Result<(), AlreadyClosedError> {
        self.core.close()
    }

    /// Destroy a closed channel, eagerly releasing its buffered values and waiter
    /// registries
    ///
    /// Fails with a [`NotClosedError`] cause if the channel has not been closed,
    /// handing the still-usable handle back inside the error. The caller must ensure no
    /// other thread still invokes operations on the channel; the allocation itself is
    /// reclaimed when the last handle drops.
    pub fn destroy(self) -> Result<(), DestroyError<T>> {
        if !self.core.is_closed() {
            return Err(DestroyError { channel: self, cause: NotClosedError });
        }
        self.core.purge();
        Ok(())
    }

    /// Fixed capacity of the channel; zero for a rendezvous channel.
    pub fn capacity(&self) -> usize {
        self.core.snapshot().0
    }

    /// Number of values currently buffered (or staged, for a rendezvous channel).
    pub fn len(&self) -> usize {
        self.core.snapshot().1
    }

    /// Whether no values are currently buffered or staged.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the channel is at capacity (for a rendezvous channel: whether a value is
    /// staged).
    pub fn is_full(&self) -> bool {
        let (capacity, len, _) = self.core.snapshot();
        if capacity == 0 {
            len > 0
        } else {
            len == capacity
        }
    }

    /// Whether the channel has been closed.
    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Channel { core: self.core.clone() }
    }
}

impl<T> Debug for Channel<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let (capacity, len, state) = self.core.snapshot();
        f.debug_struct("Channel")
            .field("capacity", &capacity)
            .field("len", &len)
            .field("state", &state)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::select::{select, SelectEntry};
    use rand::prelude::*;
    use rand_pcg::Pcg32;
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicBool, Ordering::SeqCst},
            Arc,
        },
        thread,
        time::Duration,
    };

    fn new_rng() -> impl Rng {
        Pcg32::from_seed(0xdeadbeefdeadbeefdeadbeefdeadbeefu128.to_le_bytes())
    }

    #[test]
    fn basic_1000_test() {
        let chan = Channel::new(500);

        let join_1 = thread::spawn({
            let chan = chan.clone();
            move || {
                for i in 1..=1000 {
                    chan.send(i).unwrap();
                    if i < 1000 && i % 100 == 0 {
                        thread::sleep(Duration::from_millis(10));
                    }
                }
            }
        });
        let join_2 = thread::spawn({
            let chan = chan.clone();
            move || {
                for i in 1..=1000 {
                    let j = chan.recv().unwrap();
                    assert_eq!(i, j);
                }
            }
        });
        join_1.join().unwrap();
        join_2.join().unwrap();

        chan.close().unwrap();
        assert_eq!(chan.recv(), Err(ClosedError));
    }

    #[test]
    fn capacity_two_scenario() {
        let chan = Channel::new(2);

        // two sends succeed immediately
        chan.try_send('a').unwrap();
        chan.try_send('b').unwrap();
        assert!(chan.is_full());
        assert!(chan.try_send('c').unwrap_err().is_full());

        // a third blocking send parks until a receive makes room
        let third_send_done = Arc::new(AtomicBool::new(false));
        let join = thread::spawn({
            let chan = chan.clone();
            let third_send_done = Arc::clone(&third_send_done);
            move || {
                chan.send('c').unwrap();
                third_send_done.store(true, SeqCst);
            }
        });
        thread::sleep(Duration::from_millis(50));
        assert!(!third_send_done.load(SeqCst));

        assert_eq!(chan.recv().unwrap(), 'a');
        join.join().unwrap();
        assert!(third_send_done.load(SeqCst));

        assert_eq!(chan.recv().unwrap(), 'b');
        assert_eq!(chan.recv().unwrap(), 'c');
        assert!(chan.is_empty());
    }

    #[test]
    fn rendezvous_exclusivity() {
        let chan = Channel::rendezvous();

        // the first send stages its value and completes
        chan.send(1).unwrap();
        assert!(chan.is_full());

        // a second send cannot complete until the staged value is received
        let second_send_done = Arc::new(AtomicBool::new(false));
        let join = thread::spawn({
            let chan = chan.clone();
            let second_send_done = Arc::clone(&second_send_done);
            move || {
                chan.send(2).unwrap();
                second_send_done.store(true, SeqCst);
            }
        });
        thread::sleep(Duration::from_millis(50));
        assert!(!second_send_done.load(SeqCst));

        assert_eq!(chan.recv().unwrap(), 1);
        join.join().unwrap();
        assert_eq!(chan.recv().unwrap(), 2);
    }

    #[test]
    fn no_lost_wakeup() {
        let chan = Channel::new(1);

        let receiver = thread::spawn({
            let chan = chan.clone();
            move || chan.recv().unwrap()
        });
        thread::sleep(Duration::from_millis(50));
        chan.send(123).unwrap();
        assert_eq!(receiver.join().unwrap(), 123);
    }

    #[test]
    fn rendezvous_parked_receiver_enables_try_send() {
        let chan = Channel::rendezvous();

        // no partner present: the transfer is merely possible, not provable
        assert!(chan.try_send(1).unwrap_err().is_full());
        assert!(chan.try_recv().unwrap_err().is_empty());

        let receiver = thread::spawn({
            let chan = chan.clone();
            move || chan.recv().unwrap()
        });
        thread::sleep(Duration::from_millis(50));

        chan.try_send(2).unwrap();
        assert_eq!(receiver.join().unwrap(), 2);
    }

    #[test]
    fn close_is_terminal_and_idempotence_is_reported() {
        let chan = Channel::new(4);
        chan.send(1).unwrap();

        chan.close().unwrap();
        assert_eq!(chan.close(), Err(AlreadyClosedError));
        assert!(chan.is_closed());

        // closed beats buffered: nothing is delivered after close
        assert_eq!(chan.recv(), Err(ClosedError));
        assert!(chan.try_recv().unwrap_err().is_closed());
        assert_eq!(chan.send(2).unwrap_err().cause, ClosedError);
        assert!(chan.try_send(3).unwrap_err().is_closed());
    }

    #[test]
    fn close_wakes_blocked_operations() {
        let empty = Channel::<u32>::new(1);
        let blocked_recv = thread::spawn({
            let empty = empty.clone();
            move || empty.recv()
        });

        let full = Channel::new(1);
        full.send(1).unwrap();
        let blocked_send = thread::spawn({
            let full = full.clone();
            move || full.send(2)
        });

        let rendezvous = Channel::<u32>::rendezvous();
        let parked = thread::spawn({
            let rendezvous = rendezvous.clone();
            move || rendezvous.recv()
        });

        thread::sleep(Duration::from_millis(50));
        empty.close().unwrap();
        full.close().unwrap();
        rendezvous.close().unwrap();

        assert_eq!(blocked_recv.join().unwrap(), Err(ClosedError));
        assert_eq!(blocked_send.join().unwrap().unwrap_err().cause, ClosedError);
        assert_eq!(parked.join().unwrap(), Err(ClosedError));
    }

    #[test]
    fn destroy_requires_close_first() {
        let chan = Channel::new(2);
        chan.send(1).unwrap();

        // premature destroy hands the still-usable handle back
        let DestroyError { channel: chan, cause } = chan.destroy().unwrap_err();
        assert_eq!(cause, NotClosedError);
        chan.send(2).unwrap();
        assert_eq!(chan.recv().unwrap(), 1);

        chan.close().unwrap();
        chan.destroy().unwrap();
    }

    #[test]
    fn destroy_releases_buffered_values() {
        let drops = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        #[derive(Debug)]
        struct Tally(Arc<std::sync::atomic::AtomicUsize>);
        impl Drop for Tally {
            fn drop(&mut self) {
                self.0.fetch_add(1, SeqCst);
            }
        }

        let chan = Channel::new(4);
        for _ in 0..3 {
            chan.send(Tally(Arc::clone(&drops))).unwrap();
        }
        let keep_alive = chan.clone();
        chan.close().unwrap();
        chan.destroy().unwrap();
        // destroy released the buffered values even though a handle is still alive
        assert_eq!(drops.load(SeqCst), 3);
        drop(keep_alive);
    }

    #[test]
    fn capacity_invariant_differential() {
        let mut rng = new_rng();
        for cap in [1, 2, 5] {
            let chan = Channel::new(cap);
            let mut model = VecDeque::new();
            for i in 0u32..5_000 {
                if rng.gen_ratio(1, 2) {
                    let accepted = chan.try_send(i).is_ok();
                    assert_eq!(accepted, model.len() < cap);
                    if accepted {
                        model.push_back(i);
                    }
                } else {
                    match chan.try_recv() {
                        Ok(got) => assert_eq!(Some(got), model.pop_front()),
                        Err(err) => {
                            assert!(err.is_empty());
                            assert!(model.is_empty());
                        }
                    }
                }
                assert!(chan.len() <= cap);
                assert_eq!(chan.len(), model.len());
                assert_eq!(chan.is_empty(), model.is_empty());
                assert_eq!(chan.is_full(), model.len() == cap);
            }
        }
    }

    #[test]
    fn introspection_accessors() {
        let chan = Channel::new(3);
        assert_eq!(chan.capacity(), 3);
        assert!(chan.is_empty() && !chan.is_full() && !chan.is_closed());
        chan.send(1).unwrap();
        assert_eq!(chan.len(), 1);

        let rendezvous = Channel::<u32>::rendezvous();
        assert_eq!(rendezvous.capacity(), 0);
        assert!(rendezvous.is_empty());

        // debug formatting works without T: Debug
        struct Opaque;
        let opaque = Channel::<Opaque>::new(1);
        let _ = format!("{:?}", opaque);
    }

    #[test]
    fn blocked_select_observes_closure() {
        let chan = Channel::<u32>::rendezvous();
        let join = thread::spawn({
            let chan = chan.clone();
            move || {
                let mut entries = [SelectEntry::recv(&chan)];
                select(&mut entries)
            }
        });
        thread::sleep(Duration::from_millis(50));
        chan.close().unwrap();
        let err = join.join().unwrap().unwrap_err();
        assert_eq!(err.index, 0);
        assert_eq!(err.cause, ClosedError);
    }
}
