// multi-channel select.
//
// the coordinator is stateless across calls: each invocation owns a private Signal and
// loops over passes. a pass locks every distinct channel named by the entry list (via
// try-lock-all with full backoff, since the caller-supplied channel set admits no
// canonical lock order), removes any registrations left over from the previous pass,
// scans the entries in list order with the non-blocking core primitives, and either
// returns the first entry that completed or registers the signal with every channel and
// blocks on it until some channel's activity wakes the call for another pass.

use crate::channel::{
    api::Channel,
    core::{self, Lockable},
    error::{ClosedError, SelectError, TryRecvError, TrySendError, TrySendErrorCause},
    signal::Signal,
};
use crossbeam_utils::Backoff;
use smallvec::SmallVec;
use std::sync::{Arc, MutexGuard};


// entries per select call that fit in the coordinator's scratch space without heap
// allocating.
const INLINE_ENTRIES: usize = 8;


/// One candidate operation in a [`select`] call: a channel, a direction, and the data
/// slot for the value being sent or received
pub struct SelectEntry<'a, T> {
    channel: &'a Channel<T>,
    op: Op<T>,
}

enum Op<T> {
    // Some until the message is handed to the channel.
    Send(Option<T>),
    // Some once a message has been received.
    Recv(Option<T>),
}

impl<'a, T> SelectEntry<'a, T> {
    /// Candidate operation that sends `msg` into `channel`.
    pub fn send(channel: &'a Channel<T>, msg: T) -> Self {
        SelectEntry { channel, op: Op::Send(Some(msg)) }
    }

    /// Candidate operation that receives a value from `channel`.
    pub fn recv(channel: &'a Channel<T>) -> Self {
        SelectEntry { channel, op: Op::Recv(None) }
    }

    /// The channel this entry names.
    pub fn channel(&self) -> &'a Channel<T> {
        self.channel
    }

    /// Whether this is a send-direction entry.
    pub fn is_send(&self) -> bool {
        matches!(self.op, Op::Send(_))
    }

    /// Whether this is a receive-direction entry.
    pub fn is_recv(&self) -> bool {
        matches!(self.op, Op::Recv(_))
    }

    /// Take the value currently held in this entry's data slot.
    ///
    /// For a receive entry that [`select`] reported as completed, this is the received
    /// message. For a send entry that did not complete, this recovers the unsent
    /// message. Returns `None` for a completed send entry or a receive entry that has
    /// not completed (or if the value was already taken).
    pub fn take_message(&mut self) -> Option<T> {
        match &mut self.op {
            Op::Send(slot) => slot.take(),
            Op::Recv(slot) => slot.take(),
        }
    }
}

// locks held over every distinct channel in one pass.
struct LockSet<'a, T> {
    // one guard per distinct channel, in first-appearance order.
    guards: SmallVec<[MutexGuard<'a, Lockable<T>>; INLINE_ENTRIES]>,
    // entry index -> index into guards.
    owner: SmallVec<[usize; INLINE_ENTRIES]>,
}

impl<'a, T> LockSet<'a, T> {
    fn guard_for(&mut self, entry: usize) -> &mut MutexGuard<'a, Lockable<T>> {
        &mut self.guards[self.owner[entry]]
    }
}

// acquire the distinct channels in list order, all or nothing: on the first failed
// try-lock, release every lock already taken in this pass, back off, and retry the whole
// pass. duplicate references to an already-locked channel share its guard rather than
// self-deadlocking.
fn lock_all<'a, T>(channels: &[&'a core::Channel<T>]) -> LockSet<'a, T> {
    let backoff = Backoff::new();
    'pass: loop {
        let mut guards: SmallVec<[MutexGuard<'a, Lockable<T>>; INLINE_ENTRIES]> = SmallVec::new();
        let mut owner: SmallVec<[usize; INLINE_ENTRIES]> = SmallVec::new();
        for (i, &chan) in channels.iter().enumerate() {
            if let Some(j) = channels[..i].iter().position(|&prev| prev.same(chan)) {
                let already_held = owner[j];
                owner.push(already_held);
                continue;
            }
            match chan.try_lock() {
                Some(guard) => {
                    owner.push(guards.len());
                    guards.push(guard);
                }
                None => {
                    drop(guards);
                    backoff.snooze();
                    continue 'pass;
                }
            }
        }
        return LockSet { guards, owner };
    }
}

/// Wait on multiple candidate channel operations and complete exactly one.
///
/// Attempts every entry's operation without blocking, in list order; if several are
/// immediately satisfiable, the lowest-index one wins. If none can complete, the call
/// blocks until activity on any of the named channels makes another attempt worthwhile.
///
/// Returns the index of the entry that completed. For a receive entry, the received
/// value is left in the entry's slot and can be taken with
/// [`SelectEntry::take_message`].
///
/// Errors with [`SelectError`] as soon as any entry's channel is observed closed,
/// naming the offending entry. The unsent message of a send entry that did not complete
/// (including the erroring one) stays in its slot.
///
/// An empty entry list blocks forever.
pub fn select<'a, T>(entries: &mut [SelectEntry<'a, T>]) -> Result<usize, SelectError> {
    // wake token, one per call. the channels hold Arc clones of it only while this call
    // is blocked; it is never shared with another call.
    let signal = Arc::new(Signal::new());
    let mut registered = false;

    // the channel references, copied out so the guards derived from them can coexist
    // with mutable access to the entries' data slots.
    let channels: SmallVec<[&'a core::Channel<T>; INLINE_ENTRIES]> =
        entries.iter().map(|entry| entry.channel.core()).collect();

    loop {
        // 1. lock every distinct channel, all or nothing
        let mut locks = lock_all(&channels);

        // 2. drop registrations left over from the previous pass. channels never remove
        //    tokens themselves, so every entry registered last pass is still present,
        //    fired or not.
        if registered {
            for index in 0..entries.len() {
                let dir_is_send = entries[index].is_send();
                let lock = locks.guard_for(index);
                let waiters = if dir_is_send {
                    &mut lock.send_waiters
                } else {
                    &mut lock.recv_waiters
                };
                waiters.remove(&signal);
            }
            registered = false;
        }

        // 3. scan for an entry that completes immediately, in list order. the first one
        //    not rejected with Full/Empty settles the call.
        for index in 0..entries.len() {
            let shared = channels[index].shared();
            let lock = locks.guard_for(index);
            match &mut entries[index].op {
                Op::Send(slot) => {
                    let msg = slot.take().expect("select send entry missing its message (internal bug)");
                    match shared.try_send(lock, msg) {
                        Ok(()) => return Ok(index),
                        Err(TrySendError { msg, cause: TrySendErrorCause::Full(_) }) => {
                            *slot = Some(msg);
                        }
                        Err(TrySendError { msg, cause: TrySendErrorCause::Closed(_) }) => {
                            *slot = Some(msg);
                            return Err(SelectError { index, cause: ClosedError });
                        }
                    }
                }
                Op::Recv(slot) => {
                    match shared.try_recv_now(lock) {
                        Ok(msg) => {
                            *slot = Some(msg);
                            return Ok(index);
                        }
                        Err(TryRecvError::Empty(_)) => (),
                        Err(TryRecvError::Closed(_)) => {
                            return Err(SelectError { index, cause: ClosedError });
                        }
                    }
                }
            }
        }

        // 4. nothing is ready: register with every entry's channel, then block on the
        //    private signal until one of them reports activity.
        for index in 0..entries.len() {
            let dir_is_send = entries[index].is_send();
            let lock = locks.guard_for(index);
            if dir_is_send {
                lock.send_waiters.insert(Arc::clone(&signal));
            } else {
                lock.recv_waiters.insert(Arc::clone(&signal));
                // a select sender on a rendezvous channel can only stage a value once a
                // partner is observable. this call just became one, so wake any such
                // sender (but never this call's own send entries) for another pass.
                if lock.is_rendezvous() && !lock.send_waiters.is_empty() {
                    lock.send_waiters.notify_others(&signal);
                }
            }
        }
        registered = true;
        drop(locks);

        trace!("select pass found no ready entry, parking");
        signal.wait();
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        thread,
        time::Duration,
    };

    #[test]
    fn first_match_wins() {
        let a = Channel::new(1);
        let b = Channel::new(1);
        a.send(10).unwrap();
        b.send(20).unwrap();

        let mut entries = [SelectEntry::recv(&a), SelectEntry::recv(&b)];
        assert_eq!(select(&mut entries).unwrap(), 0);
        assert_eq!(entries[0].take_message(), Some(10));
        assert_eq!(entries[1].take_message(), None);
    }

    #[test]
    fn send_direction_skips_full_channels() {
        let full = Channel::new(1);
        full.send("x").unwrap();
        let open = Channel::new(1);

        let mut entries = [SelectEntry::send(&full, "a"), SelectEntry::send(&open, "b")];
        assert_eq!(select(&mut entries).unwrap(), 1);
        // the losing entry keeps its message, the winning entry gave its up
        assert_eq!(entries[0].take_message(), Some("a"));
        assert_eq!(entries[1].take_message(), None);
        assert_eq!(open.recv().unwrap(), "b");
    }

    #[test]
    fn blocked_select_completed_by_concurrent_send() {
        let chan = Channel::rendezvous();

        let sender = thread::spawn({
            let chan = chan.clone();
            move || {
                thread::sleep(Duration::from_millis(50));
                chan.send(7).unwrap();
            }
        });

        let mut entries = [SelectEntry::recv(&chan)];
        assert_eq!(select(&mut entries).unwrap(), 0);
        assert_eq!(entries[0].take_message(), Some(7));
        sender.join().unwrap();
    }

    #[test]
    fn closed_channel_reports_offending_index() {
        let open = Channel::<u32>::new(1);
        let closed = Channel::<u32>::new(1);
        closed.close().unwrap();

        let mut entries = [SelectEntry::recv(&open), SelectEntry::recv(&closed)];
        let err = select(&mut entries).unwrap_err();
        assert_eq!(err, SelectError { index: 1, cause: ClosedError });
    }

    #[test]
    fn close_wakes_blocked_select() {
        let chan = Channel::<u32>::new(1);

        let closer = thread::spawn({
            let chan = chan.clone();
            move || {
                thread::sleep(Duration::from_millis(50));
                chan.close().unwrap();
            }
        });

        let mut entries = [SelectEntry::recv(&chan)];
        let err = select(&mut entries).unwrap_err();
        assert_eq!(err.index, 0);
        closer.join().unwrap();
    }

    #[test]
    fn duplicate_channel_entries_lock_once() {
        let chan = Channel::new(2);
        chan.send(1).unwrap();

        let mut entries = [
            SelectEntry::recv(&chan),
            SelectEntry::recv(&chan),
            SelectEntry::send(&chan, 2),
        ];
        assert_eq!(select(&mut entries).unwrap(), 0);
        assert_eq!(entries[0].take_message(), Some(1));
        assert_eq!(entries[1].take_message(), None);
    }

    #[test]
    fn select_sender_meets_parked_receiver() {
        let chan = Channel::rendezvous();

        let receiver = thread::spawn({
            let chan = chan.clone();
            move || chan.recv().unwrap()
        });
        // let the receiver park
        thread::sleep(Duration::from_millis(50));

        let mut entries = [SelectEntry::send(&chan, 99)];
        assert_eq!(select(&mut entries).unwrap(), 0);
        assert_eq!(receiver.join().unwrap(), 99);
    }

    #[test]
    fn select_sender_meets_select_receiver() {
        let chan = Channel::rendezvous();

        let sender = thread::spawn({
            let chan = chan.clone();
            move || {
                let mut entries = [SelectEntry::send(&chan, 5)];
                select(&mut entries).unwrap()
            }
        });
        // let the sender register before the receiver shows up
        thread::sleep(Duration::from_millis(50));

        let receiver = thread::spawn({
            let chan = chan.clone();
            move || {
                let mut entries = [SelectEntry::recv(&chan)];
                assert_eq!(select(&mut entries).unwrap(), 0);
                entries[0].take_message().unwrap()
            }
        });

        assert_eq!(sender.join().unwrap(), 0);
        assert_eq!(receiver.join().unwrap(), 5);
    }

    #[test]
    fn overlapping_selects_in_opposite_order_make_progress() {
        let a = Channel::new(1);
        let b = Channel::new(1);

        let select_1 = thread::spawn({
            let (a, b) = (a.clone(), b.clone());
            move || {
                let mut entries = [SelectEntry::recv(&a), SelectEntry::recv(&b)];
                select(&mut entries).unwrap();
                entries[0].take_message().or_else(|| entries[1].take_message()).unwrap()
            }
        });
        let select_2 = thread::spawn({
            let (a, b) = (a.clone(), b.clone());
            move || {
                let mut entries = [SelectEntry::recv(&b), SelectEntry::recv(&a)];
                select(&mut entries).unwrap();
                entries[0].take_message().or_else(|| entries[1].take_message()).unwrap()
            }
        });

        thread::sleep(Duration::from_millis(50));
        a.send(1).unwrap();
        b.send(2).unwrap();

        let mut got = vec![select_1.join().unwrap(), select_2.join().unwrap()];
        got.sort();
        assert_eq!(got, vec![1, 2]);
    }

    #[test]
    fn try_recv_completes_handshake_with_registered_select_sender() {
        let chan = Channel::rendezvous();

        let sender = thread::spawn({
            let chan = chan.clone();
            move || {
                let mut entries = [SelectEntry::send(&chan, 42)];
                select(&mut entries).unwrap()
            }
        });
        // let the sender register
        thread::sleep(Duration::from_millis(50));

        // the value is not physically staged, but a transfer is possible; try_recv
        // nudges the registered sender and waits out the handshake
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let got = loop {
            match chan.try_recv() {
                Ok(msg) => break msg,
                Err(err) => {
                    assert!(err.is_empty());
                    assert!(std::time::Instant::now() < deadline, "handshake never completed");
                    thread::sleep(Duration::from_millis(1));
                }
            }
        };
        assert_eq!(got, 42);
        assert_eq!(sender.join().unwrap(), 0);
    }
}
