// implementation of the sluice channel.
//
// the basic architecture is as such:
//
// channel handles wrap around Arc<shared state>
//                                  |
//          /-----------------------/
//          v
//       shared state
//          |
//          |------ it contains a Mutex<Lockable> guarding everything mutable:
//          |
//          |          - a ringqueue::RingQueue<T> holding the buffered values. for a
//          |            rendezvous (capacity 0) channel this is a single-slot ring used as
//          |            a transient staging area.
//          |          - the occupancy state machine (Empty/Open/Full/Closed). Closed is
//          |            terminal.
//          |          - a count of parked rendezvous receivers.
//          |          - two WaiterQueues, holding wake tokens for select calls blocked on
//          |            "room to send" and "value to receive" respectively.
//          |
//          \------ beside the mutex sit three condvars: data_ready (a value became
//                  available on a buffered channel), space_ready (room to send appeared /
//                  the staging slot cleared), and handshake_ready (a value was staged for
//                  a parked rendezvous receiver).
//
// select is layered on top of the same non-blocking primitives a single-channel caller
// would use. it locks every distinct channel in its entry list via try-lock-all with full
// backoff (no canonical lock order exists, since the channel set is caller-supplied and
// may overlap another select's), scans the entries in list order, and if nothing is ready
// registers a private Signal with each channel and blocks on it.
//
// the organization of these modules is as such:
//
//      These are used like
//      library utilities:
//    /--------------------\
//
//      signal<--------------core: the channel state machine and its signaling discipline.
//                   |       ^     panicky about internal invariants, defensive about
//      waiters<-----/       |     nothing else.
//                           |
//                           |---api: wraps core into the exposed single-channel API.
//                           |
//                           \---select: the multi-channel coordinator.
//
// there is also the error module, which contains the relevant error types, which is also
// re-exported publically.

pub(crate) mod error;
pub(crate) mod api;
pub(crate) mod select;

mod core;
mod signal;
mod waiters;
