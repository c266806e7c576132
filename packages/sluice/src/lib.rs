//! Thread-safe message channels with bounded buffering, rendezvous handoff, and a
//! multi-channel select operation.
//!
//! A [`Channel`] is a single handle through which any thread may send and receive owned
//! values. A channel created with a nonzero capacity buffers up to that many values;
//! a channel created with capacity zero is a *rendezvous* channel, where a send stages a
//! single value that the next receive consumes, and a second send cannot complete until
//! the first staged value has been taken.
//!
//! Every operation comes in a blocking form ([`Channel::send`], [`Channel::recv`]) and a
//! non-blocking form ([`Channel::try_send`], [`Channel::try_recv`]). Closing a channel
//! ([`Channel::close`]) wakes every blocked call, which then fails with
//! [`error::ClosedError`]; closing is terminal, and a second close fails with
//! [`error::AlreadyClosedError`].
//!
//! [`select`] atomically picks one ready operation out of an arbitrary list of
//! channel/direction pairs, blocking until one of them can complete:
//!
//! ```
//! use sluice::{Channel, SelectEntry, select};
//! use std::thread;
//!
//! let buffered = Channel::new(4);
//! let handoff = Channel::<u32>::rendezvous();
//!
//! buffered.send(7).unwrap();
//!
//! let mut entries = [SelectEntry::recv(&buffered), SelectEntry::recv(&handoff)];
//! let index = select(&mut entries).unwrap();
//! assert_eq!(index, 0);
//! assert_eq!(entries[0].take_message(), Some(7));
//!
//! let sender = thread::spawn({
//!     let handoff = handoff.clone();
//!     move || handoff.send(42).unwrap()
//! });
//! let mut entries = [SelectEntry::recv(&handoff)];
//! assert_eq!(select(&mut entries).unwrap(), 0);
//! assert_eq!(entries[0].take_message(), Some(42));
//! sender.join().unwrap();
//! ```

#[macro_use]
extern crate tracing;

mod channel;

pub use crate::channel::api::*;
pub use crate::channel::select::{select, SelectEntry};

/// Error types
pub mod error {
    pub use crate::channel::error::*;
}
