// channel error types.

use crate::channel::api::Channel;
use std::fmt::{self, Debug, Formatter};
use thiserror::Error;


// ==== base error types ====


/// Error for operating on a channel that has been closed
///
/// This is the normal shutdown signal for producers and consumers of a channel, not a
/// bug: once any handle closes the channel, every pending and future operation on it
/// reports this.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[error("channel is closed")]
pub struct ClosedError;

/// Error for a non-blocking send into a channel that cannot currently accept a value
///
/// This is a transient, expected outcome, and a signal to retry or pick another channel.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[error("channel is full")]
pub struct FullError;

/// Error for a non-blocking receive from a channel that has nothing to offer
///
/// This is a transient, expected outcome, and a signal to retry or pick another channel.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[error("channel is empty")]
pub struct EmptyError;

/// Error for closing a channel that was already closed
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[error("channel is already closed")]
pub struct AlreadyClosedError;

/// Error for destroying a channel that has not been closed first
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[error("channel has not been closed")]
pub struct NotClosedError;


// ==== compound error types ====


/// Error for a blocking send into a channel
///
/// Hands the unsent message back to the caller.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SendError<T> {
    /// The message that could not be sent
    pub msg: T,
    /// The reason the message could not be sent
    pub cause: ClosedError,
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.cause, f)
    }
}

impl<T: Debug> std::error::Error for SendError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Reason a non-blocking send could not complete
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TrySendErrorCause {
    /// The channel cannot currently accept a value
    #[error(transparent)]
    Full(#[from] FullError),
    /// The channel has been closed
    #[error(transparent)]
    Closed(#[from] ClosedError),
}

/// Error for a non-blocking send into a channel
///
/// Hands the unsent message back to the caller.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TrySendError<T> {
    /// The message that could not be sent
    pub msg: T,
    /// The reason the message could not be sent
    pub cause: TrySendErrorCause,
}

impl<T> TrySendError<T> {
    /// Whether the send failed because the channel has been closed.
    pub fn is_closed(&self) -> bool {
        matches!(self.cause, TrySendErrorCause::Closed(_))
    }

    /// Whether the send failed because the channel cannot currently accept a value.
    pub fn is_full(&self) -> bool {
        matches!(self.cause, TrySendErrorCause::Full(_))
    }
}

impl<T> fmt::Display for TrySendError<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.cause, f)
    }
}

impl<T: Debug> std::error::Error for TrySendError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Error for a non-blocking receive from a channel
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TryRecvError {
    /// The channel has nothing to offer right now
    #[error(transparent)]
    Empty(#[from] EmptyError),
    /// The channel has been closed
    #[error(transparent)]
    Closed(#[from] ClosedError),
}

impl TryRecvError {
    /// Whether the receive failed because the channel has been closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, TryRecvError::Closed(_))
    }

    /// Whether the receive failed because the channel has nothing to offer right now.
    pub fn is_empty(&self) -> bool {
        matches!(self, TryRecvError::Empty(_))
    }
}

/// Error for a select operation terminated by a closed channel
///
/// `index` identifies the entry in the caller's list that observed the closure.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[error("select entry {index}: {cause}")]
pub struct SelectError {
    /// Index of the entry that produced the error
    pub index: usize,
    /// The reason the entry could not complete
    pub cause: ClosedError,
}

/// Error for destroying a channel before closing it
///
/// Hands the still-usable channel handle back to the caller.
pub struct DestroyError<T> {
    /// The channel that could not be destroyed
    pub channel: Channel<T>,
    /// The reason the channel could not be destroyed
    pub cause: NotClosedError,
}

impl<T> Debug for DestroyError<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("DestroyError")
            .field("channel", &self.channel)
            .field("cause", &self.cause)
            .finish()
    }
}

impl<T> fmt::Display for DestroyError<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.cause, f)
    }
}

impl<T> std::error::Error for DestroyError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}
