use std::io;

use thiserror::Error;

/// Result type used throughout this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by [`Inotify`] and [`parse_events`]
///
/// Running out of time in [`Inotify::read`] is not an error. A read that
/// times out returns an empty `Vec`.
///
/// [`Inotify`]: crate::Inotify
/// [`Inotify::read`]: crate::Inotify::read
/// [`parse_events`]: crate::parse_events
#[derive(Debug, Error)]
pub enum Error {
    /// A system call failed
    ///
    /// Carries the error number and its description, exactly as reported by
    /// the operating system. Interrupted calls (`EINTR`) are retried and never
    /// show up here.
    #[error(transparent)]
    Os(#[from] io::Error),

    /// The inotify instance has already been closed
    #[error("inotify instance is closed")]
    Closed,

    /// A buffer did not contain a whole number of inotify events
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl Error {
    /// Returns the error number, if this error came from a system call
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Error::Os(error) => error.raw_os_error(),
            _ => None,
        }
    }

    /// Whether this error means the inotify descriptor is gone
    ///
    /// True for [`Error::Closed`], and also for an `EBADF` from the operating
    /// system. The latter is what you get when the raw descriptor was closed
    /// without going through [`Inotify::close`], and the two should be
    /// handled the same way.
    ///
    /// [`Inotify::close`]: crate::Inotify::close
    pub fn is_closed(&self) -> bool {
        match self {
            Error::Closed => true,
            Error::Os(error) => error.raw_os_error() == Some(libc::EBADF),
            Error::Decode(_) => false,
        }
    }
}

/// A malformed event buffer was passed to [`parse_events`]
///
/// The kernel never splits an event across reads, so this indicates a buffer
/// that was truncated or assembled incorrectly by the caller.
///
/// [`parse_events`]: crate::parse_events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("truncated inotify event at offset {offset}: needed {needed} bytes, {available} available")]
pub struct DecodeError {
    /// Offset of the first byte of the broken event
    pub offset: usize,

    /// Number of bytes the event needs, counted from `offset`
    pub needed: usize,

    /// Number of bytes left in the buffer, counted from `offset`
    pub available: usize,
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::{DecodeError, Error};

    #[test]
    fn ebadf_counts_as_closed() {
        assert!(Error::Closed.is_closed());
        assert!(Error::Os(io::Error::from_raw_os_error(libc::EBADF)).is_closed());
        assert!(!Error::Os(io::Error::from_raw_os_error(libc::EINVAL)).is_closed());

        let decode = DecodeError { offset: 0, needed: 16, available: 3 };
        assert!(!Error::from(decode).is_closed());
    }

    #[test]
    fn os_errors_keep_their_code() {
        let error = Error::from(io::Error::from_raw_os_error(libc::ENOENT));
        assert_eq!(error.raw_os_error(), Some(libc::ENOENT));
        assert_eq!(Error::Closed.raw_os_error(), None);
    }
}
