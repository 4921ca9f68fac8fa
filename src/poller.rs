use std::{
    fmt,
    io,
    os::unix::io::RawFd,
    time::Instant,
};

use crate::sys;

/// Readiness registration for the inotify descriptor
///
/// Created once, on the first read, and reused for every read after that.
pub(crate) struct Poller {
    pollfd: libc::pollfd,
}

impl fmt::Debug for Poller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller").field("fd", &self.pollfd.fd).finish()
    }
}

impl Poller {
    pub(crate) fn new(fd: RawFd) -> Self {
        Poller {
            pollfd: libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            },
        }
    }

    /// Waits until the descriptor is readable, or until `deadline`
    ///
    /// `None` waits forever. A deadline in the past checks once and returns.
    /// Returns `false` if the deadline passed first.
    pub(crate) fn wait(&mut self, deadline: Option<Instant>) -> io::Result<bool> {
        sys::poll(&mut self.pollfd, deadline)
    }
}
