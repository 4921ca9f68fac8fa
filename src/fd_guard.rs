use std::{
    io,
    ops::Deref,
    os::unix::io::RawFd,
};

use parking_lot::Mutex;

use crate::sys;

const CLOSED: RawFd = -1;

/// Owns the inotify file descriptor
///
/// Callers borrow the descriptor through [`FdGuard::acquire`] for as long as
/// they use the number. [`FdGuard::close`] marks the guard closed right away,
/// so nobody can acquire it afterwards, but the actual `close(2)` happens only
/// once the last [`FdUse`] is dropped. A number that is in use can therefore
/// never be reused by the kernel for some other file.
///
/// However many threads race on `close`, exactly one of them gets `true`.
#[derive(Debug)]
pub(crate) struct FdGuard {
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    /// `CLOSED` once the descriptor was released
    fd: RawFd,
    open: bool,
    users: usize,
}

impl State {
    /// Hands out the descriptor for closing, if it is closed and unused
    fn release(&mut self) -> Option<RawFd> {
        if self.open || self.users > 0 || self.fd == CLOSED {
            return None;
        }
        Some(std::mem::replace(&mut self.fd, CLOSED))
    }
}

impl FdGuard {
    pub(crate) fn new(fd: RawFd) -> Self {
        FdGuard {
            state: Mutex::new(State {
                fd,
                open: true,
                users: 0,
            }),
        }
    }

    /// Borrows the descriptor, or `None` once closed
    ///
    /// The descriptor stays open at least until the returned value is dropped.
    pub(crate) fn acquire(&self) -> Option<FdUse<'_>> {
        let mut state = self.state.lock();
        if !state.open {
            return None;
        }
        state.users += 1;

        Some(FdUse {
            guard: self,
            fd: state.fd,
        })
    }

    /// The descriptor, or `None` once closed
    pub(crate) fn get(&self) -> Option<RawFd> {
        let state = self.state.lock();
        if state.open {
            Some(state.fd)
        } else {
            None
        }
    }

    /// The raw value, `-1` once closed
    pub(crate) fn raw(&self) -> RawFd {
        self.get().unwrap_or(CLOSED)
    }

    pub(crate) fn is_closed(&self) -> bool {
        !self.state.lock().open
    }

    /// Gives up ownership of the descriptor without closing it
    pub(crate) fn take(&mut self) -> Option<RawFd> {
        let state = self.state.get_mut();
        if !state.open {
            return None;
        }
        state.open = false;
        Some(std::mem::replace(&mut state.fd, CLOSED))
    }

    /// Closes the descriptor, if nobody else did already
    ///
    /// Returns `Ok(false)` if the descriptor was already closed. If it is
    /// still in use, it is closed when the last user lets go of it, and any
    /// error from that is only logged.
    pub(crate) fn close(&self) -> io::Result<bool> {
        let mut state = self.state.lock();
        if !state.open {
            return Ok(false);
        }
        state.open = false;

        match state.release() {
            Some(fd) => {
                drop(state);
                sys::close(fd)?;
            }
            None => {
                debug!("inotify fd {} still in use, closing it later", state.fd);
            }
        }
        Ok(true)
    }

    fn unuse(&self) {
        let mut state = self.state.lock();
        state.users -= 1;
        let released = state.release();
        drop(state);

        if let Some(fd) = released {
            match sys::close(fd) {
                Ok(()) => debug!("closed inotify fd {} after its last use", fd),
                Err(error) => debug!("failed to close inotify fd {}: {}", fd, error),
            }
        }
    }
}

impl Drop for FdGuard {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.fd != CLOSED {
            let fd = std::mem::replace(&mut state.fd, CLOSED);
            if let Err(error) = sys::close(fd) {
                debug!("failed to close inotify fd {} on drop: {}", fd, error);
            }
        }
    }
}

/// The descriptor, kept open while this is alive
pub(crate) struct FdUse<'a> {
    guard: &'a FdGuard,
    fd: RawFd,
}

impl Deref for FdUse<'_> {
    type Target = RawFd;

    fn deref(&self) -> &RawFd {
        &self.fd
    }
}

impl Drop for FdUse<'_> {
    fn drop(&mut self) {
        self.guard.unuse();
    }
}
