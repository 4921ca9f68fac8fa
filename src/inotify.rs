use std::{
    fmt,
    io,
    os::raw::c_int,
    os::unix::io::{AsRawFd, FromRawFd, IntoRawFd, RawFd},
    thread,
    time::{Duration, Instant},
};

use inotify_sys as ffi;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::events::{parse_events, Event};
use crate::fd_guard::{FdGuard, FdUse};
use crate::poller::Poller;
use crate::sys;

/// Options for opening an inotify instance
///
/// # Examples
///
/// ```
/// use inotify_simple::InotifyOptions;
///
/// let inotify = InotifyOptions::new()
///     .nonblocking(true)
///     .open()
///     .expect("Failed to initialize an inotify instance");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InotifyOptions {
    inheritable: bool,
    nonblocking: bool,
}

impl InotifyOptions {
    /// The default options: not inheritable, blocking
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether processes started via `exec` inherit the descriptor
    ///
    /// Defaults to `false`, which opens the descriptor with `IN_CLOEXEC`.
    pub fn inheritable(mut self, inheritable: bool) -> Self {
        self.inheritable = inheritable;
        self
    }

    /// Whether to open the descriptor with `IN_NONBLOCK`
    ///
    /// [`Inotify::read`] controls its own blocking behavior and is not
    /// affected by this. It only matters to code that reads the raw
    /// descriptor, which then fails with `EAGAIN` instead of blocking when no
    /// events are queued. Defaults to `false`.
    pub fn nonblocking(mut self, nonblocking: bool) -> Self {
        self.nonblocking = nonblocking;
        self
    }

    /// Opens an inotify instance with these options
    pub fn open(self) -> Result<Inotify> {
        Inotify::with_options(self)
    }

    fn init_flags(&self) -> c_int {
        let mut flags = 0;
        if !self.inheritable {
            flags |= ffi::IN_CLOEXEC;
        }
        if self.nonblocking {
            flags |= ffi::IN_NONBLOCK;
        }
        flags
    }
}

/// Idiomatic Rust wrapper around an inotify instance
///
/// All methods take `&self`, so an `Inotify` can be shared between threads,
/// for example in an `Arc`. Reads are serialized internally: concurrent
/// calls to [`read`](Self::read) never split one kernel read between them,
/// so no event is returned twice or lost. Adding and removing watches doesn't
/// wait for readers.
///
/// The descriptor is closed by [`close`](Self::close), or when the
/// `Inotify` is dropped.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use inotify_simple::{Inotify, Mask};
///
/// let inotify = Inotify::init()
///     .expect("Error while initializing inotify instance");
///
/// inotify.add_watch("/tmp", Mask::CREATE | Mask::MODIFY)
///     .expect("Failed to add watch");
///
/// let events = inotify.read(Some(Duration::from_millis(10)), None)
///     .expect("Error while reading events");
///
/// for event in events {
///     println!("{:?}: {:?}", event.name, event.flags());
/// }
/// ```
pub struct Inotify {
    fd: FdGuard,
    poller: Mutex<Option<Poller>>,
}

impl Inotify {
    /// Creates an [`Inotify`] instance with the default options
    ///
    /// Initializes an inotify instance by calling `inotify_init1` with
    /// `IN_CLOEXEC`. See [`InotifyOptions`] for other choices.
    ///
    /// # Errors
    ///
    /// Directly returns the error from the call to `inotify_init1`, e.g.
    /// `EMFILE` if the per-user limit on inotify instances was reached.
    pub fn init() -> Result<Self> {
        Self::with_options(InotifyOptions::default())
    }

    /// Creates an [`Inotify`] instance with the given options
    pub fn with_options(options: InotifyOptions) -> Result<Self> {
        let fd = sys::init(options.init_flags())?;
        debug!("opened inotify fd {} ({:?})", fd, options);

        Ok(Self::from_fd(fd))
    }

    fn from_fd(fd: RawFd) -> Self {
        Inotify {
            fd: FdGuard::new(fd),
            poller: Mutex::new(None),
        }
    }

    /// The inotify file descriptor
    ///
    /// Use this to read the descriptor yourself, decoding with
    /// [`parse_events`], or to register it with an external event loop.
    /// Reads done that way are not serialized with [`read`](Self::read).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] after [`close`](Self::close).
    ///
    /// [`parse_events`]: crate::parse_events
    pub fn fd(&self) -> Result<RawFd> {
        self.fd.get().ok_or(Error::Closed)
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.fd.is_closed()
    }

    /// Borrows the descriptor, keeping it open until the result is dropped
    pub(crate) fn use_fd(&self) -> Result<FdUse<'_>> {
        self.fd.acquire().ok_or(Error::Closed)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Waits for events, then returns them
    ///
    /// `timeout` bounds how long to wait for events if there are none. `None`
    /// waits until events arrive, `Some(Duration::ZERO)` returns immediately.
    /// Time spent waiting for another thread's `read` to finish counts
    /// against the timeout. If it runs out, an empty `Vec` is returned.
    ///
    /// If `coalesce_delay` is given, the read waits that much longer once
    /// events are available. The kernel merges identical consecutive events,
    /// so this can cut down on the number of events to handle, at the risk of
    /// overflowing the event queue if the delay is too long.
    ///
    /// The events are returned in the order the kernel emitted them.
    ///
    /// Closing the instance from another thread does not wake up a `read`
    /// that is waiting without a timeout, because the descriptor stays open
    /// until that `read` is done with it. Use a timeout and call `read` in a
    /// loop if you need that. A `read` that notices the close, while waiting
    /// or during the coalescing delay, returns [`Error::Closed`] and reads
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the instance was closed, before or during
    /// the call. Errors from `poll`, `ioctl` or `read` are returned directly.
    /// If the descriptor was closed behind this instance's back, that is an
    /// `EBADF` (see [`Error::is_closed`]).
    pub fn read(
        &self,
        timeout: Option<Duration>,
        coalesce_delay: Option<Duration>,
    ) -> Result<Vec<Event>> {
        self.ensure_open()?;

        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));
        let mut poller = match deadline {
            None => self.poller.lock(),
            Some(deadline) => match self.poller.try_lock_until(deadline) {
                Some(poller) => poller,
                None => return Ok(Vec::new()),
            },
        };

        let fd = self.use_fd()?;
        let poller = poller.get_or_insert_with(|| Poller::new(*fd));

        // Poll even if the deadline already passed, to pick up anything
        // that's queued.
        let ready = self.check(poller.wait(deadline))?;

        self.ensure_open()?;
        if !ready {
            return Ok(Vec::new());
        }

        if let Some(delay) = coalesce_delay {
            thread::sleep(delay);
        }

        self.read_available(&fd)
    }

    /// Reads everything the kernel has queued, in a single `read`
    fn read_available(&self, fd: &FdUse<'_>) -> Result<Vec<Event>> {
        let fd = **fd;

        self.ensure_open()?;
        let available = self.check(sys::bytes_available(fd))?;

        if available == 0 {
            self.ensure_open()?;

            // Someone else drained the descriptor between `poll` and here.
            debug!("inotify fd {}: readable, but no bytes available", fd);
            return Ok(Vec::new());
        }

        let mut buffer = vec![0u8; available];
        self.ensure_open()?;
        let len = self.check(sys::read(fd, &mut buffer))?;
        buffer.truncate(len);
        trace!("inotify fd {}: read {} of {} bytes", fd, len, available);

        Ok(parse_events(&buffer)?)
    }

    /// Reports a failed call on a descriptor closed in the meantime as
    /// [`Error::Closed`]
    fn check<T>(&self, result: io::Result<T>) -> Result<T> {
        result.map_err(|error| {
            if self.is_closed() {
                Error::Closed
            } else {
                Error::Os(error)
            }
        })
    }

    /// Closes the inotify instance
    ///
    /// Closes the file descriptor referring to the inotify instance. The user
    /// usually doesn't have to call this function, as the underlying inotify
    /// instance is closed automatically, when [`Inotify`] is dropped.
    ///
    /// Calling this more than once, also from several threads at the same
    /// time, is fine: the descriptor is closed exactly once and later calls
    /// return `Ok(())`. Every other method returns [`Error::Closed`]
    /// afterwards.
    ///
    /// If another thread is in the middle of a [`read`](Self::read), the
    /// descriptor is closed as soon as that `read` returns.
    ///
    /// # Errors
    ///
    /// Directly returns the error from the call to `close`, which can only
    /// happen on the call that actually closes the descriptor. If the close
    /// had to wait for a `read`, an error is only logged.
    ///
    /// # Examples
    ///
    /// ```
    /// use inotify_simple::Inotify;
    ///
    /// let inotify = Inotify::init()
    ///     .expect("Failed to initialize an inotify instance");
    ///
    /// inotify.close()
    ///     .expect("Failed to close inotify instance");
    /// inotify.close()
    ///     .expect("Closing twice is fine");
    /// ```
    pub fn close(&self) -> Result<()> {
        let fd = self.fd.raw();
        if self.fd.close()? {
            debug!("closed inotify fd {}", fd);
        }
        Ok(())
    }
}

impl fmt::Debug for Inotify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inotify")
            .field("fd", &self.fd.get())
            .finish()
    }
}

/// Returns the descriptor, or `-1` once closed
impl AsRawFd for Inotify {
    #[inline]
    fn as_raw_fd(&self) -> RawFd {
        self.fd.raw()
    }
}

/// Hands the descriptor over to the caller, who becomes responsible for
/// closing it
///
/// Returns `-1` if the instance was already closed. There is nothing to hand
/// over in that case.
impl IntoRawFd for Inotify {
    #[inline]
    fn into_raw_fd(mut self) -> RawFd {
        self.fd.take().unwrap_or(-1)
    }
}

/// Takes ownership of an existing inotify descriptor
///
/// # Safety
///
/// `fd` must be an open inotify descriptor that nothing else closes.
impl FromRawFd for Inotify {
    #[inline]
    unsafe fn from_raw_fd(fd: RawFd) -> Self {
        Self::from_fd(fd)
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::io::{AsRawFd, FromRawFd, IntoRawFd};
    use std::time::Duration;

    use inotify_sys as ffi;

    use super::{Inotify, InotifyOptions};

    #[test]
    fn options_map_to_init_flags() {
        assert_eq!(InotifyOptions::new().init_flags(), ffi::IN_CLOEXEC);
        assert_eq!(InotifyOptions::new().inheritable(true).init_flags(), 0);
        assert_eq!(
            InotifyOptions::new().nonblocking(true).init_flags(),
            ffi::IN_CLOEXEC | ffi::IN_NONBLOCK,
        );
    }

    #[test]
    fn options_are_applied_to_the_descriptor() {
        let inotify = InotifyOptions::new().nonblocking(true).open().unwrap();
        let fd = inotify.fd().unwrap();

        let status = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        assert_ne!(status & libc::O_NONBLOCK, 0);
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        assert_ne!(flags & libc::FD_CLOEXEC, 0);

        let inotify = InotifyOptions::new().inheritable(true).open().unwrap();
        let fd = inotify.fd().unwrap();

        let status = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        assert_eq!(status & libc::O_NONBLOCK, 0);
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        assert_eq!(flags & libc::FD_CLOEXEC, 0);
    }

    #[test]
    fn closed_instance_has_no_raw_fd() {
        let inotify = Inotify::init().unwrap();
        inotify.close().unwrap();

        assert_eq!(inotify.as_raw_fd(), -1);
        assert_eq!(inotify.into_raw_fd(), -1);
    }

    #[test]
    fn descriptor_survives_into_and_from_raw_fd() {
        let inotify = Inotify::init().unwrap();
        let fd = inotify.into_raw_fd();

        let inotify = unsafe { Inotify::from_raw_fd(fd) };
        assert_eq!(inotify.fd().unwrap(), fd);
        assert!(inotify.read(Some(Duration::ZERO), None).unwrap().is_empty());
    }
}
