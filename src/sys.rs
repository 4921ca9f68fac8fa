//! Thin wrappers around the system calls inotify needs
//!
//! Every wrapper retries calls that were interrupted by a signal and turns
//! any other failure into an `io::Error` carrying `errno`. Nothing here keeps
//! state.

use std::{
    ffi::CStr,
    io,
    os::raw::c_int,
    os::unix::io::RawFd,
    time::{Duration, Instant},
};

use inotify_sys as ffi;
use libc::c_void;

/// Calls `f` until it returns something other than `-1` with `EINTR`
fn retry<T, F>(mut f: F) -> io::Result<T>
    where T: PartialEq + From<i8>,
          F: FnMut() -> T,
{
    loop {
        let result = f();
        if result != T::from(-1) {
            return Ok(result);
        }

        let error = io::Error::last_os_error();
        if error.kind() != io::ErrorKind::Interrupted {
            return Err(error);
        }
    }
}

pub(crate) fn init(flags: c_int) -> io::Result<RawFd> {
    retry(|| unsafe { ffi::inotify_init1(flags) })
}

pub(crate) fn add_watch(fd: RawFd, path: &CStr, mask: u32) -> io::Result<c_int> {
    retry(|| unsafe { ffi::inotify_add_watch(fd, path.as_ptr(), mask) })
}

pub(crate) fn rm_watch(fd: RawFd, wd: c_int) -> io::Result<()> {
    retry(|| unsafe { ffi::inotify_rm_watch(fd, wd) }).map(|_| ())
}

/// Waits for `pollfd` to become ready, until `deadline`
///
/// `None` waits forever. Returns whether the descriptor is ready. An
/// interrupted wait is restarted with whatever time is left before
/// `deadline`, so signals don't stretch the wait.
pub(crate) fn poll(pollfd: &mut libc::pollfd, deadline: Option<Instant>) -> io::Result<bool> {
    pollfd.revents = 0;
    let pollfd: *mut libc::pollfd = pollfd;
    let ready = retry(|| {
        let remaining = deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()));
        unsafe { libc::poll(pollfd, 1, timeout_ms(remaining)) }
    })?;
    Ok(ready > 0)
}

/// Converts a timeout to what `poll` expects, rounding up to whole
/// milliseconds
fn timeout_ms(timeout: Option<Duration>) -> c_int {
    match timeout {
        None => -1,
        Some(timeout) => {
            let ms = timeout.as_nanos().div_ceil(1_000_000);
            ms.min(c_int::MAX as u128) as c_int
        }
    }
}

/// Number of bytes that can be read without blocking
pub(crate) fn bytes_available(fd: RawFd) -> io::Result<usize> {
    let mut available: c_int = 0;
    retry(|| unsafe { libc::ioctl(fd, libc::FIONREAD, &mut available as *mut c_int) })?;
    Ok(available.max(0) as usize)
}

pub(crate) fn read(fd: RawFd, buffer: &mut [u8]) -> io::Result<usize> {
    let len = retry(|| unsafe {
        libc::read(fd, buffer.as_mut_ptr() as *mut c_void, buffer.len())
    })?;
    Ok(len as usize)
}

/// Closes `fd`
///
/// Not retried on `EINTR`: on Linux the descriptor is released even if
/// `close` is interrupted, and retrying could close a reused number.
pub(crate) fn close(fd: RawFd) -> io::Result<()> {
    match unsafe { libc::close(fd) } {
        0 => Ok(()),
        _ => {
            let error = io::Error::last_os_error();
            if error.kind() == io::ErrorKind::Interrupted {
                Ok(())
            } else {
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use inotify_sys as ffi;

    use super::{bytes_available, init, poll, retry, timeout_ms};

    #[test]
    fn retry_passes_through_success() {
        assert_eq!(retry(|| 3i32).unwrap(), 3);
    }

    #[test]
    fn timeouts_round_up_to_milliseconds() {
        assert_eq!(timeout_ms(None), -1);
        assert_eq!(timeout_ms(Some(Duration::ZERO)), 0);
        assert_eq!(timeout_ms(Some(Duration::from_micros(1))), 1);
        assert_eq!(timeout_ms(Some(Duration::from_millis(150))), 150);
        assert_eq!(timeout_ms(Some(Duration::from_secs(u64::MAX))), i32::MAX);
    }

    #[test]
    fn poll_after_the_deadline_checks_once() {
        let fd = init(ffi::IN_CLOEXEC).unwrap();
        let mut pollfd = libc::pollfd { fd, events: libc::POLLIN, revents: 0 };

        let start = Instant::now();
        assert!(!poll(&mut pollfd, Some(start - Duration::from_millis(10))).unwrap());
        assert!(!poll(&mut pollfd, Some(start + Duration::from_millis(30))).unwrap());
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert!(start.elapsed() < Duration::from_secs(5));

        super::close(fd).unwrap();
    }

    #[test]
    fn retry_reports_errno() {
        let error = bytes_available(-1).unwrap_err();
        assert_eq!(error.raw_os_error(), Some(libc::EBADF));
    }

    #[test]
    fn fresh_instance_has_nothing_to_read() {
        let fd = init(ffi::IN_CLOEXEC).unwrap();
        assert_eq!(bytes_available(fd).unwrap(), 0);
        super::close(fd).unwrap();
    }
}
