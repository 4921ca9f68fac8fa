use std::{
    ffi::CString,
    io,
    os::raw::c_int,
    os::unix::ffi::OsStrExt,
    path::Path,
};

use crate::error::Result;
use crate::flags::Mask;
use crate::inotify::Inotify;
use crate::sys;

/// Represents a watch on an inode
///
/// Can be obtained from [`Inotify::add_watch`] or from an [`Event`]. A watch
/// descriptor can be used to get inotify to stop watching an inode by passing
/// it to [`Inotify::rm_watch`].
///
/// Watch descriptors are only meaningful for the [`Inotify`] instance that
/// returned them.
///
/// [`Event`]: crate::Event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchDescriptor(pub(crate) c_int);

impl WatchDescriptor {
    /// The number the kernel uses for this watch
    ///
    /// Can be used to distinguish events for files with the same name.
    pub fn id(&self) -> c_int {
        self.0
    }
}

impl Inotify {
    /// Adds or updates a watch for the given path
    ///
    /// Adds a new watch or updates an existing one for the file referred to by
    /// `path`. Returns a watch descriptor that can be used to refer to this
    /// watch later.
    ///
    /// If the path is already watched, the same [`WatchDescriptor`] is
    /// returned again and `mask` replaces the watch's mask, unless it contains
    /// [`Mask::MASK_ADD`], in which case the two masks are combined. This also
    /// applies to a different path that links to the same inode.
    ///
    /// Changing the mask does not affect events that are already queued, so
    /// [`read`](Self::read) may still return events of a type that is no
    /// longer watched for.
    ///
    /// This method does not take the read lock and may be called while
    /// another thread is blocked in [`read`](Self::read).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the instance was closed. Otherwise,
    /// directly returns the error from the call to `inotify_add_watch`, e.g.
    /// `ENOENT`, `ENOTDIR` for [`Mask::ONLYDIR`] or `ENOSPC` if the watch
    /// limit was reached. A path containing a '\0' byte fails with
    /// [`io::ErrorKind::InvalidInput`].
    ///
    /// # Examples
    ///
    /// ```
    /// use inotify_simple::{Inotify, Mask};
    ///
    /// let inotify = Inotify::init()
    ///     .expect("Failed to initialize an inotify instance");
    ///
    /// inotify.add_watch("/tmp", Mask::CREATE | Mask::DELETE)
    ///     .expect("Failed to add watch");
    /// ```
    ///
    /// [`Error::Closed`]: crate::Error::Closed
    pub fn add_watch<P>(&self, path: P, mask: Mask) -> Result<WatchDescriptor>
        where P: AsRef<Path>
    {
        let path = CString::new(path.as_ref().as_os_str().as_bytes())
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidInput, error))?;

        let fd = self.use_fd()?;
        let wd = sys::add_watch(*fd, &path, mask.bits())?;
        trace!("inotify fd {}: watching {:?} as wd {} ({:?})", *fd, path, wd, mask);

        Ok(WatchDescriptor(wd))
    }

    /// Stops watching a file
    ///
    /// Removes the watch represented by the provided [`WatchDescriptor`] by
    /// calling `inotify_rm_watch`.
    ///
    /// The kernel then queues an event with [`Mask::IGNORED`] and an empty
    /// name for this watch. A concurrent or later [`read`](Self::read) will
    /// return it, even if it was issued after this call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the instance was closed. Otherwise,
    /// directly returns the error from the call to `inotify_rm_watch`,
    /// usually `EINVAL` if `wd` is not an active watch.
    ///
    /// [`Error::Closed`]: crate::Error::Closed
    pub fn rm_watch(&self, wd: WatchDescriptor) -> Result<()> {
        let fd = self.use_fd()?;
        sys::rm_watch(*fd, wd.0)?;
        trace!("inotify fd {}: removed wd {}", *fd, wd.0);

        Ok(())
    }
}
