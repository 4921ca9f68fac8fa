use std::{
    fmt,
    ops::BitOr,
};

use inotify_sys as ffi;

/// A single inotify flag
///
/// Covers both the event types reported in [`Event::mask`] and the modifiers
/// that can be passed to [`Inotify::add_watch`]. The discriminant of each
/// variant is its bit in the mask.
///
/// To find out which flags are set in a mask, use [`flags_in`].
///
/// [`Event::mask`]: crate::Event::mask
/// [`Inotify::add_watch`]: crate::Inotify::add_watch
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flag {
    /// File was accessed
    Access = ffi::IN_ACCESS,
    /// File was modified
    Modify = ffi::IN_MODIFY,
    /// Metadata changed
    Attrib = ffi::IN_ATTRIB,
    /// File opened for writing was closed
    CloseWrite = ffi::IN_CLOSE_WRITE,
    /// File not opened for writing was closed
    CloseNowrite = ffi::IN_CLOSE_NOWRITE,
    /// File was opened
    Open = ffi::IN_OPEN,
    /// File was moved out of the watched directory
    MovedFrom = ffi::IN_MOVED_FROM,
    /// File was moved into the watched directory
    MovedTo = ffi::IN_MOVED_TO,
    /// File was created in the watched directory
    Create = ffi::IN_CREATE,
    /// File was deleted from the watched directory
    Delete = ffi::IN_DELETE,
    /// Watched file or directory was itself deleted
    DeleteSelf = ffi::IN_DELETE_SELF,
    /// Watched file or directory was itself moved
    MoveSelf = ffi::IN_MOVE_SELF,
    /// File system of the watched object was unmounted
    Unmount = ffi::IN_UNMOUNT,
    /// Event queue overflowed
    QOverflow = ffi::IN_Q_OVERFLOW,
    /// Watch was removed
    Ignored = ffi::IN_IGNORED,
    /// Only watch the path if it is a directory
    Onlydir = ffi::IN_ONLYDIR,
    /// Don't follow the path if it is a symbolic link
    DontFollow = ffi::IN_DONT_FOLLOW,
    /// Exclude events on children unlinked from the watched directory
    ExclUnlink = ffi::IN_EXCL_UNLINK,
    /// Add to the mask of an existing watch instead of replacing it
    MaskAdd = ffi::IN_MASK_ADD,
    /// Subject of the event is a directory
    Isdir = ffi::IN_ISDIR,
    /// Report one event, then remove the watch
    Oneshot = ffi::IN_ONESHOT,
}

impl Flag {
    /// Every flag, ordered by bit value
    pub const ALL: [Flag; 21] = [
        Flag::Access,
        Flag::Modify,
        Flag::Attrib,
        Flag::CloseWrite,
        Flag::CloseNowrite,
        Flag::Open,
        Flag::MovedFrom,
        Flag::MovedTo,
        Flag::Create,
        Flag::Delete,
        Flag::DeleteSelf,
        Flag::MoveSelf,
        Flag::Unmount,
        Flag::QOverflow,
        Flag::Ignored,
        Flag::Onlydir,
        Flag::DontFollow,
        Flag::ExclUnlink,
        Flag::MaskAdd,
        Flag::Isdir,
        Flag::Oneshot,
    ];

    /// The bit this flag occupies in a mask
    pub const fn bit(self) -> u32 {
        self as u32
    }

    /// The name of the flag, as in `inotify.h` without the `IN_` prefix
    pub const fn name(self) -> &'static str {
        match self {
            Flag::Access => "ACCESS",
            Flag::Modify => "MODIFY",
            Flag::Attrib => "ATTRIB",
            Flag::CloseWrite => "CLOSE_WRITE",
            Flag::CloseNowrite => "CLOSE_NOWRITE",
            Flag::Open => "OPEN",
            Flag::MovedFrom => "MOVED_FROM",
            Flag::MovedTo => "MOVED_TO",
            Flag::Create => "CREATE",
            Flag::Delete => "DELETE",
            Flag::DeleteSelf => "DELETE_SELF",
            Flag::MoveSelf => "MOVE_SELF",
            Flag::Unmount => "UNMOUNT",
            Flag::QOverflow => "Q_OVERFLOW",
            Flag::Ignored => "IGNORED",
            Flag::Onlydir => "ONLYDIR",
            Flag::DontFollow => "DONT_FOLLOW",
            Flag::ExclUnlink => "EXCL_UNLINK",
            Flag::MaskAdd => "MASK_ADD",
            Flag::Isdir => "ISDIR",
            Flag::Oneshot => "ONESHOT",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns every flag that is set in `mask`
///
/// The flags are returned in ascending order of their bit values. Bits that
/// don't correspond to any [`Flag`] are skipped. Mostly useful for debug
/// output:
///
/// ```
/// use inotify_simple::{flags_in, Flag, Mask};
///
/// let flags = flags_in(Mask::CREATE | Mask::ISDIR);
/// assert_eq!(flags, [Flag::Create, Flag::Isdir]);
/// ```
pub fn flags_in(mask: Mask) -> Vec<Flag> {
    Flag::ALL
        .iter()
        .copied()
        .filter(|flag| mask.bits() & flag.bit() != 0)
        .collect()
}

bitflags! {
    /// A combination of inotify flags
    ///
    /// Passed to [`Inotify::add_watch`] to describe what to watch for, and
    /// found in [`Event::mask`] to describe what happened. Masks read from
    /// the kernel keep any bits this crate doesn't know about.
    ///
    /// Besides a constant for every [`Flag`], this provides the presets
    /// [`CLOSE`](Self::CLOSE), [`MOVE`](Self::MOVE) and
    /// [`ALL_EVENTS`](Self::ALL_EVENTS).
    ///
    /// [`Inotify::add_watch`]: crate::Inotify::add_watch
    /// [`Event::mask`]: crate::Event::mask
    #[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Default)]
    pub struct Mask: u32 {
        /// File was accessed
        ///
        /// When watching a directory, this event is only triggered for objects
        /// inside the directory, not the directory itself.
        const ACCESS = ffi::IN_ACCESS;

        /// File was modified
        ///
        /// When watching a directory, this event is only triggered for objects
        /// inside the directory, not the directory itself.
        const MODIFY = ffi::IN_MODIFY;

        /// Metadata (permissions, timestamps, ...) changed
        const ATTRIB = ffi::IN_ATTRIB;

        /// File opened for writing was closed
        const CLOSE_WRITE = ffi::IN_CLOSE_WRITE;

        /// File or directory not opened for writing was closed
        const CLOSE_NOWRITE = ffi::IN_CLOSE_NOWRITE;

        /// File or directory was opened
        const OPEN = ffi::IN_OPEN;

        /// File was renamed/moved; watched directory contained old name
        const MOVED_FROM = ffi::IN_MOVED_FROM;

        /// File was renamed/moved; watched directory contains new name
        const MOVED_TO = ffi::IN_MOVED_TO;

        /// File/directory created in watched directory
        const CREATE = ffi::IN_CREATE;

        /// File/directory deleted from watched directory
        const DELETE = ffi::IN_DELETE;

        /// Watched file/directory was deleted
        const DELETE_SELF = ffi::IN_DELETE_SELF;

        /// Watched file/directory was moved
        const MOVE_SELF = ffi::IN_MOVE_SELF;

        /// File system containing the watched object was unmounted
        ///
        /// An event with [`IGNORED`](Self::IGNORED) follows for the same
        /// watch.
        const UNMOUNT = ffi::IN_UNMOUNT;

        /// Event queue overflowed and events were dropped
        const Q_OVERFLOW = ffi::IN_Q_OVERFLOW;

        /// Watch was removed
        ///
        /// Generated when a watch is removed explicitly via
        /// [`Inotify::rm_watch`], or automatically (file deleted, file
        /// system unmounted, or a [`ONESHOT`](Self::ONESHOT) watch fired).
        ///
        /// [`Inotify::rm_watch`]: crate::Inotify::rm_watch
        const IGNORED = ffi::IN_IGNORED;

        /// Only watch path, if it is a directory
        const ONLYDIR = ffi::IN_ONLYDIR;

        /// Don't dereference the path if it is a symbolic link
        const DONT_FOLLOW = ffi::IN_DONT_FOLLOW;

        /// Filter events for directory entries that have been unlinked
        const EXCL_UNLINK = ffi::IN_EXCL_UNLINK;

        /// If a watch for the inode exists, amend it instead of replacing it
        const MASK_ADD = ffi::IN_MASK_ADD;

        /// Subject of the event is a directory
        const ISDIR = ffi::IN_ISDIR;

        /// Only receive one event, then remove the watch
        const ONESHOT = ffi::IN_ONESHOT;

        /// Both close events
        ///
        /// [`CLOSE_WRITE`](Self::CLOSE_WRITE) and
        /// [`CLOSE_NOWRITE`](Self::CLOSE_NOWRITE).
        const CLOSE = ffi::IN_CLOSE;

        /// Both move events
        ///
        /// [`MOVED_FROM`](Self::MOVED_FROM) and
        /// [`MOVED_TO`](Self::MOVED_TO).
        const MOVE = ffi::IN_MOVE;

        /// Every event that can be watched for
        ///
        /// All of [`ACCESS`](Self::ACCESS) through
        /// [`MOVE_SELF`](Self::MOVE_SELF).
        const ALL_EVENTS = ffi::IN_ALL_EVENTS;
    }
}

impl Mask {
    /// Returns every flag that is set in this mask
    ///
    /// See [`flags_in`].
    pub fn flags(self) -> Vec<Flag> {
        flags_in(self)
    }
}

impl From<Flag> for Mask {
    fn from(flag: Flag) -> Self {
        Mask::from_bits_retain(flag.bit())
    }
}

impl BitOr for Flag {
    type Output = Mask;

    fn bitor(self, rhs: Flag) -> Mask {
        Mask::from(self) | Mask::from(rhs)
    }
}

impl BitOr<Flag> for Mask {
    type Output = Mask;

    fn bitor(self, rhs: Flag) -> Mask {
        self | Mask::from(rhs)
    }
}
