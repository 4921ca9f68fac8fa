#![warn(missing_docs)]

//! Simple, thread-safe wrapper for inotify
//!
//! [Inotify][wiki] is a linux kernel mechanism for monitoring
//! changes to filesystems' contents.
//!
//! > The inotify API provides a mechanism for monitoring filesystem
//! > events. Inotify can be used to monitor individual files, or to
//! > monitor directories. When a directory is monitored, inotify will
//! > return events for the directory itself, and for files inside the
//! > directory.
//!
//! See the [man page][inotify7] for usage information
//! of the C version, which this package follows closely.
//!
//! This crate wraps a single inotify instance in [`Inotify`]. Watches are
//! added with [`Inotify::add_watch`] and events are retrieved with
//! [`Inotify::read`], which waits with an optional timeout and can delay the
//! read to let the kernel coalesce events. If you'd rather read the
//! descriptor yourself, [`parse_events`] decodes the raw bytes.
//!
//! # Example
//!
//! ```
//! use std::{fs::File, time::Duration};
//!
//! use inotify_simple::{flags_in, Inotify, Mask};
//!
//! let dir = std::env::temp_dir().join("inotify-simple-crate-example");
//! std::fs::create_dir_all(&dir).expect("Failed to create directory");
//!
//! let inotify = Inotify::init()
//!     .expect("Failed to initialize inotify");
//! inotify.add_watch(&dir, Mask::CREATE | Mask::MODIFY)
//!     .expect("Failed to add watch");
//!
//! File::create(dir.join("file")).expect("Failed to create file");
//!
//! let events = inotify.read(Some(Duration::from_secs(1)), None)
//!     .expect("Failed to read events");
//! for event in events {
//!     println!("{:?} {:?}", event.name, flags_in(event.mask));
//! }
//! # std::fs::remove_dir_all(&dir).ok();
//! ```
//!
//! [wiki]: https://en.wikipedia.org/wiki/Inotify
//! [inotify7]: http://man7.org/linux/man-pages/man7/inotify.7.html

#[macro_use]
extern crate bitflags;

#[macro_use]
extern crate log;

mod error;
mod events;
mod fd_guard;
mod flags;
mod inotify;
mod poller;
mod sys;
mod watches;

pub use crate::error::{DecodeError, Error, Result};
pub use crate::events::{parse_events, Event};
pub use crate::flags::{flags_in, Flag, Mask};
pub use crate::inotify::{Inotify, InotifyOptions};
pub use crate::watches::WatchDescriptor;
