use std::{
    ffi::{OsStr, OsString},
    mem,
    os::unix::ffi::OsStrExt,
};

use inotify_sys as ffi;

use crate::error::DecodeError;
use crate::flags::{flags_in, Flag, Mask};
use crate::watches::WatchDescriptor;

/// Size of the fixed part of an event, without the name
pub(crate) const EVENT_SIZE: usize = mem::size_of::<ffi::inotify_event>();

/// An inotify event
///
/// A file system event that describes a change that the user previously
/// registered interest in. To watch for events, call
/// [`Inotify::add_watch`]. To retrieve events, call [`Inotify::read`], or
/// read the raw descriptor yourself and pass the bytes to [`parse_events`].
///
/// [`Inotify::add_watch`]: crate::Inotify::add_watch
/// [`Inotify::read`]: crate::Inotify::read
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Event {
    /// Identifies the watch this event originates from
    ///
    /// This [`WatchDescriptor`] is equal to the one that
    /// [`Inotify::add_watch`] returned when interest for this event was
    /// registered.
    ///
    /// [`Inotify::add_watch`]: crate::Inotify::add_watch
    pub wd: WatchDescriptor,

    /// Indicates what kind of event this is
    pub mask: Mask,

    /// Connects related events to each other
    ///
    /// When a file is renamed, this results two events: [`MOVED_FROM`] and
    /// [`MOVED_TO`]. The `cookie` field will be the same for both of them,
    /// thereby making is possible to connect the event pair.
    ///
    /// [`MOVED_FROM`]: Mask::MOVED_FROM
    /// [`MOVED_TO`]: Mask::MOVED_TO
    pub cookie: u32,

    /// The name of the file the event originates from
    ///
    /// Relative to the watched directory. Empty if the event concerns the
    /// watched file or directory itself.
    pub name: OsString,
}

impl Event {
    /// Returns every flag set in this event's mask
    pub fn flags(&self) -> Vec<Flag> {
        flags_in(self.mask)
    }

    /// Create an `Event` from a buffer
    ///
    /// Assumes that an `inotify_event` plus its name starts at `offset` in
    /// `buffer`. Returns the number of bytes used from the buffer, and the
    /// event.
    fn from_buffer(buffer: &[u8], offset: usize) -> Result<(usize, Self), DecodeError> {
        let bytes = &buffer[offset..];

        if bytes.len() < EVENT_SIZE {
            return Err(DecodeError {
                offset,
                needed: EVENT_SIZE,
                available: bytes.len(),
            });
        }

        // The length check above guarantees a whole `inotify_event` at the
        // start of `bytes`. The byte buffer has alignment 1, so the struct
        // has to be read unaligned.
        let ffi_event = unsafe {
            (bytes.as_ptr() as *const ffi::inotify_event).read_unaligned()
        };

        let bytes_consumed = EVENT_SIZE + ffi_event.len as usize;
        if bytes.len() < bytes_consumed {
            return Err(DecodeError {
                offset,
                needed: bytes_consumed,
                available: bytes.len(),
            });
        }

        // The kernel pads the name with '\0' up to the alignment boundary.
        // `split` always yields at least one item, even without any '\0'.
        let name = bytes[EVENT_SIZE..bytes_consumed]
            .split(|b| *b == 0)
            .next()
            .unwrap_or_default();

        let event = Event {
            wd: WatchDescriptor(ffi_event.wd),
            mask: Mask::from_bits_retain(ffi_event.mask),
            cookie: ffi_event.cookie,
            name: OsStr::from_bytes(name).to_os_string(),
        };

        Ok((bytes_consumed, event))
    }

    /// Packs this event into the layout the kernel uses
    ///
    /// The name gets a terminating '\0' and is padded the way the kernel pads
    /// it. Concatenating the output for several events produces a buffer
    /// that [`parse_events`] turns back into the same events.
    pub fn to_bytes(&self) -> Vec<u8> {
        let name = self.name.as_bytes();
        let name_len = if name.is_empty() {
            0
        } else {
            // Same rounding as the kernel: room for the '\0', then up to a
            // multiple of the event header size.
            (name.len() + 1 + EVENT_SIZE - 1) / EVENT_SIZE * EVENT_SIZE
        };

        let mut bytes = Vec::with_capacity(EVENT_SIZE + name_len);
        bytes.extend_from_slice(&self.wd.id().to_ne_bytes());
        bytes.extend_from_slice(&self.mask.bits().to_ne_bytes());
        bytes.extend_from_slice(&self.cookie.to_ne_bytes());
        bytes.extend_from_slice(&(name_len as u32).to_ne_bytes());
        bytes.extend_from_slice(name);
        bytes.resize(EVENT_SIZE + name_len, 0);
        bytes
    }
}

/// Decodes a buffer read from an inotify file descriptor
///
/// Use this if you read the descriptor yourself instead of calling
/// [`Inotify::read`]. The events are returned in the order they appear in
/// `buffer`, which is the order the kernel emitted them in.
///
/// # Errors
///
/// Returns [`DecodeError`] if `buffer` ends in the middle of an event. The
/// kernel never produces such a buffer, so this points to a truncated or
/// otherwise mangled buffer.
///
/// [`Inotify::read`]: crate::Inotify::read
pub fn parse_events(buffer: &[u8]) -> Result<Vec<Event>, DecodeError> {
    let mut events = Vec::new();
    let mut pos = 0;

    while pos < buffer.len() {
        let (step, event) = Event::from_buffer(buffer, pos)?;
        pos += step;
        events.push(event);
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;

    use crate::{DecodeError, Flag, Mask, WatchDescriptor};

    use super::{parse_events, Event, EVENT_SIZE};

    fn event(wd: i32, mask: Mask, cookie: u32, name: &str) -> Event {
        Event {
            wd: WatchDescriptor(wd),
            mask,
            cookie,
            name: name.into(),
        }
    }

    #[test]
    fn header_is_sixteen_bytes() {
        assert_eq!(EVENT_SIZE, 16);
    }

    #[test]
    fn parse_events_should_recover_concatenated_events_in_order() {
        let input = vec![
            event(1, Mask::OPEN, 0, "foo"),
            event(1, Mask::ACCESS, 0, "foo"),
            event(2, Mask::MOVED_FROM, 7, "a-rather-long-file-name.txt"),
            event(3, Mask::MOVED_TO, 7, "b"),
            event(4, Mask::DELETE_SELF, 0, ""),
            event(-1, Mask::Q_OVERFLOW, 0, ""),
        ];

        for n in 1..=input.len() {
            let buffer: Vec<u8> = input[..n].iter().flat_map(Event::to_bytes).collect();
            assert_eq!(parse_events(&buffer).unwrap(), &input[..n]);
        }
    }

    #[test]
    fn name_stops_at_first_nul() {
        let mut bytes = event(5, Mask::CREATE, 0, "").to_bytes();
        bytes[12..16].copy_from_slice(&8u32.to_ne_bytes());
        bytes.extend_from_slice(b"ab\0\0cd\0\0");

        let events = parse_events(&bytes).unwrap();
        assert_eq!(events[0].name, "ab");
    }

    #[test]
    fn name_without_nul_uses_all_bytes() {
        let mut bytes = event(5, Mask::CREATE, 0, "").to_bytes();
        bytes[12..16].copy_from_slice(&4u32.to_ne_bytes());
        bytes.extend_from_slice(b"abcd");

        let events = parse_events(&bytes).unwrap();
        assert_eq!(events[0].name, "abcd");
    }

    #[test]
    fn invalid_utf8_names_round_trip() {
        let name = OsString::from_vec(vec![0x66, 0xff, 0xfe, 0x6f]);
        let input = Event {
            wd: WatchDescriptor(1),
            mask: Mask::CREATE,
            cookie: 0,
            name: name.clone(),
        };

        let events = parse_events(&input.to_bytes()).unwrap();
        assert_eq!(events[0].name, name);
    }

    #[test]
    fn parse_events_should_not_mistake_next_event_for_name_of_previous_event() {
        let mut bytes = event(1, Mask::MODIFY, 0, "").to_bytes();
        bytes.extend(event(1, Mask::MODIFY, 0, "x").to_bytes());

        let events = parse_events(&bytes).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "");
    }

    #[test]
    fn truncated_header_is_an_error() {
        let mut bytes = event(1, Mask::CREATE, 0, "foo").to_bytes();
        let full = bytes.len();
        bytes.extend_from_slice(&[1, 2, 3]);

        assert_eq!(
            parse_events(&bytes),
            Err(DecodeError { offset: full, needed: EVENT_SIZE, available: 3 }),
        );
    }

    #[test]
    fn truncated_name_is_an_error() {
        let mut bytes = event(1, Mask::CREATE, 0, "foo").to_bytes();
        bytes.truncate(EVENT_SIZE + 2);

        assert_eq!(
            parse_events(&bytes),
            Err(DecodeError { offset: 0, needed: 2 * EVENT_SIZE, available: EVENT_SIZE + 2 }),
        );
    }

    #[test]
    fn empty_buffer_has_no_events() {
        assert_eq!(parse_events(&[]), Ok(Vec::new()));
    }

    #[test]
    fn unknown_mask_bits_are_kept() {
        let input = event(1, Mask::from_bits_retain(0x0000_1000) | Mask::CREATE, 0, "foo");
        let events = parse_events(&input.to_bytes()).unwrap();

        assert_eq!(events[0].mask.bits(), 0x0000_1100);
        assert_eq!(events[0].flags(), [Flag::Create]);
    }
}
