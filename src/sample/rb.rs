use std::ops::AddAssign;
use std::sync::atomic::{AtomicU64, Ordering as MemOrd};

use crate::ffi::{bindings as b, Header};

/// What a [`Rb::consume`] pass found in the ring buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tally {
    /// `PERF_RECORD_SAMPLE` records.
    pub samples: u64,
    /// Samples the kernel dropped because the buffer was full.
    pub lost: u64,
    /// Bytes released back to the kernel.
    pub bytes: u64,
}

impl AddAssign for Tally {
    fn add_assign(&mut self, rhs: Self) {
        self.samples += rhs.samples;
        self.lost += rhs.lost;
        self.bytes += rhs.bytes;
    }
}

pub(super) struct Rb<'a> {
    alloc: &'a [u8],
    tail: &'a AtomicU64,
    head: &'a AtomicU64,
}

impl<'a> Rb<'a> {
    pub fn new(alloc: &'a [u8], tail: &'a AtomicU64, head: &'a AtomicU64) -> Self {
        Self { alloc, tail, head }
    }

    // Records may wrap around the end of the data area.
    fn read_at<const N: usize>(&self, offset: u64) -> [u8; N] {
        let size = self.alloc.len() as u64;
        let mut buf = [0; N];
        for (i, it) in buf.iter_mut().enumerate() {
            *it = self.alloc[((offset + i as u64) % size) as usize];
        }
        buf
    }

    fn header_at(&self, offset: u64) -> Header {
        // https://github.com/torvalds/linux/blob/v6.13/include/uapi/linux/perf_event.h#L824
        // struct perf_event_header {
        //     u32 type; # 4 bytes
        //     u16 misc; # 2 bytes
        //     u16 size; # 2 bytes
        // };
        let buf: [u8; 8] = self.read_at(offset);
        Header {
            type_: u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]),
            misc: u16::from_ne_bytes([buf[4], buf[5]]),
            size: u16::from_ne_bytes([buf[6], buf[7]]),
        }
    }

    /// Walks every record published so far and hands the space back to
    /// the kernel.
    pub fn consume(&self) -> Tally {
        // Thread safe since no more threads set the tail
        let tail = self.tail.load(MemOrd::Relaxed);
        // About acquire:
        // https://github.com/torvalds/linux/blob/v6.13/include/uapi/linux/perf_event.h#L720
        let head = self.head.load(MemOrd::Acquire);

        let mut tally = Tally {
            bytes: head.wrapping_sub(tail),
            ..Default::default()
        };

        let mut pos = tail;
        while pos < head {
            let header = self.header_at(pos);
            if header.size == 0 {
                break;
            }
            match header.type_ {
                b::PERF_RECORD_SAMPLE => tally.samples += 1,
                // struct { header; u64 id; u64 lost; }
                b::PERF_RECORD_LOST => tally.lost += u64::from_ne_bytes(self.read_at(pos + 16)),
                _ => (),
            }
            pos += header.size as u64;
        }

        // https://github.com/torvalds/linux/blob/v6.13/include/uapi/linux/perf_event.h#L723
        self.tail.store(head, MemOrd::Release);

        tally
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::AtomicU64;

    use super::{Rb, Tally};
    use crate::ffi::bindings as b;

    fn put(buf: &mut [u8], at: usize, bytes: &[u8]) {
        let len = buf.len();
        for (i, it) in bytes.iter().enumerate() {
            buf[(at + i) % len] = *it;
        }
    }

    fn record(ty: u32, body: &[u64]) -> Vec<u8> {
        let size = (8 + body.len() * 8) as u16;
        let mut rec = vec![];
        rec.extend(ty.to_ne_bytes());
        rec.extend(0_u16.to_ne_bytes());
        rec.extend(size.to_ne_bytes());
        body.iter().for_each(|it| rec.extend(it.to_ne_bytes()));
        rec
    }

    #[test]
    fn test_consume_empty() {
        let alloc = [0_u8; 64];
        let tail = AtomicU64::new(16);
        let head = AtomicU64::new(16);
        let rb = Rb::new(&alloc, &tail, &head);
        assert_eq!(rb.consume(), Tally::default());
        assert_eq!(tail.into_inner(), 16);
    }

    #[test]
    fn test_consume_samples_and_lost() {
        let mut alloc = [0_u8; 64];
        let recs = [
            record(b::PERF_RECORD_SAMPLE, &[0x401000]),
            record(b::PERF_RECORD_LOST, &[7, 3]),
            record(b::PERF_RECORD_SAMPLE, &[0x401008]),
        ];
        let mut at = 0;
        for it in recs.iter() {
            put(&mut alloc, at, it);
            at += it.len();
        }

        let tail = AtomicU64::new(0);
        let head = AtomicU64::new(at as _);
        let rb = Rb::new(&alloc, &tail, &head);
        let tally = rb.consume();

        assert_eq!(tally.samples, 2);
        assert_eq!(tally.lost, 3);
        assert_eq!(tally.bytes, 56);
        assert_eq!(tail.load(std::sync::atomic::Ordering::Relaxed), 56);

        // Nothing new since the last pass.
        assert_eq!(rb.consume().samples, 0);
    }

    #[test]
    fn test_consume_wrapped_header() {
        let mut alloc = [0_u8; 64];
        // Starts 4 bytes before the end so the header itself wraps.
        let start = 60;
        let rec = record(b::PERF_RECORD_LOST, &[1, 9]);
        put(&mut alloc, start, &rec);

        let tail = AtomicU64::new(start as _);
        let head = AtomicU64::new((start + rec.len()) as _);
        let tally = Rb::new(&alloc, &tail, &head).consume();

        assert_eq!(tally.lost, 9);
        assert_eq!(tally.samples, 0);
    }
}
