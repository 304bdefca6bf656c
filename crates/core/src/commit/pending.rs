//! Edits recorded between two commits, coalesced into disjoint segments.

use crate::buffer::BufferEdit;
use lathe_api::{TextRange, TextSize};

/// A changed region: `old` in the committed text, `new` in the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub old: TextRange,
    pub new: TextRange,
}

impl Segment {
    /// The single region where `old` and `new` differ, trimmed of their
    /// common prefix and suffix. `None` when the texts are equal.
    pub fn diff(old: &str, new: &str) -> Option<Segment> {
        if old == new {
            return None;
        }
        let (a, b) = (old.as_bytes(), new.as_bytes());
        let mut prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
        while !old.is_char_boundary(prefix) || !new.is_char_boundary(prefix) {
            prefix -= 1;
        }
        let max_suffix = a.len().min(b.len()) - prefix;
        let mut suffix = a
            .iter()
            .rev()
            .zip(b.iter().rev())
            .take(max_suffix)
            .take_while(|(x, y)| x == y)
            .count();
        while !old.is_char_boundary(a.len() - suffix) || !new.is_char_boundary(b.len() - suffix) {
            suffix -= 1;
        }
        let size = |n: usize| TextSize::from(n as u32);
        Some(Segment {
            old: TextRange::new(size(prefix), size(a.len() - suffix)),
            new: TextRange::new(size(prefix), size(b.len() - suffix)),
        })
    }

    fn delta(&self) -> i64 {
        i64::from(u32::from(self.new.len())) - i64::from(u32::from(self.old.len()))
    }
}

fn size(value: i64) -> TextSize {
    TextSize::from(value.max(0) as u32)
}

fn at(value: TextSize) -> i64 {
    i64::from(u32::from(value))
}

/// Journal of one document. Edits arrive in current-text coordinates and
/// are folded into segments sorted by position.
#[derive(Debug, Default)]
pub struct PendingChanges {
    segments: Vec<Segment>,
    /// Stamp of the text the segments are relative to.
    base_stamp: u64,
    last_stamp: u64,
    /// An edit arrived out of order; the segments cannot be trusted.
    broken: bool,
}

impl PendingChanges {
    pub fn new(base_stamp: u64) -> Self {
        Self {
            segments: Vec::new(),
            base_stamp,
            last_stamp: base_stamp,
            broken: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.last_stamp == self.base_stamp
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Folds `edit` in. Returns false for edits already covered by the base
    /// text.
    pub fn record(&mut self, edit: &BufferEdit) -> bool {
        if edit.new_stamp <= self.base_stamp {
            return false;
        }
        if edit.old_stamp != self.last_stamp {
            self.broken = true;
        }
        self.last_stamp = self.last_stamp.max(edit.new_stamp);
        if !self.broken {
            self.merge(edit.range, edit.new_len);
        }
        true
    }

    fn merge(&mut self, range: TextRange, new_len: TextSize) {
        let (s, e) = (at(range.start()), at(range.end()));
        let delta = at(new_len) - (e - s);
        let first = self.segments.iter().position(|seg| at(seg.new.end()) >= s);
        let touching = first.map(|first| {
            let count = self.segments[first..]
                .iter()
                .take_while(|seg| at(seg.new.start()) <= e)
                .count();
            (first, count)
        });

        let merged = match touching {
            Some((first, count)) if count > 0 => {
                let head = self.segments[first];
                let tail = self.segments[first + count - 1];
                let old_start = at(head.old.start()) - (at(head.new.start()) - s).max(0);
                let old_end = at(tail.old.end()) + (e - at(tail.new.end())).max(0);
                let new_start = s.min(at(head.new.start()));
                let new_end = e.max(at(tail.new.end())) + delta;
                self.segments.drain(first..first + count);
                (
                    first,
                    Segment {
                        old: TextRange::new(size(old_start), size(old_end)),
                        new: TextRange::new(size(new_start), size(new_end)),
                    },
                )
            }
            _ => {
                let index = first.unwrap_or(self.segments.len());
                let shift: i64 = self.segments[..index].iter().map(Segment::delta).sum();
                (
                    index,
                    Segment {
                        old: TextRange::new(size(s - shift), size(e - shift)),
                        new: TextRange::new(size(s), size(s + at(new_len))),
                    },
                )
            }
        };
        let (index, segment) = merged;
        self.segments.insert(index, segment);
        for later in &mut self.segments[index + 1..] {
            later.new = TextRange::new(size(at(later.new.start()) + delta), size(at(later.new.end()) + delta));
        }
    }

    /// Segments turning the base text into the text at `stamp`, or `None`
    /// when the journal cannot describe it and the caller must diff.
    pub fn take(&mut self, stamp: u64) -> Option<Vec<Segment>> {
        let exact = !self.broken && self.last_stamp == stamp;
        let segments = std::mem::take(&mut self.segments);
        self.base_stamp = self.base_stamp.max(stamp);
        self.last_stamp = self.base_stamp;
        self.broken = false;
        exact.then_some(segments)
    }
}
