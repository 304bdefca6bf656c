//! Mutable text with a modification stamp, shared by any number of model
//! contexts.

use crate::error::{ModelError, Result};
use lathe_api::{BufferId, TextRange, TextSize};
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};

/// One replace operation, in the coordinates of the text it was applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferEdit {
    pub buffer: BufferId,
    pub old_stamp: u64,
    pub new_stamp: u64,
    pub range: TextRange,
    pub new_len: TextSize,
}

/// Observer of buffer edits. Buffers hold listeners weakly; dropping the
/// listener detaches it.
pub trait BufferListener: Send + Sync {
    fn buffer_changed(&self, edit: &BufferEdit);
}

#[derive(Debug)]
struct Content {
    text: Arc<str>,
    stamp: u64,
}

pub struct TextBuffer {
    id: BufferId,
    content: RwLock<Content>,
    listeners: Mutex<Vec<Weak<dyn BufferListener>>>,
}

impl std::fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let content = self.content.read();
        f.debug_struct("TextBuffer")
            .field("id", &self.id)
            .field("stamp", &content.stamp)
            .field("len", &content.text.len())
            .finish()
    }
}

impl TextBuffer {
    pub fn new(text: &str) -> Arc<Self> {
        Self::with_id(BufferId::fresh(), text)
    }

    pub fn with_id(id: BufferId, text: &str) -> Arc<Self> {
        Arc::new(Self {
            id,
            content: RwLock::new(Content {
                text: Arc::from(text),
                stamp: 1,
            }),
            listeners: Mutex::new(Vec::new()),
        })
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn text(&self) -> Arc<str> {
        self.content.read().text.clone()
    }

    pub fn len(&self) -> TextSize {
        TextSize::of(&*self.content.read().text)
    }

    pub fn is_empty(&self) -> bool {
        self.content.read().text.is_empty()
    }

    pub fn stamp(&self) -> u64 {
        self.content.read().stamp
    }

    /// Text and stamp read together.
    pub fn snapshot(&self) -> (Arc<str>, u64) {
        let content = self.content.read();
        (content.text.clone(), content.stamp)
    }

    pub fn add_listener(&self, listener: Weak<dyn BufferListener>) {
        let mut listeners = self.listeners.lock();
        listeners.retain(|l| l.strong_count() > 0);
        listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        let mut listeners = self.listeners.lock();
        listeners.retain(|l| l.strong_count() > 0);
        listeners.len()
    }

    /// Replaces `range` with `text`. The stamp grows by one per edit, even
    /// when the replacement equals what it replaces.
    pub fn replace(&self, range: TextRange, text: &str) -> Result<BufferEdit> {
        let edit = {
            let mut content = self.content.write();
            let len = content.text.len();
            let start = usize::from(range.start());
            let end = usize::from(range.end());
            if end > len || !content.text.is_char_boundary(start) || !content.text.is_char_boundary(end)
            {
                return Err(ModelError::InvalidRange {
                    start: start as u32,
                    end: end as u32,
                    len: len as u32,
                });
            }
            let mut next = String::with_capacity(len - (end - start) + text.len());
            next.push_str(&content.text[..start]);
            next.push_str(text);
            next.push_str(&content.text[end..]);
            let old_stamp = content.stamp;
            content.text = Arc::from(next);
            content.stamp += 1;
            BufferEdit {
                buffer: self.id,
                old_stamp,
                new_stamp: content.stamp,
                range,
                new_len: TextSize::of(text),
            }
        };
        tracing::trace!(
            "{} edited {:?} -> {} bytes (stamp {})",
            self.id,
            edit.range,
            u32::from(edit.new_len),
            edit.new_stamp
        );
        let listeners: Vec<Arc<dyn BufferListener>> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|l| l.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in listeners {
            listener.buffer_changed(&edit);
        }
        Ok(edit)
    }

    pub fn insert(&self, offset: TextSize, text: &str) -> Result<BufferEdit> {
        self.replace(TextRange::empty(offset), text)
    }

    pub fn delete(&self, range: TextRange) -> Result<BufferEdit> {
        self.replace(range, "")
    }

    /// Replaces the whole text.
    pub fn set_text(&self, text: &str) -> Result<BufferEdit> {
        self.replace(TextRange::up_to(self.len()), text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    impl BufferListener for Counter {
        fn buffer_changed(&self, _edit: &BufferEdit) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_stamp_grows_on_every_edit() {
        let buffer = TextBuffer::new("class C {}");
        let first = buffer.stamp();
        let edit = buffer
            .insert(TextSize::from(9), "int x;")
            .expect("insert");
        assert_eq!(&*buffer.text(), "class C {int x;}");
        assert_eq!(edit.old_stamp, first);
        assert!(edit.new_stamp > first);
        let same = buffer
            .replace(TextRange::new(9.into(), 15.into()), "int x;")
            .expect("replace");
        assert!(same.new_stamp > edit.new_stamp);
    }

    #[test]
    fn test_rejects_bad_ranges() {
        let buffer = TextBuffer::new("é");
        assert!(matches!(
            buffer.insert(TextSize::from(1), "x"),
            Err(ModelError::InvalidRange { .. })
        ));
        assert!(matches!(
            buffer.delete(TextRange::new(0.into(), 5.into())),
            Err(ModelError::InvalidRange { .. })
        ));
        assert_eq!(buffer.stamp(), 1);
    }

    #[test]
    fn test_dropped_listeners_are_pruned() {
        let buffer = TextBuffer::new("");
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let weak: Weak<dyn BufferListener> = Arc::downgrade(&counter) as Weak<dyn BufferListener>;
        buffer.add_listener(weak);
        buffer.set_text("a").expect("edit");
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        drop(counter);
        buffer.set_text("b").expect("edit");
        assert_eq!(buffer.listener_count(), 0);
    }
}
