//! Read/write epochs over a model.
//!
//! Any number of threads may hold a read epoch at once; a write epoch is
//! exclusive. Waiting writers block new readers, so a steady stream of short
//! reads cannot starve a commit. Epochs nest on one thread: reads and writes
//! inside a write are allowed, a write inside a read is a fatal error since
//! it could never be granted.

use crate::error::violation;
use parking_lot::{Condvar, Mutex};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::ThreadId;

static NEXT_GATE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    ReadActive(usize),
    WriteActive,
}

#[derive(Debug, Default)]
struct Epochs {
    readers: usize,
    writer: Option<ThreadId>,
    waiting_writers: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct Held {
    reads: usize,
    writes: usize,
}

thread_local! {
    static HELD: RefCell<Vec<(u64, Held)>> = const { RefCell::new(Vec::new()) };
}

fn held(gate: u64) -> Held {
    HELD.with(|held| {
        held.borrow()
            .iter()
            .find(|(id, _)| *id == gate)
            .map(|(_, h)| *h)
            .unwrap_or_default()
    })
}

fn update_held(gate: u64, f: impl FnOnce(&mut Held)) {
    HELD.with(|held| {
        let mut held = held.borrow_mut();
        let pos = match held.iter().position(|(id, _)| *id == gate) {
            Some(pos) => pos,
            None => {
                held.push((gate, Held::default()));
                held.len() - 1
            }
        };
        f(&mut held[pos].1);
        if held[pos].1.reads == 0 && held[pos].1.writes == 0 {
            held.swap_remove(pos);
        }
    });
}

#[derive(Debug)]
struct Inner {
    id: u64,
    epochs: Mutex<Epochs>,
    changed: Condvar,
}

#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    inner: Arc<Inner>,
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrencyGate {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                id: NEXT_GATE.fetch_add(1, Ordering::Relaxed),
                epochs: Mutex::new(Epochs::default()),
                changed: Condvar::new(),
            }),
        }
    }

    pub fn state(&self) -> GateState {
        let epochs = self.inner.epochs.lock();
        if epochs.writer.is_some() {
            GateState::WriteActive
        } else if epochs.readers > 0 {
            GateState::ReadActive(epochs.readers)
        } else {
            GateState::Idle
        }
    }

    pub fn read(&self) -> ReadGuard {
        let id = self.inner.id;
        let mine = held(id);
        // Already inside an epoch on this thread: waiting for a queued writer
        // here would deadlock against ourselves.
        if mine.reads == 0 && mine.writes == 0 {
            let mut epochs = self.inner.epochs.lock();
            while epochs.writer.is_some() || epochs.waiting_writers > 0 {
                self.inner.changed.wait(&mut epochs);
            }
            epochs.readers += 1;
        }
        update_held(id, |h| h.reads += 1);
        ReadGuard {
            gate: self.clone(),
            counted: mine.reads == 0 && mine.writes == 0,
            _not_send: PhantomData,
        }
    }

    pub fn write(&self) -> WriteGuard {
        let id = self.inner.id;
        let mine = held(id);
        if mine.writes == 0 && mine.reads > 0 {
            violation("gate", "write action requested inside a read action");
        }
        if mine.writes == 0 {
            let mut epochs = self.inner.epochs.lock();
            epochs.waiting_writers += 1;
            while epochs.writer.is_some() || epochs.readers > 0 {
                self.inner.changed.wait(&mut epochs);
            }
            epochs.waiting_writers -= 1;
            epochs.writer = Some(std::thread::current().id());
        }
        update_held(id, |h| h.writes += 1);
        WriteGuard {
            gate: self.clone(),
            outermost: mine.writes == 0,
            _not_send: PhantomData,
        }
    }

    pub fn read_action<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.read();
        f()
    }

    pub fn write_action<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.write();
        f()
    }

    pub fn is_write_held(&self) -> bool {
        held(self.inner.id).writes > 0
    }

    pub fn is_read_held(&self) -> bool {
        let mine = held(self.inner.id);
        mine.reads > 0 || mine.writes > 0
    }

    /// A writer is queued; long read work should end its epoch soon.
    pub fn writer_waiting(&self) -> bool {
        self.inner.epochs.lock().waiting_writers > 0
    }

    #[track_caller]
    pub fn assert_write_access(&self, what: &str) {
        if !self.is_write_held() {
            violation("gate", format!("{what} outside a write action"));
        }
    }

    /// For work that fans out to other threads and would deadlock on a
    /// write held by the caller.
    #[track_caller]
    pub fn assert_no_write(&self, what: &str) {
        if self.is_write_held() {
            violation("gate", format!("{what} inside a write action"));
        }
    }

    #[track_caller]
    pub fn assert_read_access(&self, what: &str) {
        if !self.is_read_held() {
            violation("gate", format!("{what} outside a read action"));
        }
    }
}

#[must_use]
pub struct ReadGuard {
    gate: ConcurrencyGate,
    counted: bool,
    _not_send: PhantomData<*const ()>,
}

impl ReadGuard {
    pub fn should_yield(&self) -> bool {
        self.gate.writer_waiting()
    }
}

impl Drop for ReadGuard {
    fn drop(&mut self) {
        update_held(self.gate.inner.id, |h| h.reads -= 1);
        if self.counted {
            let mut epochs = self.gate.inner.epochs.lock();
            epochs.readers -= 1;
            if epochs.readers == 0 {
                self.gate.inner.changed.notify_all();
            }
        }
    }
}

#[must_use]
pub struct WriteGuard {
    gate: ConcurrencyGate,
    outermost: bool,
    _not_send: PhantomData<*const ()>,
}

impl WriteGuard {
    pub fn is_outermost(&self) -> bool {
        self.outermost
    }
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        update_held(self.gate.inner.id, |h| h.writes -= 1);
        if self.outermost {
            let mut epochs = self.gate.inner.epochs.lock();
            epochs.writer = None;
            self.gate.inner.changed.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_states() {
        let gate = ConcurrencyGate::new();
        assert_eq!(gate.state(), GateState::Idle);
        {
            let _a = gate.read();
            let _b = gate.read();
            assert_eq!(gate.state(), GateState::ReadActive(1));
        }
        {
            let _w = gate.write();
            assert_eq!(gate.state(), GateState::WriteActive);
            let _r = gate.read();
            let _w2 = gate.write();
            assert!(gate.is_write_held());
        }
        assert_eq!(gate.state(), GateState::Idle);
        assert!(!gate.is_read_held());
    }

    #[test]
    #[should_panic(expected = "write action requested inside a read action")]
    fn test_write_inside_read_is_fatal() {
        let gate = ConcurrencyGate::new();
        let _r = gate.read();
        let _w = gate.write();
    }

    #[test]
    #[should_panic(expected = "apply_edit outside a write action")]
    fn test_mutation_outside_write_is_fatal() {
        let gate = ConcurrencyGate::new();
        let _r = gate.read();
        gate.assert_write_access("apply_edit");
    }

    #[test]
    fn test_writer_waits_for_readers_and_blocks_new_ones() {
        let gate = ConcurrencyGate::new();
        let reader = gate.read();
        let writing = Arc::new(AtomicBool::new(false));

        let (started_tx, started_rx) = mpsc::channel();
        let writer = {
            let gate = gate.clone();
            let writing = writing.clone();
            std::thread::spawn(move || {
                started_tx.send(()).ok();
                let _w = gate.write();
                writing.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(20));
                writing.store(false, Ordering::SeqCst);
            })
        };
        started_rx.recv().ok();
        while !gate.writer_waiting() {
            std::thread::yield_now();
        }
        assert!(reader.should_yield());
        assert!(!writing.load(Ordering::SeqCst));

        let late_reader = {
            let gate = gate.clone();
            let writing = writing.clone();
            std::thread::spawn(move || {
                let _r = gate.read();
                assert!(!writing.load(Ordering::SeqCst));
            })
        };
        drop(reader);
        writer.join().expect("writer");
        late_reader.join().expect("reader");
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[test]
    fn test_gates_are_independent() {
        let a = ConcurrencyGate::new();
        let b = ConcurrencyGate::new();
        let _r = a.read();
        let _w = b.write();
        assert!(a.is_read_held() && !a.is_write_held());
        assert!(b.is_write_held());
    }
}
