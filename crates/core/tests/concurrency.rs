mod common;

use common::{SOURCE, context, offset_of};
use lathe_api::{BufferId, TextRange, TextSize};
use lathe_core::{ModelError, StubIndex, TextBuffer};
use lathe_java::java_frontend;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const READERS: usize = 10;
const WRITES: usize = 60;

#[test]
fn test_readers_always_see_a_committed_snapshot() {
    let ctx = Arc::new(context());
    let buffer = TextBuffer::new(SOURCE);
    let id = buffer.id();
    ctx.attach(&buffer).expect("attach");
    let done = Arc::new(AtomicBool::new(false));
    let reads = Arc::new(AtomicUsize::new(0));

    let readers: Vec<_> = (0..READERS)
        .map(|n| {
            let ctx = ctx.clone();
            let done = done.clone();
            let reads = reads.clone();
            thread::spawn(move || {
                let frontend = java_frontend();
                while !done.load(Ordering::Acquire) {
                    ctx.read_action(|view| {
                        let text = view.committed_text(id).expect("text");
                        assert_eq!(view.tree_text(id).expect("tree"), *text);
                        let skeleton = view.skeleton(id).expect("skeleton");
                        assert_eq!(skeleton.root, frontend.build_skeleton(&text));
                        let offset = TextSize::from(((n * 37) % text.len()) as u32);
                        if let Some(node) = view.get_or_materialize(id, offset).expect("node") {
                            assert!(node.range().contains(offset));
                        }
                        if let Some(decl) = view.find_decl_at(id, offset).expect("decl") {
                            assert!(decl.range().contains(offset));
                        }
                    });
                    reads.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    let writer = {
        let ctx = ctx.clone();
        thread::spawn(move || {
            for round in 0..WRITES {
                ctx.write_action(|tx| {
                    let text = buffer.text();
                    if round % 3 == 0 {
                        let at = TextSize::from(text.rfind('}').expect("brace") as u32);
                        tx.edit(id, TextRange::empty(at), &format!("    int f{round};\n"))
                            .expect("edit");
                    } else {
                        let at = offset_of(&text, "work(times);");
                        tx.edit(id, TextRange::empty(at), "step();").expect("edit");
                    }
                    tx.commit(id).expect("commit");
                });
                thread::sleep(Duration::from_micros(200));
            }
        })
    };

    writer.join().expect("writer");
    done.store(true, Ordering::Release);
    for reader in readers {
        reader.join().expect("reader");
    }
    assert!(reads.load(Ordering::Relaxed) > 0);
    assert!(ctx.uncommitted().is_empty());
    let fields = ctx
        .skeleton(id)
        .expect("skeleton")
        .find_all(lathe_api::StubKind::Field)
        .len();
    assert_eq!(fields, 1 + WRITES.div_ceil(3));
}

#[test]
fn test_waiting_writer_asks_readers_to_yield() {
    let ctx = Arc::new(context());
    let buffer = TextBuffer::new(SOURCE);
    let id = buffer.id();
    ctx.attach(&buffer).expect("attach");
    let (entered_tx, entered_rx) = std::sync::mpsc::channel();

    let reader = {
        let ctx = ctx.clone();
        thread::spawn(move || {
            ctx.read_action(|view| {
                entered_tx.send(()).expect("signal");
                while !view.should_yield() {
                    thread::yield_now();
                }
            })
        })
    };
    entered_rx.recv().expect("reader entered");
    ctx.write_action(|tx| {
        tx.edit(id, TextRange::empty(0.into()), "// first\n").expect("edit");
        tx.commit(id).expect("commit");
    });
    reader.join().expect("reader");
    assert!(ctx.skeleton(id).is_ok());
}

fn buffers(ctx: &lathe_core::ModelContext, count: usize) -> (Vec<Arc<TextBuffer>>, Vec<BufferId>) {
    let buffers: Vec<_> = (0..count)
        .map(|i| TextBuffer::new(&format!("class C{i} {{ void m{i}() {{}} }}")))
        .collect();
    for buffer in &buffers {
        ctx.attach(buffer).expect("attach");
    }
    let ids = buffers.iter().map(|b| b.id()).collect();
    (buffers, ids)
}

#[test]
fn test_population_indexes_every_buffer() {
    let ctx = context();
    let (_buffers, ids) = buffers(&ctx, 100);
    let index = StubIndex::new();
    let indexed = index
        .populate(&ctx, &ids, &CancellationToken::new())
        .expect("populate");
    assert_eq!(indexed, 100);
    assert_eq!(index.buffer_count(), 100);
    assert_eq!(index.lookup("C42")[0].buffer, ids[42]);
    assert_eq!(index.lookup("m7").len(), 1);
}

#[test]
fn test_population_stops_when_cancelled() {
    let ctx = context();
    let (_buffers, ids) = buffers(&ctx, 50);
    let index = StubIndex::new();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = index.populate(&ctx, &ids, &cancel);
    assert!(matches!(result, Err(ModelError::Cancelled)));
    assert_eq!(index.buffer_count(), 0);
}

#[test]
fn test_population_skips_detached_buffers() {
    let ctx = context();
    let (_buffers, ids) = buffers(&ctx, 10);
    ctx.detach(ids[3]).expect("detach");
    let index = StubIndex::new();
    let indexed = index
        .populate(&ctx, &ids, &CancellationToken::new())
        .expect("populate");
    assert_eq!(indexed, 9);
    assert!(!index.contains(ids[3]));
}
