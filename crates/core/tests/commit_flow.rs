mod common;

use common::{SOURCE, class_end, context, offset_of, range_of};
use lathe_api::{StubKind, TextRange};
use lathe_core::{CommitState, ModelError, ModelNode, StubIndex, TextBuffer};
use lathe_java::java_frontend;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn method_names(ctx: &lathe_core::ModelContext, buffer: &TextBuffer) -> Vec<String> {
    let skeleton = ctx.skeleton(buffer.id()).expect("skeleton");
    skeleton
        .find_all(StubKind::Method)
        .into_iter()
        .filter_map(|(_, s)| s.name().map(str::to_string))
        .collect()
}

#[test]
fn test_body_edit_keeps_structure_and_identity() {
    let ctx = context();
    let buffer = TextBuffer::new(SOURCE);
    let id = buffer.id();
    ctx.attach(&buffer).expect("attach");

    // Build the tree down to the nested block so the commit goes incremental.
    let leaf = ctx
        .get_or_materialize(id, offset_of(SOURCE, "work"))
        .expect("read")
        .expect("node");
    assert!(leaf.range().contains(offset_of(SOURCE, "work")));
    let before_first = ctx.find_decl_at(id, offset_of(SOURCE, "first")).expect("read").expect("decl");
    let before_second = ctx.find_decl_at(id, offset_of(SOURCE, "second")).expect("read").expect("decl");
    let structural = ctx.structural_modification_stamp();
    let any = ctx.any_modification_stamp();
    let skeleton = ctx.skeleton(id).expect("skeleton");

    ctx.edit(id, range_of(SOURCE, "work"), "rest").expect("edit");
    assert_eq!(ctx.commit_state(id).expect("state"), CommitState::Uncommitted);
    assert_eq!(ctx.uncommitted(), vec![id]);
    ctx.read_action(|view| {
        assert_eq!(&*view.committed_text(id).expect("text"), SOURCE);
    });

    let report = ctx.commit(id).expect("commit");
    assert!(report.text_changed);
    assert!(!report.structural_changed);
    assert!(report.skeleton_reused);
    assert_eq!(ctx.commit_state(id).expect("state"), CommitState::Committed);
    assert_eq!(ctx.structural_modification_stamp(), structural);
    assert_eq!(ctx.any_modification_stamp(), any + 1);
    assert!(Arc::ptr_eq(&ctx.skeleton(id).expect("skeleton"), &skeleton));

    let text = buffer.text();
    let after_first = ctx.find_decl_at(id, offset_of(&text, "first")).expect("read").expect("decl");
    let after_second = ctx.find_decl_at(id, offset_of(&text, "second")).expect("read").expect("decl");
    // The edited method is rebuilt under its old id; its sibling is untouched.
    assert_eq!(after_first.node().id(), before_first.node().id());
    assert!(after_second.node().same_node(before_second.node()));
    ctx.read_action(|view| {
        assert_eq!(view.tree_text(id).expect("tree"), *text);
        view.with_tree(id, |tree| assert!(tree.verify().is_ok())).expect("tree");
    });
}

#[test]
fn test_member_insert_is_structural() {
    let ctx = context();
    let buffer = TextBuffer::new(SOURCE);
    let id = buffer.id();
    ctx.attach(&buffer).expect("attach");
    ctx.read_action(|view| view.tree_text(id)).expect("tree");
    let structural = ctx.structural_modification_stamp();
    let any = ctx.any_modification_stamp();

    ctx.edit(id, TextRange::empty(class_end(SOURCE)), "\n    void third() {}\n")
        .expect("edit");
    let report = ctx.commit(id).expect("commit");
    assert!(report.structural_changed);
    assert!(!report.skeleton_reused);
    assert_eq!(ctx.structural_modification_stamp(), structural + 1);
    assert_eq!(ctx.any_modification_stamp(), any + 1);
    assert_eq!(method_names(&ctx, &buffer), vec!["first", "second", "third"]);

    let text = buffer.text();
    let decl = ctx.find_decl_at(id, offset_of(&text, "third")).expect("read").expect("decl");
    assert!(matches!(decl, ModelNode::Source { kind: StubKind::Method, .. }));
    assert_eq!(ctx.skeleton(id).expect("skeleton").root, java_frontend().build_skeleton(&text));
}

#[test]
fn test_leading_header_keeps_declarations_visible() {
    let header = format!("// license header\n/* more terms */\n{SOURCE}");
    let ctx = context();
    let buffer = TextBuffer::new(&header);
    let id = buffer.id();
    ctx.attach(&buffer).expect("attach");
    let decl = ctx.find_decl_at(id, offset_of(&header, "class")).expect("read").expect("decl");
    assert!(matches!(decl, ModelNode::Source { kind: StubKind::Class, .. }));

    assert!(ctx.read_action(|view| view.with_tree(id, |tree| tree.verify().is_ok())).expect("tree"));
    ctx.edit(id, TextRange::empty(class_end(&header)), "    int x;\n")
        .expect("edit");
    let report = ctx.commit(id).expect("commit");
    assert!(report.structural_changed);
    assert!(report.reparses > 0);

    let text = buffer.text();
    let skeleton = ctx.skeleton(id).expect("skeleton");
    assert_eq!(skeleton.root, java_frontend().build_skeleton(&text));
    assert_eq!(skeleton.find_all(StubKind::Class).len(), 1);
    assert_eq!(method_names(&ctx, &buffer), vec!["first", "second"]);
    let decl = ctx.find_decl_at(id, offset_of(&text, "int x")).expect("read").expect("decl");
    assert!(matches!(decl, ModelNode::Source { kind: StubKind::Field, .. }));
}

#[test]
fn test_commit_without_a_tree_uses_the_fast_scan() {
    let ctx = context();
    let buffer = TextBuffer::new(SOURCE);
    let id = buffer.id();
    ctx.attach(&buffer).expect("attach");
    let structural = ctx.structural_modification_stamp();

    ctx.edit(id, range_of(SOURCE, "second"), "latter").expect("edit");
    let report = ctx.commit(id).expect("commit");
    assert_eq!(report.reparses, 0);
    assert!(report.structural_changed);
    assert_eq!(ctx.structural_modification_stamp(), structural + 1);
    assert_eq!(method_names(&ctx, &buffer), vec!["first", "latter"]);
}

#[test]
fn test_several_edits_commit_together() {
    let ctx = context();
    let buffer = TextBuffer::new(SOURCE);
    let id = buffer.id();
    ctx.attach(&buffer).expect("attach");
    ctx.get_or_materialize(id, offset_of(SOURCE, "count;\n    }")).expect("read");

    buffer.replace(range_of(SOURCE, "work"), "run").expect("edit");
    let text = buffer.text();
    buffer.replace(range_of(&text, "return count"), "return count + 1").expect("edit");
    let text = buffer.text();
    buffer.insert(offset_of(&text, "private"), "static final int LIMIT = 3;\n    ").expect("edit");

    let report = ctx.commit(id).expect("commit");
    assert_eq!(report.reparses, 3);
    assert!(report.structural_changed);
    ctx.read_action(|view| {
        assert_eq!(view.tree_text(id).expect("tree"), *buffer.text());
    });
    let skeleton = ctx.skeleton(id).expect("skeleton");
    let fields: Vec<_> = skeleton
        .find_all(StubKind::Field)
        .into_iter()
        .filter_map(|(_, s)| s.name().map(str::to_string))
        .collect();
    assert_eq!(fields, vec!["LIMIT", "count"]);
}

#[test]
fn test_nothing_to_commit() {
    let ctx = context();
    let buffer = TextBuffer::new(SOURCE);
    ctx.attach(&buffer).expect("attach");
    let any = ctx.any_modification_stamp();
    let report = ctx.commit(buffer.id()).expect("commit");
    assert!(!report.text_changed && !report.structural_changed);
    assert_eq!(ctx.any_modification_stamp(), any);

    // An edit undone before the commit changes nothing either.
    buffer.replace(range_of(SOURCE, "count;"), "total;").expect("edit");
    buffer.replace(range_of(&buffer.text(), "total;"), "count;").expect("edit");
    let report = ctx.commit(buffer.id()).expect("commit");
    assert!(!report.text_changed);
    assert_eq!(ctx.any_modification_stamp(), any);
    assert_eq!(ctx.commit_state(buffer.id()).expect("state"), CommitState::Committed);
}

#[test]
fn test_detach_and_reattach_starts_fresh() {
    let ctx = context();
    let buffer = TextBuffer::new(SOURCE);
    let id = buffer.id();
    ctx.attach(&buffer).expect("attach");
    assert_eq!(buffer.listener_count(), 1);

    buffer.insert(class_end(SOURCE), "void gone() {}\n").expect("edit");
    assert_eq!(ctx.uncommitted(), vec![id]);
    ctx.detach(id).expect("detach");
    assert!(ctx.uncommitted().is_empty());
    assert_eq!(buffer.listener_count(), 0);
    assert!(matches!(ctx.commit(id), Err(ModelError::Detached(d)) if d == id));
    assert!(matches!(ctx.skeleton(id), Err(ModelError::Detached(_))));

    buffer.set_text("class Fresh { void only() {} }").expect("edit");
    ctx.attach(&buffer).expect("reattach");
    assert_eq!(ctx.commit_state(id).expect("state"), CommitState::Committed);
    assert_eq!(method_names(&ctx, &buffer), vec!["only"]);
    ctx.read_action(|view| {
        assert_eq!(&*view.committed_text(id).expect("text"), "class Fresh { void only() {} }");
    });

    let other = TextBuffer::new("class X {}");
    assert!(matches!(ctx.commit(other.id()), Err(ModelError::UnknownBuffer(_))));
}

#[test]
fn test_actions_wait_for_all_buffers() {
    let ctx = context();
    let a = TextBuffer::new(SOURCE);
    let b = TextBuffer::new("class B {}");
    ctx.attach(&a).expect("attach");
    ctx.attach(&b).expect("attach");
    a.insert(class_end(SOURCE), "int extra;\n").expect("edit");
    b.insert(9.into(), " int y; ").expect("edit");

    let plain = Arc::new(AtomicUsize::new(0));
    for _ in 0..2 {
        let plain = plain.clone();
        ctx.perform_when_all_committed(move || {
            plain.fetch_add(1, Ordering::SeqCst);
        });
    }
    let tagged = Arc::new(parking_lot::Mutex::new(Vec::new()));
    for label in ["stale", "latest"] {
        let tagged = tagged.clone();
        ctx.cancel_and_run_when_all_committed("refresh", move || tagged.lock().push(label));
    }
    assert_eq!(ctx.pending_actions(), 3);

    ctx.commit(a.id()).expect("commit");
    assert_eq!(plain.load(Ordering::SeqCst), 0);
    ctx.commit(b.id()).expect("commit");
    assert_eq!(plain.load(Ordering::SeqCst), 2);
    assert_eq!(*tagged.lock(), vec!["latest"]);
    assert_eq!(ctx.pending_actions(), 0);
}

#[test]
fn test_actions_run_after_the_write_action() {
    let ctx = context();
    let buffer = TextBuffer::new(SOURCE);
    let id = buffer.id();
    ctx.attach(&buffer).expect("attach");
    let ran = Arc::new(AtomicUsize::new(0));
    ctx.write_action(|tx| {
        tx.edit(id, range_of(SOURCE, "work"), "rest").expect("edit");
        let counter = ran.clone();
        tx.read().context().perform_when_all_committed(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        tx.commit(id).expect("commit");
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    });
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn test_contexts_sharing_a_buffer_are_independent() {
    let left = context();
    let right = context();
    let buffer = TextBuffer::new(SOURCE);
    let id = buffer.id();
    left.attach(&buffer).expect("attach");
    right.attach(&buffer).expect("attach");
    assert_eq!(buffer.listener_count(), 2);

    buffer.insert(class_end(SOURCE), "void added() {}\n").expect("edit");
    assert_eq!(left.commit_state(id).expect("state"), CommitState::Uncommitted);
    assert_eq!(right.commit_state(id).expect("state"), CommitState::Uncommitted);

    let right_structural = right.structural_modification_stamp();
    left.commit(id).expect("commit");
    assert_eq!(left.commit_state(id).expect("state"), CommitState::Committed);
    assert_eq!(right.commit_state(id).expect("state"), CommitState::Uncommitted);
    assert_eq!(right.structural_modification_stamp(), right_structural);
    assert_eq!(method_names(&left, &buffer), vec!["first", "second", "added"]);
    assert_eq!(method_names(&right, &buffer), vec!["first", "second"]);

    right.detach(id).expect("detach");
    assert_eq!(buffer.listener_count(), 1);
    buffer.insert(0.into(), "// header\n").expect("edit");
    assert_eq!(left.commit_state(id).expect("state"), CommitState::Uncommitted);
}

#[test]
fn test_sink_follows_structural_changes() {
    let index = Arc::new(StubIndex::new());
    let ctx = lathe_core::ModelContext::builder()
        .frontend(java_frontend())
        .sink(index.clone())
        .build()
        .expect("context");
    let buffer = TextBuffer::new(SOURCE);
    let id = buffer.id();
    ctx.attach(&buffer).expect("attach");
    assert_eq!(index.lookup("Service").len(), 1);
    assert_eq!(index.lookup("second")[0].kind, StubKind::Method);

    ctx.edit(id, range_of(SOURCE, "second"), "other").expect("edit");
    ctx.commit(id).expect("commit");
    assert!(index.lookup("second").is_empty());
    assert_eq!(index.lookup("other")[0].buffer, id);

    ctx.detach(id).expect("detach");
    assert!(index.lookup("Service").is_empty());
}
