mod common;

use lathe_api::{StubKind, TextSize};
use lathe_core::{ModelConfig, ModelContext, ModelError};
use lathe_java::binary::MemorySource;
use lathe_java::fixtures::{ACC_ABSTRACT, ACC_INTERFACE, ACC_PUBLIC, ACC_STATIC, ACC_SUPER, ClassFileWriter};
use lathe_java::java_frontend;
use lathe_plugin::NoInnerClasses;
use std::sync::Arc;

fn outer() -> Vec<u8> {
    ClassFileWriter::new("lib/Outer", ACC_PUBLIC | ACC_SUPER)
        .inner_class("lib/Outer$Node", Some("lib/Outer"), Some("Node"), ACC_PUBLIC | ACC_STATIC)
        .field(ACC_PUBLIC | ACC_STATIC, "size", "I", &[])
        .method(ACC_PUBLIC, "<init>", "()V", &[])
        .method(ACC_PUBLIC, "lookup", "(Ljava/lang/String;[I)Ljava/util/List;", &[])
        .finish()
}

fn inners() -> MemorySource {
    let mut source = MemorySource::new();
    source.insert(
        "lib.Outer$Node",
        ClassFileWriter::new("lib/Outer$Node", ACC_PUBLIC | ACC_SUPER)
            .inner_class("lib/Outer$Node", Some("lib/Outer"), Some("Node"), ACC_PUBLIC | ACC_STATIC)
            .method(ACC_PUBLIC, "<init>", "()V", &[])
            .finish(),
    );
    source.insert(
        "lib.Outer$Impostor",
        ClassFileWriter::new("lib/Outer$Impostor", ACC_PUBLIC | ACC_SUPER)
            .inner_class("lib/Outer$Impostor", Some("lib/Elsewhere"), Some("Impostor"), ACC_PUBLIC)
            .finish(),
    );
    source
}

#[test]
fn test_mirror_is_deterministic_and_filtered() {
    let ctx = common::context();
    let first = ctx.decompile(&outer(), &inners()).expect("decompile");
    let second = ctx.decompile(&outer(), &inners()).expect("decompile");
    assert!(Arc::ptr_eq(first.text(), second.text()));
    assert_eq!(ctx.mirror_cache().len(), 1);

    let fresh = common::context().decompile(&outer(), &inners()).expect("decompile");
    assert_eq!(fresh.text(), first.text());

    let classes: Vec<_> = first
        .skeleton()
        .find_all(StubKind::Class)
        .into_iter()
        .filter_map(|(_, s)| s.name())
        .collect();
    assert_eq!(classes, vec!["Outer", "Node"]);
    assert!(!first.text().contains("Impostor"));
    assert!(first.text().contains("public java.util.List lookup(java.lang.String arg0, int[] arg1)"));
    assert_eq!(first.class_name(), "lib.Outer");
}

#[test]
fn test_mirror_nodes_cover_declarations_only() {
    let ctx = common::context();
    let mirror = ctx.decompile(&outer(), &inners()).expect("decompile");
    let text = mirror.text().clone();
    for offset in 0..text.len() as u32 {
        let Some(node) = mirror.find_node_at(offset.into()) else {
            continue;
        };
        assert!(node.is_binary());
        assert!(node.range().contains(offset.into()));
        let resolved = mirror.resolve(node.stub()).expect("resolves");
        assert!(resolved.same_node(node.node()));
    }
    let at = TextSize::from(text.find("lookup").expect("method") as u32);
    let method = mirror.find_node_at(at).expect("method");
    assert_eq!(method.kind(), StubKind::Method);
    // Declarations resolve without parsing placeholder bodies.
    assert_eq!(mirror.tree().parsed_deferred_count(), 0);
}

#[test]
fn test_persistent_cache_is_shared_across_contexts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let build = || {
        ModelContext::builder()
            .config(ModelConfig::default().mirror_cache_dir(dir.path()))
            .frontend(java_frontend())
            .build()
            .expect("context")
    };
    let text = build().decompile(&outer(), &NoInnerClasses).expect("decompile").text().clone();

    let later = build();
    assert!(later.mirror_cache().is_empty());
    let summaries = later.mirror_cache().scan();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].class_name, "lib.Outer");
    let mirror = later.decompile(&outer(), &NoInnerClasses).expect("decompile");
    assert_eq!(*mirror.text(), text);
    assert_eq!(later.mirror_cache().len(), 1);

    later.mirror_cache().clear().expect("clear");
    assert!(later.mirror_cache().scan().is_empty());
}

#[test]
fn test_abstract_members_have_no_body() {
    let bytes = ClassFileWriter::new("lib/Api", ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
        .method(ACC_PUBLIC | ACC_ABSTRACT, "call", "()V", &[])
        .finish();
    let mirror = common::context().decompile(&bytes, &NoInnerClasses).expect("decompile");
    assert!(mirror.text().contains("void call();"));
    assert!(!mirror.text().contains("compiled code"));
}

#[test]
fn test_malformed_class_is_reported() {
    let err = common::context()
        .decompile(&[0xca, 0xfe, 0xba, 0xbe, 0, 0], &NoInnerClasses)
        .expect_err("truncated");
    assert!(matches!(err, ModelError::Format(_)));
}
