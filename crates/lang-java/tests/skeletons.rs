use lathe_api::{GreenElement, GreenNode, NodeIds, StubKind, SyntaxKind, TreeBuilder};
use lathe_java::parser::{parse_file, parse_span};
use lathe_java::stubs::{build_skeleton, derive_skeleton};
use rstest::rstest;
use std::sync::Arc;

fn names(stub: &lathe_api::StubNode, kind: StubKind) -> Vec<String> {
    stub.preorder()
        .filter(|s| s.kind == kind)
        .filter_map(|s| s.name().map(str::to_string))
        .collect()
}

fn count_kind(root: &Arc<GreenNode>, kind: SyntaxKind) -> usize {
    let mut count = 0;
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if node.kind() == kind {
            count += 1;
        }
        for child in node.children().unwrap_or(&[]) {
            if let GreenElement::Node(n) = child {
                stack.push(n.clone());
            }
        }
    }
    count
}

#[rstest]
#[case::plain("class A { int x; void m() {} }")]
#[case::leading_newline("\nclass A {}")]
#[case::leading_spaces("  class A { int x; }")]
#[case::leading_line_comment("// c\nclass A {}")]
#[case::leading_block_comment("/* c */ class A {}")]
#[case::license_header("/*\n * Copyright header.\n * Licensed under terms.\n */\n\npackage a;\n\nimport java.util.List;\n\nclass A { List<String> xs; }")]
#[case::javadoc_on_first_type("/** Docs. */\n@Deprecated\npublic class A { void m() {} }")]
#[case::comments_only("// nothing here\n/* still nothing */\n")]
#[case::package_and_imports("package a.b.c;\nimport java.util.List;\nimport static java.lang.Math.max;\nimport java.io.*;\nclass A {}")]
#[case::generics("public class Box<T extends Comparable<? super T>> implements Iterable<T> { java.util.Map<String, java.util.List<T>> items; <R> R map(java.util.function.Function<T, R> f) { return null; } }")]
#[case::enum_bodies("enum Op { PLUS { int apply(int a, int b) { return a + b; } }, MINUS; abstract int apply(int a, int b); }")]
#[case::annotation_type("@interface Tag { String value() default \"x\"; Class<?>[] types() default {}; }")]
#[case::interface_defaults("interface Shape { double area(); default String label() { return \"s\"; } static Shape unit() { return null; } }")]
#[case::constants("class K { static final long BIG = 1L << 40; static final int NEG = -1; static final String S = \"s\"; static final boolean ON = true; }")]
#[case::varargs_and_arrays("class V { void log(String fmt, Object... args) {} int[][] grid; String[] names() { return null; } }")]
#[case::anonymous_in_field("class F { Runnable r = new Runnable() { public void run() { class Local {} } }; int after; }")]
#[case::lambdas_in_bodies("class L { void m() { list.forEach(x -> { if (x) { return; } }); Runnable r = () -> {}; } int after; }")]
#[case::braces_in_strings("class S { String a = \"{\"; char c = '}'; void m() { String t = \"\"\"\n  { unbalanced\n\"\"\"; } // }\n /* { */ int z; }")]
#[case::broken_body("class B { void m() { int x = ; return return; ) } int y; }")]
#[case::nested_classes("class O { static class I { class J { void deep() {} } } private interface K {} }")]
#[case::initializers("class I { static { init(); } { instance(); } I() { this(1); } I(int a) {} }")]
#[case::throws_and_annotations("class T { @Override @SuppressWarnings(\"all\") public final synchronized void m(@Deprecated final int a) throws java.io.IOException, RuntimeException {} }")]
fn test_fast_scan_matches_derived_skeleton(#[case] text: &str) {
    let root = parse_file(text, &NodeIds::new());
    assert_eq!(root.text(), text);
    let fast = build_skeleton(text);
    let derived = derive_skeleton(&root);
    assert_eq!(fast, derived, "fast:\n{fast}\nderived:\n{derived}");
}

#[rstest]
#[case::missing_brace("class A { void m() { }", "A")]
#[case::garbage_header("class A extends { int x; }", "A")]
#[case::stray_tokens(") ) class A { } ;;", "A")]
fn test_broken_files_still_have_a_skeleton(#[case] text: &str, #[case] class: &str) {
    let skeleton = build_skeleton(text);
    assert_eq!(skeleton.kind, StubKind::File);
    assert_eq!(names(&skeleton, StubKind::Class), vec![class.to_string()]);
    let root = parse_file(text, &NodeIds::new());
    assert_eq!(root.text(), text);
    let derived = derive_skeleton(&root);
    assert_eq!(names(&derived, StubKind::Class), vec![class.to_string()]);
}

#[test]
fn test_twenty_thousand_operators_in_a_body() {
    let mut body = String::from("{ int x = a");
    for i in 0..20_000 {
        body.push_str(if i % 2 == 0 { " + b" } else { " * c" });
    }
    body.push_str("; }");
    let mut builder = TreeBuilder::new(NodeIds::new());
    parse_span(&body, SyntaxKind::CodeBlock, &mut builder);
    let children = builder.finish();
    let text: String = children
        .iter()
        .map(|e| match e {
            GreenElement::Node(n) => n.text(),
            GreenElement::Token(t) => t.text().to_string(),
        })
        .collect();
    assert_eq!(text, body);
}

#[test]
fn test_deeply_nested_blocks_stay_deferred() {
    let depth = 20_000;
    let mut text = String::from("class A { void m() ");
    text.push_str(&"{ ".repeat(depth));
    text.push_str(&"} ".repeat(depth));
    text.push('}');
    let root = parse_file(&text, &NodeIds::new());
    assert_eq!(root.text(), text);
    assert_eq!(count_kind(&root, SyntaxKind::CodeBlock), 1);
    assert_eq!(names(&build_skeleton(&text), StubKind::Method), vec!["m"]);
}
