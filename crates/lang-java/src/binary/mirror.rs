//! Decompiled-looking text for binary skeletons. Output depends only on the
//! skeleton, so the same class always renders byte-identically.

use lathe_api::models::attr;
use lathe_api::{ClassFlavor, StubKind, StubNode};
use std::fmt::Write;

const INDENT: &str = "    ";

pub fn render_mirror(skeleton: &StubNode) -> String {
    let mut out = String::new();
    if let Some(package) = skeleton.str_attr(attr::PACKAGE) {
        let _ = writeln!(out, "package {package};");
        out.push('\n');
    }
    let mut first = true;
    for child in &skeleton.children {
        match child.kind {
            StubKind::Import => {
                let _ = writeln!(out, "{}", import_line(child));
            }
            StubKind::Class => {
                if !first {
                    out.push('\n');
                }
                class(&mut out, child, 0);
                first = false;
            }
            _ => {}
        }
    }
    out
}

fn import_line(stub: &StubNode) -> String {
    let mut line = String::from("import ");
    if stub.flag(attr::STATIC) {
        line.push_str("static ");
    }
    line.push_str(stub.name().unwrap_or_default());
    if stub.flag(attr::ON_DEMAND) {
        line.push_str(".*");
    }
    line.push(';');
    line
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

/// Annotations on their own lines, then `modifiers ` as a prefix.
fn prelude(out: &mut String, stub: &StubNode, depth: usize) {
    for annotation in stub.list_attr(attr::ANNOTATIONS) {
        indent(out, depth);
        out.push_str(annotation);
        out.push('\n');
    }
    indent(out, depth);
    for modifier in stub.list_attr(attr::MODIFIERS) {
        out.push_str(modifier);
        out.push(' ');
    }
}

fn class(out: &mut String, stub: &StubNode, depth: usize) {
    let flavor = ClassFlavor::from(stub.str_attr(attr::FLAVOR).unwrap_or("class"));
    prelude(out, stub, depth);
    out.push_str(flavor.keyword());
    out.push(' ');
    out.push_str(stub.name().unwrap_or_default());
    if let Some(type_params) = stub.str_attr(attr::TYPE_PARAMS) {
        out.push_str(type_params);
    }
    let extends = stub.list_attr(attr::EXTENDS);
    if !extends.is_empty() {
        let _ = write!(out, " extends {}", extends.join(", "));
    }
    let implements = stub.list_attr(attr::IMPLEMENTS);
    if !implements.is_empty() {
        let _ = write!(out, " implements {}", implements.join(", "));
    }
    out.push_str(" {\n");

    let constants: Vec<&str> = stub
        .children
        .iter()
        .filter(|c| c.kind == StubKind::EnumConstant)
        .filter_map(StubNode::name)
        .collect();
    let in_interface = matches!(flavor, ClassFlavor::Interface | ClassFlavor::Annotation);
    let mut sections = 0;
    if !constants.is_empty() || flavor == ClassFlavor::Enum {
        indent(out, depth + 1);
        out.push_str(&constants.join(", "));
        out.push_str(";\n");
        sections += 1;
    }
    for member in stub.children.iter().filter(|c| c.kind != StubKind::EnumConstant) {
        if sections > 0 {
            out.push('\n');
        }
        sections += 1;
        match member.kind {
            StubKind::Field => field(out, member, depth + 1),
            StubKind::Method | StubKind::Constructor => {
                method(out, member, depth + 1, in_interface)
            }
            StubKind::Class => class(out, member, depth + 1),
            _ => sections -= 1,
        }
    }
    indent(out, depth);
    out.push_str("}\n");
}

fn field(out: &mut String, stub: &StubNode, depth: usize) {
    prelude(out, stub, depth);
    let _ = write!(
        out,
        "{} {}",
        stub.str_attr(attr::TYPE).unwrap_or_default(),
        stub.name().unwrap_or_default()
    );
    if let Some(constant) = stub.str_attr(attr::CONSTANT) {
        let _ = write!(out, " = {constant}");
    }
    out.push_str(";\n");
}

fn method(out: &mut String, stub: &StubNode, depth: usize, in_interface: bool) {
    prelude(out, stub, depth);
    if let Some(type_params) = stub.str_attr(attr::TYPE_PARAMS) {
        out.push_str(type_params);
        out.push(' ');
    }
    if let Some(returns) = stub.str_attr(attr::RETURNS) {
        out.push_str(returns);
        out.push(' ');
    }
    out.push_str(stub.name().unwrap_or_default());
    out.push('(');
    for (i, param) in stub
        .children
        .iter()
        .filter(|c| c.kind == StubKind::Parameter)
        .enumerate()
    {
        if i > 0 {
            out.push_str(", ");
        }
        for annotation in param.list_attr(attr::ANNOTATIONS) {
            out.push_str(annotation);
            out.push(' ');
        }
        let _ = write!(
            out,
            "{} {}",
            param.str_attr(attr::TYPE).unwrap_or_default(),
            param.name().unwrap_or_default()
        );
    }
    out.push(')');
    let throws = stub.list_attr(attr::THROWS);
    if !throws.is_empty() {
        let _ = write!(out, " throws {}", throws.join(", "));
    }
    if let Some(default) = stub.str_attr(attr::DEFAULT) {
        let _ = write!(out, " default {default}");
    }
    // Interface methods with no body-bearing modifier are abstract.
    let modifiers = stub.list_attr(attr::MODIFIERS);
    let bodyless = modifiers.iter().any(|m| m == "abstract" || m == "native")
        || (in_interface
            && stub.kind == StubKind::Method
            && !modifiers
                .iter()
                .any(|m| m == "default" || m == "static" || m == "private"));
    if bodyless {
        out.push_str(";\n");
    } else {
        out.push_str(" { /* compiled code */ }\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stubs::build_skeleton;

    #[test]
    fn test_renders_members() {
        let skeleton = build_skeleton(
            "package p; public class A<T> extends B implements C, D { \
             public static final int X = 1; protected A(int a) {} \
             public abstract <R> R map(T t) throws java.io.IOException; \
             enum E { ONE, TWO } }",
        );
        let text = render_mirror(&skeleton);
        let expected = "package p;\n\
\n\
public class A<T> extends B implements C, D {\n\
\x20   public static final int X = 1;\n\
\n\
\x20   protected A(int a) { /* compiled code */ }\n\
\n\
\x20   public abstract <R> R map(T t) throws java.io.IOException;\n\
\n\
\x20   enum E {\n\
\x20       ONE, TWO;\n\
\x20   }\n\
}\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let skeleton = build_skeleton("class A { int x; void m() {} }");
        assert_eq!(render_mirror(&skeleton), render_mirror(&skeleton.clone()));
    }
}
