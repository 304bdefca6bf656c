//! Skeleton read off a parsed tree. Walks declaration containers only, so
//! deferred bodies stay unparsed.

use super::{
    ClassHeader, MethodHeader, class_stub, enum_constant_stub, field_stub, file_stub,
    import_name, import_stub, is_constant_shape, method_stub, param_stub,
};
use crate::scan::render_tokens;
use lathe_api::{ClassFlavor, GreenElement, GreenNode, GreenToken, StubNode, SyntaxKind};

pub fn derive_skeleton(root: &GreenNode) -> StubNode {
    let mut package = None;
    let mut children = Vec::new();
    for node in child_nodes(root) {
        match node.kind() {
            SyntaxKind::PackageDecl => {
                if package.is_none() {
                    let name = render_tokens(
                        direct_tokens(node)
                            .filter(|t| matches!(t.kind(), SyntaxKind::Ident | SyntaxKind::Dot))
                            .map(|t| (t.kind(), t.text())),
                    );
                    package = Some(name);
                }
            }
            SyntaxKind::ImportDecl => children.push(import(node)),
            SyntaxKind::ClassDecl => children.push(class(node)),
            _ => {}
        }
    }
    let mut file = file_stub(package.as_deref());
    file.children = children;
    file
}

fn child_nodes(node: &GreenNode) -> impl Iterator<Item = &GreenNode> {
    node.children()
        .unwrap_or(&[])
        .iter()
        .filter_map(|e| e.as_node().map(|n| n.as_ref()))
}

fn direct_tokens(node: &GreenNode) -> impl Iterator<Item = &GreenToken> {
    node.children()
        .unwrap_or(&[])
        .iter()
        .filter_map(GreenElement::as_token)
        .filter(|t| !t.kind().is_trivia())
}

fn first_child(node: &GreenNode, kind: SyntaxKind) -> Option<&GreenNode> {
    child_nodes(node).find(|n| n.kind() == kind)
}

fn first_ident(node: &GreenNode) -> &str {
    direct_tokens(node)
        .find(|t| t.kind() == SyntaxKind::Ident)
        .map(GreenToken::text)
        .unwrap_or("")
}

fn node_text(node: &GreenNode) -> String {
    render_tokens(node.tokens().map(|t| (t.kind(), t.text())))
}

fn modifiers(owner: &GreenNode) -> (Vec<String>, Vec<String>) {
    let mut mods = Vec::new();
    let mut annotations = Vec::new();
    if let Some(list) = first_child(owner, SyntaxKind::ModifierList) {
        for element in list.children().unwrap_or(&[]) {
            match element {
                GreenElement::Node(n) if n.kind() == SyntaxKind::Annotation => {
                    annotations.push(node_text(n));
                }
                GreenElement::Token(t) if !t.kind().is_trivia() => {
                    mods.push(t.text().to_string());
                }
                _ => {}
            }
        }
    }
    (mods, annotations)
}

fn types_in(clause: Option<&GreenNode>) -> Vec<String> {
    clause
        .map(|c| {
            child_nodes(c)
                .filter(|n| n.kind() == SyntaxKind::TypeRef)
                .map(node_text)
                .collect()
        })
        .unwrap_or_default()
}

fn import(node: &GreenNode) -> StubNode {
    let mut is_static = false;
    let mut parts = Vec::new();
    for token in direct_tokens(node) {
        match token.kind() {
            SyntaxKind::Keyword if token.text() == "static" => is_static = true,
            SyntaxKind::Ident | SyntaxKind::Dot | SyntaxKind::Star => {
                parts.push((token.kind(), token.text()));
            }
            _ => {}
        }
    }
    let (name, on_demand) = import_name(parts);
    import_stub(&name, is_static, on_demand)
}

fn class(node: &GreenNode) -> StubNode {
    let (mods, annotations) = modifiers(node);
    let mut flavor = None;
    let mut saw_at = false;
    for token in direct_tokens(node) {
        match (token.kind(), token.text()) {
            (SyntaxKind::At, _) => saw_at = true,
            (SyntaxKind::Keyword, "interface") if saw_at => flavor = Some(ClassFlavor::Annotation),
            (SyntaxKind::Keyword, "class") => flavor = Some(ClassFlavor::Class),
            (SyntaxKind::Keyword, "interface") => flavor = Some(ClassFlavor::Interface),
            (SyntaxKind::Keyword, "enum") => flavor = Some(ClassFlavor::Enum),
            _ => {}
        }
        if flavor.is_some() {
            break;
        }
    }
    let header = ClassHeader {
        name: first_ident(node).to_string(),
        flavor,
        modifiers: mods,
        annotations,
        type_params: first_child(node, SyntaxKind::TypeParamList).map(node_text),
        extends: types_in(first_child(node, SyntaxKind::ExtendsClause)),
        implements: types_in(first_child(node, SyntaxKind::ImplementsClause)),
    };
    let mut stub = class_stub(header);
    let body = child_nodes(node)
        .find(|n| matches!(n.kind(), SyntaxKind::ClassBody | SyntaxKind::EnumBody));
    if let Some(body) = body {
        members(body, &mut stub);
    }
    stub
}

fn members(body: &GreenNode, stub: &mut StubNode) {
    for member in child_nodes(body) {
        match member.kind() {
            SyntaxKind::EnumConstant => stub.push(enum_constant_stub(first_ident(member))),
            SyntaxKind::FieldDecl => fields(member, stub),
            SyntaxKind::MethodDecl | SyntaxKind::ConstructorDecl => stub.push(method(member)),
            SyntaxKind::ClassDecl => stub.push(class(member)),
            _ => {}
        }
    }
}

fn fields(decl: &GreenNode, stub: &mut StubNode) {
    let (mods, annotations) = modifiers(decl);
    let base = first_child(decl, SyntaxKind::TypeRef)
        .map(node_text)
        .unwrap_or_default();
    for declarator in child_nodes(decl).filter(|n| n.kind() == SyntaxKind::VarDeclarator) {
        let mut name = "";
        let mut dims = 0;
        let mut after_eq = false;
        let mut init: Vec<(SyntaxKind, &str)> = Vec::new();
        for element in declarator.children().unwrap_or(&[]) {
            if after_eq {
                // Anything past two tokens cannot be a constant.
                match element {
                    GreenElement::Token(t) if !t.kind().is_trivia() => {
                        init.push((t.kind(), t.text()));
                    }
                    GreenElement::Token(_) => {}
                    GreenElement::Node(n) => {
                        for t in n.tokens().filter(|t| !t.kind().is_trivia()) {
                            init.push((t.kind(), t.text()));
                            if init.len() > 2 {
                                break;
                            }
                        }
                    }
                }
                if init.len() > 2 {
                    break;
                }
                continue;
            }
            match element {
                GreenElement::Token(t) => match t.kind() {
                    SyntaxKind::Ident if name.is_empty() => name = t.text(),
                    SyntaxKind::LBracket => dims += 1,
                    SyntaxKind::Eq => after_eq = true,
                    _ => {}
                },
                GreenElement::Node(_) => {}
            }
        }
        let constant = if after_eq && is_constant_shape(init.iter().copied()) {
            Some(render_tokens(init.iter().copied()))
        } else {
            None
        };
        stub.push(field_stub(
            name,
            &format!("{base}{}", "[]".repeat(dims)),
            mods.clone(),
            annotations.clone(),
            constant,
        ));
    }
}

fn method(decl: &GreenNode) -> StubNode {
    let (mods, annotations) = modifiers(decl);
    let returns = if decl.kind() == SyntaxKind::MethodDecl {
        Some(
            first_child(decl, SyntaxKind::TypeRef)
                .map(node_text)
                .unwrap_or_default(),
        )
    } else {
        None
    };
    let default = first_child(decl, SyntaxKind::DefaultValue).map(|d| {
        render_tokens(
            d.tokens()
                .skip_while(|t| t.kind().is_trivia())
                .skip(1)
                .map(|t| (t.kind(), t.text())),
        )
    });
    let header = MethodHeader {
        name: first_ident(decl).to_string(),
        modifiers: mods,
        annotations,
        type_params: first_child(decl, SyntaxKind::TypeParamList).map(node_text),
        returns,
        throws: types_in(first_child(decl, SyntaxKind::ThrowsClause)),
        default,
    };
    let mut stub = method_stub(header);
    if let Some(list) = first_child(decl, SyntaxKind::ParamList) {
        for param in child_nodes(list).filter(|n| n.kind() == SyntaxKind::Param) {
            stub.push(parameter(param));
        }
    }
    stub
}

fn parameter(param: &GreenNode) -> StubNode {
    let (mods, annotations) = modifiers(param);
    let mut type_name = first_child(param, SyntaxKind::TypeRef)
        .map(node_text)
        .unwrap_or_default();
    let mut dims = 0;
    for token in direct_tokens(param) {
        match token.kind() {
            SyntaxKind::Ellipsis => type_name.push_str("..."),
            SyntaxKind::LBracket => dims += 1,
            _ => {}
        }
    }
    for _ in 0..dims {
        type_name.push_str("[]");
    }
    param_stub(first_ident(param), &type_name, mods, annotations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_file;
    use crate::stubs::build_skeleton;
    use lathe_api::NodeIds;
    use lathe_api::models::attr;

    #[test]
    fn test_derive_does_not_expand_bodies() {
        let root = parse_file(
            "class A { void m() { class Local {} } Runnable r = new Runnable() { public void run() {} }; }",
            &NodeIds::new(),
        );
        let skeleton = derive_skeleton(&root);
        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            if node.is_deferred() {
                assert!(!node.is_parsed(), "{:?} was expanded", node.kind());
            }
            for child in node.children().unwrap_or(&[]) {
                if let GreenElement::Node(n) = child {
                    stack.push(n.clone());
                }
            }
        }
        let class = &skeleton.children[0];
        assert_eq!(class.children.len(), 2);
        assert_eq!(class.children[0].name(), Some("m"));
        assert_eq!(class.children[1].name(), Some("r"));
        assert!(class.children[1].attr(attr::CONSTANT).is_none());
    }

    #[test]
    fn test_matches_fast_scan_on_mixed_members() {
        let text = r#"
            package a.b;
            import static java.util.Collections.*;
            import java.util.Map;
            @Deprecated
            public abstract class Box<T extends Comparable<T>> extends Base<T> implements Runnable, java.io.Serializable {
                public static final int LIMIT = -42, OTHER = LIMIT + 1;
                private Map<String, java.util.List<T>> items[];
                protected Box(int size, String... names) throws IllegalStateException { super(size); }
                abstract <R> R map(java.util.function.Function<? super T, ? extends R> f);
                static { init(); }
                enum Color { RED, GREEN(1) { }, BLUE; Color() {} Color(int x) {} }
                @interface Marker { String value() default "x"; int[] ids() default {1, 2}; }
                interface Visitor<R> { R visit(Box<?> box); default void done() {} }
            }
        "#;
        let derived = derive_skeleton(&parse_file(text, &NodeIds::new()));
        let fast = build_skeleton(text);
        assert_eq!(derived, fast, "derived:\n{derived}\nfast:\n{fast}");
    }
}
