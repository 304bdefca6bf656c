//! Skeleton construction shared by the text scanner, the tree walker and
//! the class-file reader. All three go through the constructors here so the
//! attribute sets cannot drift apart.

mod derive;
mod fast;

pub use derive::derive_skeleton;
pub use fast::build_skeleton;

use lathe_api::models::attr;
use lathe_api::{AttrValue, ClassFlavor, StubKind, StubNode};
use smol_str::SmolStr;

fn list(items: Vec<String>) -> AttrValue {
    AttrValue::List(items.into_iter().map(SmolStr::from).collect())
}

fn text(value: &str) -> AttrValue {
    AttrValue::Str(SmolStr::new(value))
}

/// Header of a type declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassHeader {
    pub name: String,
    pub flavor: Option<ClassFlavor>,
    pub modifiers: Vec<String>,
    pub annotations: Vec<String>,
    pub type_params: Option<String>,
    pub extends: Vec<String>,
    pub implements: Vec<String>,
}

/// Header of a method or constructor. `returns` is `None` for constructors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodHeader {
    pub name: String,
    pub modifiers: Vec<String>,
    pub annotations: Vec<String>,
    pub type_params: Option<String>,
    pub returns: Option<String>,
    pub throws: Vec<String>,
    pub default: Option<String>,
}

pub fn file_stub(package: Option<&str>) -> StubNode {
    let mut node = StubNode::new(StubKind::File);
    if let Some(package) = package {
        node.set_attr(attr::PACKAGE, text(package));
    }
    node
}

pub fn import_stub(name: &str, is_static: bool, on_demand: bool) -> StubNode {
    StubNode::new(StubKind::Import)
        .with_attr(attr::NAME, text(name))
        .with_attr(attr::STATIC, AttrValue::Bool(is_static))
        .with_attr(attr::ON_DEMAND, AttrValue::Bool(on_demand))
}

pub fn class_stub(header: ClassHeader) -> StubNode {
    let flavor = header.flavor.unwrap_or(ClassFlavor::Class);
    let mut node = StubNode::new(StubKind::Class)
        .with_attr(attr::NAME, text(&header.name))
        .with_attr(attr::FLAVOR, text(flavor.as_str()))
        .with_attr(attr::MODIFIERS, list(header.modifiers))
        .with_attr(attr::ANNOTATIONS, list(header.annotations))
        .with_attr(attr::EXTENDS, list(header.extends))
        .with_attr(attr::IMPLEMENTS, list(header.implements));
    if let Some(type_params) = header.type_params {
        node.set_attr(attr::TYPE_PARAMS, text(&type_params));
    }
    node
}

pub fn field_stub(
    name: &str,
    type_name: &str,
    modifiers: Vec<String>,
    annotations: Vec<String>,
    constant: Option<String>,
) -> StubNode {
    let mut node = StubNode::new(StubKind::Field)
        .with_attr(attr::NAME, text(name))
        .with_attr(attr::TYPE, text(type_name))
        .with_attr(attr::MODIFIERS, list(modifiers))
        .with_attr(attr::ANNOTATIONS, list(annotations));
    if let Some(constant) = constant {
        node.set_attr(attr::CONSTANT, text(&constant));
    }
    node
}

pub fn method_stub(header: MethodHeader) -> StubNode {
    let kind = if header.returns.is_some() {
        StubKind::Method
    } else {
        StubKind::Constructor
    };
    let mut node = StubNode::new(kind)
        .with_attr(attr::NAME, text(&header.name))
        .with_attr(attr::MODIFIERS, list(header.modifiers))
        .with_attr(attr::ANNOTATIONS, list(header.annotations))
        .with_attr(attr::THROWS, list(header.throws));
    if let Some(returns) = header.returns {
        node.set_attr(attr::RETURNS, text(&returns));
    }
    if let Some(type_params) = header.type_params {
        node.set_attr(attr::TYPE_PARAMS, text(&type_params));
    }
    if let Some(default) = header.default {
        node.set_attr(attr::DEFAULT, text(&default));
    }
    node
}

pub fn param_stub(
    name: &str,
    type_name: &str,
    modifiers: Vec<String>,
    annotations: Vec<String>,
) -> StubNode {
    StubNode::new(StubKind::Parameter)
        .with_attr(attr::NAME, text(name))
        .with_attr(attr::TYPE, text(type_name))
        .with_attr(attr::MODIFIERS, list(modifiers))
        .with_attr(attr::ANNOTATIONS, list(annotations))
}

pub fn enum_constant_stub(name: &str) -> StubNode {
    StubNode::new(StubKind::EnumConstant).with_attr(attr::NAME, text(name))
}

/// Name and on-demand flag of an import from its name tokens, trailing
/// `.*` included.
pub(crate) fn import_name<'a, I>(tokens: I) -> (String, bool)
where
    I: IntoIterator<Item = (lathe_api::SyntaxKind, &'a str)>,
{
    use lathe_api::SyntaxKind;
    let mut parts: Vec<(SyntaxKind, &str)> = tokens.into_iter().collect();
    let on_demand = parts.last().is_some_and(|(kind, _)| *kind == SyntaxKind::Star);
    if on_demand {
        parts.pop();
        if parts.last().is_some_and(|(kind, _)| *kind == SyntaxKind::Dot) {
            parts.pop();
        }
    }
    (crate::scan::render_tokens(parts), on_demand)
}

/// A constant initializer is a single literal, optionally negated.
pub(crate) fn is_constant_shape<'a, I>(tokens: I) -> bool
where
    I: IntoIterator<Item = (lathe_api::SyntaxKind, &'a str)>,
{
    use lathe_api::SyntaxKind;
    let is_literal = |kind: SyntaxKind, text: &str| {
        (kind.is_literal() && kind != SyntaxKind::TextBlock)
            || (kind == SyntaxKind::Keyword && (text == "true" || text == "false"))
    };
    let mut iter = tokens.into_iter();
    match (iter.next(), iter.next(), iter.next()) {
        (Some((kind, text)), None, _) => is_literal(kind, text),
        (Some((SyntaxKind::Op, "-")), Some((kind, text)), None) => {
            is_literal(kind, text) && kind != SyntaxKind::Keyword
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lathe_api::SyntaxKind;

    #[test]
    fn test_constructor_has_no_return() {
        let ctor = method_stub(MethodHeader {
            name: "A".into(),
            ..Default::default()
        });
        assert_eq!(ctor.kind, StubKind::Constructor);
        assert!(ctor.attr(attr::RETURNS).is_none());
        assert!(ctor.list_attr(attr::THROWS).is_empty());
    }

    #[test]
    fn test_constant_shapes() {
        assert!(is_constant_shape([(SyntaxKind::IntLiteral, "1")]));
        assert!(is_constant_shape([(SyntaxKind::Op, "-"), (SyntaxKind::FloatLiteral, "1.5")]));
        assert!(is_constant_shape([(SyntaxKind::Keyword, "true")]));
        assert!(!is_constant_shape([(SyntaxKind::Keyword, "null")]));
        assert!(!is_constant_shape([(SyntaxKind::Ident, "X")]));
        assert!(!is_constant_shape([
            (SyntaxKind::IntLiteral, "1"),
            (SyntaxKind::Op, "+"),
            (SyntaxKind::IntLiteral, "2")
        ]));
    }
}
