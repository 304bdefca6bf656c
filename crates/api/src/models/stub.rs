use super::buffer::Provenance;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// Declaration shapes a skeleton can hold.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StubKind {
    File,
    Import,
    Class,
    Field,
    Method,
    Constructor,
    Parameter,
    EnumConstant,
}

impl StubKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StubKind::File => "file",
            StubKind::Import => "import",
            StubKind::Class => "class",
            StubKind::Field => "field",
            StubKind::Method => "method",
            StubKind::Constructor => "constructor",
            StubKind::Parameter => "parameter",
            StubKind::EnumConstant => "enum_constant",
        }
    }
}

impl From<&str> for StubKind {
    fn from(s: &str) -> Self {
        match s {
            "import" => StubKind::Import,
            "class" => StubKind::Class,
            "field" => StubKind::Field,
            "method" => StubKind::Method,
            "constructor" => StubKind::Constructor,
            "parameter" => StubKind::Parameter,
            "enum_constant" => StubKind::EnumConstant,
            _ => StubKind::File,
        }
    }
}

impl fmt::Display for StubKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute keys shared by every skeleton producer.
pub mod attr {
    pub const NAME: &str = "name";
    pub const PACKAGE: &str = "package";
    pub const FLAVOR: &str = "flavor";
    pub const MODIFIERS: &str = "modifiers";
    pub const ANNOTATIONS: &str = "annotations";
    pub const TYPE_PARAMS: &str = "type_params";
    pub const EXTENDS: &str = "extends";
    pub const IMPLEMENTS: &str = "implements";
    pub const TYPE: &str = "type";
    pub const CONSTANT: &str = "constant";
    pub const RETURNS: &str = "returns";
    pub const THROWS: &str = "throws";
    pub const DEFAULT: &str = "default";
    pub const STATIC: &str = "static";
    pub const ON_DEMAND: &str = "on_demand";
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Str(SmolStr),
    List(Vec<SmolStr>),
    Bool(bool),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SmolStr]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Str(s) => write!(f, "{s:?}"),
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item:?}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// One declaration in a skeleton. Never carries offsets or bodies.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StubNode {
    pub kind: StubKind,
    pub attributes: IndexMap<SmolStr, AttrValue>,
    pub children: Vec<StubNode>,
}

impl StubNode {
    pub fn new(kind: StubKind) -> Self {
        Self {
            kind,
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: AttrValue) -> Self {
        self.attributes.insert(SmolStr::new(key), value);
        self
    }

    pub fn set_attr(&mut self, key: &str, value: AttrValue) {
        self.attributes.insert(SmolStr::new(key), value);
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    pub fn str_attr(&self, key: &str) -> Option<&str> {
        self.attr(key).and_then(AttrValue::as_str)
    }

    pub fn list_attr(&self, key: &str) -> &[SmolStr] {
        self.attr(key).and_then(AttrValue::as_list).unwrap_or(&[])
    }

    pub fn flag(&self, key: &str) -> bool {
        self.attr(key).and_then(AttrValue::as_bool).unwrap_or(false)
    }

    pub fn name(&self) -> Option<&str> {
        self.str_attr(attr::NAME)
    }

    pub fn push(&mut self, child: StubNode) {
        self.children.push(child);
    }

    /// Preorder walk without recursion.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder { stack: vec![self] }
    }

    pub fn count(&self) -> usize {
        self.preorder().count()
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{}", "", self.kind, indent = depth * 2)?;
        for (key, value) in &self.attributes {
            write!(f, " {key}={value}")?;
        }
        writeln!(f)?;
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for StubNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

pub struct Preorder<'a> {
    stack: Vec<&'a StubNode>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a StubNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Position of a stub in its skeleton's preorder.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StubId(pub u32);

impl StubId {
    pub const ROOT: StubId = StubId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Immutable declaration summary of one compilation unit.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Skeleton {
    pub provenance: Provenance,
    pub root: StubNode,
}

impl Skeleton {
    pub fn new(provenance: Provenance, root: StubNode) -> Self {
        Self { provenance, root }
    }

    pub fn source(root: StubNode) -> Self {
        Self::new(Provenance::Source, root)
    }

    pub fn binary(root: StubNode) -> Self {
        Self::new(Provenance::Binary, root)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StubId, &StubNode)> {
        self.root
            .preorder()
            .enumerate()
            .map(|(i, node)| (StubId(i as u32), node))
    }

    pub fn get(&self, id: StubId) -> Option<&StubNode> {
        self.root.preorder().nth(id.index())
    }

    pub fn len(&self) -> usize {
        self.root.count()
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Stubs of `kind`, in preorder.
    pub fn find_all(&self, kind: StubKind) -> Vec<(StubId, &StubNode)> {
        self.iter().filter(|(_, node)| node.kind == kind).collect()
    }
}

impl fmt::Display for Skeleton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# provenance: {}", self.provenance)?;
        write!(f, "{}", self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Skeleton {
        let mut class = StubNode::new(StubKind::Class)
            .with_attr(attr::NAME, AttrValue::Str("C".into()));
        class.push(StubNode::new(StubKind::Field).with_attr(attr::NAME, AttrValue::Str("x".into())));
        class.push(StubNode::new(StubKind::Method).with_attr(attr::NAME, AttrValue::Str("m".into())));
        let mut file = StubNode::new(StubKind::File);
        file.push(class);
        Skeleton::source(file)
    }

    #[test]
    fn test_preorder_ids() {
        let skeleton = sample();
        let names: Vec<_> = skeleton
            .iter()
            .map(|(id, node)| (id.0, node.name().unwrap_or("-").to_string()))
            .collect();
        assert_eq!(
            names,
            vec![
                (0, "-".to_string()),
                (1, "C".to_string()),
                (2, "x".to_string()),
                (3, "m".to_string())
            ]
        );
        assert_eq!(skeleton.get(StubId(2)).and_then(|n| n.name()), Some("x"));
        assert!(skeleton.get(StubId(4)).is_none());
    }

    #[test]
    fn test_attribute_order_does_not_affect_equality() {
        let a = StubNode::new(StubKind::Field)
            .with_attr(attr::NAME, AttrValue::Str("x".into()))
            .with_attr(attr::TYPE, AttrValue::Str("int".into()));
        let b = StubNode::new(StubKind::Field)
            .with_attr(attr::TYPE, AttrValue::Str("int".into()))
            .with_attr(attr::NAME, AttrValue::Str("x".into()));
        assert_eq!(a, b);
    }

    #[test]
    fn test_display_is_indented() {
        let text = sample().to_string();
        assert!(text.contains("\n  class name=\"C\""));
        assert!(text.contains("\n    field name=\"x\""));
    }
}
