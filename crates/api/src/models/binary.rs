//! Structural view of one compiled class, independent of the byte layout it
//! was decoded from.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ClassFlavor {
    Class,
    Interface,
    Enum,
    Annotation,
}

impl ClassFlavor {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassFlavor::Class => "class",
            ClassFlavor::Interface => "interface",
            ClassFlavor::Enum => "enum",
            ClassFlavor::Annotation => "annotation",
        }
    }

    /// Keyword that introduces the declaration in source form.
    pub fn keyword(self) -> &'static str {
        match self {
            ClassFlavor::Class => "class",
            ClassFlavor::Interface => "interface",
            ClassFlavor::Enum => "enum",
            ClassFlavor::Annotation => "@interface",
        }
    }
}

impl From<&str> for ClassFlavor {
    fn from(s: &str) -> Self {
        match s {
            "interface" => ClassFlavor::Interface,
            "enum" => ClassFlavor::Enum,
            "annotation" | "@interface" => ClassFlavor::Annotation,
            _ => ClassFlavor::Class,
        }
    }
}

/// One row of a class's inner-class table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InnerClassEntry {
    /// Binary name of the nested class, e.g. `p.Outer$Inner`.
    pub inner: String,
    /// Binary name of the declaring class; `None` for local and anonymous classes.
    pub outer: Option<String>,
    pub simple_name: Option<String>,
    pub modifiers: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub type_name: String,
    pub modifiers: Vec<String>,
    pub annotations: Vec<String>,
    /// Constant initializer rendered as a source literal.
    pub constant: Option<String>,
    pub enum_constant: bool,
    pub synthetic: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: String,
    pub type_params: Option<String>,
    pub return_type: String,
    pub params: Vec<String>,
    pub varargs: bool,
    pub throws: Vec<String>,
    pub modifiers: Vec<String>,
    pub annotations: Vec<String>,
    /// Synthetic or bridge method.
    pub synthetic: bool,
    /// Parameter list came from a generic signature rather than the raw descriptor.
    pub from_signature: bool,
}

impl MethodDescriptor {
    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    pub fn is_static_initializer(&self) -> bool {
        self.name == "<clinit>"
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
    /// Dotted binary name, e.g. `p.Outer$Inner`.
    pub name: String,
    pub flavor: ClassFlavor,
    pub modifiers: Vec<String>,
    pub annotations: Vec<String>,
    pub type_params: Option<String>,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldDescriptor>,
    pub methods: Vec<MethodDescriptor>,
    pub inner_classes: Vec<InnerClassEntry>,
}

impl ClassDescriptor {
    pub fn package(&self) -> Option<&str> {
        self.name.rfind('.').map(|idx| &self.name[..idx])
    }

    /// Name after the package, still carrying `$` separators.
    pub fn binary_simple_name(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) => &self.name[idx + 1..],
            None => &self.name,
        }
    }

    /// Source-level simple name, taken from the class's own inner-class row
    /// when it has one.
    pub fn simple_name(&self) -> &str {
        if let Some(simple) = self
            .own_inner_entry()
            .and_then(|entry| entry.simple_name.as_deref())
        {
            return simple;
        }
        let binary = self.binary_simple_name();
        match binary.rfind('$') {
            Some(idx) => &binary[idx + 1..],
            None => binary,
        }
    }

    /// The inner-class row describing this class itself.
    pub fn own_inner_entry(&self) -> Option<&InnerClassEntry> {
        self.inner_classes.iter().find(|e| e.inner == self.name)
    }

    /// Whether this class declares itself a member of `outer`.
    pub fn is_member_of(&self, outer: &str) -> bool {
        self.own_inner_entry()
            .and_then(|e| e.outer.as_deref())
            .is_some_and(|o| o == outer)
    }
}

/// A compiled class together with the nested classes verified to belong to it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BinaryUnit {
    pub class: ClassDescriptor,
    pub nested: Vec<BinaryUnit>,
}

impl BinaryUnit {
    pub fn leaf(class: ClassDescriptor) -> Self {
        Self {
            class,
            nested: Vec::new(),
        }
    }
}
