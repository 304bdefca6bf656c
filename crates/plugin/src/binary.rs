use lathe_api::{BinaryUnit, ClassDescriptor, FormatResult, StubNode};

/// Where the nested classes of a compiled unit can be looked up.
pub trait InnerClassSource: Send + Sync {
    /// Binary names of classes that might be nested in `outer`, judged by
    /// name alone.
    fn candidates(&self, outer: &str) -> FormatResult<Vec<String>>;

    /// Raw bytes of the class with binary name `name`.
    fn load(&self, name: &str) -> FormatResult<Option<Vec<u8>>>;
}

/// For classes read in isolation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInnerClasses;

impl InnerClassSource for NoInnerClasses {
    fn candidates(&self, _outer: &str) -> FormatResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn load(&self, _name: &str) -> FormatResult<Option<Vec<u8>>> {
        Ok(None)
    }
}

/// Reader and renderer for compiled classes.
pub trait BinaryFrontend: Send + Sync {
    /// Decodes one class. Malformed bytes are a `FormatError`.
    fn read_class_like(&self, bytes: &[u8]) -> FormatResult<ClassDescriptor>;

    /// Decodes a top-level class and every nested class that names it as
    /// its declaring class.
    fn load_unit(&self, bytes: &[u8], inners: &dyn InnerClassSource) -> FormatResult<BinaryUnit>;

    fn build_skeleton(&self, unit: &BinaryUnit) -> StubNode;

    /// Source-like text for a binary skeleton. Deterministic.
    fn render_mirror(&self, skeleton: &StubNode) -> String;
}
