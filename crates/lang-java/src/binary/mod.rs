//! Compiled-class support: reading, nesting, skeletons and mirror text.

pub mod converter;
pub mod mirror;
pub mod reader;
pub mod signature;
pub mod skeleton;
pub mod source;

pub use source::{DirectorySource, JarSource, MemorySource};

use lathe_api::{BinaryUnit, ClassDescriptor, FormatResult, StubNode};
use lathe_plugin::{BinaryFrontend, InnerClassSource};

const MAX_NESTED_DEPTH: usize = 32;

#[derive(Debug, Default, Clone, Copy)]
pub struct JavaBinaryFrontend;

impl JavaBinaryFrontend {
    pub fn new() -> Self {
        Self
    }

    fn attach_nested(
        &self,
        unit: &mut BinaryUnit,
        inners: &dyn InnerClassSource,
        depth: usize,
    ) -> FormatResult<()> {
        if depth >= MAX_NESTED_DEPTH {
            tracing::warn!("Nested classes of {} skipped: too deep", unit.class.name);
            return Ok(());
        }
        let outer = unit.class.name.clone();
        for candidate in inners.candidates(&outer)? {
            let is_nested_name = candidate
                .strip_prefix(outer.as_str())
                .and_then(|r| r.strip_prefix('$'))
                .is_some_and(|rest| !rest.is_empty());
            if !is_nested_name {
                continue;
            }
            let Some(bytes) = inners.load(&candidate)? else {
                continue;
            };
            let class = match self.read_class_like(&bytes) {
                Ok(class) => class,
                Err(e) => {
                    tracing::debug!("Skipping unreadable class {}: {}", candidate, e);
                    continue;
                }
            };
            // Grandchildren name their own outer class and are found through it.
            if !class.is_member_of(&outer) {
                tracing::debug!("Skipping {}: not a member of {}", candidate, outer);
                continue;
            }
            let mut nested = BinaryUnit::leaf(class);
            self.attach_nested(&mut nested, inners, depth + 1)?;
            unit.nested.push(nested);
        }
        Ok(())
    }
}

impl BinaryFrontend for JavaBinaryFrontend {
    fn read_class_like(&self, bytes: &[u8]) -> FormatResult<ClassDescriptor> {
        reader::read_class(bytes)
    }

    fn load_unit(&self, bytes: &[u8], inners: &dyn InnerClassSource) -> FormatResult<BinaryUnit> {
        let class = self.read_class_like(bytes)?;
        let mut unit = BinaryUnit::leaf(class);
        self.attach_nested(&mut unit, inners, 0)?;
        Ok(unit)
    }

    fn build_skeleton(&self, unit: &BinaryUnit) -> StubNode {
        skeleton::unit_skeleton(unit)
    }

    fn render_mirror(&self, skeleton: &StubNode) -> String {
        mirror::render_mirror(skeleton)
    }
}
