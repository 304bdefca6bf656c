//! Source-like views of compiled classes.

mod cache;

pub use cache::{CachedMirror, MirrorCache, MirrorCacheFile};

use crate::error::{ModelError, Result};
use crate::skeleton::{ModelNode, SkeletonIndex};
use crate::tree::{LazyTree, TreeNode};
use lathe_api::{Provenance, Skeleton, StubId, TextSize};
use lathe_plugin::{InnerClassSource, LanguageFrontend};
use std::sync::Arc;

/// Mirror text of one compiled unit with its tree and the binary skeleton
/// it was rendered from.
#[derive(Debug)]
pub struct Mirror {
    class_name: String,
    skeleton: Arc<Skeleton>,
    text: Arc<str>,
    tree: LazyTree,
    index: SkeletonIndex,
}

impl Mirror {
    /// Reads `bytes` and the nested classes `inners` proves belong to it,
    /// then renders the mirror. Unchanged input yields identical text.
    pub fn decompile(
        frontend: &Arc<dyn LanguageFrontend>,
        bytes: &[u8],
        inners: &dyn InnerClassSource,
        cache: Option<&MirrorCache>,
    ) -> Result<Self> {
        let Some(binary) = frontend.binary() else {
            return Err(ModelError::Unsupported(format!(
                "{} has no class-file reader",
                frontend.info().name
            )));
        };
        let unit = binary.load_unit(bytes, inners)?;
        let class_name = unit.class.name.clone();

        let key = match cache {
            Some(_) => Some(MirrorCache::key_of(&unit)?),
            None => None,
        };
        let cached = match (cache, key) {
            (Some(cache), Some(key)) => cache.get(key),
            _ => None,
        };
        let mirror = match cached {
            Some(hit) => hit,
            None => {
                let skeleton = Arc::new(Skeleton::binary(binary.build_skeleton(&unit)));
                let text: Arc<str> = Arc::from(binary.render_mirror(&skeleton.root));
                let fresh = Arc::new(CachedMirror {
                    class_name: class_name.clone(),
                    skeleton,
                    text,
                });
                if let (Some(cache), Some(key)) = (cache, key) {
                    cache.put(key, fresh.clone());
                }
                fresh
            }
        };

        let tree = LazyTree::parse(frontend.clone(), &mirror.text);
        let index = SkeletonIndex::new(&tree, Provenance::Binary);
        if index.skeleton().root != mirror.skeleton.root {
            tracing::warn!(
                "Mirror of {} does not read back to its binary skeleton",
                class_name
            );
        }
        Ok(Self {
            class_name,
            skeleton: mirror.skeleton.clone(),
            text: mirror.text.clone(),
            tree,
            index,
        })
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Skeleton read from the class file.
    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    pub fn text(&self) -> &Arc<str> {
        &self.text
    }

    pub fn tree(&self) -> &LazyTree {
        &self.tree
    }

    pub fn index(&self) -> &SkeletonIndex {
        &self.index
    }

    pub fn resolve(&self, stub: StubId) -> Option<TreeNode> {
        self.index.resolve(stub)
    }

    /// The declaration covering `offset`. Only ever a binary-origin node.
    pub fn find_node_at(&self, offset: TextSize) -> Option<ModelNode> {
        let (stub, node) = self.index.find_node_at(offset)?;
        let kind = self.index.kind(stub)?;
        Some(ModelNode::Binary {
            class: self.class_name.clone(),
            stub,
            kind,
            node,
        })
    }
}
