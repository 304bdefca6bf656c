use anyhow::Context;
use lathe_core::{Mirror, ModelContext};
use lathe_java::binary::{DirectorySource, JarSource};
use lathe_plugin::InnerClassSource;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Decompiles `class_file`, looking nested classes up in `classpath` or,
/// without one, in the output root the file was compiled into.
pub fn run(ctx: &ModelContext, class_file: &Path, classpath: Option<&Path>) -> anyhow::Result<Arc<Mirror>> {
    let bytes = std::fs::read(class_file)
        .with_context(|| format!("cannot read {}", class_file.display()))?;
    let source: Box<dyn InnerClassSource> = match classpath {
        Some(path) if is_jar(path) => Box::new(JarSource::open(path)?),
        Some(path) => Box::new(DirectorySource::new(path)),
        None => {
            let binary = ctx
                .frontend()
                .binary()
                .context("front end cannot read class files")?;
            let class = binary.read_class_like(&bytes)?;
            Box::new(DirectorySource::new(classpath_root(class_file, &class.name)))
        }
    };
    tracing::debug!("Decompiling {}", class_file.display());
    Ok(ctx.decompile(&bytes, source.as_ref())?)
}

fn is_jar(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("jar"))
}

/// `out/p/q/A.class` holding `p.q.A` lives under the root `out`.
fn classpath_root(class_file: &Path, class_name: &str) -> PathBuf {
    let mut root = class_file.parent().unwrap_or(Path::new("."));
    for _ in class_name.matches('.') {
        root = root.parent().unwrap_or(Path::new("."));
    }
    root.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lathe_java::fixtures::{ACC_PUBLIC, ACC_STATIC, ACC_SUPER, ClassFileWriter};
    use lathe_java::java_frontend;

    #[test]
    fn test_classpath_root_strips_the_package() {
        assert_eq!(classpath_root(Path::new("/out/p/q/A.class"), "p.q.A"), PathBuf::from("/out"));
        assert_eq!(classpath_root(Path::new("/out/A.class"), "A"), PathBuf::from("/out"));
    }

    #[test]
    fn test_nested_classes_come_from_the_output_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let package = dir.path().join("p");
        std::fs::create_dir_all(&package).expect("mkdir");
        let outer = ClassFileWriter::new("p/Outer", ACC_PUBLIC | ACC_SUPER)
            .inner_class("p/Outer$Inner", Some("p/Outer"), Some("Inner"), ACC_PUBLIC | ACC_STATIC)
            .finish();
        let inner = ClassFileWriter::new("p/Outer$Inner", ACC_PUBLIC | ACC_SUPER)
            .inner_class("p/Outer$Inner", Some("p/Outer"), Some("Inner"), ACC_PUBLIC | ACC_STATIC)
            .finish();
        std::fs::write(package.join("Outer.class"), outer).expect("write");
        std::fs::write(package.join("Outer$Inner.class"), inner).expect("write");

        let ctx = ModelContext::builder()
            .frontend(java_frontend())
            .build()
            .expect("context");
        let mirror = run(&ctx, &package.join("Outer.class"), None).expect("mirror");
        assert!(mirror.text().contains("public static class Inner {"));
    }
}
