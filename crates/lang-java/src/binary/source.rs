//! Places the nested classes of a compiled unit are looked up in.

use lathe_api::{FormatError, FormatResult};
use lathe_plugin::InnerClassSource;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

fn simple_binary_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn package_of(name: &str) -> Option<&str> {
    name.rfind('.').map(|idx| &name[..idx])
}

/// `p.Outer$Inner` as the entry path `p/Outer$Inner.class`.
pub fn entry_path(name: &str) -> String {
    format!("{}.class", name.replace('.', "/"))
}

/// Whether `candidate` could be nested in `outer` judging by name alone.
fn is_name_candidate(outer: &str, candidate: &str) -> bool {
    package_of(outer) == package_of(candidate)
        && simple_binary_name(candidate)
            .strip_prefix(simple_binary_name(outer))
            .is_some_and(|rest| rest.len() > 1 && rest.starts_with('$'))
}

/// A class-output directory laid out by package.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl InnerClassSource for DirectorySource {
    fn candidates(&self, outer: &str) -> FormatResult<Vec<String>> {
        let dir = match package_of(outer) {
            Some(package) => self.root.join(package.replace('.', "/")),
            None => self.root.clone(),
        };
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(stem) = file_name.to_str().and_then(|n| n.strip_suffix(".class")) else {
                continue;
            };
            let name = match package_of(outer) {
                Some(package) => format!("{package}.{stem}"),
                None => stem.to_string(),
            };
            if is_name_candidate(outer, &name) {
                out.push(name);
            }
        }
        out.sort();
        Ok(out)
    }

    fn load(&self, name: &str) -> FormatResult<Option<Vec<u8>>> {
        let path = self.root.join(entry_path(name));
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// A jar. The entry list is read once; each load reopens the archive.
#[derive(Debug, Clone)]
pub struct JarSource {
    path: PathBuf,
    entries: Vec<String>,
}

impl JarSource {
    pub fn open(path: impl Into<PathBuf>) -> FormatResult<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        let archive = ZipArchive::new(file)
            .map_err(|e| FormatError::Malformed(format!("{}: {e}", path.display())))?;
        let entries = archive
            .file_names()
            .filter(|n| n.ends_with(".class"))
            .map(str::to_string)
            .collect();
        Ok(Self { path, entries })
    }

    /// Binary names of every class in the jar.
    pub fn class_names(&self) -> impl Iterator<Item = String> + '_ {
        self.entries
            .iter()
            .filter_map(|e| e.strip_suffix(".class"))
            .map(|e| e.replace('/', "."))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl InnerClassSource for JarSource {
    fn candidates(&self, outer: &str) -> FormatResult<Vec<String>> {
        let mut out: Vec<String> = self
            .class_names()
            .filter(|name| is_name_candidate(outer, name))
            .collect();
        out.sort();
        Ok(out)
    }

    fn load(&self, name: &str) -> FormatResult<Option<Vec<u8>>> {
        let entry = entry_path(name);
        if !self.entries.iter().any(|e| *e == entry) {
            return Ok(None);
        }
        let file = File::open(&self.path)?;
        let mut archive = ZipArchive::new(file)
            .map_err(|e| FormatError::Malformed(format!("{}: {e}", self.path.display())))?;
        let mut zipped = archive
            .by_name(&entry)
            .map_err(|_| FormatError::MissingEntry(entry.clone()))?;
        let mut bytes = Vec::new();
        zipped.read_to_end(&mut bytes)?;
        Ok(Some(bytes))
    }
}

/// Classes held in memory, keyed by binary name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    classes: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.classes.insert(name.into(), bytes);
    }
}

impl InnerClassSource for MemorySource {
    fn candidates(&self, outer: &str) -> FormatResult<Vec<String>> {
        let mut out: Vec<String> = self
            .classes
            .keys()
            .filter(|name| is_name_candidate(outer, name))
            .cloned()
            .collect();
        out.sort();
        Ok(out)
    }

    fn load(&self, name: &str) -> FormatResult<Option<Vec<u8>>> {
        Ok(self.classes.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    #[test]
    fn test_name_candidates() {
        assert!(is_name_candidate("p.A", "p.A$B"));
        assert!(is_name_candidate("p.A", "p.A$1"));
        assert!(is_name_candidate("p.A", "p.A$B$C"));
        assert!(!is_name_candidate("p.A", "p.AB$C"));
        assert!(!is_name_candidate("p.A", "q.A$B"));
        assert!(!is_name_candidate("p.A", "p.A"));
    }

    #[test]
    fn test_directory_source() {
        let dir = tempdir().expect("tempdir");
        let pkg = dir.path().join("p");
        std::fs::create_dir_all(&pkg).expect("mkdir");
        for name in ["A.class", "A$B.class", "A$1.class", "Other$X.class", "A$B.txt"] {
            std::fs::write(pkg.join(name), b"x").expect("write");
        }
        let source = DirectorySource::new(dir.path());
        assert_eq!(source.candidates("p.A").expect("list"), vec!["p.A$1", "p.A$B"]);
        assert_eq!(source.load("p.A$B").expect("load"), Some(b"x".to_vec()));
        assert_eq!(source.load("p.Missing").expect("load"), None);
        assert!(source.candidates("q.A").expect("list").is_empty());
    }

    #[test]
    fn test_jar_source() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("lib.jar");
        {
            let file = File::create(&path).expect("create");
            let mut zip = zip::ZipWriter::new(file);
            for name in ["p/A.class", "p/A$B.class", "META-INF/MANIFEST.MF"] {
                zip.start_file(name, SimpleFileOptions::default()).expect("start");
                zip.write_all(name.as_bytes()).expect("write");
            }
            zip.finish().expect("finish");
        }
        let jar = JarSource::open(&path).expect("open");
        assert_eq!(jar.class_names().count(), 2);
        assert_eq!(jar.candidates("p.A").expect("list"), vec!["p.A$B"]);
        assert_eq!(
            jar.load("p.A$B").expect("load"),
            Some(b"p/A$B.class".to_vec())
        );
        assert_eq!(jar.load("p.C").expect("load"), None);
    }
}
