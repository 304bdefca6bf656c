use lathe_api::NodeIds;
use lathe_plugin::LanguageFrontend;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{Table, Tabled};
use walkdir::WalkDir;

#[derive(Debug, Tabled)]
pub struct CheckRow {
    #[tabled(rename = "File")]
    pub path: String,
    #[tabled(rename = "Fast")]
    pub fast: usize,
    #[tabled(rename = "Derived")]
    pub derived: usize,
    #[tabled(rename = "Problem")]
    pub problem: String,
}

/// Source files under `paths` the front end handles, in walk order.
pub fn collect_sources(frontend: &dyn LanguageFrontend, paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        for entry in WalkDir::new(path).sort_by_file_name().into_iter().flatten() {
            let handled = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| frontend.handles_extension(ext));
            if entry.file_type().is_file() && handled {
                files.push(entry.into_path());
            }
        }
    }
    files
}

/// Compares both skeleton builders on one file. `None` when they agree.
pub fn check_file(frontend: &dyn LanguageFrontend, path: &Path) -> anyhow::Result<Option<CheckRow>> {
    let text = std::fs::read_to_string(path)?;
    let fast = frontend.build_skeleton(&text);
    let root = frontend.parse_file(&text, &NodeIds::new());
    let derived = frontend.derive_skeleton(&root);
    let problem = if root.text() != text {
        "tree does not reproduce the text".to_string()
    } else if derived != fast {
        tracing::debug!("{}\nfast:\n{}\nderived:\n{}", path.display(), fast, derived);
        first_difference(&fast, &derived)
    } else {
        return Ok(None);
    };
    Ok(Some(CheckRow {
        path: path.display().to_string(),
        fast: fast.count(),
        derived: derived.count(),
        problem,
    }))
}

fn first_difference(fast: &lathe_api::StubNode, derived: &lathe_api::StubNode) -> String {
    for (a, b) in fast.preorder().zip(derived.preorder()) {
        if a.kind != b.kind || a.name() != b.name() {
            return format!(
                "{} {} vs {} {}",
                a.kind,
                a.name().unwrap_or("-"),
                b.kind,
                b.name().unwrap_or("-")
            );
        }
        if a.attributes != b.attributes {
            return format!("attributes of {} {}", a.kind, a.name().unwrap_or("-"));
        }
    }
    "stub count".to_string()
}

pub fn run(frontend: &Arc<dyn LanguageFrontend>, paths: &[PathBuf]) -> anyhow::Result<()> {
    let files = collect_sources(frontend.as_ref(), paths);
    let mut rows = Vec::new();
    for file in &files {
        match check_file(frontend.as_ref(), file) {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => {}
            Err(e) => tracing::warn!("Skipping {}: {}", file.display(), e),
        }
    }
    tracing::info!("Checked {} files, {} mismatched", files.len(), rows.len());
    if rows.is_empty() {
        println!("{} files checked, skeletons agree.", files.len());
        return Ok(());
    }
    println!("{}", Table::new(&rows));
    anyhow::bail!("{} of {} files have mismatched skeletons", rows.len(), files.len())
}
