use clap::Subcommand;
use lathe_core::MirrorCache;
use tabled::{Table, Tabled};

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show cache statistics
    Stats,
    /// List cached mirrors
    List {
        /// Sort by size or date
        #[arg(long, value_parser = ["size", "date"])]
        sort: Option<String>,
        /// Filter by class name
        #[arg(long)]
        filter: Option<String>,
    },
    /// Print a cached mirror
    Inspect {
        /// Entry key (full or prefix)
        key: String,
    },
    /// Clear the cache
    Clear,
}

#[derive(Tabled)]
struct MirrorRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Stubs")]
    stubs: usize,
    #[tabled(rename = "Ver")]
    version: u32,
    #[tabled(rename = "Age")]
    age: String,
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / 1024.0 / 1024.0)
    }
}

fn format_age(now: u64, created_at: u64) -> String {
    let age = now.saturating_sub(created_at);
    if age < 60 {
        format!("{age}s ago")
    } else if age < 3600 {
        format!("{}m ago", age / 60)
    } else if age < 86400 {
        format!("{}h ago", age / 3600)
    } else {
        format!("{}d ago", age / 86400)
    }
}

pub fn run(cmd: CacheCommands) -> anyhow::Result<()> {
    // The cache lives on disk, so no context is needed to manage it.
    let cache = MirrorCache::persistent(crate::cache_dir());

    match cmd {
        CacheCommands::Stats => {
            let stats = cache.stats();
            if let Some(dir) = &stats.cache_dir {
                println!("Cache Directory: {}", dir.display());
            }
            println!("Total Mirrors:   {}", stats.total_entries);
            println!("Total Stubs:     {}", stats.total_stubs);
        }
        CacheCommands::List { sort, filter } => {
            let mut mirrors = cache.scan();
            if let Some(pattern) = filter {
                mirrors.retain(|m| m.class_name.contains(&pattern));
            }
            match sort.as_deref() {
                Some("size") => mirrors.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes)),
                Some("date") => mirrors.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
                _ => {}
            }

            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            let rows: Vec<MirrorRow> = mirrors
                .into_iter()
                .map(|m| MirrorRow {
                    key: m.key,
                    class: m.class_name,
                    size: format_size(m.size_bytes),
                    stubs: m.stub_count,
                    version: m.version,
                    age: format_age(now, m.created_at),
                })
                .collect();

            if rows.is_empty() {
                println!("No cached mirrors found.");
            } else {
                println!("{}", Table::new(rows));
            }
        }
        CacheCommands::Inspect { key } => match cache.inspect(&key) {
            Some(mirror) => {
                println!("Class:  {}", mirror.class_name);
                println!("Stubs:  {}", mirror.skeleton.len());
                println!();
                print!("{}", mirror.text);
            }
            None => println!("No cached mirror with key prefix: {key}"),
        },
        CacheCommands::Clear => {
            cache.clear()?;
            tracing::info!("Cleared mirror cache");
            println!("Cache cleared successfully.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_readable_columns() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_age(1000, 1000 - 90), "1m ago");
        assert_eq!(format_age(0, 10), "0s ago");
    }
}
