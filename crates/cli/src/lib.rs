mod cache;
mod check;
mod mirror;
mod tree;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lathe_java::java_frontend;
use lathe_plugin::LanguageFrontend;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "lathe",
    version,
    about = "Inspect the structural model built for Java sources and class files",
    long_about = "Lathe builds skeletons and lazily parsed syntax trees for Java sources, \
                  and source-like mirrors for compiled classes. This tool prints them, \
                  cross-checks the skeleton builders, and manages the mirror cache."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the skeleton of a source file
    Skeleton {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Derive the skeleton from the parsed tree instead of scanning text
        #[arg(long)]
        derived: bool,
        /// Print JSON instead of the indented outline
        #[arg(long)]
        json: bool,
    },
    /// Print the syntax tree of a source file
    #[command(long_about = "Prints the top-level syntax tree. Method bodies and other deferred \
                            regions are shown collapsed unless --expand is given.")]
    Tree {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Parse every deferred region before printing
        #[arg(long)]
        expand: bool,
    },
    /// Print the mirror text of a class file
    Mirror {
        #[arg(value_name = "CLASS_FILE")]
        class_file: PathBuf,
        /// Directory or jar holding the nested classes. Defaults to the
        /// class-output root the class file sits in.
        #[arg(long, value_name = "DIR_OR_JAR")]
        classpath: Option<PathBuf>,
    },
    /// Compare the fast and derived skeletons of every source file
    Check {
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },
    /// Manage the mirror cache
    Cache {
        #[command(subcommand)]
        command: cache::CacheCommands,
    },
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = lathe_core::logging::init_logging("cli", false);
    let frontend = java_frontend();

    match cli.command {
        Commands::Skeleton {
            file,
            derived,
            json,
        } => {
            let text = read_source(&file)?;
            let skeleton = if derived {
                let root = frontend.parse_file(&text, &lathe_api::NodeIds::new());
                frontend.derive_skeleton(&root)
            } else {
                frontend.build_skeleton(&text)
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&skeleton)?);
            } else {
                print!("{skeleton}");
            }
            Ok(())
        }
        Commands::Tree { file, expand } => {
            let text = read_source(&file)?;
            print!("{}", tree::render(frontend, &text, expand));
            Ok(())
        }
        Commands::Mirror {
            class_file,
            classpath,
        } => {
            let ctx = context(frontend)?;
            let mirror = mirror::run(&ctx, &class_file, classpath.as_deref())?;
            print!("{}", mirror.text());
            Ok(())
        }
        Commands::Check { paths } => check::run(&frontend, &paths),
        Commands::Cache { command } => cache::run(command),
    }
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

/// The mirror cache directory: `LATHE_MIRROR_CACHE_DIR` or `~/.lathe/mirrors`.
fn cache_dir() -> PathBuf {
    lathe_core::ModelConfig::from_env()
        .mirror_cache_dir
        .unwrap_or_else(lathe_core::MirrorCache::default_location)
}

fn context(frontend: Arc<dyn LanguageFrontend>) -> anyhow::Result<lathe_core::ModelContext> {
    let config = lathe_core::ModelConfig::from_env().mirror_cache_dir(cache_dir());
    Ok(lathe_core::ModelContext::builder()
        .config(config)
        .frontend(frontend)
        .build()?)
}
