use clap::{Parser, Subcommand};
use content_graph::load::{self, LoadError, Loaded};
use content_graph::store::GraphError;
use content_graph::types::EntityKind;
use content_graph::visibility::{BuildMode, Visibility};
use content_graph::{config, manifest, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "content-graph")]
#[command(about = "Validate and query a collection of pages, groups and series")]
#[command(long_about = "\
Validate and query a collection of pages, groups and series

Every content file is a record with front matter. Pages belong to groups or
to a series, groups nest under other groups, and series order pages into a
reading path. Drafts are hidden in production builds.

Project structure:

  project/
  ├── config.toml                  # Optional; see 'content-graph gen-config'
  └── src/content/
      ├── pages/
      │   ├── intro.md             # Slug \"intro\" (YAML front matter)
      │   ├── borrowing.mdx        # TOML front matter between +++ fences
      │   └── async/index.md       # Slug \"async\"
      ├── groups/
      │   └── rust.yaml            # Data file: the whole file is the record
      └── series/
          └── tour.toml

Run 'content-graph gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Project directory (holds config.toml)
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Build mode; production hides drafts
    #[arg(long, value_enum, global = true)]
    mode: Option<BuildMode>,

    /// Show drafts regardless of mode
    #[arg(long, global = true)]
    drafts: bool,

    /// More log output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load and validate all content; exit non-zero on any problem
    Check,
    /// List visible entities of one kind
    List {
        /// page, group or series
        kind: EntityKind,
    },
    /// Show one entity with its relationships
    Show {
        /// page, group or series
        kind: EntityKind,
        slug: String,
    },
    /// Print the group navigation tree
    Tree,
    /// Write manifest.json for the site generator
    Build {
        /// Output directory
        #[arg(long, default_value = "dist")]
        output: PathBuf,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let site_config = config::load_config(&cli.root)?;
    init_thread_pool(&site_config.processing);
    let visibility = if cli.drafts {
        Visibility::ALL
    } else {
        site_config.drafts.visibility(cli.mode)
    };

    let loaded = load_site(&cli.root, &site_config)?;
    let view = loaded.graph.view(visibility);

    match cli.command {
        Command::Check => {
            println!("==> Checking {}", cli.root.join(&site_config.content_root).display());
            output::print_check_output(&loaded);
            if !loaded.is_clean() {
                return Err("content has errors".into());
            }
            println!("==> Content is valid");
        }
        Command::List { kind } => output::print_listing(&view, kind),
        Command::Show { kind, slug } => {
            if !output::print_entity(&view, kind, &slug) {
                return Err(format!("no visible {kind} '{slug}'").into());
            }
        }
        Command::Tree => output::print_tree(&manifest::navigation(&view)),
        Command::Build { output: out_dir } => {
            if !loaded.is_clean() {
                output::print_check_output(&loaded);
                return Err("content has errors; not writing a manifest".into());
            }
            let snapshot = manifest::build_manifest(&view);
            let path = manifest::write_manifest(&snapshot, &out_dir)?;
            println!(
                "==> Wrote {} ({} pages, {} groups, {} series, drafts {})",
                path.display(),
                snapshot.pages.len(),
                snapshot.groups.len(),
                snapshot.series.len(),
                if snapshot.show_drafts { "shown" } else { "hidden" }
            );
        }
        Command::GenConfig => unreachable!("handled before loading"),
    }

    Ok(())
}

/// Load the site, printing duplicate slugs in full before failing.
fn load_site(root: &Path, site_config: &config::SiteConfig) -> Result<Loaded, LoadError> {
    match load::load(root, site_config) {
        Err(LoadError::Graph(GraphError::DuplicateSlugs(duplicates))) => {
            output::print_duplicates(&duplicates);
            Err(LoadError::Graph(GraphError::DuplicateSlugs(duplicates)))
        }
        other => other,
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
