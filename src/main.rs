use clap::{Parser, Subcommand};
use logux_site::{config, docs, generate, output, styles, worker};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "logux-site")]
#[command(about = "Build pipeline for the Logux documentation website")]
#[command(long_about = "\
Build pipeline for the Logux documentation website

Markdown documents become HTML pages, stylesheets get absolute asset URLs
and merged media queries, and a cache-first service worker precaches the
result for offline reading.

Layout:

  docs/                          # --docs / docs_dir
  ├── README.md                  # Project readme (raw <img> markup removed)
  ├── assets/                    # Copied to the output root (style.css, fonts)
  └── guide/
      └── start.md               # → dist/guide/start/index.html

  dist/                          # --output / output_dir
  ├── guide/start/index.html
  ├── style.css                  # Repacked in place
  └── sw.js                      # Offline cache worker

Run 'logux-site gen-config' to generate a documented logux-site.toml.")]
#[command(version)]
struct Cli {
    /// Config file (optional; stock defaults when absent)
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Markdown sources directory (overrides docs_dir)
    #[arg(long, global = true)]
    docs: Option<PathBuf>,

    /// Output directory (overrides output_dir)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Log every file
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transform markdown documents and write their pages
    Docs,
    /// Repack stylesheets in the output directory
    Styles,
    /// Write the offline cache worker for the output directory
    Worker,
    /// Run the full pipeline: assets → docs → styles → worker
    Build,
    /// Print a stock logux-site.toml with all options documented
    GenConfig,
}

/// Directories resolved from config and CLI flags.
struct Paths {
    docs: PathBuf,
    output: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let site_config = config::load_config(&cli.config)?;
    init_thread_pool(&site_config.processing);
    let paths = Paths {
        docs: cli
            .docs
            .clone()
            .unwrap_or_else(|| PathBuf::from(&site_config.docs_dir)),
        output: cli
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&site_config.output_dir)),
    };

    match cli.command {
        Command::Docs => run_docs(&paths, &site_config)?,
        Command::Styles => run_styles(&paths.output)?,
        Command::Worker => run_worker(&paths.output, &site_config)?,
        Command::Build => {
            println!("==> Stage 1: Copying assets");
            generate::copy_assets(&paths.docs.join(&site_config.assets_dir), &paths.output)?;

            println!("==> Stage 2: Transforming {}", paths.docs.display());
            run_docs(&paths, &site_config)?;

            println!("==> Stage 3: Repacking styles");
            run_styles(&paths.output)?;

            println!("==> Stage 4: Writing offline worker");
            run_worker(&paths.output, &site_config)?;

            println!("==> Build complete: {}", paths.output.display());
        }
        Command::GenConfig => {}
    }

    Ok(())
}

fn run_docs(paths: &Paths, site_config: &config::SiteConfig) -> Result<(), Box<dyn std::error::Error>> {
    let documents = docs::read_docs(&paths.docs, site_config)?;
    generate::write_pages(&documents, &paths.output, site_config)?;
    output::print_docs_output(&documents);
    Ok(())
}

fn run_styles(output_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let files = styles::find_css_files(output_dir)?;
    let urls = styles::repack_each(&files)?;
    output::print_styles_output(&files, &urls, output_dir);
    Ok(())
}

fn run_worker(
    output_dir: &Path,
    site_config: &config::SiteConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let worker_config = worker::write_worker(output_dir, &site_config.worker)?;
    output::print_worker_output(&worker_config, &site_config.worker.script_name);
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. Config can lower it, not raise it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
