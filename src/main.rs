use anyhow::{Context, Result};
use clap::Parser;
use impactmap::cli::{Cli, Commands, IndexArgs};
use impactmap::config::{load_config, ImpactmapConfig};
use impactmap::io::create_writer;
use impactmap::ImpactAnalyzer;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Commands::Analyze {
            root,
            tables,
            format,
            output,
            index,
        } => {
            let analyzer = initialized_analyzer(&root, &index)?;
            let results = analyzer
                .analyze_tables(tables.as_slice())
                .context("Impact analysis failed")?;
            let mut writer = create_writer(format.into(), output_target(output.as_deref())?);
            writer.write_results(&results)
        }
        Commands::Stats {
            root,
            format,
            index,
        } => {
            let analyzer = initialized_analyzer(&root, &index)?;
            let mut writer = create_writer(format.into(), output_target(None)?);
            writer.write_statistics(&analyzer.get_statistics())
        }
        Commands::Tables {
            root,
            format,
            index,
        } => {
            let analyzer = initialized_analyzer(&root, &index)?;
            let tables = analyzer.indexed_tables()?;
            let mut writer = create_writer(format.into(), output_target(None)?);
            writer.write_tables(&tables)
        }
        Commands::ClearCache { root, cache_dir } => {
            let index = IndexArgs {
                cache_dir,
                ..Default::default()
            };
            let analyzer = ImpactAnalyzer::new(configured(&index));
            let removed = analyzer
                .clear_cache(&root)
                .with_context(|| format!("Failed to clear cache for {}", root.display()))?;
            println!("Removed {removed} cache files");
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("impactmap={level}")))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn configured(index: &IndexArgs) -> ImpactmapConfig {
    let mut config = load_config();
    index.apply(&mut config);
    config
}

fn initialized_analyzer(root: &Path, index: &IndexArgs) -> Result<ImpactAnalyzer> {
    let analyzer = ImpactAnalyzer::new(configured(index));

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg} [{elapsed}]")
            .context("Invalid spinner template")?
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    spinner.set_message(format!("Indexing {}", root.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = analyzer
        .initialize(root)
        .with_context(|| format!("Failed to index {}", root.display()));
    spinner.finish_and_clear();
    outcome?;
    Ok(analyzer)
}

fn output_target(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(std::io::stdout())),
    }
}
