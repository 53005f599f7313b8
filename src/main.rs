//! hmmpool CLI entry point

use anyhow::{Context, Result};
use hmmpool::config::{cli::Cli, toml::load_config, validator};
use hmmpool::engine::ungapped::UngappedEngine;
use hmmpool::sequence::Alphabet;
use hmmpool::{input, output, Coordinator, SearchError};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(&cli);
    cli.validate()?;

    // CLI options override the configuration file
    let config = load_config(&cli)?;
    validator::validate_config(&config).context("Configuration validation failed")?;
    tracing::debug!("{}", config);

    let queries = input::load_queries(&cli.queries)?;
    let db = input::load_database(&cli.seqdb)?;

    if cli.dry_run {
        println!("{}", config);
        println!(
            "Dry run mode - {} queries and {} target sequences validated successfully",
            queries.len(),
            db.len()
        );
        return Ok(());
    }

    let engine_config = config.engine.clone();
    let factory = move |alphabet: Alphabet| {
        Ok::<_, SearchError>(UngappedEngine::new(alphabet, engine_config.clone()))
    };

    let outcome = Coordinator::new(factory)
        .with_config(config.search.clone())
        .run(queries, &db)
        .context("Search failed")?;

    output::emit(&outcome, &config)
}

/// Log to stderr so the report on stdout stays clean
///
/// `RUST_LOG` takes precedence over `-v`.
fn init_logging(cli: &Cli) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(cli.log_level()).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
