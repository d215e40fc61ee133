use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kb_finder::{
    config::{FilterColumn, FinderConfig},
    products::TokenGranularity,
    query::ALL_PRODUCTS,
    report::QueryReport,
    KbFinder,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Find knowledge-base articles whose keywords approximately match an error message.
#[derive(Debug, Parser)]
#[command(name = "kbfind", version)]
struct Cli {
    /// CSV file of articles [env: KBFIND_DATA_PATH, default: vmware_kb_articles.csv]
    #[arg(long, value_name = "PATH", global = true)]
    data: Option<PathBuf>,

    /// Minimum score (exclusive) for a match, 0-100 [env: KBFIND_THRESHOLD, default: 70]
    #[arg(long, global = true)]
    threshold: Option<u8>,

    /// Score cache entries; 0 disables caching [env: KBFIND_CACHE_CAPACITY]
    #[arg(long, global = true)]
    cache_capacity: Option<usize>,

    /// Product token policy: phrase | first-word [env: KBFIND_TOKEN_GRANULARITY]
    #[arg(long, global = true)]
    granularity: Option<String>,

    /// Column used for product filtering: auto | product | keywords [env: KBFIND_FILTER_COLUMN]
    #[arg(long, global = true)]
    filter_column: Option<String>,

    /// Logging verbosity when RUST_LOG is unset
    #[arg(long, default_value = "warn", value_name = "LEVEL", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one query and print the matching articles
    Search {
        /// Error message or keyword
        query: String,
        /// Restrict to rows whose product text contains this value
        #[arg(long, short, default_value = ALL_PRODUCTS)]
        product: String,
        #[arg(long)]
        json: bool,
    },
    /// List the selectable product filter values
    Products {
        #[arg(long)]
        json: bool,
    },
    /// Show the loaded data file, effective settings and cache statistics
    Status,
    /// Read queries from stdin, one per line
    Interactive,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let config = build_config(&cli)?;
    let data_path = config.data_path.clone();
    let finder = KbFinder::open(config)
        .with_context(|| format!("cannot load article data from {}", data_path.display()))?;

    match cli.command {
        Command::Search { query, product, json } => cmd_search(&finder, &query, &product, json),
        Command::Products { json } => cmd_products(&finder, json),
        Command::Status => {
            println!("{}", serde_json::to_string_pretty(&finder.status())?);
            Ok(())
        }
        Command::Interactive => cmd_interactive(finder),
    }
}

fn setup_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();
}

fn build_config(cli: &Cli) -> Result<FinderConfig> {
    let mut config = FinderConfig::from_env();
    if let Some(path) = &cli.data {
        config.data_path = path.clone();
    }
    if let Some(threshold) = cli.threshold {
        config.threshold = threshold;
    }
    if let Some(capacity) = cli.cache_capacity {
        config.cache_capacity = capacity;
    }
    if let Some(raw) = &cli.granularity {
        config.granularity = TokenGranularity::parse_str(raw)?;
    }
    if let Some(raw) = &cli.filter_column {
        config.filter_column = FilterColumn::parse_str(raw)?;
    }
    config.validate()?;
    Ok(config)
}

fn cmd_search(finder: &KbFinder, query: &str, product: &str, json: bool) -> Result<()> {
    let report = finder.search(query, product);
    print_report(&report, json)
}

fn cmd_products(finder: &KbFinder, json: bool) -> Result<()> {
    let tokens = finder.products().tokens();
    if json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
    } else {
        println!("{ALL_PRODUCTS}");
        for token in tokens {
            println!("{token}");
        }
    }
    Ok(())
}

fn cmd_interactive(mut finder: KbFinder) -> Result<()> {
    let stdin = io::stdin();
    let mut out = io::stdout().lock();
    let mut product = ALL_PRODUCTS.to_string();

    writeln!(
        out,
        "Enter an error message or keyword ({} articles loaded). :help for commands.",
        finder.table().len()
    )?;

    for line in stdin.lock().lines() {
        let line = line?;
        let input = line.trim();

        if let Some(command) = input.strip_prefix(':') {
            let (name, arg) = command.split_once(' ').unwrap_or((command, ""));
            match name {
                "q" | "quit" | "exit" => break,
                "product" => {
                    let arg = arg.trim();
                    product = if arg.is_empty() { ALL_PRODUCTS.to_string() } else { arg.to_string() };
                    if product != ALL_PRODUCTS && !finder.products().contains(&product) {
                        warn!(product = %product, "Filter is not a listed product; matching as substring");
                    }
                    writeln!(out, "Product filter: {product}")?;
                }
                "products" => {
                    writeln!(out, "{ALL_PRODUCTS}")?;
                    for token in finder.products().tokens() {
                        writeln!(out, "{token}")?;
                    }
                }
                "reload" => match finder.reload_if_changed() {
                    Ok(true) => writeln!(out, "Reloaded {} articles.", finder.table().len())?,
                    Ok(false) => writeln!(out, "Data file unchanged.")?,
                    Err(e) => writeln!(out, "Reload failed: {e}")?,
                },
                "stats" => writeln!(out, "{}", serde_json::to_string_pretty(&finder.status())?)?,
                _ => writeln!(
                    out,
                    ":product [name]  set or clear the product filter\n\
                     :products        list product filter values\n\
                     :reload          reload the data file if it changed\n\
                     :stats           show data file, settings and cache statistics\n\
                     :quit            exit"
                )?,
            }
            out.flush()?;
            continue;
        }

        if input.is_empty() {
            continue;
        }
        let report = finder.search(input, &product);
        info!(query = input, product = %product, matches = report.matches.len(), "Interactive query");
        write!(out, "{}", report.render_text())?;
        out.flush()?;
    }
    Ok(())
}

fn print_report(report: &QueryReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}
