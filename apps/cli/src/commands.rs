//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use hazfill_core::{
    BatchConfig, BatchResult, FillSummary, Filler, ProgressReporter, TierCatalog, run_batch,
};
use hazfill_search::{ChatCompletionsExtractor, TavilySearcher};
use hazfill_shared::{AppConfig, FIELDS, init_config, load_config, resolve_api_key};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Rows processed by `--dry-run`.
const DRY_RUN_ROWS: usize = 2;

/// Domains listed per field by `fields --domains`.
const DOMAINS_SHOWN: usize = 4;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// hazfill: fill empty cells of an HMIS chemical table from trusted web sources.
#[derive(Parser)]
#[command(
    name = "hazfill",
    version,
    about = "Fill empty HMIS chemical table cells from tiered web search and LLM extraction.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fill empty cells of the table and write a copy.
    Fill {
        /// Input table (CSV, or TSV by extension).
        #[arg(short, long, default_value = "docs/HMIS TABLE.csv")]
        input: PathBuf,

        /// Output table.
        #[arg(short, long, default_value = "docs/HMIS_filled.csv")]
        output: PathBuf,

        /// Process only the first N rows.
        #[arg(long)]
        max_rows: Option<usize>,

        /// Process the first two rows with live search and extraction.
        #[arg(long, conflicts_with = "max_rows")]
        dry_run: bool,

        /// Load and rewrite the table without any search or extraction.
        #[arg(long)]
        load_only: bool,
    },

    /// Print the column schema.
    Fields {
        /// Also list each field's preferred trusted domains.
        #[arg(long)]
        domains: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "hazfill=info",
        1 => "hazfill=debug",
        _ => "hazfill=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Fill {
            input,
            output,
            max_rows,
            dry_run,
            load_only,
        } => {
            let max_rows = if dry_run { Some(DRY_RUN_ROWS) } else { max_rows };
            cmd_fill(&input, &output, max_rows, load_only).await
        }
        Command::Fields { domains } => cmd_fields(domains),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

async fn cmd_fill(
    input: &Path,
    output: &Path,
    max_rows: Option<usize>,
    load_only: bool,
) -> Result<()> {
    if !input.exists() {
        return Err(eyre!(
            "input file not found: {}. Pass --input or place the table there.",
            input.display()
        ));
    }

    let config = load_config()?;
    let batch = BatchConfig {
        input: input.to_path_buf(),
        output: Some(output.to_path_buf()),
        max_rows,
        load_only,
    };

    info!(
        input = %input.display(),
        output = %output.display(),
        max_rows,
        load_only,
        "starting fill"
    );

    let reporter = CliProgress::new();
    let result = if load_only {
        run_batch(&batch, None, &reporter).await?
    } else {
        let search_key = resolve_api_key(&config.search.api_key_env, "Search")?;
        let llm_key = resolve_api_key(&config.llm.api_key_env, "LLM")?;
        let searcher = TavilySearcher::new(&config.search, search_key)?;
        let extractor = ChatCompletionsExtractor::new(&config.llm, llm_key)?;
        let catalog = TierCatalog::from_config(&config.tiers);
        let filler = Filler::new(&searcher, &extractor, &catalog, config.fill.clone());
        run_batch(&batch, Some(&filler), &reporter).await?
    };

    print_summary(&result);
    Ok(())
}

fn print_summary(result: &BatchResult) {
    println!();
    if result.rows.is_empty() {
        println!("  Table round-tripped (no search or extraction).");
    } else {
        println!("  Fill complete!");
        println!("  Filled:  {}", result.total_filled());
        println!("  Pending: {}", result.total_pending());
        let review = result
            .rows
            .iter()
            .map(|r| r.summary.general_filled)
            .sum::<usize>();
        println!("  General: {review} (check values marked for review)");
    }
    println!("  Rows:    {}", result.records.len());
    if let Some(path) = &result.output {
        println!("  Output:  {}", path.display());
    }
    if let Some(path) = &result.provenance {
        println!("  Report:  {}", path.display());
    }
    println!("  Time:    {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn record_started(&self, current: usize, total: usize, chemical: &str) {
        if current == 1 {
            self.bar.set_style(Self::bar_style());
            self.bar.set_length(total as u64);
        }
        self.bar.set_position((current - 1) as u64);
        self.bar.set_message(chemical.to_string());
    }

    fn record_done(&self, current: usize, _total: usize, summary: &FillSummary) {
        self.bar.set_position(current as u64);
        self.bar.println(format!(
            "  row {current}: {} filled, {} pending",
            summary.filled, summary.pending
        ));
    }

    fn done(&self, _result: &BatchResult) {
        self.bar.finish_and_clear();
    }
}

fn cmd_fields(domains: bool) -> Result<()> {
    let catalog = if domains {
        Some(TierCatalog::from_config(&load_config()?.tiers))
    } else {
        None
    };
    for line in field_lines(catalog.as_ref()) {
        println!("{line}");
    }
    if let Some(catalog) = &catalog {
        println!();
        println!(
            "  {} trusted domains across {} tiers",
            catalog.all_trusted_domains().len(),
            catalog.len()
        );
    }
    Ok(())
}

fn field_lines(catalog: Option<&TierCatalog>) -> Vec<String> {
    FIELDS
        .iter()
        .map(|field| {
            let line = format!("{:>3}  {:<28} {}", field.column, field.name, field.description);
            match catalog {
                Some(catalog) => {
                    let pool = catalog.domains_for_field(field.name);
                    let shown = &pool[..pool.len().min(DOMAINS_SHOWN)];
                    format!("{line}\n     -> {}", shown.join(", "))
                }
                None => line,
            }
        })
        .collect()
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fill_defaults() {
        let cli = Cli::try_parse_from(["hazfill", "fill"]).unwrap();
        match cli.command {
            Command::Fill {
                input,
                output,
                max_rows,
                dry_run,
                load_only,
            } => {
                assert_eq!(input, PathBuf::from("docs/HMIS TABLE.csv"));
                assert_eq!(output, PathBuf::from("docs/HMIS_filled.csv"));
                assert!(max_rows.is_none());
                assert!(!dry_run && !load_only);
            }
            _ => panic!("expected fill"),
        }
    }

    #[test]
    fn dry_run_conflicts_with_max_rows() {
        assert!(Cli::try_parse_from(["hazfill", "fill", "--dry-run", "--max-rows", "5"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["hazfill", "fields", "-vv", "--log-format", "json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.log_format, LogFormat::Json));
    }

    #[test]
    fn fields_domains_flag() {
        let cli = Cli::try_parse_from(["hazfill", "fields", "--domains"]).unwrap();
        assert!(matches!(cli.command, Command::Fields { domains: true }));
    }

    #[test]
    fn field_lines_list_preferred_domains() {
        let catalog = TierCatalog::from_config(&hazfill_shared::TiersConfig::default());
        let plain = field_lines(None);
        let with_domains = field_lines(Some(&catalog));
        assert_eq!(plain.len(), FIELDS.len());
        assert_eq!(with_domains.len(), FIELDS.len());
        assert!(!plain.iter().any(|l| l.contains("->")));

        let boiling = with_domains
            .iter()
            .find(|l| l.contains("boiling_point_c"))
            .unwrap();
        assert!(boiling.contains("-> airliquide.com"));
        let toxic = with_domains.iter().find(|l| l.contains("ghs06_toxic")).unwrap();
        assert!(toxic.contains("-> osha.gov"));
    }

    #[tokio::test]
    async fn missing_input_is_reported() {
        let err = cmd_fill(Path::new("/nonexistent/HMIS.csv"), Path::new("out.csv"), None, true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("input file not found"));
    }
}
