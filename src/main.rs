//! Freight Quote CLI
//!
//! Command-line interface for pricing freight insurance quotes

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use freight_quote::quote::{format_currency, format_rate_percentage};
use freight_quote::{Deductible, QuoteEngine, QuoteError, QuoteForm, SourceConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Parser)]
#[command(name = "freight_quote", version, about = "Indicative freight insurance quotes")]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    #[command(subcommand)]
    command: Command,
}

/// Table source overrides; without any, the environment decides
#[derive(Debug, Args)]
struct SourceArgs {
    /// Use only the built-in tables
    #[arg(long = "static", global = true, conflicts_with_all = ["tables_dir", "rest_url"])]
    use_static: bool,

    /// Directory with rates.csv and deductible_tiers.csv
    #[arg(long, global = true)]
    tables_dir: Option<PathBuf>,

    /// Rate store base URL
    #[arg(long, global = true, requires = "api_key", conflicts_with = "tables_dir")]
    rest_url: Option<String>,

    /// Rate store API key
    #[arg(long, global = true)]
    api_key: Option<String>,
}

impl SourceArgs {
    fn to_config(&self) -> SourceConfig {
        if self.use_static {
            return SourceConfig::Static;
        }
        if let (Some(url), Some(api_key)) = (&self.rest_url, &self.api_key) {
            return SourceConfig::Rest {
                url: url.clone(),
                api_key: api_key.clone(),
            };
        }
        if let Some(dir) = &self.tables_dir {
            return SourceConfig::Files { dir: dir.clone() };
        }
        SourceConfig::from_env()
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Price a single shipment
    Quote(QuoteArgs),
    /// Price every form in a CSV file
    Batch {
        /// Input CSV (transit_method, coverage_type, coverage_for, cargo_value, ...)
        #[arg(long)]
        input: PathBuf,
        /// Output CSV
        #[arg(long, default_value = "quotes.csv")]
        output: PathBuf,
    },
    /// Print the resolved rate and deductible tables and goods categories
    Tables,
}

#[derive(Debug, Args)]
struct QuoteArgs {
    /// Land, Air or Ocean
    #[arg(long)]
    transit: String,

    /// "All Risk" or "Total Loss"
    #[arg(long)]
    coverage_type: String,

    /// "Full Value" or "Additional"
    #[arg(long, default_value = "Full Value")]
    coverage_for: String,

    /// Cargo value; derived from the two parts for Additional coverage when omitted
    #[arg(long)]
    cargo_value: Option<String>,

    #[arg(long)]
    additional_value: Option<String>,

    #[arg(long)]
    carrier_insurance: Option<String>,

    /// Print the quote as JSON
    #[arg(long)]
    json: bool,
}

impl QuoteArgs {
    fn to_form(&self) -> QuoteForm {
        let form = QuoteForm {
            transit_method: self.transit.clone(),
            coverage_type: self.coverage_type.clone(),
            coverage_for: self.coverage_for.clone(),
            cargo_value: self.cargo_value.clone().unwrap_or_default(),
            additional_value: self.additional_value.clone(),
            carrier_insurance: self.carrier_insurance.clone(),
        };
        derive_missing_cargo_value(form)
    }
}

fn derive_missing_cargo_value(form: QuoteForm) -> QuoteForm {
    if form.cargo_value.trim().is_empty() {
        form.with_derived_cargo_value()
    } else {
        form
    }
}

/// One line of batch output
#[derive(Debug, Serialize)]
struct BatchRow {
    row: usize,
    status: &'static str,
    rate: Option<f64>,
    rate_display: Option<String>,
    premium: Option<f64>,
    deductible: Option<Deductible>,
    needs_manual_quote: Option<bool>,
    error: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.source.to_config();
    let tables = config
        .load_tables()
        .with_context(|| format!("Unable to load tables from {}", config.describe()))?;
    let engine = QuoteEngine::new(tables);

    match &cli.command {
        Command::Quote(args) => run_quote(&engine, args),
        Command::Batch { input, output } => run_batch(&engine, input, output),
        Command::Tables => {
            print_tables(&engine);
            Ok(())
        }
    }
}

fn run_quote(engine: &QuoteEngine, args: &QuoteArgs) -> Result<()> {
    let form = args.to_form();

    let quote = match engine.quote(&form) {
        Ok(quote) => quote,
        Err(QuoteError::Validation(errors)) => {
            for error in errors.errors() {
                eprintln!("  {:?}: {}", error.field, error.violation);
            }
            bail!("Quote request is invalid ({} problem(s))", errors.errors().len());
        }
        Err(e) => return Err(e.into()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&quote)?);
        return Ok(());
    }

    println!("Freight Insurance Quote");
    println!("=======================\n");
    println!("  Rate:           {}", quote.rate_display());
    println!("  Insured Amount: {}", format_currency(quote.insured_amount));
    println!("  Premium:        ${:.2}", quote.premium);
    println!("  Minimum:        {}", format_currency(quote.minimum_premium));
    println!("  Deductible:     {}", quote.deductible);
    if quote.needs_manual_quote {
        println!("\nCargo value exceeds automatic underwriting limits; contact us for a manual quote.");
    }
    Ok(())
}

fn run_batch(engine: &QuoteEngine, input: &Path, output: &Path) -> Result<()> {
    let start = Instant::now();
    println!("Loading forms from {}...", input.display());

    let mut reader = csv::Reader::from_path(input).with_context(|| format!("Unable to open {}", input.display()))?;
    let mut forms = Vec::new();
    for result in reader.deserialize() {
        let form: QuoteForm = result.context("Malformed form row")?;
        forms.push(derive_missing_cargo_value(form));
    }
    println!("Loaded {} forms in {:?}", forms.len(), start.elapsed());

    let results = engine.quote_batch(&forms);

    let mut writer = csv::Writer::from_path(output).with_context(|| format!("Unable to create {}", output.display()))?;
    let mut quoted = 0;
    for (i, result) in results.into_iter().enumerate() {
        let row = match result {
            Ok(quote) => {
                quoted += 1;
                BatchRow {
                    row: i + 1,
                    status: if quote.needs_manual_quote { "manual_quote" } else { "quoted" },
                    rate: Some(quote.rate),
                    rate_display: Some(format_rate_percentage(quote.rate)),
                    premium: Some(quote.premium),
                    deductible: Some(quote.deductible),
                    needs_manual_quote: Some(quote.needs_manual_quote),
                    error: None,
                }
            }
            Err(e) => BatchRow {
                row: i + 1,
                status: match e {
                    QuoteError::Validation(_) => "invalid",
                    QuoteError::RateUnavailable { .. } => "rate_unavailable",
                },
                rate: None,
                rate_display: None,
                premium: None,
                deductible: None,
                needs_manual_quote: None,
                error: Some(e.to_string()),
            },
        };
        writer.serialize(row)?;
    }
    writer.flush()?;

    println!("Quoted {} of {} forms in {:?}", quoted, forms.len(), start.elapsed());
    println!("Results written to: {}", output.display());
    Ok(())
}

fn print_tables(engine: &QuoteEngine) {
    let tables = engine.tables();

    println!("{:<8} {:<12} {:>12} {:>12} {:>10}", "Transit", "Coverage", "Full Value", "Additional", "Minimum");
    println!("{}", "-".repeat(58));
    for (transit, coverage, entry) in tables.rates.entries() {
        println!(
            "{:<8} {:<12} {:>12} {:>12} {:>10}",
            transit.as_str(),
            coverage.as_str(),
            format_rate_percentage(entry.full_value_rate),
            format_rate_percentage(entry.additional_rate),
            format_currency(entry.minimum_premium),
        );
    }

    println!("\n{:>14} {:>14} {:>22}", "Min", "Max", "Deductible");
    println!("{}", "-".repeat(52));
    for tier in tables.deductibles.tiers() {
        let max = tier.max.map_or_else(|| "unbounded".to_string(), |m| format!("{:.2}", m));
        println!("{:>14.2} {:>14} {:>22}", tier.min, max, tier.deductible.to_string());
    }

    println!("\nGoods categories ({}):", tables.categories.len());
    for name in tables.categories.names() {
        println!("  {}", name);
    }
}
