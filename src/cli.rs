//! Command-line entry point.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::engine::{Engine, EngineOptions};
use crate::services::{default_output_path, write_csv, write_json, FetchConfig, ReqwestFetcher};
use crate::types::{RunRequest, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(name = "revcrawl", about = "Scrape product reviews into JSON or CSV")]
pub struct Cli {
    /// Review site to scrape: g2, capterra or trustpilot
    #[arg(short = 'S', long)]
    pub source: String,

    /// Company or product name
    #[arg(short, long)]
    pub company: String,

    /// Earliest review date to keep (any common format)
    #[arg(short, long)]
    pub start_date: Option<String>,

    /// Latest review date to keep (any common format)
    #[arg(short, long)]
    pub end_date: Option<String>,

    /// Exact listing URL, skipping candidate resolution
    #[arg(long)]
    pub product_url: Option<String>,

    /// Site-specific slug or identifier, overriding name slugification
    #[arg(long)]
    pub product_slug: Option<String>,

    /// Output file path; derived from run parameters when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Stop after this many listing pages
    #[arg(long)]
    pub max_pages: Option<u32>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Log filter, e.g. "debug" or "revcrawl=debug"
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let source: Source = cli.source.parse()?;
    let request = RunRequest {
        source,
        company_name: cli.company.clone(),
        start_date: cli.start_date.clone(),
        end_date: cli.end_date.clone(),
        product_url: cli.product_url.clone(),
        product_slug: cli.product_slug.clone(),
        max_pages: cli.max_pages,
    };

    // Surface bad dates before any network traffic; the same pass also
    // names the output file.
    let ctx = Engine::context_for(&request)?;

    let fetcher = ReqwestFetcher::new(FetchConfig::from_env())?;
    let engine = Engine::new(&fetcher, EngineOptions::default());
    let records = engine.run_with(&request, ctx.clone()).await;

    let ext = match cli.format {
        OutputFormat::Json => "json",
        OutputFormat::Csv => "csv",
    };
    let path = cli.output.unwrap_or_else(|| {
        default_output_path(
            source,
            &cli.company,
            ctx.start_date.as_deref(),
            ctx.end_date.as_deref(),
            ext,
        )
    });
    match cli.format {
        OutputFormat::Json => write_json(&path, &records)?,
        OutputFormat::Csv => write_csv(&path, &records)?,
    }

    println!("Wrote {} review(s) to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_invocation() {
        let cli = Cli::parse_from([
            "revcrawl",
            "--source",
            "g2",
            "--company",
            "Acme Widgets",
            "--start-date",
            "2024-01-01",
            "--end-date",
            "2024-12-31",
            "--format",
            "csv",
            "--max-pages",
            "5",
        ]);
        assert_eq!(cli.source, "g2");
        assert_eq!(cli.company, "Acme Widgets");
        assert_eq!(cli.format, OutputFormat::Csv);
        assert_eq!(cli.max_pages, Some(5));
    }

    #[test]
    fn short_flags_work() {
        let cli = Cli::parse_from(["revcrawl", "-S", "trustpilot", "-c", "Acme"]);
        assert_eq!(cli.source, "trustpilot");
        assert_eq!(cli.company, "Acme");
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
