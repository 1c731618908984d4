//! Writing run output to disk as JSON or CSV.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::slug::slugify;
use crate::types::{ReviewRecord, Source};

pub fn write_json(path: &Path, records: &[ReviewRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let payload = serde_json::to_string_pretty(records)?;
    fs::write(path, payload)?;
    Ok(())
}

pub fn write_csv(path: &Path, records: &[ReviewRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "source",
        "company_name",
        "title",
        "review_text",
        "date",
        "rating",
        "reviewer_name",
        "scraped_at",
    ])?;
    for record in records {
        let rating = record.rating.map(|r| r.to_string()).unwrap_or_default();
        let scraped_at = record.scraped_at.to_rfc3339();
        writer.write_record([
            record.source.as_str(),
            record.company_name.as_str(),
            record.title.as_str(),
            record.review_text.as_str(),
            record.date.as_str(),
            rating.as_str(),
            record.reviewer_name.as_deref().unwrap_or(""),
            scraped_at.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// `data/{source}_{company-slug}_{start}_{end}.{ext}`, with placeholders
/// for unset pieces so runs never clobber each other silently.
pub fn default_output_path(
    source: Source,
    company_name: &str,
    start_date: Option<&str>,
    end_date: Option<&str>,
    ext: &str,
) -> PathBuf {
    let company = slugify(company_name);
    let company = if company.is_empty() { "company".to_string() } else { company };
    PathBuf::from("data").join(format!(
        "{}_{}_{}_{}.{ext}",
        source,
        company,
        start_date.unwrap_or("start"),
        end_date.unwrap_or("end"),
    ))
}
