use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::DatasetConfig;
use crate::error::{ExportError, Result};
use crate::people::people_for_company;
use crate::resume;
use crate::rounds::{investment_rounds, total_investment_usd};
use crate::table::{convert_empty_fields, field, Table};
use crate::types::{CompanyRecord, Row};

/// Filter and output knobs for one export run.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Minimum total disclosed funding for a company to be emitted.
    pub min_investments_usd: i64,
    /// Stop after this many companies; `None` runs to end of input.
    pub num_companies_cap: Option<usize>,
    /// Accepted `category_code` values; empty accepts everything.
    pub category_codes: Vec<String>,
}

/// Drives the whole pipeline: streams the entity table once and, for each
/// qualifying company, joins in funding rounds and people and appends one
/// JSON line to the output.
pub struct Exporter {
    config: DatasetConfig,
    options: ExportOptions,
}

impl Exporter {
    pub fn new(config: DatasetConfig, options: ExportOptions) -> Self {
        Self { config, options }
    }

    /// Stream the entity table and append one JSON line per qualifying
    /// company. With `keep_going`, continue a previous partial run from
    /// the last completed line instead of starting the output over.
    /// Returns the number of companies written by this run.
    pub fn run(&self, out_file: &Path, keep_going: bool) -> Result<usize> {
        let checkpoint = if keep_going {
            let checkpoint = resume::last_company_id(out_file)?;
            resume::seal_partial_tail(out_file)?;
            match &checkpoint {
                Some(id) => info!(checkpoint = %id, "resuming after last completed company"),
                None => info!("no previous output found, starting from scratch"),
            }
            checkpoint
        } else {
            ensure_parent(out_file)?;
            File::create(out_file)?;
            None
        };

        let mut table = Table::open(&self.config.objects_path(), &["id", "entity_type"])?;
        let start = Instant::now();
        let mut found = 0usize;
        let mut skipping = checkpoint.is_some();

        for (i, row) in table.rows().enumerate() {
            let row = row?;
            if i % 1000 == 0 {
                info!(
                    rows_scanned = i,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "scanning entity table"
                );
            }
            if Some(found) == self.options.num_companies_cap {
                break;
            }
            if skipping {
                // Discard everything through the checkpoint row inclusive.
                if field(&row, "id") == checkpoint.as_deref() {
                    skipping = false;
                }
                continue;
            }
            if !self.accepts(&row) {
                continue;
            }
            let company_id = match field(&row, "id") {
                Some(id) => id.to_string(),
                None => continue,
            };

            let rounds = investment_rounds(&self.config, &company_id)?;
            let total = total_investment_usd(&company_id, &rounds)?;
            if total < self.options.min_investments_usd {
                debug!(company = %company_id, total_usd = total, "below investment threshold");
                continue;
            }

            let people = people_for_company(&self.config, &company_id)?;
            let mut company = row;
            convert_empty_fields(&mut company);
            let record = CompanyRecord {
                company,
                people,
                funding_rounds: rounds,
            };
            append_record(out_file, &record)?;

            found += 1;
            info!(
                companies_found = found,
                company = %company_id,
                total_usd = total,
                elapsed_secs = start.elapsed().as_secs_f64(),
                "company exported"
            );
        }

        if skipping {
            warn!("resume checkpoint never matched an entity row, nothing exported");
        }
        Ok(found)
    }

    /// The filter predicate: a top-level company row in an accepted
    /// category.
    fn accepts(&self, row: &Row) -> bool {
        let id = field(row, "id").unwrap_or("");
        let is_company =
            field(row, "entity_type").map(str::trim) == Some("Company") || id.starts_with("c:");
        if !is_company {
            return false;
        }
        if !self.options.category_codes.is_empty() {
            let category = field(row, "category_code").unwrap_or("");
            if !self.options.category_codes.iter().any(|c| c == category) {
                return false;
            }
        }
        // Top-level only: a parent_id other than the sentinel marks a
        // child of another entity.
        match field(row, "parent_id") {
            None => true,
            Some(parent) => parent.trim() == "N",
        }
    }

    /// Fetch a single company's raw entity-table row by its numeric id
    /// (`10` looks up `c:10`).
    pub fn company(&self, numeric_id: &str) -> Result<Row> {
        let wanted = format!("c:{}", numeric_id);
        let mut table = Table::open(&self.config.objects_path(), &["id"])?;
        for row in table.rows() {
            let row = row?;
            if field(&row, "id") == Some(wanted.as_str()) {
                return Ok(row);
            }
        }
        Err(ExportError::CompanyNotFound(wanted))
    }
}

/// One record, one line, one independent append. The open/write/flush
/// cycle stays per-record so a crash can lose at most the line in flight,
/// which the resume scan tolerates.
fn append_record(path: &Path, record: &CompanyRecord) -> Result<()> {
    ensure_parent(path)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let line = serde_json::to_string(record)?;
    writeln!(file, "{}", line)?;
    file.flush()?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
