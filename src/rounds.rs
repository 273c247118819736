use crate::config::DatasetConfig;
use crate::error::{ExportError, Result};
use crate::table::{convert_empty_fields, field, Table};
use crate::types::Row;

const RAISED_AMOUNT_COL: &str = "raised_amount_usd";

/// All funding rounds recorded against `company_id`, in file order, with
/// sentinel fields normalized.
pub fn investment_rounds(config: &DatasetConfig, company_id: &str) -> Result<Vec<Row>> {
    let mut table = Table::open(
        &config.funding_rounds_path(),
        &["object_id", RAISED_AMOUNT_COL],
    )?;
    let mut rounds = Vec::new();
    for row in table.rows() {
        let mut row = row?;
        if field(&row, "object_id") == Some(company_id) {
            convert_empty_fields(&mut row);
            rounds.push(row);
        }
    }
    Ok(rounds)
}

/// Total disclosed investment: the sum of non-null `raised_amount_usd`
/// values, with nulls contributing nothing. A non-null amount that fails
/// integer parsing means the dump itself is corrupt, so it aborts the run
/// instead of being silently skipped.
pub fn total_investment_usd(company_id: &str, rounds: &[Row]) -> Result<i64> {
    let mut total = 0i64;
    for round in rounds {
        if let Some(raw) = field(round, RAISED_AMOUNT_COL) {
            let amount: i64 = raw.trim().parse().map_err(|_| ExportError::BadAmount {
                company_id: company_id.to_string(),
                value: raw.to_string(),
            })?;
            total += amount;
        }
    }
    Ok(total)
}
