/*!
 * Schema definitions for the practice export files
 *
 * Declares the required columns of each of the three CSV exports and
 * resolves them to indices in the file actually supplied. Unlike a fixed
 * national export, practice CSVs can carry extra or reordered columns, so
 * validation is by name: every required column must be present, anything
 * else is ignored.
 */

use std::collections::HashMap;

use crate::{Result, UdaError};

/// Resolved column positions for one file, keyed by required column name
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    indices: HashMap<&'static str, usize>,
}

impl ColumnIndex {
    pub fn get(&self, column: &str) -> Option<usize> {
        self.indices.get(column).copied()
    }

    /// Index of a required column. The schema validated presence up front,
    /// so a miss here is a programming error surfaced as DataValidation.
    pub fn require(&self, column: &str) -> Result<usize> {
        self.indices.get(column).copied().ok_or_else(|| UdaError::DataValidation {
            message: format!("Column '{}' was not resolved during header validation", column),
            field: Some(column.to_string()),
            value: None,
            context: Default::default(),
        })
    }
}

fn resolve_headers(
    file_kind: &str,
    required: &[&'static str],
    headers: &[String],
) -> Result<ColumnIndex> {
    let mut indices = HashMap::new();
    for &column in required {
        match headers.iter().position(|h| h == column) {
            Some(idx) => {
                indices.insert(column, idx);
            }
            None => return Err(UdaError::missing_column(file_kind, column)),
        }
    }
    Ok(ColumnIndex { indices })
}

/// Treatment plans export schema
pub struct TreatmentPlanSchema;

impl TreatmentPlanSchema {
    pub fn column_names() -> Vec<&'static str> {
        vec![
            "TreatmentPlanID",
            "Description",
            "Payor",
            "TreatmentProviders",
            "FirstCompletion",
            "LastCompletion",
            "CompletedTreatments",
            "TotalTreatments",
            "TotalFee",
            "CompletedTreatmentsFee",
            "CreatedDate",
            "CreatedIn",
        ]
    }

    pub fn validate_headers(headers: &[String]) -> Result<ColumnIndex> {
        resolve_headers("Treatment plans", &Self::column_names(), headers)
    }
}

/// NHS plan details export schema
pub struct NhsPlanSchema;

impl NhsPlanSchema {
    pub fn column_names() -> Vec<&'static str> {
        vec![
            "TreatmentPlanID",
            "TotalNHSCodes",
            "NHSFee",
            "TotalTreatments",
        ]
    }

    pub fn validate_headers(headers: &[String]) -> Result<ColumnIndex> {
        resolve_headers("NHS plans", &Self::column_names(), headers)
    }
}

/// Claims export schema
///
/// The claims file spells the join key `TreatmentPlanId` (lowercase d); the
/// reader renames it to match the other two tables on load.
pub struct ClaimsSchema;

impl ClaimsSchema {
    pub const PLAN_ID_COLUMN: &'static str = "TreatmentPlanId";

    pub fn column_names() -> Vec<&'static str> {
        vec![
            Self::PLAN_ID_COLUMN,
            "AccountID",
            "ClaimStatus",
            "UDA",
            "UdaConfirmed",
            "Band",
        ]
    }

    pub fn validate_headers(headers: &[String]) -> Result<ColumnIndex> {
        resolve_headers("Claims", &Self::column_names(), headers)
    }
}
