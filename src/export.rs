/*!
 * Export of classified records and metrics
 *
 * Writes the pipeline outputs to CSV or JSON for use outside the
 * dashboard. The CSV record export carries the per-plan columns the
 * presentation layer shows, with the tri-state flags in their "1"/"0"/""
 * encoding.
 */

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::data_types::{OptionDisplay, UnifiedRecord};
use crate::error::ExportFormat;
use crate::metrics::{ActionTableRow, MetricsBundle};
use crate::{Result, UdaError};

fn export_error(format: ExportFormat, message: String) -> UdaError {
    UdaError::Export {
        message,
        format,
        suggestion: Some("Check that the output path is writable.".to_string()),
    }
}

const RECORD_HEADERS: &[&str] = &[
    "TreatmentPlanID",
    "AccountID",
    "PlanProvider",
    "Band",
    "ClaimStatus",
    "FirstCompletedDate",
    "LastCompletedDate",
    "isMixed",
    "isPNHS",
    "isFullPrivate",
    "isNHS",
    "inProgress",
    "Complete",
    "PendingFee",
    "isClaimFailed",
    "isClaimQueued",
    "plansThatRequireAction",
    "whatAction",
    "UDAs",
];

fn optional_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Export the classified per-plan table as CSV
pub fn export_records_csv<P: AsRef<Path>>(records: &[UnifiedRecord], path: P) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())
        .map_err(|e| export_error(ExportFormat::Csv, e.to_string()))?;

    writer
        .write_record(RECORD_HEADERS)
        .map_err(|e| export_error(ExportFormat::Csv, e.to_string()))?;

    for r in records {
        let row = [
            r.plan.plan_id.to_string(),
            r.account_id().unwrap_or("").to_string(),
            r.plan_provider().to_string(),
            r.band().map(|b| b.to_string()).unwrap_or_default(),
            r.claim_status().cloned().option_display(),
            r.plan
                .first_completed
                .as_date()
                .map(|d| d.to_string())
                .unwrap_or_default(),
            r.plan
                .last_completed
                .as_date()
                .map(|d| d.to_string())
                .unwrap_or_default(),
            r.is_mixed.to_string(),
            r.is_pnhs.to_string(),
            r.is_full_private.to_string(),
            r.is_nhs.to_string(),
            r.in_progress.to_string(),
            r.complete.to_string(),
            optional_number(r.pending_fee),
            r.is_claim_failed.to_string(),
            r.is_claim_queued.to_string(),
            r.requires_action.to_string(),
            r.what_action.option_display(),
            optional_number(r.udas),
        ];
        writer
            .write_record(&row)
            .map_err(|e| export_error(ExportFormat::Csv, e.to_string()))?;
    }

    writer
        .flush()
        .map_err(|e| export_error(ExportFormat::Csv, e.to_string()))?;
    Ok(())
}

/// Export the classified per-plan table as JSON
pub fn export_records_json<P: AsRef<Path>>(records: &[UnifiedRecord], path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}

/// Export the full metrics bundle as JSON.
///
/// Non-finite rates (NaN from an empty selection) serialize as null.
pub fn export_metrics_json<P: AsRef<Path>>(metrics: &MetricsBundle, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, metrics)?;
    writer.flush()?;
    Ok(())
}

/// Export the operator action table as CSV
pub fn export_action_table_csv<P: AsRef<Path>>(rows: &[ActionTableRow], path: P) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())
        .map_err(|e| export_error(ExportFormat::Csv, e.to_string()))?;

    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| export_error(ExportFormat::Csv, e.to_string()))?;
    }
    writer
        .flush()
        .map_err(|e| export_error(ExportFormat::Csv, e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify;
    use crate::data_types::*;
    use crate::metrics;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn records() -> Vec<UnifiedRecord> {
        let plan = TreatmentPlanRecord {
            plan_id: PlanId::new("TP1"),
            description: None,
            payor: None,
            treatment_providers: "HM".to_string(),
            completed_treatments: 4.0,
            total_treatments: 4.0,
            total_fee: 100.0,
            completed_treatments_fee: 100.0,
            created_date: None,
            created_in: None,
            plan_provider: "HM".to_string(),
            first_completed: CompletionDate::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
            last_completed: CompletionDate::Date(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()),
            hygiene: Flag::No,
        };
        let mut nhs_by_plan = HashMap::new();
        nhs_by_plan.insert(
            PlanId::new("TP1"),
            NhsPlanInfo {
                plan_id: PlanId::new("TP1"),
                total_nhs_codes: Some(4.0),
                nhs_fee: None,
                total_treatments: Some(4.0),
            },
        );
        classify::classify(&[plan], &nhs_by_plan, &HashMap::new())
    }

    #[test]
    fn test_csv_export_flag_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.csv");
        export_records_csv(&records(), &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert!(lines.next().unwrap().starts_with("TreatmentPlanID,"));
        let row = lines.next().unwrap();
        // Pure NHS, complete, no claim raised
        assert!(row.contains("TP1"));
        assert!(row.contains("Claim Not Raised"));
        // No claim joined, so claim flags are the empty sentinel
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields[RECORD_HEADERS.iter().position(|h| *h == "isPNHS").unwrap()], "1");
        assert_eq!(
            fields[RECORD_HEADERS.iter().position(|h| *h == "isClaimFailed").unwrap()],
            ""
        );
    }

    #[test]
    fn test_metrics_json_with_nan_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let bundle = metrics::MetricsBundle::compute(&[]);
        export_metrics_json(&bundle, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert!(value["nhs"]["failure_rate"].is_null());
    }

    #[test]
    fn test_action_table_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.csv");
        let rows = metrics::action_table(&records());
        assert_eq!(rows.len(), 1);
        export_action_table_csv(&rows, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("plan_id"));
        assert!(contents.contains("Claim Not Raised"));
    }
}
