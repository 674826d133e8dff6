/*!
 * CSV readers for the practice export files
 *
 * Loads the three exports (treatment plans, NHS plan details, claims) into
 * structured records, validating headers against the declared schemas,
 * normalizing derived fields on the way in, and optionally skipping rows
 * that fail to parse.
 */

use std::fs::File;
use std::path::Path;
use std::time::Instant;
use csv::ReaderBuilder;

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    Result, UdaError, ErrorContext,
    data_types::*,
    normalize,
    schema::*,
};

/// Reader for the practice CSV exports
pub struct PracticeReader {
    /// Whether to skip invalid records (true) or fail on first error (false)
    skip_invalid_records: bool,
    /// Whether to show progress bars for larger files
    #[cfg(feature = "progress")]
    show_progress_bar: bool,
}

impl Default for PracticeReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PracticeReader {
    /// Create a new reader with default settings
    pub fn new() -> Self {
        Self {
            skip_invalid_records: false,
            #[cfg(feature = "progress")]
            show_progress_bar: true,
        }
    }

    /// Enable or disable skipping invalid records
    pub fn with_skip_invalid_records(mut self, skip: bool) -> Self {
        self.skip_invalid_records = skip;
        self
    }

    #[cfg(feature = "progress")]
    /// Enable or disable the progress bar
    pub fn with_progress_bar(mut self, show: bool) -> Self {
        self.show_progress_bar = show;
        self
    }

    /// Load the treatment plans export
    pub fn load_treatment_plans<P: AsRef<Path>>(&self, path: P) -> Result<Vec<TreatmentPlanRecord>> {
        self.load_file(path.as_ref(), "treatment plan", TreatmentPlanSchema::validate_headers, |columns, record, line| {
            Self::parse_treatment_plan(columns, record, line)
        })
    }

    /// Load the NHS plan details export
    pub fn load_nhs_plans<P: AsRef<Path>>(&self, path: P) -> Result<Vec<NhsPlanInfo>> {
        self.load_file(path.as_ref(), "NHS plan", NhsPlanSchema::validate_headers, |columns, record, line| {
            Self::parse_nhs_plan(columns, record, line)
        })
    }

    /// Load the claims export. The claims join key `TreatmentPlanId` is
    /// renamed to the shared `TreatmentPlanID` spelling on the way in.
    pub fn load_claims<P: AsRef<Path>>(&self, path: P) -> Result<Vec<ClaimRecord>> {
        self.load_file(path.as_ref(), "claim", ClaimsSchema::validate_headers, |columns, record, line| {
            Self::parse_claim(columns, record, line)
        })
    }

    /// Shared load loop: open, validate headers, parse row by row with the
    /// configured invalid-record policy.
    fn load_file<T, V, F>(
        &self,
        path: &Path,
        kind: &str,
        validate: V,
        parse: F,
    ) -> Result<Vec<T>>
    where
        V: Fn(&[String]) -> Result<ColumnIndex>,
        F: Fn(&ColumnIndex, &csv::StringRecord, usize) -> Result<T>,
    {
        if !path.exists() {
            return Err(UdaError::file_not_found_with_suggestion(path.to_path_buf()));
        }

        let file = File::open(path)?;
        #[cfg(feature = "progress")]
        let file_size = file.metadata()?.len();

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(file);

        // Header validation doubles as column resolution: parsing cannot
        // proceed without it, so a missing required column is always fatal.
        let headers: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
        let columns = validate(&headers)?;

        let mut records = Vec::new();
        let mut invalid_count = 0usize;
        let start_time = Instant::now();

        #[cfg(feature = "progress")]
        let progress_bar = if self.show_progress_bar {
            let pb = ProgressBar::new(file_size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                    .unwrap()
                    .progress_chars("#>-")
            );
            Some(pb)
        } else {
            None
        };

        for (idx, result) in reader.records().enumerate() {
            let line = idx + 2; // +2 for header and 0-based index

            #[cfg(feature = "progress")]
            if let Some(ref pb) = progress_bar {
                if let Some(position) = result.as_ref().ok().and_then(|r| r.position()) {
                    pb.set_position(position.byte());
                }
            }

            let csv_record = match result {
                Ok(record) => record,
                Err(e) => {
                    let error = UdaError::CsvParse {
                        message: format!("CSV error: {}", e),
                        line: Some(line),
                        column: None,
                        context: ErrorContext {
                            file_path: Some(path.to_path_buf()),
                            line_number: Some(line),
                            ..Default::default()
                        },
                    };
                    if self.skip_invalid_records {
                        invalid_count += 1;
                        if invalid_count <= 10 {
                            eprintln!("Warning: {}", error);
                        }
                        continue;
                    }
                    return Err(error);
                }
            };

            match parse(&columns, &csv_record, line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    if self.skip_invalid_records {
                        invalid_count += 1;
                        if invalid_count <= 10 {
                            eprintln!("Warning: Skipping invalid {} record at line {}: {}", kind, line, e);
                        }
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        #[cfg(feature = "progress")]
        if let Some(pb) = progress_bar {
            pb.finish_and_clear();
        }

        let elapsed = start_time.elapsed();
        println!(
            "Loaded {} {} records in {:.2}s",
            records.len(),
            kind,
            elapsed.as_secs_f64()
        );
        if invalid_count > 0 {
            println!("Skipped {} invalid {} records", invalid_count, kind);
        }

        Ok(records)
    }

    fn parse_treatment_plan(
        columns: &ColumnIndex,
        record: &csv::StringRecord,
        line: usize,
    ) -> Result<TreatmentPlanRecord> {
        let field = |name: &str| -> Result<&str> {
            Ok(record.get(columns.require(name)?).unwrap_or("").trim())
        };

        let plan_id_raw = field("TreatmentPlanID")?;
        if plan_id_raw.is_empty() {
            return Err(missing_field("TreatmentPlanID", line));
        }
        let plan_id = PlanId::new(plan_id_raw);

        let treatment_providers = field("TreatmentProviders")?.to_string();
        let plan_provider = normalize::plan_provider(&treatment_providers);
        let first_completed = normalize::parse_completion_date(field("FirstCompletion")?);
        let last_completed = normalize::parse_completion_date(field("LastCompletion")?);
        let hygiene = normalize::hygiene_flag(&plan_provider);

        Ok(TreatmentPlanRecord {
            description: optional_string(field("Description")?),
            payor: optional_string(field("Payor")?),
            completed_treatments: required_f64(field("CompletedTreatments")?, "CompletedTreatments", line)?,
            total_treatments: required_f64(field("TotalTreatments")?, "TotalTreatments", line)?,
            total_fee: required_f64(field("TotalFee")?, "TotalFee", line)?,
            completed_treatments_fee: required_f64(field("CompletedTreatmentsFee")?, "CompletedTreatmentsFee", line)?,
            created_date: normalize::parse_flexible_date(field("CreatedDate")?),
            created_in: optional_string(field("CreatedIn")?),
            plan_id,
            treatment_providers,
            plan_provider,
            first_completed,
            last_completed,
            hygiene,
        })
    }

    fn parse_nhs_plan(
        columns: &ColumnIndex,
        record: &csv::StringRecord,
        line: usize,
    ) -> Result<NhsPlanInfo> {
        let field = |name: &str| -> Result<&str> {
            Ok(record.get(columns.require(name)?).unwrap_or("").trim())
        };

        let plan_id_raw = field("TreatmentPlanID")?;
        if plan_id_raw.is_empty() {
            return Err(missing_field("TreatmentPlanID", line));
        }

        Ok(NhsPlanInfo {
            plan_id: PlanId::new(plan_id_raw),
            total_nhs_codes: optional_f64(field("TotalNHSCodes")?),
            nhs_fee: optional_f64(field("NHSFee")?),
            total_treatments: optional_f64(field("TotalTreatments")?),
        })
    }

    fn parse_claim(
        columns: &ColumnIndex,
        record: &csv::StringRecord,
        line: usize,
    ) -> Result<ClaimRecord> {
        let field = |name: &str| -> Result<&str> {
            Ok(record.get(columns.require(name)?).unwrap_or("").trim())
        };

        let plan_id_raw = field(ClaimsSchema::PLAN_ID_COLUMN)?;
        if plan_id_raw.is_empty() {
            return Err(missing_field(ClaimsSchema::PLAN_ID_COLUMN, line));
        }

        Ok(ClaimRecord {
            plan_id: PlanId::new(plan_id_raw),
            account_id: optional_string(field("AccountID")?),
            claim_status: optional_string(field("ClaimStatus")?)
                .map(|s| ClaimStatus::from_code(&s)),
            uda: optional_f64(field("UDA")?),
            uda_confirmed: optional_f64(field("UdaConfirmed")?),
            band: optional_string(field("Band")?).map(|s| Band::from_code(&s)),
        })
    }
}

fn optional_string(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Blank cells become None; anything non-blank must parse as a number
fn optional_f64(raw: &str) -> Option<f64> {
    if raw.is_empty() {
        None
    } else {
        raw.parse::<f64>().ok()
    }
}

fn required_f64(raw: &str, field_name: &str, line: usize) -> Result<f64> {
    raw.parse::<f64>().map_err(|_| UdaError::DataValidation {
        message: format!("Field '{}' is not numeric: '{}'", field_name, raw),
        field: Some(field_name.to_string()),
        value: Some(raw.to_string()),
        context: ErrorContext {
            line_number: Some(line),
            ..Default::default()
        },
    })
}

fn missing_field(field_name: &str, line: usize) -> UdaError {
    UdaError::DataValidation {
        message: format!("Missing required field: {}", field_name),
        field: Some(field_name.to_string()),
        value: None,
        context: ErrorContext {
            line_number: Some(line),
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn quiet_reader() -> PracticeReader {
        #[cfg(feature = "progress")]
        return PracticeReader::new().with_progress_bar(false);
        #[cfg(not(feature = "progress"))]
        PracticeReader::new()
    }

    #[test]
    fn test_load_treatment_plans_normalizes_fields() {
        let file = write_csv(
            "TreatmentPlanID,Description,Payor,TreatmentProviders,FirstCompletion,LastCompletion,CompletedTreatments,TotalTreatments,TotalFee,CompletedTreatmentsFee,CreatedDate,CreatedIn\n\
             TP1,Checkup,NHS,HM;GA,2024-05-01,No Codes Completed,2,4,120.0,60.0,2024-04-01,Created in Carestack\n",
        );
        let plans = quiet_reader().load_treatment_plans(file.path()).unwrap();
        assert_eq!(plans.len(), 1);
        let plan = &plans[0];
        assert_eq!(plan.plan_provider, "HM");
        assert!(plan.first_completed.is_known());
        assert_eq!(plan.last_completed, CompletionDate::NoCodes);
        assert_eq!(plan.hygiene, Flag::No);
    }

    #[test]
    fn test_nhs_blank_cells_become_none() {
        let file = write_csv(
            "TreatmentPlanID,TotalNHSCodes,NHSFee,TotalTreatments\n\
             TP1,,25.0,10\n",
        );
        let rows = quiet_reader().load_nhs_plans(file.path()).unwrap();
        assert_eq!(rows[0].total_nhs_codes, None);
        assert_eq!(rows[0].nhs_fee, Some(25.0));
        assert_eq!(rows[0].total_treatments, Some(10.0));
    }

    #[test]
    fn test_claims_key_renamed_on_load() {
        let file = write_csv(
            "TreatmentPlanId,AccountID,ClaimStatus,UDA,UdaConfirmed,Band\n\
             TP1,ACC9,Submitted,3,3,Band2\n",
        );
        let claims = quiet_reader().load_claims(file.path()).unwrap();
        assert_eq!(claims[0].plan_id, PlanId::new("TP1"));
        assert_eq!(claims[0].claim_status, Some(ClaimStatus::Submitted));
        assert_eq!(claims[0].band, Some(Band::Band2));
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let file = write_csv("TreatmentPlanId,AccountID,ClaimStatus,UDA,UdaConfirmed\nTP1,A,Queued,1,1\n");
        let err = quiet_reader().load_claims(file.path()).unwrap_err();
        assert!(matches!(err, UdaError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_skip_invalid_records() {
        let file = write_csv(
            "TreatmentPlanID,Description,Payor,TreatmentProviders,FirstCompletion,LastCompletion,CompletedTreatments,TotalTreatments,TotalFee,CompletedTreatmentsFee,CreatedDate,CreatedIn\n\
             TP1,,NHS,HM,2024-05-01,2024-05-02,not-a-number,4,120.0,60.0,,\n\
             TP2,,NHS,GA,2024-05-01,2024-05-02,2,4,120.0,60.0,,\n",
        );
        // Strict mode fails on the first bad row
        assert!(quiet_reader().load_treatment_plans(file.path()).is_err());
        // Lenient mode keeps the good row
        let plans = quiet_reader()
            .with_skip_invalid_records(true)
            .load_treatment_plans(file.path())
            .unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].plan_id, PlanId::new("TP2"));
    }
}
