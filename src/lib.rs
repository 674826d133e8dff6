/*!
 * # udadash - Dental Practice UDA Pipeline
 *
 * A Rust library for classifying dental treatment plans and aggregating
 * NHS Units of Dental Activity (UDA) metrics from practice management
 * exports.
 *
 * ## Features
 *
 * - 🚀 **Fast Loading**: CSV ingestion with progress tracking and resilient parsing
 * - 🔧 **Easy to Use**: Simple builder pattern for loading the three practice exports
 * - 📊 **Dashboard Metrics**: Plan counts, UDA rollups per category and provider, trends
 * - 💾 **Export Formats**: JSON and CSV output of records, metrics and action tables
 * - 🛡️ **Type Safe**: Tri-state classification flags as sum types, never stringly coded
 * - ♻️ **Pure Pipeline**: (snapshot, filters) in, (classified table, metrics) out
 *
 * ## Quick Start
 *
 * ```no_run
 * use udadash::prelude::*;
 *
 * # fn main() -> Result<()> {
 * // Load the three practice exports from a directory
 * let dataset = PracticeDataset::from_directory("./data")?;
 *
 * // Run the pipeline over the full snapshot
 * let output = dataset.run(&FilterParams::new());
 *
 * println!(
 *     "{} classified rows, {} NHS UDAs completed",
 *     output.records.len(),
 *     output.metrics.nhs.completed
 * );
 * # Ok(())
 * # }
 * ```
 *
 * ## Loading Data
 *
 * ```no_run
 * # use udadash::prelude::*;
 * # fn main() -> Result<()> {
 * let dataset = PracticeDatasetBuilder::new()
 *     .treatment_plans_path("data/TreatmentPlans Data.csv")
 *     .nhs_plans_path("data/NHS Plans Data.csv")
 *     .claims_path("data/Claims Data.csv")
 *     .skip_invalid_records(true)
 *     .load()?;
 * # Ok(())
 * # }
 * ```
 *
 * ## Filtering and Metrics
 *
 * ```no_run
 * # use udadash::prelude::*;
 * # use chrono::NaiveDate;
 * # fn main() -> Result<()> {
 * # let dataset = PracticeDataset::from_directory("./data")?;
 * let params = FilterParams::date_window(
 *     NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
 *     NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
 * )
 * .with_account("ACC-1042");
 *
 * let output = dataset.run(&params);
 * println!("Failure rate: {:.1}%", output.metrics.breakdown.failure_rate);
 *
 * // Weekly UDA trend for one provider
 * let trend = udadash::trend::provider_trend(
 *     &output.records,
 *     "HM",
 *     udadash::trend::TrendMode::Weekly,
 * );
 * # Ok(())
 * # }
 * ```
 *
 * ## Exporting
 *
 * ```no_run
 * # use udadash::prelude::*;
 * # fn main() -> Result<()> {
 * # let dataset = PracticeDataset::from_directory("./data")?;
 * # let output = dataset.run(&FilterParams::new());
 * udadash::export::export_records_csv(&output.records, "classified.csv")?;
 * udadash::export::export_metrics_json(&output.metrics, "metrics.json")?;
 * # Ok(())
 * # }
 * ```
 */

// Re-export error types from root
pub use error::{UdaError, Result, ErrorContext, ExportFormat};

// Public modules
pub mod data_types;
pub mod normalize;
pub mod reader;
pub mod schema;
pub mod error;
pub mod classify;
pub mod metrics;
pub mod trend;
pub mod dataset;
pub mod export;
pub mod config;

/// Prelude module for convenient imports
///
/// Import everything you need with:
/// ```
/// use udadash::prelude::*;
/// ```
pub mod prelude {
    pub use crate::data_types::*;
    pub use crate::reader::PracticeReader;
    pub use crate::schema::*;
    pub use crate::error::{UdaError, Result};
    pub use crate::classify::{classify, filter_records};
    pub use crate::metrics::{MetricsBundle, action_table};
    pub use crate::trend::{provider_trend, TrendMode, TrendPeriod};
    pub use crate::dataset::{
        PracticeDataset, PracticeDatasetBuilder, DatasetStatistics, PipelineOutput,
    };
    pub use crate::config::ConfigBuilder;
    pub use crate::ExportFormat;
}

/// Practice policy constants
pub mod constants {
    use chrono::NaiveDate;

    /// Provider codes whose plans count as hygiene plans
    pub const HYGIENE_PROVIDER_CODES: &[&str] = &["MH", "RP", "MK"];

    /// The practice's NHS provider roster, in dashboard display order
    pub const NHS_PROVIDER_ROSTER: &[&str] = &["HM", "GA", "MJ", "MM", "LL", "RM"];

    /// Placeholder provider whose rows are excluded from every aggregate
    pub const ALL_PROVIDERS_PLACEHOLDER: &str = "All Providers";

    /// Literal the export writes when a plan has no completed codes
    pub const NO_CODES_COMPLETED_SENTINEL: &str = "No Codes Completed";

    /// Plan origin marker for trend-eligible plans
    pub const CREATED_IN_CARESTACK: &str = "Created in Carestack";

    /// Completion years before this are epoch or placeholder junk
    pub const MIN_COMPLETION_YEAR: i32 = 2007;

    /// Trend views only consider completions after this date
    pub const TREND_CUTOFF_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2024, 4, 1) {
        Some(d) => d,
        None => panic!("invalid cutoff date"),
    };

    /// Standard export file names produced by the practice management system
    pub const TREATMENT_PLANS_FILE: &str = "TreatmentPlans Data.csv";
    pub const NHS_PLANS_FILE: &str = "NHS Plans Data.csv";
    pub const CLAIMS_FILE: &str = "Claims Data.csv";

    /// UDA entitlement for a fee-band code; unknown codes carry no value
    pub fn band_uda_value(band: &str) -> Option<f64> {
        match band {
            "Band1" => Some(1.0),
            "Band2" => Some(3.0),
            "Band2b" => Some(5.0),
            "Band2c" => Some(7.0),
            "Band3" => Some(12.0),
            "Band4" => Some(1.2),
            _ => None,
        }
    }
}

/// Common recipes and utility functions
pub mod cookbook {
    use crate::constants::NHS_PROVIDER_ROSTER;
    use crate::prelude::*;
    use std::collections::HashMap;

    /// Count classified plans per provider, excluding rows without a
    /// primary provider
    pub fn plans_per_provider(records: &[UnifiedRecord]) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for record in records {
            let provider = record.plan_provider();
            if !provider.is_empty() {
                *counts.entry(provider.to_string()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// All records whose plan belongs to a hygienist
    pub fn hygiene_records(records: &[UnifiedRecord]) -> Vec<&UnifiedRecord> {
        records.iter().filter(|r| r.plan.hygiene.is_yes()).collect()
    }

    /// Weekly trend tables for every provider on the NHS roster
    pub fn roster_weekly_trends(
        records: &[UnifiedRecord],
    ) -> HashMap<String, Vec<TrendPeriod>> {
        NHS_PROVIDER_ROSTER
            .iter()
            .map(|p| {
                (
                    p.to_string(),
                    provider_trend(records, p, TrendMode::Weekly),
                )
            })
            .collect()
    }
}
