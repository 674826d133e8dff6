/*!
 * Time-bucketed UDA trends for a single provider
 *
 * Restricts the unified set to one provider's Carestack-created plans
 * completed after the reporting cutoff, then buckets them into weekly or
 * monthly periods and sums the four UDA metrics per period.
 */

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::constants::{CREATED_IN_CARESTACK, TREND_CUTOFF_DATE};
use crate::data_types::UnifiedRecord;

/// Number of weekly bins in the weekly view
const WEEKLY_BIN_COUNT: i64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendMode {
    Weekly,
    Monthly,
}

/// One period of the trend table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPeriod {
    pub label: String,
    /// Band-entitled UDAs on completed NHS rows
    pub total_udas: f64,
    /// Claimed UDA amounts on completed NHS rows
    pub claimed_udas: f64,
    /// Confirmed-successful UDAs on completed NHS rows
    pub successful_udas: f64,
    /// Claimed UDA amounts on NHS rows with a failed claim
    pub failed_udas: f64,
}

impl TrendPeriod {
    fn empty(label: String) -> Self {
        TrendPeriod {
            label,
            total_udas: 0.0,
            claimed_udas: 0.0,
            successful_udas: 0.0,
            failed_udas: 0.0,
        }
    }

    fn accumulate(&mut self, record: &UnifiedRecord) {
        let nhs = record.is_nhs.is_nhs();
        let complete = record.complete.is_yes();
        if nhs && complete {
            if let Some(udas) = record.udas {
                self.total_udas += udas;
            }
            if let Some(uda) = record.claim_uda() {
                self.claimed_udas += uda;
            }
            if let Some(confirmed) = record.claim_uda_confirmed() {
                self.successful_udas += confirmed;
            }
        }
        if nhs && record.is_claim_failed.is_yes() {
            if let Some(uda) = record.claim_uda() {
                self.failed_udas += uda;
            }
        }
    }
}

/// Select the provider's trend-eligible rows, sorted by last completion
fn eligible_records<'a>(
    records: &'a [UnifiedRecord],
    provider: &str,
) -> Vec<(NaiveDate, &'a UnifiedRecord)> {
    let mut rows: Vec<(NaiveDate, &UnifiedRecord)> = records
        .iter()
        .filter(|r| r.plan_provider() == provider)
        .filter(|r| r.plan.created_in.as_deref() == Some(CREATED_IN_CARESTACK))
        .filter_map(|r| r.plan.last_completed.as_date().map(|d| (d, r)))
        .filter(|(d, _)| *d > TREND_CUTOFF_DATE)
        .collect();
    rows.sort_by_key(|(d, _)| *d);
    rows
}

/// Weekly view: eight consecutive seven-day bins starting at the earliest
/// eligible completion date. Completions past the eighth week fall outside
/// every bin and are excluded.
fn weekly_trend(rows: &[(NaiveDate, &UnifiedRecord)]) -> Vec<TrendPeriod> {
    let min_date = match rows.first() {
        Some((d, _)) => *d,
        None => return Vec::new(),
    };
    let mut periods: Vec<TrendPeriod> = (1..=WEEKLY_BIN_COUNT)
        .map(|week| TrendPeriod::empty(format!("Week {}", week)))
        .collect();
    for (date, record) in rows {
        let bin = (*date - min_date).num_days() / 7;
        if bin < WEEKLY_BIN_COUNT {
            periods[bin as usize].accumulate(record);
        }
    }
    periods
}

/// Monthly view: one period per "Month Year" label, in calendar order
/// rather than label order.
fn monthly_trend(rows: &[(NaiveDate, &UnifiedRecord)]) -> Vec<TrendPeriod> {
    let mut keyed: Vec<((i32, u32), TrendPeriod)> = Vec::new();
    for (date, record) in rows {
        let key = (date.year(), date.month());
        let idx = match keyed.iter().position(|(k, _)| *k == key) {
            Some(idx) => idx,
            None => {
                keyed.push((key, TrendPeriod::empty(date.format("%B %Y").to_string())));
                keyed.len() - 1
            }
        };
        keyed[idx].1.accumulate(record);
    }
    keyed.sort_by_key(|(k, _)| *k);
    keyed.into_iter().map(|(_, p)| p).collect()
}

/// Compute the trend table for one provider in the chosen mode.
///
/// Returns an empty table when the provider has no eligible rows.
pub fn provider_trend(
    records: &[UnifiedRecord],
    provider: &str,
    mode: TrendMode,
) -> Vec<TrendPeriod> {
    let rows = eligible_records(records, provider);
    match mode {
        TrendMode::Weekly => weekly_trend(&rows),
        TrendMode::Monthly => monthly_trend(&rows),
    }
}
