/*!
 * Data type definitions for dental practice pipeline records
 *
 * This module contains type-safe representations of the three source tables
 * (treatment plans, NHS plan details, claims) and the unified, classified
 * record the aggregation layer consumes.
 */

use serde::{Deserialize, Serialize};
use chrono::NaiveDate;

use crate::constants::band_uda_value;

/// Treatment plan identifier - the join key across all three source tables
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(pub String);

impl PlanId {
    pub fn new(id: impl Into<String>) -> Self {
        PlanId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tri-state classification flag.
///
/// The source data distinguishes "definitely not" (0), "definitely yes" (1)
/// and "not classifiable" (empty, when the plan has no provider). The three
/// states must never be collapsed: `Unclassified` rows are excluded from
/// counts and sums rather than treated as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flag {
    Unclassified,
    No,
    Yes,
}

impl Flag {
    pub fn from_bool(value: bool) -> Self {
        if value { Flag::Yes } else { Flag::No }
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, Flag::Yes)
    }

    pub fn is_unclassified(&self) -> bool {
        matches!(self, Flag::Unclassified)
    }
}

impl std::fmt::Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Flag::Unclassified => write!(f, ""),
            Flag::No => write!(f, "0"),
            Flag::Yes => write!(f, "1"),
        }
    }
}

/// NHS membership derived from the mixed and pure-NHS flags.
///
/// The source computes `isNHS = isMixed + isPNHS`, so the value is a small
/// count rather than a boolean: 0 (fully private), 1 (mixed or pure NHS), or
/// 2 if both flags were somehow set. `Value(2)` is unreachable while the
/// payment-category flags stay mutually exclusive; it is representable so a
/// defect in that invariant shows up in the data instead of panicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NhsCount {
    Unclassified,
    Value(u8),
}

impl NhsCount {
    /// Combine the mixed and pure-NHS flags.
    ///
    /// Propagates `Unclassified` exactly when the pure-NHS flag is
    /// unclassified, matching the source rule (which inspects only `isPNHS`
    /// before summing).
    pub fn from_flags(is_mixed: Flag, is_pnhs: Flag) -> Self {
        if is_pnhs.is_unclassified() {
            return NhsCount::Unclassified;
        }
        let m = if is_mixed.is_yes() { 1 } else { 0 };
        let p = if is_pnhs.is_yes() { 1 } else { 0 };
        NhsCount::Value(m + p)
    }

    /// Whether this record is an NHS plan. Only ever compared with `== 1`.
    pub fn is_nhs(&self) -> bool {
        matches!(self, NhsCount::Value(1))
    }
}

impl std::fmt::Display for NhsCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NhsCount::Unclassified => write!(f, ""),
            NhsCount::Value(v) => write!(f, "{}", v),
        }
    }
}

/// A completion date column value.
///
/// The export writes the literal sentinel "No Codes Completed" when a plan
/// has no completed codes; any other unparseable string is a distinct
/// invalid state. Both count as "unknown" when filtering by date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionDate {
    /// The "No Codes Completed" sentinel
    NoCodes,
    /// A date string that failed to parse
    Invalid,
    Date(NaiveDate),
}

impl CompletionDate {
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CompletionDate::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, CompletionDate::Date(_))
    }
}

/// Claim lifecycle status as reported by the claims export
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimStatus {
    Submitted,
    Queued,
    Invalid,
    Failed,
    Other(String),
}

impl ClaimStatus {
    pub fn from_code(code: &str) -> Self {
        match code {
            "Submitted" => ClaimStatus::Submitted,
            "Queued" => ClaimStatus::Queued,
            "Invalid" => ClaimStatus::Invalid,
            "Failed" => ClaimStatus::Failed,
            other => ClaimStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ClaimStatus::Submitted => "Submitted",
            ClaimStatus::Queued => "Queued",
            ClaimStatus::Invalid => "Invalid",
            ClaimStatus::Failed => "Failed",
            ClaimStatus::Other(s) => s,
        }
    }

    /// Invalid and Failed claims both count as failed downstream
    pub fn is_failed(&self) -> bool {
        matches!(self, ClaimStatus::Invalid | ClaimStatus::Failed)
    }

    /// Submitted and Queued claims are awaiting an NHS response
    pub fn is_queued(&self) -> bool {
        matches!(self, ClaimStatus::Submitted | ClaimStatus::Queued)
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// NHS fee-scale band on a claim, determining its UDA value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    Band1,
    Band2,
    Band2b,
    Band2c,
    Band3,
    Band4,
    Other(String),
}

impl Band {
    pub fn from_code(code: &str) -> Self {
        match code {
            "Band1" => Band::Band1,
            "Band2" => Band::Band2,
            "Band2b" => Band::Band2b,
            "Band2c" => Band::Band2c,
            "Band3" => Band::Band3,
            "Band4" => Band::Band4,
            other => Band::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Band::Band1 => "Band1",
            Band::Band2 => "Band2",
            Band::Band2b => "Band2b",
            Band::Band2c => "Band2c",
            Band::Band3 => "Band3",
            Band::Band4 => "Band4",
            Band::Other(s) => s,
        }
    }

    /// UDA entitlement for this band. Unknown bands carry no UDA value and
    /// are excluded from every UDA sum.
    pub fn uda_value(&self) -> Option<f64> {
        band_uda_value(self.as_str())
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The action a practice operator should take for a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionLabel {
    NoAction,
    ClaimInvalidOrFailed,
    ClaimNotRaised,
}

impl ActionLabel {
    pub fn as_str(&self) -> &str {
        match self {
            ActionLabel::NoAction => "No Action",
            ActionLabel::ClaimInvalidOrFailed => "Claim Invalid or Failed",
            ActionLabel::ClaimNotRaised => "Claim Not Raised",
        }
    }
}

impl std::fmt::Display for ActionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub trait OptionDisplay {
    fn option_display(&self) -> String;
}

impl OptionDisplay for Option<ActionLabel> {
    fn option_display(&self) -> String {
        match self {
            Some(label) => label.to_string(),
            None => String::new(),
        }
    }
}

impl OptionDisplay for Option<ClaimStatus> {
    fn option_display(&self) -> String {
        match self {
            Some(status) => status.to_string(),
            None => String::new(),
        }
    }
}

/// One row of the treatment plans export, with normalized derived fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentPlanRecord {
    pub plan_id: PlanId,
    pub description: Option<String>,
    pub payor: Option<String>,
    /// Semicolon-delimited provider list as exported
    pub treatment_providers: String,
    pub completed_treatments: f64,
    pub total_treatments: f64,
    pub total_fee: f64,
    pub completed_treatments_fee: f64,
    pub created_date: Option<NaiveDate>,
    pub created_in: Option<String>,

    // Derived by the field normalizer
    /// First token of the provider list; empty means unclassified
    pub plan_provider: String,
    pub first_completed: CompletionDate,
    pub last_completed: CompletionDate,
    pub hygiene: Flag,
}

/// One row of the NHS plan details export (zero-or-one per plan)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NhsPlanInfo {
    pub plan_id: PlanId,
    /// Blank cells become None, the not-a-number state the classifier expects
    pub total_nhs_codes: Option<f64>,
    pub nhs_fee: Option<f64>,
    pub total_treatments: Option<f64>,
}

/// One row of the claims export (zero-or-more per plan)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub plan_id: PlanId,
    pub account_id: Option<String>,
    pub claim_status: Option<ClaimStatus>,
    /// Claimed UDA amount on the claim
    pub uda: Option<f64>,
    /// UDAs confirmed successful by the NHS
    pub uda_confirmed: Option<f64>,
    pub band: Option<Band>,
}

/// The working entity: one treatment plan joined with its NHS details and
/// (at most, per joined row) one claim, plus every derived classification.
///
/// A plan with multiple claims produces one `UnifiedRecord` per claim, and
/// aggregates sum over those duplicated rows. This mirrors the source's left
/// join and is deliberately preserved even though it can inflate per-plan
/// counts (flagged with stakeholders, unresolved).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedRecord {
    pub plan: TreatmentPlanRecord,
    pub nhs: Option<NhsPlanInfo>,
    pub claim: Option<ClaimRecord>,

    // Payment category (mutually exclusive when classifiable)
    pub is_mixed: Flag,
    pub is_pnhs: Flag,
    pub is_full_private: Flag,
    pub is_nhs: NhsCount,

    // Progress
    pub in_progress: Flag,
    pub complete: Flag,
    pub pending_fee: Option<f64>,

    // Claim status
    pub is_claim_failed: Flag,
    pub is_claim_queued: Flag,
    pub requires_action: Flag,
    pub what_action: Option<ActionLabel>,

    /// Band-entitled UDA value for the joined claim's band. Distinct from
    /// the claim's own `uda` field (the claimed amount); the two are never
    /// unified.
    pub udas: Option<f64>,
}

impl UnifiedRecord {
    pub fn plan_provider(&self) -> &str {
        &self.plan.plan_provider
    }

    /// Claimed UDA amount from the claim row, if any
    pub fn claim_uda(&self) -> Option<f64> {
        self.claim.as_ref().and_then(|c| c.uda)
    }

    /// Confirmed-successful UDA amount from the claim row, if any
    pub fn claim_uda_confirmed(&self) -> Option<f64> {
        self.claim.as_ref().and_then(|c| c.uda_confirmed)
    }

    pub fn account_id(&self) -> Option<&str> {
        self.claim.as_ref().and_then(|c| c.account_id.as_deref())
    }

    pub fn claim_status(&self) -> Option<&ClaimStatus> {
        self.claim.as_ref().and_then(|c| c.claim_status.as_ref())
    }

    pub fn band(&self) -> Option<&Band> {
        self.claim.as_ref().and_then(|c| c.band.as_ref())
    }
}

/// Operator-chosen view parameters. `None` leaves that bound open.
///
/// The pipeline is a pure function of (snapshot, params): re-running with
/// the same inputs yields the same classified table and metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub account_id: Option<String>,
}

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date_window(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start_date: Some(start),
            end_date: Some(end),
            account_id: None,
        }
    }

    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_display_matches_source_encoding() {
        assert_eq!(Flag::Yes.to_string(), "1");
        assert_eq!(Flag::No.to_string(), "0");
        assert_eq!(Flag::Unclassified.to_string(), "");
    }

    #[test]
    fn test_nhs_count_rule_table() {
        assert_eq!(NhsCount::from_flags(Flag::No, Flag::Yes), NhsCount::Value(1));
        assert_eq!(NhsCount::from_flags(Flag::Yes, Flag::No), NhsCount::Value(1));
        assert_eq!(NhsCount::from_flags(Flag::No, Flag::No), NhsCount::Value(0));
        // "" propagates from the pure-NHS flag only
        assert_eq!(
            NhsCount::from_flags(Flag::Unclassified, Flag::Unclassified),
            NhsCount::Unclassified
        );
        assert!(NhsCount::Value(1).is_nhs());
        assert!(!NhsCount::Value(0).is_nhs());
        assert!(!NhsCount::Value(2).is_nhs());
        assert!(!NhsCount::Unclassified.is_nhs());
    }

    #[test]
    fn test_band_uda_lookup() {
        assert_eq!(Band::from_code("Band2").uda_value(), Some(3.0));
        assert_eq!(Band::from_code("Band4").uda_value(), Some(1.2));
        assert_eq!(Band::from_code("BandX").uda_value(), None);
    }

    #[test]
    fn test_claim_status_groups() {
        assert!(ClaimStatus::from_code("Invalid").is_failed());
        assert!(ClaimStatus::from_code("Failed").is_failed());
        assert!(ClaimStatus::from_code("Submitted").is_queued());
        assert!(ClaimStatus::from_code("Queued").is_queued());
        let other = ClaimStatus::from_code("Accepted");
        assert!(!other.is_failed());
        assert!(!other.is_queued());
    }

    #[test]
    fn test_completion_date_states_are_distinct() {
        assert_ne!(CompletionDate::NoCodes, CompletionDate::Invalid);
        assert_eq!(CompletionDate::NoCodes.as_date(), None);
        assert_eq!(CompletionDate::Invalid.as_date(), None);
    }
}
