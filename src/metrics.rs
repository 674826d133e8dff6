/*!
 * Metrics aggregation over classified records
 *
 * Turns the filtered unified set into the summary bundle the dashboard
 * shows: plan counts by payment category and stage, UDA rollups per
 * category and per provider, awaiting-response and successful totals, and
 * the action summary. Every aggregate excludes rows whose plan provider is
 * the "All Providers" placeholder.
 *
 * Two UDA quantities flow through these rollups and are never unified:
 * the band-entitled value derived from the claim's fee band, and the
 * claimed amount carried on the claim row itself. Several failure-rate
 * denominators differ between sections; each formula is preserved as the
 * practice signed it off, including the unguarded divisions (an empty
 * selection yields NaN, not an error).
 */

use serde::Serialize;

use crate::constants::{ALL_PROVIDERS_PLACEHOLDER, NHS_PROVIDER_ROSTER};
use crate::data_types::{ActionLabel, Flag, OptionDisplay, UnifiedRecord};

/// Sum a per-record optional quantity over the rows matching a predicate.
/// Rows where the quantity is absent contribute nothing; an empty
/// selection sums to zero.
fn sum_where<P, F>(records: &[UnifiedRecord], pred: P, quantity: F) -> f64
where
    P: Fn(&UnifiedRecord) -> bool,
    F: Fn(&UnifiedRecord) -> Option<f64>,
{
    records
        .iter()
        .filter(|r| r.plan_provider() != ALL_PROVIDERS_PLACEHOLDER)
        .filter(|r| pred(r))
        .filter_map(|r| quantity(r))
        .sum()
}

fn count_where<P>(records: &[UnifiedRecord], pred: P) -> usize
where
    P: Fn(&UnifiedRecord) -> bool,
{
    records
        .iter()
        .filter(|r| r.plan_provider() != ALL_PROVIDERS_PLACEHOLDER)
        .filter(|r| pred(r))
        .count()
}

fn is_nhs_or_mixed(r: &UnifiedRecord) -> bool {
    r.is_mixed.is_yes() || r.is_pnhs.is_yes()
}

/// Plan counts for one payment category at each completion stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub active: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
}

/// Plan counts split into the two dashboard categories.
///
/// The combined bucket's `active` count equals `mixed_plans` plus
/// `pure_nhs_plans`; the individual category counts are also shown on
/// their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanCounts {
    pub mixed_plans: usize,
    pub pure_nhs_plans: usize,
    pub private: StageCounts,
    pub nhs_or_mixed: StageCounts,
}

impl PlanCounts {
    fn compute(records: &[UnifiedRecord]) -> Self {
        let private = StageCounts {
            active: count_where(records, |r| r.is_full_private.is_yes()),
            // Not-started is a raw treatment count check, not the
            // in-progress flag
            not_started: count_where(records, |r| {
                r.is_full_private.is_yes() && r.plan.completed_treatments == 0.0
            }),
            in_progress: count_where(records, |r| {
                r.is_full_private.is_yes() && r.in_progress.is_yes()
            }),
            completed: count_where(records, |r| {
                r.is_full_private.is_yes() && r.complete.is_yes()
            }),
        };
        let mixed_plans = count_where(records, |r| r.is_mixed.is_yes());
        let pure_nhs_plans = count_where(records, |r| r.is_pnhs.is_yes());
        let nhs_or_mixed = StageCounts {
            active: mixed_plans + pure_nhs_plans,
            not_started: count_where(records, |r| {
                is_nhs_or_mixed(r) && r.plan.completed_treatments == 0.0
            }),
            in_progress: count_where(records, |r| is_nhs_or_mixed(r) && r.in_progress.is_yes()),
            completed: count_where(records, |r| is_nhs_or_mixed(r) && r.complete.is_yes()),
        };
        PlanCounts {
            mixed_plans,
            pure_nhs_plans,
            private,
            nhs_or_mixed,
        }
    }
}

/// UDA rollup for one payment category.
///
/// `total` and `completed` sum the band-entitled value; `claimed` and
/// `failed` sum the claim's own UDA field. The failure rate divides failed
/// by total without a zero guard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UdaRollup {
    pub total: f64,
    pub claimed: f64,
    pub completed: f64,
    pub failed: f64,
    pub failure_rate: f64,
}

impl UdaRollup {
    fn compute<P>(records: &[UnifiedRecord], category: P) -> Self
    where
        P: Fn(&UnifiedRecord) -> bool + Copy,
    {
        let total = sum_where(records, category, |r| r.udas);
        let claimed = sum_where(records, category, |r| r.claim_uda());
        let completed = sum_where(records, |r| category(r) && r.complete.is_yes(), |r| r.udas);
        let failed = sum_where(
            records,
            |r| category(r) && r.is_claim_failed.is_yes(),
            |r| r.claim_uda(),
        );
        UdaRollup {
            total,
            claimed,
            completed,
            failed,
            failure_rate: (failed / total) * 100.0,
        }
    }
}

/// One provider row of the detailed UDA table.
///
/// Completed, claimed, successful and awaiting sums are restricted to
/// completed NHS rows; the failed sum drops the completed restriction. The
/// failure rate divides failed by the provider's completed UDAs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderUdas {
    pub provider: String,
    pub completed: f64,
    pub claimed: f64,
    pub yet_to_claim: f64,
    pub successful: f64,
    pub awaiting_response: f64,
    pub failed: f64,
    pub failure_rate: f64,
}

impl ProviderUdas {
    fn compute(records: &[UnifiedRecord], provider: &str) -> Self {
        let for_provider = |r: &UnifiedRecord| r.plan_provider() == provider;
        let completed_nhs =
            |r: &UnifiedRecord| for_provider(r) && r.complete.is_yes() && r.is_nhs.is_nhs();

        let completed = sum_where(records, completed_nhs, |r| r.udas);
        let claimed = sum_where(records, completed_nhs, |r| r.claim_uda());
        let successful = sum_where(records, completed_nhs, |r| r.claim_uda_confirmed());
        let awaiting_response = sum_where(
            records,
            |r| completed_nhs(r) && r.is_claim_queued.is_yes(),
            |r| r.claim_uda(),
        );
        let failed = sum_where(
            records,
            |r| for_provider(r) && r.is_nhs.is_nhs() && r.is_claim_failed.is_yes(),
            |r| r.claim_uda(),
        );
        ProviderUdas {
            provider: provider.to_string(),
            completed,
            claimed,
            yet_to_claim: (completed - claimed).abs(),
            successful,
            awaiting_response,
            failed,
            failure_rate: (failed / completed) * 100.0,
        }
    }
}

/// The per-provider UDA table plus its cross-provider total row.
///
/// Per-provider yet-to-claim is an absolute difference, but the total row
/// sums the signed differences, so the total can be smaller than any
/// single row. The dashboard has always displayed it this way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderTable {
    pub rows: Vec<ProviderUdas>,
    pub total: ProviderUdas,
}

impl ProviderTable {
    fn compute(records: &[UnifiedRecord]) -> Self {
        let rows: Vec<ProviderUdas> = NHS_PROVIDER_ROSTER
            .iter()
            .map(|p| ProviderUdas::compute(records, p))
            .collect();

        let completed: f64 = rows.iter().map(|r| r.completed).sum();
        let claimed: f64 = rows.iter().map(|r| r.claimed).sum();
        let successful: f64 = rows.iter().map(|r| r.successful).sum();
        let awaiting_response: f64 = rows.iter().map(|r| r.awaiting_response).sum();
        let failed: f64 = rows.iter().map(|r| r.failed).sum();
        let yet_to_claim: f64 = rows.iter().map(|r| r.completed - r.claimed).sum();

        let total = ProviderUdas {
            provider: "Total".to_string(),
            completed,
            claimed,
            yet_to_claim,
            successful,
            awaiting_response,
            failed,
            failure_rate: (failed / completed) * 100.0,
        };
        ProviderTable { rows, total }
    }
}

/// Claimed-UDA totals per roster provider, unrestricted by any flag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimedUdaTotal {
    pub provider: String,
    pub total_uda: f64,
}

fn claimed_uda_totals(records: &[UnifiedRecord]) -> Vec<ClaimedUdaTotal> {
    NHS_PROVIDER_ROSTER
        .iter()
        .map(|p| ClaimedUdaTotal {
            provider: p.to_string(),
            total_uda: sum_where(records, |r| r.plan_provider() == *p, |r| r.claim_uda()),
        })
        .collect()
}

/// Claim UDAs queued with the NHS on completed plans, by category
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AwaitingResponse {
    pub pure_nhs: f64,
    pub mixed: f64,
    pub all_nhs: f64,
}

impl AwaitingResponse {
    fn compute(records: &[UnifiedRecord]) -> Self {
        let queued_complete =
            |r: &UnifiedRecord| r.is_claim_queued.is_yes() && r.complete.is_yes();
        let pure_nhs = sum_where(
            records,
            |r| queued_complete(r) && r.is_pnhs.is_yes(),
            |r| r.claim_uda(),
        );
        let mixed = sum_where(
            records,
            |r| queued_complete(r) && r.is_mixed.is_yes(),
            |r| r.claim_uda(),
        );
        AwaitingResponse {
            pure_nhs,
            mixed,
            all_nhs: pure_nhs + mixed,
        }
    }
}

/// Confirmed-successful UDAs on completed plans, by category
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SuccessfulUdas {
    pub pure_nhs: f64,
    pub mixed: f64,
    pub all_nhs: f64,
}

impl SuccessfulUdas {
    fn compute(records: &[UnifiedRecord]) -> Self {
        let pure_nhs = sum_where(
            records,
            |r| r.complete.is_yes() && r.is_pnhs.is_yes(),
            |r| r.claim_uda_confirmed(),
        );
        let mixed = sum_where(
            records,
            |r| r.complete.is_yes() && r.is_mixed.is_yes(),
            |r| r.claim_uda_confirmed(),
        );
        SuccessfulUdas {
            pure_nhs,
            mixed,
            all_nhs: pure_nhs + mixed,
        }
    }
}

/// The headline UDA breakdown panel.
///
/// Its failure rate uses failed / (failed + successful), not the
/// failed / total ratio the category rollups use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UdaBreakdown {
    pub completed_plan_udas: f64,
    pub yet_to_claim: f64,
    pub claimed: f64,
    pub awaiting_response: f64,
    pub successful: f64,
    pub failed: f64,
    pub failure_rate: f64,
}

impl UdaBreakdown {
    fn compute(
        nhs: &UdaRollup,
        awaiting: &AwaitingResponse,
        successful: &SuccessfulUdas,
    ) -> Self {
        UdaBreakdown {
            completed_plan_udas: nhs.completed,
            yet_to_claim: (nhs.completed - nhs.claimed).abs(),
            claimed: nhs.claimed,
            awaiting_response: awaiting.all_nhs,
            successful: successful.all_nhs,
            failed: nhs.failed,
            failure_rate: (nhs.failed / (nhs.failed + successful.all_nhs)) * 100.0,
        }
    }
}

/// Count and band-entitled UDA sum for one action label
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActionCounts {
    pub count: usize,
    pub udas: f64,
}

fn action_counts(records: &[UnifiedRecord], label: ActionLabel) -> ActionCounts {
    ActionCounts {
        count: count_where(records, |r| r.what_action == Some(label)),
        udas: sum_where(records, |r| r.what_action == Some(label), |r| r.udas),
    }
}

/// One row of the provider-by-action pivot (band-entitled UDA sums)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionPivotRow {
    pub provider: String,
    pub claim_not_raised: f64,
    pub claim_failed: f64,
}

/// Outstanding-action overview: per-label totals plus the provider pivot
/// with its total row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionSummary {
    pub claim_not_raised: ActionCounts,
    pub claim_failed: ActionCounts,
    pub pivot: Vec<ActionPivotRow>,
}

impl ActionSummary {
    fn compute(records: &[UnifiedRecord]) -> Self {
        let mut pivot: Vec<ActionPivotRow> = NHS_PROVIDER_ROSTER
            .iter()
            .map(|p| ActionPivotRow {
                provider: p.to_string(),
                claim_not_raised: sum_where(
                    records,
                    |r| {
                        r.plan_provider() == *p
                            && r.what_action == Some(ActionLabel::ClaimNotRaised)
                    },
                    |r| r.udas,
                ),
                claim_failed: sum_where(
                    records,
                    |r| {
                        r.plan_provider() == *p
                            && r.what_action == Some(ActionLabel::ClaimInvalidOrFailed)
                    },
                    |r| r.udas,
                ),
            })
            .collect();
        let total = ActionPivotRow {
            provider: "Total".to_string(),
            claim_not_raised: pivot.iter().map(|r| r.claim_not_raised).sum(),
            claim_failed: pivot.iter().map(|r| r.claim_failed).sum(),
        };
        pivot.push(total);

        ActionSummary {
            claim_not_raised: action_counts(records, ActionLabel::ClaimNotRaised),
            claim_failed: action_counts(records, ActionLabel::ClaimInvalidOrFailed),
            pivot,
        }
    }
}

/// One row of the per-plan action table shown to operators
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionTableRow {
    pub plan_id: String,
    pub account_id: String,
    pub band: String,
    pub provider: String,
    pub claim_status: String,
    pub first_completed: String,
    pub requires_action: String,
    pub udas: Option<f64>,
    pub action: String,
}

/// Rows of the operator action table, restricted to plans flagged as
/// requiring action
pub fn action_table(records: &[UnifiedRecord]) -> Vec<ActionTableRow> {
    records
        .iter()
        .filter(|r| r.plan_provider() != ALL_PROVIDERS_PLACEHOLDER)
        .filter(|r| r.requires_action == Flag::Yes)
        .map(|r| ActionTableRow {
            plan_id: r.plan.plan_id.to_string(),
            account_id: r.account_id().unwrap_or("").to_string(),
            band: r.band().map(|b| b.to_string()).unwrap_or_default(),
            provider: r.plan_provider().to_string(),
            claim_status: r.claim_status().cloned().option_display(),
            first_completed: r
                .plan
                .first_completed
                .as_date()
                .map(|d| d.to_string())
                .unwrap_or_default(),
            requires_action: r.requires_action.to_string(),
            udas: r.udas,
            action: r.what_action.option_display(),
        })
        .collect()
}

/// The full aggregation output the presentation layer consumes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsBundle {
    pub counts: PlanCounts,
    pub nhs: UdaRollup,
    pub pure_nhs: UdaRollup,
    pub mixed: UdaRollup,
    pub overall: UdaRollup,
    pub providers: ProviderTable,
    pub claimed_uda_totals: Vec<ClaimedUdaTotal>,
    pub awaiting_response: AwaitingResponse,
    pub successful: SuccessfulUdas,
    pub breakdown: UdaBreakdown,
    pub actions: ActionSummary,
}

impl MetricsBundle {
    /// Aggregate the filtered unified set into the dashboard bundle
    pub fn compute(records: &[UnifiedRecord]) -> Self {
        let counts = PlanCounts::compute(records);
        let nhs = UdaRollup::compute(records, |r| r.is_nhs.is_nhs());
        let pure_nhs = UdaRollup::compute(records, |r| r.is_pnhs.is_yes());
        let mixed = UdaRollup::compute(records, |r| r.is_mixed.is_yes());
        let overall = UdaRollup::compute(records, |_| true);
        let providers = ProviderTable::compute(records);
        let awaiting_response = AwaitingResponse::compute(records);
        let successful = SuccessfulUdas::compute(records);
        let breakdown = UdaBreakdown::compute(&nhs, &awaiting_response, &successful);
        let actions = ActionSummary::compute(records);

        MetricsBundle {
            counts,
            nhs,
            pure_nhs,
            mixed,
            overall,
            providers,
            claimed_uda_totals: claimed_uda_totals(records),
            awaiting_response,
            successful,
            breakdown,
            actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify;
    use crate::data_types::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn plan(id: &str, provider: &str, completed: f64, total: f64) -> TreatmentPlanRecord {
        TreatmentPlanRecord {
            plan_id: PlanId::new(id),
            description: None,
            payor: None,
            treatment_providers: provider.to_string(),
            completed_treatments: completed,
            total_treatments: total,
            total_fee: 100.0,
            completed_treatments_fee: 50.0,
            created_date: None,
            created_in: Some("Created in Carestack".to_string()),
            plan_provider: provider.to_string(),
            first_completed: CompletionDate::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
            last_completed: CompletionDate::Date(NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()),
            hygiene: Flag::No,
        }
    }

    fn nhs(id: &str, codes: f64, total: f64) -> NhsPlanInfo {
        NhsPlanInfo {
            plan_id: PlanId::new(id),
            total_nhs_codes: Some(codes),
            nhs_fee: None,
            total_treatments: Some(total),
        }
    }

    fn claim(id: &str, status: &str, uda: f64, confirmed: f64, band: &str) -> ClaimRecord {
        ClaimRecord {
            plan_id: PlanId::new(id),
            account_id: Some("ACC1".to_string()),
            claim_status: Some(ClaimStatus::from_code(status)),
            uda: Some(uda),
            uda_confirmed: Some(confirmed),
            band: Some(Band::from_code(band)),
        }
    }

    /// A small practice: one completed pure-NHS plan with a submitted
    /// claim, one completed mixed plan with a failed claim, one private
    /// plan, and one "All Providers" placeholder row.
    fn sample_records() -> Vec<UnifiedRecord> {
        let plans = vec![
            plan("TP1", "HM", 4.0, 4.0),
            plan("TP2", "GA", 4.0, 4.0),
            plan("TP3", "MJ", 0.0, 4.0),
            plan("TP4", "All Providers", 4.0, 4.0),
        ];
        let mut nhs_by_plan = HashMap::new();
        nhs_by_plan.insert(PlanId::new("TP1"), nhs("TP1", 4.0, 4.0));
        nhs_by_plan.insert(PlanId::new("TP2"), nhs("TP2", 2.0, 4.0));
        nhs_by_plan.insert(PlanId::new("TP4"), nhs("TP4", 4.0, 4.0));

        let mut claims_by_plan = HashMap::new();
        claims_by_plan.insert(
            PlanId::new("TP1"),
            vec![claim("TP1", "Submitted", 3.0, 3.0, "Band2")],
        );
        claims_by_plan.insert(
            PlanId::new("TP2"),
            vec![claim("TP2", "Failed", 5.0, 0.0, "Band2b")],
        );
        claims_by_plan.insert(
            PlanId::new("TP4"),
            vec![claim("TP4", "Submitted", 9.0, 9.0, "Band3")],
        );

        classify::classify(&plans, &nhs_by_plan, &claims_by_plan)
    }

    #[test]
    fn test_plan_counts() {
        let bundle = MetricsBundle::compute(&sample_records());
        assert_eq!(bundle.counts.private.active, 1);
        assert_eq!(bundle.counts.private.not_started, 1);
        assert_eq!(bundle.counts.private.completed, 0);
        assert_eq!(bundle.counts.pure_nhs_plans, 1);
        assert_eq!(bundle.counts.mixed_plans, 1);
        assert_eq!(bundle.counts.nhs_or_mixed.active, 2);
        assert_eq!(bundle.counts.nhs_or_mixed.completed, 2);
        assert_eq!(bundle.counts.nhs_or_mixed.not_started, 0);
    }

    #[test]
    fn test_placeholder_provider_rows_excluded() {
        let records = sample_records();
        let bundle = MetricsBundle::compute(&records);
        // TP4's Band3 entitlement (12.0) must not leak into any rollup
        assert_eq!(bundle.nhs.total, 8.0);
        assert_eq!(bundle.overall.total, 8.0);
    }

    #[test]
    fn test_category_rollups() {
        let bundle = MetricsBundle::compute(&sample_records());
        // Pure NHS: TP1 (Band2 -> 3.0 entitled, 3.0 claimed)
        assert_eq!(bundle.pure_nhs.total, 3.0);
        assert_eq!(bundle.pure_nhs.claimed, 3.0);
        assert_eq!(bundle.pure_nhs.failed, 0.0);
        assert_eq!(bundle.pure_nhs.failure_rate, 0.0);
        // Mixed: TP2 (Band2b -> 5.0 entitled, 5.0 claimed, failed)
        assert_eq!(bundle.mixed.total, 5.0);
        assert_eq!(bundle.mixed.failed, 5.0);
        assert_eq!(bundle.mixed.failure_rate, 100.0);
        // NHS combines both
        assert_eq!(bundle.nhs.completed, 8.0);
        assert_eq!(bundle.nhs.claimed, 8.0);
        assert_eq!(bundle.nhs.failed, 5.0);
    }

    #[test]
    fn test_zero_denominator_rate_is_nan_not_panic() {
        let bundle = MetricsBundle::compute(&[]);
        assert!(bundle.nhs.failure_rate.is_nan());
        assert!(bundle.breakdown.failure_rate.is_nan());
        assert!(bundle.providers.total.failure_rate.is_nan());
    }

    #[test]
    fn test_provider_table_rows_and_total() {
        let bundle = MetricsBundle::compute(&sample_records());
        assert_eq!(bundle.providers.rows.len(), 6);
        let hm = &bundle.providers.rows[0];
        assert_eq!(hm.provider, "HM");
        assert_eq!(hm.completed, 3.0);
        assert_eq!(hm.claimed, 3.0);
        assert_eq!(hm.successful, 3.0);
        assert_eq!(hm.awaiting_response, 3.0);
        assert_eq!(hm.failed, 0.0);

        let ga = &bundle.providers.rows[1];
        assert_eq!(ga.failed, 5.0);

        assert_eq!(bundle.providers.total.provider, "Total");
        assert_eq!(bundle.providers.total.completed, 8.0);
        assert_eq!(bundle.providers.total.failed, 5.0);
    }

    #[test]
    fn test_yet_to_claim_signed_total_vs_absolute_rows() {
        let plans = vec![plan("TP1", "HM", 4.0, 4.0), plan("TP2", "GA", 4.0, 4.0)];
        let mut nhs_by_plan = HashMap::new();
        nhs_by_plan.insert(PlanId::new("TP1"), nhs("TP1", 4.0, 4.0));
        nhs_by_plan.insert(PlanId::new("TP2"), nhs("TP2", 4.0, 4.0));
        let mut claims_by_plan = HashMap::new();
        // HM over-claimed by 2, GA under-claimed by 2
        claims_by_plan.insert(
            PlanId::new("TP1"),
            vec![claim("TP1", "Submitted", 5.0, 5.0, "Band2")],
        );
        claims_by_plan.insert(
            PlanId::new("TP2"),
            vec![claim("TP2", "Submitted", 1.0, 1.0, "Band2")],
        );
        let records = classify::classify(&plans, &nhs_by_plan, &claims_by_plan);
        let table = ProviderTable::compute(&records);
        assert_eq!(table.rows[0].yet_to_claim, 2.0);
        assert_eq!(table.rows[1].yet_to_claim, 2.0);
        // Signed differences cancel in the total row
        assert_eq!(table.total.yet_to_claim, 0.0);
    }

    #[test]
    fn test_awaiting_and_successful_split_by_category() {
        let bundle = MetricsBundle::compute(&sample_records());
        assert_eq!(bundle.awaiting_response.pure_nhs, 3.0);
        assert_eq!(bundle.awaiting_response.mixed, 0.0);
        assert_eq!(bundle.awaiting_response.all_nhs, 3.0);
        assert_eq!(bundle.successful.pure_nhs, 3.0);
        assert_eq!(bundle.successful.mixed, 0.0);
    }

    #[test]
    fn test_breakdown_failure_rate_uses_successful_denominator() {
        let bundle = MetricsBundle::compute(&sample_records());
        // failed=5, successful=3 -> 5/8*100
        assert!((bundle.breakdown.failure_rate - 62.5).abs() < 1e-9);
        assert_eq!(bundle.breakdown.completed_plan_udas, 8.0);
        assert_eq!(bundle.breakdown.yet_to_claim, 0.0);
    }

    #[test]
    fn test_action_summary_and_pivot() {
        // Add a completed NHS plan with no claim raised
        let plans = vec![plan("TP5", "MM", 4.0, 4.0)];
        let mut nhs_by_plan = HashMap::new();
        nhs_by_plan.insert(PlanId::new("TP5"), nhs("TP5", 4.0, 4.0));
        let mut records = sample_records();
        records.extend(classify::classify(&plans, &nhs_by_plan, &HashMap::new()));

        let summary = ActionSummary::compute(&records);
        assert_eq!(summary.claim_not_raised.count, 1);
        assert_eq!(summary.claim_failed.count, 1);
        assert_eq!(summary.claim_failed.udas, 5.0);
        // TP5 has no claim, so no band and no entitled UDAs
        assert_eq!(summary.claim_not_raised.udas, 0.0);

        assert_eq!(summary.pivot.len(), 7);
        let ga = summary.pivot.iter().find(|r| r.provider == "GA").unwrap();
        assert_eq!(ga.claim_failed, 5.0);
        let total = summary.pivot.last().unwrap();
        assert_eq!(total.provider, "Total");
        assert_eq!(total.claim_failed, 5.0);
    }

    #[test]
    fn test_action_table_only_flagged_rows() {
        let rows = action_table(&sample_records());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].plan_id, "TP2");
        assert_eq!(rows[0].action, "Claim Invalid or Failed");
        assert_eq!(rows[0].claim_status, "Failed");
        assert_eq!(rows[0].requires_action, "1");
    }

    #[test]
    fn test_unknown_band_excluded_from_sums() {
        let plans = vec![plan("TP1", "HM", 4.0, 4.0)];
        let mut nhs_by_plan = HashMap::new();
        nhs_by_plan.insert(PlanId::new("TP1"), nhs("TP1", 4.0, 4.0));
        let mut claims_by_plan = HashMap::new();
        claims_by_plan.insert(
            PlanId::new("TP1"),
            vec![claim("TP1", "Submitted", 3.0, 3.0, "BandX")],
        );
        let records = classify::classify(&plans, &nhs_by_plan, &claims_by_plan);
        let bundle = MetricsBundle::compute(&records);
        assert_eq!(bundle.nhs.total, 0.0);
        // The claimed amount still counts; only the entitlement is unknown
        assert_eq!(bundle.nhs.claimed, 3.0);
    }
}
