/*!
 * Plan classification and claims joining
 *
 * The core of the pipeline: left-joins each treatment plan with its NHS
 * details to derive the payment-category and progress flags, then left-joins
 * the claims to derive claim-status flags, the action-required flag and the
 * band-mapped UDA value. The rules encode practice policy; their ordering
 * and sentinel handling must not change without a business sign-off.
 */

use std::collections::HashMap;

use chrono::Datelike;

use crate::constants::MIN_COMPLETION_YEAR;
use crate::data_types::*;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Payment category flag: some but not all treatments covered by NHS codes.
///
/// Each of the three category checks is computed independently; the only
/// shared short-circuit is the empty plan provider. Comparisons against a
/// missing NHS value are false, matching the source's NaN semantics.
fn check_mixed(plan_provider: &str, nhs: Option<&NhsPlanInfo>) -> Flag {
    if plan_provider.is_empty() {
        return Flag::Unclassified;
    }
    let codes = nhs.and_then(|n| n.total_nhs_codes);
    match codes {
        Some(c) if c > 0.0 => {
            let total = nhs.and_then(|n| n.total_treatments);
            Flag::from_bool(total.map_or(false, |t| c < t))
        }
        _ => Flag::No,
    }
}

/// Payment category flag: every treatment covered by NHS codes
fn check_pure_nhs(plan_provider: &str, nhs: Option<&NhsPlanInfo>) -> Flag {
    if plan_provider.is_empty() {
        return Flag::Unclassified;
    }
    let codes = nhs.and_then(|n| n.total_nhs_codes);
    match codes {
        Some(c) if c > 0.0 => {
            let total = nhs.and_then(|n| n.total_treatments);
            Flag::from_bool(total.map_or(false, |t| c == t))
        }
        _ => Flag::No,
    }
}

/// Payment category flag: no NHS codes at all
fn check_full_private(plan_provider: &str, nhs: Option<&NhsPlanInfo>) -> Flag {
    if plan_provider.is_empty() {
        return Flag::Unclassified;
    }
    Flag::from_bool(nhs.and_then(|n| n.total_nhs_codes).is_none())
}

/// Progress flag: started but not finished. Uses the plan's own treatment
/// counts, not the NHS-side float totals.
fn calculate_in_progress(plan: &TreatmentPlanRecord) -> Flag {
    if plan.plan_provider.is_empty() {
        return Flag::Unclassified;
    }
    if plan.completed_treatments == 0.0 {
        return Flag::No;
    }
    Flag::from_bool(plan.completed_treatments < plan.total_treatments)
}

/// Progress flag: every treatment completed
fn calculate_completed(plan: &TreatmentPlanRecord) -> Flag {
    if plan.plan_provider.is_empty() {
        return Flag::Unclassified;
    }
    if plan.completed_treatments == 0.0 {
        return Flag::No;
    }
    Flag::from_bool(plan.completed_treatments == plan.total_treatments)
}

fn calculate_pending_fee(plan: &TreatmentPlanRecord) -> Option<f64> {
    if plan.plan_provider.is_empty() {
        return None;
    }
    Some(plan.total_fee - plan.completed_treatments_fee)
}

fn check_claim_failed(claim: Option<&ClaimRecord>) -> Flag {
    match claim.and_then(|c| c.claim_status.as_ref()) {
        None => Flag::Unclassified,
        Some(status) => Flag::from_bool(status.is_failed()),
    }
}

fn check_claim_queued(claim: Option<&ClaimRecord>) -> Flag {
    match claim.and_then(|c| c.claim_status.as_ref()) {
        None => Flag::Unclassified,
        Some(status) => Flag::from_bool(status.is_queued()),
    }
}

/// Whether the plan needs operator attention: a failed claim always does,
/// and a completed NHS plan with no claim raised does.
fn plans_that_require_action(
    plan_provider: &str,
    is_claim_failed: Flag,
    is_nhs: NhsCount,
    complete: Flag,
    claim: Option<&ClaimRecord>,
) -> Flag {
    if plan_provider.is_empty() {
        return Flag::Unclassified;
    }
    if is_claim_failed.is_yes() {
        return Flag::Yes;
    }
    if is_nhs.is_nhs() {
        if complete.is_yes() {
            let status_missing = claim.and_then(|c| c.claim_status.as_ref()).is_none();
            return Flag::from_bool(status_missing);
        }
        return Flag::No;
    }
    Flag::No
}

fn calculate_action(requires_action: Flag, is_claim_failed: Flag) -> Option<ActionLabel> {
    match requires_action {
        Flag::Unclassified => None,
        Flag::No => Some(ActionLabel::NoAction),
        Flag::Yes => {
            if is_claim_failed.is_yes() {
                Some(ActionLabel::ClaimInvalidOrFailed)
            } else {
                Some(ActionLabel::ClaimNotRaised)
            }
        }
    }
}

/// Build the unified rows for one plan.
///
/// Join fan-out is preserved: a plan with N claims yields N rows that share
/// the plan-level flags, and a plan with none yields a single row whose
/// claim-derived fields are unclassified.
fn unify_plan(
    plan: &TreatmentPlanRecord,
    nhs: Option<&NhsPlanInfo>,
    claims: &[ClaimRecord],
) -> Vec<UnifiedRecord> {
    let is_mixed = check_mixed(&plan.plan_provider, nhs);
    let is_pnhs = check_pure_nhs(&plan.plan_provider, nhs);
    let is_full_private = check_full_private(&plan.plan_provider, nhs);
    let is_nhs = NhsCount::from_flags(is_mixed, is_pnhs);
    let in_progress = calculate_in_progress(plan);
    let complete = calculate_completed(plan);
    let pending_fee = calculate_pending_fee(plan);

    let build = |claim: Option<&ClaimRecord>| {
        let is_claim_failed = check_claim_failed(claim);
        let is_claim_queued = check_claim_queued(claim);
        let requires_action = plans_that_require_action(
            &plan.plan_provider,
            is_claim_failed,
            is_nhs,
            complete,
            claim,
        );
        let what_action = calculate_action(requires_action, is_claim_failed);
        let udas = claim
            .and_then(|c| c.band.as_ref())
            .and_then(|b| b.uda_value());

        UnifiedRecord {
            plan: plan.clone(),
            nhs: nhs.cloned(),
            claim: claim.cloned(),
            is_mixed,
            is_pnhs,
            is_full_private,
            is_nhs,
            in_progress,
            complete,
            pending_fee,
            is_claim_failed,
            is_claim_queued,
            requires_action,
            what_action,
            udas,
        }
    };

    if claims.is_empty() {
        vec![build(None)]
    } else {
        claims.iter().map(|claim| build(Some(claim))).collect()
    }
}

/// Classify every plan against the NHS details and claims lookup maps.
///
/// Pure: the unified set is rebuilt from scratch on every call.
pub fn classify(
    plans: &[TreatmentPlanRecord],
    nhs_by_plan: &HashMap<PlanId, NhsPlanInfo>,
    claims_by_plan: &HashMap<PlanId, Vec<ClaimRecord>>,
) -> Vec<UnifiedRecord> {
    #[cfg(feature = "parallel")]
    {
        plans
            .par_iter()
            .flat_map_iter(|plan| {
                let nhs = nhs_by_plan.get(&plan.plan_id);
                let claims = claims_by_plan
                    .get(&plan.plan_id)
                    .map(|c| c.as_slice())
                    .unwrap_or(&[]);
                unify_plan(plan, nhs, claims)
            })
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        plans
            .iter()
            .flat_map(|plan| {
                let nhs = nhs_by_plan.get(&plan.plan_id);
                let claims = claims_by_plan
                    .get(&plan.plan_id)
                    .map(|c| c.as_slice())
                    .unwrap_or(&[]);
                unify_plan(plan, nhs, claims)
            })
            .collect()
    }
}

/// Apply the data-quality guard and the operator-chosen filters.
///
/// Rows survive only when both completion dates are known, both years are at
/// or after the cutoff (epoch and placeholder dates are junk), the dates sit
/// inside the requested window, and the account matches when one is chosen.
/// Rows without a claim have no account, so an account filter drops them.
pub fn filter_records(records: Vec<UnifiedRecord>, params: &FilterParams) -> Vec<UnifiedRecord> {
    records
        .into_iter()
        .filter(|r| {
            let (first, last) = match (
                r.plan.first_completed.as_date(),
                r.plan.last_completed.as_date(),
            ) {
                (Some(f), Some(l)) => (f, l),
                _ => return false,
            };
            if first.year() < MIN_COMPLETION_YEAR || last.year() < MIN_COMPLETION_YEAR {
                return false;
            }
            if let Some(start) = params.start_date {
                if first < start {
                    return false;
                }
            }
            if let Some(end) = params.end_date {
                if last > end {
                    return false;
                }
            }
            if let Some(account) = params.account_id.as_deref() {
                if r.account_id() != Some(account) {
                    return false;
                }
            }
            true
        })
        .collect()
}
