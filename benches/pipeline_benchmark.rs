use std::collections::HashMap;

use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use udadash::classify;
use udadash::metrics::MetricsBundle;
use udadash::prelude::*;

const PROVIDERS: &[&str] = &["HM", "GA", "MJ", "MM", "LL", "RM", "MH", ""];
const STATUSES: &[&str] = &["Submitted", "Queued", "Invalid", "Failed"];
const BANDS: &[&str] = &["Band1", "Band2", "Band2b", "Band2c", "Band3", "Band4"];

fn synthetic_tables(
    count: usize,
) -> (
    Vec<TreatmentPlanRecord>,
    HashMap<PlanId, NhsPlanInfo>,
    HashMap<PlanId, Vec<ClaimRecord>>,
) {
    let mut plans = Vec::with_capacity(count);
    let mut nhs_by_plan = HashMap::new();
    let mut claims_by_plan = HashMap::new();

    for i in 0..count {
        let id = PlanId::new(format!("TP{}", i));
        let provider = PROVIDERS[i % PROVIDERS.len()].to_string();
        let total = (i % 6 + 1) as f64;
        let completed = (i % 7) as f64 % (total + 1.0);
        let date = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap()
            + chrono::Duration::days((i % 90) as i64);

        plans.push(TreatmentPlanRecord {
            plan_id: id.clone(),
            description: None,
            payor: None,
            treatment_providers: provider.clone(),
            completed_treatments: completed,
            total_treatments: total,
            total_fee: 100.0 + i as f64,
            completed_treatments_fee: 40.0,
            created_date: Some(date),
            created_in: Some("Created in Carestack".to_string()),
            plan_provider: provider,
            first_completed: CompletionDate::Date(date),
            last_completed: CompletionDate::Date(date),
            hygiene: Flag::No,
        });

        if i % 3 != 0 {
            nhs_by_plan.insert(
                id.clone(),
                NhsPlanInfo {
                    plan_id: id.clone(),
                    total_nhs_codes: Some((i % 4) as f64),
                    nhs_fee: Some(25.0),
                    total_treatments: Some(total),
                },
            );
        }

        if i % 2 == 0 {
            claims_by_plan.insert(
                id.clone(),
                vec![ClaimRecord {
                    plan_id: id,
                    account_id: Some(format!("ACC{}", i % 50)),
                    claim_status: Some(ClaimStatus::from_code(STATUSES[i % STATUSES.len()])),
                    uda: Some((i % 12) as f64),
                    uda_confirmed: Some((i % 5) as f64),
                    band: Some(Band::from_code(BANDS[i % BANDS.len()])),
                }],
            );
        }
    }

    (plans, nhs_by_plan, claims_by_plan)
}

fn bench_classify(c: &mut Criterion) {
    let (plans, nhs_by_plan, claims_by_plan) = synthetic_tables(10_000);
    c.bench_function("classify_10k_plans", |b| {
        b.iter(|| {
            classify::classify(
                black_box(&plans),
                black_box(&nhs_by_plan),
                black_box(&claims_by_plan),
            )
        })
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let (plans, nhs_by_plan, claims_by_plan) = synthetic_tables(10_000);
    let params = FilterParams::new();
    c.bench_function("pipeline_10k_plans", |b| {
        b.iter(|| {
            let records = classify::classify(&plans, &nhs_by_plan, &claims_by_plan);
            let records = classify::filter_records(records, black_box(&params));
            MetricsBundle::compute(&records)
        })
    });
}

fn bench_metrics_only(c: &mut Criterion) {
    let (plans, nhs_by_plan, claims_by_plan) = synthetic_tables(10_000);
    let records = classify::filter_records(
        classify::classify(&plans, &nhs_by_plan, &claims_by_plan),
        &FilterParams::new(),
    );
    c.bench_function("metrics_10k_records", |b| {
        b.iter(|| MetricsBundle::compute(black_box(&records)))
    });
}

criterion_group!(benches, bench_classify, bench_full_pipeline, bench_metrics_only);
criterion_main!(benches);
