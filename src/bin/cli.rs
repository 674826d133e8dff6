use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use udadash::prelude::*;

#[derive(Parser)]
#[command(name = "udacli")]
#[command(about = "Practice UDA CLI - classify treatment plans and report UDA metrics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show summary statistics for the loaded exports
    Stats(StatsArgs),
    /// Print the dashboard metrics for a filter window
    Summary(SummaryArgs),
    /// List plans that require operator action
    Actions(SummaryArgs),
    /// Print the weekly or monthly UDA trend for one provider
    Trend(TrendArgs),
    /// Export classified records, metrics, or the action table
    Export(ExportArgs),
}

#[derive(Args)]
struct StatsArgs {
    /// Directory containing the three practice export files
    #[arg(short, long)]
    data_dir: PathBuf,
}

#[derive(Args)]
struct SummaryArgs {
    /// Directory containing the three practice export files
    #[arg(short, long)]
    data_dir: PathBuf,
    /// Window start date (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Window end date (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,
    /// Restrict to one account
    #[arg(long)]
    account: Option<String>,
    /// Skip rows that fail to parse instead of aborting
    #[arg(long)]
    skip_invalid: bool,
}

#[derive(Args)]
struct TrendArgs {
    #[command(flatten)]
    filter: SummaryArgs,
    /// Provider code (HM, GA, MJ, MM, LL, RM)
    #[arg(long)]
    provider: String,
    /// Bucketing mode
    #[arg(long, value_enum, default_value_t = TrendModeOpt::Weekly)]
    mode: TrendModeOpt,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    filter: SummaryArgs,
    /// Output file path
    #[arg(short, long)]
    output: PathBuf,
    /// What to export
    #[arg(long, value_enum, default_value_t = ExportKind::Records)]
    kind: ExportKind,
    /// Export format (records only; metrics are always JSON)
    #[arg(long, value_enum, default_value_t = ExportFormatOpt::Csv)]
    format: ExportFormatOpt,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum TrendModeOpt {
    Weekly,
    Monthly,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ExportKind {
    Records,
    Metrics,
    Actions,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ExportFormatOpt {
    Csv,
    Json,
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Stats(args) => cmd_stats(args),
        Commands::Summary(args) => cmd_summary(args),
        Commands::Actions(args) => cmd_actions(args),
        Commands::Trend(args) => cmd_trend(args),
        Commands::Export(args) => cmd_export(args),
    }
}

fn load_dataset(data_dir: &PathBuf, skip_invalid: bool) -> PracticeDataset {
    let result = PracticeDatasetBuilder::new()
        .treatment_plans_path(data_dir.join(udadash::constants::TREATMENT_PLANS_FILE))
        .nhs_plans_path(data_dir.join(udadash::constants::NHS_PLANS_FILE))
        .claims_path(data_dir.join(udadash::constants::CLAIMS_FILE))
        .skip_invalid_records(skip_invalid)
        .load();
    match result {
        Ok(dataset) => dataset,
        Err(e) => {
            eprintln!("Error loading dataset: {}", e.user_message());
            std::process::exit(1);
        }
    }
}

fn filter_params(args: &SummaryArgs) -> FilterParams {
    let mut params = FilterParams::new();
    params.start_date = args.start;
    params.end_date = args.end;
    params.account_id = args.account.clone();
    params
}

fn cmd_stats(args: StatsArgs) {
    let dataset = load_dataset(&args.data_dir, false);
    dataset.statistics().print_summary();
}

fn cmd_summary(args: SummaryArgs) {
    let dataset = load_dataset(&args.data_dir, args.skip_invalid);
    let output = dataset.run(&filter_params(&args));
    let m = &output.metrics;

    println!("Classified rows: {}", output.records.len());
    println!();
    println!("Private plans");
    println!("  Active:          {}", m.counts.private.active);
    println!("  Not yet started: {}", m.counts.private.not_started);
    println!("  In progress:     {}", m.counts.private.in_progress);
    println!("  Completed:       {}", m.counts.private.completed);
    println!("NHS or mixed plans");
    println!("  Active:          {}", m.counts.nhs_or_mixed.active);
    println!("  Not yet started: {}", m.counts.nhs_or_mixed.not_started);
    println!("  In progress:     {}", m.counts.nhs_or_mixed.in_progress);
    println!("  Completed:       {}", m.counts.nhs_or_mixed.completed);
    println!();
    println!("UDA breakdown (all NHS)");
    println!("  Completed plan UDAs:    {:.2}", m.breakdown.completed_plan_udas);
    println!("  Yet to claim:           {:.2}", m.breakdown.yet_to_claim);
    println!("  Claimed:                {:.2}", m.breakdown.claimed);
    println!("  Awaiting response:      {:.2}", m.breakdown.awaiting_response);
    println!("  Successful:             {:.2}", m.breakdown.successful);
    println!("  Failed:                 {:.2}", m.breakdown.failed);
    println!("  Failure rate:           {:.1}%", m.breakdown.failure_rate);
    println!();
    println!(
        "{:<10} {:>10} {:>10} {:>12} {:>11} {:>9} {:>8}",
        "Provider", "Completed", "Claimed", "Yet to claim", "Successful", "Awaiting", "Failed"
    );
    for row in m.providers.rows.iter().chain(std::iter::once(&m.providers.total)) {
        println!(
            "{:<10} {:>10.2} {:>10.2} {:>12.2} {:>11.2} {:>9.2} {:>8.2}",
            row.provider,
            row.completed,
            row.claimed,
            row.yet_to_claim,
            row.successful,
            row.awaiting_response,
            row.failed
        );
    }
}

fn cmd_actions(args: SummaryArgs) {
    let dataset = load_dataset(&args.data_dir, args.skip_invalid);
    let output = dataset.run(&filter_params(&args));
    let rows = action_table(&output.records);

    if rows.is_empty() {
        println!("No plans require action.");
        return;
    }
    for row in &rows {
        println!(
            "{} | {} | {} | {} | {} | {}",
            row.plan_id, row.provider, row.band, row.claim_status, row.first_completed, row.action
        );
    }
    println!("Total plans requiring action: {}", rows.len());
}

fn cmd_trend(args: TrendArgs) {
    let dataset = load_dataset(&args.filter.data_dir, args.filter.skip_invalid);
    let output = dataset.run(&filter_params(&args.filter));
    let mode = match args.mode {
        TrendModeOpt::Weekly => TrendMode::Weekly,
        TrendModeOpt::Monthly => TrendMode::Monthly,
    };
    let trend = provider_trend(&output.records, &args.provider, mode);

    if trend.is_empty() {
        println!("No trend-eligible plans for provider {}.", args.provider);
        return;
    }
    println!(
        "{:<16} {:>10} {:>10} {:>11} {:>8}",
        "Period", "Total", "Claimed", "Successful", "Failed"
    );
    for period in &trend {
        println!(
            "{:<16} {:>10.2} {:>10.2} {:>11.2} {:>8.2}",
            period.label,
            period.total_udas,
            period.claimed_udas,
            period.successful_udas,
            period.failed_udas
        );
    }
}

fn cmd_export(args: ExportArgs) {
    let dataset = load_dataset(&args.filter.data_dir, args.filter.skip_invalid);
    let output = dataset.run(&filter_params(&args.filter));

    let result = match (args.kind, args.format) {
        (ExportKind::Records, ExportFormatOpt::Csv) => {
            udadash::export::export_records_csv(&output.records, &args.output)
        }
        (ExportKind::Records, ExportFormatOpt::Json) => {
            udadash::export::export_records_json(&output.records, &args.output)
        }
        (ExportKind::Metrics, _) => {
            udadash::export::export_metrics_json(&output.metrics, &args.output)
        }
        (ExportKind::Actions, _) => {
            let rows = action_table(&output.records);
            udadash::export::export_action_table_csv(&rows, &args.output)
        }
    };

    match result {
        Ok(()) => println!("Exported to {}", args.output.display()),
        Err(e) => {
            eprintln!("Export failed: {}", e.user_message());
            std::process::exit(1);
        }
    }
}
