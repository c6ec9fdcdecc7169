// Entry point and interactive menu.
//
// - Option [1] loads and types the CSV, printing diagnostics.
// - Option [2] sets the date/branch/status/active filters.
// - Option [3] prints the dashboard sections and exports CSV/JSON files.
// - Options [4] and [5] run the DPD transition analysis over the filtered
//   records and show a single customer's timeline.
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use loan_report::cache::DetectionCache;
use loan_report::config::Config;
use loan_report::detector::{self, Detection};
use loan_report::filter::{self, Filters, LoanStatusFilter};
use loan_report::types::LoanActivityRecord;
use loan_report::{loader, output, reports, util, ReportError};
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

// Loaded once, reused for every report generated during the session.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState::default()));

#[derive(Default)]
struct AppState {
    data: Option<Vec<LoanActivityRecord>>,
    filters: Filters,
    cache: DetectionCache,
}

fn lock_state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    read_line("Enter choice: ")
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        match read_line("Back to Report Selection (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Blank input keeps `default`; anything unparseable is reported and also
/// keeps `default`.
fn prompt_date(prompt: &str, default: Option<NaiveDate>) -> Option<NaiveDate> {
    let input = read_line(prompt);
    if input.is_empty() {
        return default;
    }
    match util::parse_date_safe(Some(&input)) {
        Some(d) => Some(d),
        None => {
            println!("Could not read '{}' as a date (use YYYY-MM-DD).", input);
            default
        }
    }
}

/// Numbered picker; `0` or blank selects "all".
fn prompt_pick(label: &str, all_label: &str, options: &[String]) -> Option<String> {
    println!("{}:", label);
    println!("  [0] {}", all_label);
    for (i, o) in options.iter().enumerate() {
        println!("  [{}] {}", i + 1, o);
    }
    let input = read_choice();
    match input.parse::<usize>() {
        Ok(n) if n >= 1 && n <= options.len() => Some(options[n - 1].clone()),
        _ => None,
    }
}

fn export(path: String, result: loan_report::ReportResult<()>) {
    match result {
        Ok(()) => println!("(Full table exported to {})\n", path),
        Err(e) => eprintln!("Write error: {}", e),
    }
}

fn stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn handle_load(cfg: &Config) {
    match loader::load_and_clean(&cfg.data_path) {
        Ok((data, load_report)) => {
            println!(
                "Processing dataset... ({} rows read, {} loaded)",
                util::format_int(load_report.total_rows),
                util::format_int(load_report.loaded_rows)
            );
            if load_report.excluded_rows() > 0 {
                println!(
                    "Note: {} rows skipped (missing ID: {}, bad date: {}, bad DPD: {}, unreadable: {}).",
                    util::format_int(load_report.excluded_rows()),
                    load_report.missing_loan_id,
                    load_report.invalid_date,
                    load_report.invalid_dpd,
                    load_report.parse_errors
                );
            }
            if let Some((min, max)) = filter::date_bounds(&data) {
                println!("Data covers {} to {}.", min, max);
            }
            println!();
            let mut state = lock_state();
            state.data = Some(data);
            state.filters = Filters::default();
            state.cache.invalidate();
        }
        Err(ReportError::MissingInput { path }) => {
            eprintln!("Error: '{}' file not found. Set LOAN_REPORT_DATA or place the file in the working directory.\n", path);
        }
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

fn handle_filters() {
    let mut guard = lock_state();
    let state = &mut *guard;
    let Some(data) = state.data.as_ref() else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };
    let bounds = filter::date_bounds(data);
    let branches = filter::branches(data);
    let statuses = filter::promise_statuses(data);

    let mut filters = Filters {
        date_from: prompt_date("Start date (YYYY-MM-DD, blank for earliest): ", bounds.map(|b| b.0)),
        date_to: prompt_date("End date (YYYY-MM-DD, blank for latest): ", bounds.map(|b| b.1)),
        branch: prompt_pick("Select Branch", "All Branches", &branches),
        promise_status: prompt_pick("Select PTP Status", "All Status", &statuses),
        loan_status: LoanStatusFilter::All,
    };
    println!("Loan Status:\n  [0] All\n  [1] Active Only\n  [2] Inactive Only");
    filters.loan_status = match read_choice().as_str() {
        "1" => LoanStatusFilter::ActiveOnly,
        "2" => LoanStatusFilter::InactiveOnly,
        _ => LoanStatusFilter::All,
    };

    let kept = filter::apply(data, &filters).len();
    println!("Filters: {}", filters.describe());
    println!("Total Records: {}\n", util::format_int(kept));
    state.filters = filters;
}

/// Run `f` over the filtered records and their (cached) detection.
fn with_filtered<R>(f: impl FnOnce(&[LoanActivityRecord], &Detection) -> R) -> Option<R> {
    let mut guard = lock_state();
    let state = &mut *guard;
    let Some(data) = state.data.as_ref() else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return None;
    };
    let filtered = filter::apply(data, &state.filters);
    if filtered.is_empty() {
        println!("No records match the current filters ({}).\n", state.filters.describe());
        return None;
    }
    let detection = state.cache.get_or_detect(&filtered);
    Some(f(&filtered, detection))
}

fn print_dashboard(cfg: &Config, data: &[LoanActivityRecord], detection: &Detection) {
    let rows = cfg.preview_rows;
    let ts = stamp();

    let kpis = reports::kpi_summary(data);
    output::preview_table("Key Performance Indicators", None, &reports::kpi_rows(&kpis), usize::MAX);
    output::preview_table("Communication Channel Breakdown", None, &reports::channel_rows(&kpis), usize::MAX);

    let by_source = reports::collection_by_source(data);
    if by_source.is_empty() {
        println!("No collection data available for the selected filters.\n");
    } else {
        output::preview_table("Collection Amount by PTP Source", None, &by_source, rows);
    }

    let ptp_status = reports::ptp_status_analysis(data);
    match &ptp_status {
        Some(a) => {
            output::preview_table("PTP (Promise to Pay) Status Analysis", None, &a.by_status, rows);
            output::preview_table("PTP Metrics", None, &reports::ptp_metric_rows(a), usize::MAX);
        }
        None => println!("No PTP data available for the selected filters.\n"),
    }

    match reports::ptp_date_bounds(data) {
        Some((min, max)) => {
            let from = prompt_date(&format!("PTP Start Date (blank for {}): ", min), Some(min)).unwrap_or(min);
            let to = prompt_date(&format!("PTP End Date (blank for {}): ", max), Some(max)).unwrap_or(max);
            let status = read_line("Specific PTP Status (blank for all): ");
            let status = (!status.is_empty()).then_some(status);
            match reports::ptp_date_range_analysis(data, from, to, status.as_deref()) {
                Some(a) => {
                    output::preview_table(
                        "PTP Date Range Analysis",
                        Some(&format!("{} to {}", a.from, a.to)),
                        &reports::ptp_range_metric_rows(&a),
                        usize::MAX,
                    );
                    output::preview_table("Customers Who Gave Collection", None, &a.with_collection_by_status, rows);
                    output::preview_table("Customers Who Did NOT Give Collection", None, &a.without_collection_by_status, rows);
                    output::preview_table("Detailed Customer List", None, &a.customers, rows);
                    let path = cfg.out_path(&format!("ptp_analysis_{}_to_{}.csv", from, to));
                    export(path.clone(), output::write_csv(&path, &a.customers));
                }
                None => println!("No PTP records found between {} and {}\n", from, to),
            }

            match reports::collections_without_ptp(data, from, to, cfg.no_ptp_rule) {
                Some(a) => {
                    output::preview_table(
                        "Collections Without PTP Analysis",
                        Some(&format!("{} to {}", from, to)),
                        &reports::no_ptp_metric_rows(&a),
                        usize::MAX,
                    );
                    output::preview_table("Branch-wise Collections Without PTP", None, &a.by_branch, rows);
                    output::preview_table("Customer Details - Collections Without PTP", None, &a.details, rows);
                    let path = cfg.out_path(&format!("collections_without_ptp_{}_to_{}.csv", from, to));
                    export(path.clone(), output::write_csv(&path, &a.details));
                }
                None => println!("No collections without PTP found in the date range {} to {}\n", from, to),
            }
        }
        None => println!("No PTP Date data available in the filtered dataset.\n"),
    }

    let perf = reports::branch_performance(data);
    output::preview_table("Top 5 Performing Branches", None, &reports::branch_rows(&reports::top_branches(&perf, 5)), 5);
    output::preview_table("Bottom 5 Branches Needing Attention", None, &reports::branch_rows(&reports::bottom_branches(&perf, 5)), 5);
    output::preview_table("Complete Branch Performance Table", None, &reports::branch_rows(&perf), rows);

    output::preview_table("Days Past Due (DPD) Analysis", None, &reports::dpd_buckets(data), usize::MAX);
    output::preview_table("Loan Portfolio Status", None, &reports::portfolio_rows(&reports::portfolio_status(data)), usize::MAX);
    output::preview_table("Trend Analysis Over Time", None, &reports::daily_trends(data), rows);

    let summary = reports::generate_summary(data, detection.qualifying.len());
    let path = cfg.out_path("summary.json");
    match output::write_json(&path, &summary) {
        Ok(()) => println!("Executive summary saved to {}\n", path),
        Err(e) => eprintln!("Write error: {}", e),
    }

    let path = cfg.out_path(&format!("filtered_data_{}.csv", ts));
    export(path.clone(), output::write_csv(&path, data));
    let path = cfg.out_path(&format!("branch_performance_{}.csv", ts));
    export(path.clone(), output::write_csv(&path, &perf));
    let collections = reports::collection_records(data);
    if !collections.is_empty() {
        let path = cfg.out_path(&format!("collection_data_{}.csv", ts));
        export(path.clone(), output::write_csv(&path, &collections));
    }
}

fn print_transitions(cfg: &Config, detection: &Detection) {
    println!("DPD Wise Transition Customer Analysis");
    println!("Customers who made a Promise to Pay, then DPD increased, then DPD decreased.\n");
    if detection.summaries.is_empty() {
        println!("No customers found with the DPD transition pattern for the selected filters.\n");
        return;
    }
    println!(
        "Found {} customers with DPD transition pattern (of {} analysed).\n",
        util::format_int(detection.qualifying.len()),
        util::format_int(detector::loan_count(&detection.annotated))
    );
    let rows = reports::transition_rows(&detection.summaries);
    output::preview_table_rows(&rows, cfg.preview_rows);
    let path = cfg.out_path(&format!("dpd_transition_customers_{}.csv", stamp()));
    export(path.clone(), output::write_csv(&path, &detection.summaries));
}

fn print_timeline(cfg: &Config, detection: &Detection) {
    if detection.qualifying.is_empty() {
        println!("No customers found with the DPD transition pattern for the selected filters.\n");
        return;
    }
    let input = read_line("Customer ID (Disbursement ID): ");
    let loan_id = match detector::resolve_loan_id(&input, &detection.qualifying) {
        Ok(id) => id,
        Err(e) => {
            println!("{}\n", e);
            return;
        }
    };
    let Some(summary) = detection.summary_for(loan_id) else {
        println!("Customer info not found for {}\n", loan_id);
        return;
    };
    let timeline = detector::get_timeline(&detection.annotated, loan_id);
    output::preview_table(
        &format!("Detailed Timeline: {}", loan_id),
        None,
        &reports::transition_metric_rows(summary),
        usize::MAX,
    );
    let rows = reports::timeline_rows(&timeline);
    output::preview_table_rows(&rows, usize::MAX);
    let path = cfg.out_path(&format!("customer_{}_timeline.csv", loan_id));
    export(path.clone(), output::write_csv(&path, &rows));
}

fn main() -> Result<()> {
    env_logger::init();
    let cfg = Config::from_env().context("reading LOAN_REPORT_* settings")?;
    log::debug!("configuration: {:?}", cfg);

    loop {
        println!("Loan Collection Analytics");
        println!("[1] Load the file");
        println!("[2] Set Filters");
        println!("[3] Generate Dashboard Reports");
        println!("[4] DPD Wise Transition Customers");
        println!("[5] Customer Timeline");
        println!("[6] Exit\n");
        match read_choice().as_str() {
            "1" => handle_load(&cfg),
            "2" => handle_filters(),
            "3" => {
                println!();
                if with_filtered(|data, detection| print_dashboard(&cfg, data, detection)).is_some()
                    && !prompt_back_to_menu()
                {
                    break;
                }
            }
            "4" => {
                println!();
                with_filtered(|_, detection| print_transitions(&cfg, detection));
            }
            "5" => {
                println!();
                with_filtered(|_, detection| print_timeline(&cfg, detection));
            }
            "6" => break,
            _ => println!("Invalid choice. Please enter a number from 1 to 6.\n"),
        }
    }
    println!("Exiting the program.");
    Ok(())
}
