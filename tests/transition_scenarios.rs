//! End-to-end DPD transition behaviour, driven through the CSV loader the
//! same way the CLI drives it.

use chrono::NaiveDate;
use loan_report::cache::DetectionCache;
use loan_report::filter::{self, Filters};
use loan_report::loader::load_from_reader;
use loan_report::types::{LoanActivityRecord, LoanId};
use loan_report::{detect, get_timeline, resolve_loan_id, ReportError};
use std::collections::HashMap;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const HEADER: &str = "DisbursementID,Date,NumberOfDaysPastDue,PTP Status,PTP Amount,Collection Amount,Customer Name,Branch,IsActive";

fn load(rows: &[&str]) -> Vec<LoanActivityRecord> {
    init_logging();
    let mut csv = String::from(HEADER);
    for r in rows {
        csv.push('\n');
        csv.push_str(r);
    }
    csv.push('\n');
    let (records, _) = load_from_reader(csv.as_bytes()).expect("load csv");
    records
}

/// Four loans: a rise then fall, only rises, a single record and two cycles.
fn scenario_rows() -> Vec<&'static str> {
    vec![
        // A: promise, rise 0 -> 10 -> 25, fall to 5.
        "L1,2024-01-01,0,No PTP,0,0,Asha,Pune,True",
        "L1,2024-01-05,10,Pending,2000,0,Asha,Pune,True",
        "L1,2024-01-10,25,,,500,Asha,Pune,True",
        "L1,2024-01-20,5,,,1500,Asha,Pune,True",
        // B: DPD only ever rises.
        "L2,2024-01-01,0,Fulfilled,1000,1000,Ravi,Nashik,True",
        "L2,2024-01-05,7,,,,Ravi,Nashik,True",
        "L2,2024-01-09,30,,,,Ravi,Nashik,True",
        // C: a promise but a single record.
        "L3,2024-01-03,40,Broken,700,,Meera,Pune,False",
        // D: two rise/fall cycles; listed out of date order on purpose.
        "L4,2024-02-10,3,,,250,Kiran,Nagpur,True",
        "L4,2024-02-01,0,Pending,300,,Kiran,Nagpur,True",
        "L4,2024-02-05,20,,,,Kiran,Nagpur,True",
        "L4,2024-02-15,18,,,,Kiran,Nagpur,True",
        "L4,2024-02-20,12,Broken,100,50.5,Kiran,Nagpur,True",
        "L4,2024-02-08,9,,,,Kiran,Nagpur,True",
    ]
}

#[test]
fn scenario_a_promise_rise_then_fall_qualifies() {
    let detection = detect(&load(&scenario_rows()));
    let s = detection
        .summary_for(&LoanId::new("L1"))
        .expect("L1 should qualify");
    assert_eq!(s.total_records, 4);
    assert_eq!(s.dpd_increases, 2);
    assert_eq!(s.dpd_decreases, 1);
    assert_eq!(s.max_dpd, 25);
    assert_eq!(s.current_dpd, 5);
    assert_eq!(s.total_collection, 2000.0);
    assert_eq!(s.total_promise_amount, 2000.0);
    assert_eq!(s.customer_name.as_deref(), Some("Asha"));
    assert_eq!(s.branch.as_deref(), Some("Pune"));
}

#[test]
fn scenario_a_counts_every_rise_in_the_timeline() {
    // Day 1 DPD 0, day 5 DPD 10 with a pending promise, day 10 DPD 25,
    // day 20 DPD 5. The first record carries no promise at all here.
    let d = |n| NaiveDate::from_ymd_opt(2024, 1, n).unwrap();
    let mut records = vec![
        LoanActivityRecord::new(LoanId::new("L1"), d(1), 0),
        LoanActivityRecord::new(LoanId::new("L1"), d(5), 10),
        LoanActivityRecord::new(LoanId::new("L1"), d(10), 25),
        LoanActivityRecord::new(LoanId::new("L1"), d(20), 5),
    ];
    records[1].promise_status = Some("Pending".to_string());
    let detection = detect(&records);
    assert_eq!(detection.qualifying, vec![LoanId::new("L1")]);
    let s = &detection.summaries[0];
    // Day 1 -> 5 is also a rise, so the whole timeline has two increases.
    assert_eq!(s.dpd_increases, 2);
    assert_eq!(s.dpd_decreases, 1);
    assert_eq!(s.max_dpd, 25);
    assert_eq!(s.current_dpd, 5);
}

#[test]
fn scenario_b_only_increases_does_not_qualify() {
    let detection = detect(&load(&scenario_rows()));
    assert!(!detection.is_qualifying(&LoanId::new("L2")));
    let timeline = get_timeline(&detection.annotated, &LoanId::new("L2"));
    assert_eq!(timeline.len(), 3);
    assert!(timeline.iter().all(|a| !a.decreased));
}

#[test]
fn scenario_c_single_record_has_no_deltas() {
    let detection = detect(&load(&scenario_rows()));
    assert!(!detection.is_qualifying(&LoanId::new("L3")));
    let timeline = get_timeline(&detection.annotated, &LoanId::new("L3"));
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].days_past_due_delta, None);
    assert_eq!(timeline[0].previous_days_past_due, None);
    assert!(!timeline[0].increased && !timeline[0].decreased);
}

#[test]
fn scenario_d_two_cycles_counted_over_the_whole_timeline() {
    let detection = detect(&load(&scenario_rows()));
    let s = detection
        .summary_for(&LoanId::new("L4"))
        .expect("L4 should qualify");
    // 0 -> 20 -> 9 -> 3 -> 18 -> 12
    assert_eq!(s.total_records, 6);
    assert_eq!(s.dpd_increases, 2);
    assert_eq!(s.dpd_decreases, 3);
    assert_eq!(s.max_dpd, 20);
    assert_eq!(s.current_dpd, 12);
    assert_eq!(s.total_collection, 300.5);
    assert_eq!(s.total_promise_amount, 400.0);

    let dpds: Vec<i64> = get_timeline(&detection.annotated, &LoanId::new("L4"))
        .iter()
        .map(|a| a.record.days_past_due)
        .collect();
    assert_eq!(dpds, vec![0, 20, 9, 3, 18, 12]);
}

#[test]
fn qualifying_set_and_annotations_cover_every_record() {
    let records = load(&scenario_rows());
    let detection = detect(&records);
    assert_eq!(detection.qualifying, vec![LoanId::new("L1"), LoanId::new("L4")]);
    assert_eq!(detection.summaries.len(), detection.qualifying.len());
    assert_eq!(detection.annotated.len(), records.len());
}

#[test]
fn flags_are_exclusive_and_first_records_unflagged() {
    let detection = detect(&load(&scenario_rows()));
    let mut seen: HashMap<&LoanId, usize> = HashMap::new();
    for a in &detection.annotated {
        assert!(!(a.increased && a.decreased));
        let n = seen.entry(&a.record.loan_id).or_default();
        if *n == 0 {
            assert!(!a.increased && !a.decreased);
            assert_eq!(a.days_past_due_delta, None);
        } else {
            let prev = a.previous_days_past_due.expect("previous value");
            assert_eq!(a.days_past_due_delta, Some(a.record.days_past_due - prev));
        }
        *n += 1;
    }
}

#[test]
fn single_record_loans_never_qualify() {
    let rows: Vec<String> = (0..20)
        .map(|i| format!("S{i},2024-03-01,{},Pending,100,0,,,True", i * 3))
        .collect();
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
    assert!(detect(&load(&rows)).qualifying.is_empty());
}

#[test]
fn detection_is_idempotent() {
    let records = load(&scenario_rows());
    assert_eq!(detect(&records), detect(&records));
}

#[test]
fn padded_and_float_ids_resolve_to_the_canonical_loan() {
    let records = load(&[
        "0270001375,2024-01-01,0,Pending,100,,,,True",
        "0270001375,2024-01-02,10,,,,,,True",
        "0270001375,2024-01-03,4,,,,,,True",
    ]);
    let detection = detect(&records);
    for input in ["0270001375", "270001375", "270001375.0"] {
        let id = resolve_loan_id(input, &detection.qualifying).expect("resolves");
        assert_eq!(id.as_str(), "0270001375");
        assert_eq!(get_timeline(&detection.annotated, id).len(), 3);
    }
    assert!(matches!(
        resolve_loan_id("270001376", &detection.qualifying),
        Err(ReportError::LoanNotFound { .. })
    ));
}

#[test]
fn detection_runs_on_the_filtered_subset() {
    let records = load(&scenario_rows());
    let filters = Filters {
        date_to: NaiveDate::from_ymd_opt(2024, 1, 31),
        ..Filters::default()
    };
    let filtered = filter::apply(&records, &filters);
    let mut cache = DetectionCache::new();
    assert_eq!(cache.get_or_detect(&filtered).qualifying, vec![LoanId::new("L1")]);
    assert_eq!(cache.get_or_detect(&records).qualifying.len(), 2);
    assert_eq!(cache.get_or_detect(&records).qualifying.len(), 2);
    assert_eq!((cache.misses(), cache.hits()), (2, 1));
}
