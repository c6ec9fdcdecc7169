use crate::config::NoPtpRule;
use crate::types::{
    AnnotatedRecord, BranchCollectionRow, BranchPerformance, BranchPerformanceRow, DailyTrendRow,
    DpdBucketRow, LoanActivityRecord, LoanId, MetricRow, NoPtpCustomerRow, PtpCustomerRow,
    SourceCollectionRow, StatusBreakdownRow, SummaryStats, TimelineRow, TransitionSummary,
    TransitionSummaryRow, NO_PTP,
};
use crate::util::{
    average, format_currency, format_currency_whole, format_int, format_number, format_pct,
    safe_rate,
};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

fn unique_loans<'a, I>(records: I) -> usize
where
    I: IntoIterator<Item = &'a LoanActivityRecord>,
{
    records.into_iter().map(|r| &r.loan_id).collect::<HashSet<_>>().len()
}

/// Keep the first non-empty value seen, like a grouped `first`.
fn keep_first<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if slot.is_none() {
        slot.clone_from(value);
    }
}

fn or_dash(s: &Option<String>) -> String {
    s.clone().unwrap_or_else(|| "-".to_string())
}

fn desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

// ---------------------------------------------------------------------------
// Key performance indicators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct KpiSummary {
    pub unique_customers: usize,
    pub total_communications: u64,
    pub whatsapp: u64,
    pub blaster: u64,
    pub ai_calls: u64,
    pub ptp_amount: f64,
    pub collection_amount: f64,
    pub overdue_amount: f64,
    pub collection_rate: f64,
}

pub fn kpi_summary(data: &[LoanActivityRecord]) -> KpiSummary {
    let collection_amount: f64 = data.iter().map(|r| r.collection_or_zero()).sum();
    let overdue_amount: f64 = data.iter().map(|r| r.overdue_or_zero()).sum();
    KpiSummary {
        unique_customers: unique_loans(data),
        total_communications: data.iter().map(|r| r.total_communications).sum(),
        whatsapp: data.iter().map(|r| r.whatsapp).sum(),
        blaster: data.iter().map(|r| r.blaster).sum(),
        ai_calls: data.iter().map(|r| r.ai_calls).sum(),
        ptp_amount: data.iter().map(|r| r.promise_amount_or_zero()).sum(),
        collection_amount,
        overdue_amount,
        collection_rate: safe_rate(collection_amount, overdue_amount),
    }
}

fn metric(name: &str, value: String) -> MetricRow {
    MetricRow {
        metric: name.to_string(),
        value,
    }
}

pub fn kpi_rows(k: &KpiSummary) -> Vec<MetricRow> {
    vec![
        metric("Unique Customers", format_int(k.unique_customers)),
        metric("Total Communications", format_int(k.total_communications)),
        metric("PTP Amount", format_currency_whole(k.ptp_amount)),
        metric("Collection Amount", format_currency_whole(k.collection_amount)),
        metric("Collection Rate", format_pct(k.collection_rate, 2)),
    ]
}

pub fn channel_rows(k: &KpiSummary) -> Vec<MetricRow> {
    vec![
        metric("WhatsApp Sent", format_int(k.whatsapp)),
        metric("Blaster Sent", format_int(k.blaster)),
        metric("AI Calls Sent", format_int(k.ai_calls)),
    ]
}

// ---------------------------------------------------------------------------
// Collection by PTP source
// ---------------------------------------------------------------------------

/// Rows with a collection and a known PTP source.
pub fn collection_records(data: &[LoanActivityRecord]) -> Vec<LoanActivityRecord> {
    data.iter()
        .filter(|r| r.collection_or_zero() > 0.0 && r.promise_source.is_some())
        .cloned()
        .collect()
}

pub fn collection_by_source(data: &[LoanActivityRecord]) -> Vec<SourceCollectionRow> {
    let mut map: HashMap<String, Vec<f64>> = HashMap::new();
    for r in data {
        let amount = r.collection_or_zero();
        if amount <= 0.0 {
            continue;
        }
        if let Some(source) = &r.promise_source {
            map.entry(source.clone()).or_default().push(amount);
        }
    }
    let mut tmp: Vec<(String, usize, f64, f64)> = map
        .into_iter()
        .map(|(source, amounts)| {
            let total: f64 = amounts.iter().sum();
            (source, amounts.len(), total, average(&amounts))
        })
        .collect();
    tmp.sort_by(|a, b| desc(a.2, b.2).then_with(|| a.0.cmp(&b.0)));
    tmp.into_iter()
        .map(|(source, collections, total, avg)| SourceCollectionRow {
            source,
            collections,
            total_amount: format_currency(total),
            average_amount: format_currency(avg),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// PTP status analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct StatusAcc {
    records: usize,
    loans: HashSet<LoanId>,
    collection: f64,
    promise_amount: f64,
}

impl StatusAcc {
    fn add(&mut self, r: &LoanActivityRecord) {
        self.records += 1;
        self.loans.insert(r.loan_id.clone());
        self.collection += r.collection_or_zero();
        self.promise_amount += r.promise_amount_or_zero();
    }
}

/// Per-status rows sorted by PTP amount, largest first.
fn status_rows<'a, I>(records: I) -> Vec<StatusBreakdownRow>
where
    I: IntoIterator<Item = &'a LoanActivityRecord>,
{
    let mut map: HashMap<String, StatusAcc> = HashMap::new();
    for r in records {
        if let Some(status) = &r.promise_status {
            map.entry(status.clone()).or_default().add(r);
        }
    }
    let mut accs: Vec<(String, StatusAcc)> = map.into_iter().collect();
    accs.sort_by(|a, b| desc(a.1.promise_amount, b.1.promise_amount).then_with(|| a.0.cmp(&b.0)));
    accs.into_iter()
        .map(|(status, acc)| StatusBreakdownRow {
            status,
            records: acc.records,
            customers: acc.loans.len(),
            collection: format_currency(acc.collection),
            promise_amount: format_currency(acc.promise_amount),
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct PtpStatusAnalysis {
    pub total: usize,
    pub fulfilled: usize,
    pub broken: usize,
    pub pending: usize,
    pub success_rate: f64,
    pub by_status: Vec<StatusBreakdownRow>,
}

/// `None` when no record carries a promise status.
pub fn ptp_status_analysis(data: &[LoanActivityRecord]) -> Option<PtpStatusAnalysis> {
    let ptp: Vec<&LoanActivityRecord> = data.iter().filter(|r| r.promise_status.is_some()).collect();
    if ptp.is_empty() {
        return None;
    }
    let count = |s: &str| ptp.iter().filter(|r| r.promise_status.as_deref() == Some(s)).count();
    let fulfilled = count("Fulfilled");
    Some(PtpStatusAnalysis {
        total: ptp.len(),
        fulfilled,
        broken: count("Broken"),
        pending: count("Pending"),
        success_rate: safe_rate(fulfilled as f64, ptp.len() as f64),
        by_status: status_rows(ptp.iter().copied()),
    })
}

pub fn ptp_metric_rows(a: &PtpStatusAnalysis) -> Vec<MetricRow> {
    vec![
        metric("Fulfilled", format_int(a.fulfilled)),
        metric("Broken", format_int(a.broken)),
        metric("Pending", format_int(a.pending)),
        metric("Success Rate", format_pct(a.success_rate, 1)),
    ]
}

// ---------------------------------------------------------------------------
// PTP date range analysis
// ---------------------------------------------------------------------------

/// Earliest and latest PTP date, the default range for the analysis.
pub fn ptp_date_bounds(data: &[LoanActivityRecord]) -> Option<(NaiveDate, NaiveDate)> {
    let min = data.iter().filter_map(|r| r.promise_date).min()?;
    let max = data.iter().filter_map(|r| r.promise_date).max()?;
    Some((min, max))
}

#[derive(Debug, Clone)]
pub struct PtpRangeAnalysis {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_customers: usize,
    pub total_ptp_amount: f64,
    pub total_collection: f64,
    pub total_communications: u64,
    pub collection_pct: f64,
    pub customers_with_collection: usize,
    pub collection_received: f64,
    pub customers_without_collection: usize,
    pub ptp_amount_unpaid: f64,
    pub with_collection_by_status: Vec<StatusBreakdownRow>,
    pub without_collection_by_status: Vec<StatusBreakdownRow>,
    pub customers: Vec<PtpCustomerRow>,
}

#[derive(Debug, Default)]
struct PtpLoanAcc {
    customer_name: Option<String>,
    branch: Option<String>,
    promise_date: Option<NaiveDate>,
    promise_status: Option<String>,
    promise_amount: f64,
    collection: f64,
    communications: u64,
}

/// Promises dated inside `[from, to]` with both status and amount recorded,
/// optionally narrowed to one status. `None` when nothing falls in range.
pub fn ptp_date_range_analysis(
    data: &[LoanActivityRecord],
    from: NaiveDate,
    to: NaiveDate,
    status: Option<&str>,
) -> Option<PtpRangeAnalysis> {
    let in_range: Vec<&LoanActivityRecord> = data
        .iter()
        .filter(|r| matches!(r.promise_date, Some(d) if d >= from && d <= to))
        .filter(|r| r.promise_status.is_some() && r.promise_amount.is_some())
        .filter(|r| status.map_or(true, |s| r.promise_status.as_deref() == Some(s)))
        .collect();
    if in_range.is_empty() {
        return None;
    }

    let (collected, uncollected): (Vec<&LoanActivityRecord>, Vec<&LoanActivityRecord>) =
        in_range.iter().copied().partition(|r| r.collection_or_zero() > 0.0);

    let total_ptp_amount: f64 = in_range.iter().map(|r| r.promise_amount_or_zero()).sum();
    let total_collection: f64 = in_range.iter().map(|r| r.collection_or_zero()).sum();

    let mut by_loan: BTreeMap<LoanId, PtpLoanAcc> = BTreeMap::new();
    for r in &in_range {
        let acc = by_loan.entry(r.loan_id.clone()).or_default();
        keep_first(&mut acc.customer_name, &r.customer_name);
        keep_first(&mut acc.branch, &r.branch);
        keep_first(&mut acc.promise_date, &r.promise_date);
        keep_first(&mut acc.promise_status, &r.promise_status);
        acc.promise_amount += r.promise_amount_or_zero();
        acc.collection += r.collection_or_zero();
        acc.communications += r.total_communications;
    }
    let customers = by_loan
        .into_iter()
        .map(|(loan_id, acc)| PtpCustomerRow {
            loan_id: loan_id.to_string(),
            customer_name: or_dash(&acc.customer_name),
            branch: or_dash(&acc.branch),
            promise_date: acc.promise_date.map(|d| d.to_string()).unwrap_or_default(),
            promise_status: or_dash(&acc.promise_status),
            promise_amount: format_currency(acc.promise_amount),
            collection_amount: format_currency(acc.collection),
            communications: acc.communications,
            collection_status: if acc.collection > 0.0 {
                "Collected".to_string()
            } else {
                "Not Collected".to_string()
            },
        })
        .collect();

    Some(PtpRangeAnalysis {
        from,
        to,
        total_customers: unique_loans(in_range.iter().copied()),
        total_ptp_amount,
        total_collection,
        total_communications: in_range.iter().map(|r| r.total_communications).sum(),
        collection_pct: safe_rate(total_collection, total_ptp_amount),
        customers_with_collection: unique_loans(collected.iter().copied()),
        collection_received: collected.iter().map(|r| r.collection_or_zero()).sum(),
        customers_without_collection: unique_loans(uncollected.iter().copied()),
        ptp_amount_unpaid: uncollected.iter().map(|r| r.promise_amount_or_zero()).sum(),
        with_collection_by_status: status_rows(collected.iter().copied()),
        without_collection_by_status: status_rows(uncollected.iter().copied()),
        customers,
    })
}

pub fn ptp_range_metric_rows(a: &PtpRangeAnalysis) -> Vec<MetricRow> {
    vec![
        metric("Total PTP Customers", format_int(a.total_customers)),
        metric("Total PTP Amount", format_currency_whole(a.total_ptp_amount)),
        metric("Collection Received", format_currency_whole(a.total_collection)),
        metric("Total Communications", format_int(a.total_communications)),
        metric("Collection %", format_pct(a.collection_pct, 1)),
        metric("Customers Who Gave Collection", format_int(a.customers_with_collection)),
        metric("Collection Amount", format_currency_whole(a.collection_received)),
        metric("Customers Who Did NOT Give Collection", format_int(a.customers_without_collection)),
        metric("PTP Amount (Unpaid)", format_currency_whole(a.ptp_amount_unpaid)),
    ]
}

// ---------------------------------------------------------------------------
// Collections without PTP
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NoPtpAnalysis {
    pub customers: usize,
    pub total_collection: f64,
    pub total_communications: u64,
    pub avg_per_customer: f64,
    pub by_branch: Vec<BranchCollectionRow>,
    pub details: Vec<NoPtpCustomerRow>,
}

fn without_promise(r: &LoanActivityRecord, rule: NoPtpRule) -> bool {
    let zero_amount = r.promise_amount_or_zero() == 0.0;
    match rule {
        NoPtpRule::ZeroAmount => zero_amount,
        NoPtpRule::ZeroAmountAndNoStatus => zero_amount && !r.has_promise(),
    }
}

#[derive(Debug, Default)]
struct NoPtpLoanAcc {
    customer_name: Option<String>,
    branch: Option<String>,
    promise_status: Option<String>,
    promise_amount: Option<f64>,
    collection: f64,
    communications: u64,
}

/// Collections made with no promise to pay behind them.
///
/// When the dataset carries collection dates, only collections dated inside
/// `[from, to]` count; otherwise the range is not applied.
pub fn collections_without_ptp(
    data: &[LoanActivityRecord],
    from: NaiveDate,
    to: NaiveDate,
    rule: NoPtpRule,
) -> Option<NoPtpAnalysis> {
    let dated = data.iter().any(|r| r.collection_date.is_some());
    let rows: Vec<&LoanActivityRecord> = data
        .iter()
        .filter(|r| r.collection_or_zero() > 0.0 && without_promise(r, rule))
        .filter(|r| !dated || matches!(r.collection_date, Some(d) if d >= from && d <= to))
        .collect();
    if rows.is_empty() {
        return None;
    }

    let mut by_loan: BTreeMap<LoanId, NoPtpLoanAcc> = BTreeMap::new();
    let mut by_branch: HashMap<String, (HashSet<LoanId>, f64, u64)> = HashMap::new();
    for r in &rows {
        let acc = by_loan.entry(r.loan_id.clone()).or_default();
        keep_first(&mut acc.customer_name, &r.customer_name);
        keep_first(&mut acc.branch, &r.branch);
        keep_first(&mut acc.promise_status, &r.promise_status);
        keep_first(&mut acc.promise_amount, &r.promise_amount);
        acc.collection += r.collection_or_zero();
        acc.communications += r.total_communications;

        if let Some(branch) = &r.branch {
            let e = by_branch.entry(branch.clone()).or_default();
            e.0.insert(r.loan_id.clone());
            e.1 += r.collection_or_zero();
            e.2 += r.total_communications;
        }
    }

    let per_loan: Vec<f64> = by_loan.values().map(|a| a.collection).collect();
    let avg_per_customer = average(&per_loan);

    let mut branches: Vec<(String, (HashSet<LoanId>, f64, u64))> = by_branch.into_iter().collect();
    branches.sort_by(|a, b| desc((a.1).1, (b.1).1).then_with(|| a.0.cmp(&b.0)));
    let by_branch = branches
        .into_iter()
        .take(10)
        .map(|(branch, (loans, collection, comms))| BranchCollectionRow {
            branch,
            customers: loans.len(),
            collection_amount: format_currency(collection),
            communications: comms,
        })
        .collect();

    let details = by_loan
        .into_iter()
        .map(|(loan_id, acc)| NoPtpCustomerRow {
            loan_id: loan_id.to_string(),
            customer_name: or_dash(&acc.customer_name),
            branch: or_dash(&acc.branch),
            collection_amount: format_currency(acc.collection),
            communications: acc.communications,
            promise_status: acc.promise_status.unwrap_or_else(|| NO_PTP.to_string()),
            promise_amount: match acc.promise_amount {
                Some(v) if v > 0.0 => format_currency(v),
                _ => NO_PTP.to_string(),
            },
        })
        .collect();

    Some(NoPtpAnalysis {
        customers: unique_loans(rows.iter().copied()),
        total_collection: rows.iter().map(|r| r.collection_or_zero()).sum(),
        total_communications: rows.iter().map(|r| r.total_communications).sum(),
        avg_per_customer,
        by_branch,
        details,
    })
}

pub fn no_ptp_metric_rows(a: &NoPtpAnalysis) -> Vec<MetricRow> {
    vec![
        metric("Customers", format_int(a.customers)),
        metric("Total Collection", format_currency_whole(a.total_collection)),
        metric("Communications", format_int(a.total_communications)),
        metric("Avg per Customer", format_currency_whole(a.avg_per_customer)),
    ]
}

// ---------------------------------------------------------------------------
// Branch performance
// ---------------------------------------------------------------------------

/// Per-branch totals sorted by collection, largest first. Records without a
/// branch are left out.
pub fn branch_performance(data: &[LoanActivityRecord]) -> Vec<BranchPerformance> {
    #[derive(Default)]
    struct Acc {
        collection: f64,
        overdue: f64,
        loans: HashSet<LoanId>,
        comms: u64,
    }
    let mut map: HashMap<String, Acc> = HashMap::new();
    for r in data {
        let Some(branch) = &r.branch else { continue };
        let e = map.entry(branch.clone()).or_default();
        e.collection += r.collection_or_zero();
        e.overdue += r.overdue_or_zero();
        e.loans.insert(r.loan_id.clone());
        e.comms += r.total_communications;
    }
    let mut rows: Vec<BranchPerformance> = map
        .into_iter()
        .map(|(branch, acc)| BranchPerformance {
            branch,
            collection_amount: acc.collection,
            overdue_amount: acc.overdue,
            unique_customers: acc.loans.len(),
            communications: acc.comms,
            collection_rate: safe_rate(acc.collection, acc.overdue),
        })
        .collect();
    rows.sort_by(|a, b| {
        desc(a.collection_amount, b.collection_amount).then_with(|| a.branch.cmp(&b.branch))
    });
    rows
}

pub fn top_branches(perf: &[BranchPerformance], n: usize) -> Vec<BranchPerformance> {
    perf.iter().take(n).cloned().collect()
}

/// The last `n` branches that collected anything, in ranking order.
pub fn bottom_branches(perf: &[BranchPerformance], n: usize) -> Vec<BranchPerformance> {
    let collecting: Vec<&BranchPerformance> =
        perf.iter().filter(|b| b.collection_amount > 0.0).collect();
    let skip = collecting.len().saturating_sub(n);
    collecting.into_iter().skip(skip).cloned().collect()
}

pub fn branch_rows(perf: &[BranchPerformance]) -> Vec<BranchPerformanceRow> {
    perf.iter()
        .map(|b| BranchPerformanceRow {
            branch: b.branch.clone(),
            collection_amount: format_currency(b.collection_amount),
            overdue_amount: format_currency(b.overdue_amount),
            unique_customers: b.unique_customers,
            communications: b.communications,
            collection_rate: format_number(b.collection_rate, 2),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// DPD buckets, portfolio status, trends
// ---------------------------------------------------------------------------

pub const DPD_BUCKETS: [&str; 6] = [
    "0 Days (Current)",
    "1-30 Days",
    "31-60 Days",
    "61-90 Days",
    "91-180 Days",
    "180+ Days",
];

pub fn dpd_bucket(days: i64) -> &'static str {
    match days {
        d if d <= 0 => DPD_BUCKETS[0],
        1..=30 => DPD_BUCKETS[1],
        31..=60 => DPD_BUCKETS[2],
        61..=90 => DPD_BUCKETS[3],
        91..=180 => DPD_BUCKETS[4],
        _ => DPD_BUCKETS[5],
    }
}

/// Record count and overdue total per bucket, in bucket order, zero-filled.
pub fn dpd_buckets(data: &[LoanActivityRecord]) -> Vec<DpdBucketRow> {
    let mut counts: HashMap<&'static str, (usize, f64)> = HashMap::new();
    for r in data {
        let e = counts.entry(dpd_bucket(r.days_past_due)).or_default();
        e.0 += 1;
        e.1 += r.overdue_or_zero();
    }
    DPD_BUCKETS
        .iter()
        .map(|bucket| {
            let (records, overdue) = counts.get(bucket).copied().unwrap_or_default();
            DpdBucketRow {
                bucket: bucket.to_string(),
                records,
                overdue_amount: format_currency(overdue),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioStatus {
    pub active: usize,
    pub inactive: usize,
    pub active_rate: f64,
}

pub fn portfolio_status(data: &[LoanActivityRecord]) -> PortfolioStatus {
    let active = data.iter().filter(|r| r.is_active == Some(true)).count();
    let inactive = data.iter().filter(|r| r.is_active == Some(false)).count();
    PortfolioStatus {
        active,
        inactive,
        active_rate: safe_rate(active as f64, data.len() as f64),
    }
}

pub fn portfolio_rows(p: &PortfolioStatus) -> Vec<MetricRow> {
    vec![
        metric("Active Loans", format_int(p.active)),
        metric("Inactive Loans", format_int(p.inactive)),
        metric("Active Rate", format_pct(p.active_rate, 1)),
    ]
}

pub fn daily_trends(data: &[LoanActivityRecord]) -> Vec<DailyTrendRow> {
    let mut by_day: BTreeMap<NaiveDate, (f64, u64, f64)> = BTreeMap::new();
    for r in data {
        let e = by_day.entry(r.date).or_default();
        e.0 += r.collection_or_zero();
        e.1 += r.total_communications;
        e.2 += r.overdue_or_zero();
    }
    by_day
        .into_iter()
        .map(|(date, (collection, comms, overdue))| DailyTrendRow {
            date: date.to_string(),
            collection_amount: format_currency(collection),
            communications: comms,
            overdue_amount: format_currency(overdue),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// DPD transition presentation
// ---------------------------------------------------------------------------

pub fn transition_rows(summaries: &[TransitionSummary]) -> Vec<TransitionSummaryRow> {
    summaries
        .iter()
        .map(|s| TransitionSummaryRow {
            loan_id: s.loan_id.to_string(),
            customer_name: or_dash(&s.customer_name),
            branch: or_dash(&s.branch),
            total_records: s.total_records,
            dpd_increases: s.dpd_increases,
            dpd_decreases: s.dpd_decreases,
            max_dpd: s.max_dpd,
            current_dpd: s.current_dpd,
            total_collection: format_currency(s.total_collection),
            total_promise_amount: format_currency(s.total_promise_amount),
        })
        .collect()
}

pub fn transition_metric_rows(s: &TransitionSummary) -> Vec<MetricRow> {
    vec![
        metric("Customer Name", or_dash(&s.customer_name)),
        metric("Branch", or_dash(&s.branch)),
        metric("Total Records", format_int(s.total_records)),
        metric("Max DPD", s.max_dpd.to_string()),
        metric("Current DPD", s.current_dpd.to_string()),
        metric("DPD Increases", format_int(s.dpd_increases)),
        metric("DPD Decreases", format_int(s.dpd_decreases)),
        metric("Total Collection", format_currency(s.total_collection)),
        metric("Total PTP Amount", format_currency(s.total_promise_amount)),
    ]
}

pub fn timeline_rows(timeline: &[&AnnotatedRecord]) -> Vec<TimelineRow> {
    timeline
        .iter()
        .map(|a| {
            let r = &a.record;
            let trend = if a.increased {
                "Increased"
            } else if a.decreased {
                "Decreased"
            } else {
                ""
            };
            TimelineRow {
                date: r.date.to_string(),
                customer_name: or_dash(&r.customer_name),
                days_past_due: r.days_past_due,
                previous_days_past_due: a
                    .previous_days_past_due
                    .map(|p| p.to_string())
                    .unwrap_or_default(),
                days_past_due_delta: a
                    .days_past_due_delta
                    .map(|d| format!("{d:+}"))
                    .unwrap_or_default(),
                trend: trend.to_string(),
                promise_status: r.promise_status.clone().unwrap_or_default(),
                promise_amount: format_currency(r.promise_amount_or_zero()),
                collection_amount: format_currency(r.collection_or_zero()),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Executive summary
// ---------------------------------------------------------------------------

pub fn generate_summary(data: &[LoanActivityRecord], transition_customers: usize) -> SummaryStats {
    let k = kpi_summary(data);
    let p = portfolio_status(data);
    let ptp = ptp_status_analysis(data);
    let branches: HashSet<&str> = data.iter().filter_map(|r| r.branch.as_deref()).collect();
    SummaryStats {
        total_unique_customers: k.unique_customers,
        active_loans: p.active,
        inactive_loans: p.inactive,
        total_branches: branches.len(),
        total_overdue_amount: k.overdue_amount,
        total_collection_amount: k.collection_amount,
        collection_rate: k.collection_rate,
        total_ptp_amount: k.ptp_amount,
        total_communications: k.total_communications,
        whatsapp_messages: k.whatsapp,
        blaster_calls: k.blaster,
        ai_calls: k.ai_calls,
        total_ptps: ptp.as_ref().map_or(0, |a| a.total),
        ptp_fulfilled: ptp.as_ref().map_or(0, |a| a.fulfilled),
        ptp_broken: ptp.as_ref().map_or(0, |a| a.broken),
        ptp_success_rate: ptp.as_ref().map_or(0.0, |a| a.success_rate),
        dpd_transition_customers: transition_customers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    struct Rec(LoanActivityRecord);

    impl Rec {
        fn new(id: &str, d: u32, dpd: i64) -> Self {
            Rec(LoanActivityRecord::new(LoanId::new(id), day(d), dpd))
        }
        fn branch(mut self, b: &str) -> Self {
            self.0.branch = Some(b.to_string());
            self
        }
        fn ptp(mut self, status: &str, amount: f64, date: u32) -> Self {
            self.0.promise_status = Some(status.to_string());
            self.0.promise_amount = Some(amount);
            self.0.promise_date = Some(day(date));
            self
        }
        fn collected(mut self, amount: f64, source: Option<&str>) -> Self {
            self.0.collection_amount = Some(amount);
            self.0.promise_source = source.map(str::to_string);
            self
        }
        fn overdue(mut self, amount: f64) -> Self {
            self.0.overdue_amount = Some(amount);
            self
        }
        fn comms(mut self, total: u64) -> Self {
            self.0.total_communications = total;
            self
        }
        fn active(mut self, a: bool) -> Self {
            self.0.is_active = Some(a);
            self
        }
    }

    fn sample() -> Vec<LoanActivityRecord> {
        vec![
            Rec::new("1", 1, 0).branch("Pune").ptp("Pending", 1000.0, 1).overdue(2000.0).comms(3).active(true),
            Rec::new("1", 2, 15).branch("Pune").collected(500.0, Some("WhatsApp")).overdue(2000.0).comms(1).active(true),
            Rec::new("2", 1, 45).branch("Nashik").ptp("Fulfilled", 300.0, 3).collected(300.0, Some("AI Calls")).overdue(600.0).active(false),
            Rec::new("3", 2, 200).branch("Nashik").collected(150.0, None).ptp("No PTP", 0.0, 4),
            Rec::new("4", 3, 95).collected(50.0, Some("WhatsApp")),
        ]
        .into_iter()
        .map(|r| r.0)
        .collect()
    }

    #[test]
    fn kpis_sum_with_missing_values_as_zero() {
        let k = kpi_summary(&sample());
        assert_eq!(k.unique_customers, 4);
        assert_eq!(k.total_communications, 4);
        assert_eq!(k.ptp_amount, 1300.0);
        assert_eq!(k.collection_amount, 1000.0);
        assert_eq!(k.overdue_amount, 4600.0);
        assert!((k.collection_rate - 1000.0 / 4600.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn collection_rate_without_overdue_is_zero() {
        let data = vec![Rec::new("1", 1, 0).collected(100.0, None).0];
        assert_eq!(kpi_summary(&data).collection_rate, 0.0);
        assert_eq!(branch_performance(&data).len(), 0);
    }

    #[test]
    fn collection_by_source_sorts_by_total() {
        let rows = collection_by_source(&sample());
        let sources: Vec<&str> = rows.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, vec!["WhatsApp", "AI Calls"]);
        assert_eq!(rows[0].collections, 2);
        assert_eq!(rows[0].total_amount, "₹550.00");
        assert_eq!(rows[0].average_amount, "₹275.00");
        assert_eq!(collection_records(&sample()).len(), 3);
    }

    #[test]
    fn ptp_status_counts_and_success_rate() {
        let a = ptp_status_analysis(&sample()).unwrap();
        assert_eq!(a.total, 3);
        assert_eq!(a.fulfilled, 1);
        assert_eq!(a.pending, 1);
        assert_eq!(a.broken, 0);
        assert!((a.success_rate - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(a.by_status[0].status, "Pending");
        assert!(ptp_status_analysis(&[]).is_none());
    }

    #[test]
    fn ptp_range_splits_collected_and_uncollected() {
        let data = sample();
        assert_eq!(ptp_date_bounds(&data), Some((day(1), day(4))));
        let a = ptp_date_range_analysis(&data, day(1), day(3), None).unwrap();
        assert_eq!(a.total_customers, 2);
        assert_eq!(a.total_ptp_amount, 1300.0);
        assert_eq!(a.customers_with_collection, 1);
        assert_eq!(a.collection_received, 300.0);
        assert_eq!(a.customers_without_collection, 1);
        assert_eq!(a.ptp_amount_unpaid, 1000.0);
        assert_eq!(a.customers.len(), 2);
        assert_eq!(a.customers[0].collection_status, "Not Collected");
        assert_eq!(a.customers[1].collection_status, "Collected");

        let fulfilled = ptp_date_range_analysis(&data, day(1), day(3), Some("Fulfilled")).unwrap();
        assert_eq!(fulfilled.total_customers, 1);
        assert!(ptp_date_range_analysis(&data, day(20), day(30), None).is_none());
    }

    #[test]
    fn collections_without_ptp_follow_the_configured_rule() {
        let data = sample();
        let amount_rule =
            collections_without_ptp(&data, day(1), day(30), NoPtpRule::ZeroAmount).unwrap();
        // Loan 1 day 2 (no amount), loan 3 (zero amount, "No PTP") and loan 4.
        assert_eq!(amount_rule.customers, 3);
        assert_eq!(amount_rule.total_collection, 700.0);
        assert_eq!(amount_rule.details[1].promise_amount, NO_PTP);

        let strict =
            collections_without_ptp(&data, day(1), day(30), NoPtpRule::ZeroAmountAndNoStatus).unwrap();
        // Loan 1 day 2 has no status on that row, so it still counts.
        assert_eq!(strict.customers, 3);

        let mut dated = data.clone();
        dated[1].collection_date = Some(day(25));
        let ranged = collections_without_ptp(&dated, day(1), day(10), NoPtpRule::ZeroAmount);
        assert!(ranged.is_none());
    }

    #[test]
    fn branch_ranking_and_bottom_slice() {
        let perf = branch_performance(&sample());
        assert_eq!(perf[0].branch, "Pune");
        assert_eq!(perf[0].unique_customers, 1);
        assert_eq!(perf[0].collection_rate, 12.5);
        assert_eq!(perf[1].branch, "Nashik");
        assert_eq!(top_branches(&perf, 1).len(), 1);
        let bottom = bottom_branches(&perf, 1);
        assert_eq!(bottom[0].branch, "Nashik");
        assert_eq!(branch_rows(&perf)[0].collection_amount, "₹500.00");
    }

    #[test]
    fn dpd_buckets_are_ordered_and_zero_filled() {
        assert_eq!(dpd_bucket(0), "0 Days (Current)");
        assert_eq!(dpd_bucket(30), "1-30 Days");
        assert_eq!(dpd_bucket(31), "31-60 Days");
        assert_eq!(dpd_bucket(180), "91-180 Days");
        assert_eq!(dpd_bucket(181), "180+ Days");
        let rows = dpd_buckets(&sample());
        let counts: Vec<usize> = rows.iter().map(|r| r.records).collect();
        assert_eq!(counts, vec![1, 1, 1, 0, 1, 1]);
        assert_eq!(rows[3].overdue_amount, "₹0.00");
    }

    #[test]
    fn portfolio_and_trends() {
        let p = portfolio_status(&sample());
        assert_eq!((p.active, p.inactive), (2, 1));
        assert_eq!(p.active_rate, 40.0);
        assert_eq!(portfolio_status(&[]).active_rate, 0.0);
        let trends = daily_trends(&sample());
        let dates: Vec<&str> = trends.iter().map(|t| t.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-06-01", "2024-06-02", "2024-06-03"]);
    }

    #[test]
    fn summary_combines_headline_figures() {
        let s = generate_summary(&sample(), 7);
        assert_eq!(s.total_unique_customers, 4);
        assert_eq!(s.total_branches, 2);
        assert_eq!(s.total_ptps, 3);
        assert_eq!(s.dpd_transition_customers, 7);
    }
}
