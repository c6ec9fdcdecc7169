use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use tabled::Tabled;

use crate::util::normalize_loan_id;

/// One CSV row exactly as it appears in the export. Every column is optional
/// text; typing happens once in the loader.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawRow {
    #[serde(rename = "DisbursementID")]
    pub disbursement_id: Option<String>,
    #[serde(rename = "Date")]
    pub date: Option<String>,
    #[serde(rename = "NumberOfDaysPastDue")]
    pub days_past_due: Option<String>,
    #[serde(rename = "PTP Status")]
    pub ptp_status: Option<String>,
    #[serde(rename = "PTP Amount")]
    pub ptp_amount: Option<String>,
    #[serde(rename = "PTP Date")]
    pub ptp_date: Option<String>,
    #[serde(rename = "PTP Source")]
    pub ptp_source: Option<String>,
    #[serde(rename = "Collection Amount")]
    pub collection_amount: Option<String>,
    #[serde(rename = "Collection Date")]
    pub collection_date: Option<String>,
    #[serde(rename = "Overdue Amount")]
    pub overdue_amount: Option<String>,
    #[serde(rename = "Branch")]
    pub branch: Option<String>,
    #[serde(rename = "IsActive")]
    pub is_active: Option<String>,
    #[serde(rename = "Customer Name")]
    pub customer_name: Option<String>,
    // Older exports spell it without the space; some carry both columns.
    #[serde(rename = "CustomerName")]
    pub customer_name_alt: Option<String>,
    #[serde(rename = "Total Communications")]
    pub total_communications: Option<String>,
    #[serde(rename = "WhatsApp")]
    pub whatsapp: Option<String>,
    #[serde(rename = "Blaster")]
    pub blaster: Option<String>,
    #[serde(rename = "AI Calls")]
    pub ai_calls: Option<String>,
}

/// Loan identifier as it appears in the dataset (`DisbursementID`).
///
/// Equality uses the exact text; [`LoanId::normalized`] gives the
/// padding-insensitive form used for lookups. Numeric identifiers order by
/// value and sort ahead of non-numeric ones, which order by text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LoanId(String);

impl LoanId {
    pub fn new(raw: impl Into<String>) -> Self {
        LoanId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn normalized(&self) -> String {
        normalize_loan_id(&self.0)
    }

    /// Identifier without the `.0` float artifact, for headings.
    pub fn display_form(&self) -> &str {
        self.0.strip_suffix(".0").unwrap_or(&self.0)
    }

    fn numeric_value(&self) -> Option<u128> {
        let n = self.normalized();
        if n.is_empty() || !n.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        n.parse().ok()
    }
}

impl Ord for LoanId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric_value(), other.numeric_value()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for LoanId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_form())
    }
}

/// Promise status text that means "no promise recorded".
pub const NO_PTP: &str = "No PTP";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanActivityRecord {
    #[serde(rename = "DisbursementID")]
    pub loan_id: LoanId,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "NumberOfDaysPastDue")]
    pub days_past_due: i64,
    #[serde(rename = "PTP Status")]
    pub promise_status: Option<String>,
    #[serde(rename = "PTP Amount")]
    pub promise_amount: Option<f64>,
    #[serde(rename = "PTP Date")]
    pub promise_date: Option<NaiveDate>,
    #[serde(rename = "PTP Source")]
    pub promise_source: Option<String>,
    #[serde(rename = "Collection Amount")]
    pub collection_amount: Option<f64>,
    #[serde(rename = "Collection Date")]
    pub collection_date: Option<NaiveDate>,
    #[serde(rename = "Overdue Amount")]
    pub overdue_amount: Option<f64>,
    #[serde(rename = "Customer Name")]
    pub customer_name: Option<String>,
    #[serde(rename = "Branch")]
    pub branch: Option<String>,
    #[serde(rename = "IsActive")]
    pub is_active: Option<bool>,
    #[serde(rename = "Total Communications")]
    pub total_communications: u64,
    #[serde(rename = "WhatsApp")]
    pub whatsapp: u64,
    #[serde(rename = "Blaster")]
    pub blaster: u64,
    #[serde(rename = "AI Calls")]
    pub ai_calls: u64,
}

impl LoanActivityRecord {
    /// A minimal record; the remaining fields start out empty.
    pub fn new(loan_id: LoanId, date: NaiveDate, days_past_due: i64) -> Self {
        LoanActivityRecord {
            loan_id,
            date,
            days_past_due,
            promise_status: None,
            promise_amount: None,
            promise_date: None,
            promise_source: None,
            collection_amount: None,
            collection_date: None,
            overdue_amount: None,
            customer_name: None,
            branch: None,
            is_active: None,
            total_communications: 0,
            whatsapp: 0,
            blaster: 0,
            ai_calls: 0,
        }
    }

    /// True when a promise status other than "No PTP" is recorded.
    pub fn has_promise(&self) -> bool {
        matches!(self.promise_status.as_deref(), Some(s) if s != NO_PTP)
    }

    pub fn promise_amount_or_zero(&self) -> f64 {
        self.promise_amount.unwrap_or(0.0)
    }

    pub fn collection_or_zero(&self) -> f64 {
        self.collection_amount.unwrap_or(0.0)
    }

    pub fn overdue_or_zero(&self) -> f64 {
        self.overdue_amount.unwrap_or(0.0)
    }
}

/// A record placed in its loan's timeline, with the change in days-past-due
/// relative to the previous record of the same loan.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedRecord {
    pub record: LoanActivityRecord,
    pub previous_days_past_due: Option<i64>,
    pub days_past_due_delta: Option<i64>,
    pub increased: bool,
    pub decreased: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionSummary {
    #[serde(rename = "DisbursementID")]
    pub loan_id: LoanId,
    #[serde(rename = "Customer_Name")]
    pub customer_name: Option<String>,
    #[serde(rename = "Branch")]
    pub branch: Option<String>,
    #[serde(rename = "Total_Records")]
    pub total_records: usize,
    #[serde(rename = "DPD_Increases")]
    pub dpd_increases: usize,
    #[serde(rename = "DPD_Decreases")]
    pub dpd_decreases: usize,
    #[serde(rename = "Max_DPD")]
    pub max_dpd: i64,
    #[serde(rename = "Current_DPD")]
    pub current_dpd: i64,
    #[serde(rename = "Total_Collection")]
    pub total_collection: f64,
    #[serde(rename = "Total_PTP_Amount")]
    pub total_promise_amount: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TransitionSummaryRow {
    #[serde(rename = "Disbursement ID")]
    #[tabled(rename = "Disbursement ID")]
    pub loan_id: String,
    #[serde(rename = "Customer Name")]
    #[tabled(rename = "Customer Name")]
    pub customer_name: String,
    #[serde(rename = "Branch")]
    #[tabled(rename = "Branch")]
    pub branch: String,
    #[serde(rename = "Records")]
    #[tabled(rename = "Records")]
    pub total_records: usize,
    #[serde(rename = "DPD Increases")]
    #[tabled(rename = "DPD Increases")]
    pub dpd_increases: usize,
    #[serde(rename = "DPD Decreases")]
    #[tabled(rename = "DPD Decreases")]
    pub dpd_decreases: usize,
    #[serde(rename = "Max DPD")]
    #[tabled(rename = "Max DPD")]
    pub max_dpd: i64,
    #[serde(rename = "Current DPD")]
    #[tabled(rename = "Current DPD")]
    pub current_dpd: i64,
    #[serde(rename = "Total Collection")]
    #[tabled(rename = "Total Collection")]
    pub total_collection: String,
    #[serde(rename = "Total PTP Amount")]
    #[tabled(rename = "Total PTP Amount")]
    pub total_promise_amount: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TimelineRow {
    #[serde(rename = "Date")]
    #[tabled(rename = "Date")]
    pub date: String,
    #[serde(rename = "Customer Name")]
    #[tabled(rename = "Customer Name")]
    pub customer_name: String,
    #[serde(rename = "DPD")]
    #[tabled(rename = "DPD")]
    pub days_past_due: i64,
    #[serde(rename = "Previous DPD")]
    #[tabled(rename = "Previous DPD")]
    pub previous_days_past_due: String,
    #[serde(rename = "DPD Change")]
    #[tabled(rename = "DPD Change")]
    pub days_past_due_delta: String,
    #[serde(rename = "Trend")]
    #[tabled(rename = "Trend")]
    pub trend: String,
    #[serde(rename = "PTP Status")]
    #[tabled(rename = "PTP Status")]
    pub promise_status: String,
    #[serde(rename = "PTP Amount")]
    #[tabled(rename = "PTP Amount")]
    pub promise_amount: String,
    #[serde(rename = "Collection Amount")]
    #[tabled(rename = "Collection Amount")]
    pub collection_amount: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MetricRow {
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SourceCollectionRow {
    #[serde(rename = "PTP Source")]
    #[tabled(rename = "PTP Source")]
    pub source: String,
    #[serde(rename = "Number of Collections")]
    #[tabled(rename = "Number of Collections")]
    pub collections: usize,
    #[serde(rename = "Total Amount")]
    #[tabled(rename = "Total Amount")]
    pub total_amount: String,
    #[serde(rename = "Average Amount")]
    #[tabled(rename = "Average Amount")]
    pub average_amount: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct StatusBreakdownRow {
    #[serde(rename = "PTP Status")]
    #[tabled(rename = "PTP Status")]
    pub status: String,
    #[serde(rename = "Records")]
    #[tabled(rename = "Records")]
    pub records: usize,
    #[serde(rename = "Customers")]
    #[tabled(rename = "Customers")]
    pub customers: usize,
    #[serde(rename = "Collection")]
    #[tabled(rename = "Collection")]
    pub collection: String,
    #[serde(rename = "PTP Amount")]
    #[tabled(rename = "PTP Amount")]
    pub promise_amount: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PtpCustomerRow {
    #[serde(rename = "Disbursement ID")]
    #[tabled(rename = "Disbursement ID")]
    pub loan_id: String,
    #[serde(rename = "Customer Name")]
    #[tabled(rename = "Customer Name")]
    pub customer_name: String,
    #[serde(rename = "Branch")]
    #[tabled(rename = "Branch")]
    pub branch: String,
    #[serde(rename = "PTP Date")]
    #[tabled(rename = "PTP Date")]
    pub promise_date: String,
    #[serde(rename = "PTP Status")]
    #[tabled(rename = "PTP Status")]
    pub promise_status: String,
    #[serde(rename = "PTP Amount")]
    #[tabled(rename = "PTP Amount")]
    pub promise_amount: String,
    #[serde(rename = "Collection Amount")]
    #[tabled(rename = "Collection Amount")]
    pub collection_amount: String,
    #[serde(rename = "Total Communications")]
    #[tabled(rename = "Total Communications")]
    pub communications: u64,
    #[serde(rename = "Collection Status")]
    #[tabled(rename = "Collection Status")]
    pub collection_status: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct NoPtpCustomerRow {
    #[serde(rename = "Disbursement ID")]
    #[tabled(rename = "Disbursement ID")]
    pub loan_id: String,
    #[serde(rename = "Customer Name")]
    #[tabled(rename = "Customer Name")]
    pub customer_name: String,
    #[serde(rename = "Branch")]
    #[tabled(rename = "Branch")]
    pub branch: String,
    #[serde(rename = "Collection Amount")]
    #[tabled(rename = "Collection Amount")]
    pub collection_amount: String,
    #[serde(rename = "Communications")]
    #[tabled(rename = "Communications")]
    pub communications: u64,
    #[serde(rename = "PTP Status")]
    #[tabled(rename = "PTP Status")]
    pub promise_status: String,
    #[serde(rename = "PTP Amount")]
    #[tabled(rename = "PTP Amount")]
    pub promise_amount: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct BranchCollectionRow {
    #[serde(rename = "Branch")]
    #[tabled(rename = "Branch")]
    pub branch: String,
    #[serde(rename = "Customers")]
    #[tabled(rename = "Customers")]
    pub customers: usize,
    #[serde(rename = "Collection Amount")]
    #[tabled(rename = "Collection Amount")]
    pub collection_amount: String,
    #[serde(rename = "Communications")]
    #[tabled(rename = "Communications")]
    pub communications: u64,
}

/// Numeric branch aggregate; exported as-is and formatted for display.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BranchPerformance {
    #[serde(rename = "Branch")]
    pub branch: String,
    #[serde(rename = "Collection Amount")]
    pub collection_amount: f64,
    #[serde(rename = "Overdue Amount")]
    pub overdue_amount: f64,
    #[serde(rename = "Unique Customers")]
    pub unique_customers: usize,
    #[serde(rename = "Total Communications")]
    pub communications: u64,
    #[serde(rename = "Collection Rate (%)")]
    pub collection_rate: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct BranchPerformanceRow {
    #[serde(rename = "Branch")]
    #[tabled(rename = "Branch")]
    pub branch: String,
    #[serde(rename = "Collection")]
    #[tabled(rename = "Collection")]
    pub collection_amount: String,
    #[serde(rename = "Overdue")]
    #[tabled(rename = "Overdue")]
    pub overdue_amount: String,
    #[serde(rename = "Unique Customers")]
    #[tabled(rename = "Unique Customers")]
    pub unique_customers: usize,
    #[serde(rename = "Communications")]
    #[tabled(rename = "Communications")]
    pub communications: u64,
    #[serde(rename = "Collection Rate (%)")]
    #[tabled(rename = "Collection Rate (%)")]
    pub collection_rate: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DpdBucketRow {
    #[serde(rename = "DPD Bucket")]
    #[tabled(rename = "DPD Bucket")]
    pub bucket: String,
    #[serde(rename = "Number of Loans")]
    #[tabled(rename = "Number of Loans")]
    pub records: usize,
    #[serde(rename = "Overdue Amount")]
    #[tabled(rename = "Overdue Amount")]
    pub overdue_amount: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DailyTrendRow {
    #[serde(rename = "Date")]
    #[tabled(rename = "Date")]
    pub date: String,
    #[serde(rename = "Collection Amount")]
    #[tabled(rename = "Collection Amount")]
    pub collection_amount: String,
    #[serde(rename = "Total Communications")]
    #[tabled(rename = "Total Communications")]
    pub communications: u64,
    #[serde(rename = "Overdue Amount")]
    #[tabled(rename = "Overdue Amount")]
    pub overdue_amount: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SummaryStats {
    pub total_unique_customers: usize,
    pub active_loans: usize,
    pub inactive_loans: usize,
    pub total_branches: usize,
    pub total_overdue_amount: f64,
    pub total_collection_amount: f64,
    pub collection_rate: f64,
    pub total_ptp_amount: f64,
    pub total_communications: u64,
    pub whatsapp_messages: u64,
    pub blaster_calls: u64,
    pub ai_calls: u64,
    pub total_ptps: usize,
    pub ptp_fulfilled: usize,
    pub ptp_broken: usize,
    pub ptp_success_rate: f64,
    pub dpd_transition_customers: usize,
}
