use crate::types::LoanActivityRecord;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoanStatusFilter {
    #[default]
    All,
    ActiveOnly,
    InactiveOnly,
}

impl fmt::Display for LoanStatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoanStatusFilter::All => "All",
            LoanStatusFilter::ActiveOnly => "Active Only",
            LoanStatusFilter::InactiveOnly => "Inactive Only",
        };
        f.write_str(s)
    }
}

/// Sidebar-style selection. `None` means "all".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub branch: Option<String>,
    pub promise_status: Option<String>,
    pub loan_status: LoanStatusFilter,
}

impl Filters {
    pub fn matches(&self, r: &LoanActivityRecord) -> bool {
        if self.date_from.is_some_and(|from| r.date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| r.date > to) {
            return false;
        }
        if let Some(branch) = &self.branch {
            if r.branch.as_deref() != Some(branch.as_str()) {
                return false;
            }
        }
        if let Some(status) = &self.promise_status {
            if r.promise_status.as_deref() != Some(status.as_str()) {
                return false;
            }
        }
        // A record with no active flag only passes "All".
        match self.loan_status {
            LoanStatusFilter::All => true,
            LoanStatusFilter::ActiveOnly => r.is_active == Some(true),
            LoanStatusFilter::InactiveOnly => r.is_active == Some(false),
        }
    }

    pub fn describe(&self) -> String {
        let date = |d: Option<NaiveDate>| d.map_or_else(|| "*".to_string(), |d| d.to_string());
        format!(
            "dates {}..{}, branch: {}, PTP status: {}, loans: {}",
            date(self.date_from),
            date(self.date_to),
            self.branch.as_deref().unwrap_or("All Branches"),
            self.promise_status.as_deref().unwrap_or("All Status"),
            self.loan_status
        )
    }
}

/// Records passing every active filter, in input order.
pub fn apply(records: &[LoanActivityRecord], filters: &Filters) -> Vec<LoanActivityRecord> {
    let out: Vec<LoanActivityRecord> = records.iter().filter(|r| filters.matches(r)).cloned().collect();
    log::debug!("filters [{}] kept {} of {} records", filters.describe(), out.len(), records.len());
    out
}

/// First and last activity date, for the default date range.
pub fn date_bounds(records: &[LoanActivityRecord]) -> Option<(NaiveDate, NaiveDate)> {
    let min = records.iter().map(|r| r.date).min()?;
    let max = records.iter().map(|r| r.date).max()?;
    Some((min, max))
}

/// Sorted distinct branch names, for the branch picker.
pub fn branches(records: &[LoanActivityRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.branch.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sorted distinct promise statuses, for the status picker.
pub fn promise_statuses(records: &[LoanActivityRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.promise_status.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
