//! DPD transition detection.
//!
//! A loan shows the transition pattern when it carries a promise to pay and
//! its days-past-due went up at some point and came down again strictly
//! later. Detection works on whatever record set the caller hands in; it
//! never filters on its own.

use crate::error::{ReportError, ReportResult};
use crate::types::{AnnotatedRecord, LoanActivityRecord, LoanId, TransitionSummary};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

/// Result of one detection run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Detection {
    /// One row per qualifying loan, in ascending `LoanId` order (numeric IDs
    /// by value).
    pub summaries: Vec<TransitionSummary>,
    /// Every input record, grouped by loan and sorted by date.
    pub annotated: Vec<AnnotatedRecord>,
    pub qualifying: Vec<LoanId>,
}

impl Detection {
    pub fn is_qualifying(&self, loan_id: &LoanId) -> bool {
        self.qualifying.contains(loan_id)
    }

    pub fn summary_for(&self, loan_id: &LoanId) -> Option<&TransitionSummary> {
        self.summaries.iter().find(|s| &s.loan_id == loan_id)
    }
}

/// Group records by loan, sort each group by date and annotate DPD changes.
///
/// Sorting is stable, so records of one loan sharing a date keep their input
/// order. The first record of every timeline has no previous value and is
/// never flagged.
pub fn build_timelines(records: &[LoanActivityRecord]) -> BTreeMap<LoanId, Vec<AnnotatedRecord>> {
    let mut groups: BTreeMap<LoanId, Vec<&LoanActivityRecord>> = BTreeMap::new();
    for r in records {
        groups.entry(r.loan_id.clone()).or_default().push(r);
    }

    groups
        .into_iter()
        .map(|(loan_id, mut group)| {
            group.sort_by_key(|r| r.date);
            let mut previous: Option<i64> = None;
            let timeline = group
                .into_iter()
                .map(|r| {
                    let delta = previous.map(|p| r.days_past_due - p);
                    let annotated = AnnotatedRecord {
                        record: r.clone(),
                        previous_days_past_due: previous,
                        days_past_due_delta: delta,
                        increased: matches!(delta, Some(d) if d > 0),
                        decreased: matches!(delta, Some(d) if d < 0),
                    };
                    previous = Some(r.days_past_due);
                    annotated
                })
                .collect();
            (loan_id, timeline)
        })
        .collect()
}

/// True when some increase date is followed, strictly later, by a decrease
/// date. Increases are scanned in date order and the scan stops at the first
/// match.
fn increase_then_decrease(timeline: &[AnnotatedRecord]) -> bool {
    let increase_dates: Vec<NaiveDate> = timeline
        .iter()
        .filter(|a| a.increased)
        .map(|a| a.record.date)
        .collect();
    let decrease_dates: Vec<NaiveDate> = timeline
        .iter()
        .filter(|a| a.decreased)
        .map(|a| a.record.date)
        .collect();

    increase_dates
        .iter()
        .any(|inc| decrease_dates.iter().any(|dec| dec > inc))
}

/// Summarize a whole timeline. Callers guarantee it is non-empty.
fn summarize(loan_id: &LoanId, timeline: &[AnnotatedRecord]) -> Option<TransitionSummary> {
    let first = timeline.first()?;
    let last = timeline.last()?;
    Some(TransitionSummary {
        loan_id: loan_id.clone(),
        customer_name: first.record.customer_name.clone(),
        branch: first.record.branch.clone(),
        total_records: timeline.len(),
        dpd_increases: timeline.iter().filter(|a| a.increased).count(),
        dpd_decreases: timeline.iter().filter(|a| a.decreased).count(),
        max_dpd: timeline
            .iter()
            .map(|a| a.record.days_past_due)
            .max()
            .unwrap_or(0),
        current_dpd: last.record.days_past_due,
        total_collection: timeline.iter().map(|a| a.record.collection_or_zero()).sum(),
        total_promise_amount: timeline
            .iter()
            .map(|a| a.record.promise_amount_or_zero())
            .sum(),
    })
}

/// Find every loan with the promise → DPD increase → DPD decrease pattern.
///
/// Summaries aggregate the loan's entire timeline, not just the matched
/// window. Loans that do not qualify still appear in `annotated`.
pub fn detect(records: &[LoanActivityRecord]) -> Detection {
    let timelines = build_timelines(records);

    let mut summaries = Vec::new();
    let mut qualifying = Vec::new();
    let mut annotated = Vec::with_capacity(records.len());

    for (loan_id, timeline) in timelines {
        let is_candidate = timeline.iter().any(|a| a.record.has_promise());
        if is_candidate && increase_then_decrease(&timeline) {
            if let Some(summary) = summarize(&loan_id, &timeline) {
                summaries.push(summary);
                qualifying.push(loan_id);
            }
        }
        annotated.extend(timeline);
    }

    log::info!(
        "DPD transition: {} of {} records analysed, {} qualifying loans",
        annotated.len(),
        records.len(),
        qualifying.len()
    );

    Detection {
        summaries,
        annotated,
        qualifying,
    }
}

/// Map user input to one of the qualifying identifiers, ignoring leading
/// zeros and a trailing `.0` on either side.
pub fn resolve_loan_id<'a>(input: &str, qualifying: &'a [LoanId]) -> ReportResult<&'a LoanId> {
    let wanted = crate::util::normalize_loan_id(input);
    if wanted.is_empty() {
        return Err(ReportError::LoanNotFound {
            input: input.trim().to_string(),
        });
    }
    qualifying
        .iter()
        .find(|id| id.normalized() == wanted)
        .ok_or_else(|| ReportError::LoanNotFound {
            input: input.trim().to_string(),
        })
}

/// The annotated timeline of one loan, in date order.
///
/// Matches the exact identifier; run user input through [`resolve_loan_id`]
/// first. `"42"` and `"0042"` are separate loans here.
pub fn get_timeline<'a>(annotated: &'a [AnnotatedRecord], loan_id: &LoanId) -> Vec<&'a AnnotatedRecord> {
    annotated
        .iter()
        .filter(|a| a.record.loan_id == *loan_id)
        .collect()
}

/// Distinct loans present in an annotated set.
pub fn loan_count(annotated: &[AnnotatedRecord]) -> usize {
    annotated
        .iter()
        .map(|a| &a.record.loan_id)
        .collect::<HashSet<_>>()
        .len()
}
