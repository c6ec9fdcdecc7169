use crate::error::{ReportError, ReportResult};
use crate::types::{LoanActivityRecord, LoanId, RawRow};
use crate::util::{
    parse_bool_safe, parse_count_safe, parse_date_safe, parse_dpd_safe, parse_f64_safe,
    parse_text_safe,
};
use csv::ReaderBuilder;
use std::io::{ErrorKind, Read};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    /// Rows the CSV reader could not decode at all.
    pub parse_errors: usize,
    pub missing_loan_id: usize,
    pub invalid_date: usize,
    pub invalid_dpd: usize,
}

impl LoadReport {
    pub fn excluded_rows(&self) -> usize {
        self.parse_errors + self.missing_loan_id + self.invalid_date + self.invalid_dpd
    }
}

/// Load and type the dataset at `path`.
///
/// A missing file is reported as [`ReportError::MissingInput`]; malformed
/// rows are skipped and counted in the [`LoadReport`].
pub fn load_and_clean(path: &str) -> ReportResult<(Vec<LoanActivityRecord>, LoadReport)> {
    let file = std::fs::File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ReportError::MissingInput {
            path: path.to_string(),
        },
        _ => ReportError::Io(e),
    })?;
    load_from_reader(file)
}

pub fn load_from_reader<R: Read>(reader: R) -> ReportResult<(Vec<LoanActivityRecord>, LoadReport)> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    // Fail early on an unreadable header rather than counting every row bad.
    rdr.headers()?;

    let mut report = LoadReport::default();
    let mut records: Vec<LoanActivityRecord> = Vec::new();

    for (idx, result) in rdr.deserialize::<RawRow>().enumerate() {
        report.total_rows += 1;
        // Header is line 1.
        let line = idx + 2;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                log::warn!("line {line}: unreadable row skipped: {e}");
                report.parse_errors += 1;
                continue;
            }
        };

        let Some(loan_id) = parse_text_safe(row.disbursement_id) else {
            log::warn!("line {line}: missing DisbursementID, row skipped");
            report.missing_loan_id += 1;
            continue;
        };
        let Some(date) = parse_date_safe(row.date.as_deref()) else {
            log::warn!("line {line}: unparseable Date for loan {loan_id}, row skipped");
            report.invalid_date += 1;
            continue;
        };
        let Some(days_past_due) = parse_dpd_safe(row.days_past_due.as_deref()) else {
            log::warn!("line {line}: unparseable NumberOfDaysPastDue for loan {loan_id}, row skipped");
            report.invalid_dpd += 1;
            continue;
        };

        records.push(LoanActivityRecord {
            loan_id: LoanId::new(loan_id),
            date,
            days_past_due,
            promise_status: parse_text_safe(row.ptp_status),
            promise_amount: parse_f64_safe(row.ptp_amount.as_deref()),
            promise_date: parse_date_safe(row.ptp_date.as_deref()),
            promise_source: parse_text_safe(row.ptp_source),
            collection_amount: parse_f64_safe(row.collection_amount.as_deref()),
            collection_date: parse_date_safe(row.collection_date.as_deref()),
            overdue_amount: parse_f64_safe(row.overdue_amount.as_deref()),
            customer_name: parse_text_safe(row.customer_name)
                .or_else(|| parse_text_safe(row.customer_name_alt)),
            branch: parse_text_safe(row.branch),
            is_active: parse_bool_safe(row.is_active.as_deref()),
            total_communications: parse_count_safe(row.total_communications.as_deref()),
            whatsapp: parse_count_safe(row.whatsapp.as_deref()),
            blaster: parse_count_safe(row.blaster.as_deref()),
            ai_calls: parse_count_safe(row.ai_calls.as_deref()),
        });
    }

    report.loaded_rows = records.len();
    if report.excluded_rows() > 0 {
        log::warn!(
            "{} of {} rows excluded (unreadable: {}, no id: {}, bad date: {}, bad DPD: {})",
            report.excluded_rows(),
            report.total_rows,
            report.parse_errors,
            report.missing_loan_id,
            report.invalid_date,
            report.invalid_dpd
        );
    }
    log::info!("loaded {} activity records", report.loaded_rows);
    Ok((records, report))
}
