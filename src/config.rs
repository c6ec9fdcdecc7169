use crate::error::{ReportError, ReportResult};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_DATA_PATH: &str = "Vinayna_Latest.csv";

/// Which rows count as "collected without a promise to pay".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoPtpRule {
    /// Promise amount is zero; a blank amount counts as zero.
    #[default]
    ZeroAmount,
    /// Zero amount and no promise status either.
    ZeroAmountAndNoStatus,
}

impl NoPtpRule {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "amount" => Some(NoPtpRule::ZeroAmount),
            "strict" => Some(NoPtpRule::ZeroAmountAndNoStatus),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_path: String,
    pub out_dir: PathBuf,
    pub preview_rows: usize,
    pub no_ptp_rule: NoPtpRule,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_path: DEFAULT_DATA_PATH.to_string(),
            out_dir: PathBuf::from("."),
            preview_rows: 5,
            no_ptp_rule: NoPtpRule::default(),
        }
    }
}

impl Config {
    /// Read `LOAN_REPORT_*` variables, falling back to defaults for any that
    /// are unset.
    pub fn from_env() -> ReportResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ReportResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();
        if let Some(path) = lookup("LOAN_REPORT_DATA").filter(|v| !v.trim().is_empty()) {
            cfg.data_path = path.trim().to_string();
        }
        if let Some(dir) = lookup("LOAN_REPORT_OUT_DIR").filter(|v| !v.trim().is_empty()) {
            cfg.out_dir = PathBuf::from(dir.trim());
        }
        if let Some(rows) = lookup("LOAN_REPORT_PREVIEW_ROWS") {
            cfg.preview_rows = rows
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ReportError::InvalidConfig {
                    key: "LOAN_REPORT_PREVIEW_ROWS".to_string(),
                    value: rows.clone(),
                })?;
        }
        if let Some(rule) = lookup("LOAN_REPORT_NO_PTP_RULE") {
            cfg.no_ptp_rule = NoPtpRule::parse(&rule).ok_or_else(|| ReportError::InvalidConfig {
                key: "LOAN_REPORT_NO_PTP_RULE".to_string(),
                value: rule.clone(),
            })?;
        }
        Ok(cfg)
    }

    /// Full path of an export file inside the output directory.
    pub fn out_path(&self, file_name: &str) -> String {
        self.out_dir.join(file_name).to_string_lossy().into_owned()
    }
}
