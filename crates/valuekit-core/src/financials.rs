//! Figures supplied by the external financial-data provider.
//!
//! Every field is individually optional: a provider that cannot report a
//! value leaves it `None`. Nothing here substitutes zero for missing data.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::arithmetic::CheckedArithmetic;
use crate::error::ValuationError;
use crate::types::{Currency, Money, Multiple};
use crate::ValuationResult;

/// Metric name → optional value. `None` means the provider had no figure.
pub type MultipleSet = BTreeMap<String, Option<Multiple>>;

/// Cash-flow statement rows keyed by line-item name.
pub type StatementLineItems = BTreeMap<String, Option<Money>>;

pub const PE_TTM: &str = "P/E Ratio (TTM)";
pub const FORWARD_PE: &str = "Forward P/E";
pub const EV_EBITDA: &str = "EV/EBITDA";
pub const PRICE_SALES_TTM: &str = "Price/Sales (TTM)";
pub const EV_REVENUE: &str = "EV/Revenue";
pub const EPS_TTM: &str = "EPS (TTM)";

/// The multiples reported for every company, in display order.
pub const STANDARD_METRICS: [&str; 6] = [
    PE_TTM,
    FORWARD_PE,
    EV_EBITDA,
    PRICE_SALES_TTM,
    EV_REVENUE,
    EPS_TTM,
];

const FREE_CASH_FLOW_KEYS: [&str; 1] = ["Free Cash Flow"];
const OPERATING_CASH_FLOW_KEYS: [&str; 3] = [
    "Total Cash From Operating Activities",
    "Operating Cash Flow",
    "Net cash provided by operating activities",
];
const CAPEX_KEYS: [&str; 2] = ["Capital Expenditures", "Capital Expenditure"];

/// Snapshot of one company as reported by the data provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    /// Ticker or other caller-chosen identifier
    pub ticker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    /// Reporting currency label
    #[serde(default)]
    pub currency: Currency,
    /// Fiscal period end of the latest statement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_fcf: Option<Money>,
    /// Annual dividend per share
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividend_rate: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares_outstanding: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<Decimal>,
    /// Dividends / earnings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_ratio: Option<Decimal>,
    #[serde(default)]
    pub multiples: MultipleSet,
}

impl FinancialSnapshot {
    pub fn require_fcf(&self) -> ValuationResult<Money> {
        require(self.latest_fcf, &self.ticker, "free cash flow")
    }

    pub fn require_dividend(&self) -> ValuationResult<Money> {
        require(self.dividend_rate, &self.ticker, "dividend rate")
    }

    /// The multiples in `STANDARD_METRICS` order, with absent metrics
    /// filled in as missing.
    pub fn standard_multiples(&self) -> MultipleSet {
        STANDARD_METRICS
            .iter()
            .map(|name| {
                let value = self.multiples.get(*name).copied().flatten();
                (name.to_string(), value)
            })
            .collect()
    }
}

fn require<T>(value: Option<T>, ticker: &str, what: &str) -> ValuationResult<T> {
    value.ok_or_else(|| ValuationError::MissingData(format!("{ticker}: {what} not available")))
}

/// Where a derived free-cash-flow figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FcfSource {
    /// A reported free-cash-flow line
    Reported,
    /// Operating cash flow less the absolute capital expenditure
    OperatingLessCapex,
    /// Operating cash flow with no capex line available
    OperatingOnly,
}

/// A free-cash-flow figure with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcfDerivation {
    pub value: Money,
    pub source: FcfSource,
}

/// Derive the latest free cash flow from cash-flow statement rows.
///
/// Preference order: a reported free-cash-flow row, then operating cash
/// flow minus |capex|, then operating cash flow alone (flagged through
/// `FcfSource::OperatingOnly`). Capex is taken as an absolute value because
/// providers disagree on its sign.
pub fn derive_free_cash_flow(items: &StatementLineItems) -> ValuationResult<FcfDerivation> {
    if let Some(value) = first_present(items, &FREE_CASH_FLOW_KEYS) {
        return Ok(FcfDerivation {
            value,
            source: FcfSource::Reported,
        });
    }

    let operating = first_present(items, &OPERATING_CASH_FLOW_KEYS).ok_or_else(|| {
        ValuationError::MissingData("no free cash flow or operating cash flow line item".into())
    })?;

    match first_present(items, &CAPEX_KEYS) {
        Some(capex) => Ok(FcfDerivation {
            value: operating.safe_sub(capex.abs())?,
            source: FcfSource::OperatingLessCapex,
        }),
        None => {
            tracing::debug!(%operating, "capex line missing; using operating cash flow as FCF");
            Ok(FcfDerivation {
                value: operating,
                source: FcfSource::OperatingOnly,
            })
        }
    }
}

fn first_present(items: &StatementLineItems, keys: &[&str]) -> Option<Money> {
    keys.iter().find_map(|k| items.get(*k).copied().flatten())
}
