//! Aggregations over the transaction history.
//!
//! All views are derived at read time from stored records and never
//! persisted. Calendar fields come from each record's stored timestamp.

use crate::types::report::{DashboardReport, MonthlyFraud, TypeCount};
use crate::types::transaction::TransactionRecord;
use chrono::Month;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Whole-history totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub total: u64,
    pub fraud: u64,
}

pub fn totals(records: &[TransactionRecord]) -> Totals {
    Totals {
        total: records.len() as u64,
        fraud: records.iter().filter(|r| r.is_fraud()).count() as u64,
    }
}

/// Count of records per (lowercase) transaction type, most frequent first
pub fn aggregate_by_type(records: &[TransactionRecord]) -> Vec<TypeCount> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for record in records {
        *counts
            .entry(record.transaction_type.to_lowercase())
            .or_insert(0) += 1;
    }

    let mut by_type: Vec<TypeCount> = counts
        .into_iter()
        .map(|(transaction_type, count)| TypeCount {
            transaction_type,
            count,
        })
        .collect();
    by_type.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.transaction_type.cmp(&b.transaction_type))
    });
    by_type
}

/// Monthly totals for one year.
///
/// Months without records are left out; present months are always in
/// calendar order.
pub fn aggregate_by_month(records: &[TransactionRecord], year: i32) -> Vec<MonthlyFraud> {
    let mut months: BTreeMap<u32, (u64, u64)> = BTreeMap::new();
    for record in records.iter().filter(|r| r.year() == year) {
        let entry = months.entry(record.month().number_from_month()).or_insert((0, 0));
        entry.0 += 1;
        if record.is_fraud() {
            entry.1 += 1;
        }
    }

    months
        .into_iter()
        .map(|(number, (total, fraud))| MonthlyFraud {
            month: month_name(number),
            total,
            fraud,
        })
        .collect()
}

/// Distinct years present, newest first
pub fn available_years(records: &[TransactionRecord]) -> Vec<i32> {
    let years: BTreeSet<i32> = records.iter().map(|r| r.year()).collect();
    years.into_iter().rev().collect()
}

/// Distinct months present in `year`, calendar order
pub fn months_in_year(records: &[TransactionRecord], year: i32) -> Vec<Month> {
    let months: BTreeSet<u32> = records
        .iter()
        .filter(|r| r.year() == year)
        .map(|r| r.month().number_from_month())
        .collect();
    months.into_iter().filter_map(month_from_number).collect()
}

/// Records in the given period; `None` leaves that dimension unfiltered
pub fn filter_period(
    records: &[TransactionRecord],
    year: Option<i32>,
    month: Option<Month>,
) -> Vec<TransactionRecord> {
    records
        .iter()
        .filter(|r| year.map_or(true, |y| r.year() == y))
        .filter(|r| month.map_or(true, |m| r.month() == m))
        .cloned()
        .collect()
}

/// Assemble the dashboard view for a year/month selection.
///
/// Without an explicit year the newest year in the history is selected. The
/// monthly chart always covers the whole selected year; only the record list
/// is narrowed by the month.
pub fn build_dashboard(
    records: &[TransactionRecord],
    year: Option<i32>,
    month: Option<Month>,
) -> DashboardReport {
    if records.is_empty() {
        return DashboardReport::empty();
    }

    let totals = totals(records);
    let years = available_years(records);
    let selected_year = year.or_else(|| years.first().copied());

    let (months, monthly, rows) = match selected_year {
        Some(y) => (
            months_in_year(records, y)
                .into_iter()
                .map(|m| m.name().to_string())
                .collect(),
            aggregate_by_month(records, y),
            filter_period(records, Some(y), month),
        ),
        None => (Vec::new(), Vec::new(), Vec::new()),
    };

    DashboardReport {
        total_transactions: totals.total,
        fraudulent_transactions: totals.fraud,
        by_type: aggregate_by_type(records),
        years,
        selected_year,
        months,
        selected_month: month.map(|m| m.name().to_string()),
        monthly,
        records: rows,
    }
}

/// Parse a month given by name (`March`, `mar`) or number (`3`)
pub fn parse_month(raw: &str) -> Option<Month> {
    let raw = raw.trim();
    match raw.parse::<u32>() {
        Ok(n) => month_from_number(n),
        Err(_) => raw.parse::<Month>().ok(),
    }
}

fn month_from_number(n: u32) -> Option<Month> {
    u8::try_from(n).ok().and_then(|n| Month::try_from(n).ok())
}

fn month_name(n: u32) -> String {
    month_from_number(n)
        .map(|m| m.name().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(id: i64, kind: &str, y: i32, m: u32, is_fraud: u8) -> TransactionRecord {
        TransactionRecord {
            transaction_id: id,
            transaction_type: kind.to_string(),
            amount: 100.0,
            old_balance_sender: 100.0,
            new_balance_sender: 0.0,
            old_balance_receiver: 0.0,
            new_balance_receiver: 100.0,
            timestamp: Utc.with_ymd_and_hms(y, m, 15, 10, 0, 0).unwrap(),
            is_fraud,
            fraud_score: if is_fraud == 1 { 0.9 } else { 0.1 },
        }
    }

    fn history() -> Vec<TransactionRecord> {
        // Newest first, as the store returns them
        vec![
            record(7, "transfer", 2024, 2, 1),
            record(6, "payment", 2024, 1, 0),
            record(5, "cash_out", 2023, 12, 1),
            record(4, "transfer", 2023, 3, 0),
            record(3, "payment", 2023, 11, 0),
            record(2, "payment", 2023, 3, 1),
            record(1, "transfer", 2023, 1, 0),
        ]
    }

    #[test]
    fn test_totals() {
        assert_eq!(
            totals(&history()),
            Totals {
                total: 7,
                fraud: 3
            }
        );
        assert_eq!(totals(&[]), Totals::default());
    }

    #[test]
    fn test_aggregate_by_type() {
        let by_type = aggregate_by_type(&history());
        assert_eq!(
            by_type,
            vec![
                TypeCount {
                    transaction_type: "payment".into(),
                    count: 3,
                },
                TypeCount {
                    transaction_type: "transfer".into(),
                    count: 3,
                },
                TypeCount {
                    transaction_type: "cash_out".into(),
                    count: 1,
                },
            ]
        );
    }

    #[test]
    fn test_aggregate_by_type_normalizes_case() {
        let records = vec![
            record(1, "TRANSFER", 2024, 1, 0),
            record(2, "transfer", 2024, 1, 0),
        ];
        let by_type = aggregate_by_type(&records);
        assert_eq!(by_type.len(), 1);
        assert_eq!(by_type[0].count, 2);
    }

    #[test]
    fn test_aggregate_by_month_orders_calendar_and_omits_empty() {
        let monthly = aggregate_by_month(&history(), 2023);
        assert_eq!(
            monthly,
            vec![
                MonthlyFraud {
                    month: "January".into(),
                    total: 1,
                    fraud: 0,
                },
                MonthlyFraud {
                    month: "March".into(),
                    total: 2,
                    fraud: 1,
                },
                MonthlyFraud {
                    month: "November".into(),
                    total: 1,
                    fraud: 0,
                },
                MonthlyFraud {
                    month: "December".into(),
                    total: 1,
                    fraud: 1,
                },
            ]
        );
    }

    #[test]
    fn test_aggregate_by_month_is_year_scoped() {
        let monthly_2024 = aggregate_by_month(&history(), 2024);
        assert_eq!(monthly_2024.len(), 2);
        assert_eq!(monthly_2024.iter().map(|m| m.total).sum::<u64>(), 2);
        assert!(monthly_2024
            .iter()
            .all(|m| m.month == "January" || m.month == "February"));

        let monthly_2023 = aggregate_by_month(&history(), 2023);
        assert_eq!(monthly_2023.iter().map(|m| m.total).sum::<u64>(), 5);

        assert!(aggregate_by_month(&history(), 2022).is_empty());
    }

    #[test]
    fn test_years_and_months() {
        assert_eq!(available_years(&history()), vec![2024, 2023]);
        assert_eq!(
            months_in_year(&history(), 2023),
            vec![Month::January, Month::March, Month::November, Month::December]
        );
    }

    #[test]
    fn test_filter_period() {
        let march = filter_period(&history(), Some(2023), Some(Month::March));
        let ids: Vec<i64> = march.iter().map(|r| r.transaction_id).collect();
        assert_eq!(ids, vec![4, 2]);

        assert_eq!(filter_period(&history(), None, None).len(), 7);
    }

    #[test]
    fn test_dashboard_defaults_to_newest_year() {
        let report = build_dashboard(&history(), None, None);

        assert_eq!(report.total_transactions, 7);
        assert_eq!(report.fraudulent_transactions, 3);
        assert_eq!(report.selected_year, Some(2024));
        assert_eq!(report.months, vec!["January", "February"]);
        assert_eq!(report.records.len(), 2);
        assert!(report.has_data());
    }

    #[test]
    fn test_dashboard_month_filter_narrows_rows_not_chart() {
        let report = build_dashboard(&history(), Some(2023), Some(Month::March));

        assert_eq!(report.selected_month.as_deref(), Some("March"));
        assert_eq!(report.monthly.len(), 4);
        assert_eq!(report.records.len(), 2);
    }

    #[test]
    fn test_dashboard_empty_history() {
        let report = build_dashboard(&[], Some(2024), None);
        assert_eq!(report, DashboardReport::empty());
        assert_eq!(report.total_transactions, 0);
        assert!(!report.has_data());
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("March"), Some(Month::March));
        assert_eq!(parse_month("dec"), Some(Month::December));
        assert_eq!(parse_month("7"), Some(Month::July));
        assert_eq!(parse_month("13"), None);
        assert_eq!(parse_month("Smarch"), None);
    }
}
