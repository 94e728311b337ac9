//! Transaction aggregation by category and calendar year.
//!
//! Aggregation is a fold over the input producing a [`YearlyTotals`] value.
//! The sums do not depend on input order.

use super::AnalysisError;
use crate::models::{CategoryOrder, CategoryTotals, Transaction, YearTotal};
use chrono::{DateTime, Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

/// Default date format contract for transaction dates.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Largest mantissa a [`Decimal`] can hold.
const MAX_MANTISSA: u128 = (1 << 96) - 1;

/// Unsigned fixed-point magnitude, `mantissa / 10^scale`.
#[derive(Debug, Clone, Copy, Default)]
struct Magnitude {
    mantissa: u128,
    scale: u32,
}

impl Magnitude {
    fn add(&mut self, mantissa: u128, scale: u32) -> Option<()> {
        let target = self.scale.max(scale);
        let current = rescale(self.mantissa, self.scale, target)?;
        let incoming = rescale(mantissa, scale, target)?;
        self.mantissa = current.checked_add(incoming)?;
        self.scale = target;
        Some(())
    }
}

fn rescale(mantissa: u128, from: u32, to: u32) -> Option<u128> {
    10u128
        .checked_pow(to - from)
        .and_then(|factor| mantissa.checked_mul(factor))
}

/// Exact running sum of one `(category, year)` bucket.
///
/// Positive and negative values accumulate separately and only grow, so
/// whether a bucket fits is decided by the multiset of values alone.
#[derive(Debug, Clone, Copy, Default)]
struct ExactSum {
    positive: Magnitude,
    negative: Magnitude,
}

impl ExactSum {
    fn add(&mut self, value: Decimal) -> Option<()> {
        let mantissa = value.mantissa().unsigned_abs();
        if value.is_sign_negative() {
            self.negative.add(mantissa, value.scale())
        } else {
            self.positive.add(mantissa, value.scale())
        }
    }

    fn merge(&mut self, other: ExactSum) -> Option<()> {
        self.positive.add(other.positive.mantissa, other.positive.scale)?;
        self.negative.add(other.negative.mantissa, other.negative.scale)
    }

    /// The sum as a [`Decimal`], or `None` when it is not exactly representable.
    fn value(&self) -> Option<Decimal> {
        let mut scale = self.positive.scale.max(self.negative.scale);
        let positive = rescale(self.positive.mantissa, self.positive.scale, scale)?;
        let negative = rescale(self.negative.mantissa, self.negative.scale, scale)?;

        let (mut magnitude, is_negative) = if positive >= negative {
            (positive - negative, false)
        } else {
            (negative - positive, true)
        };

        while magnitude > MAX_MANTISSA && scale > 0 && magnitude % 10 == 0 {
            magnitude /= 10;
            scale -= 1;
        }
        if magnitude > MAX_MANTISSA {
            return None;
        }

        let mantissa = i128::try_from(magnitude).ok()?;
        let mantissa = if is_negative { -mantissa } else { mantissa };
        Decimal::try_from_i128_with_scale(mantissa, scale).ok()
    }
}

/// Exact per-bucket sums collected while folding over transactions.
///
/// Partials from different slices of the input merge into the same result
/// regardless of how the input was split.
#[derive(Debug, Clone, Default)]
pub struct PartialTotals {
    sums: HashMap<String, BTreeMap<i32, ExactSum>>,
    first_seen: Vec<String>,
}

impl PartialTotals {
    /// Accumulates `value` into the `(category, year)` bucket.
    pub fn add(&mut self, category: &str, year: i32, value: Decimal) -> Result<(), AnalysisError> {
        if !self.sums.contains_key(category) {
            self.first_seen.push(category.to_string());
        }

        self.sums
            .entry(category.to_string())
            .or_default()
            .entry(year)
            .or_default()
            .add(value)
            .ok_or_else(|| precision_error(category, year))
    }

    /// Adds every bucket of `other` into this partial.
    ///
    /// Categories new to `self` are appended in `other`'s first-seen order.
    pub fn merge(mut self, other: PartialTotals) -> Result<Self, AnalysisError> {
        let PartialTotals { mut sums, first_seen } = other;

        for category in first_seen {
            let Some(years) = sums.remove(&category) else {
                continue;
            };
            if !self.sums.contains_key(&category) {
                self.first_seen.push(category.clone());
            }
            let buckets = self.sums.entry(category.clone()).or_default();
            for (year, sum) in years {
                buckets
                    .entry(year)
                    .or_default()
                    .merge(sum)
                    .ok_or_else(|| precision_error(&category, year))?;
            }
        }

        Ok(self)
    }

    /// Converts every bucket to a [`Decimal`] total.
    pub fn finish(self) -> Result<YearlyTotals, AnalysisError> {
        let PartialTotals { sums, first_seen } = self;

        let totals = sums
            .into_iter()
            .map(|(category, years)| {
                let years = years
                    .into_iter()
                    .map(|(year, sum)| {
                        sum.value()
                            .map(|total| (year, total))
                            .ok_or_else(|| precision_error(&category, year))
                    })
                    .collect::<Result<BTreeMap<_, _>, _>>()?;
                Ok((category, years))
            })
            .collect::<Result<HashMap<_, _>, AnalysisError>>()?;

        Ok(YearlyTotals { totals, first_seen })
    }
}

fn precision_error(category: &str, year: i32) -> AnalysisError {
    AnalysisError::Overflow {
        category: category.to_string(),
        detail: format!("sum for {} is not exactly representable as a decimal", year),
    }
}

/// Summed values keyed by category, then by calendar year.
#[derive(Debug, Clone, Default)]
pub struct YearlyTotals {
    totals: HashMap<String, BTreeMap<i32, Decimal>>,
    first_seen: Vec<String>,
}

// First-seen order depends on input order, the sums do not.
impl PartialEq for YearlyTotals {
    fn eq(&self, other: &Self) -> bool {
        self.totals == other.totals
    }
}

impl YearlyTotals {
    /// Yearly totals of one category, years ascending.
    pub fn years(&self, category: &str) -> Option<&BTreeMap<i32, Decimal>> {
        self.totals.get(category)
    }

    /// Category names in the requested order.
    pub fn categories(&self, order: CategoryOrder) -> Vec<&str> {
        let mut categories: Vec<&str> = self.first_seen.iter().map(String::as_str).collect();
        if order == CategoryOrder::Lexical {
            categories.sort_unstable();
        }
        categories
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.first_seen.len()
    }

    /// Whether no transaction was aggregated.
    pub fn is_empty(&self) -> bool {
        self.first_seen.is_empty()
    }

    /// Keeps only the listed categories.
    pub fn retain_categories(&mut self, keep: &[String]) {
        self.totals.retain(|category, _| keep.contains(category));
        self.first_seen.retain(|category| keep.contains(category));
    }

    /// Serializable view of the totals.
    pub fn to_category_totals(&self, order: CategoryOrder) -> Vec<CategoryTotals> {
        self.categories(order)
            .into_iter()
            .filter_map(|category| {
                self.totals.get(category).map(|years| CategoryTotals {
                    category: category.to_string(),
                    years: years
                        .iter()
                        .map(|(&year, &total)| YearTotal { year, total })
                        .collect(),
                })
            })
            .collect()
    }
}

/// Extract the calendar year from a date string.
///
/// The date must match `format` (a chrono format string). An RFC 3339
/// timestamp is also accepted, in which case the year in the timestamp's
/// own offset is used.
pub fn extract_year(date: &str, format: &str) -> Result<i32, chrono::ParseError> {
    let date = date.trim();
    match NaiveDate::parse_from_str(date, format) {
        Ok(parsed) => Ok(parsed.year()),
        Err(e) => DateTime::parse_from_rfc3339(date)
            .map(|parsed| parsed.year())
            .map_err(|_| e),
    }
}

/// Aggregate transactions into yearly totals per category.
pub fn aggregate(transactions: &[Transaction], date_format: &str) -> Result<YearlyTotals, AnalysisError> {
    aggregate_from(0, transactions, date_format)?.finish()
}

/// Aggregate a slice whose first record has global index `offset`.
pub(crate) fn aggregate_from(
    offset: usize,
    transactions: &[Transaction],
    date_format: &str,
) -> Result<PartialTotals, AnalysisError> {
    transactions
        .iter()
        .enumerate()
        .try_fold(PartialTotals::default(), |mut totals, (i, tx)| {
            let index = offset + i;

            if tx.category.trim().is_empty() {
                return Err(AnalysisError::EmptyCategory { index });
            }

            let year = extract_year(&tx.date, date_format).map_err(|_| AnalysisError::InvalidDate {
                index,
                date: tx.date.clone(),
                format: date_format.to_string(),
            })?;

            totals.add(&tx.category, year, tx.value)?;
            Ok(totals)
        })
}

/// Fails with [`AnalysisError::EmptyInput`] when nothing was aggregated.
pub fn require_data(totals: YearlyTotals) -> Result<YearlyTotals, AnalysisError> {
    if totals.is_empty() {
        Err(AnalysisError::EmptyInput)
    } else {
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(category: &str, date: &str, value: i64) -> Transaction {
        Transaction::new(category, date, Decimal::from(value))
    }

    fn total(totals: &YearlyTotals, category: &str, year: i32) -> Option<Decimal> {
        totals.years(category)?.get(&year).copied()
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx("Revenue", "2023-01-01", 1_000_000),
            tx("Revenue", "2024-01-01", 1_300_000),
            tx("Balances", "2023-01-01", 500_000),
            tx("Balances", "2024-01-01", 515_000),
            tx("Outstanding", "2023-01-01", 700_000),
            tx("Outstanding", "2024-01-01", 660_000),
            tx("Limits", "2023-01-01", 800_000),
            tx("Limits", "2024-01-01", 825_000),
        ]
    }

    #[test]
    fn test_sum_correctness() {
        let transactions = vec![
            tx("Revenue", "2023-02-01", 100),
            tx("Revenue", "2023-06-15", 200),
            tx("Revenue", "2023-12-31", -50),
        ];

        let totals = aggregate(&transactions, DEFAULT_DATE_FORMAT).unwrap();
        assert_eq!(total(&totals, "Revenue", 2023), Some(Decimal::from(250)));
        assert_eq!(totals.len(), 1);
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let transactions = sample();
        let expected = aggregate(&transactions, DEFAULT_DATE_FORMAT).unwrap();

        let mut reversed = transactions.clone();
        reversed.reverse();
        assert_eq!(aggregate(&reversed, DEFAULT_DATE_FORMAT).unwrap(), expected);

        for shift in 1..transactions.len() {
            let mut rotated = transactions.clone();
            rotated.rotate_left(shift);
            assert_eq!(aggregate(&rotated, DEFAULT_DATE_FORMAT).unwrap(), expected);
        }

        let mut interleaved: Vec<_> = transactions.iter().step_by(2).cloned().collect();
        interleaved.extend(transactions.iter().skip(1).step_by(2).cloned());
        assert_eq!(aggregate(&interleaved, DEFAULT_DATE_FORMAT).unwrap(), expected);
    }

    #[test]
    fn test_first_seen_order() {
        let totals = aggregate(&sample(), DEFAULT_DATE_FORMAT).unwrap();
        assert_eq!(
            totals.categories(CategoryOrder::FirstSeen),
            vec!["Revenue", "Balances", "Outstanding", "Limits"]
        );
        assert_eq!(
            totals.categories(CategoryOrder::Lexical),
            vec!["Balances", "Limits", "Outstanding", "Revenue"]
        );
    }

    #[test]
    fn test_invalid_date_reports_index() {
        let transactions = vec![
            tx("Revenue", "2023-01-01", 1),
            tx("Revenue", "not-a-date", 1),
        ];

        let err = aggregate(&transactions, DEFAULT_DATE_FORMAT).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InvalidDate {
                index: 1,
                date: "not-a-date".to_string(),
                format: DEFAULT_DATE_FORMAT.to_string(),
            }
        );
    }

    #[test]
    fn test_impossible_calendar_date_rejected() {
        let transactions = vec![tx("Revenue", "2023-02-30", 1)];
        assert!(matches!(
            aggregate(&transactions, DEFAULT_DATE_FORMAT),
            Err(AnalysisError::InvalidDate { index: 0, .. })
        ));
    }

    #[test]
    fn test_empty_category_rejected() {
        let transactions = vec![tx("  ", "2023-01-01", 1)];
        assert_eq!(
            aggregate(&transactions, DEFAULT_DATE_FORMAT).unwrap_err(),
            AnalysisError::EmptyCategory { index: 0 }
        );
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("2024-03-05", DEFAULT_DATE_FORMAT), Ok(2024));
        assert_eq!(extract_year(" 2010-12-31 ", DEFAULT_DATE_FORMAT), Ok(2010));
        assert_eq!(extract_year("2023-12-31T23:30:00-05:00", DEFAULT_DATE_FORMAT), Ok(2023));
        assert_eq!(extract_year("05/03/2024", "%d/%m/%Y"), Ok(2024));
        assert!(extract_year("2024", DEFAULT_DATE_FORMAT).is_err());
        assert!(extract_year("", DEFAULT_DATE_FORMAT).is_err());
    }

    #[test]
    fn test_empty_input_yields_empty_totals() {
        let totals = aggregate(&[], DEFAULT_DATE_FORMAT).unwrap();
        assert!(totals.is_empty());
        assert_eq!(require_data(totals), Err(AnalysisError::EmptyInput));
    }

    #[test]
    fn test_merge_matches_sequential() {
        let transactions = sample();
        let (left, right) = transactions.split_at(3);

        let merged = aggregate_from(0, left, DEFAULT_DATE_FORMAT)
            .unwrap()
            .merge(aggregate_from(3, right, DEFAULT_DATE_FORMAT).unwrap())
            .unwrap()
            .finish()
            .unwrap();

        let sequential = aggregate(&transactions, DEFAULT_DATE_FORMAT).unwrap();
        assert_eq!(merged, sequential);
        assert_eq!(
            merged.categories(CategoryOrder::FirstSeen),
            sequential.categories(CategoryOrder::FirstSeen)
        );
    }

    #[test]
    fn test_overflow_is_an_error() {
        let transactions = vec![
            Transaction::new("Revenue", "2023-01-01", Decimal::MAX),
            Transaction::new("Revenue", "2023-06-01", Decimal::MAX),
        ];
        assert!(matches!(
            aggregate(&transactions, DEFAULT_DATE_FORMAT),
            Err(AnalysisError::Overflow { .. })
        ));
    }

    fn permutations(values: &[Decimal]) -> Vec<Vec<Transaction>> {
        let mut orders = Vec::new();
        let mut current: Vec<Decimal> = values.to_vec();
        let n = current.len();
        let mut counters = vec![0; n];
        orders.push(current.clone());
        let mut i = 0;
        while i < n {
            if counters[i] < i {
                let swap = if i % 2 == 0 { 0 } else { counters[i] };
                current.swap(swap, i);
                orders.push(current.clone());
                counters[i] += 1;
                i = 0;
            } else {
                counters[i] = 0;
                i += 1;
            }
        }

        orders
            .into_iter()
            .map(|order| {
                order
                    .into_iter()
                    .map(|value| Transaction::new("Revenue", "2023-01-01", value))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_sums_beyond_precision_are_order_independent() {
        let big: Decimal = "70000000000000000000000000000".parse().unwrap();
        let half = Decimal::new(5, 1);
        let expected: Decimal = "70000000000000000000000000001".parse().unwrap();

        for order in permutations(&[big, half, half]) {
            let totals = aggregate(&order, DEFAULT_DATE_FORMAT).unwrap();
            assert_eq!(total(&totals, "Revenue", 2023), Some(expected));
        }
    }

    #[test]
    fn test_inexact_sum_is_an_error() {
        let big: Decimal = "70000000000000000000000000000".parse().unwrap();
        let half = Decimal::new(5, 1);

        for order in permutations(&[big, half]) {
            assert!(matches!(
                aggregate(&order, DEFAULT_DATE_FORMAT),
                Err(AnalysisError::Overflow { .. })
            ));
        }
    }

    #[test]
    fn test_overflow_detection_is_order_independent() {
        for order in permutations(&[Decimal::MAX, Decimal::MAX, Decimal::MIN]) {
            let totals = aggregate(&order, DEFAULT_DATE_FORMAT).unwrap();
            assert_eq!(total(&totals, "Revenue", 2023), Some(Decimal::MAX));
        }

        for order in permutations(&[Decimal::MAX, Decimal::MAX, Decimal::ONE]) {
            assert!(aggregate(&order, DEFAULT_DATE_FORMAT).is_err());
        }
    }

    #[test]
    fn test_sum_keeps_widest_scale() {
        let transactions = vec![
            Transaction::new("Fees", "2023-01-01", Decimal::new(150, 2)),
            Transaction::new("Fees", "2023-01-02", Decimal::new(-25, 1)),
            Transaction::new("Fees", "2023-01-03", Decimal::from(4)),
        ];

        let sum = total(&aggregate(&transactions, DEFAULT_DATE_FORMAT).unwrap(), "Fees", 2023).unwrap();
        assert_eq!(sum, Decimal::new(300, 2));
        assert_eq!(sum.to_string(), "3.00");
    }

    #[test]
    fn test_retain_categories() {
        let mut totals = aggregate(&sample(), DEFAULT_DATE_FORMAT).unwrap();
        totals.retain_categories(&["Limits".to_string(), "Revenue".to_string()]);
        assert_eq!(totals.categories(CategoryOrder::FirstSeen), vec!["Revenue", "Limits"]);
        assert!(total(&totals, "Balances", 2023).is_none());
    }

    #[test]
    fn test_to_category_totals() {
        let totals = aggregate(&sample(), DEFAULT_DATE_FORMAT).unwrap();
        let view = totals.to_category_totals(CategoryOrder::Lexical);

        assert_eq!(view.len(), 4);
        assert_eq!(view[0].category, "Balances");
        assert_eq!(view[0].years[0].year, 2023);
        assert_eq!(view[0].years[1].total, Decimal::from(515_000));
    }
}
