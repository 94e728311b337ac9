//! Consecutive-year percentage changes.

use super::{AnalysisError, YearlyTotals};
use crate::models::{CategoryOrder, ChangeRecord, Direction, UndefinedChange};
use rust_decimal::Decimal;

/// Percentage change from `from` to `to`.
///
/// Returns `None` when `from` is zero or the arithmetic overflows.
pub fn percent_change(from: Decimal, to: Decimal) -> Option<Decimal> {
    if from.is_zero() {
        return None;
    }

    to.checked_sub(from)?
        .checked_div(from)?
        .checked_mul(Decimal::ONE_HUNDRED)
}

/// Compute year-over-year changes for every category.
///
/// Each adjacent pair of years with data yields one outcome. A pair whose
/// earlier total is zero yields [`AnalysisError::DivisionByZero`] without
/// affecting other pairs.
pub fn analyze(totals: &YearlyTotals, order: CategoryOrder) -> Vec<Result<ChangeRecord, AnalysisError>> {
    totals
        .categories(order)
        .into_iter()
        .flat_map(|category| {
            let years: Vec<(i32, Decimal)> = totals
                .years(category)
                .map(|years| years.iter().map(|(&y, &v)| (y, v)).collect())
                .unwrap_or_default();

            years
                .windows(2)
                .map(|pair| {
                    let (year_from, from) = pair[0];
                    let (year_to, to) = pair[1];
                    change_for(category, year_from, from, year_to, to)
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn change_for(
    category: &str,
    year_from: i32,
    from: Decimal,
    year_to: i32,
    to: Decimal,
) -> Result<ChangeRecord, AnalysisError> {
    if from.is_zero() {
        return Err(AnalysisError::DivisionByZero {
            category: category.to_string(),
            year_from,
            year_to,
        });
    }

    let percent = percent_change(from, to).ok_or_else(|| AnalysisError::ChangeOverflow {
        category: category.to_string(),
        year_from,
        year_to,
    })?;

    Ok(ChangeRecord::new(category, year_from, year_to, percent))
}

/// Split analysis outcomes into computed records and undefined pairs.
pub fn partition_outcomes(
    outcomes: Vec<Result<ChangeRecord, AnalysisError>>,
) -> (Vec<ChangeRecord>, Vec<UndefinedChange>) {
    let mut records = Vec::new();
    let mut undefined = Vec::new();

    for outcome in outcomes {
        match outcome {
            Ok(record) => records.push(record),
            Err(err) => undefined.push(undefined_change(&err)),
        }
    }

    (records, undefined)
}

fn undefined_change(err: &AnalysisError) -> UndefinedChange {
    let (category, year_from, year_to) = match err {
        AnalysisError::DivisionByZero {
            category,
            year_from,
            year_to,
        }
        | AnalysisError::ChangeOverflow {
            category,
            year_from,
            year_to,
        } => (category.clone(), Some(*year_from), Some(*year_to)),
        AnalysisError::Overflow { category, .. } => (category.clone(), None, None),
        AnalysisError::EmptyCategory { .. }
        | AnalysisError::InvalidDate { .. }
        | AnalysisError::EmptyInput => (String::new(), None, None),
    };

    UndefinedChange {
        category,
        year_from,
        year_to,
        reason: err.to_string(),
    }
}

/// Get the top N movers in one direction.
///
/// Gainers are sorted by largest increase, losers by largest decrease.
pub fn top_movers(records: &[ChangeRecord], n: usize, direction: Direction) -> Vec<&ChangeRecord> {
    let mut movers: Vec<&ChangeRecord> = records.iter().filter(|r| r.direction == direction).collect();

    match direction {
        Direction::Gainer => movers.sort_by(|a, b| b.percent_change.cmp(&a.percent_change)),
        Direction::Loser => movers.sort_by(|a, b| a.percent_change.cmp(&b.percent_change)),
        Direction::Flat => {}
    }

    movers.truncate(n);
    movers
}
