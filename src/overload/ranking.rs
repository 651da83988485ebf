//! Signature distance between a parameter list and provided arguments.

use botscript_core::{ClassHierarchy, DataType};

/// Cost of passing `provided` where `expected` is declared.
///
/// Widening (a provided rank below the expected one) costs the rank
/// difference; narrowing costs ten times the difference.
#[inline]
pub fn conversion_cost(expected: &DataType, provided: &DataType) -> i32 {
    let d = expected.rank() - provided.rank();
    if d > 0 { d } else { -10 * d }
}

/// How one candidate fits the provided arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    /// Every argument converts; lower is better and zero is exact.
    Distance(i32),
    /// Some argument cannot be converted to its parameter.
    Incompatible,
    /// More arguments than parameters.
    TooMany,
    /// Fewer arguments than parameters.
    TooFew,
}

/// Score a candidate's parameter types against the argument types.
///
/// Pairs are walked in order and the first problem wins, so an incompatible
/// argument before the end of the shorter list is reported as such even when
/// the counts differ too.
pub fn score<'a>(
    expected: impl IntoIterator<Item = &'a DataType>,
    provided: &[DataType],
    hierarchy: &dyn ClassHierarchy,
) -> Score {
    let mut expected = expected.into_iter();
    let mut provided = provided.iter();
    let mut distance = 0;
    loop {
        match (expected.next(), provided.next()) {
            (Some(want), Some(have)) => {
                if !want.accepts(have, hierarchy) {
                    return Score::Incompatible;
                }
                distance += conversion_cost(want, have);
            }
            (None, Some(_)) => return Score::TooMany,
            (Some(_), None) => return Score::TooFew,
            (None, None) => return Score::Distance(distance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botscript_core::ExactClasses;

    #[test]
    fn widening_is_cheap_narrowing_is_not() {
        // float expected, int provided: widening by 2
        assert_eq!(conversion_cost(&DataType::float(), &DataType::int()), 2);
        // int expected, float provided: narrowing by 2
        assert_eq!(conversion_cost(&DataType::int(), &DataType::float()), 20);
        assert_eq!(conversion_cost(&DataType::int(), &DataType::int()), 0);
    }

    #[test]
    fn null_matches_class_exactly() {
        assert_eq!(conversion_cost(&DataType::class("A"), &DataType::null()), 0);
    }

    #[test]
    fn scoring() {
        let h = ExactClasses;
        let params = [DataType::int(), DataType::double()];
        assert_eq!(
            score(&params, &[DataType::int(), DataType::float()], &h),
            Score::Distance(1)
        );
        assert_eq!(score(&params, &[DataType::int()], &h), Score::TooFew);
        assert_eq!(
            score(&params, &[DataType::int(), DataType::int(), DataType::int()], &h),
            Score::TooMany
        );
        assert_eq!(
            score(&params, &[DataType::string()], &h),
            Score::Incompatible
        );
        assert_eq!(score(&[], &[], &h), Score::Distance(0));
    }
}
