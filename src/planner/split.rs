//! Split-by-key partitioning.
//!
//! The planner only computes parameters; the query builder renders them into
//! predicates through the dialect. Whatever the scheme, the partition
//! predicates must be total and exclusive over the table's rows, otherwise the
//! downstream scan silently loses or duplicates data.

use log::warn;
use serde::Serialize;

use crate::models::enums::SplitScheme;
use crate::planner::dialect::SqlDialect;

/// Parameters of one partition; one worker scans one partition.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Debug)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum PartitionParams {
    /// The whole table, no split predicate.
    Full,
    /// `MOD(key, modulus) = remainder`
    Modulo { modulus: u32, remainder: u32 },
    /// `lower <= key < upper`; a missing bound is open and a missing lower
    /// bound also admits NULL keys.
    Range { lower: Option<i64>, upper: Option<i64> },
}

impl PartitionParams {
    /// Render the split predicate for this partition, `None` for a full scan.
    pub fn predicate(&self, dialect: &dyn SqlDialect, split_key: &str) -> Option<String> {
        let column = dialect.ident(split_key);
        match *self {
            PartitionParams::Full => None,
            PartitionParams::Modulo { modulus, remainder } => {
                Some(dialect.modulo_fragment(&column, &modulus.to_string(), &remainder.to_string()))
            }
            PartitionParams::Range { lower, upper } => {
                let fragment = dialect.range_fragment(&column, lower, upper);
                (!fragment.is_empty()).then_some(fragment)
            }
        }
    }

    /// Whether a row with this split key value satisfies the partition
    /// predicate, following SQL semantics (NULL never matches a comparison).
    pub fn admits(&self, key: Option<i64>) -> bool {
        match *self {
            PartitionParams::Full => true,
            PartitionParams::Modulo { modulus, remainder } => {
                key.is_some_and(|k| k % i64::from(modulus) == i64::from(remainder))
            }
            PartitionParams::Range { lower, upper } => match key {
                None => lower.is_none(),
                Some(k) => lower.is_none_or(|l| k >= l) && upper.is_none_or(|u| k < u),
            },
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Debug)]
pub struct SplitPlan {
    partitioned: bool,
    split_key: Option<String>,
    partitions: Vec<PartitionParams>,
}

impl SplitPlan {
    fn single() -> Self {
        Self {
            partitioned: false,
            split_key: None,
            partitions: vec![PartitionParams::Full],
        }
    }

    pub fn is_partitioned(&self) -> bool {
        self.partitioned
    }

    pub fn split_key(&self) -> Option<&str> {
        self.split_key.as_deref()
    }

    pub fn partitions(&self) -> &[PartitionParams] {
        &self.partitions
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

/// Decide between a single scan and a key-partitioned scan.
///
/// Splitting needs `parallelism > 1` and a split key that is not blank. When
/// enabled, exactly `parallelism` partitions are produced.
pub fn plan_split(parallelism: u32, split_key: Option<&str>, scheme: SplitScheme) -> SplitPlan {
    let key = split_key.map(str::trim).filter(|k| !k.is_empty());
    let key = match key {
        Some(k) if parallelism > 1 => k,
        _ => return SplitPlan::single(),
    };

    let partitions = match scheme {
        SplitScheme::Modulo => {
            warn!(
                "modulo split on {}: rows whose key is NULL or negative match no partition; \
                 use a range split if {} can hold such values",
                key, key
            );
            modulo_partitions(parallelism)
        }
        SplitScheme::Range { lower, upper } => range_partitions(lower, upper, parallelism),
    };

    SplitPlan {
        partitioned: true,
        split_key: Some(key.to_string()),
        partitions,
    }
}

fn modulo_partitions(n: u32) -> Vec<PartitionParams> {
    (0..n)
        .map(|remainder| PartitionParams::Modulo { modulus: n, remainder })
        .collect()
}

/// Boundaries are spread with integer division over i128 so they never
/// overflow and never decrease. When the range holds fewer values than
/// partitions some inner partitions are empty, which keeps the count at `n`.
fn range_partitions(lower: i64, upper: i64, n: u32) -> Vec<PartitionParams> {
    let span = i128::from(upper) - i128::from(lower);
    let n_wide = i128::from(n);
    let boundary = |i: u32| (i128::from(lower) + span * i128::from(i) / n_wide) as i64;

    (0..n)
        .map(|i| PartitionParams::Range {
            lower: (i > 0).then(|| boundary(i)),
            upper: (i + 1 < n).then(|| boundary(i + 1)),
        })
        .collect()
}
