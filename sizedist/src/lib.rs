use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, trace};

mod error;
mod wire;

pub use error::{Error, Result};
pub use wire::WIRE_VERSION;

/// Resolution of the quantile lookup table.
pub const QUANTILE_BUCKETS: usize = 1000;


/// Occurrence count of a single observed value, and the probability of
/// observing that value or less.
///
/// `cprob` is only meaningful while the owning distribution is fresh.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct SizeData {
    count: u64,
    cprob: f64,
}

impl SizeData {
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn cprob(&self) -> f64 {
        self.cprob
    }
}

/// Accumulates integer observations (e.g. fragment sizes) and answers
/// cdf/quantile queries over their empirical distribution.
///
/// Derived statistics are rebuilt lazily: any addition marks them stale,
/// and the next query recomputes them before answering.
#[derive(Clone, Debug, Default)]
pub struct SizeDistribution {
    total_count: u64,
    sizes: BTreeMap<i32, SizeData>,

    is_stats_computed: bool,
    quantiles: Vec<i32>,
}

impl SizeDistribution {
    pub fn new() -> SizeDistribution {
        SizeDistribution::default()
    }

    // Rebuilds a distribution from persisted counts. The caller guarantees
    // that total_count is the sum of the counts.
    pub(crate) fn from_parts(total_count: u64, sizes: BTreeMap<i32, SizeData>) -> SizeDistribution {
        SizeDistribution {
            total_count,
            sizes,
            is_stats_computed: false,
            quantiles: vec![],
        }
    }

    pub fn add_observation(&mut self, size: i32) {
        self.is_stats_computed = false;
        self.total_count += 1;
        self.sizes.entry(size).or_default().count += 1;
    }

    pub fn total_observations(&self) -> u64 {
        self.total_count
    }

    pub fn distinct_values(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    /// Whether the cached cumulative probabilities and quantile table
    /// reflect every observation added so far.
    pub fn is_fresh(&self) -> bool {
        self.is_stats_computed
    }

    /// Observed values in ascending order with their counts.
    ///
    /// The `cprob` of each entry is stale unless `refresh` (or a query) ran
    /// after the last addition.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &SizeData)> + '_ {
        self.sizes.iter().map(|(&value, data)| (value, data))
    }

    /// Recomputes cumulative probabilities and the quantile table if any
    /// observation was added since the last computation.
    pub fn refresh(&mut self) {
        if !self.is_stats_computed {
            self.calc_stats();
        }
    }

    fn calc_stats(&mut self) {
        self.quantiles.clear();

        if self.total_count == 0 {
            self.is_stats_computed = true;
            return;
        }

        self.quantiles.reserve(QUANTILE_BUCKETS);

        let total = self.total_count;
        let buckets = QUANTILE_BUCKETS as u128;
        let mut running = 0u64;

        for (&size, data) in self.sizes.iter_mut() {
            running += data.count;
            data.cprob = running as f64 / total as f64;

            // bucket i holds the smallest size whose mass reaches i / QUANTILE_BUCKETS,
            // compared in integers so that bucket edges are exact
            while self.quantiles.len() < QUANTILE_BUCKETS
                && running as u128 * buckets >= self.quantiles.len() as u128 * total as u128
            {
                self.quantiles.push(size);
            }
        }

        trace!(
            total = self.total_count,
            distinct = self.sizes.len(),
            "recomputed size distribution stats"
        );

        self.is_stats_computed = true;
    }

    /// Probability of observing `x` or less.
    ///
    /// Returns 0 when `x` is below every observed value, or when nothing has
    /// been observed.
    pub fn cdf(&mut self, x: i32) -> f64 {
        self.refresh();

        self.sizes
            .range(..=x)
            .next_back()
            .map_or(0.0, |(_, data)| data.cprob)
    }

    /// Return the value for which we observe that value or less with
    /// probability `p`, at a resolution of `1 / QUANTILE_BUCKETS`.
    ///
    /// `p` is floored onto the table and clamped to its range, so
    /// `quantile(1.0)` is the largest observed value. An empty distribution
    /// always answers 0; check `total_observations()` first.
    pub fn quantile(&mut self, p: f32) -> i32 {
        self.refresh();

        if self.quantiles.is_empty() {
            return 0;
        }

        // NaN and negative probabilities saturate to bucket 0
        let bucket = ((p * QUANTILE_BUCKETS as f32) as usize).min(QUANTILE_BUCKETS - 1);
        self.quantiles[bucket]
    }

    /// Merge another distribution into this one.
    pub fn merge(&mut self, other: &SizeDistribution) {
        for (&size, data) in other.sizes.iter() {
            self.sizes.entry(size).or_default().count += data.count;
        }
        self.total_count += other.total_count;
        self.is_stats_computed = false;

        debug!(
            merged = other.total_count,
            total = self.total_count,
            "merged size distributions"
        );
    }
}

impl Extend<i32> for SizeDistribution {
    fn extend<I: IntoIterator<Item = i32>>(&mut self, iter: I) {
        for size in iter {
            self.add_observation(size);
        }
    }
}

impl FromIterator<i32> for SizeDistribution {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        let mut sd = SizeDistribution::new();
        sd.extend(iter);
        sd
    }
}

// Cumulative probabilities are summed from the counts while printing, so the
// dump is never stale even when the cache is.
impl fmt::Display for SizeDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "SizeDistribution(total: {}, distinct: {})",
            self.total_count,
            self.sizes.len()
        )?;

        let mut running = 0u64;
        for (size, data) in self.sizes.iter() {
            running += data.count;
            writeln!(
                f,
                "{}\t{}\t{:.5}",
                size,
                data.count,
                running as f64 / self.total_count as f64
            )?;
        }
        Ok(())
    }
}
