//! Pure aggregations over a [`Dataset`] snapshot.
//!
//! Every function here is deterministic given its input. Null values are
//! skipped by means and counts. Ties on "most frequent" and "best" go to the
//! lexically smallest label, which is why grouping uses `BTreeMap`.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;
use utoipa::ToSchema;

use super::{Dataset, Homeowner};

/// Radar axis labels, in score order.
pub const RADAR_LABELS: [&str; 4] = ["Recency", "Frequency", "Monetary", "Duration"];

/// Filter sentinel meaning "every segment".
pub const ALL_SEGMENTS: &str = "All";

/// Filter sentinel meaning "every region".
pub const ALL_REGIONS: &str = "All Regions";

/// Filter sentinel meaning "every sub-region".
pub const ALL_SUB_REGIONS: &str = "All Sub-Regions";

/// Headline KPI figures.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Kpis {
    /// Number of customers.
    pub total_customers: usize,
    /// Mean composite score, 2 dp.
    pub avg_rfmd: Option<f64>,
    /// Mean spend, 2 dp.
    pub avg_monetary: Option<f64>,
    /// Mean transaction count, 2 dp.
    pub avg_frequency: Option<f64>,
    /// Most frequent trade.
    pub top_trade: Option<String>,
    /// Most frequent region.
    pub top_region: Option<String>,
}

/// KPI figures plus best segment, revenue extremes by region and the
/// summed composite score.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Summary {
    /// Number of customers.
    pub total_customers: usize,
    /// Mean composite score, 2 dp.
    pub avg_rfmd: Option<f64>,
    /// Most frequent trade.
    pub top_trade: Option<String>,
    /// Most frequent region.
    pub top_region: Option<String>,
    /// Mean spend, 2 dp.
    pub avg_monetary: Option<f64>,
    /// Mean transaction count, 2 dp.
    pub avg_frequency: Option<f64>,
    /// Segment with the highest mean composite score.
    pub best_segment: Option<String>,
    /// That segment's mean composite score, 2 dp.
    pub best_segment_score: Option<f64>,
    /// Region with the highest summed spend.
    pub best_region_revenue: Option<String>,
    /// That region's summed spend, 2 dp.
    pub best_region_revenue_value: Option<f64>,
    /// Region with the lowest summed spend.
    pub lowest_region_revenue: Option<String>,
    /// That region's summed spend, 2 dp.
    pub lowest_region_revenue_value: Option<f64>,
    /// Sum of every present composite score, 2 dp.
    pub total_rfmd: f64,
}

/// Radar chart payload: four labels and four scores in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Radar {
    /// Always `Recency`, `Frequency`, `Monetary`, `Duration`.
    pub labels: Vec<String>,
    /// Average component scores, 2 dp.
    pub scores: Vec<f64>,
}

/// Occurrences of one trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TradeCount {
    /// Trade label.
    #[serde(rename = "Trade")]
    pub trade: String,
    /// Number of matching customers.
    #[serde(rename = "Count")]
    pub count: u64,
}

/// A region and the sub-regions seen within it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RegionOptions {
    /// Region label.
    pub region: String,
    /// Distinct sub-region labels, sorted.
    pub sub_regions: Vec<String>,
}

/// Highest and lowest revenue sub-regions within a region filter.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SubRegionRevenue {
    /// Sub-region with the highest summed spend.
    pub highest_sub_region: String,
    /// Its summed spend, 2 dp.
    pub highest_revenue: f64,
    /// Sub-region with the lowest summed spend.
    pub lowest_sub_region: String,
    /// Its summed spend, 2 dp.
    pub lowest_revenue: f64,
}

/// Exact-match segment, region and sub-region filter.
///
/// Empty strings and the `All` / `All Regions` / `All Sub-Regions`
/// sentinels mean "no filter" for their dimension. The default filter
/// matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionFilter {
    segment: Option<String>,
    region: Option<String>,
    sub_region: Option<String>,
}

impl RegionFilter {
    /// Builds a region filter, dropping sentinel and empty values.
    #[must_use]
    pub fn new(region: Option<&str>, sub_region: Option<&str>) -> Self {
        Self {
            segment: None,
            region: active(region, ALL_REGIONS),
            sub_region: active(sub_region, ALL_SUB_REGIONS),
        }
    }

    /// Narrows the filter to one segment.
    #[must_use]
    pub fn with_segment(mut self, segment: Option<&str>) -> Self {
        self.segment = active(segment, ALL_SEGMENTS);
        self
    }

    /// Returns `true` if the record passes every dimension.
    #[must_use]
    pub fn matches(&self, record: &Homeowner) -> bool {
        same(self.segment.as_deref(), record.segment.as_deref())
            && same(self.region.as_deref(), record.region.as_deref())
            && same(self.sub_region.as_deref(), record.sub_region.as_deref())
    }

    fn without_sub_region(&self) -> Self {
        Self {
            sub_region: None,
            ..self.clone()
        }
    }
}

fn same(wanted: Option<&str>, actual: Option<&str>) -> bool {
    wanted.is_none_or(|w| actual == Some(w))
}

fn select<'a>(dataset: &'a Dataset, filter: &RegionFilter) -> Vec<&'a Homeowner> {
    dataset.iter().filter(|r| filter.matches(r)).collect()
}

fn active(value: Option<&str>, sentinel: &str) -> Option<String> {
    value
        .filter(|v| !v.is_empty() && *v != sentinel)
        .map(str::to_string)
}

/// Rounds to 2 decimal places, ties to even.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Mean of the present values, or `None` when there are none.
#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0_usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Counts non-null labels.
fn counts<'a>(labels: impl Iterator<Item = Option<&'a str>>) -> BTreeMap<&'a str, u64> {
    let mut map = BTreeMap::new();
    for label in labels.flatten() {
        *map.entry(label).or_insert(0) += 1;
    }
    map
}

/// Key with the highest value; the first (smallest) key wins ties.
fn arg_max<K: Copy, V: PartialOrd + Copy>(
    entries: impl IntoIterator<Item = (K, V)>,
) -> Option<(K, V)> {
    entries.into_iter().fold(None, |best, (k, v)| match best {
        Some((_, bv)) if v <= bv => best,
        _ => Some((k, v)),
    })
}

/// Key with the lowest value; the first (smallest) key wins ties.
fn arg_min<K: Copy, V: PartialOrd + Copy>(
    entries: impl IntoIterator<Item = (K, V)>,
) -> Option<(K, V)> {
    entries.into_iter().fold(None, |best, (k, v)| match best {
        Some((_, bv)) if v >= bv => best,
        _ => Some((k, v)),
    })
}

fn most_frequent<'a>(labels: impl Iterator<Item = Option<&'a str>>) -> Option<String> {
    arg_max(counts(labels)).map(|(label, _)| label.to_string())
}

#[allow(clippy::cast_precision_loss)]
fn avg_frequency(records: &[&Homeowner]) -> Option<f64> {
    mean(records.iter().filter_map(|r| r.frequency).map(|f| f as f64)).map(round2)
}

fn avg_monetary(records: &[&Homeowner]) -> Option<f64> {
    mean(records.iter().filter_map(|r| r.monetary)).map(round2)
}

fn avg_rfmd(records: &[&Homeowner]) -> Option<f64> {
    mean(records.iter().filter_map(|r| r.rfmd_score)).map(round2)
}

fn kpis_of(records: &[&Homeowner]) -> Option<Kpis> {
    if records.is_empty() {
        return None;
    }
    Some(Kpis {
        total_customers: records.len(),
        avg_rfmd: avg_rfmd(records),
        avg_monetary: avg_monetary(records),
        avg_frequency: avg_frequency(records),
        top_trade: most_frequent(records.iter().map(|r| r.trade.as_deref())),
        top_region: most_frequent(records.iter().map(|r| r.region.as_deref())),
    })
}

/// KPI card figures over the filtered records. `None` when nothing
/// matches.
#[must_use]
pub fn kpis(dataset: &Dataset, filter: &RegionFilter) -> Option<Kpis> {
    kpis_of(&select(dataset, filter))
}

/// The `n` filtered records with the highest composite score, descending.
///
/// The sort is stable, so equal scores keep load order. Records without a
/// score sort after every scored record.
#[must_use]
pub fn top_n<'a>(dataset: &'a Dataset, filter: &RegionFilter, n: usize) -> Vec<&'a Homeowner> {
    let mut ranked = select(dataset, filter);
    ranked.sort_by(|a, b| match (a.rfmd_score, b.rfmd_score) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    ranked.truncate(n);
    ranked
}

/// Average R/F/M/D scores for one segment, or the mean of all segment
/// averages when `segment` is absent or unknown.
///
/// The fallback is a mean of per-segment means, so small segments weigh as
/// much as large ones. Records without a segment are ignored. A component
/// with no data reports `0.0`.
#[must_use]
pub fn radar(dataset: &Dataset, segment: Option<&str>) -> Radar {
    let mut groups: BTreeMap<&str, [(f64, usize); 4]> = BTreeMap::new();
    for record in dataset {
        let Some(seg) = record.segment.as_deref() else {
            continue;
        };
        let acc = groups.entry(seg).or_insert([(0.0, 0); 4]);
        for (slot, score) in acc.iter_mut().zip(record.component_scores()) {
            if let Some(score) = score {
                slot.0 += f64::from(score);
                slot.1 += 1;
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let group_means: BTreeMap<&str, [Option<f64>; 4]> = groups
        .into_iter()
        .map(|(seg, acc)| (seg, acc.map(|(sum, n)| (n > 0).then(|| sum / n as f64))))
        .collect();

    let selected = segment
        .filter(|s| !s.is_empty())
        .and_then(|s| group_means.get(s))
        .copied();

    let scores: [Option<f64>; 4] = match selected {
        Some(means) => means,
        None => std::array::from_fn(|i| {
            mean(
                group_means
                    .values()
                    .filter_map(|means| means.get(i).copied().flatten()),
            )
        }),
    };

    Radar {
        labels: RADAR_LABELS.iter().map(|l| (*l).to_string()).collect(),
        scores: scores.iter().map(|s| round2(s.unwrap_or(0.0))).collect(),
    }
}

/// Customers per trade after filtering, most frequent first.
///
/// Equal counts are ordered by trade label.
#[must_use]
pub fn trade_counts(dataset: &Dataset, filter: &RegionFilter) -> Vec<TradeCount> {
    let mut out: Vec<TradeCount> = counts(
        dataset
            .iter()
            .filter(|r| filter.matches(r))
            .map(|r| r.trade.as_deref()),
    )
    .into_iter()
    .map(|(trade, count)| TradeCount {
        trade: trade.to_string(),
        count,
    })
    .collect();
    // BTreeMap order is lexical; a stable sort keeps it among equal counts.
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

/// Full summary box over the filtered records. `None` when nothing
/// matches.
#[must_use]
pub fn summary(dataset: &Dataset, filter: &RegionFilter) -> Option<Summary> {
    let records = select(dataset, filter);
    let kpis = kpis_of(&records)?;

    let mut segment_scores: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for record in &records {
        if let (Some(seg), Some(score)) = (record.segment.as_deref(), record.rfmd_score) {
            let acc = segment_scores.entry(seg).or_insert((0.0, 0));
            acc.0 += score;
            acc.1 += 1;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let best_segment = arg_max(
        segment_scores
            .into_iter()
            .map(|(seg, (sum, n))| (seg, sum / n as f64)),
    );

    let region_revenue = revenue_by(records.iter().copied(), |r| r.region.as_deref());
    let best_region = arg_max(region_revenue.iter().map(|(k, v)| (*k, *v)));
    let worst_region = arg_min(region_revenue.iter().map(|(k, v)| (*k, *v)));
    let total_rfmd: f64 = records.iter().filter_map(|r| r.rfmd_score).sum();

    Some(Summary {
        total_customers: kpis.total_customers,
        avg_rfmd: kpis.avg_rfmd,
        top_trade: kpis.top_trade,
        top_region: kpis.top_region,
        avg_monetary: kpis.avg_monetary,
        avg_frequency: kpis.avg_frequency,
        best_segment: best_segment.map(|(s, _)| s.to_string()),
        best_segment_score: best_segment.map(|(_, v)| round2(v)),
        best_region_revenue: best_region.map(|(r, _)| r.to_string()),
        best_region_revenue_value: best_region.map(|(_, v)| round2(v)),
        lowest_region_revenue: worst_region.map(|(r, _)| r.to_string()),
        lowest_region_revenue_value: worst_region.map(|(_, v)| round2(v)),
        total_rfmd: round2(total_rfmd),
    })
}

/// Summed spend per label. Every labelled record creates its group, even
/// when its spend is null.
fn revenue_by<'a>(
    records: impl Iterator<Item = &'a Homeowner>,
    label: impl Fn(&'a Homeowner) -> Option<&'a str>,
) -> BTreeMap<&'a str, f64> {
    let mut map = BTreeMap::new();
    for record in records {
        if let Some(key) = label(record) {
            *map.entry(key).or_insert(0.0) += record.monetary.unwrap_or(0.0);
        }
    }
    map
}

/// Distinct segment labels in order of first appearance.
#[must_use]
pub fn segments(dataset: &Dataset) -> Vec<String> {
    let mut seen = HashSet::new();
    dataset
        .iter()
        .filter_map(|r| r.segment.as_deref())
        .filter(|s| seen.insert(*s))
        .map(str::to_string)
        .collect()
}

/// Every region with its sub-regions, both sorted.
#[must_use]
pub fn regions(dataset: &Dataset) -> Vec<RegionOptions> {
    let mut map: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for record in dataset {
        if let Some(region) = record.region.as_deref() {
            let subs = map.entry(region).or_default();
            if let Some(sub) = record.sub_region.as_deref() {
                subs.insert(sub);
            }
        }
    }
    map.into_iter()
        .map(|(region, subs)| RegionOptions {
            region: region.to_string(),
            sub_regions: subs.into_iter().map(str::to_string).collect(),
        })
        .collect()
}

/// Highest and lowest revenue sub-regions within the segment and region
/// of `filter`. Its sub-region dimension is ignored.
///
/// `None` when no matching record has a sub-region.
#[must_use]
pub fn sub_region_revenue(dataset: &Dataset, filter: &RegionFilter) -> Option<SubRegionRevenue> {
    let filter = filter.without_sub_region();
    let revenue = revenue_by(
        dataset.iter().filter(|r| filter.matches(r)),
        |r| r.sub_region.as_deref(),
    );
    let (high, high_value) = arg_max(revenue.iter().map(|(k, v)| (*k, *v)))?;
    let (low, low_value) = arg_min(revenue.iter().map(|(k, v)| (*k, *v)))?;
    Some(SubRegionRevenue {
        highest_sub_region: high.to_string(),
        highest_revenue: round2(high_value),
        lowest_sub_region: low.to_string(),
        lowest_revenue: round2(low_value),
    })
}
