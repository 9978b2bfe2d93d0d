//! Homeowner service: serves every aggregation from the cached snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::domain::aggregate::{
    self, Kpis, Radar, RegionFilter, RegionOptions, SubRegionRevenue, Summary, TradeCount,
};
use crate::domain::homeowner::LEGACY_AREA_COLUMN;
use crate::domain::{CacheStatus, Dataset, DatasetCache, Homeowner};

/// Size of the top-customers listing.
pub const TOP_N: usize = 10;

/// A top-customer row: the record plus any extra source columns except the
/// legacy `area` column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedHomeowner {
    /// The customer record.
    #[serde(flatten)]
    pub record: Homeowner,
    /// Extra source columns.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl From<&Homeowner> for RankedHomeowner {
    fn from(record: &Homeowner) -> Self {
        let mut extra = record.extra.clone();
        extra.remove(LEGACY_AREA_COLUMN);
        Self {
            record: record.clone(),
            extra,
        }
    }
}

/// Read-only façade over the dataset cache.
///
/// Stateless apart from the shared cache handle: each call takes the
/// current snapshot (refreshing it if stale) and computes its answer from
/// that snapshot alone.
#[derive(Debug, Clone)]
pub struct HomeownerService {
    cache: Arc<DatasetCache>,
}

impl HomeownerService {
    /// Creates a new `HomeownerService`.
    #[must_use]
    pub fn new(cache: Arc<DatasetCache>) -> Self {
        Self { cache }
    }

    /// Returns a reference to the inner [`DatasetCache`].
    #[must_use]
    pub fn cache(&self) -> &Arc<DatasetCache> {
        &self.cache
    }

    /// Every record of the current snapshot.
    pub async fn list_all(&self) -> Arc<Dataset> {
        self.cache.get().await
    }

    /// KPI card figures for the filtered customers; `None` when none match.
    pub async fn kpis(&self, filter: &RegionFilter) -> Option<Kpis> {
        aggregate::kpis(&*self.cache.get().await, filter)
    }

    /// The ten highest-scoring filtered customers.
    pub async fn top10(&self, filter: &RegionFilter) -> Vec<RankedHomeowner> {
        let dataset = self.cache.get().await;
        aggregate::top_n(&dataset, filter, TOP_N)
            .into_iter()
            .map(RankedHomeowner::from)
            .collect()
    }

    /// Radar scores for a segment, or the mean over segments.
    pub async fn radar(&self, segment: Option<&str>) -> Radar {
        aggregate::radar(&*self.cache.get().await, segment)
    }

    /// Per-trade customer counts within a region filter.
    pub async fn trade_counts(&self, filter: &RegionFilter) -> Vec<TradeCount> {
        aggregate::trade_counts(&*self.cache.get().await, filter)
    }

    /// Summary box figures for the filtered customers; `None` when none
    /// match.
    pub async fn summary(&self, filter: &RegionFilter) -> Option<Summary> {
        aggregate::summary(&*self.cache.get().await, filter)
    }

    /// Distinct segments in first-appearance order.
    pub async fn segments(&self) -> Vec<String> {
        aggregate::segments(&*self.cache.get().await)
    }

    /// Region and sub-region filter options.
    pub async fn regions(&self) -> Vec<RegionOptions> {
        aggregate::regions(&*self.cache.get().await)
    }

    /// Highest and lowest revenue sub-regions within the filter's segment
    /// and region.
    pub async fn sub_region_revenue(&self, filter: &RegionFilter) -> Option<SubRegionRevenue> {
        aggregate::sub_region_revenue(&*self.cache.get().await, filter)
    }

    /// Cache state, without triggering a refresh.
    pub async fn cache_status(&self) -> CacheStatus {
        self.cache.status().await
    }
}
