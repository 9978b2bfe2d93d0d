//! Query parameters for the `/homeowners` endpoints.

use serde::Deserialize;
use utoipa::IntoParams;

use crate::domain::aggregate::RegionFilter;

/// Query for `GET /homeowners/radar`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RadarQuery {
    /// Segment to report; unknown or absent means the mean over segments.
    pub segment: Option<String>,
}

/// Dashboard filter shared by `kpis`, `top10`, `summary` and `tradecounts`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FilterQuery {
    /// Exact segment, or `All`.
    pub segment: Option<String>,
    /// Exact region, or `All Regions`.
    pub region: Option<String>,
    /// Exact sub-region, or `All Sub-Regions`.
    pub sub_region: Option<String>,
}

impl FilterQuery {
    /// Converts the raw parameters into a filter.
    #[must_use]
    pub fn filter(&self) -> RegionFilter {
        RegionFilter::new(self.region.as_deref(), self.sub_region.as_deref())
            .with_segment(self.segment.as_deref())
    }
}

/// Query for `GET /homeowners/subregion-revenue`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RegionQuery {
    /// Exact segment, or `All`.
    pub segment: Option<String>,
    /// Exact region, or `All Regions`.
    pub region: Option<String>,
}

impl RegionQuery {
    /// Converts the raw parameters into a filter with no sub-region.
    #[must_use]
    pub fn filter(&self) -> RegionFilter {
        RegionFilter::new(self.region.as_deref(), None).with_segment(self.segment.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregate::ALL_SEGMENTS;

    #[test]
    fn sentinels_disable_their_dimension() {
        let query = FilterQuery {
            segment: Some(ALL_SEGMENTS.to_string()),
            region: Some("All Regions".to_string()),
            sub_region: Some(String::new()),
        };
        assert_eq!(query.filter(), RegionFilter::default());
    }

    #[test]
    fn segment_is_carried_into_the_filter() {
        let query = RegionQuery {
            segment: Some("Corporate".to_string()),
            region: None,
        };
        assert_eq!(
            query.filter(),
            RegionFilter::default().with_segment(Some("Corporate"))
        );
    }
}
