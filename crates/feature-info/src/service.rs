//! Fail-soft feature lookups over HTTP.

use std::sync::Arc;
use std::time::Duration;

use map_common::{LngLat, LngLatBounds, MapError, MapResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use wms_protocol::getfeatureinfo::{
    FeatureInfoRequest, DEFAULT_PIXEL_HEIGHT, DEFAULT_PIXEL_WIDTH, DEFAULT_PIXEL_X,
    DEFAULT_PIXEL_Y,
};

use crate::resolver::BaseUrlResolver;
use crate::result::{parse_feature_info, FeatureInfoResult};

/// HTTP client settings for feature lookups.
#[derive(Debug, Clone)]
pub struct FeatureInfoConfig {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for FeatureInfoConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// A click or area selection on one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureInfoQuery {
    pub layer: String,
    #[serde(default)]
    pub point: Option<LngLat>,
    #[serde(default)]
    pub bounds: Option<LngLatBounds>,
    #[serde(default = "default_x")]
    pub x: u32,
    #[serde(default = "default_y")]
    pub y: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_x() -> u32 {
    DEFAULT_PIXEL_X
}

fn default_y() -> u32 {
    DEFAULT_PIXEL_Y
}

fn default_width() -> u32 {
    DEFAULT_PIXEL_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_PIXEL_HEIGHT
}

impl FeatureInfoQuery {
    pub fn at_point(layer: impl Into<String>, point: LngLat) -> Self {
        Self {
            layer: layer.into(),
            point: Some(point),
            bounds: None,
            x: DEFAULT_PIXEL_X,
            y: DEFAULT_PIXEL_Y,
            width: DEFAULT_PIXEL_WIDTH,
            height: DEFAULT_PIXEL_HEIGHT,
        }
    }

    pub fn in_bounds(layer: impl Into<String>, bounds: LngLatBounds) -> Self {
        Self {
            point: None,
            bounds: Some(bounds),
            ..Self::at_point(layer, LngLat::new(0.0, 0.0))
        }
    }

    /// The protocol request; `None` without a point or area selection.
    pub fn to_request(&self) -> Option<FeatureInfoRequest> {
        FeatureInfoRequest::for_selection(self.layer.clone(), self.point, self.bounds.as_ref())
            .map(|request| {
                request
                    .with_pixel(self.x, self.y)
                    .with_size(self.width, self.height)
            })
    }
}

/// Issues GetFeatureInfo requests and reduces the response to one feature.
pub struct FeatureInfoService {
    client: Client,
    resolver: Arc<dyn BaseUrlResolver>,
}

impl FeatureInfoService {
    pub fn new(config: FeatureInfoConfig, resolver: Arc<dyn BaseUrlResolver>) -> MapResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| MapError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, resolver })
    }

    /// Build the full request URL for a query.
    pub async fn build_url(&self, query: &FeatureInfoQuery) -> MapResult<String> {
        let request = query.to_request().ok_or_else(|| MapError::InvalidParameter {
            param: "BBOX".to_string(),
            message: "query needs a point or bounds".to_string(),
        })?;
        let base_url = self.resolver.resolve(&query.layer).await?;
        Ok(request.to_url(&base_url)?.to_string())
    }

    /// Look up the first feature for a query.
    ///
    /// Never fails: any error is logged and reported as `None`.
    #[instrument(skip(self, query), fields(layer = %query.layer))]
    pub async fn fetch_feature_info(&self, query: &FeatureInfoQuery) -> Option<FeatureInfoResult> {
        match self.try_fetch_feature_info(query).await {
            Ok(result) => {
                debug!(id = %result.id, "Feature found");
                metrics::counter!("feature_info_requests_total", "outcome" => "found").increment(1);
                Some(result)
            }
            Err(err) => {
                warn!(error = %err, "Feature info lookup yielded nothing");
                metrics::counter!("feature_info_requests_total", "outcome" => "absent").increment(1);
                None
            }
        }
    }

    /// Same lookup, keeping the reason a feature is absent.
    pub async fn try_fetch_feature_info(
        &self,
        query: &FeatureInfoQuery,
    ) -> MapResult<FeatureInfoResult> {
        let url = self.build_url(query).await?;
        debug!(url = %url, "Requesting feature info");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MapError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MapError::Transport(format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| MapError::Transport(e.to_string()))?;

        parse_feature_info(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_to_request_uses_pixel_settings() {
        let mut query = FeatureInfoQuery::at_point("ws:meetpunten", LngLat::new(5.0, 52.0));
        query.x = 1;
        query.width = 220;

        let request = query.to_request().unwrap();
        assert_eq!(request.x, 1);
        assert_eq!(request.y, 50);
        assert_eq!(request.width, 220);
        assert_eq!(request.bbox.to_wms_string(), "4.999,51.999,5.001,52.001");
    }

    #[test]
    fn test_bounds_query() {
        let bounds = LngLatBounds::new(LngLat::new(4.0, 51.0), LngLat::new(6.0, 53.0));
        let request = FeatureInfoQuery::in_bounds("l", bounds).to_request().unwrap();
        assert_eq!(request.bbox.to_wms_string(), "4,51,6,53");
    }

    #[test]
    fn test_query_deserializes_with_defaults() {
        let query: FeatureInfoQuery =
            serde_json::from_str(r#"{"layer":"l","point":{"lng":5.0,"lat":52.0}}"#).unwrap();
        assert_eq!((query.x, query.y, query.width, query.height), (50, 50, 110, 110));
    }
}
