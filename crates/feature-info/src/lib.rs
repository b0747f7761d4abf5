//! WMS GetFeatureInfo client.
//!
//! Looks up the feature under a clicked point or inside a selected area.
//! Every failure (transport, status, malformed body, empty result) collapses
//! into `None`; callers treat "nothing found" and "lookup failed" alike.

pub mod resolver;
pub mod result;
pub mod service;

pub use resolver::{BaseUrlResolver, LayerUrlTable, StaticBaseUrl};
pub use result::{extract_feature_id, parse_feature_info, FeatureId, FeatureInfoResult};
pub use service::{FeatureInfoConfig, FeatureInfoQuery, FeatureInfoService};
