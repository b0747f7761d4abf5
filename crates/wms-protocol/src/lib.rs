//! OGC WMS 1.1.1 client-side request building.
//!
//! Supports:
//! - GetFeatureInfo URLs for point and area selections
//! - GetMap tile templates for raster map sources
//! - CQL filter composition for server-side filtering

pub mod filter;
pub mod getfeatureinfo;
pub mod getmap;

use map_common::{MapError, MapResult};
use url::Url;

pub use filter::combine_cql;
pub use getfeatureinfo::{FeatureInfoRequest, INFO_FORMAT};
pub use getmap::GetMapTemplate;

/// WMS protocol version used for every request.
pub const WMS_VERSION: &str = "1.1.1";

/// Append KVP parameters to a base URL, keeping any query it already has.
pub(crate) fn append_params<'a>(
    base_url: &str,
    params: impl IntoIterator<Item = (&'a str, String)>,
) -> MapResult<Url> {
    let mut url = Url::parse(base_url).map_err(|e| MapError::InvalidParameter {
        param: "url".to_string(),
        message: format!("{}: {}", base_url, e),
    })?;

    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, &value);
        }
    }

    Ok(url)
}
