pub mod coerce;
pub mod reserve_html;
pub mod solar_json;

pub use reserve_html::parse_reserve_html;
pub use solar_json::parse_solar_payload;

use std::collections::HashSet;

use crate::pipeline::{Envelope, PipelineError, Transform};
use time::macros::datetime;
use vpp_client::domain::LoadRecord;

/// Pure validation of an uploaded `LoadRecord`.
///
/// Rules:
/// - site_id must be one of the configured sites.
/// - load_value must be finite.
/// - ts must be within a broad sanity window [2000-01-01, 2100-01-01).
pub fn validate_load(
    env: Envelope<LoadRecord>,
    sites: &HashSet<String>,
) -> Result<Envelope<LoadRecord>, PipelineError> {
    let l = &env.payload;

    if !sites.contains(&l.site_id) {
        return Err(PipelineError::Transform(format!("unknown site '{}'", l.site_id)));
    }

    if !l.load_value.is_finite() {
        return Err(PipelineError::Transform("load_value must be finite".to_string()));
    }

    let min_ts = datetime!(2000-01-01 00:00:00 UTC);
    let max_ts = datetime!(2100-01-01 00:00:00 UTC);

    if l.ts < min_ts || l.ts >= max_ts {
        return Err(PipelineError::Transform("timestamp out of allowed range".to_string()));
    }

    Ok(env)
}

#[derive(Clone, Default)]
pub struct LoadValidation {
    sites: HashSet<String>,
}

impl LoadValidation {
    pub fn new<I, S>(sites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sites: sites.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait::async_trait]
impl Transform<LoadRecord, LoadRecord> for LoadValidation {
    async fn apply(&self, input: Envelope<LoadRecord>) -> Result<Envelope<LoadRecord>, PipelineError> {
        match validate_load(input, &self.sites) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("upload_rejected_total").increment(1);
                Err(e)
            }
        }
    }
}
