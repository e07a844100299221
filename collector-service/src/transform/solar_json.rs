use serde::Deserialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use vpp_client::domain::SolarRecord;

use super::coerce::field_or_zero;
use crate::pipeline::PipelineError;

/// Vendor envelope: `{"success": bool, "data": {field: value, ...}}`.
#[derive(Debug, Deserialize)]
struct SolarApiResponse {
    success: bool,
    #[serde(default)]
    data: Option<Map<String, Value>>,
}

/// Parse a vendor payload into one snapshot for `site_id` stamped at `collected_at`.
///
/// Known fields that are absent or not JSON numbers are left at zero.
pub fn parse_solar_payload(
    body: &str,
    site_id: &str,
    collected_at: OffsetDateTime,
) -> Result<SolarRecord, PipelineError> {
    let resp: SolarApiResponse = serde_json::from_str(body)
        .map_err(|e| PipelineError::Decode(format!("invalid solar payload: {e}")))?;

    if !resp.success {
        return Err(PipelineError::ApiLogical(
            "solar api returned success=false".to_string(),
        ));
    }

    let data = resp.data.unwrap_or_default();
    Ok(SolarRecord {
        site_id: site_id.to_string(),
        ts: collected_at,
        daily_generation: field_or_zero(&data, "daily_generation"),
        solar_radiation: field_or_zero(&data, "solar_radiation"),
        ac_avg_voltage: field_or_zero(&data, "ac_avg_voltage"),
        ac_total_power: field_or_zero(&data, "ac_total_power"),
        ac_total_current: field_or_zero(&data, "ac_total_current"),
        dc_avg_voltage: field_or_zero(&data, "dc_avg_voltage"),
        dc_total_power: field_or_zero(&data, "dc_total_power"),
        dc_total_current: field_or_zero(&data, "dc_total_current"),
        module_temperature: field_or_zero(&data, "module_temperature"),
        total_accumulated_generation: field_or_zero(&data, "total_accumulated_generation"),
        co2_reduction: field_or_zero(&data, "co2_reduction"),
    })
}
