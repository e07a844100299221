use time::OffsetDateTime;

/// One inverter snapshot for a site. Natural key is `(site_id, datetime)`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SolarRecord {
    pub site_id: String,
    #[sqlx(rename = "datetime")]
    #[cfg_attr(feature = "serde", serde(rename = "datetime", with = "time::serde::rfc3339"))]
    pub ts: OffsetDateTime,
    pub daily_generation: f64,
    pub solar_radiation: f64,
    pub ac_avg_voltage: f64,
    pub ac_total_power: f64,
    pub ac_total_current: f64,
    pub dc_avg_voltage: f64,
    pub dc_total_power: f64,
    pub dc_total_current: f64,
    pub module_temperature: f64,
    pub total_accumulated_generation: f64,
    pub co2_reduction: f64,
}

impl SolarRecord {
    /// A record with every measurement at zero.
    pub fn zeroed(site_id: impl Into<String>, ts: OffsetDateTime) -> Self {
        Self {
            site_id: site_id.into(),
            ts,
            daily_generation: 0.0,
            solar_radiation: 0.0,
            ac_avg_voltage: 0.0,
            ac_total_power: 0.0,
            ac_total_current: 0.0,
            dc_avg_voltage: 0.0,
            dc_total_power: 0.0,
            dc_total_current: 0.0,
            module_temperature: 0.0,
            total_accumulated_generation: 0.0,
            co2_reduction: 0.0,
        }
    }
}
