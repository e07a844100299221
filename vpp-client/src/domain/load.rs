use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LoadRecord {
    pub site_id: String,
    #[sqlx(rename = "datetime")]
    #[cfg_attr(feature = "serde", serde(rename = "datetime", with = "time::serde::rfc3339"))]
    pub ts: OffsetDateTime,
    pub load_value: f64,
}
