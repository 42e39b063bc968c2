use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{AsRefStr, Display as StrumDisplay, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use super::matricula::Matricula;
use super::role::Role;

/// The four punch kinds, in the only order they may occur within a day.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    ToSchema,
    StrumDisplay,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum PunchType {
    Chegada,
    Almoco,
    TerminoAlmoco,
    Saida,
}

impl PunchType {
    pub const CANONICAL_ORDER: [PunchType; 4] = [
        PunchType::Chegada,
        PunchType::Almoco,
        PunchType::TerminoAlmoco,
        PunchType::Saida,
    ];

    /// Position within [`PunchType::CANONICAL_ORDER`].
    pub fn index(self) -> usize {
        match self {
            PunchType::Chegada => 0,
            PunchType::Almoco => 1,
            PunchType::TerminoAlmoco => 2,
            PunchType::Saida => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PunchType::Chegada => "Chegada",
            PunchType::Almoco => "Almoço",
            PunchType::TerminoAlmoco => "Término Almoço",
            PunchType::Saida => "Saída",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PunchId(String);

impl PunchId {
    pub fn generate() -> Self {
        PunchId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PunchId {
    fn from(value: String) -> Self {
        PunchId(value)
    }
}

impl From<&str> for PunchId {
    fn from(value: &str) -> Self {
        PunchId(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoLocation {
    #[schema(example = json!(-23.55052))]
    pub latitude: f64,
    #[schema(example = json!(-46.633308))]
    pub longitude: f64,
    /// Radius in meters, as reported by the device.
    #[schema(example = 12.5)]
    pub accuracy: Option<f64>,
}

/// Who last corrected a punch, and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AmendmentStamp {
    #[schema(value_type = String)]
    pub amender_id: Matricula,
    pub amender_name: String,
    pub amender_role: Role,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[schema(value_type = i64)]
    pub amended_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": "5b0c1f7e-94a4-4c53-8d3e-1f0b8e2c9a11",
        "employee": "04821-37",
        "day": "2026-10-19",
        "punch_type": "CHEGADA",
        "timestamp": 1792404000000i64,
        "location": { "latitude": -23.55052, "longitude": -46.633308, "accuracy": 12.5 },
        "amendment": null
    })
)]
pub struct PunchRecord {
    #[schema(value_type = String)]
    pub id: PunchId,

    #[schema(value_type = String)]
    pub employee: Matricula,

    /// Local calendar day the punch belongs to. Never changes after creation.
    #[schema(value_type = String, format = "date")]
    pub day: NaiveDate,

    pub punch_type: PunchType,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[schema(value_type = i64)]
    pub timestamp: DateTime<Utc>,

    #[schema(nullable = true)]
    pub location: Option<GeoLocation>,

    #[schema(nullable = true)]
    pub amendment: Option<AmendmentStamp>,
}

impl PunchRecord {
    /// Day-grouping key, `{matricula}_{YYYY-MM-DD}`.
    pub fn day_key(&self) -> DayKey {
        DayKey::new(self.employee.clone(), self.day)
    }
}

/// (employee, local day) pair that groups a day's punches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DayKey {
    pub employee: Matricula,
    pub day: NaiveDate,
}

impl DayKey {
    pub fn new(employee: Matricula, day: NaiveDate) -> Self {
        DayKey { employee, day }
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.employee, self.day.format("%Y-%m-%d"))
    }
}

/// Everything the ledger needs to append a punch.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPunch {
    pub employee: Matricula,
    pub day: NaiveDate,
    pub punch_type: PunchType,
    pub timestamp: DateTime<Utc>,
    pub location: Option<GeoLocation>,
}

/// Correction written over an existing punch.
#[derive(Debug, Clone, PartialEq)]
pub struct PunchAmendment {
    pub punch_type: PunchType,
    pub timestamp: DateTime<Utc>,
    pub stamp: AmendmentStamp,
}

/// Orders by time, breaking ties by canonical position.
pub fn sort_punches(punches: &mut [PunchRecord]) {
    punches.sort_by_key(|p| (p.timestamp, p.punch_type.index()));
}
