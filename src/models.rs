use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::dataset::Dataset;
use crate::llm::LLM;
use crate::types::{LLMMessage, Role};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub dataset: Arc<Dataset>,
    pub llm: Arc<LLM>,
}

// Seed records. Field names follow the JSON the frontend consumes.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: i64,
    pub name: String,
    #[serde(with = "calendar_date")]
    pub date_of_birth: NaiveDate,
    #[serde(with = "calendar_date")]
    pub last_visit: NaiveDate,
}

/// Biomarker ids are numeric in most seed files but strings are tolerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BiomarkerId {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiomarkerStatus {
    Normal,
    High,
    Low,
}

impl BiomarkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BiomarkerStatus::Normal => "normal",
            BiomarkerStatus::High => "high",
            BiomarkerStatus::Low => "low",
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            BiomarkerStatus::Normal => "✓",
            BiomarkerStatus::High => "↑",
            BiomarkerStatus::Low => "↓",
        }
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, BiomarkerStatus::Normal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    #[serde(serialize_with = "measurement::serialize")]
    pub min: f64,
    #[serde(serialize_with = "measurement::serialize")]
    pub max: f64,
}

/// Canonical category names. The `category` field itself stays an open string.
pub const BIOMARKER_CATEGORIES: [&str; 3] = ["metabolic", "cardiovascular", "hormonal"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Biomarker {
    pub id: BiomarkerId,
    pub patient_id: i64,
    pub name: String,
    #[serde(serialize_with = "measurement::serialize")]
    pub value: f64,
    pub unit: String,
    pub category: String,
    pub reference_range: ReferenceRange,
    pub measured_at: String,
    /// Stored classification; never recomputed from `value`.
    pub status: BiomarkerStatus,
}

// API Request/Response types

#[derive(Debug, Serialize, Deserialize)]
pub struct PatientsResponse {
    pub patients: Vec<Patient>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PatientResponse {
    pub patient: Patient,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BiomarkersResponse {
    pub biomarkers: Vec<Biomarker>,
}

#[derive(Debug, Deserialize)]
pub struct BiomarkerQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AIInsightsResponse {
    pub insights: String,
}

/// Transcript entry sent by the frontend chat widget.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl From<ChatMessage> for LLMMessage {
    fn from(message: ChatMessage) -> Self {
        let role = match message.role {
            ChatRole::System => Role::System,
            ChatRole::User => Role::User,
            ChatRole::Assistant => Role::Assistant,
        };
        LLMMessage::new(role, message.content)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp, always writes `YYYY-MM-DD`.
mod calendar_date {
    use chrono::{DateTime, NaiveDate};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid calendar date: {raw}")))
    }

    pub(super) fn parse(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        NaiveDate::parse_from_str(raw, FORMAT)
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
    }
}

/// Whole numbers are written without a fractional part (`130`, not `130.0`).
mod measurement {
    use serde::Serializer;

    // Largest magnitude at which every integer is exactly representable.
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_EXACT {
            serializer.serialize_i64(*value as i64)
        } else {
            serializer.serialize_f64(*value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_accepts_both_date_forms() {
        let patient: Patient = serde_json::from_str(
            r#"{"id": 1, "name": "Alice Smith", "dateOfBirth": "1980-05-15T00:00:00.000Z", "lastVisit": "2024-01-10"}"#,
        )
        .unwrap();
        assert_eq!(patient.date_of_birth, NaiveDate::from_ymd_opt(1980, 5, 15).unwrap());

        let json = serde_json::to_value(&patient).unwrap();
        assert_eq!(json["dateOfBirth"], "1980-05-15");
        assert_eq!(json["lastVisit"], "2024-01-10");
    }

    #[test]
    fn test_biomarker_tolerates_string_id_and_unknown_category() {
        let biomarker: Biomarker = serde_json::from_str(
            r#"{
                "id": "bm-7", "patientId": 2, "name": "Vitamin D", "value": 18.5,
                "unit": "ng/mL", "category": "nutritional",
                "referenceRange": {"min": 30, "max": 100},
                "measuredAt": "2024-01-10T09:00:00Z", "status": "low"
            }"#,
        )
        .unwrap();
        assert_eq!(biomarker.id, BiomarkerId::Text("bm-7".into()));
        assert_eq!(biomarker.category, "nutritional");
        assert_eq!(biomarker.status, BiomarkerStatus::Low);
    }

    #[test]
    fn test_whole_measurements_serialize_without_fraction() {
        let biomarker: Biomarker = serde_json::from_str(
            r#"{
                "id": 1, "patientId": 1, "name": "Glucose", "value": 130,
                "unit": "mg/dL", "category": "metabolic",
                "referenceRange": {"min": 70, "max": 99.5},
                "measuredAt": "2024-01-10T09:00:00Z", "status": "high"
            }"#,
        )
        .unwrap();

        let text = serde_json::to_string(&biomarker).unwrap();
        assert!(text.contains(r#""value":130,"#), "{text}");
        assert!(text.contains(r#""referenceRange":{"min":70,"max":99.5}"#), "{text}");

        let fractional = Biomarker { value: 5.4, ..biomarker };
        let json = serde_json::to_value(&fractional).unwrap();
        assert_eq!(json["value"], 5.4);
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        assert!(calendar_date::parse("15/05/1980").is_none());
    }
}
