//! Read-only data tools the assistant model may call.
//!
//! The set is fixed: each [`ToolName`] maps to one query over the
//! [`Dataset`](crate::dataset::Dataset) snapshot, executed by
//! [`ToolExecutor`].

pub mod executor;

pub use executor::ToolExecutor;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::BIOMARKER_CATEGORIES;
use crate::types::ToolDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    GetAllPatients,
    GetPatient,
    GetPatientBiomarkers,
    SearchPatients,
    AnalyzeBiomarkerTrends,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::GetAllPatients,
        ToolName::GetPatient,
        ToolName::GetPatientBiomarkers,
        ToolName::SearchPatients,
        ToolName::AnalyzeBiomarkerTrends,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::GetAllPatients => "get_all_patients",
            ToolName::GetPatient => "get_patient",
            ToolName::GetPatientBiomarkers => "get_patient_biomarkers",
            ToolName::SearchPatients => "search_patients",
            ToolName::AnalyzeBiomarkerTrends => "analyze_biomarker_trends",
        }
    }

    /// Declaration advertised to the model.
    pub fn definition(&self) -> ToolDefinition {
        let patient_id = json!({
            "type": "number",
            "description": "The unique identifier of the patient",
        });

        let (description, parameters) = match self {
            ToolName::GetAllPatients => (
                "Retrieve a list of all patients with their basic information (id, name, date of birth, last visit)",
                json!({
                    "type": "object",
                    "properties": {},
                }),
            ),
            ToolName::GetPatient => (
                "Get detailed information about a specific patient by their ID",
                json!({
                    "type": "object",
                    "properties": { "patient_id": patient_id },
                    "required": ["patient_id"],
                }),
            ),
            ToolName::GetPatientBiomarkers => (
                "Retrieve all biomarker measurements for a specific patient. Optionally filter by category (metabolic, cardiovascular, hormonal)",
                json!({
                    "type": "object",
                    "properties": {
                        "patient_id": patient_id,
                        "category": {
                            "type": "string",
                            "description": "Optional: Filter by biomarker category (metabolic, cardiovascular, hormonal)",
                            "enum": BIOMARKER_CATEGORIES,
                        },
                    },
                    "required": ["patient_id"],
                }),
            ),
            ToolName::SearchPatients => (
                "Search for patients by name (case-insensitive partial match)",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Search query to match against patient names",
                        },
                    },
                    "required": ["query"],
                }),
            ),
            ToolName::AnalyzeBiomarkerTrends => (
                "Analyze biomarker trends and identify abnormal values for a patient",
                json!({
                    "type": "object",
                    "properties": { "patient_id": patient_id },
                    "required": ["patient_id"],
                }),
            ),
        };

        ToolDefinition {
            name: self.as_str().to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All tool declarations, in registration order.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    ToolName::ALL.iter().map(ToolName::definition).collect()
}

/// Outcome of one tool execution. Errors are data, not failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// Faults raised while running a tool; folded into an error [`ToolResult`].
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("arguments must be a JSON object")]
    ArgumentsNotObject,

    #[error("missing required argument '{0}'")]
    MissingArgument(&'static str),

    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("failed to serialize result: {0}")]
    Serialization(#[from] serde_json::Error),
}
