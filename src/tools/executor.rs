use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use super::{ToolError, ToolName, ToolResult};
use crate::dataset::{group_by_category, Dataset};
use crate::models::{Biomarker, BiomarkerStatus, Patient};

/// Dispatches tool calls to queries over the shared dataset snapshot.
#[derive(Clone)]
pub struct ToolExecutor {
    dataset: Arc<Dataset>,
}

#[derive(Serialize)]
struct BiomarkerTrendAnalysis<'a> {
    patient: &'a Patient,
    total_biomarkers: usize,
    abnormal_count: usize,
    abnormal_biomarkers: Vec<&'a Biomarker>,
    by_category: CategoryGroups<'a>,
    summary: StatusSummary,
}

#[derive(Serialize, Default)]
struct StatusSummary {
    normal: usize,
    high: usize,
    low: usize,
}

/// Serializes as a JSON object whose keys keep first-seen category order.
struct CategoryGroups<'a>(Vec<(&'a str, Vec<&'a Biomarker>)>);

impl Serialize for CategoryGroups<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (category, biomarkers) in &self.0 {
            map.serialize_entry(category, biomarkers)?;
        }
        map.end()
    }
}

impl ToolExecutor {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }

    /// Runs one tool. Never fails: every fault becomes an error result.
    pub fn execute(&self, name: &str, args: &Value) -> ToolResult {
        let Some(tool) = ToolName::from_name(name) else {
            return ToolResult::error(format!("Unknown tool: {}", name));
        };

        debug!(tool = %tool, "Executing tool");
        match self.dispatch(tool, args) {
            Ok(result) => result,
            Err(e) => ToolResult::error(format!("Error executing tool {}: {}", name, e)),
        }
    }

    fn dispatch(&self, tool: ToolName, args: &Value) -> Result<ToolResult, ToolError> {
        let empty = Map::new();
        let args = match args {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => return Err(ToolError::ArgumentsNotObject),
        };

        match tool {
            ToolName::GetAllPatients => self.get_all_patients(),
            ToolName::GetPatient => self.get_patient(patient_id_arg(args)?),
            ToolName::GetPatientBiomarkers => {
                let patient_id = patient_id_arg(args)?;
                // An empty category means no filter.
                let category = optional_string_arg(args, "category")?.filter(|c| !c.is_empty());
                self.get_patient_biomarkers(patient_id, category)
            }
            ToolName::SearchPatients => {
                self.search_patients(optional_string_arg(args, "query")?.unwrap_or_default())
            }
            ToolName::AnalyzeBiomarkerTrends => {
                self.analyze_biomarker_trends(patient_id_arg(args)?)
            }
        }
    }

    fn get_all_patients(&self) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::success(serde_json::to_string_pretty(
            self.dataset.patients(),
        )?))
    }

    fn get_patient(&self, patient_id: i64) -> Result<ToolResult, ToolError> {
        match self.dataset.patient(patient_id) {
            Some(patient) => Ok(ToolResult::success(serde_json::to_string_pretty(patient)?)),
            None => Ok(patient_not_found(patient_id)),
        }
    }

    fn get_patient_biomarkers(
        &self,
        patient_id: i64,
        category: Option<&str>,
    ) -> Result<ToolResult, ToolError> {
        let biomarkers = self.dataset.biomarkers_for(patient_id, category);

        if biomarkers.is_empty() {
            let scope = category
                .map(|c| format!(" in category {}", c))
                .unwrap_or_default();
            return Ok(ToolResult::success(format!(
                "No biomarkers found for patient {}{}",
                patient_id, scope
            )));
        }

        Ok(ToolResult::success(serde_json::to_string_pretty(&biomarkers)?))
    }

    fn search_patients(&self, query: &str) -> Result<ToolResult, ToolError> {
        let results = self.dataset.search_patients(query);
        Ok(ToolResult::success(serde_json::to_string_pretty(&results)?))
    }

    fn analyze_biomarker_trends(&self, patient_id: i64) -> Result<ToolResult, ToolError> {
        let Some(patient) = self.dataset.patient(patient_id) else {
            return Ok(patient_not_found(patient_id));
        };

        let biomarkers = self.dataset.biomarkers_for(patient_id, None);
        if biomarkers.is_empty() {
            return Ok(ToolResult::success(format!(
                "No biomarkers found for patient {}",
                patient_id
            )));
        }

        let mut summary = StatusSummary::default();
        for biomarker in &biomarkers {
            match biomarker.status {
                BiomarkerStatus::Normal => summary.normal += 1,
                BiomarkerStatus::High => summary.high += 1,
                BiomarkerStatus::Low => summary.low += 1,
            }
        }

        let abnormal_biomarkers: Vec<&Biomarker> = biomarkers
            .iter()
            .copied()
            .filter(|b| !b.status.is_normal())
            .collect();

        let analysis = BiomarkerTrendAnalysis {
            patient,
            total_biomarkers: biomarkers.len(),
            abnormal_count: abnormal_biomarkers.len(),
            abnormal_biomarkers,
            by_category: CategoryGroups(group_by_category(biomarkers.iter().copied())),
            summary,
        };

        Ok(ToolResult::success(serde_json::to_string_pretty(&analysis)?))
    }
}

fn patient_not_found(patient_id: i64) -> ToolResult {
    ToolResult::error(format!("Error: Patient with ID {} not found", patient_id))
}

/// Accepts integers, integral floats and numeric strings.
fn patient_id_arg(args: &Map<String, Value>) -> Result<i64, ToolError> {
    const NAME: &str = "patient_id";
    let invalid = |reason: String| ToolError::InvalidArgument { name: NAME, reason };

    match args.get(NAME) {
        None | Some(Value::Null) => Err(ToolError::MissingArgument(NAME)),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
            .ok_or_else(|| invalid(format!("expected an integer, got {}", n))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(format!("expected an integer, got \"{}\"", s))),
        Some(other) => Err(invalid(format!("expected an integer, got {}", other))),
    }
}

fn optional_string_arg<'a>(
    args: &'a Map<String, Value>,
    name: &'static str,
) -> Result<Option<&'a str>, ToolError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ToolError::InvalidArgument {
            name,
            reason: format!("expected a string, got {}", other),
        }),
    }
}
