//! Fixtures shared by unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::config::Config;
use crate::dataset::Dataset;
use crate::llm::{LLMAdapter, LLM};
use crate::models::{
    AppState, Biomarker, BiomarkerId, BiomarkerStatus, Patient, ReferenceRange,
};
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse, ToolCall, TokenUsage};

pub fn patient(id: i64, name: &str, dob: (i32, u32, u32)) -> Patient {
    Patient {
        id,
        name: name.to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(dob.0, dob.1, dob.2).unwrap(),
        last_visit: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
    }
}

pub fn biomarker(
    id: i64,
    patient_id: i64,
    name: &str,
    category: &str,
    value: f64,
    status: BiomarkerStatus,
) -> Biomarker {
    Biomarker {
        id: BiomarkerId::Number(id),
        patient_id,
        name: name.to_string(),
        value,
        unit: "mg/dL".to_string(),
        category: category.to_string(),
        reference_range: ReferenceRange { min: 70.0, max: 100.0 },
        measured_at: "2024-01-10T09:00:00Z".to_string(),
        status,
    }
}

/// Three patients; patient 3 has no biomarkers and one biomarker dangles.
pub fn sample_dataset() -> Dataset {
    Dataset::new(
        vec![
            patient(1, "Alice Smith", (1980, 5, 15)),
            patient(2, "Bob Johnson", (1975, 11, 2)),
            patient(3, "Carol Davis", (1992, 3, 30)),
        ],
        vec![
            biomarker(1, 1, "Glucose", "metabolic", 130.0, BiomarkerStatus::High),
            biomarker(2, 1, "HbA1c", "metabolic", 5.4, BiomarkerStatus::Normal),
            biomarker(3, 1, "HDL Cholesterol", "cardiovascular", 35.0, BiomarkerStatus::Low),
            biomarker(4, 2, "Testosterone", "hormonal", 550.0, BiomarkerStatus::Normal),
            biomarker(5, 99, "Cortisol", "hormonal", 12.0, BiomarkerStatus::Normal),
        ],
    )
}

pub fn text_response(content: &str) -> LLMResponse {
    LLMResponse {
        content: content.to_string(),
        tool_calls: Vec::new(),
        finish_reason: "stop".to_string(),
        usage: TokenUsage::default(),
    }
}

pub fn tool_call_response(content: &str, calls: Vec<ToolCall>) -> LLMResponse {
    LLMResponse {
        content: content.to_string(),
        tool_calls: calls,
        finish_reason: "tool_calls".to_string(),
        usage: TokenUsage::default(),
    }
}

/// Plays back canned responses in order and records every request.
pub struct ScriptedAdapter {
    responses: Mutex<VecDeque<AppResult<LLMResponse>>>,
    requests: Arc<Mutex<Vec<LLMRequest>>>,
}

impl ScriptedAdapter {
    pub fn new(responses: Vec<AppResult<LLMResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Arc::default(),
        }
    }

    /// Handle onto the recorded requests that outlives the adapter's move into `LLM`.
    pub fn requests(&self) -> Arc<Mutex<Vec<LLMRequest>>> {
        self.requests.clone()
    }
}

#[async_trait]
impl LLMAdapter for ScriptedAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::LLMApi("script exhausted".to_string())))
    }
}

pub fn scripted_llm(
    responses: Vec<AppResult<LLMResponse>>,
) -> (Arc<LLM>, Arc<Mutex<Vec<LLMRequest>>>) {
    let adapter = ScriptedAdapter::new(responses);
    let requests = adapter.requests();
    (Arc::new(LLM::from_adapter(Box::new(adapter))), requests)
}

pub fn test_config() -> Config {
    Config::from_lookup(|_| None).unwrap()
}

pub fn test_state(responses: Vec<AppResult<LLMResponse>>) -> (AppState, Arc<Mutex<Vec<LLMRequest>>>) {
    let (llm, requests) = scripted_llm(responses);
    let state = AppState {
        config: test_config(),
        dataset: Arc::new(sample_dataset()),
        llm,
    };
    (state, requests)
}
