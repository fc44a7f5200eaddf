//! Insight Agent
//!
//! Single model call that turns one patient's biomarker panel into a short
//! clinical summary for `/api/patients/{id}/ai-insights`.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use tracing::{error, info};

use crate::config::LLMConfig;
use crate::dataset::group_by_category;
use crate::llm::provider::LLM;
use crate::models::{Biomarker, Patient};
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest};

pub const INSIGHTS_FALLBACK: &str = "No insights generated";

pub const INSIGHTS_FAILURE: &str =
    "Failed to generate AI insights. Please check your API key and try again.";

const SYSTEM_INSTRUCTION: &str = "You are a medical AI assistant analyzing patient biomarker data.
Provide clear, actionable insights based on the biomarker results.
Be professional and informative. Include:
1. Overall health assessment
2. Areas of concern (if any)
3. Recommendations
4. Suggested follow-ups

Keep responses concise (300-400 words). Use markdown formatting for better readability.
Add a medical disclaimer at the end.";

pub struct InsightAgent {
    llm: Arc<LLM>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl InsightAgent {
    pub fn new(llm: Arc<LLM>, config: &LLMConfig) -> Self {
        Self {
            llm,
            model: config.model.clone(),
            max_tokens: config.insights_max_tokens,
            temperature: config.temperature,
        }
    }

    /// Callers must reject empty biomarker lists before calling.
    pub async fn generate(&self, patient: &Patient, biomarkers: &[&Biomarker]) -> AppResult<String> {
        info!(patient_id = patient.id, biomarkers = biomarkers.len(), "Generating insights");

        let prompt = Self::build_prompt(patient, biomarkers, Utc::now().date_naive());
        let request = LLMRequest {
            model: self.model.clone(),
            messages: vec![LLMMessage::user(prompt)],
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            system_instruction: Some(SYSTEM_INSTRUCTION.to_string()),
            tools: Vec::new(),
            tool_choice: None,
        };

        let response = self.llm.create_chat_completion(&request).await.map_err(|e| {
            error!(error = %e, patient_id = patient.id, "Insight generation failed");
            AppError::Generation(INSIGHTS_FAILURE.to_string())
        })?;

        if response.content.is_empty() {
            return Ok(INSIGHTS_FALLBACK.to_string());
        }
        Ok(response.content)
    }

    pub fn build_prompt(patient: &Patient, biomarkers: &[&Biomarker], today: NaiveDate) -> String {
        // Calendar-year difference only.
        let age = today.year() - patient.date_of_birth.year();

        let mut summary = String::new();
        for (category, members) in group_by_category(biomarkers.iter().copied()) {
            summary.push_str(&format!("\n**{} Biomarkers:**\n", capitalize(category)));
            for b in members {
                summary.push_str(&format!(
                    "  {} {}: {} {} (Normal: {}-{}) - {}\n",
                    b.status.glyph(),
                    b.name,
                    b.value,
                    b.unit,
                    b.reference_range.min,
                    b.reference_range.max,
                    b.status.as_str().to_uppercase()
                ));
            }
        }

        format!(
            "Analyze the following patient biomarker results:\n\n\
             **Patient Information:**\n\
             - Age: {age} years\n\n\
             **Biomarker Results:**\n\
             {summary}\n\n\
             Please provide a comprehensive health analysis based on these results."
        )
        .trim()
        .to_string()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
