use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::info;

use crate::agents::InsightAgent;
use crate::models::{
    AIInsightsResponse, AppState, Biomarker, BiomarkerQuery, BiomarkersResponse, Patient, PatientResponse,
    PatientsResponse,
};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/patients", get(list_patients))
        .route("/api/patients/{id}", get(get_patient))
        .route("/api/patients/{id}/biomarkers", get(get_patient_biomarkers))
        .route("/api/patients/{id}/ai-insights", post(post_ai_insights))
        .with_state(state)
}

/// Non-numeric ids are treated as unknown rather than rejected.
fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

fn find_patient<'a>(state: &'a AppState, raw_id: &str) -> AppResult<&'a Patient> {
    parse_id(raw_id)
        .and_then(|id| state.dataset.patient(id))
        .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))
}

async fn list_patients(State(state): State<AppState>) -> Json<PatientsResponse> {
    Json(PatientsResponse {
        patients: state.dataset.patients().to_vec(),
    })
}

async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PatientResponse>> {
    let patient = find_patient(&state, &id)?;
    Ok(Json(PatientResponse {
        patient: patient.clone(),
    }))
}

async fn get_patient_biomarkers(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<BiomarkerQuery>,
) -> Json<BiomarkersResponse> {
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    let biomarkers: Vec<Biomarker> = match parse_id(&id) {
        Some(patient_id) => state
            .dataset
            .biomarkers_for(patient_id, category)
            .into_iter()
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    Json(BiomarkersResponse { biomarkers })
}

async fn post_ai_insights(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<AIInsightsResponse>> {
    let patient = find_patient(&state, &id)?;
    let biomarkers = state.dataset.biomarkers_for(patient.id, None);
    if biomarkers.is_empty() {
        return Err(AppError::InvalidRequest(
            "No biomarkers found for this patient".to_string(),
        ));
    }

    info!(patient_id = patient.id, "AI insights requested");
    let agent = InsightAgent::new(state.llm.clone(), &state.config.llm);
    let insights = agent.generate(patient, &biomarkers).await?;

    Ok(Json(AIInsightsResponse { insights }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{get, post_empty, send};
    use crate::testing::{test_state, text_response};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_list_patients() {
        let (state, _) = test_state(vec![]);
        let (status, body) = send(router(state), get("/api/patients")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["patients"].as_array().unwrap().len(), 3);
        assert_eq!(body["patients"][0]["lastVisit"], "2024-01-10");
    }

    #[tokio::test]
    async fn test_get_patient() {
        let (state, _) = test_state(vec![]);
        let (status, body) = send(router(state), get("/api/patients/2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["patient"]["name"], "Bob Johnson");
    }

    #[tokio::test]
    async fn test_get_patient_not_found() {
        let (state, _) = test_state(vec![]);
        let (status, body) = send(router(state.clone()), get("/api/patients/999")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Patient not found");

        let (status, _) = send(router(state), get("/api/patients/abc")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_patient_biomarkers() {
        let (state, _) = test_state(vec![]);

        let (status, body) = send(router(state.clone()), get("/api/patients/1/biomarkers")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["biomarkers"].as_array().unwrap().len(), 3);

        let (_, body) = send(
            router(state.clone()),
            get("/api/patients/1/biomarkers?category=cardiovascular"),
        )
        .await;
        let filtered = body["biomarkers"].as_array().unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0]["category"], "cardiovascular");

        let (status, body) = send(router(state), get("/api/patients/3/biomarkers")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["biomarkers"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ai_insights() {
        let (state, requests) = test_state(vec![Ok(text_response("## Overall assessment"))]);
        let (status, body) = send(router(state), post_empty("/api/patients/1/ai-insights")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["insights"], "## Overall assessment");
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ai_insights_preconditions() {
        let (state, requests) = test_state(vec![]);

        let (status, _) = send(router(state.clone()), post_empty("/api/patients/999/ai-insights")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(router(state), post_empty("/api/patients/3/ai-insights")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No biomarkers found for this patient");

        assert!(requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ai_insights_model_failure() {
        let (state, _) = test_state(vec![Err(AppError::LLMApi("invalid api key".to_string()))]);
        let (status, body) = send(router(state), post_empty("/api/patients/1/ai-insights")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
        assert_eq!(body["message"], crate::agents::insights::INSIGHTS_FAILURE);
    }
}
