//! Read-only patient/biomarker snapshot loaded once at startup.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::models::{Biomarker, Patient};

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    patients: Vec<Patient>,
    biomarkers: Vec<Biomarker>,
}

impl Dataset {
    pub fn new(patients: Vec<Patient>, biomarkers: Vec<Biomarker>) -> Self {
        Self { patients, biomarkers }
    }

    /// Loads both seed collections from JSON array files.
    pub fn load(patients_path: &Path, biomarkers_path: &Path) -> Result<Self> {
        let patients: Vec<Patient> = read_json(patients_path)?;
        let biomarkers: Vec<Biomarker> = read_json(biomarkers_path)?;

        let dataset = Self::new(patients, biomarkers);
        let dangling = dataset
            .biomarkers
            .iter()
            .filter(|b| dataset.patient(b.patient_id).is_none())
            .count();
        if dangling > 0 {
            warn!(dangling, "Biomarkers reference patients missing from the dataset");
        }

        info!(
            patients = dataset.patients.len(),
            biomarkers = dataset.biomarkers.len(),
            "Dataset loaded"
        );
        Ok(dataset)
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn biomarkers(&self) -> &[Biomarker] {
        &self.biomarkers
    }

    pub fn patient(&self, id: i64) -> Option<&Patient> {
        self.patients.iter().find(|p| p.id == id)
    }

    /// Biomarkers of one patient, optionally restricted to an exact category.
    pub fn biomarkers_for(&self, patient_id: i64, category: Option<&str>) -> Vec<&Biomarker> {
        self.biomarkers
            .iter()
            .filter(|b| b.patient_id == patient_id)
            .filter(|b| category.map_or(true, |c| b.category == c))
            .collect()
    }

    /// Case-insensitive substring match on the display name.
    pub fn search_patients(&self, query: &str) -> Vec<&Patient> {
        let query = query.to_lowercase();
        self.patients
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&query))
            .collect()
    }
}

/// Groups biomarkers by category, keeping categories in first-seen order.
pub fn group_by_category<'a, I>(biomarkers: I) -> Vec<(&'a str, Vec<&'a Biomarker>)>
where
    I: IntoIterator<Item = &'a Biomarker>,
{
    let mut groups: Vec<(&'a str, Vec<&'a Biomarker>)> = Vec::new();
    for biomarker in biomarkers {
        match groups.iter_mut().find(|(category, _)| *category == biomarker.category) {
            Some((_, members)) => members.push(biomarker),
            None => groups.push((biomarker.category.as_str(), vec![biomarker])),
        }
    }
    groups
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}
