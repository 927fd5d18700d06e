//! Typed artifacts the adapters exchange through step payloads
//!
//! The engine core treats payloads as opaque JSON; these types exist at the
//! adapter boundary, where outputs are parsed for validation and re-shaped
//! for downstream steps.

use serde::{Deserialize, Serialize};

/// Patient demographics and coverage identifiers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mrn: Option<String>,
}

impl PatientRecord {
    /// Required fields for downstream coding and eligibility work
    pub const REQUIRED_FIELDS: [&'static str; 6] = [
        "name",
        "date_of_birth",
        "gender",
        "insurance_provider",
        "policy_number",
        "mrn",
    ];

    /// Fraction of required fields that are populated
    pub fn field_coverage(&self) -> f64 {
        let present = [
            self.name.is_some(),
            self.date_of_birth.is_some(),
            self.gender.is_some(),
            self.insurance_provider.is_some(),
            self.policy_number.is_some(),
            self.mrn.is_some(),
        ]
        .iter()
        .filter(|p| **p)
        .count();

        present as f64 / Self::REQUIRED_FIELDS.len() as f64
    }
}

/// Encounter details
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncounterRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chief_complaint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// One suggested medical code with its rationale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalCode {
    pub code: String,
    pub description: String,
    pub confidence: f64,
    pub rationale: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,
}

/// The full set of codes suggested for an encounter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeSet {
    #[serde(default)]
    pub icd10_codes: Vec<MedicalCode>,

    #[serde(default)]
    pub cpt_codes: Vec<MedicalCode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_confidence: Option<f64>,
}

impl CodeSet {
    pub fn is_empty(&self) -> bool {
        self.icd10_codes.is_empty() && self.cpt_codes.is_empty()
    }

    pub fn all_codes(&self) -> impl Iterator<Item = &MedicalCode> {
        self.icd10_codes.iter().chain(self.cpt_codes.iter())
    }

    /// Mean per-code confidence, or None when no codes were suggested
    pub fn mean_confidence(&self) -> Option<f64> {
        let mut count = 0usize;
        let mut sum = 0.0;
        for code in self.all_codes() {
            count += 1;
            sum += code.confidence;
        }
        (count > 0).then(|| sum / count as f64)
    }
}

/// An assembled claim ready for submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub claim_number: String,
    pub payer_id: String,
    pub total_amount: f64,
    pub patient_responsibility: f64,
    pub diagnosis_codes: Vec<serde_json::Value>,
    pub procedure_codes: Vec<serde_json::Value>,
    pub status: String,
}

/// Root-cause analysis of a denial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenialAnalysis {
    pub root_cause: String,
    pub recommended_action: String,

    /// Estimated chance an appeal succeeds, in [0, 1]
    pub appeal_viability: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// A drafted appeal letter with required supporting documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppealDraft {
    pub letter: String,

    #[serde(default)]
    pub attachments: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_coverage() {
        let empty = PatientRecord::default();
        assert_eq!(empty.field_coverage(), 0.0);

        let partial = PatientRecord {
            name: Some("John Doe".to_string()),
            date_of_birth: Some("1980-01-01".to_string()),
            gender: Some("male".to_string()),
            ..Default::default()
        };
        assert!((partial.field_coverage() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_code_set_mean_confidence() {
        let set = CodeSet {
            icd10_codes: vec![MedicalCode {
                code: "R07.4".to_string(),
                description: "Chest pain, unspecified".to_string(),
                confidence: 0.9,
                rationale: "chief complaint".to_string(),
                modifier: None,
            }],
            cpt_codes: vec![MedicalCode {
                code: "99213".to_string(),
                description: "Office visit, established".to_string(),
                confidence: 0.7,
                rationale: "outpatient encounter".to_string(),
                modifier: None,
            }],
            overall_confidence: None,
        };

        assert!((set.mean_confidence().unwrap() - 0.8).abs() < 1e-9);
        assert!(CodeSet::default().mean_confidence().is_none());
        assert!(CodeSet::default().is_empty());
    }

    #[test]
    fn test_partial_deserialization() {
        let set: CodeSet = serde_json::from_str(r#"{"icd10_codes": []}"#).unwrap();
        assert!(set.cpt_codes.is_empty());
        assert!(set.overall_confidence.is_none());
    }
}
