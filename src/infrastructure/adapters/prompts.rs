//! Prompt templates for the reasoning-backed adapters
//!
//! Each function renders the system instruction for one step. All prompts
//! demand a JSON-only answer; `retry_suffix` is appended on re-attempts to
//! tighten the instruction after a malformed or low-confidence completion.

/// Stricter instruction appended when a step is re-invoked
pub fn retry_suffix(attempt: u32) -> String {
    if attempt <= 1 {
        return String::new();
    }
    format!(
        "\n\nThis is attempt {attempt}. Your previous answer could not be used. \
         Return ONLY a single valid JSON object, no prose, no code fences."
    )
}

pub fn parse_input(attempt: u32) -> String {
    format!(
        "You segment unstructured clinical intake text for a revenue cycle \
         management system serving GCC healthcare providers.\n\
         Split the text into its constituent parts without interpreting them.\n\n\
         Return ONLY a JSON object:\n\
         {{\n\
           \"segments\": {{\n\
             \"demographics\": \"patient identity and coverage fragments\",\n\
             \"complaint\": \"chief complaint / reason for visit\",\n\
             \"clinical_notes\": \"examination findings, assessment, plan\"\n\
           }},\n\
           \"confidence\": 0.0\n\
         }}{}",
        retry_suffix(attempt)
    )
}

pub fn extract_patient_info(attempt: u32) -> String {
    format!(
        "You extract structured patient and encounter data from segmented \
         clinical text. Common regional insurers: ADNIC, DAMAN, THIQA, Bupa \
         Arabia. Do not invent values for fields the text does not mention; \
         use null instead.\n\n\
         Return ONLY a JSON object:\n\
         {{\n\
           \"patient\": {{\"name\": null, \"date_of_birth\": null, \"gender\": null, \
         \"insurance_provider\": null, \"policy_number\": null, \"mrn\": null}},\n\
           \"encounter\": {{\"encounter_type\": null, \"service_date\": null, \
         \"chief_complaint\": null, \"provider_name\": null, \"location\": null}},\n\
           \"confidence\": 0.0\n\
         }}{}",
        retry_suffix(attempt)
    )
}

pub fn suggest_codes(attempt: u32) -> String {
    format!(
        "You are a medical coding specialist for ICD-10 and CPT coding in GCC \
         healthcare. Suggest codes supported by the documented clinical data; \
         give each code a confidence and a one-line rationale. Flag prior-auth \
         sensitive procedures in the rationale.\n\n\
         Return ONLY a JSON object:\n\
         {{\n\
           \"icd10_codes\": [{{\"code\": \"\", \"description\": \"\", \
         \"confidence\": 0.0, \"rationale\": \"\"}}],\n\
           \"cpt_codes\": [{{\"code\": \"\", \"description\": \"\", \
         \"confidence\": 0.0, \"rationale\": \"\", \"modifier\": null}}],\n\
           \"overall_confidence\": 0.0\n\
         }}{}",
        retry_suffix(attempt)
    )
}

pub fn analyze_denial(attempt: u32) -> String {
    format!(
        "You analyze insurance claim denials for a revenue cycle team. Given \
         the denial code, payer reason, and claim context, identify the root \
         cause and the concrete next action, and estimate how viable an \
         appeal would be.\n\n\
         Return ONLY a JSON object:\n\
         {{\n\
           \"root_cause\": \"\",\n\
           \"recommended_action\": \"\",\n\
           \"appeal_viability\": 0.0,\n\
           \"confidence\": 0.0\n\
         }}{}",
        retry_suffix(attempt)
    )
}

pub fn draft_appeal(attempt: u32) -> String {
    format!(
        "You draft payer appeal letters. Write a formal, factual letter \
         contesting the denial using the analysis provided, and list the \
         supporting documents that must accompany it.\n\n\
         Return ONLY a JSON object:\n\
         {{\n\
           \"letter\": \"\",\n\
           \"attachments\": [\"\"],\n\
           \"confidence\": 0.0\n\
         }}{}",
        retry_suffix(attempt)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_suffix_only_on_reattempts() {
        assert!(retry_suffix(1).is_empty());
        assert!(retry_suffix(2).contains("attempt 2"));
        assert!(parse_input(1).len() < parse_input(3).len());
    }

    #[test]
    fn test_prompts_demand_json() {
        for prompt in [
            parse_input(1),
            extract_patient_info(1),
            suggest_codes(1),
            analyze_denial(1),
            draft_appeal(1),
        ] {
            assert!(prompt.contains("ONLY a JSON object"));
        }
    }
}
