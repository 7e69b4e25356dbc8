//! Built-in instructions for the five discharge-summary checks.
//!
//! Gemini prompts are plain prose; Claude prompts use XML-style sections.
//! Both ask for the same `{"issues": [...]}` schema.

use dv_core::{Instructions, PromptSource, Provider};

struct CheckPrompts {
    name: &'static str,
    focus: &'static str,
    issue_types: &'static str,
    severity_rules: Option<&'static str>,
    gemini_system: &'static str,
    claude_system: &'static str
}

const CHECKS: [CheckPrompts; 5] = [
    CheckPrompts {
        name: "linguistic",
        focus: "\
- Spelling errors in medical terminology and general words
- Grammar issues such as verb tense and subject-verb agreement
- Sentences longer than 40 words
- Duplicate or redundant content
- Ambiguous or unclear phrasing",
        issue_types: "spelling|grammar|structure|duplication|clarity",
        severity_rules: None,
        gemini_system: "You are a medical documentation quality expert specializing in linguistic accuracy.",
        claude_system: "You are a medical documentation quality expert. Focus on linguistic accuracy and clarity."
    },
    CheckPrompts {
        name: "structural",
        focus: "\
- Required sections: Patient Information (UHID, IPD No, Age, Gender, DOA, DOD), Diagnosis, \
Chief Complaints, History of Present Illness, Significant Findings at Admission, Course in \
Hospital, Procedures (if applicable), Condition at Discharge, Advice on Discharge, Follow-up
- Sections present but lacking adequate detail
- Formatting consistency
- Logical organization and flow
- Missing critical information",
        issue_types: "missing_section|incomplete_section|formatting|organization|critical_info_missing",
        severity_rules: None,
        gemini_system: "You are a NABH compliance expert for medical discharge documentation.",
        claude_system: "You are an expert in NABH healthcare standards and discharge summary compliance."
    },
    CheckPrompts {
        name: "terminology",
        focus: "\
- Non-standard abbreviations that should be expanded (for example \"K/c/o\" for \"Known case of\")
- Inconsistent abbreviation usage (B.P. vs BP)
- Non-standard medical terminology
- Mixed brand and generic drug names
- Unit inconsistencies (mg vs mgm)
- Ambiguous terms and local slang in a clinical context",
        issue_types: "abbreviation|terminology|drug_name|units|ambiguous_term",
        severity_rules: None,
        gemini_system: "You are a medical terminology standardization expert.",
        claude_system: "You are an expert in medical terminology standards and abbreviation guidelines."
    },
    CheckPrompts {
        name: "clinical_safety",
        focus: "\
- Drug safety: overdose or underdose, drug-diagnosis mismatch, dangerous interactions, more \
than 10 medications in patients over 65, misspelled drug or procedure names
- Dangerous abbreviations, only when present verbatim: U, IU, QD, QOD, MS, MSO4, MgSO4
- Abnormal lab values or vital signs without a documented management plan
- Clinical logic errors: medications without a matching diagnosis, procedures not matching \
the diagnosis, contradictory clinical statements
Ignore grammar, formatting, section organization and harmless abbreviations.",
        issue_types: "drug_overdose|drug_diagnosis_mismatch|drug_interaction|dangerous_polypharmacy|\
drug_spelling_error|dangerous_abbreviation|abnormal_finding_no_action|missing_critical_diagnosis|\
procedure_mismatch|clinical_contradiction",
        severity_rules: Some(
            "HIGH for a direct patient safety risk, MEDIUM for clinical best-practice gaps. Never use LOW."
        ),
        gemini_system: "You are a clinical safety expert. Focus ONLY on patient safety risks.",
        claude_system: "You are a clinical safety expert. Focus ONLY on patient safety risks."
    },
    CheckPrompts {
        name: "critical_data_safety",
        focus: "\
- Timeline logic: procedures before admission, discharge before admission, report dates \
before procedure dates, any impossible date sequence
- Missing identifiers: UHID, IPD No, patient name, age, gender, DOA, DOD, physician
- Wrong or misspelled investigation names (FBS vs RBS)
- Missing Diagnosis, Medications or Follow-up sections
Ignore general formatting, non-critical sections and minor date format differences.",
        issue_types: "timeline_impossible|date_logic_error|missing_identifier|missing_critical_section|\
test_name_error|age_mismatch",
        severity_rules: Some(
            "HIGH for timeline impossibilities and missing identifiers or critical sections, \
MEDIUM for data inconsistencies. Never use LOW."
        ),
        gemini_system: "You are a medical data integrity expert. Focus on critical data errors only.",
        claude_system: "You are a medical data integrity expert. Focus on critical data errors only."
    }
];

fn schema(issue_types: &str) -> String {
    format!(
        r#"{{
  "issues": [
    {{
      "type": "{issue_types}",
      "severity": "HIGH|MEDIUM|LOW",
      "location": "section where the issue is found",
      "current": "exact problematic text",
      "suggestion": "corrected text",
      "explanation": "why this is an issue"
    }}
  ]
}}"#
    )
}

fn gemini_template(check: &CheckPrompts) -> String {
    let severity = check
        .severity_rules
        .map(|rules| format!("\nSeverity rules: {rules}\n"))
        .unwrap_or_default();
    format!(
        "Review the discharge summary below for {name} issues.\n\nLook for:\n{focus}\n{severity}\n\
         Return ONLY valid JSON in this exact format:\n{schema}\n\nDISCHARGE SUMMARY:\n{placeholder}",
        name = check.name.replace('_', " "),
        focus = check.focus,
        schema = schema(check.issue_types),
        placeholder = Instructions::CONTENT_PLACEHOLDER
    )
}

fn claude_template(check: &CheckPrompts) -> String {
    let severity = check
        .severity_rules
        .map(|rules| format!("<severity_rules>\n{rules}\n</severity_rules>\n\n"))
        .unwrap_or_default();
    format!(
        "<task>Review this discharge summary for {name} issues</task>\n\n<focus_areas>\n{focus}\n\
         </focus_areas>\n\n{severity}<output_format>\nReturn ONLY valid JSON with this structure:\n\
         {schema}\n</output_format>\n\n<discharge_summary>\n{placeholder}\n</discharge_summary>",
        name = check.name.replace('_', " "),
        focus = check.focus,
        schema = schema(check.issue_types),
        placeholder = Instructions::CONTENT_PLACEHOLDER
    )
}

/// Instructions shipped with the service.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinPrompts;

impl BuiltinPrompts {
    pub fn check_names() -> impl Iterator<Item = &'static str> {
        CHECKS.iter().map(|c| c.name)
    }
}

impl PromptSource for BuiltinPrompts {
    fn instructions(&self, provider: Provider, check: &str) -> Option<Instructions> {
        let prompts = CHECKS.iter().find(|c| c.name == check)?;
        let instructions = match provider {
            Provider::Gemini => Instructions::new(
                Some(prompts.gemini_system.to_string()),
                gemini_template(prompts)
            ),
            Provider::Claude => Instructions::new(
                Some(prompts.claude_system.to_string()),
                claude_template(prompts)
            )
        };
        Some(instructions)
    }
}
