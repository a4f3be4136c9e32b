use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use docqa_core::error::Error;

/// Sentence the model is told to answer with when the context is silent.
pub const NOT_FOUND_ANSWER: &str = "I couldn't find this in the uploaded files.";

const CITATION_RULES: &str = "Use only the provided context. If the answer is not present, say \
'I couldn't find this in the uploaded files.' Cite sources with filenames in square brackets like \
[MyDoc.pdf]. Keep the answer targeted to the persona.";

/// Audience the answer is written for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    PlantOperator,
    CorporateEmployee,
    #[default]
    GeneralEmployee,
}

impl Persona {
    pub const ALL: [Persona; 3] = [Persona::PlantOperator, Persona::CorporateEmployee, Persona::GeneralEmployee];

    pub fn description(self) -> &'static str {
        match self {
            Persona::PlantOperator => {
                "You are a plant maintenance operator. Be safety-first, pragmatic, and checklist-oriented. \
                 Reference SOPs if present. Provide step-by-step actions, required permits, spares, and \
                 escalation rules. Prefer concise bullet points; avoid speculation. If unknown, say so."
            }
            Persona::CorporateEmployee => {
                "You are a corporate business analyst speaking to managers. Focus on KPIs, ROI, risk, \
                 compliance, timelines, and decisions. Summarize crisply, highlight trade-offs and \
                 assumptions, and include next steps."
            }
            Persona::GeneralEmployee => {
                "You are a helpful colleague. Provide clear, plain-language instructions with minimal \
                 jargon. Offer short steps and tips to complete the task or find the information."
            }
        }
    }

    /// Persona description followed by the grounding and citation rules.
    pub fn system_instruction(self) -> String {
        format!("{} {}", self.description(), CITATION_RULES)
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Persona::PlantOperator => "plant-operator",
            Persona::CorporateEmployee => "corporate-employee",
            Persona::GeneralEmployee => "general-employee",
        })
    }
}

impl FromStr for Persona {
    type Err = Error;

    /// Accepts `plant-operator`, `plant_operator` and `Plant Operator` alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "plantoperator" | "operator" => Ok(Persona::PlantOperator),
            "corporateemployee" | "corporate" => Ok(Persona::CorporateEmployee),
            "generalemployee" | "general" => Ok(Persona::GeneralEmployee),
            _ => Err(Error::InvalidConfig(format!(
                "unknown persona '{s}' (expected plant-operator, corporate-employee or general-employee)"
            ))),
        }
    }
}
