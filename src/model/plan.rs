use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered implementation plan derived from a task. Never mutated after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImplementationPlan {
    pub summary: String,

    #[serde(default)]
    pub complexity: Complexity,

    #[serde(default)]
    pub steps: Vec<PlanStep>,

    #[serde(default)]
    pub files_to_modify: Vec<String>,

    #[serde(default)]
    pub files_to_create: Vec<String>,
}

impl ImplementationPlan {
    /// Minimal plan used when a run is triggered by hand and planning is unavailable
    pub fn manual() -> Self {
        Self {
            summary: "Manual workflow trigger".to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// 1-based position within the plan
    pub order: u32,

    pub description: String,

    pub activity_type: ActivityType,

    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Complexity::Low => write!(f, "low"),
            Complexity::Medium => write!(f, "medium"),
            Complexity::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Complexity::Low),
            "medium" | "moderate" => Ok(Complexity::Medium),
            "high" => Ok(Complexity::High),
            _ => Err(format!("Unknown complexity: {}", s)),
        }
    }
}

/// Tag attached to each plan step. The vocabulary is open: unknown tags are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityType {
    #[default]
    Codegen,
    Testing,
    Deployment,
    Review,
    Other(String),
}

impl From<String> for ActivityType {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "codegen" => ActivityType::Codegen,
            "testing" => ActivityType::Testing,
            "deployment" => ActivityType::Deployment,
            "review" => ActivityType::Review,
            _ => ActivityType::Other(value.trim().to_string()),
        }
    }
}

impl From<ActivityType> for String {
    fn from(value: ActivityType) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityType::Codegen => write!(f, "codegen"),
            ActivityType::Testing => write!(f, "testing"),
            ActivityType::Deployment => write!(f, "deployment"),
            ActivityType::Review => write!(f, "review"),
            ActivityType::Other(tag) => write!(f, "{}", tag),
        }
    }
}
