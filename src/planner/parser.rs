//! Permissive parser for the labelled plan format the planner asks for

use crate::model::{ActivityType, Complexity, ImplementationPlan, PlanStep};
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Summary,
    Steps,
    FilesModify,
    FilesCreate,
    Complexity,
}

const HEADERS: [(&str, Section); 5] = [
    ("SUMMARY:", Section::Summary),
    ("STEPS:", Section::Steps),
    ("FILES_MODIFY:", Section::FilesModify),
    ("FILES_CREATE:", Section::FilesCreate),
    ("COMPLEXITY:", Section::Complexity),
];

/// Parse a completion into a plan.
///
/// Never fails: malformed lines are skipped and missing sections fall back to
/// defaults (synthesized summary, `medium` complexity, `codegen` steps).
pub fn parse_plan(response: &str, ticket_id: &str) -> ImplementationPlan {
    let type_re = Regex::new(r"(?i)\[\s*TYPE\s*:\s*([^\]]*)\]").ok();

    let mut section = Section::Preamble;
    let mut summary: Vec<String> = Vec::new();
    let mut steps: Vec<PlanStep> = Vec::new();
    let mut files_to_modify: Vec<String> = Vec::new();
    let mut files_to_create: Vec<String> = Vec::new();
    let mut complexity: Option<Complexity> = None;

    for raw in response.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("```") {
            continue;
        }

        let rest = match split_header(line) {
            Some((next, rest)) => {
                section = next;
                if rest.is_empty() {
                    continue;
                }
                rest
            }
            None => line.to_string(),
        };

        match section {
            Section::Preamble => {}
            Section::Summary => summary.push(rest),
            Section::Steps => {
                if let Some((description, activity_type)) = parse_step_line(&rest, type_re.as_ref())
                {
                    steps.push(PlanStep {
                        order: steps.len() as u32 + 1,
                        description,
                        activity_type,
                        parameters: BTreeMap::new(),
                    });
                }
            }
            Section::FilesModify => files_to_modify.extend(parse_file_list(&rest)),
            Section::FilesCreate => files_to_create.extend(parse_file_list(&rest)),
            Section::Complexity => {
                if complexity.is_none() {
                    complexity = strip_emphasis(&rest).parse().ok();
                }
            }
        }
    }

    let summary = summary.join(" ");
    let summary = if summary.is_empty() {
        format!("Implementation plan for {}", ticket_id)
    } else {
        summary
    };

    debug!(
        "Parsed plan for {}: {} step(s), {} to modify, {} to create",
        ticket_id,
        steps.len(),
        files_to_modify.len(),
        files_to_create.len()
    );

    ImplementationPlan {
        summary,
        complexity: complexity.unwrap_or_default(),
        steps,
        files_to_modify,
        files_to_create,
    }
}

/// Recognise a section header, tolerating `#` and `*` decoration
fn split_header(line: &str) -> Option<(Section, String)> {
    let bare = line.trim_start_matches(['#', '*', '_', ' ']);
    for (label, section) in HEADERS {
        let matches = bare
            .get(..label.len())
            .map(|prefix| prefix.eq_ignore_ascii_case(label))
            .unwrap_or(false);
        if matches {
            let rest = strip_emphasis(&bare[label.len()..]);
            return Some((section, rest));
        }
    }
    None
}

fn strip_emphasis(s: &str) -> String {
    s.trim().trim_matches(['*', '_', '`']).trim().to_string()
}

/// Parse `1. description [TYPE: tag]`; `None` for lines with no description
fn parse_step_line(line: &str, type_re: Option<&Regex>) -> Option<(String, ActivityType)> {
    let mut text = line.to_string();
    let mut activity_type = ActivityType::Codegen;

    if let Some(caps) = type_re.and_then(|re| re.captures(line)) {
        let tag = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        if !tag.is_empty() {
            activity_type = ActivityType::from(tag.to_string());
        }
        if let Some(whole) = caps.get(0) {
            text.replace_range(whole.range(), "");
        }
    }

    let description = strip_emphasis(strip_list_marker(text.trim()));
    if description.is_empty() {
        None
    } else {
        Some((description, activity_type))
    }
}

/// Remove a leading `1.`, `1)`, `-`, `*` or `+` marker
fn strip_list_marker(s: &str) -> &str {
    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let after = &s[digits..];
        if let Some(rest) = after.strip_prefix('.').or_else(|| after.strip_prefix(')')) {
            return rest.trim_start();
        }
        return s;
    }
    for marker in ["- ", "* ", "+ "] {
        if let Some(rest) = s.strip_prefix(marker) {
            return rest.trim_start();
        }
    }
    s
}

fn parse_file_list(s: &str) -> Vec<String> {
    strip_list_marker(s)
        .split(',')
        .map(|f| f.trim().trim_matches('`').trim().to_string())
        .filter(|f| {
            !f.is_empty() && !matches!(f.to_lowercase().as_str(), "none" | "n/a" | "-")
        })
        .collect()
}
