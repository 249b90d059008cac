use crate::model::{ImplementationPlan, Task};

const TITLE_BUDGET: usize = 30;

/// Feature branch for a ticket: `<prefix>/<ticket>-<sanitized title>`.
///
/// The slug is used as produced, so an empty or dash-edged slug is kept verbatim.
pub fn branch_name(prefix: &str, ticket_id: &str, title: &str) -> String {
    format!(
        "{}/{}-{}",
        prefix,
        ticket_id,
        sanitize(&truncate(title, TITLE_BUDGET))
    )
}

/// First `max` characters of `s`
pub fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Keep `[A-Za-z0-9_-]`, map spaces to `-`, drop everything else
pub fn sanitize(s: &str) -> String {
    s.chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            c if c.is_ascii_alphanumeric() || c == '_' || c == '-' => Some(c),
            _ => None,
        })
        .collect()
}

pub fn review_title(task: &Task) -> String {
    format!("{}: {}", task.ticket_id, task.title)
}

pub fn review_description(task: &Task, plan: &ImplementationPlan) -> String {
    let mut body = format!(
        "## Implementation for {ticket}\n\n\
         **Jira Ticket:** {ticket}\n\
         **Description:** {description}\n\n\
         ## Implementation Plan\n\n\
         {summary}\n\n\
         ## Steps\n\n",
        ticket = task.ticket_id,
        description = task.description,
        summary = plan.summary,
    );
    for (i, step) in plan.steps.iter().enumerate() {
        body.push_str(&format!("{}. {}\n", i + 1, step.description));
    }
    if !task.tracker_url.is_empty() {
        body.push_str(&format!("\n---\nTracked in {}\n", task.tracker_url));
    }
    body
}

pub fn commit_message(task: &Task, change_summary: &str) -> String {
    let subject = review_title(task);
    let summary = change_summary.trim();
    if summary.is_empty() {
        subject
    } else {
        format!("{}\n\n{}", subject, summary)
    }
}
