use crate::model::Task;

pub const SYSTEM_PROMPT: &str = "You are an expert software engineer that creates detailed \
implementation plans for code changes based on Jira tickets.";

/// User prompt describing the ticket and the response format the parser expects
pub fn user_prompt(task: &Task) -> String {
    let description = if task.description.trim().is_empty() {
        "(no description provided)"
    } else {
        task.description.trim()
    };

    format!(
        "Create an implementation plan for the following ticket.

Ticket: {ticket}
Title: {title}
Repository: {repo} (base branch: {base})

Description:
{description}

Respond using exactly this format:

SUMMARY: <one paragraph summary of the change>
STEPS:
1. <step description> [TYPE: codegen|testing|deployment|review]
2. <step description> [TYPE: codegen|testing|deployment|review]
FILES_MODIFY: <comma-separated list of existing files to change>
FILES_CREATE: <comma-separated list of new files>
COMPLEXITY: <low|medium|high>
",
        ticket = task.ticket_id,
        title = task.title,
        repo = task.repo_slug(),
        base = task.base_branch,
        description = description,
    )
}
