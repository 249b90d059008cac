/// Resolve a repository reference from a tracker field.
///
/// Accepts `owner/repo` or a hosting URL such as `https://github.com/owner/repo`
/// (with optional `.git` suffix or trailing path segments).
pub fn parse_repo_reference(raw: &str) -> Option<(String, String)> {
    let value = raw.trim().trim_end_matches('/');
    if value.is_empty() {
        return None;
    }

    let (owner, repo) = if let Some(rest) = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
    {
        // host/owner/repo[/...]
        let mut parts = rest.splitn(4, '/');
        let _host = parts.next()?;
        (parts.next()?, parts.next()?)
    } else if let Some(rest) = value.strip_prefix("git@") {
        // git@host:owner/repo.git
        let (_, path) = rest.split_once(':')?;
        path.split_once('/')?
    } else {
        let parts: Vec<&str> = value.split('/').collect();
        if parts.len() != 2 {
            return None;
        }
        (parts[0], parts[1])
    };

    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if is_valid_name(owner) && is_valid_name(repo) {
        Some((owner.to_string(), repo.to_string()))
    } else {
        None
    }
}

/// A single `[A-Za-z0-9._-]` path segment, never `.` or `..`
pub fn is_valid_name(s: &str) -> bool {
    !s.is_empty()
        && s != "."
        && s != ".."
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
