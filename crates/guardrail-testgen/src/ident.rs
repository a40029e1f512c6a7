use std::collections::HashSet;

const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl",
    "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "static", "struct", "super", "trait", "true", "try", "type", "typeof",
    "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Lowercase ASCII snake_case identifier, never empty, never starting with a
/// digit.
pub(crate) fn snake(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        return "unnamed".to_string();
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("n_{trimmed}");
    }
    trimmed.to_string()
}

/// [`snake`], suffixed when it collides with a Rust keyword.
pub(crate) fn rust(raw: &str) -> String {
    let ident = snake(raw);
    if RUST_KEYWORDS.contains(&ident.as_str()) {
        format!("{ident}_")
    } else {
        ident
    }
}

/// Package-manager friendly name: lowercase, `-` separated.
pub(crate) fn package_name(project: Option<&str>) -> String {
    let base = snake(project.unwrap_or("guardrails")).replace('_', "-");
    format!("{base}-guardrails-tests")
}

/// Hands out identifiers unique within one scope.
#[derive(Default)]
pub(crate) struct Scope {
    used: HashSet<String>,
}

impl Scope {
    pub(crate) fn claim(&mut self, base: String) -> String {
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_sanitizes() {
        assert_eq!(snake("external_send_requires_approval"), "external_send_requires_approval");
        assert_eq!(snake("Block Shell-Commands!"), "block_shell_commands");
        assert_eq!(snake("pol.42"), "pol_42");
        assert_eq!(snake("42nd"), "n_42nd");
        assert_eq!(snake("--"), "unnamed");
        assert_eq!(snake("héllo"), "h_llo");
    }

    #[test]
    fn rust_avoids_keywords() {
        assert_eq!(rust("type"), "type_");
        assert_eq!(rust("Match"), "match_");
        assert_eq!(rust("typed"), "typed");
    }

    #[test]
    fn package_names() {
        assert_eq!(package_name(Some("OpenClaw Demo")), "openclaw-demo-guardrails-tests");
        assert_eq!(package_name(None), "guardrails-guardrails-tests");
    }

    #[test]
    fn scope_deduplicates() {
        let mut scope = Scope::default();
        assert_eq!(scope.claim("a".into()), "a");
        assert_eq!(scope.claim("a".into()), "a_2");
        assert_eq!(scope.claim("a".into()), "a_3");
        assert_eq!(scope.claim("a_2".into()), "a_2_2");
    }
}
