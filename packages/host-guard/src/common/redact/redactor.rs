use super::detector::{detect_sensitive, Findings, SensitiveKind};

/// Replace every finding with its placeholder token
pub fn redact(text: &str, findings: &Findings) -> String {
    if findings.is_empty() {
        return text.to_string();
    }

    // Reverse order so earlier byte offsets stay valid
    let mut result = text.to_string();
    for found in findings.matches.iter().rev() {
        result.replace_range(found.start..found.end, placeholder(found.kind));
    }

    result
}

/// Redact paths, IP addresses and emails from a message bound for the UI.
pub fn sanitize_error(message: &str) -> String {
    redact(message, &detect_sensitive(message))
}

fn placeholder(kind: SensitiveKind) -> &'static str {
    match kind {
        SensitiveKind::Email => "[email]",
        SensitiveKind::IpAddress => "[ip]",
        SensitiveKind::Path => "[path]",
    }
}
