use lazy_static::lazy_static;
use regex::Regex;

/// Kind of sensitive substring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensitiveKind {
    Email,
    IpAddress,
    Path,
}

/// A detected substring with its byte range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensitiveMatch {
    pub kind: SensitiveKind,
    pub start: usize,
    pub end: usize,
}

impl SensitiveMatch {
    fn len(&self) -> usize {
        self.end - self.start
    }

    fn overlaps(&self, other: &SensitiveMatch) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Non-overlapping matches, ordered by position
#[derive(Debug, Default, Clone)]
pub struct Findings {
    pub matches: Vec<SensitiveMatch>,
}

impl Findings {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn count(&self) -> usize {
        self.matches.len()
    }

    pub fn by_kind(&self, kind: SensitiveKind) -> Vec<&SensitiveMatch> {
        self.matches.iter().filter(|m| m.kind == kind).collect()
    }
}

lazy_static! {
    // Email pattern - RFC 5322 simplified
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b"
    ).unwrap();

    // IPv4 addresses
    static ref IPV4_REGEX: Regex = Regex::new(
        r"\b(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\b"
    ).unwrap();

    // IPv6 addresses (full form only)
    static ref IPV6_REGEX: Regex = Regex::new(
        r"\b(?:[0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}\b"
    ).unwrap();

    // Unix absolute, home-relative and dot-relative paths. Group 1 is the path;
    // the leading delimiter keeps URL authorities (`https://host`) and words
    // like `and/or` out. A segment never ends in `.` unless it is `..`, so
    // sentence punctuation stays outside the match.
    static ref UNIX_PATH_REGEX: Regex = Regex::new(
        r#"(?:^|[\s"'`(\[=,:;])((?:~|\.{1,2})?/[A-Za-z0-9._\-]*[A-Za-z0-9_\-](?:/(?:[A-Za-z0-9._\-]*[A-Za-z0-9_\-]|\.\.))*/?)"#
    ).unwrap();

    // Windows drive and UNC paths, minus trailing punctuation
    static ref WINDOWS_PATH_REGEX: Regex = Regex::new(
        r#"(?:\b[A-Za-z]:\\|\\\\[A-Za-z0-9._\-]+\\)(?:[^\s"'<>|*?]*[^\s"'<>|*?.,;:!)\]])?"#
    ).unwrap();
}

/// Detect emails, IP addresses and filesystem paths in `text`.
///
/// When candidates overlap the longest one wins, so an IP embedded in a path
/// is redacted as part of the path.
pub fn detect_sensitive(text: &str) -> Findings {
    let mut candidates = Vec::new();

    for mat in EMAIL_REGEX.find_iter(text) {
        candidates.push(SensitiveMatch {
            kind: SensitiveKind::Email,
            start: mat.start(),
            end: mat.end(),
        });
    }

    for mat in IPV4_REGEX.find_iter(text).chain(IPV6_REGEX.find_iter(text)) {
        candidates.push(SensitiveMatch {
            kind: SensitiveKind::IpAddress,
            start: mat.start(),
            end: mat.end(),
        });
    }

    for caps in UNIX_PATH_REGEX.captures_iter(text) {
        if let Some(path) = caps.get(1) {
            candidates.push(SensitiveMatch {
                kind: SensitiveKind::Path,
                start: path.start(),
                end: path.end(),
            });
        }
    }

    for mat in WINDOWS_PATH_REGEX.find_iter(text) {
        candidates.push(SensitiveMatch {
            kind: SensitiveKind::Path,
            start: mat.start(),
            end: mat.end(),
        });
    }

    // Longest first, then earliest; greedily keep what doesn't collide
    candidates.sort_by(|a, b| b.len().cmp(&a.len()).then(a.start.cmp(&b.start)));
    let mut kept: Vec<SensitiveMatch> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !kept.iter().any(|existing| existing.overlaps(&candidate)) {
            kept.push(candidate);
        }
    }
    kept.sort_by_key(|m| m.start);

    Findings { matches: kept }
}
