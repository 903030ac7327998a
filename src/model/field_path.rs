use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use crate::error::{invalid_path, FirestoreResult};

/// Characters that may not appear in an unquoted dot-separated segment.
const RESERVED_CHARACTERS: &[char] = &['~', '*', '/', '[', ']'];

/// Path to a (possibly nested) document field.
///
/// Segments are never empty and a path always holds at least one segment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Builds a path from literal segments. Segments are taken verbatim, so a
    /// segment named `a.b` stays a single segment.
    pub fn new<S, I>(segments: I) -> FirestoreResult<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(invalid_path(
                "FieldPath must contain at least one segment",
                "",
            ));
        }
        if segments.iter().any(String::is_empty) {
            return Err(invalid_path(
                "FieldPath segments cannot be empty",
                segments.join("."),
            ));
        }
        Ok(Self { segments })
    }

    /// Parses a dot-separated path such as `a.b.c` or `` `a.b`.c ``.
    ///
    /// Dots inside backtick-quoted segments do not split; within quotes a
    /// backslash escapes the next character.
    pub fn from_dot_separated(path: &str) -> FirestoreResult<Self> {
        if path.is_empty() {
            return Err(invalid_path("FieldPath string cannot be empty", path));
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut quoted = false;
        let mut closed_quote = false;
        let mut chars = path.chars();

        while let Some(ch) = chars.next() {
            if quoted {
                match ch {
                    '\\' => match chars.next() {
                        Some(escaped) => current.push(escaped),
                        None => {
                            return Err(invalid_path(
                                "FieldPath ends with a dangling escape",
                                path,
                            ))
                        }
                    },
                    '`' => {
                        quoted = false;
                        closed_quote = true;
                    }
                    _ => current.push(ch),
                }
                continue;
            }

            match ch {
                '.' => {
                    if current.is_empty() {
                        return Err(invalid_path(
                            "FieldPath contains an empty segment",
                            path,
                        ));
                    }
                    segments.push(std::mem::take(&mut current));
                    closed_quote = false;
                }
                '`' if current.is_empty() && !closed_quote => quoted = true,
                _ if closed_quote => {
                    return Err(invalid_path(
                        "Quoted FieldPath segment must be followed by '.'",
                        path,
                    ))
                }
                '`' => {
                    return Err(invalid_path(
                        "FieldPath contains a misplaced backtick",
                        path,
                    ))
                }
                ch if RESERVED_CHARACTERS.contains(&ch) => {
                    return Err(invalid_path(
                        format!("FieldPath contains invalid character '{ch}'"),
                        path,
                    ))
                }
                _ => current.push(ch),
            }
        }

        if quoted {
            return Err(invalid_path(
                "FieldPath has an unterminated backtick",
                path,
            ));
        }
        if current.is_empty() {
            return Err(invalid_path("FieldPath contains an empty segment", path));
        }
        segments.push(current);
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn child(&self, segment: impl Into<String>) -> FirestoreResult<Self> {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self::new(segments)
    }

    /// Returns `true` when `self` equals `other` or is one of its ancestors.
    pub fn is_prefix_of(&self, other: &FieldPath) -> bool {
        self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(left, right)| left == right)
    }

    /// Renders the path, backtick-quoting every segment that is not a plain
    /// identifier.
    pub fn canonical_string(&self) -> String {
        self.segments
            .iter()
            .map(|segment| escape_segment(segment))
            .collect::<Vec<_>>()
            .join(".")
    }
}

fn is_simple_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

fn escape_segment(segment: &str) -> String {
    if is_simple_segment(segment) {
        return segment.to_string();
    }
    let mut escaped = String::with_capacity(segment.len() + 2);
    escaped.push('`');
    for ch in segment.chars() {
        if ch == '`' || ch == '\\' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('`');
    escaped
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical_string())
    }
}

impl PartialOrd for FieldPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldPath {
    fn cmp(&self, other: &Self) -> Ordering {
        for (left, right) in self.segments.iter().zip(other.segments.iter()) {
            match left.cmp(right) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        self.segments.len().cmp(&other.segments.len())
    }
}

/// Trait that converts common user inputs into a validated [`FieldPath`].
///
/// Strings are parsed as dot-separated paths; segment lists are literal.
pub trait IntoFieldPath {
    fn into_field_path(self) -> FirestoreResult<FieldPath>;
}

impl IntoFieldPath for FieldPath {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        Ok(self)
    }
}

impl<'a> IntoFieldPath for &'a FieldPath {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        Ok(self.clone())
    }
}

impl IntoFieldPath for String {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        FieldPath::from_dot_separated(&self)
    }
}

impl<'a> IntoFieldPath for &'a str {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        FieldPath::from_dot_separated(self)
    }
}

impl IntoFieldPath for Vec<String> {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        FieldPath::new(self)
    }
}

impl<'a> IntoFieldPath for &'a [&'a str] {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        FieldPath::new(self.iter().copied())
    }
}
