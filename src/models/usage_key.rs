//! Course usage keys
//!
//! Video events reference the courseware block that played them through a
//! usage key. Two serializations are in circulation:
//!
//! - `block-v1:{org}+{course}+{run}+type@{block_type}+block@{block_id}`
//! - `i4x://{org}/{course}/{block_type}/{block_id}[@{revision}]` (deprecated)
//!
//! Legacy consumers identify the block by its HTML id, which is what
//! [`UsageKey::html_id`] renders.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

use super::error::{ValidationError, ValidationErrorKind};

const BLOCK_PREFIX: &str = "block-v1:";
const DEPRECATED_TAG: &str = "i4x";

static ALLOWED_ID_REGEX: OnceLock<Regex> = OnceLock::new();
static DEPRECATED_REGEX: OnceLock<Regex> = OnceLock::new();
static INVALID_HTML_CHARS: OnceLock<Regex> = OnceLock::new();
static REPEATED_UNDERSCORES: OnceLock<Regex> = OnceLock::new();

fn allowed_id_regex() -> &'static Regex {
    ALLOWED_ID_REGEX.get_or_init(|| {
        Regex::new(r"^[\w\-~.:%]+$").expect("Invalid usage key id regex pattern")
    })
}

fn deprecated_regex() -> &'static Regex {
    DEPRECATED_REGEX.get_or_init(|| {
        Regex::new(
            r"^i4x://(?P<org>[^/]+)/(?P<course>[^/]+)/(?P<block_type>[^/]+)/(?P<block_id>[^/@]+)(?:@(?P<revision>[^/@]+))?$",
        )
        .expect("Invalid i4x regex pattern")
    })
}

fn invalid_html_chars() -> &'static Regex {
    INVALID_HTML_CHARS
        .get_or_init(|| Regex::new(r"[^\w-]").expect("Invalid html char regex pattern"))
}

fn repeated_underscores() -> &'static Regex {
    REPEATED_UNDERSCORES.get_or_init(|| Regex::new(r"_+").expect("Invalid underscore regex pattern"))
}

/// Reasons a usage key fails to parse
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageKeyError {
    #[error("unrecognized usage key scheme: {0}")]
    UnknownScheme(String),

    #[error("usage key is missing its {0}")]
    MissingPart(&'static str),

    #[error("usage key part '{part}' has invalid characters: {value}")]
    InvalidPart { part: &'static str, value: String },

    #[error("duplicate usage key tag: {0}")]
    DuplicateTag(String),

    #[error("unknown usage key tag: {0}")]
    UnknownTag(String),
}

impl From<UsageKeyError> for ValidationError {
    fn from(err: UsageKeyError) -> Self {
        ValidationError::with_context(ValidationErrorKind::InvalidUsageKey, "module_id", err.to_string())
    }
}

/// A parsed reference to one block of courseware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageKey {
    pub org: String,
    pub course: String,
    /// Absent for deprecated keys
    pub run: Option<String>,
    pub block_type: String,
    pub block_id: String,
    deprecated: bool,
}

impl UsageKey {
    /// Whether the key used the `i4x://` serialization
    pub fn is_deprecated(&self) -> bool {
        self.deprecated
    }

    /// Identifier safe to use as an HTML element id
    pub fn html_id(&self) -> String {
        if self.deprecated {
            let joined = [
                DEPRECATED_TAG,
                &self.org,
                &self.course,
                &self.block_type,
                &self.block_id,
            ]
            .join("-");
            clean_for_html(&joined)
        } else {
            self.block_id.clone()
        }
    }

    fn parse_block(body: &str) -> Result<Self, UsageKeyError> {
        let mut positional = Vec::new();
        let mut block_type = None;
        let mut block_id = None;

        for part in body.split('+') {
            match part.split_once('@') {
                None => positional.push(part),
                Some((tag, value)) => {
                    let slot = match tag {
                        "type" => &mut block_type,
                        "block" => &mut block_id,
                        // branch and version pin a revision; they do not affect the html id
                        "branch" | "version" => continue,
                        other => return Err(UsageKeyError::UnknownTag(other.to_string())),
                    };
                    if slot.replace(value).is_some() {
                        return Err(UsageKeyError::DuplicateTag(tag.to_string()));
                    }
                },
            }
        }

        let mut positional = positional.into_iter();
        let org = positional.next().ok_or(UsageKeyError::MissingPart("org"))?;
        let course = positional.next().ok_or(UsageKeyError::MissingPart("course"))?;
        let run = positional.next().ok_or(UsageKeyError::MissingPart("run"))?;
        if let Some(extra) = positional.next() {
            return Err(UsageKeyError::InvalidPart {
                part: "run",
                value: extra.to_string(),
            });
        }
        let block_type = block_type.ok_or(UsageKeyError::MissingPart("block type"))?;
        let block_id = block_id.ok_or(UsageKeyError::MissingPart("block id"))?;

        for (part, value) in [
            ("org", org),
            ("course", course),
            ("run", run),
            ("block type", block_type),
            ("block id", block_id),
        ] {
            check_part(part, value)?;
        }

        Ok(Self {
            org: org.to_string(),
            course: course.to_string(),
            run: Some(run.to_string()),
            block_type: block_type.to_string(),
            block_id: block_id.to_string(),
            deprecated: false,
        })
    }

    fn parse_deprecated(raw: &str) -> Result<Self, UsageKeyError> {
        let captures = deprecated_regex()
            .captures(raw)
            .ok_or_else(|| UsageKeyError::UnknownScheme(raw.to_string()))?;
        let part = |name: &'static str| -> Result<String, UsageKeyError> {
            let value = captures.name(name).map(|m| m.as_str()).unwrap_or_default();
            check_part(name, value)?;
            Ok(value.to_string())
        };

        Ok(Self {
            org: part("org")?,
            course: part("course")?,
            run: None,
            block_type: part("block_type")?,
            block_id: part("block_id")?,
            deprecated: true,
        })
    }
}

impl FromStr for UsageKey {
    type Err = UsageKeyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if let Some(body) = raw.strip_prefix(BLOCK_PREFIX) {
            Self::parse_block(body)
        } else if raw.starts_with("i4x://") {
            Self::parse_deprecated(raw)
        } else {
            Err(UsageKeyError::UnknownScheme(raw.to_string()))
        }
    }
}

impl fmt::Display for UsageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.run, self.deprecated) {
            (Some(run), false) => write!(
                f,
                "{}{}+{}+{}+type@{}+block@{}",
                BLOCK_PREFIX, self.org, self.course, run, self.block_type, self.block_id
            ),
            _ => write!(
                f,
                "i4x://{}/{}/{}/{}",
                self.org, self.course, self.block_type, self.block_id
            ),
        }
    }
}

fn check_part(part: &'static str, value: &str) -> Result<(), UsageKeyError> {
    if allowed_id_regex().is_match(value) {
        Ok(())
    } else {
        Err(UsageKeyError::InvalidPart {
            part,
            value: value.to_string(),
        })
    }
}

/// Replace characters that are not valid in an HTML id with underscores
pub fn clean_for_html(value: &str) -> String {
    let replaced = invalid_html_chars().replace_all(value, "_");
    repeated_underscores().replace_all(&replaced, "_").into_owned()
}
