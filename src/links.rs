//! Link rule shapes and the path/target validation applied before anything
//! is forwarded upstream.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::error::ConsoleError;

pub const MAX_PATH_LEN: usize = 128;
pub const SUBDOMAIN_LENGTH_RANGE: std::ops::RangeInclusive<u32> = 3..=32;

/// Body of `POST /api/links` as submitted by the console.
#[derive(Debug, Default)]
pub struct CreateLinkRequest {
    pub path: String,
    pub target_url: String,
    pub random_subdomain: Option<bool>,
    pub subdomain_length: Option<u32>,
}

impl CreateLinkRequest {
    /// A body that is not a JSON object reads as `{}`. A field that is
    /// present with the wrong type is rejected by name.
    pub fn from_body(body: &[u8]) -> Result<Self, ConsoleError> {
        let Ok(Value::Object(fields)) = serde_json::from_slice::<Value>(body) else {
            return Ok(Self::default());
        };
        Ok(Self {
            path: field(&fields, "path", "a string")?.unwrap_or_default(),
            target_url: field(&fields, "targetUrl", "a string")?.unwrap_or_default(),
            random_subdomain: field(&fields, "randomSubdomain", "a boolean")?,
            subdomain_length: field(
                &fields,
                "subdomainLength",
                "an integer between 3 and 32",
            )?,
        })
    }
}

fn field<T: DeserializeOwned>(
    fields: &Map<String, Value>,
    name: &str,
    expected: &str,
) -> Result<Option<T>, ConsoleError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|_| ConsoleError::validation(format!("{name} must be {expected}"))),
    }
}

/// A create request that passed validation; this is what goes upstream.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewLink {
    pub path: String,
    pub target_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_subdomain: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain_length: Option<u32>,
}

impl TryFrom<CreateLinkRequest> for NewLink {
    type Error = ConsoleError;

    fn try_from(req: CreateLinkRequest) -> Result<Self, Self::Error> {
        let path = normalize_path(&req.path);
        validate_path(&path)?;
        let target_url = req.target_url.trim().to_string();
        validate_target_url(&target_url)?;
        validate_subdomain_length(req.subdomain_length)?;
        Ok(NewLink {
            path,
            target_url,
            random_subdomain: req.random_subdomain,
            subdomain_length: req.subdomain_length,
        })
    }
}

/// Canonical form of a user-supplied path: surrounding whitespace and the
/// leading/trailing `/` runs are stripped until neither edge has any.
///
/// The result never starts or ends with `/` and normalizing it again is a
/// no-op, so `"//a"` and `" / a / "` both become `"a"`.
pub fn normalize_path(input: &str) -> String {
    input
        .trim_matches(|c: char| c == '/' || c.is_whitespace())
        .to_string()
}

pub fn validate_path(path: &str) -> Result<(), ConsoleError> {
    if path.is_empty() {
        return Err(ConsoleError::validation("path is required"));
    }
    if path.chars().count() > MAX_PATH_LEN {
        return Err(ConsoleError::validation(format!(
            "path is too long (max {MAX_PATH_LEN} characters)"
        )));
    }
    if path.contains("..") {
        return Err(ConsoleError::validation("path must not contain .."));
    }
    validate_segments(path)
}

/// Segment rules for a path that is about to be joined onto the upstream
/// URL. Empty, `.` and `..` segments would be collapsed by the join and
/// address a different link.
pub fn validate_segments(path: &str) -> Result<(), ConsoleError> {
    if path.contains("//") {
        return Err(ConsoleError::validation("path must not contain //"));
    }
    if path.split('/').any(|seg| seg == "..") {
        return Err(ConsoleError::validation("path must not contain .."));
    }
    if path.split('/').any(|seg| seg == ".") {
        return Err(ConsoleError::validation("path must not contain . segments"));
    }
    Ok(())
}

pub fn validate_target_url(url: &str) -> Result<(), ConsoleError> {
    if url.starts_with("https://") || url.starts_with("http://") {
        return Ok(());
    }
    Err(ConsoleError::validation(
        "targetUrl must start with http(s)://",
    ))
}

pub fn validate_subdomain_length(len: Option<u32>) -> Result<(), ConsoleError> {
    match len {
        Some(n) if !SUBDOMAIN_LENGTH_RANGE.contains(&n) => Err(ConsoleError::validation(format!(
            "subdomainLength must be between {} and {}",
            SUBDOMAIN_LENGTH_RANGE.start(),
            SUBDOMAIN_LENGTH_RANGE.end()
        ))),
        _ => Ok(()),
    }
}
