//! Content payload shapes and the rules that turn them into storable values.
//!
//! Creation payloads become a [`ContentDraft`] only when every required field
//! is present and non-blank. Update payloads become a [`ContentPatch`], which
//! is merged onto the stored draft by [`ContentPatch::apply`].

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 200;

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// One offending field and what is wrong with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("invalid fields: {}", describe(.0))]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    #[cfg(test)]
    fn fields(&self) -> &[FieldError] {
        &self.0
    }

    #[must_use]
    pub fn into_fields(self) -> Vec<FieldError> {
        self.0
    }

    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_owned(),
            message: message.into(),
        });
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl From<FieldError> for ValidationErrors {
    fn from(error: FieldError) -> Self {
        Self(vec![error])
    }
}

fn describe(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Draft (fully-populated record fields)
// ---------------------------------------------------------------------------

/// Every user-editable field of a content record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDraft {
    pub project_name: String,
    pub channel: String,
    pub content_type: String,
    pub view_count: Option<i32>,
    pub segment: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub client: Option<String>,
    pub link: String,
    pub description: Option<String>,
}

impl ContentDraft {
    /// Trims every text field.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            project_name: self.project_name.trim().to_owned(),
            channel: self.channel.trim().to_owned(),
            content_type: self.content_type.trim().to_owned(),
            view_count: self.view_count,
            segment: trim_optional(self.segment),
            publication_date: self.publication_date,
            client: trim_optional(self.client),
            link: self.link.trim().to_owned(),
            description: trim_optional(self.description),
        }
    }
}

fn trim_optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned())
}

// ---------------------------------------------------------------------------
// Creation payload
// ---------------------------------------------------------------------------

/// Raw creation body. Required fields are optional here so that every
/// missing one can be reported in a single response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateContentRequest {
    pub project_name: Option<String>,
    pub channel: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub view_count: Option<i32>,
    pub segment: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub client: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
}

impl CreateContentRequest {
    /// Checks required fields and returns a trimmed draft.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] listing every required field that is
    /// missing or blank.
    pub fn validate(self) -> Result<ContentDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let project_name = required_text(&mut errors, "project_name", self.project_name);
        let channel = required_text(&mut errors, "channel", self.channel);
        let content_type = required_text(&mut errors, "type", self.content_type);
        let link = required_text(&mut errors, "link", self.link);

        match (project_name, channel, content_type, link) {
            (Some(project_name), Some(channel), Some(content_type), Some(link)) => {
                Ok(ContentDraft {
                    project_name,
                    channel,
                    content_type,
                    view_count: self.view_count,
                    segment: self.segment,
                    publication_date: self.publication_date,
                    client: self.client,
                    link,
                    description: self.description,
                }
                .normalized())
            }
            _ => Err(errors),
        }
    }
}

fn required_text(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<String>,
) -> Option<String> {
    match value {
        None => {
            errors.push(field, "field is required");
            None
        }
        Some(v) if v.trim().is_empty() => {
            errors.push(field, "must not be blank");
            None
        }
        Some(v) => Some(v.trim().to_owned()),
    }
}

// ---------------------------------------------------------------------------
// Update payload
// ---------------------------------------------------------------------------

// Option<Option<T>>: outer None = "not in request" (keep current),
// Some(None) = explicit null, Some(Some(v)) = set to value.
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateContentRequest {
    #[serde(default, deserialize_with = "present")]
    pub project_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub channel: Option<Option<String>>,
    #[serde(default, rename = "type", deserialize_with = "present")]
    pub content_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub view_count: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present")]
    pub segment: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub publication_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "present")]
    pub client: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub link: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
}

/// Marks a key as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl UpdateContentRequest {
    /// Converts the raw body into a patch with trimmed text.
    ///
    /// Required fields may be omitted, but when present they must be
    /// non-null and non-blank. Nullable fields accept an explicit `null`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] naming each required field sent as null
    /// or blank.
    pub fn validate(self) -> Result<ContentPatch, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let patch = ContentPatch {
            project_name: patched_required(&mut errors, "project_name", self.project_name),
            channel: patched_required(&mut errors, "channel", self.channel),
            content_type: patched_required(&mut errors, "type", self.content_type),
            view_count: self.view_count,
            segment: self.segment.map(trim_optional),
            publication_date: self.publication_date,
            client: self.client.map(trim_optional),
            link: patched_required(&mut errors, "link", self.link),
            description: self.description.map(trim_optional),
        };
        errors.into_result(patch)
    }
}

fn patched_required(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<Option<String>>,
) -> Option<String> {
    match value {
        None => None,
        Some(None) => {
            errors.push(field, "must not be null");
            None
        }
        Some(some) => required_text(errors, field, some),
    }
}

/// The fields a caller asked to change, and nothing else.
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentPatch {
    pub project_name: Option<String>,
    pub channel: Option<String>,
    pub content_type: Option<String>,
    pub view_count: Option<Option<i32>>,
    pub segment: Option<Option<String>>,
    pub publication_date: Option<Option<NaiveDate>>,
    pub client: Option<Option<String>>,
    pub link: Option<String>,
    pub description: Option<Option<String>>,
}

impl ContentPatch {
    /// Overlays the supplied fields onto `current` and returns the merged,
    /// trimmed draft. Fields absent from the patch keep their current value.
    #[must_use]
    pub fn apply(self, current: ContentDraft) -> ContentDraft {
        ContentDraft {
            project_name: self.project_name.unwrap_or(current.project_name),
            channel: self.channel.unwrap_or(current.channel),
            content_type: self.content_type.unwrap_or(current.content_type),
            view_count: self.view_count.unwrap_or(current.view_count),
            segment: self.segment.unwrap_or(current.segment),
            publication_date: self.publication_date.unwrap_or(current.publication_date),
            client: self.client.unwrap_or(current.client),
            link: self.link.unwrap_or(current.link),
            description: self.description.unwrap_or(current.description),
        }
        .normalized()
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    /// Applies defaults and range checks to raw `limit` / `offset` values.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] when `limit` is outside `1..=200` or
    /// `offset` is negative.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let page = Self::checked(&mut errors, limit, offset);
        errors.into_result(page)
    }

    /// Like [`Page::new`], but takes the raw query-string values.
    ///
    /// Empty values count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] when a value is not an integer or is out
    /// of range.
    pub fn parse(limit: Option<&str>, offset: Option<&str>) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let limit = parse_integer(&mut errors, "limit", limit);
        let offset = parse_integer(&mut errors, "offset", offset);
        let page = Self::checked(&mut errors, limit, offset);
        errors.into_result(page)
    }

    fn checked(errors: &mut ValidationErrors, limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if !(1..=MAX_LIMIT).contains(&limit) {
            errors.push("limit", format!("must be between 1 and {MAX_LIMIT}"));
        }

        let offset = offset.unwrap_or(0);
        if offset < 0 {
            errors.push("offset", "must be greater than or equal to 0");
        }

        Self { limit, offset }
    }
}

fn parse_integer(errors: &mut ValidationErrors, field: &str, raw: Option<&str>) -> Option<i64> {
    let raw = raw.map(str::trim).filter(|v| !v.is_empty())?;
    match raw.parse::<i64>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(field, "must be an integer");
            None
        }
    }
}

#[cfg(test)]
#[path = "content_test.rs"]
mod tests;
