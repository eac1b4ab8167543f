//! Request bodies for job and tech mutations

use crate::model::JobId;
use crate::store::JobChanges;
use serde::Deserialize;
use validator::{Validate, ValidationError};

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}

/// Body of `POST /api/jobs`
///
/// Missing fields deserialize to blank/zero so they surface as validation
/// errors rather than parse errors.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateJob {
    /// Job title
    #[validate(custom(function = "not_blank"))]
    pub title: String,

    /// Quoted budget in hours
    #[validate(range(exclusive_min = 0.0, message = "must be greater than zero"))]
    pub quoted_hours: f64,
}

/// Body of `PUT /api/jobs/{id}`
///
/// Only the editable fields are read; anything else in the body (clients
/// often send the whole job back) is ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateJob {
    /// New title
    #[validate(custom(function = "not_blank"))]
    pub title: Option<String>,

    /// New quoted budget in hours
    #[validate(range(exclusive_min = 0.0, message = "must be greater than zero"))]
    pub quoted_hours: Option<f64>,
}

impl UpdateJob {
    pub(crate) fn into_changes(self) -> JobChanges {
        JobChanges {
            title: self.title.map(|title| title.trim().to_string()),
            quoted_hours: self.quoted_hours,
        }
    }
}

/// Body of `POST /api/jobs/{id}/techs`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct AddTech {
    /// Tech display name
    #[validate(custom(function = "not_blank"))]
    pub name: String,
}

/// Reference to a job inside a reorder request
///
/// Clients may send bare ids or whole job objects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum JobRef {
    /// Bare job id
    Id(JobId),
    /// Any object carrying an `id`
    Job {
        /// Job id
        id: JobId,
    },
}

impl JobRef {
    /// The referenced job id
    #[must_use]
    pub const fn id(&self) -> &JobId {
        match self {
            Self::Id(id) | Self::Job { id } => id,
        }
    }
}

/// Body of `POST /api/jobs/reorder`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct Reorder {
    /// Jobs in their new display order
    pub jobs: Vec<JobRef>,
}
