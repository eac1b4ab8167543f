//! Domain model: jobs, the techs working them, and the diagnostic timer
//!
//! A [`Job`] owns its [`Tech`]s exclusively. Techs are created through their
//! parent and disappear with it; there is no standalone tech deletion.
//!
//! The serialized shape is the JSON contract polled by dashboard clients:
//!
//! ```json
//! {
//!   "id": "5f0c...",
//!   "title": "Brake job",
//!   "quotedHours": 2.5,
//!   "timeSpent": 0.75,
//!   "diagnostic": { "time": 0.1, "isRunning": false },
//!   "techs": [{ "id": "9a1e...", "name": "Sam", "isWorking": true, "startTime": 1700000000000 }],
//!   "order": 0
//! }
//! ```

pub mod hours;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh random identifier
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Borrow the identifier as a string slice
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

opaque_id!(
    /// Opaque job identifier, immutable after creation
    JobId
);

opaque_id!(
    /// Opaque tech identifier, unique within its parent job
    TechId
);

/// A unit of repair work with a quoted time budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Job identifier
    pub id: JobId,
    /// Display title
    pub title: String,
    /// Contracted time budget in hours
    pub quoted_hours: f64,
    /// Pooled labor time in hours
    pub time_spent: f64,
    /// Secondary, unclamped diagnostic timer
    pub diagnostic: Diagnostic,
    /// Display rank among jobs
    pub order: u32,
    /// Techs attached to this job, in the order they were added
    pub techs: Vec<Tech>,
}

impl Job {
    /// Create a job with no accrued time, a stopped diagnostic timer and no techs
    #[must_use]
    pub fn new(title: impl Into<String>, quoted_hours: f64, order: u32) -> Self {
        Self {
            id: JobId::generate(),
            title: title.into(),
            quoted_hours,
            time_spent: 0.0,
            diagnostic: Diagnostic::default(),
            order,
            techs: Vec::new(),
        }
    }

    /// Number of techs currently marked working
    #[must_use]
    pub fn active_tech_count(&self) -> usize {
        self.techs.iter().filter(|tech| tech.is_working).count()
    }

    /// Look up a tech by id
    #[must_use]
    pub fn tech(&self, id: &TechId) -> Option<&Tech> {
        self.techs.iter().find(|tech| &tech.id == id)
    }

    /// Mutable lookup of a tech by id
    pub fn tech_mut(&mut self, id: &TechId) -> Option<&mut Tech> {
        self.techs.iter_mut().find(|tech| &tech.id == id)
    }

    /// Whether labor time has reached the quote
    #[must_use]
    pub fn is_at_quote(&self) -> bool {
        self.time_spent >= self.quoted_hours
    }
}

/// Technician attached to a single job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tech {
    /// Tech identifier
    pub id: TechId,
    /// Display name
    pub name: String,
    /// Whether the tech is currently accruing labor on the job
    pub is_working: bool,
    /// When the tech last started working; audit marker only
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub start_time: Option<DateTime<Utc>>,
}

impl Tech {
    /// Create a stopped tech
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TechId::generate(),
            name: name.into(),
            is_working: false,
            start_time: None,
        }
    }

    /// Flip between stopped and working
    ///
    /// Entering the working state stamps `start_time` with `at`; leaving it
    /// clears the stamp. The flip is unconditional.
    pub fn toggle(&mut self, at: DateTime<Utc>) {
        self.is_working = !self.is_working;
        self.start_time = self.is_working.then_some(at);
    }
}

/// Per-job diagnostic timer
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Accumulated diagnostic time in hours
    pub time: f64,
    /// Whether the timer is running
    pub is_running: bool,
}

impl Diagnostic {
    /// Flip between stopped and running
    pub fn toggle(&mut self) {
        self.is_running = !self.is_running;
    }
}
