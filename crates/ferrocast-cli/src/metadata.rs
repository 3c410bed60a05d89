use std::fmt::{Display, Formatter};

use ferrocast_core::UtcDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Run identifier (UUID v4) attached to every document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Document metadata. Field order is fixed to keep JSON output stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub run_id: RunId,
    pub generated_at: UtcDateTime,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl Metadata {
    pub fn new(generated_at: UtcDateTime) -> Self {
        Self {
            run_id: RunId::new_v4(),
            generated_at,
            warnings: Vec::new(),
        }
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}
