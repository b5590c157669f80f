//! Organization and project metadata.

use serde::{Deserialize, Serialize};

use super::opaque_text;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrgStatus {
    #[serde(default, deserialize_with = "opaque_text")]
    pub id: String,
    #[serde(default, deserialize_with = "opaque_text")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(deserialize_with = "opaque_text")]
    pub id: String,
    pub slug: String,
    #[serde(default, deserialize_with = "opaque_text")]
    pub name: String,
    #[serde(default)]
    pub status: OrgStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(deserialize_with = "opaque_text")]
    pub id: String,
    pub slug: String,
    #[serde(default, deserialize_with = "opaque_text")]
    pub name: String,
    #[serde(default, deserialize_with = "opaque_text")]
    pub status: String,
    #[serde(default, deserialize_with = "opaque_text")]
    pub platform: String,
}

/// Which projects a snapshot covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectSelector {
    /// Every project listed under the organization.
    All,
    /// Explicit slugs, fetched one by one in this order.
    Named(Vec<String>),
}

impl ProjectSelector {
    /// Empty slug lists select all projects.
    pub fn from_slugs<I, S>(slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slugs: Vec<String> = slugs
            .into_iter()
            .map(Into::into)
            .filter(|s| !s.trim().is_empty())
            .collect();
        if slugs.is_empty() {
            ProjectSelector::All
        } else {
            ProjectSelector::Named(slugs)
        }
    }
}
