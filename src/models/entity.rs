use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One monitored repository, identified by its owner namespace and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackedEntity {
    pub owner: String,
    pub repo: String,
}

impl TrackedEntity {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Result<Self, LedgerError> {
        let owner = owner.into().trim().to_string();
        let repo = repo.into().trim().to_string();

        if !is_path_segment(&owner) || !is_path_segment(&repo) {
            return Err(LedgerError::InvalidEntity(format!("owner={owner:?} repo={repo:?}")));
        }

        Ok(Self { owner, repo })
    }

    /// `owner/repo`, as used in API paths and report lines.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// GitHub owner and repository names use `[A-Za-z0-9._-]`. Anything else
/// would change the meaning of the request path.
fn is_path_segment(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

impl fmt::Display for TrackedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A `repositories` entry as written in the config file. Both fields are
/// optional here so one bad entry does not fail the whole file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryEntry {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
}

impl RepositoryEntry {
    pub fn validate(&self) -> Result<TrackedEntity, LedgerError> {
        match (self.owner.as_deref(), self.repo.as_deref()) {
            (Some(owner), Some(repo)) => TrackedEntity::new(owner, repo),
            _ => Err(LedgerError::InvalidEntity(format!(
                "owner={:?} repo={:?}",
                self.owner, self.repo
            ))),
        }
    }
}
