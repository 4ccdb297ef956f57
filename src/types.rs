use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

// Rate-limit metadata read from REST response headers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RateMeta {
    pub remaining: Option<i32>,
    pub used: Option<i32>,
    pub reset_at: Option<String>,
}

/// A validated `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Accepts exactly two non-empty `/`-separated segments; anything else is rejected
    /// before a request is made.
    pub fn parse(value: &str) -> Result<Self> {
        let mut parts = value.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
                Ok(Self {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
            _ => Err(Error::InvalidRepository {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
