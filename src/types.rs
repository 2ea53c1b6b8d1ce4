use crate::error::{GitHubStarsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw statistics object returned by `GET /repos/{owner}/{name}`.
pub type RepositoryStats = serde_json::Map<String, serde_json::Value>;

pub type StarCount = u64;

/// A repository named as `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryIdentifier {
    owner: String,
    name: String,
}

impl RepositoryIdentifier {
    pub fn parse(full_name: &str) -> Result<Self> {
        let parts: Vec<&str> = full_name.split('/').collect();
        if parts.len() != 2 {
            return Err(GitHubStarsError::InvalidRepoUrl(format!(
                "expected owner/name, got {:?}",
                full_name
            )));
        }

        let (owner, name) = (parts[0], parts[1]);
        // `.` and `..` would be collapsed out of the request path
        let valid = |part: &str| {
            !part.is_empty()
                && part != "."
                && part != ".."
                && !part.chars().any(char::is_whitespace)
        };
        if !valid(owner) || !valid(name) {
            return Err(GitHubStarsError::InvalidRepoUrl(format!(
                "expected owner/name, got {:?}",
                full_name
            )));
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryIdentifier {
    type Err = GitHubStarsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RepositoryIdentifier {
    type Error = GitHubStarsError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<RepositoryIdentifier> for String {
    fn from(value: RepositoryIdentifier) -> Self {
        value.full_name()
    }
}
