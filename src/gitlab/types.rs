use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
  pub message: String,
  #[serde(rename = "authored_date")]
  pub authored_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
  pub name: String,
  #[serde(rename = "default", default)]
  pub is_default: bool,
  #[serde(rename = "commit")]
  pub last_commit: Commit,
}

impl Branch {
  pub fn new(name: impl Into<String>, message: impl Into<String>, authored_at: DateTime<Utc>) -> Self {
    Branch { name: name.into(), is_default: false, last_commit: Commit { message: message.into(), authored_at } }
  }

  pub fn into_default(mut self) -> Self {
    self.is_default = true;
    self
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequestDetails {
  pub id: u64,
  pub iid: u64,
  pub title: String,
  pub source_branch: String,
  pub target_branch: String,
  #[serde(default)]
  pub web_url: String,
  #[serde(default)]
  pub state: String,
}

/// The subset of the GitLab API the merge workflow needs.
///
/// Implementations report failures as [`Error`] values; callers classify them
/// before anything reaches the UI.
#[async_trait]
pub trait GitlabApi: Send + Sync {
  /// Lists branches whose names start with any of the given patterns, in the
  /// order GitLab returns them. An empty pattern list returns every branch.
  async fn fetch_branches(&self, name_patterns: &[String]) -> Result<Vec<Branch>, Error>;
  async fn create_merge_request(&self, source: &str, target: &str, title: &str) -> Result<MergeRequestDetails, Error>;
  async fn create_merge_request_note(&self, merge_request_iid: u64, body: &str) -> Result<(), Error>;
}
