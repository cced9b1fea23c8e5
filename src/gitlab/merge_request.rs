use thiserror::Error;
use tracing::{error, info};

use super::{GitlabApi, MergeRequestDetails};
use crate::error::Error as GitlabError;

/// Quick action asking GitLab to merge once the pipeline succeeds.
pub const MERGE_AUTOMATICALLY_NOTE: &str = "/merge";

const MAX_TITLE_CHARS: usize = 255;
const SHORTENED_TITLE_CHARS: usize = 250;

/// A failed merge request creation, already phrased for the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeRequestFailure {
  #[error("merge request from branch {source_branch} already exists")]
  AlreadyExists { source_branch: String },
  #[error("merge request creation failed, please check your network connection")]
  Connectivity,
  #[error("unrecognized error when creating merge request, please check log file")]
  Unclassified,
}

impl MergeRequestFailure {
  pub fn classify(err: &GitlabError, source_branch: &str) -> Self {
    match err {
      GitlabError::MergeRequestAlreadyExists => {
        MergeRequestFailure::AlreadyExists { source_branch: source_branch.to_string() }
      },
      GitlabError::Connection(_) => MergeRequestFailure::Connectivity,
      other => {
        error!("Error when creating merge request from {}: {}", source_branch, other);
        MergeRequestFailure::Unclassified
      },
    }
  }
}

pub type MergeRequestOutcome = Result<MergeRequestDetails, MergeRequestFailure>;

/// Keeps the first line of a commit message and caps it to GitLab's title length.
pub fn shorten_title(title: &str) -> String {
  let first_line = title.split('\n').next().unwrap_or_default().trim_end_matches('\r');
  if first_line.chars().count() > MAX_TITLE_CHARS {
    let mut shortened: String = first_line.chars().take(SHORTENED_TITLE_CHARS).collect();
    shortened.push_str("...");
    return shortened;
  }
  first_line.to_string()
}

/// Creates the merge request and asks GitLab to merge it automatically.
///
/// Only the creation decides the outcome. A failed automation note is logged
/// and the merge request is still reported as created.
pub async fn open_merge_request(api: &dyn GitlabApi, source: &str, target: &str, title: &str) -> MergeRequestOutcome {
  let title = shorten_title(title);
  let merge_request =
    api.create_merge_request(source, target, &title).await.map_err(|err| MergeRequestFailure::classify(&err, source))?;
  info!("Created merge request !{} {} -> {}", merge_request.iid, source, target);

  if let Err(err) = api.create_merge_request_note(merge_request.iid, MERGE_AUTOMATICALLY_NOTE).await {
    error!("Error when marking merge request !{} to be merged automatically: {}", merge_request.iid, err);
  }
  Ok(merge_request)
}
