pub mod client;
pub mod merge_request;
#[cfg(test)]
pub mod mock_gitlab;
pub mod types;

pub use client::GitlabClient;
pub use merge_request::{MergeRequestFailure, MergeRequestOutcome, open_merge_request, shorten_title};
pub use types::{Branch, Commit, GitlabApi, MergeRequestDetails};
