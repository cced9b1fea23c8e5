use std::sync::Mutex;

use async_trait::async_trait;

use super::{Branch, GitlabApi, MergeRequestDetails};
use crate::error::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CreateBehaviour {
  #[default]
  Succeed,
  AlreadyExists,
  ConnectionFailure,
  OtherFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCall {
  pub source: String,
  pub target: String,
  pub title: String,
}

#[derive(Debug, Default)]
pub struct MockGitlabApi {
  branches: Vec<Branch>,
  fail_fetch: bool,
  create_behaviour: CreateBehaviour,
  fail_note: bool,
  fetch_calls: Mutex<Vec<Vec<String>>>,
  create_calls: Mutex<Vec<CreateCall>>,
  note_calls: Mutex<Vec<(u64, String)>>,
}

impl MockGitlabApi {
  pub fn with_branches(branches: Vec<Branch>) -> Self {
    MockGitlabApi { branches, ..Default::default() }
  }

  pub fn failing_fetch(mut self) -> Self {
    self.fail_fetch = true;
    self
  }

  pub fn creating(mut self, behaviour: CreateBehaviour) -> Self {
    self.create_behaviour = behaviour;
    self
  }

  pub fn failing_note(mut self) -> Self {
    self.fail_note = true;
    self
  }

  pub fn fetch_calls(&self) -> Vec<Vec<String>> {
    self.fetch_calls.lock().unwrap().clone()
  }

  pub fn create_calls(&self) -> Vec<CreateCall> {
    self.create_calls.lock().unwrap().clone()
  }

  pub fn note_calls(&self) -> Vec<(u64, String)> {
    self.note_calls.lock().unwrap().clone()
  }
}

#[async_trait]
impl GitlabApi for MockGitlabApi {
  async fn fetch_branches(&self, name_patterns: &[String]) -> Result<Vec<Branch>, Error> {
    self.fetch_calls.lock().unwrap().push(name_patterns.to_vec());
    if self.fail_fetch {
      return Err(Error::Connection("connection refused".to_string()));
    }
    Ok(self.branches.clone())
  }

  async fn create_merge_request(&self, source: &str, target: &str, title: &str) -> Result<MergeRequestDetails, Error> {
    self.create_calls.lock().unwrap().push(CreateCall {
      source: source.to_string(),
      target: target.to_string(),
      title: title.to_string(),
    });
    match self.create_behaviour {
      CreateBehaviour::Succeed => Ok(MergeRequestDetails {
        id: 100,
        iid: 7,
        title: title.to_string(),
        source_branch: source.to_string(),
        target_branch: target.to_string(),
        web_url: "https://gitlab.example.com/group/project/-/merge_requests/7".to_string(),
        state: "opened".to_string(),
      }),
      CreateBehaviour::AlreadyExists => Err(Error::MergeRequestAlreadyExists),
      CreateBehaviour::ConnectionFailure => Err(Error::Connection("dns error".to_string())),
      CreateBehaviour::OtherFailure => Err(Error::Api { status: 500, message: "internal server error".to_string() }),
    }
  }

  async fn create_merge_request_note(&self, merge_request_iid: u64, body: &str) -> Result<(), Error> {
    self.note_calls.lock().unwrap().push((merge_request_iid, body.to_string()));
    if self.fail_note {
      return Err(Error::Api { status: 403, message: "forbidden".to_string() });
    }
    Ok(())
  }
}
