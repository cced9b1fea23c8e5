use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{error, info};
use url::Url;

use super::types::{Branch, GitlabApi, MergeRequestDetails};
use crate::error::Error;

const PAGE_SIZE: &str = "100";
const NEXT_PAGE_HEADER: &str = "x-next-page";
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// REST client for a single GitLab project.
#[derive(Debug, Clone)]
pub struct GitlabClient {
  http_client: HttpClient,
  project_url: Url,
  token: String,
}

impl GitlabClient {
  pub fn new(base_url: &str, project: &str, token: &str) -> Result<Self, Error> {
    Self::with_http_client(HttpClient::builder(), base_url, project, token)
  }

  fn with_http_client(
    builder: reqwest::ClientBuilder,
    base_url: &str,
    project: &str,
    token: &str,
  ) -> Result<Self, Error> {
    if project.is_empty() {
      return Err(Error::Config("a GitLab project path or id is required".to_string()));
    }
    let mut project_url = Url::parse(base_url)?;
    project_url
      .path_segments_mut()
      .map_err(|_| Error::Config(format!("{base_url} cannot be used as a GitLab base url")))?
      .pop_if_empty()
      .extend(["api", "v4", "projects", project]);

    let http_client = builder
      .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(Error::Http)?;

    Ok(GitlabClient { http_client, project_url, token: token.to_string() })
  }

  pub fn project_url(&self) -> &Url {
    &self.project_url
  }

  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.project_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.extend(segments);
    }
    url
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    self.http_client.request(method, url).header(TOKEN_HEADER, &self.token)
  }

  async fn post<T: DeserializeOwned, B: Serialize>(&self, url: Url, body: &B) -> Result<T, Error> {
    let response = self.request(Method::POST, url).json(body).send().await?;
    handle_response(response).await
  }

  async fn fetch_branch_pages(&self, search: Option<String>) -> Result<Vec<Branch>, Error> {
    let url = self.endpoint(&["repository", "branches"]);
    let mut branches = Vec::new();
    let mut page = String::from("1");

    loop {
      let mut query = vec![("per_page", PAGE_SIZE.to_string()), ("page", page.clone())];
      if let Some(search) = &search {
        query.push(("search", search.clone()));
      }
      let response = self.request(Method::GET, url.clone()).query(&query).send().await?;
      let next_page = response
        .headers()
        .get(NEXT_PAGE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from);

      let mut batch: Vec<Branch> = handle_response(response).await?;
      branches.append(&mut batch);

      match next_page {
        Some(next) => page = next,
        None => break,
      }
    }

    Ok(branches)
  }
}

async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
  let status = response.status();
  let text = response.text().await?;
  if status.is_success() {
    return Ok(serde_json::from_str(&text)?);
  }
  Err(Error::Api { status: status.as_u16(), message: text })
}

#[async_trait]
impl GitlabApi for GitlabClient {
  async fn fetch_branches(&self, name_patterns: &[String]) -> Result<Vec<Branch>, Error> {
    if name_patterns.is_empty() {
      info!("Fetching all branches of {}", self.project_url);
      return self.fetch_branch_pages(None).await;
    }

    let mut branches: Vec<Branch> = Vec::new();
    for pattern in name_patterns {
      info!("Fetching branches matching ^{}", pattern);
      let search = (!pattern.is_empty()).then(|| format!("^{pattern}"));
      for branch in self.fetch_branch_pages(search).await? {
        if !branches.iter().any(|known| known.name == branch.name) {
          branches.push(branch);
        }
      }
    }
    Ok(branches)
  }

  async fn create_merge_request(&self, source: &str, target: &str, title: &str) -> Result<MergeRequestDetails, Error> {
    info!("Creating merge request {} -> {}", source, target);
    let body = json!({
      "source_branch": source,
      "target_branch": target,
      "title": title,
      "remove_source_branch": true,
    });
    match self.post::<MergeRequestDetails, _>(self.endpoint(&["merge_requests"]), &body).await {
      Err(Error::Api { status, message }) if status == StatusCode::CONFLICT.as_u16() => {
        info!("GitLab rejected merge request from {}: {}", source, message);
        Err(Error::MergeRequestAlreadyExists)
      },
      Err(err) => {
        error!("Failed to create merge request from {}: {}", source, err);
        Err(err)
      },
      ok => ok,
    }
  }

  async fn create_merge_request_note(&self, merge_request_iid: u64, body: &str) -> Result<(), Error> {
    let iid = merge_request_iid.to_string();
    let url = self.endpoint(&["merge_requests", &iid, "notes"]);
    let _: serde_json::Value = self.post(url, &json!({ "body": body })).await?;
    info!("Added note to merge request !{}", merge_request_iid);
    Ok(())
  }
}
