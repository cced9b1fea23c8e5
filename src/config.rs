use std::path::PathBuf;

use color_eyre::eyre::{Result, eyre};
use config::FileFormat;
use serde::Deserialize;

use crate::utils::{PROJECT_NAME, get_config_dir, get_data_dir};

const CONFIG: &str = include_str!("../.config/config.json5");

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AppConfig {
  #[serde(default)]
  pub data_dir: PathBuf,
  #[serde(default)]
  pub config_dir: PathBuf,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GitlabConfig {
  #[serde(default)]
  pub url: String,
  #[serde(default)]
  pub project: String,
  #[serde(default)]
  pub token: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct WorkflowConfig {
  #[serde(default)]
  pub user_branch_prefix: String,
  #[serde(default)]
  pub favourite_branches: Vec<String>,
  #[serde(default)]
  pub table_page_size: usize,
  #[serde(default)]
  pub target_branch_patterns: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
  #[serde(default, flatten)]
  pub config: AppConfig,
  #[serde(default)]
  pub gitlab: GitlabConfig,
  #[serde(default)]
  pub workflow: WorkflowConfig,
}

/// `MERGE_MATE_<SECTION>__<KEY>` variables; list settings take comma separated values.
fn environment() -> config::Environment {
  config::Environment::with_prefix(PROJECT_NAME.as_str())
    .prefix_separator("_")
    .separator("__")
    .try_parsing(true)
    .list_separator(",")
    .with_list_parse_key("workflow.favourite_branches")
    .with_list_parse_key("workflow.target_branch_patterns")
}

impl Config {
  /// Layers the embedded defaults, the user's config files and
  /// `MERGE_MATE_<SECTION>__<KEY>` environment variables.
  pub fn new() -> Result<Self, config::ConfigError> {
    let data_dir = get_data_dir();
    let config_dir = get_config_dir();
    let mut builder = config::Config::builder()
      .add_source(config::File::from_str(CONFIG, FileFormat::Json5))
      .set_default("data_dir", data_dir.to_string_lossy().to_string())?
      .set_default("config_dir", config_dir.to_string_lossy().to_string())?;

    let config_files = [
      ("config.json5", FileFormat::Json5),
      ("config.json", FileFormat::Json),
      ("config.yaml", FileFormat::Yaml),
      ("config.toml", FileFormat::Toml),
      ("config.ini", FileFormat::Ini),
    ];
    let mut found_config = false;
    for (file, format) in &config_files {
      builder = builder.add_source(config::File::from(config_dir.join(file)).format(*format).required(false));
      if config_dir.join(file).exists() {
        found_config = true
      }
    }
    if !found_config {
      log::info!("No configuration file found in {}, using defaults", config_dir.display());
    }
    builder = builder.add_source(environment());

    builder.build()?.try_deserialize()
  }

  /// Checks that everything needed to talk to GitLab is present.
  pub fn validate(&self) -> Result<()> {
    if self.gitlab.url.trim().is_empty() {
      return Err(eyre!("GitLab url is not configured (gitlab.url or --gitlab-url)"));
    }
    if self.gitlab.project.trim().is_empty() {
      return Err(eyre!("GitLab project is not configured (gitlab.project or --project)"));
    }
    if self.gitlab.token.as_deref().is_none_or(|token| token.trim().is_empty()) {
      return Err(eyre!("GitLab token is not configured (gitlab.token, --token or GITLAB_TOKEN)"));
    }
    Ok(())
  }
}
