use clap::Parser;

use crate::{config::Config, utils::version};

#[derive(Parser, Debug, Default)]
#[command(author, version = version(), about)]
pub struct Cli {
  #[arg(short, long, value_name = "FLOAT", help = "Tick rate, i.e. number of ticks per second", default_value_t = 4.0)]
  pub tick_rate: f64,

  #[arg(short, long, value_name = "FLOAT", help = "Frame rate, i.e. number of frames per second", default_value_t = 30.0)]
  pub frame_rate: f64,

  #[arg(long, value_name = "URL", help = "Base url of the GitLab instance")]
  pub gitlab_url: Option<String>,

  #[arg(short, long, value_name = "PATH", help = "Project path or id, e.g. group/project")]
  pub project: Option<String>,

  #[arg(long, value_name = "TOKEN", env = "GITLAB_TOKEN", hide_env_values = true, help = "Personal access token")]
  pub token: Option<String>,

  #[arg(short, long, value_name = "PREFIX", help = "Only list your branches starting with this prefix")]
  pub branch_prefix: Option<String>,

  #[arg(long = "favourite", value_name = "BRANCH", help = "Favourite target branch, repeat to add more")]
  pub favourites: Vec<String>,
}

impl Cli {
  /// Command line values take precedence over every configuration layer.
  pub fn apply(&self, config: &mut Config) {
    if let Some(url) = &self.gitlab_url {
      config.gitlab.url = url.clone();
    }
    if let Some(project) = &self.project {
      config.gitlab.project = project.clone();
    }
    if let Some(token) = &self.token {
      config.gitlab.token = Some(token.clone());
    }
    if let Some(prefix) = &self.branch_prefix {
      config.workflow.user_branch_prefix = prefix.clone();
    }
    if !self.favourites.is_empty() {
      config.workflow.favourite_branches = self.favourites.clone();
    }
  }
}
