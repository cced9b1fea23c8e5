use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::{Constraint, Layout, Margin, Rect};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{error, info};

use crate::{
  action::Action,
  components::{
    Component,
    error_view::ErrorView,
    layout::{CONTENT_HORIZONTAL_MARGIN, LayoutContext, STATUS_BAR_HEIGHT},
    merge_workflow::MergeWorkflow,
    status_bar::StatusBar,
  },
  config::Config,
  gitlab::{GitlabApi, GitlabClient},
  mode::Mode,
  tui::{self, Frame, Tui},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
  Branches,
  Error,
}

pub struct App {
  pub config: Config,
  pub api: Arc<dyn GitlabApi>,
  pub merge_workflow: MergeWorkflow,
  pub status_bar: StatusBar,
  pub error_view: ErrorView,
  pub tick_rate: f64,
  pub frame_rate: f64,
  pub should_quit: bool,
  pub should_suspend: bool,
  pub mode: Mode,
  pub view: View,
}

impl App {
  pub fn new(config: Config, tick_rate: f64, frame_rate: f64) -> Result<Self> {
    let token = config.gitlab.token.clone().unwrap_or_default();
    let client = GitlabClient::new(&config.gitlab.url, &config.gitlab.project, &token)?;
    info!("Using GitLab project {}", client.project_url());
    Ok(Self::with_api(config, Arc::new(client), tick_rate, frame_rate))
  }

  pub fn with_api(config: Config, api: Arc<dyn GitlabApi>, tick_rate: f64, frame_rate: f64) -> Self {
    // Replaced by the real terminal size as soon as the loop starts.
    let context = LayoutContext::new(0, 0, config.workflow.table_page_size);
    let merge_workflow = MergeWorkflow::new(api.clone(), config.workflow.clone(), context);
    Self {
      config,
      api,
      merge_workflow,
      status_bar: StatusBar::default(),
      error_view: ErrorView::default(),
      tick_rate,
      frame_rate,
      should_quit: false,
      should_suspend: false,
      mode: Mode::Default,
      view: View::Branches,
    }
  }

  fn components(&mut self) -> [&mut dyn Component; 3] {
    [&mut self.merge_workflow, &mut self.status_bar, &mut self.error_view]
  }

  fn focused(&mut self) -> &mut dyn Component {
    match self.view {
      View::Branches => &mut self.merge_workflow,
      View::Error => &mut self.error_view,
    }
  }

  /// Target branches come from the configured patterns, independently of the
  /// user's own branches.
  fn load_target_branches(&self, action_tx: UnboundedSender<Action>) {
    let api = self.api.clone();
    let patterns = self.config.workflow.target_branch_patterns.clone();
    tokio::spawn(async move {
      let action = match api.fetch_branches(&patterns).await {
        Ok(branches) => {
          info!("Loaded {} target branches", branches.len());
          Action::TargetBranchesLoaded(branches)
        },
        Err(err) => {
          error!("Failed to fetch target branches: {}", err);
          Action::Error(format!("Failed to fetch target branches: {err}"))
        },
      };
      let _ = action_tx.send(action);
    });
  }

  fn global_action(&self, key: KeyEvent) -> Option<Action> {
    if self.mode != Mode::Default {
      return None;
    }
    match key {
      KeyEvent { code: KeyCode::Char('q'), .. } => Some(Action::Quit),
      KeyEvent { code: KeyCode::Char('c' | 'C'), modifiers: KeyModifiers::CONTROL, .. } => Some(Action::Quit),
      KeyEvent { code: KeyCode::Char('z' | 'Z'), modifiers: KeyModifiers::CONTROL, .. } => Some(Action::Suspend),
      _ => None,
    }
  }

  /// Applies an action to the application state and hands it to every component.
  pub async fn update(&mut self, action: Action, action_tx: &UnboundedSender<Action>) -> Result<()> {
    match &action {
      Action::StartInputMode => self.mode = Mode::Input,
      Action::EndInputMode => self.mode = Mode::Default,
      Action::Quit => self.should_quit = true,
      Action::Suspend => self.should_suspend = true,
      Action::Resume => self.should_suspend = false,
      Action::Error(message) => {
        error!("{}", message);
        self.view = View::Error;
      },
      Action::ExitError => {
        self.view = View::Branches;
        action_tx.send(Action::Render)?;
      },
      Action::Resize(width, height) => {
        let context = LayoutContext::new(*width, *height, self.config.workflow.table_page_size);
        action_tx.send(Action::ContextUpdated(context))?;
      },
      _ => {},
    }

    for component in self.components() {
      if let Some(follow_up) = component.update(action.clone()).await? {
        action_tx.send(follow_up)?;
      }
    }
    Ok(())
  }

  fn draw(&mut self, frame: &mut Frame<'_>, area: Rect) -> Result<()> {
    let [main, status] = Layout::vertical([Constraint::Min(1), Constraint::Length(STATUS_BAR_HEIGHT)]).areas(area);
    let main = main.inner(Margin::new(CONTENT_HORIZONTAL_MARGIN, 0));

    match self.view {
      View::Branches => self.merge_workflow.draw(frame, main)?,
      View::Error => self.error_view.draw(frame, main)?,
    }
    self.status_bar.draw(frame, status)
  }

  fn render(&mut self, tui: &mut Tui, action_tx: &UnboundedSender<Action>) -> Result<()> {
    tui.draw(|f| {
      if let Err(e) = self.draw(f, f.area()) {
        let _ = action_tx.send(Action::Error(format!("Failed to draw: {:?}", e)));
      }
    })?;
    Ok(())
  }

  pub async fn run(&mut self) -> Result<()> {
    let (action_tx, mut action_rx) = mpsc::unbounded_channel();

    let mut tui = tui::Tui::new()?.tick_rate(self.tick_rate).frame_rate(self.frame_rate);
    tui.enter()?;

    for component in self.components() {
      component.register_action_handler(action_tx.clone())?;
    }
    let size = tui.size()?;
    action_tx.send(Action::Resize(size.width, size.height))?;
    for component in self.components() {
      component.init()?;
    }
    self.load_target_branches(action_tx.clone());

    loop {
      if let Some(e) = tui.next().await {
        match e {
          tui::Event::Quit => action_tx.send(Action::Quit)?,
          tui::Event::Tick => action_tx.send(Action::Tick)?,
          tui::Event::Render => action_tx.send(Action::Render)?,
          tui::Event::Resize(x, y) => action_tx.send(Action::Resize(x, y))?,
          tui::Event::Key(key) => {
            if let Some(action) = self.global_action(key) {
              action_tx.send(action)?;
            }
          },
          _ => {},
        }

        if let Some(action) = self.focused().handle_events(Some(e.clone())).await? {
          action_tx.send(action)?;
        }
      }

      while let Ok(action) = action_rx.try_recv() {
        if action != Action::Tick && action != Action::Render {
          log::debug!("{action:?}");
        }

        match action {
          Action::Resize(w, h) => {
            tui.resize(Rect::new(0, 0, w, h))?;
            self.render(&mut tui, &action_tx)?;
          },
          Action::Render => self.render(&mut tui, &action_tx)?,
          Action::ClearScreen => tui.terminal.clear()?,
          _ => {},
        }
        self.update(action, &action_tx).await?;
      }

      if self.should_suspend {
        tui.suspend()?;
        action_tx.send(Action::Resume)?;
        action_tx.send(Action::ClearScreen)?;
        tui = Tui::new()?.tick_rate(self.tick_rate).frame_rate(self.frame_rate);
        tui.enter()?;
      } else if self.should_quit {
        tui.stop()?;
        break;
      }
    }
    tui.exit()?;
    Ok(())
  }
}
