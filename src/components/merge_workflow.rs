use std::sync::Arc;

use crossterm::event::KeyEvent;
use ratatui::layout::{Constraint, Layout, Rect};
use tokio::{sync::mpsc::UnboundedSender, task::spawn};
use tracing::{error, info, warn};

use crate::{
  action::Action,
  components::{
    Component,
    branch_view::BranchView,
    help_footer::HelpFooter,
    keys::BranchKeyMap,
    layout::{FOOTER_HEIGHT, LayoutContext, PaneWidths},
    target_picker::TargetPicker,
  },
  config::WorkflowConfig,
  gitlab::{GitlabApi, open_merge_request},
  mode::WorkflowMode,
  tui::Frame,
};

/// Owns the source branch table and the target picker, decides which of them
/// receives input and starts the GitLab calls behind the merge shortcuts.
pub struct MergeWorkflow {
  api: Arc<dyn GitlabApi>,
  settings: WorkflowConfig,
  context: LayoutContext,
  mode: WorkflowMode,
  branch_view: BranchView,
  target_picker: TargetPicker,
  keys: BranchKeyMap,
  help_footer: HelpFooter,
  pane_widths: PaneWidths,
  action_tx: Option<UnboundedSender<Action>>,
}

impl MergeWorkflow {
  pub fn new(api: Arc<dyn GitlabApi>, settings: WorkflowConfig, context: LayoutContext) -> Self {
    let keys = BranchKeyMap::new(&settings.favourite_branches);
    let mode = WorkflowMode::default();
    MergeWorkflow {
      api,
      context,
      mode,
      branch_view: BranchView::new(context.table_page_size),
      target_picker: TargetPicker::new(),
      keys,
      help_footer: HelpFooter::default(),
      pane_widths: context.pane_widths(mode),
      action_tx: None,
      settings,
    }
  }

  #[cfg(test)]
  pub(crate) fn mode(&self) -> WorkflowMode {
    self.mode
  }

  #[cfg(test)]
  pub(crate) fn pane_widths(&self) -> PaneWidths {
    self.pane_widths
  }

  #[cfg(test)]
  pub(crate) fn branch_view(&self) -> &BranchView {
    &self.branch_view
  }

  #[cfg(test)]
  pub(crate) fn target_picker(&self) -> &TargetPicker {
    &self.target_picker
  }

  fn set_mode(&mut self, mode: WorkflowMode) {
    if mode == WorkflowMode::PickingTarget {
      self.target_picker.reset_filter();
      self.target_picker.reset_selection();
    }
    self.mode = mode;
    self.recalculate_layout();
  }

  fn recalculate_layout(&mut self) {
    self.pane_widths = self.context.pane_widths(self.mode);
    self.branch_view.set_page_size(self.context.table_page_size);
  }

  fn load_user_branches(&self) {
    let Some(tx) = self.action_tx.clone() else {
      warn!("Cannot load branches before an action handler is registered");
      return;
    };
    let api = self.api.clone();
    let prefix = self.settings.user_branch_prefix.clone();

    spawn(async move {
      let action = match BranchView::load_branches(api.as_ref(), &prefix).await {
        Ok(branches) => {
          info!("Loaded {} branches", branches.len());
          Action::UserBranchesLoaded(branches)
        },
        Err(err) => {
          error!("Failed to fetch branches: {}", err);
          Action::Error(format!("Failed to fetch branches: {err}"))
        },
      };
      let _ = tx.send(action);
    });
  }

  /// Starts the creation in the background. Its outcome comes back through
  /// the action channel and is never cancelled.
  fn create_merge_request(&self, source: String, target: String, title: String) {
    let Some(tx) = self.action_tx.clone() else {
      warn!("Cannot create a merge request before an action handler is registered");
      return;
    };
    let api = self.api.clone();
    info!("Creating merge request {} -> {}", source, target);

    spawn(async move {
      let action = match open_merge_request(api.as_ref(), &source, &target, &title).await {
        Ok(merge_request) => Action::MergeRequestCreated(merge_request),
        Err(failure) => Action::MergeRequestFailed(failure.to_string()),
      };
      let _ = tx.send(action);
    });
  }

  fn highlighted_source(&self) -> Option<(String, String)> {
    self.branch_view.highlighted_branch().map(|branch| (branch.name.clone(), branch.last_commit.message.clone()))
  }

  fn merge_automatically(&mut self) -> Option<Action> {
    if self.mode != WorkflowMode::Browsing {
      return None;
    }
    self.set_mode(WorkflowMode::PickingTarget);
    Some(Action::Render)
  }

  fn close_picker(&mut self) -> Option<Action> {
    if self.mode != WorkflowMode::PickingTarget || self.target_picker.is_filtering() {
      return None;
    }
    self.set_mode(WorkflowMode::Browsing);
    Some(Action::Render)
  }

  fn confirm_target(&mut self) -> Option<Action> {
    if self.mode != WorkflowMode::PickingTarget || self.target_picker.is_filtering() {
      return None;
    }
    let target = self.target_picker.selected().map(|item| item.display_name.clone())?;
    let (source, title) = self.highlighted_source()?;

    self.create_merge_request(source, target, title);
    self.set_mode(WorkflowMode::Browsing);
    Some(Action::Render)
  }

  fn merge_to_favourite(&mut self, index: usize) -> Option<Action> {
    if self.mode != WorkflowMode::Browsing {
      return None;
    }
    let Some(target) = self.settings.favourite_branches.get(index).cloned() else {
      warn!("No favourite branch configured at position {}", index + 1);
      return None;
    };
    let (source, title) = self.highlighted_source()?;

    self.create_merge_request(source, target, title);
    None
  }
}

#[async_trait::async_trait]
impl Component for MergeWorkflow {
  fn register_action_handler(&mut self, tx: UnboundedSender<Action>) -> color_eyre::Result<()> {
    self.action_tx = Some(tx);
    Ok(())
  }

  fn init(&mut self) -> color_eyre::Result<()> {
    self.load_user_branches();
    Ok(())
  }

  async fn handle_key_events(&mut self, key: KeyEvent) -> color_eyre::Result<Option<Action>> {
    if self.mode == WorkflowMode::PickingTarget && self.target_picker.is_filtering() {
      return Ok(self.target_picker.handle_key_event(key));
    }
    if let Some(action) = self.keys.resolve(&key, self.mode) {
      return Ok(Some(action));
    }

    let action = match self.mode {
      WorkflowMode::Browsing => self.branch_view.handle_key_event(key).then_some(Action::Render),
      WorkflowMode::PickingTarget => self.target_picker.handle_key_event(key),
    };
    Ok(action)
  }

  async fn update(&mut self, action: Action) -> color_eyre::Result<Option<Action>> {
    let action = match action {
      Action::UserBranchesLoaded(branches) => {
        self.branch_view.apply_branches(branches);
        Some(Action::Render)
      },
      Action::TargetBranchesLoaded(branches) => {
        self.target_picker.apply_targets(branches);
        Some(Action::Render)
      },
      Action::ContextUpdated(context) => {
        self.context = context;
        self.recalculate_layout();
        None
      },
      Action::MergeAutomatically => self.merge_automatically(),
      Action::ClosePicker => self.close_picker(),
      Action::ConfirmTarget => self.confirm_target(),
      Action::MergeToFavourite(index) => self.merge_to_favourite(index),
      _ => None,
    };
    Ok(action)
  }

  fn draw(&mut self, frame: &mut Frame<'_>, area: Rect) -> color_eyre::Result<()> {
    let [panes, footer] = Layout::vertical([Constraint::Min(1), Constraint::Length(FOOTER_HEIGHT)]).areas(area);

    match self.mode {
      WorkflowMode::Browsing => self.branch_view.draw(frame, panes),
      WorkflowMode::PickingTarget => {
        let [table, picker] =
          Layout::horizontal([Constraint::Length(self.pane_widths.table), Constraint::Length(self.pane_widths.picker)])
            .areas(panes);
        self.branch_view.draw(frame, table);
        self.target_picker.draw(frame, picker);
      },
    }

    self.help_footer.render(frame, footer, &self.keys, self.mode);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use crossterm::event::{KeyCode, KeyModifiers};
  use pretty_assertions::assert_eq;
  use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

  use super::*;
  use crate::gitlab::{
    Branch,
    mock_gitlab::{CreateBehaviour, CreateCall, MockGitlabApi},
  };

  fn branch(name: &str, message: &str) -> Branch {
    Branch::new(name, message, Utc::now())
  }

  fn settings() -> WorkflowConfig {
    WorkflowConfig {
      user_branch_prefix: "feature/".to_string(),
      favourite_branches: vec!["main".to_string(), "release".to_string()],
      table_page_size: 20,
      target_branch_patterns: Vec::new(),
    }
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn setup(api: MockGitlabApi) -> (MergeWorkflow, Arc<MockGitlabApi>, UnboundedReceiver<Action>) {
    let api = Arc::new(api);
    let mut workflow = MergeWorkflow::new(api.clone(), settings(), LayoutContext::new(102, 40, 20));
    let (tx, rx) = unbounded_channel();
    workflow.register_action_handler(tx).unwrap();
    (workflow, api, rx)
  }

  async fn loaded(api: MockGitlabApi) -> (MergeWorkflow, Arc<MockGitlabApi>, UnboundedReceiver<Action>) {
    let (mut workflow, api, rx) = setup(api);
    workflow
      .update(Action::UserBranchesLoaded(vec![branch("feature/x", "add x\nlonger body"), branch("feature/y", "add y")]))
      .await
      .unwrap();
    workflow
      .update(Action::TargetBranchesLoaded(vec![branch("develop", "d"), branch("main", "m").into_default()]))
      .await
      .unwrap();
    (workflow, api, rx)
  }

  /// Runs a key through the same path as the event loop: key handling first,
  /// then the resulting action.
  async fn press(workflow: &mut MergeWorkflow, code: KeyCode) -> Option<Action> {
    let action = workflow.handle_key_events(key(code)).await.unwrap()?;
    match action {
      Action::Render | Action::StartInputMode | Action::EndInputMode => Some(action),
      other => workflow.update(other).await.unwrap(),
    }
  }

  #[tokio::test]
  async fn test_merge_automatically_opens_picker_and_close_restores_width() {
    let (mut workflow, _api, _rx) = loaded(MockGitlabApi::default()).await;
    assert_eq!(workflow.pane_widths(), PaneWidths { table: 100, picker: 0 });

    press(&mut workflow, KeyCode::Char('m')).await;

    assert_eq!(workflow.mode(), WorkflowMode::PickingTarget);
    assert_eq!(workflow.pane_widths(), PaneWidths { table: 70, picker: 30 });

    press(&mut workflow, KeyCode::Esc).await;

    assert_eq!(workflow.mode(), WorkflowMode::Browsing);
    assert_eq!(workflow.pane_widths(), PaneWidths { table: 100, picker: 0 });
  }

  #[tokio::test]
  async fn test_close_is_ignored_while_filtering() {
    let (mut workflow, _api, _rx) = loaded(MockGitlabApi::default()).await;
    press(&mut workflow, KeyCode::Char('m')).await;
    assert_eq!(press(&mut workflow, KeyCode::Char('/')).await, Some(Action::StartInputMode));

    let escaped = workflow.update(Action::ClosePicker).await.unwrap();

    assert_eq!(escaped, None);
    assert_eq!(workflow.mode(), WorkflowMode::PickingTarget);

    // Esc while typing only leaves the filter input.
    assert_eq!(press(&mut workflow, KeyCode::Esc).await, Some(Action::EndInputMode));
    assert_eq!(workflow.mode(), WorkflowMode::PickingTarget);
  }

  #[tokio::test]
  async fn test_reentering_picker_resets_filter_and_selection() {
    let (mut workflow, _api, _rx) = loaded(MockGitlabApi::default()).await;
    press(&mut workflow, KeyCode::Char('m')).await;
    press(&mut workflow, KeyCode::Down).await;
    press(&mut workflow, KeyCode::Char('/')).await;
    press(&mut workflow, KeyCode::Char('d')).await;
    press(&mut workflow, KeyCode::Enter).await;
    assert_eq!(workflow.target_picker().filter_text(), "d");
    press(&mut workflow, KeyCode::Esc).await;

    press(&mut workflow, KeyCode::Char('m')).await;

    assert_eq!(workflow.target_picker().filter_text(), "");
    assert_eq!(workflow.target_picker().selected().map(|item| item.display_name.as_str()), Some("main"));
  }

  #[tokio::test]
  async fn test_confirm_without_source_branch_does_nothing() {
    let (mut workflow, api, mut rx) = setup(MockGitlabApi::default());
    workflow.update(Action::TargetBranchesLoaded(vec![branch("main", "m")])).await.unwrap();
    workflow.update(Action::MergeAutomatically).await.unwrap();

    let action = workflow.update(Action::ConfirmTarget).await.unwrap();
    tokio::task::yield_now().await;

    assert_eq!(action, None);
    assert_eq!(workflow.mode(), WorkflowMode::PickingTarget);
    assert!(api.create_calls().is_empty());
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test]
  async fn test_confirm_without_target_does_nothing() {
    let (mut workflow, api, mut rx) = setup(MockGitlabApi::default());
    workflow.update(Action::UserBranchesLoaded(vec![branch("feature/x", "add x")])).await.unwrap();
    workflow.update(Action::MergeAutomatically).await.unwrap();

    let action = workflow.update(Action::ConfirmTarget).await.unwrap();
    tokio::task::yield_now().await;

    assert_eq!(action, None);
    assert_eq!(workflow.mode(), WorkflowMode::PickingTarget);
    assert!(api.create_calls().is_empty());
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test]
  async fn test_confirm_is_ignored_while_browsing() {
    let (mut workflow, api, _rx) = loaded(MockGitlabApi::default()).await;

    let action = workflow.update(Action::ConfirmTarget).await.unwrap();
    tokio::task::yield_now().await;

    assert_eq!(action, None);
    assert!(api.create_calls().is_empty());
  }

  #[tokio::test]
  async fn test_confirm_creates_merge_request_and_returns_to_browsing() {
    let (mut workflow, api, mut rx) = loaded(MockGitlabApi::default()).await;
    press(&mut workflow, KeyCode::Char('m')).await;

    press(&mut workflow, KeyCode::Enter).await;

    assert_eq!(workflow.mode(), WorkflowMode::Browsing);
    match rx.recv().await {
      Some(Action::MergeRequestCreated(merge_request)) => {
        assert_eq!(merge_request.source_branch, "feature/x");
        assert_eq!(merge_request.target_branch, "main");
      },
      other => panic!("unexpected action {other:?}"),
    }
    assert_eq!(api.create_calls(), vec![CreateCall {
      source: "feature/x".to_string(),
      target: "main".to_string(),
      title: "add x".to_string(),
    }]);
    assert_eq!(api.note_calls(), vec![(7, "/merge".to_string())]);
  }

  #[tokio::test]
  async fn test_favourite_key_merges_highlighted_branch() {
    let (mut workflow, api, mut rx) = loaded(MockGitlabApi::default()).await;
    press(&mut workflow, KeyCode::Down).await;

    press(&mut workflow, KeyCode::Char('2')).await;

    assert!(matches!(rx.recv().await, Some(Action::MergeRequestCreated(_))));
    assert_eq!(workflow.mode(), WorkflowMode::Browsing);
    assert_eq!(api.create_calls(), vec![CreateCall {
      source: "feature/y".to_string(),
      target: "release".to_string(),
      title: "add y".to_string(),
    }]);
  }

  #[tokio::test]
  async fn test_favourite_keys_are_inactive_while_picking() {
    let (mut workflow, api, _rx) = loaded(MockGitlabApi::default()).await;
    press(&mut workflow, KeyCode::Char('m')).await;

    press(&mut workflow, KeyCode::Char('1')).await;
    workflow.update(Action::MergeToFavourite(0)).await.unwrap();
    tokio::task::yield_now().await;

    assert!(api.create_calls().is_empty());
    assert_eq!(workflow.mode(), WorkflowMode::PickingTarget);
  }

  #[tokio::test]
  async fn test_already_exists_is_reported_without_state_change() {
    let (mut workflow, _api, mut rx) = loaded(MockGitlabApi::default().creating(CreateBehaviour::AlreadyExists)).await;

    press(&mut workflow, KeyCode::Char('1')).await;

    let Some(Action::MergeRequestFailed(message)) = rx.recv().await else {
      panic!("expected a failure notification");
    };
    assert!(message.contains("feature/x"));
    workflow.update(Action::MergeRequestFailed(message)).await.unwrap();
    assert_eq!(workflow.mode(), WorkflowMode::Browsing);
    assert_eq!(workflow.branch_view().rows().len(), 2);
  }

  #[tokio::test]
  async fn test_connection_failure_is_classified() {
    let (mut workflow, _api, mut rx) =
      loaded(MockGitlabApi::default().creating(CreateBehaviour::ConnectionFailure)).await;

    press(&mut workflow, KeyCode::Char('1')).await;

    assert_eq!(
      rx.recv().await,
      Some(Action::MergeRequestFailed(
        "merge request creation failed, please check your network connection".to_string()
      ))
    );
  }

  #[tokio::test]
  async fn test_unclassified_failure_is_generic() {
    let (mut workflow, api, mut rx) = loaded(MockGitlabApi::default().creating(CreateBehaviour::OtherFailure)).await;
    press(&mut workflow, KeyCode::Char('m')).await;

    press(&mut workflow, KeyCode::Enter).await;

    let Some(Action::MergeRequestFailed(message)) = rx.recv().await else {
      panic!("expected a failure notification");
    };
    assert_eq!(message, "unrecognized error when creating merge request, please check log file");
    workflow.update(Action::MergeRequestFailed(message)).await.unwrap();
    assert_eq!(workflow.mode(), WorkflowMode::Browsing);
    assert_eq!(workflow.branch_view().rows().len(), 2);
    assert!(api.note_calls().is_empty());
  }

  #[tokio::test]
  async fn test_note_failure_still_reports_created() {
    let (mut workflow, api, mut rx) = loaded(MockGitlabApi::default().failing_note()).await;

    press(&mut workflow, KeyCode::Char('1')).await;

    assert!(matches!(rx.recv().await, Some(Action::MergeRequestCreated(_))));
    assert_eq!(api.note_calls().len(), 1);
  }

  #[tokio::test]
  async fn test_init_loads_user_branches_with_prefix() {
    let (mut workflow, api, mut rx) = setup(MockGitlabApi::with_branches(vec![branch("feature/a", "a")]));

    workflow.init().unwrap();

    let Some(Action::UserBranchesLoaded(branches)) = rx.recv().await else {
      panic!("expected loaded branches");
    };
    assert_eq!(branches.len(), 1);
    assert_eq!(api.fetch_calls(), vec![vec!["feature/".to_string()]]);
  }

  #[tokio::test]
  async fn test_init_reports_fetch_failure() {
    let (mut workflow, _api, mut rx) = setup(MockGitlabApi::default().failing_fetch());

    workflow.init().unwrap();

    let Some(Action::Error(message)) = rx.recv().await else {
      panic!("expected an error");
    };
    assert!(message.starts_with("Failed to fetch branches"));
  }

  #[tokio::test]
  async fn test_context_update_recomputes_widths_for_current_mode() {
    let (mut workflow, _api, _rx) = loaded(MockGitlabApi::default()).await;
    press(&mut workflow, KeyCode::Char('m')).await;

    workflow.update(Action::ContextUpdated(LayoutContext::new(202, 40, 20))).await.unwrap();

    assert_eq!(workflow.pane_widths(), PaneWidths { table: 140, picker: 60 });
  }

  #[tokio::test]
  async fn test_other_keys_reach_visible_pane() {
    let (mut workflow, _api, _rx) = loaded(MockGitlabApi::default()).await;

    assert_eq!(press(&mut workflow, KeyCode::Char('j')).await, Some(Action::Render));
    assert_eq!(workflow.branch_view().highlighted_branch().map(|b| b.name.as_str()), Some("feature/y"));

    press(&mut workflow, KeyCode::Char('m')).await;
    press(&mut workflow, KeyCode::Char('j')).await;

    assert_eq!(workflow.target_picker().selected().map(|item| item.display_name.as_str()), Some("develop"));
    assert_eq!(workflow.branch_view().highlighted_branch().map(|b| b.name.as_str()), Some("feature/y"));
  }
}
