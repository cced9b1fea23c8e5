use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::warn;

use crate::{action::Action, mode::WorkflowMode};

const MAX_FAVOURITES: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
  codes: Vec<KeyCode>,
  key_help: String,
  description: String,
  action: Action,
}

impl KeyBinding {
  fn new(codes: Vec<KeyCode>, key_help: impl Into<String>, description: impl Into<String>, action: Action) -> Self {
    KeyBinding { codes, key_help: key_help.into(), description: description.into(), action }
  }

  pub fn matches(&self, key: &KeyEvent) -> bool {
    !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) && self.codes.contains(&key.code)
  }

  pub fn action(&self) -> &Action {
    &self.action
  }

  pub fn instruction(&self) -> String {
    format!("{}: {}", self.key_help, self.description)
  }
}

/// Key bindings of the merge workflow. Which of them respond is decided by the
/// current [`WorkflowMode`] alone.
#[derive(Debug, Clone)]
pub struct BranchKeyMap {
  merge_automatically: KeyBinding,
  close_picker: KeyBinding,
  confirm_target: KeyBinding,
  merge_favourite: Vec<KeyBinding>,
}

impl BranchKeyMap {
  pub fn new(favourite_branches: &[String]) -> Self {
    if favourite_branches.len() > MAX_FAVOURITES {
      warn!("Only the first {} favourite branches get a key binding", MAX_FAVOURITES);
    }
    let merge_favourite = favourite_branches
      .iter()
      .take(MAX_FAVOURITES)
      .enumerate()
      .filter_map(|(index, branch)| {
        let digit = char::from_digit(index as u32 + 1, 10)?;
        Some(KeyBinding::new(
          vec![KeyCode::Char(digit)],
          digit.to_string(),
          format!("merge to {branch}"),
          Action::MergeToFavourite(index),
        ))
      })
      .collect();

    BranchKeyMap {
      merge_automatically: KeyBinding::new(
        vec![KeyCode::Char('m')],
        "m",
        "merge automatically",
        Action::MergeAutomatically,
      ),
      close_picker: KeyBinding::new(vec![KeyCode::Esc], "esc", "close", Action::ClosePicker),
      confirm_target: KeyBinding::new(vec![KeyCode::Enter], "enter", "create merge request", Action::ConfirmTarget),
      merge_favourite,
    }
  }

  pub fn active(&self, mode: WorkflowMode) -> Vec<&KeyBinding> {
    match mode {
      WorkflowMode::Browsing => {
        std::iter::once(&self.merge_automatically).chain(self.merge_favourite.iter()).collect()
      },
      WorkflowMode::PickingTarget => vec![&self.close_picker, &self.confirm_target],
    }
  }

  pub fn resolve(&self, key: &KeyEvent, mode: WorkflowMode) -> Option<Action> {
    self.active(mode).into_iter().find(|binding| binding.matches(key)).map(|binding| binding.action().clone())
  }
}
