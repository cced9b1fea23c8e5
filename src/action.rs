use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
  components::layout::LayoutContext,
  gitlab::{Branch, MergeRequestDetails},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Display, Deserialize)]
pub enum Action {
  ClearScreen,
  ClosePicker,
  ConfirmTarget,
  ContextUpdated(LayoutContext),
  EndInputMode,
  Error(String),
  ExitError,
  MergeAutomatically,
  MergeRequestCreated(MergeRequestDetails),
  MergeRequestFailed(String),
  MergeToFavourite(usize),
  Quit,
  Render,
  Resize(u16, u16),
  Resume,
  StartInputMode,
  Suspend,
  TargetBranchesLoaded(Vec<Branch>),
  Tick,
  UserBranchesLoaded(Vec<Branch>),
}
