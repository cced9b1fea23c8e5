use serde::{Deserialize, Serialize};

/// Whether global shortcuts are active or keys belong to a text input.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
  #[default]
  Default,
  Input,
}

/// Which pane of the merge workflow is interactive.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowMode {
  #[default]
  Browsing,
  PickingTarget,
}
