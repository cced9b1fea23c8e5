use serde::{Deserialize, Serialize};

use crate::mode::WorkflowMode;

pub const STATUS_BAR_HEIGHT: u16 = 3;
pub const FOOTER_HEIGHT: u16 = 3;
pub const CONTENT_HORIZONTAL_MARGIN: u16 = 1;
// Borders plus the header row.
const TABLE_CHROME_HEIGHT: u16 = 3;
const TABLE_WIDTH_PERCENT_WHILE_PICKING: u32 = 70;

/// Terminal dimensions and the sizes derived from them, rebuilt on every resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutContext {
  pub window_width: u16,
  pub window_height: u16,
  pub table_content_height: u16,
  pub table_page_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneWidths {
  pub table: u16,
  pub picker: u16,
}

impl LayoutContext {
  pub fn new(window_width: u16, window_height: u16, configured_page_size: usize) -> Self {
    let table_content_height = window_height.saturating_sub(STATUS_BAR_HEIGHT + FOOTER_HEIGHT);
    let fitting_rows = usize::from(table_content_height.saturating_sub(TABLE_CHROME_HEIGHT));
    let table_page_size = if fitting_rows == 0 { configured_page_size } else { configured_page_size.min(fitting_rows) };
    LayoutContext { window_width, window_height, table_content_height, table_page_size: table_page_size.max(1) }
  }

  pub fn content_width(&self) -> u16 {
    self.window_width.saturating_sub(2 * CONTENT_HORIZONTAL_MARGIN)
  }

  /// The table takes the whole content width while browsing and leaves the
  /// remainder to the target picker otherwise.
  pub fn pane_widths(&self, mode: WorkflowMode) -> PaneWidths {
    let content = self.content_width();
    match mode {
      WorkflowMode::Browsing => PaneWidths { table: content, picker: 0 },
      WorkflowMode::PickingTarget => {
        let table = (u32::from(content) * TABLE_WIDTH_PERCENT_WHILE_PICKING / 100) as u16;
        PaneWidths { table, picker: content - table }
      },
    }
  }
}
