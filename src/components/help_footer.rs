use ratatui::{
  layout::Rect,
  style::{Color, Style},
  widgets::{Block, Borders, Paragraph},
};

use crate::{components::keys::BranchKeyMap, mode::WorkflowMode, tui::Frame};

const NAVIGATION_HINTS: [&str; 2] = ["↑/↓: move", "q: quit"];
const PAGING_HINT: &str = "←/→: page";
const FILTER_HINT: &str = "/: filter";

#[derive(Default)]
pub struct HelpFooter {}

impl HelpFooter {
  pub fn instructions(&self, keys: &BranchKeyMap, mode: WorkflowMode) -> Vec<String> {
    let mut instructions: Vec<String> = keys.active(mode).iter().map(|binding| binding.instruction()).collect();
    instructions.push(String::from(match mode {
      WorkflowMode::Browsing => PAGING_HINT,
      WorkflowMode::PickingTarget => FILTER_HINT,
    }));
    instructions.extend(NAVIGATION_HINTS.iter().map(|hint| hint.to_string()));
    instructions
  }

  pub fn render(&self, frame: &mut Frame<'_>, area: Rect, keys: &BranchKeyMap, mode: WorkflowMode) {
    let paragraph = Paragraph::new(self.instructions(keys, mode).join(" | "))
      .block(Block::default().borders(Borders::ALL))
      .style(Style::default().fg(Color::White));

    frame.render_widget(paragraph, area);
  }
}
