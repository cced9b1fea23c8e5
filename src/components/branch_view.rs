use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
  layout::{Constraint, Rect},
  style::{Color, Modifier, Style},
  widgets::{Block, Borders, Row, Table, TableState},
};
use tracing::info;

use crate::{
  error::Error,
  gitlab::{Branch, GitlabApi},
  tui::Frame,
};

pub const LAST_COMMIT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One table row per source branch. The row owns the branch it was built from
/// so actions on the row never have to look it up again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBranchRow {
  pub name: String,
  pub last_commit_date: String,
  pub branch: Branch,
}

impl SourceBranchRow {
  pub fn new(branch: Branch) -> Self {
    let last_commit_date = branch.last_commit.authored_at.with_timezone(&Local).format(LAST_COMMIT_FORMAT).to_string();
    SourceBranchRow { name: branch.name.clone(), last_commit_date, branch }
  }

  pub fn render(&self) -> Row<'_> {
    Row::new(vec![self.name.as_str(), self.last_commit_date.as_str()])
  }
}

pub struct BranchView {
  rows: Vec<SourceBranchRow>,
  highlighted: usize,
  page_size: usize,
  table_state: TableState,
}

impl BranchView {
  pub fn new(page_size: usize) -> Self {
    BranchView { rows: Vec::new(), highlighted: 0, page_size: page_size.max(1), table_state: TableState::default() }
  }

  /// Fetches the user's own branches, keeping the order GitLab returns.
  pub async fn load_branches(api: &dyn GitlabApi, user_branch_prefix: &str) -> Result<Vec<Branch>, Error> {
    info!("Loading branches with prefix '{}'", user_branch_prefix);
    api.fetch_branches(&[user_branch_prefix.to_string()]).await
  }

  /// Replaces every row and goes back to the first page.
  pub fn apply_branches(&mut self, branches: Vec<Branch>) {
    self.rows = branches.into_iter().map(SourceBranchRow::new).collect();
    self.highlighted = 0;
  }

  #[cfg(test)]
  pub(crate) fn rows(&self) -> &[SourceBranchRow] {
    &self.rows
  }

  pub fn highlighted_branch(&self) -> Option<&Branch> {
    self.rows.get(self.highlighted).map(|row| &row.branch)
  }

  pub fn set_page_size(&mut self, page_size: usize) {
    self.page_size = page_size.max(1);
  }

  pub fn page(&self) -> usize {
    self.highlighted / self.page_size
  }

  pub fn page_count(&self) -> usize {
    self.rows.len().div_ceil(self.page_size).max(1)
  }

  pub fn select_next(&mut self) {
    if self.rows.is_empty() {
      return;
    }
    self.highlighted = if self.highlighted + 1 >= self.rows.len() { 0 } else { self.highlighted + 1 };
  }

  pub fn select_previous(&mut self) {
    if self.rows.is_empty() {
      return;
    }
    self.highlighted = if self.highlighted == 0 { self.rows.len() - 1 } else { self.highlighted - 1 };
  }

  pub fn page_next(&mut self) {
    let next = (self.page() + 1) % self.page_count();
    self.highlighted = (next * self.page_size).min(self.rows.len().saturating_sub(1));
  }

  pub fn page_previous(&mut self) {
    let pages = self.page_count();
    let previous = (self.page() + pages - 1) % pages;
    self.highlighted = (previous * self.page_size).min(self.rows.len().saturating_sub(1));
  }

  /// Moves the cursor or the page. Returns whether the key was used.
  pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Down | KeyCode::Char('j') => self.select_next(),
      KeyCode::Up | KeyCode::Char('k') => self.select_previous(),
      KeyCode::Right | KeyCode::Char('l') | KeyCode::PageDown => self.page_next(),
      KeyCode::Left | KeyCode::Char('h') | KeyCode::PageUp => self.page_previous(),
      _ => return false,
    }
    true
  }

  pub fn draw(&mut self, frame: &mut Frame<'_>, area: Rect) {
    let page_start = self.page() * self.page_size;
    let page_rows = self.rows.iter().skip(page_start).take(self.page_size).map(SourceBranchRow::render);

    let title = format!("Branches ({}/{})", self.page() + 1, self.page_count());
    let table = Table::new(page_rows, [Constraint::Percentage(50), Constraint::Percentage(50)])
      .header(Row::new(vec!["Branch", "Last commit date"]).style(Style::default().add_modifier(Modifier::BOLD)))
      .block(Block::default().title(title).borders(Borders::ALL).border_style(Style::default().fg(Color::Green)))
      .style(Style::default().fg(Color::White))
      .row_highlight_style(Style::default().add_modifier(Modifier::BOLD))
      .highlight_symbol("→");

    self.table_state.select(if self.rows.is_empty() { None } else { Some(self.highlighted - page_start) });
    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}
