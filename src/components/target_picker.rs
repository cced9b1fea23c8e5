use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
  layout::{Constraint, Layout, Rect},
  style::{Color, Modifier, Style},
  widgets::{Block, Borders, List, ListItem, ListState},
};
use tui_textarea::{CursorMove, Input, TextArea};

use crate::{action::Action, gitlab::Branch, tui::Frame};

const FILTER_HEIGHT: u16 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetItem {
  pub display_name: String,
}

impl TargetItem {
  pub fn render(&self) -> ListItem<'_> {
    ListItem::new(self.display_name.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
  Unfiltered,
  /// The filter text is being typed.
  Filtering,
  FilterApplied,
}

/// Selection list of merge targets with a client-side text filter.
pub struct TargetPicker {
  items: Vec<TargetItem>,
  // Indices into `items` that pass the filter, in display order.
  visible: Vec<usize>,
  selected: usize,
  filter_state: FilterState,
  filter_input: TextArea<'static>,
  list_state: ListState,
}

impl Default for TargetPicker {
  fn default() -> Self {
    Self::new()
  }
}

impl TargetPicker {
  pub fn new() -> Self {
    let mut filter_input = TextArea::default();
    filter_input.set_style(Style::default().fg(Color::White));
    filter_input.set_block(Block::default().borders(Borders::ALL).title("Filter"));
    TargetPicker {
      items: Vec::new(),
      visible: Vec::new(),
      selected: 0,
      filter_state: FilterState::Unfiltered,
      filter_input,
      list_state: ListState::default(),
    }
  }

  /// Rebuilds the items, putting the default branch first and keeping the
  /// order of everything else.
  pub fn apply_targets(&mut self, branches: Vec<Branch>) {
    let (defaults, others): (Vec<Branch>, Vec<Branch>) = branches.into_iter().partition(|branch| branch.is_default);
    self.items = defaults.into_iter().chain(others).map(|branch| TargetItem { display_name: branch.name }).collect();
    self.apply_filter();
  }

  #[cfg(test)]
  pub(crate) fn items(&self) -> &[TargetItem] {
    &self.items
  }

  #[cfg(test)]
  pub(crate) fn visible_items(&self) -> Vec<&TargetItem> {
    self.visible.iter().filter_map(|index| self.items.get(*index)).collect()
  }

  pub fn selected(&self) -> Option<&TargetItem> {
    self.visible.get(self.selected).and_then(|index| self.items.get(*index))
  }

  pub fn reset_selection(&mut self) {
    self.selected = 0;
  }

  pub fn reset_filter(&mut self) {
    self.filter_input.move_cursor(CursorMove::Head);
    self.filter_input.delete_line_by_end();
    self.filter_state = FilterState::Unfiltered;
    self.apply_filter();
  }

  pub fn filter_state(&self) -> FilterState {
    self.filter_state
  }

  pub fn is_filtering(&self) -> bool {
    self.filter_state == FilterState::Filtering
  }

  pub fn filter_text(&self) -> String {
    self.filter_input.lines().first().map(|line| line.trim().to_string()).unwrap_or_default()
  }

  // Case-insensitive substring match on the display name.
  fn apply_filter(&mut self) {
    let needle = self.filter_text().to_lowercase();
    self.visible = self
      .items
      .iter()
      .enumerate()
      .filter(|(_, item)| needle.is_empty() || item.display_name.to_lowercase().contains(&needle))
      .map(|(index, _)| index)
      .collect();
    if self.selected >= self.visible.len() {
      self.selected = 0;
    }
  }

  pub fn select_next(&mut self) {
    if self.visible.is_empty() {
      return;
    }
    self.selected = if self.selected + 1 >= self.visible.len() { 0 } else { self.selected + 1 };
  }

  pub fn select_previous(&mut self) {
    if self.visible.is_empty() {
      return;
    }
    self.selected = if self.selected == 0 { self.visible.len() - 1 } else { self.selected - 1 };
  }

  /// Handles navigation and filter editing. Entering and leaving the filter
  /// input is reported so global shortcuts can be paused meanwhile.
  pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<Action> {
    if self.is_filtering() {
      return match key.code {
        KeyCode::Esc => {
          self.reset_filter();
          Some(Action::EndInputMode)
        },
        KeyCode::Enter => {
          self.filter_state =
            if self.filter_text().is_empty() { FilterState::Unfiltered } else { FilterState::FilterApplied };
          Some(Action::EndInputMode)
        },
        _ => {
          if self.filter_input.input(Input::from(key)) {
            self.selected = 0;
            self.apply_filter();
          }
          None
        },
      };
    }

    match key.code {
      KeyCode::Char('/') => {
        self.filter_state = FilterState::Filtering;
        Some(Action::StartInputMode)
      },
      KeyCode::Down | KeyCode::Char('j') => {
        self.select_next();
        Some(Action::Render)
      },
      KeyCode::Up | KeyCode::Char('k') => {
        self.select_previous();
        Some(Action::Render)
      },
      _ => None,
    }
  }

  pub fn draw(&mut self, frame: &mut Frame<'_>, area: Rect) {
    let list_area = if self.filter_state == FilterState::Unfiltered {
      area
    } else {
      let [filter_area, list_area] = Layout::vertical([Constraint::Length(FILTER_HEIGHT), Constraint::Min(1)]).areas(area);
      let cursor_style =
        if self.is_filtering() { Style::default().add_modifier(Modifier::REVERSED) } else { Style::default() };
      self.filter_input.set_cursor_style(cursor_style);
      frame.render_widget(&self.filter_input, filter_area);
      list_area
    };

    self.list_state.select(if self.visible.is_empty() { None } else { Some(self.selected) });

    let items: Vec<ListItem> =
      self.visible.iter().filter_map(|index| self.items.get(*index)).map(TargetItem::render).collect();
    let list = List::new(items)
      .block(Block::default().title("Select target branch").borders(Borders::ALL))
      .style(Style::default().fg(Color::White))
      .highlight_style(Style::default().add_modifier(Modifier::BOLD))
      .highlight_symbol("→");

    frame.render_stateful_widget(list, list_area, &mut self.list_state);
  }
}
