use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
  prelude::*,
  widgets::{Block, Borders, Paragraph},
};

use crate::{action::Action, components::Component, tui::Frame};

/// Full-pane error message, e.g. when the branch list could not be fetched.
/// Any key other than the scroll keys dismisses it.
#[derive(Default)]
pub struct ErrorView {
  message: Option<String>,
  scroll: u16,
  last_height: u16,
}

impl ErrorView {
  pub fn set_message(&mut self, message: String) {
    self.message = Some(message);
    self.scroll = 0;
  }

  pub fn message(&self) -> Option<&str> {
    self.message.as_deref()
  }

  fn has_scrolled_to_bottom(&self) -> bool {
    match &self.message {
      Some(message) => {
        let total_lines = message.lines().count() as u16;
        self.scroll + self.last_height >= total_lines
      },
      None => false,
    }
  }
}

#[async_trait::async_trait]
impl Component for ErrorView {
  async fn handle_key_events(&mut self, key: KeyEvent) -> color_eyre::Result<Option<Action>> {
    let action = match key.code {
      KeyCode::Up | KeyCode::Char('k') => {
        self.scroll = self.scroll.saturating_sub(1);
        Some(Action::Render)
      },
      KeyCode::Down | KeyCode::Char('j') => {
        if !self.has_scrolled_to_bottom() {
          self.scroll += 1;
        }
        Some(Action::Render)
      },
      _ => {
        self.scroll = 0;
        self.message = None;
        self.last_height = 0;
        Some(Action::ExitError)
      },
    };
    Ok(action)
  }

  async fn update(&mut self, action: Action) -> color_eyre::Result<Option<Action>> {
    if let Action::Error(message) = action {
      self.set_message(message);
    }
    Ok(None)
  }

  fn draw(&mut self, frame: &mut Frame<'_>, area: Rect) -> color_eyre::Result<()> {
    self.last_height = area.height.saturating_sub(2);
    let message = self.message.clone().unwrap_or_default();
    let paragraph = Paragraph::new(message)
      .block(Block::default().title("Error (any key to dismiss)").style(Style::default().fg(Color::Red)).borders(Borders::ALL))
      .scroll((self.scroll, 0));

    frame.render_widget(paragraph, area);
    Ok(())
  }
}
