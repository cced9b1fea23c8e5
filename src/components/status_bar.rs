use ratatui::{
  layout::Rect,
  style::{Color, Style},
  widgets::{Block, Borders, Paragraph},
};

use crate::{action::Action, components::Component, gitlab::MergeRequestDetails, tui::Frame};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
  Created(MergeRequestDetails),
  Failed(String),
}

/// Shows the outcome of the most recent merge request.
#[derive(Default)]
pub struct StatusBar {
  notification: Option<Notification>,
}

impl StatusBar {
  #[cfg(test)]
  pub(crate) fn notification(&self) -> Option<&Notification> {
    self.notification.as_ref()
  }

  fn message(&self) -> (String, Color) {
    match &self.notification {
      Some(Notification::Created(merge_request)) => (
        format!("Created merge request !{} \"{}\" {}", merge_request.iid, merge_request.title, merge_request.web_url),
        Color::LightGreen,
      ),
      Some(Notification::Failed(message)) => (message.clone(), Color::LightRed),
      None => (String::new(), Color::White),
    }
  }
}

#[async_trait::async_trait]
impl Component for StatusBar {
  async fn update(&mut self, action: Action) -> color_eyre::Result<Option<Action>> {
    match action {
      Action::MergeRequestCreated(merge_request) => {
        self.notification = Some(Notification::Created(merge_request));
        Ok(Some(Action::Render))
      },
      Action::MergeRequestFailed(message) => {
        self.notification = Some(Notification::Failed(message));
        Ok(Some(Action::Render))
      },
      _ => Ok(None),
    }
  }

  fn draw(&mut self, frame: &mut Frame<'_>, area: Rect) -> color_eyre::Result<()> {
    let (message, color) = self.message();
    let paragraph = Paragraph::new(message).block(Block::default().borders(Borders::ALL)).style(Style::default().fg(color));
    frame.render_widget(paragraph, area);
    Ok(())
  }
}
