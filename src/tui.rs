use std::{
  ops::{Deref, DerefMut},
  time::Duration,
};

use color_eyre::eyre::Result;
use crossterm::{
  cursor,
  event::{Event as CrosstermEvent, KeyEvent, KeyEventKind},
  terminal::{EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::{FutureExt, StreamExt};
use ratatui::backend::CrosstermBackend as Backend;
use serde::{Deserialize, Serialize};
use tokio::{
  sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
  task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

pub type IO = std::io::Stdout;
pub fn io() -> IO {
  std::io::stdout()
}
pub type Frame<'a> = ratatui::Frame<'a>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Event {
  Init,
  Quit,
  Error,
  Closed,
  Tick,
  Render,
  FocusGained,
  FocusLost,
  Key(KeyEvent),
  Resize(u16, u16),
}

/// Terminal wrapper that turns crossterm input plus tick and frame timers into
/// a single [`Event`] stream.
pub struct Tui {
  pub terminal: ratatui::Terminal<Backend<IO>>,
  pub task: Option<JoinHandle<()>>,
  pub cancellation_token: CancellationToken,
  pub event_rx: UnboundedReceiver<Event>,
  pub event_tx: UnboundedSender<Event>,
  pub frame_rate: f64,
  pub tick_rate: f64,
}

impl Tui {
  pub fn new() -> Result<Self> {
    let tick_rate = 4.0;
    let frame_rate = 60.0;
    let terminal = ratatui::Terminal::new(Backend::new(io()))?;
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let cancellation_token = CancellationToken::new();
    Ok(Self { terminal, task: None, cancellation_token, event_rx, event_tx, frame_rate, tick_rate })
  }

  pub fn tick_rate(mut self, tick_rate: f64) -> Self {
    self.tick_rate = tick_rate;
    self
  }

  pub fn frame_rate(mut self, frame_rate: f64) -> Self {
    self.frame_rate = frame_rate;
    self
  }

  pub fn start(&mut self) {
    let tick_delay = Duration::from_secs_f64(1.0 / self.tick_rate);
    let render_delay = Duration::from_secs_f64(1.0 / self.frame_rate);
    self.cancel();
    self.cancellation_token = CancellationToken::new();
    let cancellation_token = self.cancellation_token.clone();
    let event_tx = self.event_tx.clone();
    self.task = Some(tokio::spawn(async move {
      let mut reader = crossterm::event::EventStream::new();
      let mut tick_interval = tokio::time::interval(tick_delay);
      let mut render_interval = tokio::time::interval(render_delay);
      let _ = event_tx.send(Event::Init);
      loop {
        let tick_delay = tick_interval.tick();
        let render_delay = render_interval.tick();
        let crossterm_event = reader.next().fuse();
        tokio::select! {
          _ = cancellation_token.cancelled() => {
            break;
          }
          maybe_event = crossterm_event => {
            let event = match maybe_event {
              Some(Ok(CrosstermEvent::Key(key))) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
              Some(Ok(CrosstermEvent::Resize(x, y))) => Some(Event::Resize(x, y)),
              Some(Ok(CrosstermEvent::FocusLost)) => Some(Event::FocusLost),
              Some(Ok(CrosstermEvent::FocusGained)) => Some(Event::FocusGained),
              Some(Ok(_)) => None,
              Some(Err(_)) => Some(Event::Error),
              None => Some(Event::Closed),
            };
            if let Some(event) = event {
              let _ = event_tx.send(event);
            }
          },
          _ = tick_delay => {
            let _ = event_tx.send(Event::Tick);
          },
          _ = render_delay => {
            let _ = event_tx.send(Event::Render);
          },
        }
      }
    }));
  }

  pub fn stop(&self) -> Result<()> {
    self.cancel();
    let Some(task) = &self.task else {
      return Ok(());
    };
    let mut counter = 0;
    while !task.is_finished() {
      std::thread::sleep(Duration::from_millis(1));
      counter += 1;
      if counter > 50 {
        task.abort();
      }
      if counter > 100 {
        log::error!("Failed to abort task in 100 milliseconds for unknown reason");
        break;
      }
    }
    Ok(())
  }

  pub fn enter(&mut self) -> Result<()> {
    crossterm::terminal::enable_raw_mode()?;
    crossterm::execute!(io(), EnterAlternateScreen, cursor::Hide)?;
    self.start();
    Ok(())
  }

  pub fn exit(&mut self) -> Result<()> {
    self.stop()?;
    if crossterm::terminal::is_raw_mode_enabled()? {
      self.flush()?;
    }
    restore()
  }

  pub fn cancel(&self) {
    self.cancellation_token.cancel();
  }

  /// Leaves the terminal and stops the process until it is continued.
  pub fn suspend(&mut self) -> Result<()> {
    self.exit()?;
    #[cfg(not(windows))]
    signal_hook::low_level::raise(signal_hook::consts::signal::SIGTSTP)?;
    Ok(())
  }

  pub async fn next(&mut self) -> Option<Event> {
    self.event_rx.recv().await
  }
}

/// Leaves the alternate screen and raw mode. Needs neither a `Tui` nor a
/// tokio runtime, so it is safe to call from the panic hook.
pub fn restore() -> Result<()> {
  if crossterm::terminal::is_raw_mode_enabled()? {
    crossterm::execute!(io(), LeaveAlternateScreen, cursor::Show)?;
    crossterm::terminal::disable_raw_mode()?;
  }
  Ok(())
}

impl Deref for Tui {
  type Target = ratatui::Terminal<Backend<IO>>;

  fn deref(&self) -> &Self::Target {
    &self.terminal
  }
}

impl DerefMut for Tui {
  fn deref_mut(&mut self) -> &mut Self::Target {
    &mut self.terminal
  }
}

impl Drop for Tui {
  fn drop(&mut self) {
    if let Err(err) = self.exit() {
      log::error!("Failed to restore the terminal: {}", err);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_restore_outside_runtime_without_raw_mode() {
    assert!(tokio::runtime::Handle::try_current().is_err());

    assert!(restore().is_ok());
  }
}
