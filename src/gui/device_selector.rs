use std::{io::stdout, time::Duration};

use crate::gui::error::GuiError;

use crossterm::{
    event::{self, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{
        block::{Position, Title},
        *,
    },
    Terminal,
};

/// Where the cursor is, and whether the user has decided yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    /// Still browsing, cursor on this row.
    Browsing(usize),
    /// Enter was pressed on this row.
    Chosen(usize),
    /// The user backed out.
    Cancelled,
}

impl SelectorState {
    /// Move in response to one key press on a list of `n` rows.
    pub fn on_key(self, code: KeyCode, n: usize) -> Self {
        let SelectorState::Browsing(cursor) = self else {
            return self;
        };
        if n == 0 {
            return SelectorState::Cancelled;
        }
        match code {
            KeyCode::Down => SelectorState::Browsing((cursor + 1) % n),
            KeyCode::Up => SelectorState::Browsing((cursor + n - 1) % n),
            KeyCode::Enter => SelectorState::Chosen(cursor),
            KeyCode::Char('q') | KeyCode::Esc => SelectorState::Cancelled,
            _ => self,
        }
    }
}

/// Let the user pick one of `available_ports` in a full screen list.
/// Returns `None` if they quit without choosing.
pub fn device_selector(mut available_ports: Vec<String>) -> Result<Option<String>, GuiError> {
    if available_ports.is_empty() {
        return Err(GuiError::NoPorts);
    }

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let res = run_selector(&available_ports);
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(res?.map(|i| available_ports.swap_remove(i)))
}

fn run_selector(available_ports: &[String]) -> Result<Option<usize>, GuiError> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let n_ports = available_ports.len();
    let mut state = SelectorState::Browsing(0);
    let mut list_state = ListState::default().with_selected(Some(0));
    loop {
        let cursor = match state {
            SelectorState::Browsing(cursor) => cursor,
            SelectorState::Chosen(i) => return Ok(Some(i)),
            SelectorState::Cancelled => return Ok(None),
        };

        let title = Title::from(" Serial Port ".magenta().bold());
        let instructions = Title::from(Line::from(vec![
            " Navigate ".into(),
            "<Up>/<Down>".magenta().bold(),
            " Connect ".into(),
            "<Enter>".magenta().bold(),
            " Quit ".into(),
            "<Q>/<Esc> ".magenta().bold(),
        ]));
        let block = Block::default()
            .title(title.alignment(Alignment::Center))
            .title(
                instructions
                    .alignment(Alignment::Center)
                    .position(Position::Bottom),
            )
            .borders(Borders::ALL);
        let list = List::new(available_ports.iter().map(String::as_str))
            .style(Style::default().fg(Color::White))
            .highlight_symbol(">>")
            .highlight_style(Style::default().fg(Color::Magenta))
            .block(block);
        list_state.select(Some(cursor));
        terminal.draw(|frame| {
            let area = frame.size();
            frame.render_stateful_widget(list, area, &mut list_state);
        })?;

        if event::poll(Duration::from_millis(16))? {
            if let event::Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    state = state.on_key(key.code, n_ports);
                }
            }
        }
    }
}
