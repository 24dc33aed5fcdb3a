//! Terminal screens. Each screen owns a `*State`, renders with `render_*`
//! and turns key presses into an action enum for `main` to carry out.

pub mod client_wizard;
pub mod clients;
pub mod components;
pub mod dashboard;
pub mod project_wizard;
pub mod projects;
pub mod settings;

use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, ListState, Paragraph, TableState, Wrap},
    Frame,
};

const NOTICE_TTL: Duration = Duration::from_secs(4);
const INPUT_POLL: Duration = Duration::from_millis(250);

/// Waits briefly for a key press so screens can redraw expiring notices.
pub fn next_key() -> Result<Option<KeyCode>> {
    if !event::poll(INPUT_POLL)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(key) if key.kind != KeyEventKind::Release => Ok(Some(key.code)),
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// A status line that disappears on its own.
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    shown_at: Instant,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
            shown_at: Instant::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
            shown_at: Instant::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.shown_at.elapsed() >= NOTICE_TTL
    }
}

/// Drops the notice once it has been on screen long enough.
pub fn expire(notice: &mut Option<Notice>) {
    if notice.as_ref().is_some_and(Notice::is_expired) {
        *notice = None;
    }
}

pub fn render_notice<B: Backend>(frame: &mut Frame<B>, area: Rect, notice: &Option<Notice>) {
    let Some(notice) = notice else {
        return;
    };
    let color = match notice.kind {
        NoticeKind::Info => Color::Green,
        NoticeKind::Error => Color::Red,
    };
    let paragraph = Paragraph::new(notice.message.as_str())
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

/// Selection shared by list and table widgets.
pub trait Selection {
    fn selected_index(&self) -> Option<usize>;
    fn select_index(&mut self, index: Option<usize>);
}

impl Selection for ListState {
    fn selected_index(&self) -> Option<usize> {
        self.selected()
    }

    fn select_index(&mut self, index: Option<usize>) {
        self.select(index);
    }
}

impl Selection for TableState {
    fn selected_index(&self) -> Option<usize> {
        self.selected()
    }

    fn select_index(&mut self, index: Option<usize>) {
        self.select(index);
    }
}

/// Moves the selection down, wrapping at the end.
pub fn select_next(state: &mut impl Selection, len: usize) {
    if len == 0 {
        state.select_index(None);
        return;
    }
    let i = match state.selected_index() {
        Some(i) if i + 1 < len => i + 1,
        _ => 0,
    };
    state.select_index(Some(i));
}

pub fn select_previous(state: &mut impl Selection, len: usize) {
    if len == 0 {
        state.select_index(None);
        return;
    }
    let i = match state.selected_index() {
        Some(0) | None => len - 1,
        Some(i) => i - 1,
    };
    state.select_index(Some(i));
}

/// Keeps the selection inside a list that may have shrunk or grown.
pub fn clamp_selection(state: &mut impl Selection, len: usize) {
    match (state.selected_index(), len) {
        (_, 0) => state.select_index(None),
        (None, _) => state.select_index(Some(0)),
        (Some(i), len) if i >= len => state.select_index(Some(len - 1)),
        _ => {}
    }
}

// Helper function to create a centered rect
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_wraps_both_ways() {
        let mut state = ListState::default();
        select_previous(&mut state, 3);
        assert_eq!(state.selected(), Some(2));
        select_next(&mut state, 3);
        assert_eq!(state.selected(), Some(0));
        select_next(&mut state, 0);
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn tables_share_the_list_selection() {
        let mut table = TableState::default();
        select_next(&mut table, 2);
        assert_eq!(table.selected(), Some(0));
        select_previous(&mut table, 2);
        assert_eq!(table.selected(), Some(1));
        clamp_selection(&mut table, 1);
        assert_eq!(table.selected(), Some(0));
    }

    #[test]
    fn clamp_follows_list_length() {
        let mut state = ListState::default();
        state.select(Some(4));
        clamp_selection(&mut state, 2);
        assert_eq!(state.selected(), Some(1));
        clamp_selection(&mut state, 0);
        assert_eq!(state.selected(), None);
        clamp_selection(&mut state, 5);
        assert_eq!(state.selected(), Some(0));
    }

    #[test]
    fn fresh_notice_is_kept() {
        let mut notice = Some(Notice::error("Failed to save"));
        expire(&mut notice);
        assert!(notice.is_some());
    }
}
