use anyhow::Result;
use crossterm::event::KeyCode;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::models::{Profile, ProfileUpdate};
use crate::ui::{expire, next_key, render_notice, Notice};

pub enum SettingsAction {
    Back,
    Save(ProfileUpdate),
}

#[derive(Clone, PartialEq, Copy, Debug)]
pub enum SettingsField {
    FullName,
    Username,
    Website,
}

const FIELDS: [SettingsField; 3] = [
    SettingsField::FullName,
    SettingsField::Username,
    SettingsField::Website,
];

/// Account settings: the signed-in account plus an editable profile form.
pub struct SettingsState {
    account: String,
    initial: char,
    pub form: ProfileUpdate,
    pub current_field: SettingsField,
    pub editing: bool,
    pub error: Option<String>,
    pub notice: Option<Notice>,
}

impl SettingsState {
    pub fn new(account: impl Into<String>, profile: Option<&Profile>) -> Self {
        let account = account.into();
        let initial = profile
            .map(|p| p.initial(&account))
            .unwrap_or_else(|| Profile::empty("").initial(&account));
        Self {
            form: profile.map(ProfileUpdate::from_profile).unwrap_or_default(),
            account,
            initial,
            current_field: SettingsField::FullName,
            editing: false,
            error: None,
            notice: None,
        }
    }

    /// Refreshes the form from what the store kept.
    pub fn saved(&mut self, profile: &Profile) {
        self.form = ProfileUpdate::from_profile(profile);
        self.initial = profile.initial(&self.account);
        self.notice = Some(Notice::info("Profile updated"));
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.notice = Some(Notice::error(message));
    }

    pub fn next_field(&mut self) {
        let i = self.current_field as usize;
        self.current_field = FIELDS[(i + 1) % FIELDS.len()];
    }

    pub fn previous_field(&mut self) {
        let i = self.current_field as usize;
        self.current_field = FIELDS[(i + FIELDS.len() - 1) % FIELDS.len()];
    }

    fn edit_current_field(&mut self, key: KeyCode) {
        let field_value = match self.current_field {
            SettingsField::FullName => &mut self.form.full_name,
            SettingsField::Username => &mut self.form.username,
            SettingsField::Website => &mut self.form.website,
        };

        match key {
            KeyCode::Char(c) => field_value.push(c),
            KeyCode::Backspace => {
                field_value.pop();
            }
            _ => {}
        }
    }

    pub fn submit(&mut self) -> Option<ProfileUpdate> {
        if let Err(err) = self.form.validate() {
            self.error = Some(err.to_string());
            return None;
        }
        self.error = None;
        Some(self.form.clone())
    }

    pub fn handle_key(&mut self, key: KeyCode) -> Option<SettingsAction> {
        match key {
            KeyCode::Esc if self.editing => self.editing = false,
            KeyCode::Esc => return Some(SettingsAction::Back),
            KeyCode::Enter => self.editing = !self.editing,
            KeyCode::Up if !self.editing => self.previous_field(),
            KeyCode::Down | KeyCode::Tab if !self.editing => self.next_field(),
            KeyCode::Char('s') if !self.editing => {
                return self.submit().map(SettingsAction::Save);
            }
            _ if self.editing => self.edit_current_field(key),
            _ => {}
        }
        None
    }
}

pub fn render_settings<B: Backend>(f: &mut Frame<B>, state: &mut SettingsState) {
    expire(&mut state.notice);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(4),
                Constraint::Min(5),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let title = Paragraph::new("Settings")
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let account = Paragraph::new(vec![Spans::from(vec![
        Span::styled(
            format!(" {} ", state.initial),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::raw(state.account.as_str()),
    ])])
    .block(Block::default().borders(Borders::ALL).title("Account"));
    f.render_widget(account, chunks[1]);

    render_form(f, state, chunks[2]);

    if state.notice.is_some() {
        render_notice(f, chunks[3], &state.notice);
        return;
    }

    let (help_text, style) = match &state.error {
        Some(error) => (error.clone(), Style::default().fg(Color::Red)),
        None if state.editing => (
            "Enter - Save field | Esc - Cancel editing".to_string(),
            Style::default().fg(Color::Gray),
        ),
        None => (
            "Enter - Edit field | Up/Down - Navigate | S - Update profile | Esc - Back".to_string(),
            Style::default().fg(Color::Gray),
        ),
    };

    let help = Paragraph::new(help_text)
        .style(style)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[3]);
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &SettingsState, area: Rect) {
    let field_names = ["Full name", "Username", "Website"];
    let field_values = [&state.form.full_name, &state.form.username, &state.form.website];

    let items: Vec<ListItem> = field_names
        .iter()
        .zip(field_values.iter())
        .enumerate()
        .map(|(i, (name, value))| {
            let selected = i == state.current_field as usize;
            let label_style = if selected {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            let value = if selected && state.editing {
                Span::styled(format!("{}|", value), Style::default().add_modifier(Modifier::BOLD))
            } else {
                Span::raw(value.as_str())
            };

            ListItem::new(Spans::from(vec![
                Span::styled(format!("{}: ", name), label_style),
                value,
            ]))
        })
        .collect();

    let form_list =
        List::new(items).block(Block::default().borders(Borders::ALL).title("Profile"));
    f.render_widget(form_list, area);
}

pub fn handle_input(state: &mut SettingsState) -> Result<Option<SettingsAction>> {
    Ok(next_key()?.and_then(|key| state.handle_key(key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_text(state: &mut SettingsState, text: &str) {
        state.handle_key(KeyCode::Enter);
        for c in text.chars() {
            state.handle_key(KeyCode::Char(c));
        }
        state.handle_key(KeyCode::Enter);
    }

    #[test]
    fn form_starts_from_the_stored_profile() {
        let profile = Profile {
            full_name: Some("Ada Lovelace".into()),
            website: Some("https://ada.dev".into()),
            ..Profile::empty("u1")
        };
        let state = SettingsState::new("ada@example.com", Some(&profile));
        assert_eq!(state.form.full_name, "Ada Lovelace");
        assert_eq!(state.form.username, "");
        assert_eq!(state.initial, 'A');

        let blank = SettingsState::new("zed@example.com", None);
        assert_eq!(blank.form, ProfileUpdate::default());
        assert_eq!(blank.initial, 'Z');
    }

    #[test]
    fn save_sends_the_whole_form() {
        let mut state = SettingsState::new("u1", None);
        type_text(&mut state, "Ada");
        state.handle_key(KeyCode::Down);
        type_text(&mut state, "ada");

        match state.handle_key(KeyCode::Char('s')) {
            Some(SettingsAction::Save(update)) => {
                assert_eq!(update.full_name, "Ada");
                assert_eq!(update.username, "ada");
                assert_eq!(update.website, "");
            }
            _ => panic!("expected save"),
        }
    }

    #[test]
    fn bad_website_blocks_save() {
        let mut state = SettingsState::new("u1", None);
        state.handle_key(KeyCode::Up);
        assert_eq!(state.current_field, SettingsField::Website);
        type_text(&mut state, "ada.dev");

        assert!(state.handle_key(KeyCode::Char('s')).is_none());
        assert!(state.error.as_deref().unwrap().contains("http"));
    }

    #[test]
    fn esc_leaves_edit_mode_before_the_screen() {
        let mut state = SettingsState::new("u1", None);
        state.handle_key(KeyCode::Enter);
        assert!(state.handle_key(KeyCode::Esc).is_none());
        assert!(!state.editing);
        assert!(matches!(state.handle_key(KeyCode::Esc), Some(SettingsAction::Back)));
    }
}
