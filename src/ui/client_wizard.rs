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

use crate::models::{Client, ClientPatch, ClientStatus, NewClient};
use crate::ui::next_key;

pub enum ClientDraft {
    Create(NewClient),
    Update { id: String, patch: ClientPatch },
}

pub enum ClientWizardAction {
    Cancel,
    Save(ClientDraft),
}

#[derive(Clone, PartialEq, Copy)]
pub enum ClientField {
    Name,
    Email,
    Company,
    Phone,
    Notes,
    Status,
}

const FIELDS: [ClientField; 6] = [
    ClientField::Name,
    ClientField::Email,
    ClientField::Company,
    ClientField::Phone,
    ClientField::Notes,
    ClientField::Status,
];

pub struct ClientWizardState {
    editing_id: Option<String>,
    pub form: NewClient,
    pub current_field: ClientField,
    pub editing: bool,
    pub error: Option<String>,
}

impl ClientWizardState {
    pub fn new() -> Self {
        Self {
            editing_id: None,
            form: NewClient::default(),
            current_field: ClientField::Name,
            editing: false,
            error: None,
        }
    }

    pub fn from_existing(client: Client) -> Self {
        Self {
            editing_id: Some(client.id),
            form: NewClient {
                name: client.name,
                email: client.email,
                company: client.company,
                phone: client.phone,
                notes: client.notes,
                status: client.status,
            },
            current_field: ClientField::Name,
            editing: false,
            error: None,
        }
    }

    pub fn is_new(&self) -> bool {
        self.editing_id.is_none()
    }

    pub fn toggle_editing(&mut self) {
        // Status is chosen with Left/Right, not typed.
        if self.current_field == ClientField::Status {
            self.editing = false;
            return;
        }
        self.editing = !self.editing;
    }

    pub fn next_field(&mut self) {
        let i = self.current_field as usize;
        self.current_field = FIELDS[(i + 1) % FIELDS.len()];
    }

    pub fn previous_field(&mut self) {
        let i = self.current_field as usize;
        self.current_field = FIELDS[(i + FIELDS.len() - 1) % FIELDS.len()];
    }

    fn optional(slot: &mut Option<String>) -> &mut String {
        slot.get_or_insert_with(String::new)
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        let field_value = match self.current_field {
            ClientField::Name => &mut self.form.name,
            ClientField::Email => &mut self.form.email,
            ClientField::Company => Self::optional(&mut self.form.company),
            ClientField::Phone => Self::optional(&mut self.form.phone),
            ClientField::Notes => Self::optional(&mut self.form.notes),
            ClientField::Status => return,
        };

        match key {
            KeyCode::Char(c) => field_value.push(c),
            KeyCode::Backspace => {
                field_value.pop();
            }
            _ => {}
        }
    }

    pub fn cycle_status(&mut self, backwards: bool) {
        self.form.status = if backwards {
            // three states: two steps forward is one back
            self.form.status.cycle().cycle()
        } else {
            self.form.status.cycle()
        };
    }

    /// Validates the form and turns it into a create or update request.
    pub fn submit(&mut self) -> Option<ClientDraft> {
        if let Err(err) = self.form.validate() {
            self.error = Some(err.to_string());
            return None;
        }
        self.error = None;

        let form = self.form.clone();
        Some(match &self.editing_id {
            None => ClientDraft::Create(form),
            Some(id) => ClientDraft::Update {
                id: id.clone(),
                patch: ClientPatch {
                    name: Some(form.name),
                    email: Some(form.email),
                    company: Some(form.company),
                    phone: Some(form.phone),
                    notes: Some(form.notes),
                    status: Some(form.status),
                },
            },
        })
    }

    pub fn handle_key(&mut self, key: KeyCode) -> Option<ClientWizardAction> {
        match key {
            KeyCode::Esc => {
                if self.editing {
                    self.toggle_editing();
                } else {
                    return Some(ClientWizardAction::Cancel);
                }
            }
            KeyCode::Enter => self.toggle_editing(),
            KeyCode::Up if !self.editing => self.previous_field(),
            KeyCode::Down | KeyCode::Tab if !self.editing => self.next_field(),
            KeyCode::Left if !self.editing && self.current_field == ClientField::Status => {
                self.cycle_status(true)
            }
            KeyCode::Right if !self.editing && self.current_field == ClientField::Status => {
                self.cycle_status(false)
            }
            KeyCode::Char('s') if !self.editing => {
                return self.submit().map(ClientWizardAction::Save);
            }
            _ if self.editing => self.edit_current_field(key),
            _ => {}
        }
        None
    }
}

impl Default for ClientWizardState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn render_client_wizard<B: Backend>(f: &mut Frame<B>, state: &mut ClientWizardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    // Title with appropriate text based on whether we're editing or creating
    let title_text = if state.is_new() {
        "New Client"
    } else {
        "Edit Client"
    };

    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_form(f, state, chunks[1]);

    let (help_text, style) = match &state.error {
        Some(error) => (error.clone(), Style::default().fg(Color::Red)),
        None if state.editing => (
            "Enter - Save field | Esc - Cancel editing".to_string(),
            Style::default().fg(Color::Gray),
        ),
        None => (
            "Enter - Edit field | Up/Down - Navigate | Left/Right - Status | S - Save client | Esc - Cancel"
                .to_string(),
            Style::default().fg(Color::Gray),
        ),
    };

    let help = Paragraph::new(help_text)
        .style(style)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &mut ClientWizardState, area: Rect) {
    let field_names = ["Name", "Email", "Company", "Phone", "Notes", "Status"];

    let field_values = [
        state.form.name.clone(),
        state.form.email.clone(),
        state.form.company.clone().unwrap_or_default(),
        state.form.phone.clone().unwrap_or_default(),
        state.form.notes.clone().unwrap_or_default(),
        format!("< {} >", state.form.status),
    ];

    let items: Vec<ListItem> = field_names
        .iter()
        .zip(field_values.iter())
        .enumerate()
        .map(|(i, (name, value))| {
            let selected = i == state.current_field as usize;
            let content = if selected && state.editing {
                Spans::from(vec![
                    Span::styled(format!("{}: ", name), Style::default().fg(Color::Yellow)),
                    Span::styled(
                        format!("{}|", value),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                ])
            } else {
                let style = if selected {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default()
                };

                Spans::from(vec![
                    Span::styled(format!("{}: ", name), style),
                    Span::raw(value.as_str()),
                ])
            };

            ListItem::new(content)
        })
        .collect();

    let form_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Client Details"));

    f.render_widget(form_list, area);
}

pub fn handle_input(state: &mut ClientWizardState) -> Result<Option<ClientWizardAction>> {
    Ok(next_key()?.and_then(|key| state.handle_key(key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn type_text(state: &mut ClientWizardState, text: &str) {
        state.handle_key(KeyCode::Enter);
        for c in text.chars() {
            state.handle_key(KeyCode::Char(c));
        }
        state.handle_key(KeyCode::Enter);
    }

    #[test]
    fn invalid_form_shows_error() {
        let mut state = ClientWizardState::new();
        type_text(&mut state, "A");
        assert!(state.handle_key(KeyCode::Char('s')).is_none());
        assert!(state.error.as_deref().unwrap().contains("at least 2 characters"));
    }

    #[test]
    fn new_client_submits_create() {
        let mut state = ClientWizardState::new();
        type_text(&mut state, "Acme Corp");
        state.handle_key(KeyCode::Down);
        type_text(&mut state, "billing@acme.com");
        for _ in 0..4 {
            state.handle_key(KeyCode::Down);
        }
        state.handle_key(KeyCode::Right);

        match state.handle_key(KeyCode::Char('s')) {
            Some(ClientWizardAction::Save(ClientDraft::Create(client))) => {
                assert_eq!(client.name, "Acme Corp");
                assert_eq!(client.email, "billing@acme.com");
                assert_eq!(client.status, ClientStatus::Active.cycle());
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn existing_client_submits_full_patch() {
        let client = NewClient::new("Globex", "hi@globex.com").into_client("c9".into(), None, Utc::now());
        let mut state = ClientWizardState::from_existing(client);
        state.handle_key(KeyCode::Down);
        state.handle_key(KeyCode::Down);
        type_text(&mut state, "Globex Inc");

        match state.handle_key(KeyCode::Char('s')) {
            Some(ClientWizardAction::Save(ClientDraft::Update { id, patch })) => {
                assert_eq!(id, "c9");
                assert_eq!(patch.company, Some(Some("Globex Inc".to_string())));
                assert_eq!(patch.name.as_deref(), Some("Globex"));
            }
            _ => panic!("expected update"),
        }
    }
}
