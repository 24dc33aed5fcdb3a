use anyhow::Result;
use chrono::NaiveDate;
use crossterm::event::KeyCode;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::models::{Client, NewProject, Project, ProjectPatch, ProjectStatus};
use crate::ui::components::date_input::DateInputState;
use crate::ui::next_key;

pub enum ProjectDraft {
    Create(NewProject),
    Update { id: String, patch: ProjectPatch },
}

pub enum ProjectWizardAction {
    Cancel,
    Save(ProjectDraft),
}

#[derive(Clone, PartialEq, Copy, Debug)]
pub enum ProjectField {
    Title,
    Description,
    Budget,
    Status,
    Client,
    Deadline,
}

const FIELDS: [ProjectField; 6] = [
    ProjectField::Title,
    ProjectField::Description,
    ProjectField::Budget,
    ProjectField::Status,
    ProjectField::Client,
    ProjectField::Deadline,
];

/// (id, name) of the clients a project can be assigned to.
type ClientChoice = (String, String);

pub struct ProjectWizardState {
    editing_id: Option<String>,
    pub title: String,
    pub description: String,
    pub budget: String,
    pub status: ProjectStatus,
    clients: Vec<ClientChoice>,
    /// Index into `clients`; `None` means unassigned.
    client_index: Option<usize>,
    pub deadline_state: DateInputState,
    pub current_field: ProjectField,
    pub editing: bool,
    pub error: Option<String>,
}

impl ProjectWizardState {
    pub fn new(clients: &[Client], today: NaiveDate) -> Self {
        Self {
            editing_id: None,
            title: String::new(),
            description: String::new(),
            budget: String::new(),
            status: ProjectStatus::default(),
            clients: choices(clients),
            client_index: None,
            deadline_state: DateInputState::new(None, today),
            current_field: ProjectField::Title,
            editing: false,
            error: None,
        }
    }

    pub fn from_existing(project: Project, clients: &[Client], today: NaiveDate) -> Self {
        let clients = choices(clients);
        let client_index = project
            .client_id
            .as_deref()
            .and_then(|id| clients.iter().position(|(cid, _)| cid == id));
        Self {
            editing_id: Some(project.id),
            title: project.title,
            description: project.description.unwrap_or_default(),
            budget: format_budget(project.budget),
            status: project.status,
            clients,
            client_index,
            deadline_state: DateInputState::new(project.deadline, today),
            current_field: ProjectField::Title,
            editing: false,
            error: None,
        }
    }

    pub fn is_new(&self) -> bool {
        self.editing_id.is_none()
    }

    fn client_label(&self) -> &str {
        self.client_index
            .and_then(|i| self.clients.get(i))
            .map(|(_, name)| name.as_str())
            .unwrap_or("No client")
    }

    fn client_id(&self) -> Option<String> {
        self.client_index
            .and_then(|i| self.clients.get(i))
            .map(|(id, _)| id.clone())
    }

    pub fn toggle_editing(&mut self) {
        match self.current_field {
            ProjectField::Status | ProjectField::Client => {
                self.editing = false;
            }
            ProjectField::Deadline => {
                self.editing = !self.editing;
                if self.editing != self.deadline_state.editing {
                    self.deadline_state.toggle_editing();
                }
            }
            _ => self.editing = !self.editing,
        }
    }

    pub fn next_field(&mut self) {
        let i = FIELDS.iter().position(|f| *f == self.current_field).unwrap_or(0);
        self.current_field = FIELDS[(i + 1) % FIELDS.len()];
    }

    pub fn previous_field(&mut self) {
        let i = FIELDS.iter().position(|f| *f == self.current_field).unwrap_or(0);
        self.current_field = FIELDS[(i + FIELDS.len() - 1) % FIELDS.len()];
    }

    /// Left/Right on a picker field.
    fn pick(&mut self, forward: bool) {
        match self.current_field {
            ProjectField::Status => {
                self.status = if forward {
                    self.status.cycle()
                } else {
                    let i = ProjectStatus::ALL.iter().position(|s| *s == self.status).unwrap_or(0);
                    ProjectStatus::ALL[(i + ProjectStatus::ALL.len() - 1) % ProjectStatus::ALL.len()]
                };
            }
            ProjectField::Client => {
                let len = self.clients.len();
                if len == 0 {
                    return;
                }
                // None sits between the last and the first client.
                self.client_index = match (self.client_index, forward) {
                    (None, true) => Some(0),
                    (None, false) => Some(len - 1),
                    (Some(i), true) if i + 1 < len => Some(i + 1),
                    (Some(0), false) => None,
                    (Some(i), false) => Some(i - 1),
                    (Some(_), true) => None,
                };
            }
            _ => {}
        }
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        let field_value = match self.current_field {
            ProjectField::Title => &mut self.title,
            ProjectField::Description => &mut self.description,
            ProjectField::Budget => {
                if let KeyCode::Char(c) = key {
                    if !(c.is_ascii_digit() || c == '.') {
                        return;
                    }
                }
                &mut self.budget
            }
            ProjectField::Deadline => {
                self.deadline_state.handle_input(key);
                return;
            }
            ProjectField::Status | ProjectField::Client => return,
        };

        match key {
            KeyCode::Char(c) => field_value.push(c),
            KeyCode::Backspace => {
                field_value.pop();
            }
            _ => {}
        }
    }

    pub fn submit(&mut self) -> Option<ProjectDraft> {
        let budget = if self.budget.trim().is_empty() {
            0.0
        } else {
            match self.budget.trim().parse::<f64>() {
                Ok(budget) => budget,
                Err(_) => {
                    self.error = Some("Budget must be a number".to_string());
                    return None;
                }
            }
        };

        let description = Some(self.description.clone()).filter(|d| !d.trim().is_empty());
        let project = NewProject {
            title: self.title.clone(),
            description,
            budget,
            status: self.status,
            client_id: self.client_id(),
            deadline: self.deadline_state.date,
            ..NewProject::default()
        };
        if let Err(err) = project.validate() {
            self.error = Some(err.to_string());
            return None;
        }
        self.error = None;

        Some(match &self.editing_id {
            None => ProjectDraft::Create(project),
            Some(id) => ProjectDraft::Update {
                id: id.clone(),
                patch: ProjectPatch {
                    title: Some(project.title),
                    description: Some(project.description),
                    budget: Some(project.budget),
                    status: Some(project.status),
                    client_id: Some(project.client_id),
                    deadline: Some(project.deadline),
                },
            },
        })
    }

    pub fn handle_key(&mut self, key: KeyCode) -> Option<ProjectWizardAction> {
        match key {
            KeyCode::Esc => {
                if self.editing {
                    self.toggle_editing();
                } else {
                    return Some(ProjectWizardAction::Cancel);
                }
            }
            KeyCode::Enter => self.toggle_editing(),
            KeyCode::Up if !self.editing => self.previous_field(),
            KeyCode::Down | KeyCode::Tab if !self.editing => self.next_field(),
            KeyCode::Left if !self.editing => self.pick(false),
            KeyCode::Right if !self.editing => self.pick(true),
            KeyCode::Delete if !self.editing && self.current_field == ProjectField::Deadline => {
                self.deadline_state.clear();
            }
            KeyCode::Char('s') if !self.editing => {
                return self.submit().map(ProjectWizardAction::Save);
            }
            _ if self.editing => self.edit_current_field(key),
            _ => {}
        }
        None
    }
}

fn choices(clients: &[Client]) -> Vec<ClientChoice> {
    clients.iter().map(|c| (c.id.clone(), c.name.clone())).collect()
}

fn format_budget(budget: f64) -> String {
    if budget.fract() == 0.0 {
        format!("{budget:.0}")
    } else {
        budget.to_string()
    }
}

pub fn render_project_wizard<B: Backend>(f: &mut Frame<B>, state: &mut ProjectWizardState) {
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

    let title_text = if state.is_new() {
        "New Project"
    } else {
        "Edit Project"
    };

    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_form(f, state, chunks[1]);

    let (help_text, style) = match (&state.error, state.editing) {
        (Some(error), _) => (error.as_str(), Style::default().fg(Color::Red)),
        (None, true) if state.current_field == ProjectField::Deadline => (
            "Enter - Save field | Left/Right - Switch date part | Del - Clear | Esc - Cancel editing",
            Style::default().fg(Color::Gray),
        ),
        (None, true) => (
            "Enter - Save field | Esc - Cancel editing",
            Style::default().fg(Color::Gray),
        ),
        (None, false) => (
            "Enter - Edit field | Up/Down - Navigate | Left/Right - Choose | S - Save project | Esc - Cancel",
            Style::default().fg(Color::Gray),
        ),
    };

    let help = Paragraph::new(help_text)
        .style(style)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &mut ProjectWizardState, area: Rect) {
    let field_names = ["Title", "Description", "Budget ($)", "Status", "Client", "Deadline"];

    let field_values = [
        state.title.clone(),
        state.description.clone(),
        state.budget.clone(),
        format!("< {} >", state.status.label()),
        format!("< {} >", state.client_label()),
        state.deadline_state.get_display_string(),
    ];

    let items: Vec<ListItem> = field_names
        .iter()
        .zip(field_values.iter())
        .enumerate()
        .map(|(i, (name, value))| {
            let selected = FIELDS[i] == state.current_field;
            let content = if selected && state.editing {
                let displayed_value = if FIELDS[i] == ProjectField::Deadline {
                    value.clone()
                } else {
                    format!("{}|", value)
                };

                Spans::from(vec![
                    Span::styled(format!("{}: ", name), Style::default().fg(Color::Yellow)),
                    Span::styled(displayed_value, Style::default().add_modifier(Modifier::BOLD)),
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
        .block(Block::default().borders(Borders::ALL).title("Project Details"));

    f.render_widget(form_list, area);
}

pub fn handle_input(state: &mut ProjectWizardState) -> Result<Option<ProjectWizardAction>> {
    Ok(next_key()?.and_then(|key| state.handle_key(key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewClient;
    use chrono::Utc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()
    }

    fn clients() -> Vec<Client> {
        vec![
            NewClient::new("Acme", "hi@acme.com").into_client("c1".into(), None, Utc::now()),
            NewClient::new("Globex", "hi@globex.com").into_client("c2".into(), None, Utc::now()),
        ]
    }

    fn type_text(state: &mut ProjectWizardState, text: &str) {
        state.handle_key(KeyCode::Enter);
        for c in text.chars() {
            state.handle_key(KeyCode::Char(c));
        }
        state.handle_key(KeyCode::Enter);
    }

    fn go_to(state: &mut ProjectWizardState, field: ProjectField) {
        while state.current_field != field {
            state.handle_key(KeyCode::Down);
        }
    }

    #[test]
    fn new_project_collects_every_field() {
        let mut state = ProjectWizardState::new(&clients(), today());
        type_text(&mut state, "Landing page");
        go_to(&mut state, ProjectField::Budget);
        type_text(&mut state, "12a50.5");
        go_to(&mut state, ProjectField::Status);
        state.handle_key(KeyCode::Right);
        state.handle_key(KeyCode::Right);
        go_to(&mut state, ProjectField::Client);
        state.handle_key(KeyCode::Left);
        go_to(&mut state, ProjectField::Deadline);
        type_text(&mut state, "2026");

        match state.handle_key(KeyCode::Char('s')) {
            Some(ProjectWizardAction::Save(ProjectDraft::Create(project))) => {
                assert_eq!(project.title, "Landing page");
                assert_eq!(project.budget, 1250.5);
                assert_eq!(project.status, ProjectStatus::Completed);
                assert_eq!(project.client_id.as_deref(), Some("c2"));
                assert_eq!(project.deadline, Some(today()));
                assert_eq!(project.description, None);
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn empty_title_is_rejected() {
        let mut state = ProjectWizardState::new(&[], today());
        assert!(state.handle_key(KeyCode::Char('s')).is_none());
        assert!(state.error.as_deref().unwrap().contains("Title is required"));
    }

    #[test]
    fn edit_can_unassign_client_and_clear_deadline() {
        let mut project = NewProject::new("Shop", 900.0, ProjectStatus::InProgress);
        project.client_id = Some("c2".into());
        project.deadline = Some(today());
        let project = project.into_project("p1".into(), None, Utc::now());

        let mut state = ProjectWizardState::from_existing(project, &clients(), today());
        assert_eq!(state.budget, "900");
        go_to(&mut state, ProjectField::Client);
        state.handle_key(KeyCode::Right);
        go_to(&mut state, ProjectField::Deadline);
        state.handle_key(KeyCode::Delete);

        match state.handle_key(KeyCode::Char('s')) {
            Some(ProjectWizardAction::Save(ProjectDraft::Update { id, patch })) => {
                assert_eq!(id, "p1");
                assert_eq!(patch.client_id, Some(None));
                assert_eq!(patch.deadline, Some(None));
                assert_eq!(patch.budget, Some(900.0));
            }
            _ => panic!("expected update"),
        }
    }
}
