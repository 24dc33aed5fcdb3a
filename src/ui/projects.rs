use anyhow::Result;
use crossterm::event::KeyCode;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Spans,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::aggregate::format_currency;
use crate::models::{Client, Project, ProjectStatus};
use crate::optimistic::OptimisticList;
use crate::ui::{
    centered_rect, clamp_selection, expire, next_key, render_notice, select_next,
    select_previous, Notice,
};

pub struct ProjectsState {
    pub projects: OptimisticList<Project>,
    clients: Vec<Client>,
    table_state: TableState,
    show_delete_confirmation: bool,
    pub notice: Option<Notice>,
}

impl ProjectsState {
    pub fn new(projects: Vec<Project>, clients: Vec<Client>) -> Self {
        let mut table_state = TableState::default();
        if !projects.is_empty() {
            table_state.select(Some(0));
        }

        Self {
            projects: OptimisticList::new(projects),
            clients,
            table_state,
            show_delete_confirmation: false,
            notice: None,
        }
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn client_name(&self, client_id: Option<&str>) -> Option<&str> {
        let id = client_id?;
        self.clients
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    }

    pub fn next(&mut self) {
        select_next(&mut self.table_state, self.projects.len());
    }

    pub fn previous(&mut self) {
        select_previous(&mut self.table_state, self.projects.len());
    }

    pub fn sync_selection(&mut self) {
        clamp_selection(&mut self.table_state, self.projects.len());
    }

    pub fn selected_project(&self) -> Option<&Project> {
        self.table_state.selected().and_then(|i| self.projects.get(i))
    }

    pub fn handle_key(&mut self, key: KeyCode) -> Option<ProjectAction> {
        if self.show_delete_confirmation {
            match key {
                KeyCode::Char('y') => {
                    self.show_delete_confirmation = false;
                    return self
                        .selected_project()
                        .map(|p| ProjectAction::DeleteProject(p.id.clone()));
                }
                KeyCode::Char('n') | KeyCode::Char('q') | KeyCode::Esc => {
                    self.show_delete_confirmation = false;
                }
                _ => {}
            }
            return None;
        }

        match key {
            KeyCode::Char('q') | KeyCode::Esc => return Some(ProjectAction::Back),
            KeyCode::Char('n') => return Some(ProjectAction::NewProject),
            KeyCode::Char('e') | KeyCode::Enter => {
                return self.selected_project().cloned().map(ProjectAction::EditProject);
            }
            KeyCode::Char('s') => {
                return self
                    .selected_project()
                    .map(|p| ProjectAction::CycleStatus(p.id.clone(), p.status.cycle()));
            }
            KeyCode::Char('x') => match self.selected_project() {
                Some(p) if p.is_completed() => {
                    return Some(ProjectAction::ExportInvoice(p.id.clone()));
                }
                Some(_) => {
                    self.notice = Some(Notice::error("Only completed projects can be invoiced"));
                }
                None => {}
            },
            KeyCode::Char('d') => {
                if self.selected_project().is_some() {
                    self.show_delete_confirmation = true;
                }
            }
            KeyCode::Down => self.next(),
            KeyCode::Up => self.previous(),
            _ => {}
        }
        None
    }
}

pub enum ProjectAction {
    Back,
    NewProject,
    EditProject(Project),
    DeleteProject(String),
    CycleStatus(String, ProjectStatus),
    ExportInvoice(String),
}

fn status_color(status: ProjectStatus) -> Color {
    match status {
        ProjectStatus::Planning => Color::Cyan,
        ProjectStatus::InProgress => Color::Yellow,
        ProjectStatus::Completed => Color::Green,
        ProjectStatus::OnHold => Color::Magenta,
        ProjectStatus::Cancelled => Color::DarkGray,
    }
}

pub fn render_projects<B: Backend>(frame: &mut Frame<B>, state: &mut ProjectsState) {
    expire(&mut state.notice);
    let size = frame.size();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)].as_ref())
        .split(size);

    let header = Row::new(["Title", "Client", "Status", "Budget", "Deadline"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    let rows: Vec<Row> = state
        .projects
        .items()
        .iter()
        .map(|project| {
            let client = state
                .client_name(project.client_id.as_deref())
                .unwrap_or("-")
                .to_string();
            let deadline = project
                .deadline
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string());
            Row::new(vec![
                Cell::from(project.title.clone()),
                Cell::from(client),
                Cell::from(project.status.label())
                    .style(Style::default().fg(status_color(project.status))),
                Cell::from(format_currency(project.budget)),
                Cell::from(deadline),
            ])
        })
        .collect();

    let title = format!("Projects ({})", state.projects.len());
    let table = Table::new(rows)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL))
        .widths(&[
            Constraint::Percentage(32),
            Constraint::Percentage(22),
            Constraint::Percentage(14),
            Constraint::Percentage(16),
            Constraint::Percentage(16),
        ])
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(table, chunks[0], &mut state.table_state);

    if state.notice.is_some() {
        render_notice(frame, chunks[1], &state.notice);
    } else {
        let buttons_text = if state.selected_project().is_some() {
            "<N> New | <E> Edit | <S> Cycle Status | <X> Export Invoice | <D> Delete | <Esc> Back"
        } else {
            "<N> New Project | <Esc> Back"
        };

        let buttons = Paragraph::new(buttons_text)
            .block(Block::default().borders(Borders::TOP))
            .style(Style::default().fg(Color::White));

        frame.render_widget(buttons, chunks[1]);
    }

    if state.show_delete_confirmation {
        render_delete_confirmation(frame, size);
    }
}

fn render_delete_confirmation<B: Backend>(frame: &mut Frame<B>, size: Rect) {
    let popup_area = centered_rect(50, 20, size);

    let popup = Paragraph::new(vec![
        Spans::from(""),
        Spans::from("Are you sure you want to delete this project?"),
        Spans::from(""),
        Spans::from("<Y> Yes  <N> No"),
    ])
    .block(Block::default().title("Confirm Delete").borders(Borders::ALL))
    .style(Style::default().fg(Color::White).bg(Color::Black));

    frame.render_widget(popup, popup_area);
}

pub fn handle_input(state: &mut ProjectsState) -> Result<Option<ProjectAction>> {
    Ok(next_key()?.and_then(|key| state.handle_key(key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewClient, NewProject};
    use chrono::Utc;

    fn state() -> ProjectsState {
        let now = Utc::now();
        let client = NewClient::new("Acme", "hi@acme.com").into_client("c1".into(), None, now);
        let mut done = NewProject::new("Shop", 900.0, ProjectStatus::Completed);
        done.client_id = Some("c1".into());
        let projects = vec![
            done.into_project("p1".into(), None, now),
            NewProject::new("Blog", 300.0, ProjectStatus::InProgress).into_project("p2".into(), None, now),
        ];
        ProjectsState::new(projects, vec![client])
    }

    #[test]
    fn export_only_for_completed() {
        let mut state = state();
        assert!(matches!(
            state.handle_key(KeyCode::Char('x')),
            Some(ProjectAction::ExportInvoice(id)) if id == "p1"
        ));

        state.handle_key(KeyCode::Down);
        assert!(state.handle_key(KeyCode::Char('x')).is_none());
        assert!(state.notice.is_some());
    }

    #[test]
    fn client_names_resolve() {
        let state = state();
        assert_eq!(state.client_name(Some("c1")), Some("Acme"));
        assert_eq!(state.client_name(Some("gone")), None);
        assert_eq!(state.client_name(None), None);
    }

    #[test]
    fn delete_asks_first() {
        let mut state = state();
        assert!(state.handle_key(KeyCode::Char('d')).is_none());
        assert!(state.handle_key(KeyCode::Char('n')).is_none());
        assert!(state.handle_key(KeyCode::Char('y')).is_none());
        state.handle_key(KeyCode::Char('d'));
        assert!(matches!(
            state.handle_key(KeyCode::Char('y')),
            Some(ProjectAction::DeleteProject(id)) if id == "p1"
        ));
    }
}
