use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::event::KeyCode;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{BarChart, Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::aggregate::{format_currency, summarize, DashboardSummary, RevenueWindow};
use crate::models::{Client, Project};
use crate::storage::StoreMode;
use crate::ui::{expire, next_key, render_notice, Notice};

pub enum DashboardAction {
    Quit,
    Clients,
    Projects,
    Refresh,
    SeedDemo,
    Settings,
}

pub struct DashboardState {
    mode: StoreMode,
    clients: Vec<Client>,
    projects: Vec<Project>,
    pub summary: DashboardSummary,
    pub notice: Option<Notice>,
}

impl DashboardState {
    pub fn new(
        mode: StoreMode,
        clients: Vec<Client>,
        projects: Vec<Project>,
        window: RevenueWindow,
        now: DateTime<Utc>,
    ) -> Self {
        let summary = summarize(&clients, &projects, window, now);
        Self {
            mode,
            clients,
            projects,
            summary,
            notice: None,
        }
    }

    pub fn window(&self) -> RevenueWindow {
        self.summary.window
    }

    pub fn cycle_window(&mut self, now: DateTime<Utc>) {
        self.summary = summarize(&self.clients, &self.projects, self.window().cycle(), now);
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty() && self.projects.is_empty()
    }

    fn mode_label(&self) -> String {
        match &self.mode {
            StoreMode::Remote { owner_id } => format!("Signed in as {owner_id}"),
            StoreMode::GuestLocal => "Guest mode (stored on this machine)".to_string(),
        }
    }

    pub fn handle_key(&mut self, key: KeyCode) -> Option<DashboardAction> {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => Some(DashboardAction::Quit),
            KeyCode::Char('c') => Some(DashboardAction::Clients),
            KeyCode::Char('p') => Some(DashboardAction::Projects),
            KeyCode::Char('r') => Some(DashboardAction::Refresh),
            KeyCode::Char('a') => Some(DashboardAction::Settings),
            KeyCode::Char('s') if self.is_empty() => Some(DashboardAction::SeedDemo),
            KeyCode::Char('w') => {
                self.cycle_window(Utc::now());
                None
            }
            _ => None,
        }
    }
}

pub fn render_dashboard<B: Backend>(frame: &mut Frame<B>, state: &mut DashboardState) {
    expire(&mut state.notice);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(4),
                Constraint::Min(10),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(frame.size());

    let title = Paragraph::new(Spans::from(vec![
        Span::styled("Freelance Hub", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(state.mode_label(), Style::default().fg(Color::Gray)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, chunks[0]);

    render_metrics(frame, state, chunks[1]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
        .split(chunks[2]);
    render_revenue(frame, state, body[0]);
    render_recent(frame, state, body[1]);

    if state.notice.is_some() {
        render_notice(frame, chunks[3], &state.notice);
    } else {
        let mut help = String::from("<C> Clients | <P> Projects | <W> Revenue window | <R> Refresh | <A> Settings");
        if state.is_empty() {
            help.push_str(" | <S> Load demo data");
        }
        help.push_str(" | <Q> Quit");
        let buttons = Paragraph::new(help)
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(Color::White));
        frame.render_widget(buttons, chunks[3]);
    }
}

fn render_metrics<B: Backend>(frame: &mut Frame<B>, state: &DashboardState, area: Rect) {
    let metrics = &state.summary.metrics;
    let cards = [
        ("Total Revenue", format_currency(metrics.total_revenue)),
        ("Clients", state.summary.total_clients.to_string()),
        (
            "Projects",
            format!("{} ({} active)", metrics.total_projects, metrics.active_projects),
        ),
        ("Completion", format!("{}%", metrics.completion_rate)),
        (
            "Avg. Project",
            format_currency(metrics.average_project_value as f64),
        ),
    ];

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(20); 5].as_ref())
        .split(area);

    for ((title, value), column) in cards.into_iter().zip(columns) {
        let card = Paragraph::new(Span::styled(
            value,
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(card, column);
    }
}

fn render_revenue<B: Backend>(frame: &mut Frame<B>, state: &DashboardState, area: Rect) {
    let bars: Vec<(&str, u64)> = state
        .summary
        .revenue
        .iter()
        .map(|point| (point.label.as_str(), point.revenue.max(0.0).round() as u64))
        .collect();

    let title = format!("Revenue ({})", state.window().label());
    let bar_width = match state.window() {
        RevenueWindow::Last30Days => 1,
        _ => 7,
    };

    let chart = BarChart::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .data(&bars)
        .bar_width(bar_width)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Blue))
        .value_style(Style::default().fg(Color::Black).bg(Color::Blue));
    frame.render_widget(chart, area);
}

fn render_recent<B: Backend>(frame: &mut Frame<B>, state: &DashboardState, area: Rect) {
    let items: Vec<ListItem> = if state.summary.recent_projects.is_empty() {
        vec![ListItem::new("No projects yet")]
    } else {
        state
            .summary
            .recent_projects
            .iter()
            .map(|project| {
                ListItem::new(vec![
                    Spans::from(Span::styled(
                        project.title.as_str(),
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Spans::from(vec![
                        Span::styled(project.status.label(), Style::default().fg(Color::Yellow)),
                        Span::raw("  "),
                        Span::raw(format_currency(project.budget)),
                    ]),
                ])
            })
            .collect()
    };

    let list = List::new(items).block(Block::default().title("Recent Projects").borders(Borders::ALL));
    frame.render_widget(list, area);
}

pub fn handle_input(state: &mut DashboardState) -> Result<Option<DashboardAction>> {
    Ok(next_key()?.and_then(|key| state.handle_key(key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProjectStatus;
    use chrono::TimeZone;

    fn state(projects: Vec<Project>) -> DashboardState {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        DashboardState::new(StoreMode::GuestLocal, Vec::new(), projects, RevenueWindow::default(), now)
    }

    fn completed(budget: f64) -> Project {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        Project {
            id: format!("p{budget}"),
            owner_id: None,
            title: "Site".into(),
            description: None,
            budget,
            status: ProjectStatus::Completed,
            client_id: None,
            deadline: None,
            start_date: None,
            actual_end_date: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn seeding_is_offered_only_when_empty() {
        let mut empty = state(Vec::new());
        assert!(matches!(empty.handle_key(KeyCode::Char('s')), Some(DashboardAction::SeedDemo)));

        let mut filled = state(vec![completed(500.0)]);
        assert!(filled.handle_key(KeyCode::Char('s')).is_none());
        assert_eq!(filled.summary.metrics.total_revenue, 500.0);
    }

    #[test]
    fn a_opens_settings() {
        let mut state = state(Vec::new());
        assert!(matches!(state.handle_key(KeyCode::Char('a')), Some(DashboardAction::Settings)));
    }

    #[test]
    fn w_cycles_the_revenue_window() {
        let mut state = state(vec![completed(500.0)]);
        assert_eq!(state.window(), RevenueWindow::Last6Months);
        assert!(state.handle_key(KeyCode::Char('w')).is_none());
        assert_eq!(state.window(), RevenueWindow::YearToDate);
        assert_eq!(state.summary.metrics.completed_projects, 1);
    }
}
