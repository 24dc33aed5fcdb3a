use anyhow::Result;
use crossterm::event::KeyCode;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::models::{Client, ClientStatus};
use crate::optimistic::OptimisticList;
use crate::ui::{
    centered_rect, clamp_selection, expire, next_key, render_notice, select_next,
    select_previous, Notice,
};

// Represents the state of the client list screen
pub struct ClientsState {
    pub clients: OptimisticList<Client>,
    list_state: ListState,
    show_delete_confirmation: bool,
    pub notice: Option<Notice>,
}

impl ClientsState {
    pub fn new(clients: Vec<Client>) -> Self {
        let mut list_state = ListState::default();
        if !clients.is_empty() {
            list_state.select(Some(0));
        }

        Self {
            clients: OptimisticList::new(clients),
            list_state,
            show_delete_confirmation: false,
            notice: None,
        }
    }

    pub fn next(&mut self) {
        select_next(&mut self.list_state, self.clients.len());
    }

    pub fn previous(&mut self) {
        select_previous(&mut self.list_state, self.clients.len());
    }

    /// Call after the list changed underneath the selection.
    pub fn sync_selection(&mut self) {
        clamp_selection(&mut self.list_state, self.clients.len());
    }

    pub fn toggle_delete_confirmation(&mut self) {
        self.show_delete_confirmation = !self.show_delete_confirmation;
    }

    pub fn selected_client(&self) -> Option<&Client> {
        self.list_state.selected().and_then(|i| self.clients.get(i))
    }

    pub fn selected_client_id(&self) -> Option<String> {
        self.selected_client().map(|c| c.id.clone())
    }

    pub fn handle_key(&mut self, key: KeyCode) -> Option<ClientAction> {
        if self.show_delete_confirmation {
            match key {
                KeyCode::Char('y') => {
                    self.toggle_delete_confirmation();
                    return self.selected_client_id().map(ClientAction::DeleteClient);
                }
                KeyCode::Char('n') | KeyCode::Char('q') | KeyCode::Esc => {
                    self.toggle_delete_confirmation();
                }
                _ => {}
            }
            return None;
        }

        match key {
            KeyCode::Char('q') | KeyCode::Esc => return Some(ClientAction::Back),
            KeyCode::Char('n') => return Some(ClientAction::NewClient),
            KeyCode::Char('e') | KeyCode::Enter => {
                return self.selected_client().cloned().map(ClientAction::EditClient);
            }
            KeyCode::Char('s') => {
                return self.selected_client().map(|c| {
                    ClientAction::CycleStatus(c.id.clone(), c.status.cycle())
                });
            }
            KeyCode::Char('d') => {
                if self.selected_client().is_some() {
                    self.toggle_delete_confirmation();
                }
            }
            KeyCode::Down => self.next(),
            KeyCode::Up => self.previous(),
            _ => {}
        }
        None
    }
}

pub enum ClientAction {
    Back,
    NewClient,
    EditClient(Client),
    DeleteClient(String),
    CycleStatus(String, ClientStatus),
}

fn status_color(status: ClientStatus) -> Color {
    match status {
        ClientStatus::Active => Color::Green,
        ClientStatus::Inactive => Color::DarkGray,
        ClientStatus::Prospect => Color::Yellow,
    }
}

pub fn render_clients<B: Backend>(frame: &mut Frame<B>, state: &mut ClientsState) {
    expire(&mut state.notice);
    let size = frame.size();

    // Create the layout
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)].as_ref())
        .split(size);

    let items: Vec<ListItem> = state
        .clients
        .items()
        .iter()
        .map(|client| {
            let mut spans = vec![
                Span::styled(
                    format!("{:<28}", client.name),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("{:<32}", client.email)),
                Span::styled(
                    format!("{:<10}", client.status.as_str()),
                    Style::default().fg(status_color(client.status)),
                ),
            ];
            if let Some(company) = &client.company {
                spans.push(Span::raw(company.as_str()));
            }
            ListItem::new(Spans::from(spans))
        })
        .collect();

    let title = format!("Clients ({})", state.clients.len());
    let clients_list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(clients_list, chunks[0], &mut state.list_state);

    if state.notice.is_some() {
        render_notice(frame, chunks[1], &state.notice);
    } else {
        let buttons_text = if state.selected_client().is_some() {
            "<N> New Client | <E> Edit Client | <S> Cycle Status | <D> Delete Client | <Esc> Back"
        } else {
            "<N> New Client | <Esc> Back"
        };

        let buttons = Paragraph::new(buttons_text)
            .block(Block::default().borders(Borders::TOP))
            .style(Style::default().fg(Color::White));

        frame.render_widget(buttons, chunks[1]);
    }

    // Render delete confirmation popup if needed
    if state.show_delete_confirmation {
        render_delete_confirmation(frame, size);
    }
}

fn render_delete_confirmation<B: Backend>(frame: &mut Frame<B>, size: Rect) {
    let popup_area = centered_rect(50, 20, size);

    let popup = Paragraph::new(vec![
        Spans::from(""),
        Spans::from("Are you sure you want to delete this client?"),
        Spans::from(""),
        Spans::from("Projects for this client are kept without a client."),
        Spans::from(""),
        Spans::from("<Y> Yes  <N> No"),
    ])
    .block(Block::default().title("Confirm Delete").borders(Borders::ALL))
    .style(Style::default().fg(Color::White).bg(Color::Black));

    frame.render_widget(popup, popup_area);
}

pub fn handle_input(state: &mut ClientsState) -> Result<Option<ClientAction>> {
    Ok(next_key()?.and_then(|key| state.handle_key(key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewClient;
    use chrono::Utc;

    fn clients() -> Vec<Client> {
        ["Acme", "Globex"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                NewClient::new(*name, format!("hi@{}.com", name.to_lowercase())).into_client(
                    format!("c{i}"),
                    None,
                    Utc::now(),
                )
            })
            .collect()
    }

    #[test]
    fn delete_needs_confirmation() {
        let mut state = ClientsState::new(clients());
        assert!(state.handle_key(KeyCode::Char('d')).is_none());
        assert!(state.handle_key(KeyCode::Down).is_none());
        match state.handle_key(KeyCode::Char('y')) {
            Some(ClientAction::DeleteClient(id)) => assert_eq!(id, "c0"),
            _ => panic!("expected delete"),
        }
    }

    #[test]
    fn status_cycles_from_current() {
        let mut state = ClientsState::new(clients());
        state.handle_key(KeyCode::Down);
        match state.handle_key(KeyCode::Char('s')) {
            Some(ClientAction::CycleStatus(id, status)) => {
                assert_eq!(id, "c1");
                assert_eq!(status, ClientStatus::Active.cycle());
            }
            _ => panic!("expected status change"),
        }
    }

    #[test]
    fn selection_survives_optimistic_removal() {
        let mut state = ClientsState::new(clients());
        state.handle_key(KeyCode::Down);
        let token = state.clients.remove("c1").unwrap();
        state.sync_selection();
        assert_eq!(state.selected_client_id().as_deref(), Some("c0"));

        state.clients.rollback(token);
        assert_eq!(state.clients.len(), 2);
    }
}
