use std::fs::OpenOptions;
use std::io;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use freelance_hub::aggregate::{format_currency, summarize, RevenueWindow};
use freelance_hub::config::{self, Config};
use freelance_hub::db;
use freelance_hub::error::{StoreError, StoreResult};
use freelance_hub::identity::{Identity, IdentityProvider, StaticIdentity};
use freelance_hub::invoice_gen::{GeneratedInvoice, InvoiceGenerator, InvoiceRecord};
use freelance_hub::mailer::Mailer;
use freelance_hub::models::{Client, ClientPatch, ProfileUpdate, Project, ProjectPatch};
use freelance_hub::seed::{DemoSeeder, SeedMode, SeedSummary};
use freelance_hub::storage::{
    open_store, Datastore, FileKeyValueStore, GuestStore, KeyValueStore, Store,
    GUEST_USER_ID_KEY,
};
use freelance_hub::tasks::{suggest_tasks, Complexity, ProjectType, TaskRequest, Timeline};
use freelance_hub::ui::{
    client_wizard::{
        handle_input as handle_client_wizard_input, render_client_wizard, ClientDraft,
        ClientWizardAction, ClientWizardState,
    },
    clients::{handle_input as handle_clients_input, render_clients, ClientAction, ClientsState},
    dashboard::{
        handle_input as handle_dashboard_input, render_dashboard, DashboardAction, DashboardState,
    },
    project_wizard::{
        handle_input as handle_project_wizard_input, render_project_wizard, ProjectDraft,
        ProjectWizardAction, ProjectWizardState,
    },
    projects::{
        handle_input as handle_projects_input, render_projects, ProjectAction, ProjectsState,
    },
    settings::{handle_input as handle_settings_input, render_settings, SettingsAction, SettingsState},
    Notice,
};

#[derive(Parser)]
#[command(name = "freelance-hub", version, about = "Clients, projects and revenue for freelancers")]
struct Cli {
    /// Use guest mode instead of a signed-in account
    #[arg(long, global = true)]
    guest: bool,

    /// Signed-in user id (defaults to FREELANCE_HUB_USER_ID)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive dashboard (default)
    Dashboard,
    /// Print revenue and project metrics
    Summary {
        /// Revenue window: 30d, 6m or ytd
        #[arg(long, default_value_t = RevenueWindow::default())]
        window: RevenueWindow,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List clients
    Clients,
    /// List projects
    Projects,
    /// Load the demo catalog into the current account
    Seed,
    /// Write an invoice for a completed project
    Export {
        project_id: String,
        /// Email the invoice to the client over SMTP
        #[arg(long)]
        send: bool,
    },
    /// Forget all guest data stored on this machine
    ResetGuest,
    /// Suggest a task breakdown for a new project
    SuggestTasks {
        /// What the project is about (at least 10 characters)
        description: String,
        /// web-development, mobile-app, consulting, design or other
        #[arg(long = "type", default_value = "other")]
        project_type: ProjectType,
        /// simple, medium or complex
        #[arg(long, default_value_t = Complexity::default())]
        complexity: Complexity,
        /// short, medium or long
        #[arg(long, default_value_t = Timeline::default())]
        timeline: Timeline,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show or update the signed-in account's profile
    Profile {
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        username: Option<String>,
        /// http:// or https:// URL; pass an empty string to clear
        #[arg(long)]
        website: Option<String>,
    },
}

/// Everything a command needs, resolved once at startup.
struct Session {
    config: Config,
    identity: Option<Identity>,
    datastore: Option<Arc<dyn Datastore>>,
    kv: Arc<dyn KeyValueStore>,
}

impl Session {
    fn store(&self) -> Result<Box<dyn Store>> {
        open_store(self.identity.as_ref(), self.datastore.clone(), self.kv.clone())
            .map_err(|err| match err {
                StoreError::Unauthorized => {
                    anyhow!("Please log in first or use guest mode (--guest or --user <id>)")
                }
                other => other.into(),
            })
    }

    /// Label shown for the signed-in account.
    fn account(&self) -> String {
        match &self.identity {
            Some(Identity::Authenticated { user_id }) => user_id.clone(),
            _ => "Guest".to_string(),
        }
    }

    fn seeder(&self) -> Option<DemoSeeder> {
        self.datastore.clone().map(DemoSeeder::new)
    }
}

fn init_tracing(config: &Config, interactive: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if interactive {
        // The terminal belongs to the TUI; log to a file instead.
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)
            .with_context(|| format!("opening log file {}", config.log_file.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init()?;
    let command = cli.command.unwrap_or(Command::Dashboard);
    init_tracing(&config, matches!(command, Command::Dashboard))?;

    let user_id = cli.user.or_else(|| config.freelance_hub_user_id.clone());
    let identity = StaticIdentity::from_flags(cli.guest, user_id).current_identity();

    let datastore: Option<Arc<dyn Datastore>> = match config.database_url() {
        Some(_) => Some(Arc::new(db::init(&config).await?) as Arc<dyn Datastore>),
        None => {
            info!("DATABASE_URL not set, only guest-local mode is available");
            None
        }
    };

    let session = Session {
        kv: Arc::new(FileKeyValueStore::new(config.guest_store_path.clone())),
        config,
        identity,
        datastore,
    };

    match command {
        Command::Dashboard => run_dashboard(&session).await,
        Command::Summary { window, json } => print_summary(&session, window, json).await,
        Command::Clients => print_clients(&session).await,
        Command::Projects => print_projects(&session).await,
        Command::Seed => seed(&session).await,
        Command::Export { project_id, send } => export(&session, &project_id, send).await,
        Command::ResetGuest => reset_guest(&session).await,
        Command::SuggestTasks {
            description,
            project_type,
            complexity,
            timeline,
            json,
        } => {
            let request = TaskRequest {
                description,
                project_type,
                complexity,
                timeline,
            };
            print_task_plan(&session, &request, json)
        }
        Command::Profile {
            full_name,
            username,
            website,
        } => profile(&session, full_name, username, website).await,
    }
}

async fn print_summary(session: &Session, window: RevenueWindow, json: bool) -> Result<()> {
    let store = session.store()?;
    let clients = store.list_clients().await?;
    let projects = store.list_projects().await?;
    let summary = summarize(&clients, &projects, window, Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let metrics = &summary.metrics;
    println!("Total revenue:      {}", format_currency(metrics.total_revenue));
    println!("Clients:            {}", summary.total_clients);
    println!(
        "Projects:           {} ({} active, {} completed)",
        metrics.total_projects, metrics.active_projects, metrics.completed_projects
    );
    println!("Completion rate:    {}%", metrics.completion_rate);
    println!(
        "Avg. project value: {}",
        format_currency(metrics.average_project_value as f64)
    );

    println!("\nRevenue ({}):", window.label());
    for point in &summary.revenue {
        println!("  {:<8} {:>14}", point.label, format_currency(point.revenue));
    }

    println!("\nRecent projects:");
    for project in &summary.recent_projects {
        println!(
            "  {:<36} {:<12} {:>14}",
            project.title,
            project.status.label(),
            format_currency(project.budget)
        );
    }
    Ok(())
}

async fn print_clients(session: &Session) -> Result<()> {
    let clients = session.store()?.list_clients().await?;
    if clients.is_empty() {
        println!("No clients yet.");
    }
    for client in clients {
        println!(
            "{:<40} {:<28} {:<32} {}",
            client.id,
            client.name,
            client.email,
            client.status.as_str()
        );
    }
    Ok(())
}

async fn print_projects(session: &Session) -> Result<()> {
    let projects = session.store()?.list_projects().await?;
    if projects.is_empty() {
        println!("No projects yet.");
    }
    for project in projects {
        println!(
            "{:<40} {:<36} {:<12} {:>14}",
            project.id,
            project.title,
            project.status.label(),
            format_currency(project.budget)
        );
    }
    Ok(())
}

/// Seeds demo data for the current identity. A guest's backing identity id
/// is remembered so later sessions, and later seeds, reuse it.
async fn seed_current(session: &Session) -> Result<SeedSummary> {
    let seeder = session
        .seeder()
        .context("Demo data needs a database connection (set DATABASE_URL)")?;

    let mode = match &session.identity {
        Some(Identity::Guest) => SeedMode::Guest {
            backing_id: session.kv.get(GUEST_USER_ID_KEY)?,
        },
        Some(Identity::Authenticated { .. }) => SeedMode::Authenticated,
        None => bail!("Please log in first or use guest mode"),
    };

    let summary = seeder.seed(mode, session.identity.as_ref()).await?;
    if let Some(guest_id) = &summary.guest_user_id {
        session.kv.set(GUEST_USER_ID_KEY, guest_id)?;
    }
    Ok(summary)
}

async fn seed(session: &Session) -> Result<()> {
    let summary = seed_current(session).await?;
    println!(
        "Created {} clients and {} projects.",
        summary.clients_created, summary.projects_created
    );
    if let Some(guest_id) = summary.guest_user_id {
        println!("Guest account {guest_id} will be used for --guest sessions.");
    }
    Ok(())
}

/// Writes the invoice files for a completed project.
async fn write_invoice(
    session: &Session,
    project: &Project,
    clients: &[Client],
) -> Result<(InvoiceRecord, GeneratedInvoice)> {
    let client = project
        .client_id
        .as_deref()
        .and_then(|id| clients.iter().find(|c| c.id == id));
    let record = InvoiceRecord::for_project(project, client, Local::now().date_naive())?;

    let generator = InvoiceGenerator::new(&session.config.invoice_dir)?;
    let generated = tokio::task::block_in_place(|| generator.generate(&record))?;
    Ok((record, generated))
}

async fn export(session: &Session, project_id: &str, send: bool) -> Result<()> {
    let store = session.store()?;
    let projects = store.list_projects().await?;
    let project = projects
        .iter()
        .find(|p| p.id == project_id)
        .with_context(|| format!("project {project_id} not found"))?;
    let clients = store.list_clients().await?;

    let (record, generated) = write_invoice(session, project, &clients).await?;
    println!("Invoice {} written:", record.number);
    println!("  Markdown: {}", generated.markdown_path.display());
    println!("  PDF:      {}", generated.pdf_path.display());
    if !generated.converted {
        println!("  (pandoc unavailable, the .pdf file holds the Markdown text)");
    }

    if send {
        let smtp = session
            .config
            .smtp()
            .context("SMTP_HOST, SMTP_USERNAME, SMTP_PASSWORD and SMTP_FROM must be set to send")?;
        let recipient = record
            .client_email()
            .context("the project has no client email to send to")?
            .to_string();
        let mailer = Mailer::new(smtp);
        tokio::task::spawn_blocking(move || mailer.send(&record, &generated, &recipient))
            .await??;
        println!("Invoice sent.");
    }
    Ok(())
}

async fn reset_guest(session: &Session) -> Result<()> {
    GuestStore::new(session.kv.clone()).clear_all()?;

    if let Some(guest_id) = session.kv.get(GUEST_USER_ID_KEY)? {
        if let Some(datastore) = &session.datastore {
            datastore.remove_guest_identity(&guest_id).await?;
        } else {
            warn!(%guest_id, "no datastore configured, seeded guest rows were left in place");
        }
        session.kv.remove(GUEST_USER_ID_KEY)?;
    }

    println!("Guest data cleared.");
    Ok(())
}

fn print_task_plan(session: &Session, request: &TaskRequest, json: bool) -> Result<()> {
    let plan = suggest_tasks(request)?;
    info!(project_type = %plan.project_type, tasks = plan.tasks.len(), "task plan suggested");

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!(
        "{} / {} / {} timeline: about {} ({}h)",
        plan.project_type,
        plan.complexity,
        plan.timeline,
        plan.estimated_duration,
        plan.total_hours()
    );
    for task in &plan.tasks {
        println!(
            "  [{:<6}] {:<40} {:>3}h  {}",
            task.priority, task.title, task.estimated_hours, task.category
        );
        if !task.dependencies.is_empty() {
            println!("           after: {}", task.dependencies.join(", "));
        }
    }
    if !matches!(session.identity, Some(Identity::Authenticated { .. })) {
        println!("Sign in to save these tasks to your projects.");
    }
    Ok(())
}

async fn profile(
    session: &Session,
    full_name: Option<String>,
    username: Option<String>,
    website: Option<String>,
) -> Result<()> {
    let store = session.store()?;
    let current = store.get_profile().await.map_err(profile_error)?;

    let profile = if full_name.is_none() && username.is_none() && website.is_none() {
        current
    } else {
        let mut update = current
            .as_ref()
            .map(ProfileUpdate::from_profile)
            .unwrap_or_default();
        if let Some(full_name) = full_name {
            update.full_name = full_name;
        }
        if let Some(username) = username {
            update.username = username;
        }
        if let Some(website) = website {
            update.website = website;
        }
        let saved = store.update_profile(update).await.map_err(profile_error)?;
        info!(account = %session.account(), "profile updated from the command line");
        Some(saved)
    };

    let Some(profile) = profile else {
        println!("No profile saved for {} yet.", session.account());
        return Ok(());
    };
    println!("Account:   {}", session.account());
    println!("Full name: {}", profile.full_name.as_deref().unwrap_or("-"));
    println!("Username:  {}", profile.username.as_deref().unwrap_or("-"));
    println!("Website:   {}", profile.website.as_deref().unwrap_or("-"));
    if let Some(updated_at) = profile.updated_at {
        println!("Updated:   {}", updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

fn profile_error(err: StoreError) -> anyhow::Error {
    match err {
        StoreError::Unauthorized => anyhow!("Profiles need a signed-in account (--user <id>)"),
        other => other.into(),
    }
}

// Represents the current screen in the app
enum AppScreen {
    Dashboard,
    Clients,
    ClientWizard,
    Projects,
    ProjectWizard,
    Settings,
}

// Main application state
struct AppState<'a> {
    session: &'a Session,
    store: Box<dyn Store>,
    screen: AppScreen,
    window: RevenueWindow,
    /// Placeholder ids for optimistic inserts.
    next_pending: u64,
    dashboard_state: Option<DashboardState>,
    clients_state: Option<ClientsState>,
    client_wizard_state: Option<ClientWizardState>,
    projects_state: Option<ProjectsState>,
    project_wizard_state: Option<ProjectWizardState>,
    settings_state: Option<SettingsState>,
}

impl<'a> AppState<'a> {
    fn new(session: &'a Session, store: Box<dyn Store>) -> Self {
        Self {
            session,
            store,
            screen: AppScreen::Dashboard,
            window: RevenueWindow::default(),
            next_pending: 0,
            dashboard_state: None,
            clients_state: None,
            client_wizard_state: None,
            projects_state: None,
            project_wizard_state: None,
            settings_state: None,
        }
    }

    fn pending_id(&mut self, entity: &str) -> String {
        self.next_pending += 1;
        format!("pending-{entity}-{}", self.next_pending)
    }
}

async fn run_dashboard(session: &Session) -> Result<()> {
    let store = session.store()?;

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app_state = AppState::new(session, store);
    let result = match load_dashboard(&mut app_state).await {
        Ok(()) => run_app(&mut terminal, &mut app_state).await,
        Err(err) => Err(err),
    };

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        error!(error = %err, "dashboard exited with an error");
    }
    result
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState<'_>) -> Result<()> {
    loop {
        terminal.draw(|f| match app_state.screen {
            AppScreen::Dashboard => {
                if let Some(state) = &mut app_state.dashboard_state {
                    render_dashboard(f, state);
                }
            }
            AppScreen::Clients => {
                if let Some(state) = &mut app_state.clients_state {
                    render_clients(f, state);
                }
            }
            AppScreen::ClientWizard => {
                if let Some(state) = &mut app_state.client_wizard_state {
                    render_client_wizard(f, state);
                }
            }
            AppScreen::Projects => {
                if let Some(state) = &mut app_state.projects_state {
                    render_projects(f, state);
                }
            }
            AppScreen::ProjectWizard => {
                if let Some(state) = &mut app_state.project_wizard_state {
                    render_project_wizard(f, state);
                }
            }
            AppScreen::Settings => {
                if let Some(state) = &mut app_state.settings_state {
                    render_settings(f, state);
                }
            }
        })?;

        let should_quit = match app_state.screen {
            AppScreen::Dashboard => handle_dashboard_screen(app_state).await?,
            AppScreen::Clients => handle_clients_screen(app_state).await?,
            AppScreen::ClientWizard => handle_client_wizard_screen(app_state).await?,
            AppScreen::Projects => handle_projects_screen(app_state).await?,
            AppScreen::ProjectWizard => handle_project_wizard_screen(app_state).await?,
            AppScreen::Settings => handle_settings_screen(app_state).await?,
        };

        if should_quit {
            break;
        }
    }

    Ok(())
}

async fn load_dashboard(app_state: &mut AppState<'_>) -> Result<()> {
    let clients = app_state.store.list_clients().await?;
    let projects = app_state.store.list_projects().await?;
    app_state.dashboard_state = Some(DashboardState::new(
        app_state.store.mode(),
        clients,
        projects,
        app_state.window,
        Utc::now(),
    ));
    app_state.screen = AppScreen::Dashboard;
    Ok(())
}

/// Reloads the dashboard, keeping the old one with a notice if loading fails.
async fn show_dashboard(app_state: &mut AppState<'_>, notice: Option<Notice>) {
    if let Err(err) = load_dashboard(app_state).await {
        warn!(error = %err, "dashboard reload failed");
        app_state.screen = AppScreen::Dashboard;
        if let Some(state) = &mut app_state.dashboard_state {
            state.notice = Some(Notice::error(format!("Failed to load data: {err}")));
        }
        return;
    }
    if let (Some(state), Some(notice)) = (&mut app_state.dashboard_state, notice) {
        state.notice = Some(notice);
    }
}

async fn handle_dashboard_screen(app_state: &mut AppState<'_>) -> Result<bool> {
    let Some(state) = &mut app_state.dashboard_state else {
        return Ok(false);
    };
    let action = handle_dashboard_input(state)?;
    app_state.window = state.window();

    match action {
        Some(DashboardAction::Quit) => return Ok(true),
        Some(DashboardAction::Refresh) => show_dashboard(app_state, None).await,
        Some(DashboardAction::Clients) => match app_state.store.list_clients().await {
            Ok(clients) => {
                app_state.clients_state = Some(ClientsState::new(clients));
                app_state.screen = AppScreen::Clients;
            }
            Err(err) => state.notice = Some(Notice::error(format!("Failed to load clients: {err}"))),
        },
        Some(DashboardAction::Projects) => {
            match load_projects(app_state.store.as_ref()).await {
                Ok((projects, clients)) => {
                    app_state.projects_state = Some(ProjectsState::new(projects, clients));
                    app_state.screen = AppScreen::Projects;
                }
                Err(err) => {
                    state.notice = Some(Notice::error(format!("Failed to load projects: {err}")))
                }
            }
        }
        Some(DashboardAction::Settings) => match app_state.store.get_profile().await {
            Ok(profile) => {
                let account = app_state.session.account();
                app_state.settings_state = Some(SettingsState::new(account, profile.as_ref()));
                app_state.screen = AppScreen::Settings;
            }
            Err(StoreError::Unauthorized) => {
                state.notice = Some(Notice::error("Sign in to manage your profile"))
            }
            Err(err) => state.notice = Some(Notice::error(format!("Failed to load profile: {err}"))),
        },
        Some(DashboardAction::SeedDemo) => {
            let notice = match seed_current(app_state.session).await {
                Ok(summary) => {
                    // A seeded guest now lives in the datastore.
                    app_state.store = app_state.session.store()?;
                    Notice::info(format!(
                        "Demo data loaded: {} clients, {} projects",
                        summary.clients_created, summary.projects_created
                    ))
                }
                Err(err) => Notice::error(err.to_string()),
            };
            show_dashboard(app_state, Some(notice)).await;
        }
        None => {}
    }

    Ok(false)
}

async fn handle_settings_screen(app_state: &mut AppState<'_>) -> Result<bool> {
    let Some(state) = &mut app_state.settings_state else {
        return Ok(false);
    };

    match handle_settings_input(state)? {
        Some(SettingsAction::Back) => {
            app_state.settings_state = None;
            app_state.screen = AppScreen::Dashboard;
        }
        Some(SettingsAction::Save(update)) => match app_state.store.update_profile(update).await {
            Ok(profile) => state.saved(&profile),
            Err(err) => {
                warn!(error = %err, "profile update failed");
                state.fail(format!("Failed to update profile: {err}"));
            }
        },
        None => {}
    }

    Ok(false)
}

async fn load_projects(store: &dyn Store) -> StoreResult<(Vec<Project>, Vec<Client>)> {
    Ok((store.list_projects().await?, store.list_clients().await?))
}

async fn handle_clients_screen(app_state: &mut AppState<'_>) -> Result<bool> {
    let Some(state) = &mut app_state.clients_state else {
        return Ok(false);
    };

    match handle_clients_input(state)? {
        Some(ClientAction::Back) => show_dashboard(app_state, None).await,
        Some(ClientAction::NewClient) => {
            app_state.client_wizard_state = Some(ClientWizardState::new());
            app_state.screen = AppScreen::ClientWizard;
        }
        Some(ClientAction::EditClient(client)) => {
            app_state.client_wizard_state = Some(ClientWizardState::from_existing(client));
            app_state.screen = AppScreen::ClientWizard;
        }
        Some(ClientAction::DeleteClient(id)) => {
            if let Some(token) = state.clients.remove(&id) {
                state.sync_selection();
                let result = app_state.store.delete_client(&id).await;
                state.notice = Some(match state.clients.settle(token, result.map(|_| None::<Client>)) {
                    Ok(_) => Notice::info("Client deleted"),
                    Err(err) => Notice::error(format!("Failed to delete client: {err}")),
                });
                state.sync_selection();
            }
        }
        Some(ClientAction::CycleStatus(id, status)) => {
            let patch = ClientPatch {
                status: Some(status),
                ..ClientPatch::default()
            };
            update_client(app_state.store.as_ref(), state, &id, patch).await;
        }
        None => {}
    }

    Ok(false)
}

/// Applies `patch` to the listed client right away and reverts it if the
/// store rejects the update.
async fn update_client(store: &dyn Store, state: &mut ClientsState, id: &str, patch: ClientPatch) {
    let Some(mut optimistic) = state.clients.items().iter().find(|c| c.id == id).cloned() else {
        return;
    };
    if let Err(err) = patch.apply(&mut optimistic, Utc::now()) {
        state.notice = Some(Notice::error(err.to_string()));
        return;
    }
    let Some(token) = state.clients.update(optimistic) else {
        return;
    };

    let result = store.update_client(id, patch).await;
    state.notice = Some(match state.clients.settle(token, result) {
        Ok(client) => Notice::info(format!("Saved {}", client.name)),
        Err(err) => Notice::error(format!("Failed to update client: {err}")),
    });
}

async fn handle_client_wizard_screen(app_state: &mut AppState<'_>) -> Result<bool> {
    let Some(wizard) = &mut app_state.client_wizard_state else {
        return Ok(false);
    };

    match handle_client_wizard_input(wizard)? {
        Some(ClientWizardAction::Cancel) => {
            app_state.client_wizard_state = None;
            app_state.screen = AppScreen::Clients;
        }
        Some(ClientWizardAction::Save(draft)) => {
            app_state.client_wizard_state = None;
            app_state.screen = AppScreen::Clients;
            let pending_id = app_state.pending_id("client");
            let Some(state) = &mut app_state.clients_state else {
                return Ok(false);
            };

            match draft {
                ClientDraft::Create(new_client) => {
                    let token = state
                        .clients
                        .insert(new_client.clone().into_client(pending_id, None, Utc::now()));
                    state.sync_selection();
                    let result = app_state.store.create_client(new_client).await;
                    state.notice = Some(match state.clients.settle(token, result) {
                        Ok(client) => Notice::info(format!("Created {}", client.name)),
                        Err(err) => Notice::error(format!("Failed to create client: {err}")),
                    });
                    state.sync_selection();
                }
                ClientDraft::Update { id, patch } => {
                    update_client(app_state.store.as_ref(), state, &id, patch).await;
                }
            }
        }
        None => {}
    }

    Ok(false)
}

async fn handle_projects_screen(app_state: &mut AppState<'_>) -> Result<bool> {
    let Some(state) = &mut app_state.projects_state else {
        return Ok(false);
    };
    let today = Local::now().date_naive();

    match handle_projects_input(state)? {
        Some(ProjectAction::Back) => show_dashboard(app_state, None).await,
        Some(ProjectAction::NewProject) => {
            app_state.project_wizard_state = Some(ProjectWizardState::new(state.clients(), today));
            app_state.screen = AppScreen::ProjectWizard;
        }
        Some(ProjectAction::EditProject(project)) => {
            app_state.project_wizard_state =
                Some(ProjectWizardState::from_existing(project, state.clients(), today));
            app_state.screen = AppScreen::ProjectWizard;
        }
        Some(ProjectAction::DeleteProject(id)) => {
            if let Some(token) = state.projects.remove(&id) {
                state.sync_selection();
                let result = app_state.store.delete_project(&id).await;
                state.notice = Some(match state.projects.settle(token, result.map(|_| None::<Project>)) {
                    Ok(_) => Notice::info("Project deleted"),
                    Err(err) => Notice::error(format!("Failed to delete project: {err}")),
                });
                state.sync_selection();
            }
        }
        Some(ProjectAction::CycleStatus(id, status)) => {
            let patch = ProjectPatch {
                status: Some(status),
                ..ProjectPatch::default()
            };
            update_project(app_state.store.as_ref(), state, &id, patch).await;
        }
        Some(ProjectAction::ExportInvoice(id)) => {
            let project = state.projects.items().iter().find(|p| p.id == id).cloned();
            if let Some(project) = project {
                state.notice = Some(match write_invoice(app_state.session, &project, state.clients()).await {
                    Ok((record, generated)) => Notice::info(format!(
                        "Invoice {} written to {}",
                        record.number,
                        generated.pdf_path.display()
                    )),
                    Err(err) => Notice::error(format!("Failed to export invoice: {err}")),
                });
            }
        }
        None => {}
    }

    Ok(false)
}

async fn update_project(
    store: &dyn Store,
    state: &mut ProjectsState,
    id: &str,
    patch: ProjectPatch,
) {
    let Some(mut optimistic) = state.projects.items().iter().find(|p| p.id == id).cloned() else {
        return;
    };
    if let Err(err) = patch.apply(&mut optimistic, Utc::now()) {
        state.notice = Some(Notice::error(err.to_string()));
        return;
    }
    let Some(token) = state.projects.update(optimistic) else {
        return;
    };

    let result = store.update_project(id, patch).await;
    state.notice = Some(match state.projects.settle(token, result) {
        Ok(project) => Notice::info(format!("Saved {} ({})", project.title, project.status.label())),
        Err(err) => Notice::error(format!("Failed to update project: {err}")),
    });
}

async fn handle_project_wizard_screen(app_state: &mut AppState<'_>) -> Result<bool> {
    let Some(wizard) = &mut app_state.project_wizard_state else {
        return Ok(false);
    };

    match handle_project_wizard_input(wizard)? {
        Some(ProjectWizardAction::Cancel) => {
            app_state.project_wizard_state = None;
            app_state.screen = AppScreen::Projects;
        }
        Some(ProjectWizardAction::Save(draft)) => {
            app_state.project_wizard_state = None;
            app_state.screen = AppScreen::Projects;
            let pending_id = app_state.pending_id("project");
            let Some(state) = &mut app_state.projects_state else {
                return Ok(false);
            };

            match draft {
                ProjectDraft::Create(new_project) => {
                    let token = state
                        .projects
                        .insert(new_project.clone().into_project(pending_id, None, Utc::now()));
                    state.sync_selection();
                    let result = app_state.store.create_project(new_project).await;
                    state.notice = Some(match state.projects.settle(token, result) {
                        Ok(project) => Notice::info(format!("Created {}", project.title)),
                        Err(err) => Notice::error(format!("Failed to create project: {err}")),
                    });
                    state.sync_selection();
                }
                ProjectDraft::Update { id, patch } => {
                    update_project(app_state.store.as_ref(), state, &id, patch).await;
                }
            }
        }
        None => {}
    }

    Ok(false)
}
