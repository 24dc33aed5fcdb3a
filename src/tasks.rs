//! Task breakdown suggestions for a new project.
//!
//! Suggestions come from a fixed catalog keyed by project type and
//! complexity, scaled by the timeline. Nothing here touches a store.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::StoreError;

const MIN_DESCRIPTION_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    WebDevelopment,
    MobileApp,
    Consulting,
    Design,
    Other,
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProjectType::WebDevelopment => "web-development",
            ProjectType::MobileApp => "mobile-app",
            ProjectType::Consulting => "consulting",
            ProjectType::Design => "design",
            ProjectType::Other => "other",
        })
    }
}

impl FromStr for ProjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "web-development" | "web" => Ok(ProjectType::WebDevelopment),
            "mobile-app" | "mobile" => Ok(ProjectType::MobileApp),
            "consulting" => Ok(ProjectType::Consulting),
            "design" => Ok(ProjectType::Design),
            "other" => Ok(ProjectType::Other),
            other => Err(format!(
                "unknown project type '{other}', expected web-development, mobile-app, consulting, design or other"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    Medium,
    Complex,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Complexity::Simple => "simple",
            Complexity::Medium => "medium",
            Complexity::Complex => "complex",
        })
    }
}

impl FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Complexity::Simple),
            "medium" => Ok(Complexity::Medium),
            "complex" => Ok(Complexity::Complex),
            other => Err(format!("unknown complexity '{other}', expected simple, medium or complex")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeline {
    Short,
    #[default]
    Medium,
    Long,
}

impl Timeline {
    /// Scale applied to every catalog estimate.
    pub fn multiplier(&self) -> f64 {
        match self {
            Timeline::Short => 0.7,
            Timeline::Medium => 1.0,
            Timeline::Long => 1.5,
        }
    }
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Timeline::Short => "short",
            Timeline::Medium => "medium",
            Timeline::Long => "long",
        })
    }
}

impl FromStr for Timeline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(Timeline::Short),
            "medium" => Ok(Timeline::Medium),
            "long" => Ok(Timeline::Long),
            other => Err(format!("unknown timeline '{other}', expected short, medium or long")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskCategory {
    Setup,
    Design,
    Development,
    Testing,
    Deployment,
    General,
}

impl TaskCategory {
    /// First matching keyword group wins.
    pub fn for_title(title: &str) -> Self {
        let title = title.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| title.contains(w));
        if has(&["setup", "environment"]) {
            TaskCategory::Setup
        } else if has(&["design", "ui"]) {
            TaskCategory::Design
        } else if has(&["develop", "implement"]) {
            TaskCategory::Development
        } else if has(&["test", "debug"]) {
            TaskCategory::Testing
        } else if has(&["deploy", "release"]) {
            TaskCategory::Deployment
        } else {
            TaskCategory::General
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub description: String,
    pub project_type: ProjectType,
    pub complexity: Complexity,
    pub timeline: Timeline,
}

impl TaskRequest {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.description.trim().chars().count() < MIN_DESCRIPTION_CHARS {
            return Err(StoreError::validation(format!(
                "Project description must be at least {MIN_DESCRIPTION_CHARS} characters"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSuggestion {
    pub title: String,
    pub estimated_hours: u32,
    pub priority: Priority,
    pub category: TaskCategory,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPlan {
    pub project_type: ProjectType,
    pub complexity: Complexity,
    pub timeline: Timeline,
    pub estimated_duration: &'static str,
    pub tasks: Vec<TaskSuggestion>,
}

impl TaskPlan {
    pub fn total_hours(&self) -> u32 {
        self.tasks.iter().map(|t| t.estimated_hours).sum()
    }
}

type Template = (&'static str, u32, Priority);

use Priority::{High, Low, Medium as Med};

const GENERAL: &[Template] = &[
    ("Project kickoff meeting", 2, High),
    ("Requirements documentation", 4, High),
    ("Project planning", 6, Med),
    ("Regular progress updates", 8, Med),
    ("Final delivery", 4, Low),
];

const WEB_SIMPLE: &[Template] = &[
    ("Setup project repository", 2, High),
    ("Create basic HTML structure", 4, High),
    ("Implement responsive CSS", 8, Med),
    ("Add basic JavaScript functionality", 6, Med),
    ("Testing and bug fixes", 4, Low),
];

const WEB_MEDIUM: &[Template] = &[
    ("Setup development environment", 4, High),
    ("Design database schema", 6, High),
    ("Implement backend API", 16, High),
    ("Build frontend components", 20, Med),
    ("Integrate frontend with backend", 8, Med),
    ("Implement authentication", 6, Med),
    ("Add payment processing", 10, Low),
    ("Testing and deployment", 8, Low),
];

const WEB_COMPLEX: &[Template] = &[
    ("Architecture planning", 8, High),
    ("Setup microservices infrastructure", 20, High),
    ("Implement core business logic", 40, High),
    ("Build admin dashboard", 24, Med),
    ("Implement real-time features", 16, Med),
    ("Add analytics and reporting", 12, Med),
    ("Implement caching strategy", 8, Low),
    ("Security audit and hardening", 16, Low),
    ("Performance optimization", 12, Low),
    ("Documentation and deployment", 16, Low),
];

const MOBILE_SIMPLE: &[Template] = &[
    ("Setup development environment", 4, High),
    ("Design app wireframes", 6, High),
    ("Implement core screens", 12, Med),
    ("Add navigation", 4, Med),
    ("Testing and debugging", 6, Low),
];

const MOBILE_MEDIUM: &[Template] = &[
    ("Setup React Native/Flutter project", 6, High),
    ("Design UI/UX mockups", 12, High),
    ("Implement authentication", 8, High),
    ("Build core features", 24, Med),
    ("Integrate with backend API", 12, Med),
    ("Add push notifications", 6, Med),
    ("Offline functionality", 8, Low),
    ("App store submission", 4, Low),
];

const MOBILE_COMPLEX: &[Template] = &[
    ("Technical architecture design", 12, High),
    ("Setup CI/CD pipeline", 16, High),
    ("Implement advanced features", 40, High),
    ("Real-time synchronization", 20, Med),
    ("Advanced animations", 16, Med),
    ("Background processing", 12, Med),
    ("Security implementation", 16, Low),
    ("Performance optimization", 12, Low),
    ("Multi-platform deployment", 8, Low),
];

const CONSULTING_SIMPLE: &[Template] = &[
    ("Initial client consultation", 2, High),
    ("Requirements gathering", 4, High),
    ("Analysis and recommendations", 6, Med),
    ("Report preparation", 4, Med),
    ("Follow-up meeting", 2, Low),
];

const CONSULTING_MEDIUM: &[Template] = &[
    ("Discovery phase", 8, High),
    ("Stakeholder interviews", 12, High),
    ("Process analysis", 16, Med),
    ("Solution design", 12, Med),
    ("Implementation planning", 8, Med),
    ("Training sessions", 6, Low),
    ("Documentation", 4, Low),
];

const CONSULTING_COMPLEX: &[Template] = &[
    ("Comprehensive audit", 20, High),
    ("Market research", 16, High),
    ("Strategic planning", 24, High),
    ("Change management", 16, Med),
    ("Team training", 12, Med),
    ("Performance metrics setup", 8, Med),
    ("Long-term roadmap", 12, Low),
    ("Success measurement", 4, Low),
];

const DESIGN_SIMPLE: &[Template] = &[
    ("Design brief analysis", 2, High),
    ("Mood board creation", 4, High),
    ("Initial sketches", 6, Med),
    ("Digital mockups", 8, Med),
    ("Final revisions", 4, Low),
];

const DESIGN_MEDIUM: &[Template] = &[
    ("Research and discovery", 6, High),
    ("User persona creation", 8, High),
    ("Wireframing", 12, Med),
    ("High-fidelity designs", 20, Med),
    ("Prototyping", 8, Med),
    ("Design system creation", 12, Low),
    ("Asset preparation", 4, Low),
];

const DESIGN_COMPLEX: &[Template] = &[
    ("Comprehensive research", 12, High),
    ("User journey mapping", 16, High),
    ("Information architecture", 12, High),
    ("Interaction design", 20, Med),
    ("Visual design system", 24, Med),
    ("Animation design", 12, Med),
    ("Accessibility compliance", 8, Low),
    ("Cross-platform adaptation", 8, Low),
];

fn templates(project_type: ProjectType, complexity: Complexity) -> &'static [Template] {
    use Complexity as C;
    use ProjectType as P;
    match (project_type, complexity) {
        (P::WebDevelopment, C::Simple) => WEB_SIMPLE,
        (P::WebDevelopment, C::Medium) => WEB_MEDIUM,
        (P::WebDevelopment, C::Complex) => WEB_COMPLEX,
        (P::MobileApp, C::Simple) => MOBILE_SIMPLE,
        (P::MobileApp, C::Medium) => MOBILE_MEDIUM,
        (P::MobileApp, C::Complex) => MOBILE_COMPLEX,
        (P::Consulting, C::Simple) => CONSULTING_SIMPLE,
        (P::Consulting, C::Medium) => CONSULTING_MEDIUM,
        (P::Consulting, C::Complex) => CONSULTING_COMPLEX,
        (P::Design, C::Simple) => DESIGN_SIMPLE,
        (P::Design, C::Medium) => DESIGN_MEDIUM,
        (P::Design, C::Complex) => DESIGN_COMPLEX,
        (P::Other, _) => GENERAL,
    }
}

fn mentions(title: &str, words: &[&str]) -> bool {
    let title = title.to_lowercase();
    words.iter().any(|w| title.contains(w))
}

/// Build work waits on the first setup task; test and deploy work waits on
/// every build task.
fn dependencies(title: &str, all: &[Template]) -> Vec<String> {
    let mut deps = Vec::new();
    if mentions(title, &["implement", "build"]) {
        if let Some((setup, _, _)) = all.iter().find(|(t, _, _)| mentions(t, &["setup", "environment"])) {
            deps.push(setup.to_string());
        }
    }
    if mentions(title, &["test", "deploy"]) {
        deps.extend(
            all.iter()
                .filter(|(t, _, _)| mentions(t, &["implement", "build"]))
                .map(|(t, _, _)| t.to_string()),
        );
    }
    deps
}

pub fn estimated_duration(complexity: Complexity, timeline: Timeline) -> &'static str {
    match (complexity, timeline) {
        (Complexity::Simple, Timeline::Short) => "1-2 weeks",
        (Complexity::Simple, Timeline::Medium) => "2-4 weeks",
        (Complexity::Simple, Timeline::Long) => "4-6 weeks",
        (Complexity::Medium, Timeline::Short) => "2-4 weeks",
        (Complexity::Medium, Timeline::Medium) => "4-8 weeks",
        (Complexity::Medium, Timeline::Long) => "8-12 weeks",
        (Complexity::Complex, Timeline::Short) => "4-6 weeks",
        (Complexity::Complex, Timeline::Medium) => "8-12 weeks",
        (Complexity::Complex, Timeline::Long) => "12-20 weeks",
    }
}

pub fn suggest_tasks(request: &TaskRequest) -> Result<TaskPlan, StoreError> {
    request.validate()?;

    let catalog = templates(request.project_type, request.complexity);
    let scale = request.timeline.multiplier();
    let tasks = catalog
        .iter()
        .map(|&(title, hours, priority)| TaskSuggestion {
            title: title.to_string(),
            estimated_hours: (f64::from(hours) * scale).round() as u32,
            priority,
            category: TaskCategory::for_title(title),
            dependencies: dependencies(title, catalog),
        })
        .collect();

    Ok(TaskPlan {
        project_type: request.project_type,
        complexity: request.complexity,
        timeline: request.timeline,
        estimated_duration: estimated_duration(request.complexity, request.timeline),
        tasks,
    })
}
