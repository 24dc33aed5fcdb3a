//! Dashboard metrics derived from a project collection.
//!
//! Everything here is a pure function of its input and the supplied `now`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{Client, Project};

/// Projects shown in the dashboard's recent list.
pub const RECENT_PROJECTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Metrics {
    pub total_projects: usize,
    pub completed_projects: usize,
    pub active_projects: usize,
    pub total_revenue: f64,
    /// Percentage in `0..=100`.
    pub completion_rate: u32,
    pub average_project_value: u64,
}

pub fn aggregate(projects: &[Project]) -> Metrics {
    let total_projects = projects.len();
    let (completed_projects, total_revenue) = projects
        .iter()
        .filter(|p| p.is_completed())
        .fold((0usize, 0.0f64), |(n, sum), p| (n + 1, sum + p.budget));
    let active_projects = projects.iter().filter(|p| p.status.is_active()).count();

    let completion_rate = if total_projects == 0 {
        0
    } else {
        (100.0 * completed_projects as f64 / total_projects as f64).round() as u32
    };
    let average_project_value = if completed_projects == 0 {
        0
    } else {
        (total_revenue / completed_projects as f64).round() as u64
    };

    Metrics {
        total_projects,
        completed_projects,
        active_projects,
        total_revenue,
        completion_rate,
        average_project_value,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RevenueWindow {
    /// 30 daily buckets ending today.
    Last30Days,
    /// Current month and the five before it.
    #[default]
    Last6Months,
    /// January through the current month.
    YearToDate,
}

impl RevenueWindow {
    pub fn label(&self) -> &'static str {
        match self {
            RevenueWindow::Last30Days => "Last 30 days",
            RevenueWindow::Last6Months => "Last 6 months",
            RevenueWindow::YearToDate => "Year to date",
        }
    }

    pub fn cycle(self) -> Self {
        match self {
            RevenueWindow::Last30Days => RevenueWindow::Last6Months,
            RevenueWindow::Last6Months => RevenueWindow::YearToDate,
            RevenueWindow::YearToDate => RevenueWindow::Last30Days,
        }
    }
}

impl fmt::Display for RevenueWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RevenueWindow::Last30Days => "30d",
            RevenueWindow::Last6Months => "6m",
            RevenueWindow::YearToDate => "ytd",
        })
    }
}

impl FromStr for RevenueWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "30d" | "30days" | "month" => Ok(RevenueWindow::Last30Days),
            "6m" | "6months" => Ok(RevenueWindow::Last6Months),
            "ytd" | "year" => Ok(RevenueWindow::YearToDate),
            other => Err(format!("unknown window '{other}', expected 30d, 6m or ytd")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenuePoint {
    pub label: String,
    pub start: NaiveDate,
    pub revenue: f64,
}

enum Granularity {
    Day,
    Month,
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn bucket_starts(window: RevenueWindow, today: NaiveDate) -> (Vec<NaiveDate>, Granularity) {
    match window {
        RevenueWindow::Last30Days => {
            let first = today - Duration::days(29);
            let days = (0..30).map(|i| first + Duration::days(i)).collect();
            (days, Granularity::Day)
        }
        RevenueWindow::Last6Months => {
            let current = month_start(today);
            let first = current.checked_sub_months(Months::new(5)).unwrap_or(current);
            (months_from(first, 6), Granularity::Month)
        }
        RevenueWindow::YearToDate => {
            let first = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(month_start(today));
            (months_from(first, today.month() as usize), Granularity::Month)
        }
    }
}

fn months_from(first: NaiveDate, count: usize) -> Vec<NaiveDate> {
    (0..count as u32)
        .filter_map(|i| first.checked_add_months(Months::new(i)))
        .collect()
}

/// Completed-project revenue per day or month over `window`, with empty
/// buckets present as zero.
pub fn bucket_revenue(
    projects: &[Project],
    window: RevenueWindow,
    now: DateTime<Utc>,
) -> Vec<RevenuePoint> {
    let (starts, granularity) = bucket_starts(window, now.date_naive());
    let Some(&first) = starts.first() else {
        return Vec::new();
    };

    let mut totals = vec![0.0f64; starts.len()];
    for project in projects.iter().filter(|p| p.is_completed() && p.created_at <= now) {
        let day = project.created_at.date_naive();
        if day < first {
            continue;
        }
        let index = match granularity {
            Granularity::Day => (day - first).num_days() as usize,
            Granularity::Month => {
                ((day.year() - first.year()) * 12 + day.month() as i32 - first.month() as i32)
                    as usize
            }
        };
        if let Some(total) = totals.get_mut(index) {
            *total += project.budget;
        }
    }

    let format = match granularity {
        Granularity::Day => "%b %d",
        Granularity::Month => "%b",
    };
    starts
        .into_iter()
        .zip(totals)
        .map(|(start, revenue)| RevenuePoint {
            label: start.format(format).to_string(),
            start,
            revenue,
        })
        .collect()
}

/// Everything the dashboard screen shows.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_clients: usize,
    pub metrics: Metrics,
    pub recent_projects: Vec<Project>,
    pub window: RevenueWindow,
    pub revenue: Vec<RevenuePoint>,
}

pub fn summarize(
    clients: &[Client],
    projects: &[Project],
    window: RevenueWindow,
    now: DateTime<Utc>,
) -> DashboardSummary {
    let mut recent_projects = projects.to_vec();
    recent_projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent_projects.truncate(RECENT_PROJECTS);

    DashboardSummary {
        total_clients: clients.len(),
        metrics: aggregate(projects),
        recent_projects,
        window,
        revenue: bucket_revenue(projects, window, now),
    }
}

/// `$12,345.00`
pub fn format_currency(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let digits = (cents / 100).to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}${grouped}.{:02}", cents % 100)
}
