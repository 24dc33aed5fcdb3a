use chrono::{Datelike, NaiveDate};
use crossterm::event::KeyCode;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DatePart {
    Year,
    Month,
    Day,
}

/// Segment-wise entry for an optional date (`YYYY-MM-DD`).
pub struct DateInputState {
    pub date: Option<NaiveDate>,
    /// Starting point for the first edit of an unset date.
    fallback: NaiveDate,
    pub editing: bool,
    pub date_part: DatePart,
    pub current_date_input: String,
}

impl DateInputState {
    pub fn new(date: Option<NaiveDate>, fallback: NaiveDate) -> Self {
        Self {
            date,
            fallback,
            editing: false,
            date_part: DatePart::Year,
            current_date_input: String::new(),
        }
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        if self.editing {
            self.date_part = DatePart::Year;
            self.current_date_input.clear();
            if self.date.is_none() {
                self.date = Some(self.fallback);
            }
        }
    }

    pub fn clear(&mut self) {
        self.date = None;
        self.current_date_input.clear();
    }

    pub fn next_date_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Year => DatePart::Month,
            DatePart::Month => DatePart::Day,
            DatePart::Day => DatePart::Year,
        };
        self.current_date_input.clear();
    }

    pub fn previous_date_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Year => DatePart::Day,
            DatePart::Month => DatePart::Year,
            DatePart::Day => DatePart::Month,
        };
        self.current_date_input.clear();
    }

    pub fn handle_input(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match key {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                let current = self.date.unwrap_or(self.fallback);
                self.current_date_input.push(c);

                let width = if self.date_part == DatePart::Year { 4 } else { 2 };
                if self.current_date_input.len() < width {
                    return;
                }
                let entered = self.current_date_input.parse::<u32>().ok();
                self.current_date_input.clear();

                let updated = entered.and_then(|value| match self.date_part {
                    DatePart::Year if (1900..=2100).contains(&value) => {
                        let day = current.day().min(days_in_month(value as i32, current.month()));
                        NaiveDate::from_ymd_opt(value as i32, current.month(), day)
                    }
                    DatePart::Month if (1..=12).contains(&value) => {
                        let day = current.day().min(days_in_month(current.year(), value));
                        NaiveDate::from_ymd_opt(current.year(), value, day)
                    }
                    DatePart::Day => current.with_day(value),
                    _ => None,
                });
                if let Some(date) = updated {
                    self.date = Some(date);
                }
            }
            KeyCode::Backspace => {
                self.current_date_input.pop();
            }
            KeyCode::Delete => self.clear(),
            KeyCode::Right => self.next_date_part(),
            KeyCode::Left => self.previous_date_part(),
            _ => {}
        }
    }

    pub fn get_display_string(&self) -> String {
        let Some(date) = self.date else {
            return "Not set".to_string();
        };
        let (year, month, day) = (
            date.format("%Y").to_string(),
            date.format("%m").to_string(),
            date.format("%d").to_string(),
        );
        if !self.editing {
            return format!("{year}-{month}-{day}");
        }

        let current_input = if !self.current_date_input.is_empty() {
            format!("[{}]", self.current_date_input)
        } else {
            match self.date_part {
                DatePart::Year => "[YYYY]".to_string(),
                DatePart::Month => "[MM]".to_string(),
                DatePart::Day => "[DD]".to_string(),
            }
        };

        match self.date_part {
            DatePart::Year => format!("{year}{current_input}-{month}-{day}"),
            DatePart::Month => format!("{year}-{month}{current_input}-{day}"),
            DatePart::Day => format!("{year}-{month}-{day}{current_input}"),
        }
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn type_digits(state: &mut DateInputState, digits: &str) {
        for c in digits.chars() {
            state.handle_input(KeyCode::Char(c));
        }
    }

    #[test]
    fn unset_date_starts_from_fallback() {
        let mut state = DateInputState::new(None, date(2026, 3, 15));
        assert_eq!(state.get_display_string(), "Not set");

        state.toggle_editing();
        assert_eq!(state.date, Some(date(2026, 3, 15)));
        type_digits(&mut state, "2027");
        state.handle_input(KeyCode::Right);
        type_digits(&mut state, "01");
        state.handle_input(KeyCode::Right);
        type_digits(&mut state, "09");
        assert_eq!(state.date, Some(date(2027, 1, 9)));
    }

    #[test]
    fn month_change_clamps_the_day() {
        let mut state = DateInputState::new(Some(date(2024, 1, 31)), date(2024, 1, 1));
        state.toggle_editing();
        state.handle_input(KeyCode::Right);
        type_digits(&mut state, "02");
        assert_eq!(state.date, Some(date(2024, 2, 29)));
    }

    #[test]
    fn out_of_range_input_is_ignored() {
        let mut state = DateInputState::new(Some(date(2025, 6, 30)), date(2025, 1, 1));
        state.toggle_editing();
        state.handle_input(KeyCode::Left);
        type_digits(&mut state, "31");
        assert_eq!(state.date, Some(date(2025, 6, 30)));
        assert_eq!(state.get_display_string(), "2025-06-30[DD]");

        state.handle_input(KeyCode::Delete);
        assert_eq!(state.date, None);
    }
}
