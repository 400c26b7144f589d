//! Date window for incremental crawls.

use chrono::{Days, NaiveDate};

use crate::error::{AppError, Result};

/// Inclusive run of days from the day after `since` through `today`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    days: Vec<NaiveDate>,
}

impl DateWindow {
    /// Build the window following `since`, which must be before `today`.
    pub fn since(since: NaiveDate, today: NaiveDate) -> Result<Self> {
        if since >= today {
            return Err(AppError::config(format!(
                "since date {since} must be before today ({today})"
            )));
        }

        let days = since
            .iter_days()
            .skip(1)
            .take_while(|day| *day <= today)
            .collect();
        Ok(Self { days })
    }

    /// Parse an ISO `YYYY-MM-DD` date and build the window up to `today`.
    pub fn parse(since: &str, today: NaiveDate) -> Result<Self> {
        let date = NaiveDate::parse_from_str(since.trim(), "%Y-%m-%d")
            .map_err(|e| AppError::config(format!("invalid since date '{since}': {e}")))?;
        Self::since(date, today)
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.days.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.days.last().copied()
    }
}

impl IntoIterator for DateWindow {
    type Item = NaiveDate;
    type IntoIter = std::vec::IntoIter<NaiveDate>;

    fn into_iter(self) -> Self::IntoIter {
        self.days.into_iter()
    }
}

/// The day before `date`, for callers that want "since yesterday".
pub fn previous_day(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_yesterday_yields_today_only() {
        let today = date("2024-03-10");
        let window = DateWindow::since(previous_day(today).unwrap(), today).unwrap();
        assert_eq!(window.days(), &[today]);
    }

    #[test]
    fn test_today_or_future_is_rejected() {
        let today = date("2024-03-10");
        let err = DateWindow::since(today, today).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(DateWindow::since(date("2024-03-11"), today).is_err());
    }

    #[test]
    fn test_window_is_inclusive_and_ordered() {
        let today = date("2024-03-02");
        let window = DateWindow::parse("2024-02-27", today).unwrap();
        let days: Vec<_> = window.into_iter().map(|d| d.to_string()).collect();
        // 2024 is a leap year
        assert_eq!(
            days,
            ["2024-02-28", "2024-02-29", "2024-03-01", "2024-03-02"]
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let today = date("2024-03-10");
        assert!(matches!(
            DateWindow::parse("03/01/2024", today),
            Err(AppError::Config(_))
        ));
        assert!(DateWindow::parse("2024-02-30", today).is_err());
    }
}
