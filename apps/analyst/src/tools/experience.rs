//! calculate_experience_years — pure date arithmetic over the work history.
//!
//! Durations are counted in whole months plus a day fraction (30-day months),
//! then converted to years. Overlapping positions are summed as listed.

use chrono::{Datelike, NaiveDate};
use thiserror::Error;
use tracing::debug;

use crate::models::resume::{EntryDuration, ExperienceSummary, MalformedEntry, WorkEntry};

#[derive(Debug, Error, PartialEq)]
#[error("start date {start} is after end date {end}")]
pub struct MalformedDateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Years between `start` and `end`, unrounded.
pub fn years_between(start: NaiveDate, end: NaiveDate) -> Result<f64, MalformedDateRange> {
    if start > end {
        return Err(MalformedDateRange { start, end });
    }
    let months = (end.year() - start.year()) as i64 * 12 + end.month() as i64
        - start.month() as i64;
    let days = end.day() as i64 - start.day() as i64;
    Ok((months as f64 + days as f64 / 30.0) / 12.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sums the duration of every well-formed entry. `present` resolves to `today`;
/// entries without readable dates, or whose start falls after their end, are
/// reported in `malformed` and contribute nothing.
pub fn calculate_experience(work: &[WorkEntry], today: NaiveDate) -> ExperienceSummary {
    let mut entries = Vec::with_capacity(work.len());
    let mut malformed = Vec::new();
    let mut total = 0.0;

    for entry in work {
        let (Some(start), Some(end)) = (entry.start, entry.end) else {
            let missing = if entry.start.is_none() { "start" } else { "end" };
            debug!("Skipping '{}' at '{}': no {missing} date", entry.title, entry.company);
            malformed.push(MalformedEntry {
                title: entry.title.clone(),
                company: entry.company.clone(),
                reason: format!("{missing} date is missing or not a calendar date"),
            });
            continue;
        };

        match years_between(start.0, end.resolve(today)) {
            Ok(years) => {
                total += years;
                entries.push(EntryDuration {
                    title: entry.title.clone(),
                    company: entry.company.clone(),
                    start,
                    end,
                    years: round2(years),
                });
            }
            Err(e) => {
                debug!("Skipping '{}' at '{}': {e}", entry.title, entry.company);
                malformed.push(MalformedEntry {
                    title: entry.title.clone(),
                    company: entry.company.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    ExperienceSummary {
        total_years: round2(total),
        entries,
        malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::{ResumeDate, WorkEnd};

    fn date(y: i32, m: u32) -> ResumeDate {
        ResumeDate::ymd(y, m, 1).unwrap()
    }

    fn entry(title: &str, start: ResumeDate, end: WorkEnd) -> WorkEntry {
        WorkEntry {
            title: title.to_string(),
            company: "Acme".to_string(),
            start: Some(start),
            end: Some(end),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_closed_and_open_entries_sum() {
        let work = vec![
            entry("Engineer", date(2018, 1), WorkEnd::Date(date(2020, 1))),
            entry("Senior Engineer", date(2020, 1), WorkEnd::Present),
        ];
        let summary = calculate_experience(&work, today());

        assert_eq!(summary.total_years, 6.0);
        assert_eq!(summary.entries.len(), 2);
        assert_eq!(summary.entries[0].years, 2.0);
        assert_eq!(summary.entries[1].years, 4.0);
        assert!(summary.malformed.is_empty());
    }

    #[test]
    fn test_partial_months_round_to_two_decimals() {
        let work = vec![entry("Intern", date(2023, 1), WorkEnd::Date(date(2023, 7)))];
        assert_eq!(calculate_experience(&work, today()).total_years, 0.5);

        let work = vec![entry("Contract", date(2023, 1), WorkEnd::Date(date(2023, 2)))];
        assert_eq!(calculate_experience(&work, today()).total_years, 0.08);
    }

    #[test]
    fn test_start_after_end_is_malformed_and_excluded() {
        let work = vec![
            entry("Engineer", date(2018, 1), WorkEnd::Date(date(2020, 1))),
            entry("Time Traveller", date(2022, 1), WorkEnd::Date(date(2021, 1))),
        ];
        let summary = calculate_experience(&work, today());

        assert_eq!(summary.total_years, 2.0);
        assert_eq!(summary.malformed.len(), 1);
        assert_eq!(summary.malformed[0].title, "Time Traveller");
        assert!(summary.malformed[0].reason.contains("after"));
    }

    #[test]
    fn test_open_entry_starting_in_future_is_malformed() {
        let work = vec![entry("Next Job", date(2025, 1), WorkEnd::Present)];
        let summary = calculate_experience(&work, today());
        assert_eq!(summary.total_years, 0.0);
        assert_eq!(summary.malformed.len(), 1);
    }

    #[test]
    fn test_empty_history_is_zero() {
        let summary = calculate_experience(&[], today());
        assert_eq!(summary.total_years, 0.0);
        assert!(summary.entries.is_empty());
    }

    #[test]
    fn test_same_input_same_output() {
        let work = vec![
            entry("Engineer", date(2019, 3), WorkEnd::Date(date(2021, 11))),
            entry("Lead", date(2021, 11), WorkEnd::Present),
        ];
        assert_eq!(
            calculate_experience(&work, today()),
            calculate_experience(&work, today())
        );
    }

    #[test]
    fn test_undated_entries_are_reported_not_counted() {
        let mut undated = entry("Intern", date(2019, 6), WorkEnd::Present);
        undated.start = None;
        let mut open = entry("Mentor", date(2019, 6), WorkEnd::Present);
        open.end = None;
        let work = vec![
            entry("Engineer", date(2018, 1), WorkEnd::Date(date(2020, 1))),
            undated,
            open,
        ];

        let summary = calculate_experience(&work, today());
        assert_eq!(summary.total_years, 2.0);
        assert_eq!(summary.entries.len(), 1);
        assert_eq!(summary.malformed.len(), 2);
        assert!(summary.malformed[0].reason.starts_with("start date"));
        assert!(summary.malformed[1].reason.starts_with("end date"));
    }
}
