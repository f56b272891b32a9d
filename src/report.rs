use std::fmt;
use std::io;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use log::warn;
use serde::Serialize;

use crate::error::{MatchFailure, XgError, XgErrorKind};
use crate::model::MatchId;
use crate::simulation::SimulationResult;
use crate::stats::{mean_points, PointsTally};

pub const DATE_FORMAT: &str = "%m-%d-%Y";

// Timestamp layouts accepted from data providers, tried in order
const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportRow {
    pub match_id: MatchId,
    pub date: String,
    pub team: String,
    pub team_total_xg: f64,
    pub expected_points: f64,
    pub opponent: String,
    pub opponent_total_xg: f64,
    pub opponent_expected_points: f64,
}

impl ReportRow {
    pub fn new(match_id: &str, result: &SimulationResult) -> Result<Self, XgError> {
        Ok(ReportRow {
            match_id: match_id.to_string(),
            date: format_match_date(&result.datetime)?,
            team: result.team.name.clone(),
            team_total_xg: result.team.total_xg,
            expected_points: mean_points(&result.team.points),
            opponent: result.opponent.name.clone(),
            opponent_total_xg: result.opponent.total_xg,
            opponent_expected_points: mean_points(&result.opponent.points),
        })
    }
}

/// Reformats a provider timestamp as `MM-DD-YYYY`.
pub fn format_match_date(raw: &str) -> Result<String, XgError> {
    let raw = raw.trim();
    let date = if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        datetime.date_naive()
    } else if let Some(datetime) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    {
        datetime.date()
    } else {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|err| {
            XgError::new_caused_by(
                XgErrorKind::DateParseFailure,
                format!("\"{}\" is not a recognized timestamp", raw),
                Box::new(err),
            )
        })?
    };
    Ok(date.format(DATE_FORMAT).to_string())
}

/// One row per simulated match, in input order. Fails on the first bad timestamp.
pub fn report(results: &IndexMap<MatchId, SimulationResult>) -> Result<Vec<ReportRow>, XgError> {
    results
        .iter()
        .map(|(match_id, result)| {
            ReportRow::new(match_id, result).map_err(|err| {
                XgError::new_caused_by(
                    err.kind(),
                    format!("couldn't report match {}", match_id),
                    Box::new(err),
                )
            })
        })
        .collect()
}

/// Like [`report`], but sets aside matches whose row couldn't be built.
pub fn report_partitioned(
    results: &IndexMap<MatchId, SimulationResult>,
) -> (Vec<ReportRow>, Vec<MatchFailure>) {
    let mut rows = vec![];
    let mut failures = vec![];
    for (match_id, result) in results {
        match ReportRow::new(match_id, result) {
            Ok(row) => rows.push(row),
            Err(error) => {
                warn!("Couldn't report match {}: {}", match_id, error);
                failures.push(MatchFailure {
                    match_id: match_id.clone(),
                    error,
                })
            }
        }
    }
    (rows, failures)
}

pub fn write_csv<W: io::Write>(rows: &[ReportRow], writer: W) -> Result<(), XgError> {
    let to_report_error = |err: csv::Error| {
        XgError::new_caused_by(
            XgErrorKind::Report,
            "CSV serialization failed".to_string(),
            Box::new(err),
        )
    };
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row).map_err(to_report_error)?;
    }
    csv_writer.flush().map_err(|err| {
        XgError::new_caused_by(
            XgErrorKind::Report,
            "couldn't flush CSV output".to_string(),
            Box::new(err),
        )
    })
}

/// Text rendering of a report, one aligned line per match
pub struct ReportTable<'a>(pub &'a [ReportRow]);

impl fmt::Display for ReportTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.0;
        let id_width = column_width("match_id", rows.iter().map(|row| row.match_id.as_str()));
        let team_width = column_width("team", rows.iter().map(|row| row.team.as_str()));
        let opponent_width = column_width("opponent", rows.iter().map(|row| row.opponent.as_str()));

        writeln!(
            f,
            "{:<id_width$}  {:<10}  {:<team_width$}  {:>6}  {:>6}  {:<opponent_width$}  {:>6}  {:>6}",
            "match_id", "date", "team", "xG", "xPts", "opponent", "xG", "xPts",
        )?;
        for row in rows {
            writeln!(
                f,
                "{:<id_width$}  {:<10}  {:<team_width$}  {:>6.2}  {:>6.2}  {:<opponent_width$}  {:>6.2}  {:>6.2}",
                row.match_id,
                row.date,
                row.team,
                row.team_total_xg,
                row.expected_points,
                row.opponent,
                row.opponent_total_xg,
                row.opponent_expected_points,
            )?;
        }
        Ok(())
    }
}

fn column_width<'a>(header: &str, values: impl Iterator<Item = &'a str>) -> usize {
    values
        .map(|value| value.chars().count())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or_default()
}

/// Season totals over a finished report.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct SeasonSummary {
    pub matches: usize,
    pub team_total_xg: f64,
    pub opponent_total_xg: f64,
    pub expected_points: f64,
    pub opponent_expected_points: f64,
    pub tally: PointsTally,
}

impl SeasonSummary {
    /// Totals the rows, and tallies every trial of the matches they were built from.
    pub fn new(rows: &[ReportRow], results: &IndexMap<MatchId, SimulationResult>) -> Self {
        let mut summary = SeasonSummary::default();
        for row in rows {
            summary.matches += 1;
            summary.team_total_xg += row.team_total_xg;
            summary.opponent_total_xg += row.opponent_total_xg;
            summary.expected_points += row.expected_points;
            summary.opponent_expected_points += row.opponent_expected_points;
            if let Some(result) = results.get(&row.match_id) {
                summary.tally += PointsTally::from_points(&result.team.points);
            }
        }
        summary
    }
}

impl fmt::Display for SeasonSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} matches. xG {:.2} for, {:.2} against. Expected points {:.2}, opponents {:.2}. Trials {}",
            self.matches,
            self.team_total_xg,
            self.opponent_total_xg,
            self.expected_points,
            self.opponent_expected_points,
            self.tally
        )?;
        if self.tally.num_trials() > 0 {
            write!(f, ", {:.2} points per trial", self.tally.expected_points())?;
        }
        write!(f, ".")
    }
}
