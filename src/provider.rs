//! Data provider adapters. Both read local JSON documents; fetching them from
//! a remote service is left to other tools.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{MatchFailure, XgError, XgErrorKind};
use crate::model::{MatchId, MatchSet, MatchXg, TeamShots};

/// Key holding the kickoff time in a match record. Every other key is a team.
pub const TIMESTAMP_KEY: &str = "datetime";

/// Matches loaded for one team and season. Records that couldn't be turned
/// into a `MatchXg` are kept apart, so the caller can decide whether to go on.
#[derive(Debug, Default)]
pub struct ProviderBatch {
    pub matches: MatchSet,
    pub malformed: Vec<MatchFailure>,
}

impl ProviderBatch {
    fn push(&mut self, match_id: MatchId, record: Result<MatchXg, XgError>) {
        match record {
            Ok(xg) => {
                self.matches.insert(match_id, xg);
            }
            Err(error) => {
                warn!("Malformed record for match {}: {}", match_id, error);
                self.malformed.push(MatchFailure { match_id, error })
            }
        }
    }
}

pub trait XgProvider {
    fn team_xg(&self, team: &str, season: &str) -> Result<ProviderBatch, XgError>;
}

fn malformed(desc: String) -> XgError {
    XgError::new_root(XgErrorKind::MalformedMatchRecord, desc)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, XgError> {
    let file = fs::File::open(path).map_err(|err| {
        XgError::new_caused_by(
            XgErrorKind::DataSource,
            format!("couldn't open \"{}\"", path.display()),
            Box::new(err),
        )
    })?;
    from_reader(io::BufReader::new(file), path)
}

fn from_reader<T: DeserializeOwned, R: io::Read>(reader: R, path: &Path) -> Result<T, XgError> {
    serde_json::from_reader(reader).map_err(|err| {
        XgError::new_caused_by(
            XgErrorKind::DataSource,
            format!("\"{}\" is not valid JSON for this source", path.display()),
            Box::new(err),
        )
    })
}

/// Reads a document of the form
/// `{ match_id: { "datetime": "...", team: [xg, ...], opponent: [xg, ...] }, ... }`.
/// The first team key is the team, the second one the opponent.
pub struct XgMappingFile {
    path: PathBuf,
}

impl XgMappingFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        XgMappingFile { path: path.into() }
    }
}

impl XgProvider for XgMappingFile {
    fn team_xg(&self, team: &str, season: &str) -> Result<ProviderBatch, XgError> {
        info!(
            "Loading xG for {} {} from {}",
            team,
            season,
            self.path.display()
        );
        let value: Value = read_json(&self.path)?;
        parse_xg_mapping(&value)
    }
}

pub fn parse_xg_mapping(value: &Value) -> Result<ProviderBatch, XgError> {
    let records = value.as_object().ok_or_else(|| {
        XgError::new_root(
            XgErrorKind::DataSource,
            "expected a JSON object keyed by match id".to_string(),
        )
    })?;
    let mut batch = ProviderBatch::default();
    for (match_id, record) in records {
        batch.push(match_id.clone(), parse_match_record(record));
    }
    Ok(batch)
}

pub fn parse_match_record(record: &Value) -> Result<MatchXg, XgError> {
    let fields = record
        .as_object()
        .ok_or_else(|| malformed("a match record must be a JSON object".to_string()))?;

    let datetime = match fields.get(TIMESTAMP_KEY) {
        Some(Value::String(datetime)) => datetime.clone(),
        Some(other) => {
            return Err(malformed(format!(
                "\"{}\" must be a string, got {}",
                TIMESTAMP_KEY, other
            )))
        }
        None => return Err(malformed(format!("missing \"{}\"", TIMESTAMP_KEY))),
    };

    let teams = fields
        .iter()
        .filter(|(key, _)| key.as_str() != TIMESTAMP_KEY)
        .map(|(name, shots)| parse_team_shots(name, shots))
        .collect::<Result<Vec<TeamShots>, XgError>>()?;

    match <[TeamShots; 2]>::try_from(teams) {
        Ok([team, opponent]) => Ok(MatchXg::new(datetime, team, opponent)),
        Err(teams) => Err(malformed(format!(
            "expected exactly two teams, got {}",
            teams.len()
        ))),
    }
}

fn parse_team_shots(name: &str, shots: &Value) -> Result<TeamShots, XgError> {
    let shots = shots
        .as_array()
        .ok_or_else(|| malformed(format!("shots of {} must be a list", name)))?;
    let xg = shots
        .iter()
        .map(|shot| {
            shot.as_f64()
                .ok_or_else(|| malformed(format!("{} has a non-numeric xG value {}", name, shot)))
        })
        .collect::<Result<Vec<f64>, XgError>>()?;
    Ok(TeamShots::new(name, xg))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum Side {
    #[serde(rename = "h")]
    Home,
    #[serde(rename = "a")]
    Away,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct UnderstatTeam {
    pub title: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UnderstatMatch {
    side: Side,
    h: UnderstatTeam,
    a: UnderstatTeam,
    datetime: String,
}

impl UnderstatMatch {
    fn team(&self, side: Side) -> &UnderstatTeam {
        match side {
            Side::Home => &self.h,
            Side::Away => &self.a,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct UnderstatShot {
    #[serde(rename = "xG")]
    xg: NumberOrString,
}

/// Both sides must be present, an empty list means the side had no shots.
#[derive(Clone, Debug, Deserialize)]
pub struct UnderstatShots {
    h: Vec<UnderstatShot>,
    a: Vec<UnderstatShot>,
}

impl UnderstatShots {
    fn side(&self, side: Side) -> &[UnderstatShot] {
        match side {
            Side::Home => &self.h,
            Side::Away => &self.a,
        }
    }

    fn xg(&self, side: Side) -> Result<Vec<f64>, XgError> {
        self.side(side)
            .iter()
            .map(|shot| match &shot.xg {
                NumberOrString::Number(xg) => Ok(*xg),
                NumberOrString::Text(text) => text.trim().parse::<f64>().map_err(|err| {
                    XgError::new_caused_by(
                        XgErrorKind::MalformedMatchRecord,
                        format!("xG value \"{}\" is not a number", text),
                        Box::new(err),
                    )
                }),
            })
            .collect()
    }
}

/// A team's season as dumped from Understat: the team's match list plus the
/// shot data of each match, keyed by match id.
///
/// Entries are kept as raw JSON and decoded one match at a time, so a single
/// broken entry only costs that match.
#[derive(Clone, Debug, Deserialize)]
pub struct UnderstatSeason {
    #[serde(default)]
    team: Option<String>,
    #[serde(default)]
    season: Option<String>,
    matches: Vec<Value>,
    #[serde(default)]
    shots: IndexMap<MatchId, Value>,
}

impl UnderstatSeason {
    /// Attributes each match's shots to `team` and its opponent, using the
    /// side the team played on.
    pub fn resolve(self, team: &str, season: &str) -> Result<ProviderBatch, XgError> {
        for (field, declared, requested) in [
            ("team", &self.team, team),
            ("season", &self.season, season),
        ] {
            if let Some(declared) = declared {
                if declared != requested {
                    return Err(XgError::new_root(
                        XgErrorKind::DataSource,
                        format!(
                            "dump holds {} \"{}\", but \"{}\" was requested",
                            field, declared, requested
                        ),
                    ));
                }
            }
        }

        let mut shots = self.shots;
        let mut batch = ProviderBatch::default();
        for (position, entry) in self.matches.into_iter().enumerate() {
            let match_id = match understat_match_id(&entry) {
                Some(match_id) => match_id,
                None => {
                    let error = malformed("match entry has no usable id".to_string());
                    batch.push(format!("<entry {}>", position), Err(error));
                    continue;
                }
            };
            if entry.get("isResult") == Some(&Value::Bool(false)) {
                debug!("Skipping match {}, it hasn't been played yet", match_id);
                continue;
            }
            let record = match shots.shift_remove(&match_id) {
                Some(match_shots) => resolve_match(team, entry, match_shots),
                None => Err(malformed("no shot data".to_string())),
            };
            batch.push(match_id, record);
        }
        Ok(batch)
    }
}

fn understat_match_id(entry: &Value) -> Option<MatchId> {
    match entry.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn decode_entry<T: DeserializeOwned>(entry: Value, what: &str) -> Result<T, XgError> {
    serde_json::from_value(entry).map_err(|err| {
        XgError::new_caused_by(
            XgErrorKind::MalformedMatchRecord,
            format!("invalid {}", what),
            Box::new(err),
        )
    })
}

fn resolve_match(team: &str, entry: Value, shots: Value) -> Result<MatchXg, XgError> {
    let understat_match: UnderstatMatch = decode_entry(entry, "match entry")?;
    let shots: UnderstatShots = decode_entry(shots, "shot data")?;
    let side = understat_match.side;
    let opponent = understat_match.team(side.opposite());
    let team_shots = TeamShots::new(team, shots.xg(side)?);
    let opponent_shots = TeamShots::new(opponent.title.clone(), shots.xg(side.opposite())?);
    debug!(
        "{} took {} shots, {} took {}",
        team_shots.name,
        team_shots.num_shots(),
        opponent_shots.name,
        opponent_shots.num_shots()
    );
    Ok(MatchXg::new(understat_match.datetime, team_shots, opponent_shots))
}

pub struct UnderstatDump {
    path: PathBuf,
}

impl UnderstatDump {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        UnderstatDump { path: path.into() }
    }

    pub fn from_reader<R: io::Read>(
        reader: R,
        team: &str,
        season: &str,
    ) -> Result<ProviderBatch, XgError> {
        let dump: UnderstatSeason = from_reader(reader, Path::new("<reader>"))?;
        dump.resolve(team, season)
    }
}

impl XgProvider for UnderstatDump {
    fn team_xg(&self, team: &str, season: &str) -> Result<ProviderBatch, XgError> {
        info!(
            "Loading Understat data for {} {} from {}",
            team,
            season,
            self.path.display()
        );
        let dump: UnderstatSeason = read_json(&self.path)?;
        dump.resolve(team, season)
    }
}
