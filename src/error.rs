use std::error::Error;
use std::fmt;

use crate::model::MatchId;

#[derive(Debug)]
pub struct XgError {
    kind: XgErrorKind,
    desc: String,
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl XgError {
    pub fn new_root(kind: XgErrorKind, desc: String) -> XgError {
        XgError {
            kind,
            desc,
            source: None,
        }
    }

    pub fn new_caused_by(
        kind: XgErrorKind,
        desc: String,
        source: Box<dyn Error + Send + Sync>,
    ) -> XgError {
        XgError {
            kind,
            desc,
            source: Some(source),
        }
    }

    pub fn kind(&self) -> XgErrorKind {
        self.kind
    }
}

impl fmt::Display for XgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            XgErrorKind::InvalidProbability => {
                write!(f, "invalid shot probability. {}", self.desc)?
            }
            XgErrorKind::MalformedMatchRecord => {
                write!(f, "malformed match record. {}", self.desc)?
            }
            XgErrorKind::InvalidTrialCount => write!(f, "invalid trial count. {}", self.desc)?,
            XgErrorKind::DateParseFailure => write!(f, "couldn't parse match date. {}", self.desc)?,
            XgErrorKind::DataSource => write!(f, "data source error. {}", self.desc)?,
            XgErrorKind::Report => write!(f, "couldn't write report. {}", self.desc)?,
        }
        if let Some(ref source) = self.source {
            write!(f, ". Caused by: {}", source)?
        }
        Ok(())
    }
}

impl Error for XgError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn Error + 'static))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XgErrorKind {
    InvalidProbability,
    MalformedMatchRecord,
    InvalidTrialCount,
    DateParseFailure,
    DataSource,
    Report,
}

/// An error tied to the match it was raised for.
#[derive(Debug)]
pub struct MatchFailure {
    pub match_id: MatchId,
    pub error: XgError,
}

impl fmt::Display for MatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "match {}: {}", self.match_id, self.error)
    }
}
