use indexmap::IndexMap;

use crate::error::{XgError, XgErrorKind};

/// Opaque match key, as handed out by the data provider.
pub type MatchId = String;

/// Matches in the order the data provider produced them.
pub type MatchSet = IndexMap<MatchId, MatchXg>;

/// One side of a match, and the xG value of every shot it took.
#[derive(Clone, Debug, PartialEq)]
pub struct TeamShots {
    pub name: String,
    pub xg: Vec<f64>,
}

impl TeamShots {
    pub fn new(name: impl Into<String>, xg: Vec<f64>) -> Self {
        TeamShots {
            name: name.into(),
            xg,
        }
    }

    /// The analytic goal expectation, independent of any simulation.
    pub fn total_xg(&self) -> f64 {
        self.xg.iter().sum()
    }

    pub fn num_shots(&self) -> usize {
        self.xg.len()
    }

    pub fn validate(&self) -> Result<(), XgError> {
        for (i, &p) in self.xg.iter().enumerate() {
            // Written so that NaN fails as well
            if !(0.0..=1.0).contains(&p) {
                return Err(XgError::new_root(
                    XgErrorKind::InvalidProbability,
                    format!(
                        "shot #{} of {} has probability {}, expected a value in [0, 1]",
                        i + 1,
                        self.name,
                        p
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchXg {
    pub datetime: String,
    pub team: TeamShots,
    pub opponent: TeamShots,
}

impl MatchXg {
    pub fn new(datetime: impl Into<String>, team: TeamShots, opponent: TeamShots) -> Self {
        MatchXg {
            datetime: datetime.into(),
            team,
            opponent,
        }
    }

    pub fn validate(&self) -> Result<(), XgError> {
        self.team.validate()?;
        self.opponent.validate()
    }
}
