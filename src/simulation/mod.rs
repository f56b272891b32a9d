use std::num::NonZeroUsize;

use indexmap::IndexMap;
use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, OpenClosed01};

use crate::error::{XgError, XgErrorKind};
use crate::model::{MatchId, MatchSet, MatchXg, TeamShots};
use crate::stats::TrialOutcome;

pub const DEFAULT_NUM_SIMULATIONS: usize = 10_000;

/// Number of Monte Carlo trials per match. Always at least 1.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TrialCount(NonZeroUsize);

impl TrialCount {
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for TrialCount {
    fn default() -> Self {
        TrialCount(NonZeroUsize::new(DEFAULT_NUM_SIMULATIONS).unwrap())
    }
}

impl TryFrom<i64> for TrialCount {
    type Error = XgError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        usize::try_from(n)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(TrialCount)
            .ok_or_else(|| {
                XgError::new_root(
                    XgErrorKind::InvalidTrialCount,
                    format!("need at least one trial per match, got {}", n),
                )
            })
    }
}

impl TryFrom<usize> for TrialCount {
    type Error = XgError;

    fn try_from(n: usize) -> Result<Self, Self::Error> {
        NonZeroUsize::new(n).map(TrialCount).ok_or_else(|| {
            XgError::new_root(
                XgErrorKind::InvalidTrialCount,
                "need at least one trial per match, got 0".to_string(),
            )
        })
    }
}

/// Distribution of the number of goals scored from a list of shots.
/// Every shot is an independent Bernoulli trial with its own probability.
pub struct GoalsDistribution<'a> {
    probabilities: &'a [f64],
}

impl<'a> GoalsDistribution<'a> {
    pub fn new(probabilities: &'a [f64]) -> Self {
        GoalsDistribution { probabilities }
    }
}

impl Distribution<u32> for GoalsDistribution<'_> {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        // Draws are in (0, 1], so `p = 0` never scores and `p = 1` always does
        self.probabilities
            .iter()
            .filter(|&&p| {
                let draw: f64 = OpenClosed01.sample(rng);
                draw <= p
            })
            .count() as u32
    }
}

/// Simulated points and total xG for one side of a match
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatedSide {
    pub name: String,
    pub points: Vec<u8>,
    pub total_xg: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimulationResult {
    pub datetime: String,
    pub team: SimulatedSide,
    pub opponent: SimulatedSide,
}

pub fn simulate_goals<R: Rng + ?Sized>(shots: &TeamShots, n: TrialCount, rng: &mut R) -> Vec<u32> {
    let distribution = GoalsDistribution::new(&shots.xg);
    (0..n.get()).map(|_| distribution.sample(rng)).collect()
}

/// Simulates a single match. The match is validated before anything is drawn,
/// so a rejected match never produces a partial result.
pub fn simulate_match<R: Rng + ?Sized>(
    match_id: &str,
    xg: &MatchXg,
    n: TrialCount,
    rng: &mut R,
) -> Result<SimulationResult, XgError> {
    xg.validate().map_err(|err| {
        XgError::new_caused_by(
            err.kind(),
            format!("rejected match {}", match_id),
            Box::new(err),
        )
    })?;

    let team_goals = simulate_goals(&xg.team, n, rng);
    let opponent_goals = simulate_goals(&xg.opponent, n, rng);

    let (team_points, opponent_points): (Vec<u8>, Vec<u8>) = team_goals
        .iter()
        .zip(opponent_goals.iter())
        .map(|(&team, &opponent)| {
            (
                TrialOutcome::from_goals(team, opponent).points(),
                TrialOutcome::from_goals(opponent, team).points(),
            )
        })
        .unzip();

    debug!(
        "Simulated match {} ({} vs {}) with {} trials",
        match_id,
        xg.team.name,
        xg.opponent.name,
        n.get()
    );

    Ok(SimulationResult {
        datetime: xg.datetime.clone(),
        team: SimulatedSide {
            name: xg.team.name.clone(),
            points: team_points,
            total_xg: xg.team.total_xg(),
        },
        opponent: SimulatedSide {
            name: xg.opponent.name.clone(),
            points: opponent_points,
            total_xg: xg.opponent.total_xg(),
        },
    })
}

/// Simulates every match in order, failing on the first rejected match.
pub fn simulate<R: Rng + ?Sized>(
    matches: &MatchSet,
    n: TrialCount,
    rng: &mut R,
) -> Result<IndexMap<MatchId, SimulationResult>, XgError> {
    matches
        .iter()
        .map(|(match_id, xg)| Ok((match_id.clone(), simulate_match(match_id, xg, n, rng)?)))
        .collect()
}

/// Random source for the match at position `index` of a batch.
/// Seeded runs get the same stream for a match no matter which thread simulates it.
pub fn match_rng(seed: Option<u64>, index: usize) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(mix_seed(seed, index as u64)),
        None => SmallRng::from_entropy(),
    }
}

/// Combines the run seed and a match index into one stream seed. The seed is
/// scrambled before the index is added, so neighbouring seeds don't reuse each
/// other's streams at shifted indices.
fn mix_seed(seed: u64, index: u64) -> u64 {
    splitmix64(splitmix64(seed).wrapping_add(index))
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
