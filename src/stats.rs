use std::fmt::Display;
use std::ops::AddAssign;

pub const WIN_POINTS: u8 = 3;
pub const DRAW_POINTS: u8 = 1;
pub const LOSS_POINTS: u8 = 0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TrialOutcome {
    Win,
    Draw,
    Loss,
}

impl TrialOutcome {
    /// Outcome of one simulated trial, seen from the side that scored `goals`.
    /// Only realized goals matter, never the sides' xG.
    pub fn from_goals(goals: u32, opponent_goals: u32) -> Self {
        use std::cmp::Ordering::*;
        match goals.cmp(&opponent_goals) {
            Greater => TrialOutcome::Win,
            Equal => TrialOutcome::Draw,
            Less => TrialOutcome::Loss,
        }
    }

    pub fn from_points(points: u8) -> Option<Self> {
        match points {
            WIN_POINTS => Some(TrialOutcome::Win),
            DRAW_POINTS => Some(TrialOutcome::Draw),
            LOSS_POINTS => Some(TrialOutcome::Loss),
            _ => None,
        }
    }

    pub fn points(self) -> u8 {
        match self {
            TrialOutcome::Win => WIN_POINTS,
            TrialOutcome::Draw => DRAW_POINTS,
            TrialOutcome::Loss => LOSS_POINTS,
        }
    }
}

/// Win/draw/loss counts over a number of simulated trials
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct PointsTally {
    pub wins: u64,
    pub draws: u64,
    pub losses: u64,
}

impl PointsTally {
    pub fn from_points(points: &[u8]) -> Self {
        let mut tally = PointsTally::default();
        for outcome in points.iter().filter_map(|&p| TrialOutcome::from_points(p)) {
            tally.add(outcome);
        }
        tally
    }

    pub fn add(&mut self, outcome: TrialOutcome) {
        match outcome {
            TrialOutcome::Win => self.wins += 1,
            TrialOutcome::Draw => self.draws += 1,
            TrialOutcome::Loss => self.losses += 1,
        }
    }

    pub fn num_trials(self) -> u64 {
        self.wins + self.draws + self.losses
    }

    pub fn expected_points(self) -> f64 {
        let points = self.wins * WIN_POINTS as u64 + self.draws * DRAW_POINTS as u64;
        points as f64 / self.num_trials() as f64
    }
}

impl AddAssign for PointsTally {
    fn add_assign(&mut self, other: Self) {
        self.wins += other.wins;
        self.draws += other.draws;
        self.losses += other.losses;
    }
}

impl Display for PointsTally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "+{}-{}={}", self.wins, self.losses, self.draws)
    }
}

/// Arithmetic mean of a points vector. NaN for an empty vector.
pub fn mean_points(points: &[u8]) -> f64 {
    let sum: u64 = points.iter().map(|&p| p as u64).sum();
    sum as f64 / points.len() as f64
}
