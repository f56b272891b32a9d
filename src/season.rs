use std::fmt;
use std::sync::atomic::{self, AtomicBool};
use std::sync::Mutex;
use std::thread::{self, Builder};

use indexmap::IndexMap;
use log::{error, info, warn};

use crate::error::{MatchFailure, XgError};
use crate::model::{MatchId, MatchSet, MatchXg};
use crate::simulation::{match_rng, simulate_match, SimulationResult, TrialCount};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Any rejected match fails the whole batch
    #[default]
    FailBatch,
    /// Rejected matches are left out of the report, with a diagnostic
    SkipInvalid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeasonSettings {
    pub concurrency: usize,
    pub num_simulations: TrialCount,
    pub seed: Option<u64>,
}

impl Default for SeasonSettings {
    fn default() -> Self {
        SeasonSettings {
            concurrency: 1,
            num_simulations: TrialCount::default(),
            seed: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct ScheduledMatch {
    index: usize,
    match_id: MatchId,
    xg: MatchXg,
}

#[derive(Clone, Debug, PartialEq)]
struct MatchSchedule {
    scheduled_matches: Vec<ScheduledMatch>,
    next_match_id: usize,
}

/// Simulates a batch of matches on a pool of worker threads.
pub struct Season {
    settings: SeasonSettings,
    schedule: Mutex<MatchSchedule>,
    finished_matches: Mutex<Vec<Option<Result<SimulationResult, XgError>>>>,
}

impl fmt::Debug for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Concurrency: {}", self.settings.concurrency)?;
        writeln!(f, "Simulations: {}", self.settings.num_simulations.get())?;
        writeln!(f, "Seed: {:?}", self.settings.seed)?;
        Ok(())
    }
}

/// Simulation results in input order, plus everything that didn't make it.
#[derive(Debug, Default)]
pub struct SeasonOutcome {
    pub results: IndexMap<MatchId, SimulationResult>,
    pub failures: Vec<MatchFailure>,
    /// Matches never started because of a shutdown request
    pub unfinished: Vec<MatchId>,
}

impl SeasonOutcome {
    /// Applies the failure policy. Under `FailBatch`, the first failure is returned.
    pub fn check(&self, policy: FailurePolicy) -> Result<(), &MatchFailure> {
        match (policy, self.failures.first()) {
            (FailurePolicy::FailBatch, Some(failure)) => Err(failure),
            _ => Ok(()),
        }
    }
}

impl Season {
    pub fn new(matches: MatchSet, settings: SeasonSettings) -> Self {
        let scheduled_matches: Vec<ScheduledMatch> = matches
            .into_iter()
            .enumerate()
            .map(|(index, (match_id, xg))| ScheduledMatch {
                index,
                match_id,
                xg,
            })
            .collect();
        let num_matches = scheduled_matches.len();

        Season {
            settings,
            schedule: Mutex::new(MatchSchedule {
                scheduled_matches,
                next_match_id: 0,
            }),
            finished_matches: Mutex::new((0..num_matches).map(|_| None).collect()),
        }
    }

    pub fn simulate(self, is_shutting_down: &AtomicBool) -> SeasonOutcome {
        let threads = self.settings.concurrency.max(1);

        thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|id| {
                    let season = &self;
                    Builder::new()
                        .name(format!("Worker #{}", id))
                        .spawn_scoped(scope, move || season.run_worker(is_shutting_down))
                })
                .collect();
            for handle in handles {
                match handle {
                    Ok(handle) => {
                        if handle.join().is_err() {
                            error!("A simulation worker panicked");
                        }
                    }
                    Err(err) => error!("Couldn't spawn simulation worker: {}", err),
                }
            }
        });

        self.into_outcome()
    }

    fn run_worker(&self, is_shutting_down: &AtomicBool) {
        while let Some(scheduled_match) = self.next_unsimulated_match(is_shutting_down) {
            let mut rng = match_rng(self.settings.seed, scheduled_match.index);
            let result = simulate_match(
                &scheduled_match.match_id,
                &scheduled_match.xg,
                self.settings.num_simulations,
                &mut rng,
            );
            if let Err(err) = &result {
                warn!("{}", err);
            }
            let (num_finished, num_matches) = {
                let mut finished_matches = self.finished_matches.lock().unwrap();
                finished_matches[scheduled_match.index] = Some(result);
                let num_finished = finished_matches.iter().flatten().count();
                (num_finished, finished_matches.len())
            };
            info!("Simulated {}/{} matches.", num_finished, num_matches);
        }
    }

    fn next_unsimulated_match(&self, is_shutting_down: &AtomicBool) -> Option<ScheduledMatch> {
        if is_shutting_down.load(atomic::Ordering::SeqCst) {
            return None;
        }
        let mut schedule = self.schedule.lock().unwrap();
        let next_match_id = schedule.next_match_id;
        if let Some(scheduled_match) = schedule.scheduled_matches.get(next_match_id).cloned() {
            schedule.next_match_id += 1;
            Some(scheduled_match)
        } else {
            None
        }
    }

    fn into_outcome(self) -> SeasonOutcome {
        let schedule = self.schedule.into_inner().unwrap();
        let finished_matches = self.finished_matches.into_inner().unwrap();

        let mut outcome = SeasonOutcome::default();
        let slots = schedule.scheduled_matches.into_iter().zip(finished_matches);
        for (scheduled_match, finished) in slots {
            match finished {
                Some(Ok(result)) => {
                    outcome.results.insert(scheduled_match.match_id, result);
                }
                Some(Err(error)) => outcome.failures.push(MatchFailure {
                    match_id: scheduled_match.match_id,
                    error,
                }),
                None => outcome.unfinished.push(scheduled_match.match_id),
            }
        }
        outcome
    }
}
