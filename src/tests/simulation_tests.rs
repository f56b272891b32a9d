use indexmap::IndexMap;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::XgErrorKind;
use crate::model::{MatchSet, MatchXg, TeamShots};
use crate::simulation::{
    match_rng, simulate, simulate_goals, simulate_match, SimulationResult, TrialCount,
};
use crate::stats::mean_points;

fn xg_match(team: &[f64], opponent: &[f64]) -> MatchXg {
    MatchXg::new(
        "2024-08-16 19:00:00",
        TeamShots::new("Manchester_United", team.to_vec()),
        TeamShots::new("Fulham", opponent.to_vec()),
    )
}

fn trials(n: usize) -> TrialCount {
    TrialCount::try_from(n).unwrap()
}

fn run(team: &[f64], opponent: &[f64], n: usize, seed: u64) -> SimulationResult {
    let mut rng = SmallRng::seed_from_u64(seed);
    simulate_match("1", &xg_match(team, opponent), trials(n), &mut rng).unwrap()
}

#[test]
fn points_vectors_have_one_entry_per_trial_test() {
    let examples: [(&[f64], &[f64]); 4] = [
        (&[0.1, 0.4, 0.05], &[0.3, 0.02]),
        (&[], &[0.7]),
        (&[0.76], &[]),
        (&[0.2; 12], &[0.1; 20]),
    ];
    for (seed, (team, opponent)) in examples.iter().enumerate() {
        for n in [1, 7, 1000] {
            let result = run(team, opponent, n, seed as u64);
            assert_eq!(result.team.points.len(), n);
            assert_eq!(result.opponent.points.len(), n);
            for (&team_points, &opponent_points) in
                result.team.points.iter().zip(result.opponent.points.iter())
            {
                assert!([0, 1, 3].contains(&team_points));
                assert!([0, 1, 3].contains(&opponent_points));
                let total = team_points + opponent_points;
                assert!(
                    total == 2 || total == 3,
                    "Trial gave {} and {} points",
                    team_points,
                    opponent_points
                );
            }
        }
    }
}

#[test]
fn team_without_shots_never_wins_test() {
    let opponent_xg = [0.5, 0.3];
    let mut rng = SmallRng::seed_from_u64(4);
    let opponent = TeamShots::new("Fulham", opponent_xg.to_vec());
    let opponent_goals = simulate_goals(&opponent, trials(10_000), &mut rng);
    assert!(opponent_goals.iter().any(|&goals| goals > 0));

    let result = run(&[], &opponent_xg, 10_000, 5);
    assert!(!result.team.points.contains(&3));
    for (&team_points, &opponent_points) in
        result.team.points.iter().zip(result.opponent.points.iter())
    {
        match opponent_points {
            3 => assert_eq!(team_points, 0),
            1 => assert_eq!(team_points, 1),
            points => panic!("Opponent got {} points against a shotless team", points),
        }
    }
    // P(opponent scores) = 1 - 0.5 * 0.7 = 0.65
    let opponent_wins = result.opponent.points.iter().filter(|&&p| p == 3).count();
    assert!(
        opponent_wins > 6000 && opponent_wins < 7000,
        "Opponent won {} of 10000 trials",
        opponent_wins
    );
}

#[test]
fn no_shots_is_always_a_draw_test() {
    let result = run(&[], &[], 1000, 0);
    assert!(result.team.points.iter().all(|&p| p == 1));
    assert_eq!(mean_points(&result.team.points), 1.0);
    assert_eq!(mean_points(&result.opponent.points), 1.0);
    assert_eq!(result.team.total_xg, 0.0);
    assert_eq!(result.opponent.total_xg, 0.0);
}

#[test]
fn near_certain_win_test() {
    let result = run(&[0.9, 0.9], &[0.05], 100_000, 0);
    let team_points = mean_points(&result.team.points);
    let opponent_points = mean_points(&result.opponent.points);
    assert!(team_points > 2.5, "Expected points were {:.3}", team_points);
    assert!(opponent_points < 0.5, "Opponent expected points were {:.3}", opponent_points);
}

#[test]
fn total_xg_is_the_exact_sum_test() {
    let team_xg = [0.0734, 0.0312, 0.7611, 0.0221, 0.0453, 0.1298];
    let opponent_xg = [0.4112, 0.0198];

    let sum = |xs: &[f64]| {
        let mut total = 0.0;
        for x in xs {
            total += x;
        }
        total
    };

    for (seed, n) in [1, 10, 5000].iter().enumerate() {
        let result = run(&team_xg, &opponent_xg, *n, seed as u64);
        assert_eq!(result.team.total_xg, sum(&team_xg));
        assert_eq!(result.opponent.total_xg, sum(&opponent_xg));
    }
}

#[test]
fn certain_shots_test() {
    let mut rng = SmallRng::seed_from_u64(0);
    let always = TeamShots::new("always", vec![1.0, 1.0, 1.0]);
    let never = TeamShots::new("never", vec![0.0, 0.0]);

    assert!(simulate_goals(&always, trials(10_000), &mut rng)
        .iter()
        .all(|&goals| goals == 3));
    assert!(simulate_goals(&never, trials(10_000), &mut rng)
        .iter()
        .all(|&goals| goals == 0));
}

#[test]
fn mean_goals_near_total_xg_test() {
    let mut rng = SmallRng::seed_from_u64(1);
    let shots = TeamShots::new("Arsenal", vec![0.3, 0.5, 0.1, 0.04]);
    let goals = simulate_goals(&shots, trials(100_000), &mut rng);
    let mean = goals.iter().map(|&g| g as f64).sum::<f64>() / goals.len() as f64;
    assert!(
        (mean - shots.total_xg()).abs() < 0.02,
        "Mean of {:.3} goals, total xG {:.3}",
        mean,
        shots.total_xg()
    );
}

#[test]
fn invalid_probability_test() {
    let mut rng = SmallRng::seed_from_u64(0);
    for bad_xg in [1.2, -0.01, f64::NAN] {
        let result = simulate_match("7", &xg_match(&[0.1, bad_xg], &[0.2]), trials(10), &mut rng);
        assert_eq!(result.unwrap_err().kind(), XgErrorKind::InvalidProbability);

        let result = simulate_match("7", &xg_match(&[0.1], &[bad_xg]), trials(10), &mut rng);
        assert_eq!(result.unwrap_err().kind(), XgErrorKind::InvalidProbability);
    }
}

#[test]
fn invalid_trial_count_test() {
    for n in [0i64, -1, -10_000] {
        assert_eq!(
            TrialCount::try_from(n).unwrap_err().kind(),
            XgErrorKind::InvalidTrialCount
        );
    }
    assert_eq!(
        TrialCount::try_from(0usize).unwrap_err().kind(),
        XgErrorKind::InvalidTrialCount
    );
    assert_eq!(TrialCount::try_from(1i64).unwrap().get(), 1);
    assert_eq!(TrialCount::default().get(), 10_000);
}

#[test]
fn seeded_simulation_is_reproducible_test() {
    let team_xg = [0.3, 0.12, 0.08, 0.45];
    let opponent_xg = [0.2, 0.6];
    assert_eq!(
        run(&team_xg, &opponent_xg, 1000, 42),
        run(&team_xg, &opponent_xg, 1000, 42)
    );
    assert_ne!(
        run(&team_xg, &opponent_xg, 1000, 42).team.points,
        run(&team_xg, &opponent_xg, 1000, 43).team.points
    );

    let mut first = match_rng(Some(3), 2);
    let mut second = match_rng(Some(3), 2);
    let xg = xg_match(&team_xg, &opponent_xg);
    assert_eq!(
        simulate_match("1", &xg, trials(100), &mut first).unwrap(),
        simulate_match("1", &xg, trials(100), &mut second).unwrap()
    );
}

#[test]
fn neighbouring_seeds_give_unrelated_streams_test() {
    let draws = |seed: u64, index: usize| -> Vec<u64> {
        let mut rng = match_rng(Some(seed), index);
        (0..8).map(|_| rng.gen::<u64>()).collect()
    };
    assert_eq!(draws(7, 1), draws(7, 1));
    for seed in 0..20 {
        for index in 0..20 {
            assert_ne!(draws(seed, index + 1), draws(seed + 1, index));
            assert_ne!(draws(seed, index), draws(seed, index + 1));
        }
    }

    // Match 1 of seed 7 and match 0 of seed 8 play out differently
    let xg = xg_match(&[0.3, 0.12, 0.08, 0.45], &[0.2, 0.6]);
    let first = simulate_match("1", &xg, trials(1000), &mut match_rng(Some(7), 1)).unwrap();
    let second = simulate_match("1", &xg, trials(1000), &mut match_rng(Some(8), 0)).unwrap();
    assert_ne!(first.team.points, second.team.points);
}

#[test]
fn simulate_keeps_input_order_test() {
    let mut matches: MatchSet = IndexMap::new();
    matches.insert("26890".to_string(), xg_match(&[0.2], &[0.1]));
    matches.insert("26602".to_string(), xg_match(&[], &[0.5, 0.5]));
    matches.insert("26755".to_string(), xg_match(&[0.9], &[]));

    let mut rng = SmallRng::seed_from_u64(0);
    let results = simulate(&matches, trials(100), &mut rng).unwrap();
    let ids: Vec<&str> = results.keys().map(|id| id.as_str()).collect();
    assert_eq!(ids, ["26890", "26602", "26755"]);
    assert_eq!(results["26755"].team.total_xg, 0.9);
}

#[test]
fn simulate_rejects_batch_with_invalid_match_test() {
    let mut matches: MatchSet = IndexMap::new();
    matches.insert("1".to_string(), xg_match(&[0.2], &[0.1]));
    matches.insert("2".to_string(), xg_match(&[2.0], &[0.1]));

    let mut rng = SmallRng::seed_from_u64(0);
    let err = simulate(&matches, trials(100), &mut rng).unwrap_err();
    assert_eq!(err.kind(), XgErrorKind::InvalidProbability);
    assert!(err.to_string().contains("rejected match 2"));
}
