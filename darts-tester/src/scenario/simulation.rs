//! Seeded full-leg simulations.
use anyhow::{Context, Result, anyhow, ensure};
use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::BTreeMap;
use std::hash::Hasher;
use std::sync::Arc;
use std::thread;
use twox_hash::XxHash64;

use darts_engine::{
    DartsEngine, InMemoryStore, Leg, LegId, PlayerId, STARTING_SCORE, ScoreStorage,
};

use super::{Scenario, ScenarioCtx};

/// Upper bound on darts per simulated leg.
const MAX_DARTS: usize = 900;
const PARALLEL_LEGS: u64 = 4;

pub fn simulation_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            key: "random-leg",
            name: "Random Leg",
            description: "Seeded full leg: derived scores, undo-all, determinism",
            check: random_leg,
        },
        Scenario {
            key: "parallel-legs",
            name: "Parallel Legs",
            description: "Seeded legs on threads match their sequential replay",
            check: parallel_legs,
        },
    ]
}

/// Every leg state observed before each dart, plus the final fingerprint.
struct LegRun {
    history: Vec<Leg>,
    fingerprint: u64,
    finished: bool,
}

fn pick_dart(rng: &mut ChaCha20Rng, remaining: i32) -> (i32, i32) {
    if remaining == 50 && rng.gen_bool(0.3) {
        return (25, 2);
    }
    if remaining <= 40 && rng.gen_bool(0.6) {
        // Set up an even finish first when sitting on an odd number.
        return if remaining % 2 == 0 {
            (remaining / 2, 2)
        } else {
            (1, 1)
        };
    }
    let raw = rng.gen_range(0..=21);
    let segment = if raw == 21 { 25 } else { raw };
    let multiplier = match rng.gen_range(0..10) {
        0 => 0,
        1..=5 => 1,
        6 | 7 => 2,
        _ if segment == 25 => 2,
        _ => 3,
    };
    (segment, multiplier)
}

fn players_for(seed: u64) -> Vec<PlayerId> {
    let count = 2 + seed % 3;
    (1..=count).map(PlayerId).collect()
}

pub fn fingerprint(leg: &Leg) -> Result<u64> {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&serde_json::to_vec(&leg.turns)?);
    hasher.write(leg.status.as_str().as_bytes());
    Ok(hasher.finish())
}

/// Recompute every turn's position from scratch and compare with what the
/// engine stored.
fn verify_history(leg: &Leg) -> Result<()> {
    let mut running: BTreeMap<PlayerId, i32> = BTreeMap::new();
    for turn in &leg.turns {
        let before = *running.entry(turn.player_id).or_insert(STARTING_SCORE);
        ensure!(
            turn.remaining_score_at_start == before,
            "turn {} started on {} but history says {before}",
            turn.turn_number,
            turn.remaining_score_at_start
        );
        ensure!(
            turn.remaining_score == turn.remaining_score_at_start - turn.score,
            "turn {} remaining does not follow its score",
            turn.turn_number
        );
        if turn.is_bust {
            ensure!(turn.score == 0, "bust turn {} kept points", turn.turn_number);
            continue;
        }
        let points: i32 = turn.throws.iter().map(|t| t.points).sum();
        ensure!(points == turn.score, "turn {} score drifted", turn.turn_number);
        ensure!(
            turn.remaining_score == 0 || turn.remaining_score >= 2,
            "turn {} left an unfinishable {}",
            turn.turn_number,
            turn.remaining_score
        );
        running.insert(turn.player_id, turn.remaining_score);
    }
    Ok(())
}

fn play_leg(engine: &DartsEngine<InMemoryStore>, leg: LegId, seed: u64) -> Result<LegRun> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut history = Vec::new();
    let mut finished = false;

    for _ in 0..MAX_DARTS {
        let view = engine.get_current_game_state(leg)?;
        let Some(player) = view.current_player_id else {
            finished = true;
            break;
        };
        let open = view
            .current_turn
            .as_ref()
            .filter(|turn| turn.player_id == player);
        let index = open.map_or(1, |turn| i32::from(turn.darts_thrown) + 1);
        let remaining = match open {
            Some(turn) => turn.remaining_score,
            None => engine.player_remaining_score(leg, player)?,
        };

        history.push(engine.storage().load_leg(leg)?.context("leg missing")?);
        let (segment, multiplier) = pick_dart(&mut rng, remaining);
        let outcome = engine
            .process_throw(leg, player, segment, multiplier, index)
            .with_context(|| format!("dart {index} {multiplier}x{segment} by {player}"))?;
        ensure!(
            outcome.remaining_score >= 0 && outcome.remaining_score != 1,
            "player {player} left on {}",
            outcome.remaining_score
        );

        let stored = engine.storage().load_leg(leg)?.context("leg missing")?;
        verify_history(&stored)?;
    }

    let last = engine.storage().load_leg(leg)?.context("leg missing")?;
    debug!(
        "leg {leg}: {} darts, {} turns, finished {finished}",
        history.len(),
        last.turns.len()
    );
    Ok(LegRun {
        history,
        fingerprint: fingerprint(&last)?,
        finished,
    })
}

fn fresh_leg(engine: &DartsEngine<InMemoryStore>, seed: u64) -> Result<LegId> {
    let players = players_for(seed);
    let record = engine.create_match(&players)?;
    Ok(engine.start_new_leg(record.id, players[0])?.id)
}

fn random_leg(ctx: &ScenarioCtx) -> Result<()> {
    let engine = DartsEngine::new(InMemoryStore::new(), ctx.config.clone());
    let leg = fresh_leg(&engine, ctx.seed)?;
    let run = play_leg(&engine, leg, ctx.seed)?;
    ensure!(run.finished, "leg did not finish within {MAX_DARTS} darts");

    let replay_engine = DartsEngine::new(InMemoryStore::new(), ctx.config.clone());
    let replay_leg = fresh_leg(&replay_engine, ctx.seed)?;
    let replay = play_leg(&replay_engine, replay_leg, ctx.seed)?;
    ensure!(
        replay.fingerprint == run.fingerprint,
        "seed {} is not deterministic ({:016x} vs {:016x})",
        ctx.seed,
        run.fingerprint,
        replay.fingerprint
    );

    for (step, expected) in run.history.iter().enumerate().rev() {
        engine.undo_last_throw(leg)?;
        let stored = engine.storage().load_leg(leg)?.context("leg missing")?;
        ensure!(&stored == expected, "undo diverged at dart {}", step + 1);
    }
    ensure!(
        engine.undo_last_throw(leg).is_err(),
        "undo past the first dart must fail"
    );
    Ok(())
}

fn parallel_legs(ctx: &ScenarioCtx) -> Result<()> {
    let engine = Arc::new(DartsEngine::new(InMemoryStore::new(), ctx.config.clone()));
    let mut handles = Vec::new();
    for offset in 0..PARALLEL_LEGS {
        let seed = ctx.seed.wrapping_add(offset);
        let leg = fresh_leg(&engine, seed)?;
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            play_leg(&engine, leg, seed).map(|run| (seed, run.fingerprint))
        }));
    }

    for handle in handles {
        let (seed, fingerprint) = handle
            .join()
            .map_err(|_| anyhow!("simulation thread panicked"))??;
        let solo = DartsEngine::new(InMemoryStore::new(), ctx.config.clone());
        let leg = fresh_leg(&solo, seed)?;
        let expected = play_leg(&solo, leg, seed)?.fingerprint;
        ensure!(
            fingerprint == expected,
            "seed {seed} diverged when played concurrently"
        );
    }
    Ok(())
}
