use anyhow::{Result, ensure};

use darts_engine::{LegStatus, PlayerId, ScoringError};

use super::{Board, Scenario, ScenarioCtx};

const HOME: PlayerId = PlayerId(1);
const AWAY: PlayerId = PlayerId(2);

pub fn catalog_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            key: "smoke",
            name: "Smoke",
            description: "First visit scores 60, next player opens turn 2",
            check: smoke,
        },
        Scenario {
            key: "bust-boundary",
            name: "Bust Boundary",
            description: "2 minus 20 busts; 40 minus double 20 checks out",
            check: bust_boundary,
        },
        Scenario {
            key: "invalid-checkout",
            name: "Invalid Checkout",
            description: "Reaching zero on a single busts and keeps 20",
            check: invalid_checkout,
        },
        Scenario {
            key: "undo-roundtrip",
            name: "Undo Round Trip",
            description: "Throw then undo restores the leg, including checkouts",
            check: undo_roundtrip,
        },
        Scenario {
            key: "duplicate-guard",
            name: "Duplicate Guard",
            description: "A repeated dart index is rejected without side effects",
            check: duplicate_guard,
        },
        Scenario {
            key: "turn-rollover",
            name: "Turn Rollover",
            description: "A fourth dart from the same player opens a new turn",
            check: turn_rollover,
        },
        Scenario {
            key: "player-switch",
            name: "Player Switch",
            description: "A different player's dart abandons the open turn",
            check: player_switch,
        },
    ]
}

fn smoke(ctx: &ScenarioCtx) -> Result<()> {
    let board = Board::open(ctx, &[HOME, AWAY])?;
    board.visit(HOME, [(20, 1), (20, 1), (20, 1)])?;

    let leg = board.snapshot()?;
    ensure!(leg.turns.len() == 1, "expected one turn, found {}", leg.turns.len());
    let turn = &leg.turns[0];
    ensure!(turn.score == 60, "first visit scored {}", turn.score);
    ensure!(turn.remaining_score == 441, "remaining {}", turn.remaining_score);
    ensure!(turn.darts_thrown == 3, "darts thrown {}", turn.darts_thrown);

    let next = board.throw(AWAY, 20, 1, 1)?;
    ensure!(next.turn.turn_number == 2, "away opened turn {}", next.turn.turn_number);
    ensure!(
        next.turn.remaining_score_at_start == 501,
        "away started on {}",
        next.turn.remaining_score_at_start
    );
    Ok(())
}

fn bust_boundary(ctx: &ScenarioCtx) -> Result<()> {
    let board = Board::open(ctx, &[HOME, AWAY])?;
    board.walk_down(HOME, 2)?;
    let bust = board.throw(HOME, 20, 1, 1)?;
    ensure!(bust.is_bust, "20 from 2 should bust");
    ensure!(board.remaining(HOME)? == 2, "bust must keep 2");

    let board = Board::open(ctx, &[HOME, AWAY])?;
    board.walk_down(HOME, 40)?;
    let finish = board.throw(HOME, 20, 2, 1)?;
    ensure!(finish.is_checkout && finish.leg_completed, "D20 from 40 should win");
    let leg = board.snapshot()?;
    ensure!(leg.status == LegStatus::Completed, "leg is {}", leg.status);
    ensure!(leg.winning_player_id == Some(HOME), "wrong winner");
    Ok(())
}

fn invalid_checkout(ctx: &ScenarioCtx) -> Result<()> {
    let board = Board::open(ctx, &[HOME, AWAY])?;
    board.walk_down(HOME, 20)?;
    let outcome = board.throw(HOME, 20, 1, 1)?;
    ensure!(outcome.is_bust, "single 20 from 20 should bust");
    ensure!(!outcome.leg_completed, "leg must stay active");
    ensure!(board.remaining(HOME)? == 20, "bust must keep 20");
    Ok(())
}

fn undo_roundtrip(ctx: &ScenarioCtx) -> Result<()> {
    let board = Board::open(ctx, &[HOME, AWAY])?;
    board.walk_down(HOME, 40)?;
    board.throw(HOME, 10, 1, 1)?;
    let before = board.snapshot()?;

    let bust = board.throw(HOME, 15, 3, 2)?;
    ensure!(bust.is_bust, "treble 15 from 30 should bust");
    board.engine.undo_last_throw(board.leg)?;
    ensure!(board.snapshot()? == before, "undoing the bust changed the leg");

    board.throw(HOME, 15, 1, 2)?;
    board.throw(HOME, 5, 1, 3)?;
    let undone = board.engine.undo_last_throw(board.leg)?;
    ensure!(!undone.leg_reopened, "a scoring dart cannot reopen a leg");
    board.engine.undo_last_throw(board.leg)?;
    ensure!(board.snapshot()? == before, "undoing two darts changed the leg");

    board.throw(HOME, 15, 2, 2)?;
    ensure!(board.snapshot()?.status == LegStatus::Completed, "D15 from 30 wins");
    let undone = board.engine.undo_last_throw(board.leg)?;
    ensure!(undone.leg_reopened, "undoing the checkout must reopen the leg");
    ensure!(board.snapshot()? == before, "undoing the checkout changed the leg");
    Ok(())
}

fn duplicate_guard(ctx: &ScenarioCtx) -> Result<()> {
    let board = Board::open(ctx, &[HOME, AWAY])?;
    board.throw(HOME, 20, 3, 1)?;
    let before = board.snapshot()?;
    match board
        .engine
        .process_throw(board.leg, HOME, 19, 3, 1)
    {
        Err(ScoringError::DuplicateDart { dart_index: 1, .. }) => {}
        other => anyhow::bail!("expected duplicate rejection, got {other:?}"),
    }
    ensure!(board.snapshot()? == before, "duplicate changed the leg");
    Ok(())
}

fn turn_rollover(ctx: &ScenarioCtx) -> Result<()> {
    let board = Board::open(ctx, &[HOME])?;
    board.visit(HOME, [(1, 1), (2, 1), (3, 1)])?;
    let outcome = board.throw(HOME, 4, 1, 1)?;
    ensure!(outcome.turn.turn_number == 2, "rollover opened turn {}", outcome.turn.turn_number);
    ensure!(
        outcome.turn.remaining_score_at_start == 495,
        "new turn started on {}",
        outcome.turn.remaining_score_at_start
    );
    Ok(())
}

fn player_switch(ctx: &ScenarioCtx) -> Result<()> {
    let board = Board::open(ctx, &[HOME, AWAY])?;
    board.throw(HOME, 20, 1, 1)?;
    let away = board.throw(AWAY, 19, 1, 1)?;
    ensure!(away.turn.turn_number == 2, "away opened turn {}", away.turn.turn_number);

    let home = board.throw(HOME, 18, 1, 1)?;
    ensure!(home.turn.turn_number == 3, "home resumed in turn {}", home.turn.turn_number);
    ensure!(
        home.turn.remaining_score_at_start == 481,
        "home resumed on {}",
        home.turn.remaining_score_at_start
    );
    let leg = board.snapshot()?;
    ensure!(leg.turns[0].darts_thrown == 1, "abandoned turn was modified");

    let state = board.engine.current_leg(board.match_id)?;
    ensure!(state.current_player_id == Some(HOME), "home still holds the board");
    Ok(())
}
