use anyhow::{Context, Result};

use darts_engine::{
    DartsEngine, EngineConfig, InMemoryStore, Leg, LegId, MatchId, PlayerId, ScoreStorage,
    ThrowOutcome,
};

pub mod catalog;
pub mod simulation;

/// Inputs shared by every scenario iteration.
#[derive(Debug, Clone)]
pub struct ScenarioCtx {
    pub seed: u64,
    pub config: EngineConfig,
}

pub type ScenarioCheck = fn(&ScenarioCtx) -> Result<()>;

#[derive(Clone)]
pub struct Scenario {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub check: ScenarioCheck,
}

fn all_scenarios() -> Vec<Scenario> {
    let mut scenarios = catalog::catalog_scenarios();
    scenarios.extend(simulation::simulation_scenarios());
    scenarios
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    all_scenarios()
        .into_iter()
        .map(|s| (s.key, s.description))
        .collect()
}

pub fn scenario_keys() -> Vec<&'static str> {
    all_scenarios().into_iter().map(|s| s.key).collect()
}

pub fn get_scenario(key: &str) -> Option<Scenario> {
    all_scenarios().into_iter().find(|s| s.key == key)
}

/// A fresh engine with one match and its first leg.
pub struct Board {
    pub engine: DartsEngine<InMemoryStore>,
    pub match_id: MatchId,
    pub leg: LegId,
}

impl Board {
    pub fn open(ctx: &ScenarioCtx, players: &[PlayerId]) -> Result<Self> {
        let engine = DartsEngine::new(InMemoryStore::new(), ctx.config.clone());
        let record = engine.create_match(players)?;
        let first = players.first().copied().context("board needs a player")?;
        let leg = engine.start_new_leg(record.id, first)?;
        Ok(Self {
            engine,
            match_id: record.id,
            leg: leg.id,
        })
    }

    pub fn throw(
        &self,
        player: PlayerId,
        segment: i32,
        multiplier: i32,
        index: i32,
    ) -> Result<ThrowOutcome> {
        self.engine
            .process_throw(self.leg, player, segment, multiplier, index)
            .with_context(|| format!("player {player} dart {index}: {multiplier}x{segment}"))
    }

    pub fn visit(&self, player: PlayerId, darts: [(i32, i32); 3]) -> Result<()> {
        for (index, (segment, multiplier)) in (1..).zip(darts) {
            self.throw(player, segment, multiplier, index)?;
        }
        Ok(())
    }

    pub fn remaining(&self, player: PlayerId) -> Result<i32> {
        Ok(self.engine.player_remaining_score(self.leg, player)?)
    }

    pub fn snapshot(&self) -> Result<Leg> {
        self.engine
            .storage()
            .load_leg(self.leg)?
            .with_context(|| format!("leg {} vanished from storage", self.leg))
    }

    /// Throw whole visits until `player` sits exactly on `target`.
    pub fn walk_down(&self, player: PlayerId, target: i32) -> Result<()> {
        while self.remaining(player)? > target {
            let mut left = self.remaining(player)? - target;
            let mut darts = [(0, 0); 3];
            for slot in &mut darts {
                *slot = plan_dart(left);
                left -= slot.0 * slot.1;
            }
            self.visit(player, darts)?;
        }
        anyhow::ensure!(
            self.remaining(player)? == target,
            "walk down overshot {target}"
        );
        Ok(())
    }
}

/// Largest dart that does not pass `left`.
const fn plan_dart(left: i32) -> (i32, i32) {
    match left {
        l if l <= 0 => (0, 0),
        l if l >= 60 => (20, 3),
        l if l % 3 == 0 => (l / 3, 3),
        l if l % 2 == 0 && l <= 40 => (l / 2, 2),
        l if l <= 20 => (l, 1),
        _ => (20, 1),
    }
}
