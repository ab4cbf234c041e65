//! 首领连战：依次挑战各章首领，累计收益，败北即结束。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::catalog::{Catalog, CatalogError, Enemy};
use super::duel::DuelSummary;
use super::progress::{level_up, LevelUp};

pub const RUSH_BOSS_IDS: [&str; 4] = ["e1_boss", "e2_boss", "e3_boss", "e4_boss"];

/// 全部击破后的额外宝石。
pub const RUSH_CLEAR_BONUS: u32 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RushStatus {
    #[default]
    InProgress,
    Cleared,
    Defeated,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum RushError {
    #[error("boss rush is already over")]
    Finished,
    #[error("expected a result against {expected}, got {actual}")]
    WrongBoss { expected: String, actual: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BossRushState {
    pub boss_ids: Vec<String>,
    pub current_index: usize,
    pub completed: Vec<String>,
    pub total_exp: u32,
    pub total_stones: u32,
    #[serde(default)]
    pub status: RushStatus,
}

impl Default for BossRushState {
    fn default() -> Self {
        Self::new()
    }
}

impl BossRushState {
    pub fn new() -> Self {
        Self::with_bosses(RUSH_BOSS_IDS.iter().map(|id| id.to_string()).collect())
    }

    pub fn with_bosses(boss_ids: Vec<String>) -> Self {
        Self {
            boss_ids,
            current_index: 0,
            completed: Vec::new(),
            total_exp: 0,
            total_stones: 0,
            status: RushStatus::InProgress,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed.len() >= self.boss_ids.len()
    }

    pub fn current_boss_id(&self) -> Option<&str> {
        if self.status != RushStatus::InProgress {
            return None;
        }
        self.boss_ids.get(self.current_index).map(String::as_str)
    }

    pub fn current_boss<'a>(&self, catalog: &'a Catalog) -> Result<Option<&'a Enemy>, CatalogError> {
        self.current_boss_id()
            .map(|id| catalog.enemy(id))
            .transpose()
    }
}

fn try_advance(state: &BossRushState, summary: &DuelSummary) -> Result<BossRushState, RushError> {
    let expected = state.current_boss_id().ok_or(RushError::Finished)?;
    if summary.enemy_id != expected {
        return Err(RushError::WrongBoss {
            expected: expected.to_string(),
            actual: summary.enemy_id.clone(),
        });
    }

    let mut next = state.clone();
    next.total_exp = next.total_exp.saturating_add(summary.exp_gained);
    next.total_stones = next.total_stones.saturating_add(summary.stones_gained);
    if summary.victory {
        next.completed.push(summary.enemy_id.clone());
        next.current_index += 1;
        if next.is_complete() {
            next.status = RushStatus::Cleared;
        }
    } else {
        next.status = RushStatus::Defeated;
    }
    Ok(next)
}

/// 记入一场首领战结果，无论胜负都累计经验与宝石。
pub fn advance(state: &BossRushState, summary: &DuelSummary) -> BossRushState {
    try_advance(state, summary).unwrap_or_else(|err| {
        tracing::debug!(error = %err, "boss rush result rejected");
        state.clone()
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RushSettlement {
    pub status: RushStatus,
    pub bosses_defeated: u32,
    pub exp: u32,
    pub stones: u32,
    pub level_up: LevelUp,
}

/// 连战结束后的结算，进行中返回 `None`。败北只发经验。
pub fn settle(state: &BossRushState, level: u32, exp: u32) -> Option<RushSettlement> {
    let stones = match state.status {
        RushStatus::InProgress => return None,
        RushStatus::Cleared => state.total_stones.saturating_add(RUSH_CLEAR_BONUS),
        RushStatus::Defeated => 0,
    };
    Some(RushSettlement {
        status: state.status,
        bosses_defeated: state.completed.len() as u32,
        exp: state.total_exp,
        stones,
        level_up: level_up(level, exp, state.total_exp),
    })
}
