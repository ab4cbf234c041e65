//! 战后结算：星级、经验与等级。

use serde::{Deserialize, Serialize};

use super::duel::DuelSummary;

pub const MAX_PLAYER_LEVEL: u32 = 50;

/// 玩家在战斗开始时的能力值。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerStats {
    pub level: u32,
    pub max_hp: u32,
    pub attack: u32,
}

impl PlayerStats {
    pub fn for_level(level: u32) -> Self {
        let level = level.clamp(1, MAX_PLAYER_LEVEL);
        Self {
            level,
            max_hp: 100 + level * 10,
            attack: level * 2,
        }
    }
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self::for_level(1)
    }
}

/// 正确率恰好落在阈值上时取较高档。
pub fn star_rating(accuracy: f64) -> u8 {
    if accuracy >= 1.0 {
        3
    } else if accuracy >= 0.8 {
        2
    } else if accuracy >= 0.6 {
        1
    } else {
        0
    }
}

pub fn exp_for_level(level: u32) -> u32 {
    let exponent = level.saturating_sub(1) as i32;
    (100.0 * 1.15_f64.powi(exponent)).floor() as u32
}

/// 败北时只获得三成经验。
pub fn exp_for_battle(drop_exp: u32, victory: bool) -> u32 {
    if victory {
        drop_exp
    } else {
        (f64::from(drop_exp) * 0.3).floor() as u32
    }
}

/// 按星级放大基础经验。
pub fn exp_reward(base_exp: u32, stars: u8) -> u32 {
    let multiplier = match stars {
        0 => 0.5,
        1 => 1.0,
        2 => 1.2,
        _ => 1.5,
    };
    (f64::from(base_exp) * multiplier).floor() as u32
}

/// 已通关的关卡不再掉落宝石。
pub fn stones_reward(already_cleared: bool, is_boss: bool) -> u32 {
    if already_cleared {
        0
    } else if is_boss {
        30
    } else {
        10
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelUp {
    pub level: u32,
    pub remaining_exp: u32,
    pub levels_gained: u32,
}

pub fn level_up(level: u32, exp: u32, gained: u32) -> LevelUp {
    let mut level = level.max(1);
    let mut exp = exp.saturating_add(gained);
    let mut levels_gained = 0;

    while level < MAX_PLAYER_LEVEL {
        let required = exp_for_level(level);
        if exp < required {
            break;
        }
        exp -= required;
        level += 1;
        levels_gained += 1;
    }

    LevelUp {
        level: level.min(MAX_PLAYER_LEVEL),
        remaining_exp: exp,
        levels_gained,
    }
}

/// 一场单挑结束后写回存档的收益。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BattleReward {
    pub exp: u32,
    pub stones: u32,
    pub level_up: LevelUp,
}

/// 按结算记录发放经验与宝石，宝石只在胜利时发放。
pub fn settle_battle(
    summary: &DuelSummary,
    already_cleared: bool,
    is_boss: bool,
    level: u32,
    exp: u32,
) -> BattleReward {
    let exp_gained = exp_reward(summary.exp_gained, summary.star_rating);
    let stones = if summary.victory {
        stones_reward(already_cleared, is_boss)
    } else {
        0
    };
    BattleReward {
        exp: exp_gained,
        stones,
        level_up: level_up(level, exp, exp_gained),
    }
}
