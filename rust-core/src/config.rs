//! 引擎可调参数。所有字段都有默认值，前端只需覆盖关心的部分。

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid engine config: {0}")]
    Parse(String),
    #[error("{field} must be {expected}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
    },
}

/// 单体 HP 竞速战的参数。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DuelConfig {
    pub gauge_per_correct: u32,
    /// 答错时蓄力槽乘以该系数。
    pub wrong_gauge_factor: f64,
    pub counter_ratio: f64,
    pub critical_chance: f64,
    pub heal_period: u32,
    pub time_limit_secs: f64,
    pub choice_count: usize,
    pub boss_turn_cap: u32,
    pub base_turn_cap: u32,
    pub turn_cap_jitter: u32,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            gauge_per_correct: 20,
            wrong_gauge_factor: 0.5,
            counter_ratio: 0.125,
            critical_chance: 0.1,
            heal_period: 3,
            time_limit_secs: 10.0,
            choice_count: 5,
            boss_turn_cap: 6,
            base_turn_cap: 4,
            turn_cap_jitter: 2,
        }
    }
}

/// 三格卡牌战的参数。格子数量固定为 3，不在此配置。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BoardConfig {
    pub initial_draw: usize,
    pub max_rounds: u32,
    pub action_time_secs: f64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            initial_draw: 5,
            max_rounds: 7,
            action_time_secs: 10.0,
        }
    }
}

/// 弱点权重与出题参数。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SamplerConfig {
    /// 从未作答单元的探索权重。
    pub explore_weight: f64,
    pub saturation_level: u8,
    pub saturation_scale: f64,
    pub choice_count: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            explore_weight: 2.0,
            saturation_level: 4,
            saturation_scale: 0.3,
            choice_count: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub duel: DuelConfig,
    pub board: BoardConfig,
    pub sampler: SamplerConfig,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let probability = |value: f64| (0.0..=1.0).contains(&value);
        if !probability(self.duel.critical_chance) {
            return Err(ConfigError::OutOfRange {
                field: "duel.critical_chance",
                expected: "within [0, 1]",
            });
        }
        if !probability(self.duel.wrong_gauge_factor) {
            return Err(ConfigError::OutOfRange {
                field: "duel.wrong_gauge_factor",
                expected: "within [0, 1]",
            });
        }
        if self.duel.heal_period == 0 {
            return Err(ConfigError::OutOfRange {
                field: "duel.heal_period",
                expected: "positive",
            });
        }
        if self.board.max_rounds == 0 {
            return Err(ConfigError::OutOfRange {
                field: "board.max_rounds",
                expected: "positive",
            });
        }
        if self.sampler.explore_weight <= 0.0 || self.sampler.saturation_scale <= 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "sampler weights",
                expected: "strictly positive",
            });
        }
        if self.sampler.choice_count < 2 || self.duel.choice_count < 2 {
            return Err(ConfigError::OutOfRange {
                field: "choice_count",
                expected: "at least 2",
            });
        }
        Ok(())
    }
}
