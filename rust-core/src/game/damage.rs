use serde::{Deserialize, Serialize};

use super::catalog::Element;

const ADVANTAGE_MULTIPLIER: f64 = 1.5;
const DISADVANTAGE_MULTIPLIER: f64 = 0.75;
const CRITICAL_MULTIPLIER: f64 = 1.5;
const SPECIAL_MULTIPLIER: f64 = 2.5;

/// 一次伤害结算所需的全部修正值。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DamageInput {
    pub base_power: f64,
    pub attacker_bonus: f64,
    pub defense: f64,
    pub combo_multiplier: f64,
    pub timing_multiplier: f64,
    pub element_multiplier: f64,
    #[serde(default)]
    pub is_critical: bool,
    #[serde(default)]
    pub is_special: bool,
}

impl DamageInput {
    pub fn new(base_power: f64, attacker_bonus: f64, defense: f64) -> Self {
        Self {
            base_power,
            attacker_bonus,
            defense,
            combo_multiplier: 1.0,
            timing_multiplier: 1.0,
            element_multiplier: 1.0,
            is_critical: false,
            is_special: false,
        }
    }

    pub fn with_multipliers(mut self, combo: f64, timing: f64, element: f64) -> Self {
        self.combo_multiplier = combo;
        self.timing_multiplier = timing;
        self.element_multiplier = element;
        self
    }

    pub fn critical(mut self, is_critical: bool) -> Self {
        self.is_critical = is_critical;
        self
    }

    pub fn special(mut self, is_special: bool) -> Self {
        self.is_special = is_special;
        self
    }
}

/// 伤害公式。暴击与必杀倍率作用在修正后的数值上，结果至少为 1。
pub fn compute_damage(input: &DamageInput) -> u32 {
    let mut raw = (input.base_power + input.attacker_bonus - 0.5 * input.defense)
        * input.combo_multiplier
        * input.timing_multiplier
        * input.element_multiplier;
    if input.is_critical {
        raw *= CRITICAL_MULTIPLIER;
    }
    if input.is_special {
        raw *= SPECIAL_MULTIPLIER;
    }

    let floored = raw.floor();
    // NaN 与负数都落到下限
    if floored.is_nan() || floored < 1.0 {
        1
    } else if floored >= u32::MAX as f64 {
        u32::MAX
    } else {
        floored as u32
    }
}

pub fn element_multiplier(attacker: Element, defender: Element) -> f64 {
    if attacker == defender {
        1.0
    } else if attacker.beats() == defender {
        ADVANTAGE_MULTIPLIER
    } else if defender.beats() == attacker {
        DISADVANTAGE_MULTIPLIER
    } else {
        1.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimingBand {
    Fast,
    Normal,
    Slow,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct TimingBonus {
    pub band: TimingBand,
    pub multiplier: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<&'static str>,
}

const FAST_UPPER_SECS: f64 = 3.0;
const NORMAL_UPPER_SECS: f64 = 7.0;

/// 按作答耗时（秒）划分速度档位，上界包含在内。
pub fn timing_bonus(elapsed_secs: f64) -> TimingBonus {
    if elapsed_secs <= FAST_UPPER_SECS {
        TimingBonus {
            band: TimingBand::Fast,
            multiplier: 1.3,
            label: Some("疾風！"),
        }
    } else if elapsed_secs <= NORMAL_UPPER_SECS {
        TimingBonus {
            band: TimingBand::Normal,
            multiplier: 1.0,
            label: None,
        }
    } else {
        TimingBonus {
            band: TimingBand::Slow,
            multiplier: 0.8,
            label: None,
        }
    }
}

/// 连击倍率表：下标为连续答对数，超出部分取最后一档。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComboTable(&'static [f64]);

impl ComboTable {
    pub const DUEL: ComboTable = ComboTable(&[1.0, 1.0, 1.15, 1.3, 1.45, 1.6]);
    pub const BOARD: ComboTable = ComboTable(&[1.0, 1.0, 1.15, 1.3, 1.5]);

    pub fn multiplier(&self, streak: u32) -> f64 {
        let index = (streak as usize).min(self.0.len() - 1);
        self.0[index]
    }

    pub fn ceiling(&self) -> f64 {
        self.0[self.0.len() - 1]
    }

    /// 达到封顶倍率所需的最短连击数。
    pub fn saturation(&self) -> u32 {
        (self.0.len() - 1) as u32
    }
}

/// 答错时玩家承受的反击伤害。
pub fn counter_damage(player_max_hp: u32, ratio: f64, reflect: Option<f64>) -> u32 {
    let base = ((player_max_hp as f64) * ratio).floor().max(1.0);
    let amplified = match reflect {
        Some(factor) => (base * factor).floor(),
        None => base,
    };
    amplified.max(1.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_applies_modifiers_before_critical_and_special() {
        let input = DamageInput::new(15.0, 0.0, 2.0).with_multipliers(1.15, 1.3, 1.5);
        // (15 - 1) * 1.15 * 1.3 * 1.5 = 31.395
        assert_eq!(compute_damage(&input), 31);
        assert_eq!(compute_damage(&input.critical(true)), 47);
        assert_eq!(compute_damage(&input.critical(true).special(true)), 117);
    }

    #[test]
    fn hopeless_inputs_still_deal_one() {
        let input = DamageInput::new(1.0, 0.0, 500.0).with_multipliers(1.0, 0.8, 0.75);
        assert_eq!(compute_damage(&input), 1);
        let zero = DamageInput::new(0.0, 0.0, 0.0).with_multipliers(0.0, 0.0, 0.0);
        assert_eq!(compute_damage(&zero), 1);
    }

    #[test]
    fn element_cycles_and_mutual_pair() {
        assert_eq!(element_multiplier(Element::Fire, Element::Ice), 1.5);
        assert_eq!(element_multiplier(Element::Ice, Element::Fire), 0.75);
        assert_eq!(element_multiplier(Element::Wind, Element::Fire), 1.5);
        assert_eq!(element_multiplier(Element::Water, Element::Earth), 1.5);
        assert_eq!(element_multiplier(Element::Light, Element::Dark), 1.5);
        assert_eq!(element_multiplier(Element::Dark, Element::Light), 1.5);
        assert_eq!(element_multiplier(Element::Fire, Element::Earth), 1.0);
        assert_eq!(element_multiplier(Element::Earth, Element::Earth), 1.0);
    }

    #[test]
    fn timing_bands_include_upper_edge() {
        assert_eq!(timing_bonus(3.0).band, TimingBand::Fast);
        assert_eq!(timing_bonus(3.01).band, TimingBand::Normal);
        assert_eq!(timing_bonus(7.0).band, TimingBand::Normal);
        assert_eq!(timing_bonus(7.5).multiplier, 0.8);
        assert_eq!(timing_bonus(0.0).label, Some("疾風！"));
    }

    #[test]
    fn combo_saturates() {
        assert_eq!(ComboTable::DUEL.multiplier(0), 1.0);
        assert_eq!(ComboTable::DUEL.multiplier(3), 1.3);
        assert_eq!(ComboTable::DUEL.multiplier(5), 1.6);
        assert_eq!(ComboTable::DUEL.multiplier(40), 1.6);
        assert_eq!(ComboTable::BOARD.multiplier(9), ComboTable::BOARD.ceiling());
        assert_eq!(ComboTable::BOARD.saturation(), 4);
    }

    #[test]
    fn counter_damage_scales_with_reflect() {
        assert_eq!(counter_damage(110, 0.125, None), 13);
        assert_eq!(counter_damage(110, 0.125, Some(1.5)), 19);
        assert_eq!(counter_damage(4, 0.125, None), 1);
    }
}
