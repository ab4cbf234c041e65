use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::mastery::{mastery_level, MasteryBook};
use crate::config::SamplerConfig;
use crate::game::catalog::QuestionType;

/// 单元与题型的出题权重，所有权重都严格为正。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightModel {
    pub units: BTreeMap<String, f64>,
    pub types: BTreeMap<QuestionType, f64>,
    pub default_weight: f64,
}

impl WeightModel {
    pub fn from_book(book: &MasteryBook, config: &SamplerConfig) -> Self {
        let units = book
            .records
            .iter()
            .map(|(unit, record)| {
                let weight = weakness_weight(record.correct, record.attempts, config);
                (unit.clone(), weight)
            })
            .collect();

        let types = QuestionType::ALL
            .iter()
            .map(|kind| {
                let totals = book.type_totals(*kind);
                (*kind, type_weakness(totals.correct, totals.attempts, config))
            })
            .collect();

        Self {
            units,
            types,
            default_weight: config.explore_weight,
        }
    }

    /// 未记录的单元按中性权重处理。
    pub fn unit_weight(&self, unit_id: &str) -> f64 {
        self.units
            .get(unit_id)
            .copied()
            .unwrap_or(self.default_weight)
    }

    pub fn type_weight(&self, kind: QuestionType) -> f64 {
        self.types.get(&kind).copied().unwrap_or(self.default_weight)
    }

    pub fn question_weight(&self, unit_id: &str, kind: QuestionType) -> f64 {
        self.unit_weight(unit_id) * self.type_weight(kind)
    }
}

fn miss_curve(correct: u32, attempts: u32) -> f64 {
    let accuracy = f64::from(correct.min(attempts)) / f64::from(attempts);
    let miss = 1.0 - accuracy;
    1.0 + 3.0 * miss * miss
}

/// `1 + 3(1 - acc)^2`；掌握度饱和后乘以缩放系数，从不归零。
pub fn weakness_weight(correct: u32, attempts: u32, config: &SamplerConfig) -> f64 {
    if attempts == 0 {
        return config.explore_weight;
    }
    let weight = miss_curve(correct, attempts);
    if mastery_level(correct, attempts) >= config.saturation_level {
        weight * config.saturation_scale
    } else {
        weight
    }
}

/// 题型权重不看掌握度，只看正确率。
pub fn type_weakness(correct: u32, attempts: u32, config: &SamplerConfig) -> f64 {
    if attempts == 0 {
        config.explore_weight
    } else {
        miss_curve(correct, attempts)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Weighted<T> {
    pub item: T,
    pub weight: f64,
}

impl<T> Weighted<T> {
    pub fn new(item: T, weight: f64) -> Self {
        Self { item, weight }
    }
}

/// 按权重抽取一个候选；空列表返回 `None`。
pub fn weighted_pick<'a, T, R>(candidates: &'a [Weighted<T>], rng: &mut R) -> Option<&'a T>
where
    R: Rng + ?Sized,
{
    match candidates {
        [] => None,
        [only] => Some(&only.item),
        _ => {
            let total: f64 = candidates
                .iter()
                .map(|candidate| candidate.weight.max(0.0))
                .sum();
            if total <= 0.0 {
                return candidates.last().map(|candidate| &candidate.item);
            }
            let mut remainder = rng.gen::<f64>() * total;
            for candidate in candidates {
                remainder -= candidate.weight.max(0.0);
                if remainder <= 0.0 {
                    return Some(&candidate.item);
                }
            }
            // 浮点误差兜底
            candidates.last().map(|candidate| &candidate.item)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn untouched_units_get_explore_bonus() {
        let config = SamplerConfig::default();
        let model = WeightModel::from_book(&MasteryBook::new(), &config);
        assert_eq!(model.unit_weight("zu"), 2.0);
        assert_eq!(model.type_weight(QuestionType::Meaning), 2.0);
        assert_eq!(model.question_weight("zu", QuestionType::Meaning), 4.0);
    }

    #[test]
    fn weak_units_weigh_more() {
        let config = SamplerConfig::default();
        assert_eq!(weakness_weight(0, 4, &config), 4.0);
        assert_eq!(weakness_weight(2, 4, &config), 1.75);
        assert_eq!(weakness_weight(4, 4, &config), 1.0);
    }

    #[test]
    fn mastered_units_are_scaled_not_zeroed() {
        let config = SamplerConfig::default();
        let weight = weakness_weight(30, 30, &config);
        assert!((weight - 0.3).abs() < 1e-12);
        assert!(weakness_weight(60, 60, &config) > 0.0);
        assert_eq!(type_weakness(30, 30, &config), 1.0);
    }

    #[test]
    fn model_reads_type_tallies() {
        let book = MasteryBook::new()
            .with_attempt("ki", Some(QuestionType::Meaning), false)
            .with_attempt("keri", Some(QuestionType::Meaning), false);
        let model = WeightModel::from_book(&book, &SamplerConfig::default());
        assert_eq!(model.type_weight(QuestionType::Meaning), 4.0);
        assert_eq!(model.type_weight(QuestionType::Composite), 2.0);
        assert_eq!(model.unit_weight("ki"), 4.0);
    }

    #[test]
    fn pick_respects_weights() {
        let mut rng = SmallRng::seed_from_u64(11);
        let only = [Weighted::new("a", 0.0)];
        assert_eq!(weighted_pick(&only, &mut rng), Some(&"a"));
        let empty: [Weighted<&str>; 0] = [];
        assert_eq!(weighted_pick(&empty, &mut rng), None);

        let skewed = [Weighted::new("rare", 0.0), Weighted::new("common", 5.0)];
        for _ in 0..50 {
            assert_eq!(weighted_pick(&skewed, &mut rng), Some(&"common"));
        }
    }
}
