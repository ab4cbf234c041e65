//! 按弱点权重出题。

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use super::weights::{weighted_pick, WeightModel, Weighted};
use crate::game::catalog::{Catalog, QuestionTemplate, QuestionType, SkillCard};
use crate::game::duel::BattleQuestion;

/// 按章节决定题型分布；Boss 战固定出复合题。
pub fn select_question_type<R>(chapter: u32, is_boss: bool, rng: &mut R) -> QuestionType
where
    R: Rng + ?Sized,
{
    use QuestionType::*;

    if is_boss {
        return Composite;
    }
    let roll: f64 = rng.gen();
    let bands: &[(f64, QuestionType)] = if chapter <= 2 {
        &[(0.6, Connection), (0.9, Meaning), (1.0, Conjugation)]
    } else if chapter <= 4 {
        &[
            (0.4, Connection),
            (0.7, Meaning),
            (0.9, Conjugation),
            (1.0, Composite),
        ]
    } else {
        &[
            (0.25, Connection),
            (0.5, Meaning),
            (0.75, Conjugation),
            (1.0, Composite),
        ]
    };
    bands
        .iter()
        .find(|(upper, _)| roll < *upper)
        .map_or(Composite, |(_, kind)| *kind)
}

/// 出一道题。
///
/// 候选依次收窄：章节不超过当前章节，优先指定题型，优先手牌能答的题；
/// 然后按 `WeightModel` 加权抽取。没有可用模板时返回 `None`。
pub fn draw_question<R>(
    catalog: &Catalog,
    chapter: u32,
    hand: &[SkillCard],
    preferred: Option<QuestionType>,
    weights: &WeightModel,
    choice_count: usize,
    rng: &mut R,
) -> Option<BattleQuestion>
where
    R: Rng + ?Sized,
{
    let available: Vec<&QuestionTemplate> = catalog
        .questions
        .iter()
        .filter(|template| template.chapter <= chapter)
        .collect();
    if available.is_empty() {
        tracing::debug!(chapter, "no question templates unlocked");
        return None;
    }

    let typed: Vec<&QuestionTemplate> = match preferred {
        Some(kind) => available
            .iter()
            .copied()
            .filter(|template| template.kind == kind)
            .collect(),
        None => Vec::new(),
    };
    let candidates = if typed.is_empty() { available } else { typed };

    let in_hand: HashSet<&str> = hand.iter().map(|card| card.particle_id.as_str()).collect();
    let answerable: Vec<&QuestionTemplate> = candidates
        .iter()
        .copied()
        .filter(|template| in_hand.contains(template.answer_id.as_str()))
        .collect();
    let pool = if answerable.is_empty() {
        candidates
    } else {
        answerable
    };

    let weighted: Vec<Weighted<&QuestionTemplate>> = pool
        .into_iter()
        .map(|template| {
            let weight = weights.question_weight(&template.answer_id, template.kind);
            Weighted::new(template, weight)
        })
        .collect();
    let template = *weighted_pick(&weighted, rng)?;

    let answer = match catalog.skill_card(&template.answer_id) {
        Ok(card) => card,
        Err(err) => {
            tracing::warn!(error = %err, template = %template.id, "question answer missing from catalog");
            return None;
        }
    };
    let (choices, correct_index) = build_choices(catalog, answer, choice_count, rng);

    Some(BattleQuestion {
        template_id: template.id.clone(),
        kind: template.kind,
        type_label: template.kind.label().to_string(),
        sentence: template.sentence.clone(),
        answer_id: template.answer_id.clone(),
        choices,
        correct_index,
        hint: template.hint.clone(),
    })
}

/// 正确卡加上随机、互不相同的干扰项，洗牌后返回正确卡的位置。
pub fn build_choices<R>(
    catalog: &Catalog,
    answer: SkillCard,
    choice_count: usize,
    rng: &mut R,
) -> (Vec<SkillCard>, usize)
where
    R: Rng + ?Sized,
{
    let mut decoys: Vec<SkillCard> = catalog
        .particles
        .iter()
        .filter(|particle| particle.id != answer.particle_id)
        .map(|particle| SkillCard::from_particle(particle, format!("card_{}", particle.id)))
        .collect();
    decoys.shuffle(rng);
    decoys.truncate(choice_count.saturating_sub(1));

    let answer_id = answer.particle_id.clone();
    decoys.push(answer);
    decoys.shuffle(rng);
    let correct_index = decoys
        .iter()
        .position(|card| card.particle_id == answer_id)
        .unwrap_or_default();
    (decoys, correct_index)
}

/// 练习模式：按单元权重抽一个要练的单元。
pub fn pick_unit<'a, R>(unit_ids: &'a [String], weights: &WeightModel, rng: &mut R) -> Option<&'a str>
where
    R: Rng + ?Sized,
{
    let weighted: Vec<Weighted<&str>> = unit_ids
        .iter()
        .map(|id| Weighted::new(id.as_str(), weights.unit_weight(id)))
        .collect();
    weighted_pick(&weighted, rng).copied()
}
