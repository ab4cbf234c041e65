use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::{
    connection::{check_connection, list_inflected_forms},
    rules::BoardAction,
    state::{BoardCard, BoardState, Side, SideState},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Expert,
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "beginner" | "easy" => Ok(Difficulty::Beginner),
            "intermediate" | "normal" | "medium" => Ok(Difficulty::Intermediate),
            "expert" | "hard" => Ok(Difficulty::Expert),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Targeting {
    Random,
    LowestHp,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AiProfile {
    /// 装备测验答对的概率。
    pub correct_chance: f64,
    pub targeting: Targeting,
}

impl AiProfile {
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Beginner => Self {
                correct_chance: 0.6,
                targeting: Targeting::Random,
            },
            Difficulty::Intermediate => Self {
                correct_chance: 0.85,
                targeting: Targeting::Random,
            },
            Difficulty::Expert => Self {
                correct_chance: 1.0,
                targeting: Targeting::LowestHp,
            },
        }
    }
}

impl Default for AiProfile {
    fn default() -> Self {
        AiProfile::from_difficulty(Difficulty::default())
    }
}

/// 决策命中的优先级规则。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    Attack,
    Attach,
    Place,
    Pass,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiDecision {
    pub action: BoardAction,
    pub rule: DecisionRule,
    /// 模拟答错时为 true。
    #[serde(default)]
    pub simulated_miss: bool,
}

impl AiDecision {
    fn new(action: BoardAction, rule: DecisionRule) -> Self {
        Self {
            action,
            rule,
            simulated_miss: false,
        }
    }
}

/// 无状态策略：攻击 > 装备 > 放置 > 跳过，不做前瞻。
pub fn choose_action<R>(
    state: &BoardState,
    side: Side,
    difficulty: Difficulty,
    rng: &mut R,
) -> AiDecision
where
    R: Rng + ?Sized,
{
    let profile = AiProfile::from_difficulty(difficulty);
    let own = state.side(side);
    let enemy = state.side(side.other());

    if let Some(decision) = attack_decision(own, enemy, profile.targeting, rng) {
        return decision;
    }
    if let Some(decision) = attach_decision(own, profile.correct_chance, rng) {
        return decision;
    }
    if let (Some(&hand_index), Some(&slot)) = (
        own.unit_card_indices().first(),
        own.empty_slots().first(),
    ) {
        return AiDecision::new(BoardAction::Place { hand_index, slot }, DecisionRule::Place);
    }
    AiDecision::new(BoardAction::Pass, DecisionRule::Pass)
}

fn attack_decision<R>(
    own: &SideState,
    enemy: &SideState,
    targeting: Targeting,
    rng: &mut R,
) -> Option<AiDecision>
where
    R: Rng + ?Sized,
{
    let attacker_slot = *own.ready_attackers().first()?;
    let targets = enemy.occupied_slots();
    let target_slot = match targeting {
        Targeting::Random => *targets.choose(rng)?,
        // 同 HP 取靠前的格子
        Targeting::LowestHp => targets
            .iter()
            .copied()
            .min_by_key(|slot| enemy.unit(*slot).map_or(u32::MAX, |unit| unit.hp))?,
    };
    Some(AiDecision::new(
        BoardAction::Attack {
            attacker_slot,
            target_slot,
        },
        DecisionRule::Attack,
    ))
}

fn attach_decision<R>(own: &SideState, correct_chance: f64, rng: &mut R) -> Option<AiDecision>
where
    R: Rng + ?Sized,
{
    let (hand_index, slot, particle) = own
        .modifier_card_indices()
        .into_iter()
        .find_map(|hand_index| match own.hand.get(hand_index) {
            Some(BoardCard::Modifier(particle)) => own
                .attachable_slots(particle)
                .first()
                .map(|slot| (hand_index, *slot, particle)),
            _ => None,
        })?;
    let verb = &own.unit(slot)?.verb;
    let correct_form = check_connection(particle, verb).required_form?;

    let hit = rng.gen_bool(correct_chance.clamp(0.0, 1.0));
    let (chosen_form, simulated_miss) = if hit {
        (correct_form, false)
    } else {
        let mut decoys: Vec<String> = Vec::new();
        for inflected in list_inflected_forms(verb) {
            if inflected.form != correct_form && !decoys.contains(&inflected.form) {
                decoys.push(inflected.form);
            }
        }
        match decoys.choose(rng) {
            Some(decoy) => (decoy.clone(), true),
            None => (correct_form, false),
        }
    };

    Some(AiDecision {
        action: BoardAction::Attach {
            hand_index,
            slot,
            chosen_form,
        },
        rule: DecisionRule::Attach,
        simulated_miss,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoardConfig;
    use crate::game::catalog::{Catalog, Particle, Verb};
    use crate::game::state::{BoardPhase, UnitInPlay};
    use rand::{rngs::SmallRng, SeedableRng};

    fn verb(id: &str) -> Verb {
        Catalog::sample().verb(id).expect("verb should exist").clone()
    }

    fn particle(id: &str) -> Particle {
        Catalog::sample()
            .particle(id)
            .expect("particle should exist")
            .clone()
    }

    fn board(opponent_hand: Vec<BoardCard>) -> BoardState {
        let player = SideState::new("p", Vec::new(), Vec::new());
        let opponent = SideState::new("o", opponent_hand, Vec::new());
        BoardState::new(player, opponent, &BoardConfig::default())
            .with_phase(BoardPhase::OpponentAction)
    }

    #[test]
    fn difficulty_parses_aliases() {
        assert_eq!("Expert".parse::<Difficulty>(), Ok(Difficulty::Expert));
        assert_eq!("normal".parse::<Difficulty>(), Ok(Difficulty::Intermediate));
        assert_eq!("easy".parse::<Difficulty>(), Ok(Difficulty::Beginner));
        assert!("nightmare".parse::<Difficulty>().is_err());
    }

    #[test]
    fn passes_with_nothing_to_do() {
        let mut rng = SmallRng::seed_from_u64(1);
        let decision = choose_action(&board(Vec::new()), Side::Opponent, Difficulty::Expert, &mut rng);
        assert_eq!(decision.action, BoardAction::Pass);
        assert_eq!(decision.rule, DecisionRule::Pass);
    }

    #[test]
    fn places_first_unit_into_first_empty_slot() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut state = board(vec![
            BoardCard::Modifier(particle("ru")),
            BoardCard::Unit(verb("v_uku")),
        ]);
        state.opponent.slots[0] = Some(UnitInPlay::new(verb("v_miru")));
        let decision = choose_action(&state, Side::Opponent, Difficulty::Beginner, &mut rng);
        assert_eq!(
            decision.action,
            BoardAction::Place {
                hand_index: 1,
                slot: 1
            }
        );
    }

    #[test]
    fn expert_attaches_the_correct_form() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut state = board(vec![BoardCard::Modifier(particle("zu"))]);
        state.opponent.slots[2] = Some(UnitInPlay::new(verb("v_kaku")));
        let decision = choose_action(&state, Side::Opponent, Difficulty::Expert, &mut rng);
        assert_eq!(
            decision.action,
            BoardAction::Attach {
                hand_index: 0,
                slot: 2,
                chosen_form: "書か".into()
            }
        );
        assert!(!decision.simulated_miss);
    }

    #[test]
    fn misses_pick_a_different_form() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut state = board(vec![BoardCard::Modifier(particle("zu"))]);
        state.opponent.slots[0] = Some(UnitInPlay::new(verb("v_kaku")));
        let mut misses = 0;
        for _ in 0..200 {
            let decision = choose_action(&state, Side::Opponent, Difficulty::Beginner, &mut rng);
            let BoardAction::Attach { chosen_form, .. } = decision.action else {
                panic!("expected an attach decision");
            };
            if decision.simulated_miss {
                misses += 1;
                assert_ne!(chosen_form, "書か");
            } else {
                assert_eq!(chosen_form, "書か");
            }
        }
        assert!(misses > 0 && misses < 200);
    }

    #[test]
    fn attack_takes_priority_and_expert_hits_lowest_hp() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut state = board(vec![BoardCard::Unit(verb("v_uku"))]);
        let mut attacker = UnitInPlay::new(verb("v_kaku"));
        attacker.modifier = Some(particle("zu"));
        state.opponent.slots[1] = Some(attacker);

        let mut wounded = UnitInPlay::new(verb("v_yomu"));
        wounded.hp = 3;
        state.player.slots[0] = Some(UnitInPlay::new(verb("v_ari")));
        state.player.slots[2] = Some(wounded);

        let decision = choose_action(&state, Side::Opponent, Difficulty::Expert, &mut rng);
        assert_eq!(
            decision.action,
            BoardAction::Attack {
                attacker_slot: 1,
                target_slot: 2
            }
        );

        for _ in 0..20 {
            let decision = choose_action(&state, Side::Opponent, Difficulty::Beginner, &mut rng);
            assert!(matches!(
                decision.action,
                BoardAction::Attack {
                    attacker_slot: 1,
                    target_slot: 0 | 2
                }
            ));
        }
    }

    #[test]
    fn no_targets_falls_through_to_placement() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut state = board(vec![BoardCard::Unit(verb("v_uku"))]);
        let mut attacker = UnitInPlay::new(verb("v_kaku"));
        attacker.modifier = Some(particle("zu"));
        state.opponent.slots[0] = Some(attacker);
        let decision = choose_action(&state, Side::Opponent, Difficulty::Expert, &mut rng);
        assert_eq!(decision.rule, DecisionRule::Place);
    }
}
