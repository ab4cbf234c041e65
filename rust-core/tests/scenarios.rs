//! 通过公开接口驱动的完整对局。

use rand::{rngs::SmallRng, SeedableRng};

use kotodama_core::ai::{choose_action, find_opponent, Difficulty};
use kotodama_core::assess::{draw_question, MasteryBook, WeightModel};
use kotodama_core::config::{BoardConfig, DuelConfig, SamplerConfig};
use kotodama_core::game::duel::{self, GAUGE_MAX};
use kotodama_core::game::progress::{settle_battle, PlayerStats};
use kotodama_core::game::{rules, rush};
use kotodama_core::game::{
    Answer, BoardAction, BoardCard, BoardEvent, BoardPhase, BoardState, BossRushState, Catalog,
    DeckConfig, DuelPhase, DuelState, Side, SideState, SkillCard, UnitInPlay,
};

fn hand(ids: &[&str]) -> Vec<SkillCard> {
    ids.iter()
        .map(|id| Catalog::sample().skill_card(id).expect("card should exist"))
        .collect()
}

fn right_away(card_index: usize) -> Answer {
    Answer::Chosen {
        card_index,
        correct: true,
        elapsed_secs: 2.0,
    }
}

fn gimmick_free_duel(rng: &mut SmallRng) -> DuelState {
    let mut enemy = Catalog::sample().enemy("e1_2").expect("enemy").clone();
    enemy.max_hp = 5_000;
    enemy.turn_cap = Some(10);
    let state = DuelState::new(
        enemy,
        hand(&["zu", "ki", "mu"]),
        PlayerStats::for_level(3),
        DuelConfig::default(),
        rng,
    );
    duel::advance(&state, None)
}

#[test]
fn five_correct_answers_charge_the_special() {
    let mut rng = SmallRng::seed_from_u64(17);
    let mut state = gimmick_free_duel(&mut rng);
    for turn in 1..=5 {
        assert!(!state.special_ready, "ready too early on turn {turn}");
        let (next, outcome) = duel::submit_answer(&state, right_away(0), &mut rng);
        assert!(outcome.is_some());
        state = next;
        if turn < 5 {
            state = duel::advance(&state, None);
            assert_eq!(state.phase, DuelPhase::Question);
        }
    }
    assert!(state.gauge >= GAUGE_MAX);
    assert!(state.special_ready);
}

#[test]
fn special_attack_empties_the_gauge() {
    let mut rng = SmallRng::seed_from_u64(4);
    let mut state = gimmick_free_duel(&mut rng);
    for _ in 0..5 {
        let (next, _) = duel::submit_answer(&state, right_away(1), &mut rng);
        state = if next.gauge >= GAUGE_MAX {
            next
        } else {
            duel::advance(&next, None)
        };
    }
    assert!(state.special_ready);
    let hp_before = state.enemy_hp;

    let after = duel::special_attack(&state, 2);
    assert_eq!(after.gauge, 0);
    assert!(!after.special_ready);
    assert!(after.enemy_hp < hp_before);
    assert_eq!(after.phase, DuelPhase::SpecialAttack);

    // 蓄力未满时拒绝
    assert_eq!(duel::special_attack(&after, 0), after);
}

#[test]
fn boss_duel_runs_to_a_verdict() {
    let mut rng = SmallRng::seed_from_u64(2024);
    let catalog = Catalog::sample();
    let boss = catalog.enemy("e1_boss").expect("boss").clone();
    let cards = hand(&["zu", "ru", "ki", "keri", "mu"]);
    let mut state = DuelState::new(boss, cards.clone(), PlayerStats::for_level(10), DuelConfig::default(), &mut rng);
    let weights = WeightModel::from_book(&MasteryBook::new(), &SamplerConfig::default());
    let mut book = MasteryBook::new();

    for _ in 0..20 {
        let question = draw_question(catalog, 5, &cards, None, &weights, state.choice_count, &mut rng);
        state = duel::advance(&state, question);
        if state.phase.is_terminal() {
            break;
        }
        let correct_index = state
            .current_question
            .as_ref()
            .map(|q| q.correct_index)
            .expect("question should be presented");
        let (next, outcome) = duel::submit_answer(&state, right_away(correct_index), &mut rng);
        let outcome = outcome.expect("answer should resolve");
        assert!(outcome.asked_unit.is_some());
        book = book.record_turn(&outcome);
        state = next;
    }

    assert!(state.phase.is_terminal());
    let summary = duel::summarize(&state);
    assert_eq!(summary.total_questions, state.turn_log.len() as u32);
    assert_eq!(summary.correct_count, summary.total_questions);
    assert_eq!(summary.best_combo, summary.correct_count);
    let tracked: u32 = book.records.values().map(|record| record.attempts).sum();
    assert_eq!(tracked, summary.total_questions);
}

fn tiny_board() -> BoardState {
    let player = SideState::new(
        "p",
        vec![BoardCard::Modifier(
            Catalog::sample().particle("zu").expect("zu").clone(),
        )],
        Vec::new(),
    );
    let opponent = SideState::new("o", Vec::new(), Vec::new());
    let mut state = BoardState::new(player, opponent, &BoardConfig::default());
    state.player.slots[0] = Some(UnitInPlay::new(
        Catalog::sample().verb("v_kaku").expect("kaku").clone(),
    ));
    state.opponent.slots[0] = Some(UnitInPlay::new(
        Catalog::sample().verb("v_uku").expect("uku").clone(),
    ));
    state
}

#[test]
fn wrong_attachment_keeps_the_card_and_reports_the_form() {
    let state = rules::draw_phase(&tiny_board());
    assert_eq!(state.phase, BoardPhase::PlayerAction);

    let resolution = rules::apply_action(
        &state,
        Side::Player,
        &BoardAction::Attach {
            hand_index: 0,
            slot: 0,
            chosen_form: "書け".into(),
        },
    );
    let quiz = resolution.quiz.expect("attempt should be recorded");
    assert!(!quiz.is_correct);
    assert_eq!(quiz.correct_form, "書か");

    let next = resolution.state;
    assert_eq!(next.player.hand.len(), state.player.hand.len());
    assert!(next.player.unit(0).is_some_and(|unit| unit.modifier.is_none()));
    assert_eq!(next.phase, BoardPhase::OpponentAction, "the action is spent");
    assert_eq!(next.consecutive_correct(Side::Player), 0);

    let book = MasteryBook::new().record_quiz(&quiz);
    assert_eq!(book.get("zu").map(|record| record.attempts), Some(1));
}

#[test]
fn equal_hp_at_the_round_cap_goes_to_the_player() {
    let mut state = tiny_board().with_phase(BoardPhase::Resolve);
    state.round = state.max_rounds;
    for side in [Side::Player, Side::Opponent] {
        if let Some(unit) = state.side_mut(side).slots[0].as_mut() {
            unit.hp = 12;
        }
    }

    let resolved = rules::resolve_round(&state);
    assert_eq!(resolved.phase, BoardPhase::Victory);
    assert_eq!(resolved.winner, Some(Side::Player));
    assert!(!rules::summarize(&resolved).is_draw);
}

#[test]
fn cpu_against_cpu_board_battle_terminates() {
    let mut rng = SmallRng::seed_from_u64(7);
    let opponent = find_opponent("opp_3").expect("roster entry");
    let mut state = BoardState::from_decks(
        &DeckConfig::default_deck(),
        &opponent.deck,
        &opponent.name,
        Catalog::sample(),
        &BoardConfig::default(),
        &mut rng,
    )
    .expect("decks should resolve");

    for _ in 0..BoardConfig::default().max_rounds + 1 {
        if state.is_finished() {
            break;
        }
        state = rules::draw_phase(&state);
        for side in [Side::Player, Side::Opponent] {
            let decision = choose_action(&state, side, Difficulty::Expert, &mut rng);
            let next = rules::apply_action(&state, side, &decision.action).state;
            assert_ne!(next.phase, state.phase, "{side:?} decision was rejected");
            state = next;
        }
        state = rules::resolve_round(&state);
    }

    assert!(state.is_finished());
    assert!(state.round <= state.max_rounds);
    assert!(matches!(
        state.event_log.last(),
        Some(BoardEvent::BattleEnded { .. })
    ));
    let summary = rules::summarize(&state);
    assert_eq!(summary.attach_correct, summary.attach_total, "expert never misses");
    assert_eq!(summary.rounds, state.round);
}

#[test]
fn won_boss_duel_moves_the_rush_forward() {
    let mut rng = SmallRng::seed_from_u64(11);
    let mut boss = Catalog::sample().enemy("e1_boss").expect("boss").clone();
    boss.max_hp = 1;
    let state = DuelState::new(
        boss,
        hand(&["zu"]),
        PlayerStats::for_level(1),
        DuelConfig::default(),
        &mut rng,
    );
    let state = duel::advance(&state, None);
    let (state, outcome) = duel::submit_answer(&state, right_away(0), &mut rng);
    assert!(outcome.is_some());
    assert!(state.is_victory());

    let summary = duel::summarize(&state);
    let rush_state = rush::advance(&BossRushState::new(), &summary);
    assert_eq!(rush_state.current_boss_id(), Some("e2_boss"));
    assert_eq!(rush_state.total_exp, summary.exp_gained);
    assert_eq!(rush_state.total_stones, summary.stones_gained);

    // 同一场胜利也可以走普通关卡的结算
    let reward = settle_battle(&summary, false, true, 1, 0);
    assert_eq!(reward.stones, 30);
    assert!(reward.exp >= summary.exp_gained);
}
