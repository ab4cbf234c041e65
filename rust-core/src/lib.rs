pub mod ai;
pub mod assess;
pub mod config;
pub mod game;
pub mod utils;

use std::borrow::Cow;
use std::fmt::Display;
use std::str::FromStr;

use gloo_timers::future::TimeoutFuture;
use rand::rngs::SmallRng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{choose_action, AiDecision, Difficulty, Opponent};
pub use assess::{MasteryBook, WeightModel};
pub use config::{BoardConfig, ConfigError, DuelConfig, EngineConfig, SamplerConfig};
pub use game::{
    ActionResolution, Answer, BattleQuestion, BoardAction, BoardState, BoardSummary,
    BossRushState, Catalog, CatalogError, ConnectionQuizResult, DeckConfig, DuelState,
    DuelSummary, RuleError, Side, SkillCard, TurnOutcome,
};

use game::progress::{level_up, PlayerStats};
use game::{collection, duel, rules, rush};
use utils::rng_from_seed;

#[cfg(all(feature = "wee_alloc", target_arch = "wasm32"))]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Map 一律转成普通对象，方便前端直接读取。
const SERIALIZER: Serializer = Serializer::json_compatible();

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
    web_sys::console::log_1(&"言霊バトル core ready".into());
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value.serialize(&SERIALIZER).map_err(JsValue::from)
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    from_value(value).map_err(JsValue::from)
}

fn to_js_error<E: Serialize + Display>(error: E) -> JsValue {
    error
        .serialize(&SERIALIZER)
        .unwrap_or_else(|_| JsValue::from_str(&error.to_string()))
}

fn serde_to_js_error<E: Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn load_config(config_json: Option<String>) -> Result<EngineConfig, JsValue> {
    match config_json {
        Some(json) => EngineConfig::from_json(&json).map_err(serde_to_js_error),
        None => Ok(EngineConfig::default()),
    }
}

/// 未传内容表时使用内置示例。
fn load_catalog(catalog_json: Option<String>) -> Result<Cow<'static, Catalog>, JsValue> {
    Catalog::from_json_or_sample(catalog_json.as_deref()).map_err(to_js_error)
}

fn parse_side(side: &str) -> Result<Side, JsValue> {
    match side.to_ascii_lowercase().as_str() {
        "player" => Ok(Side::Player),
        "opponent" | "cpu" => Ok(Side::Opponent),
        other => Err(JsValue::from_str(&format!("unknown side: {other}"))),
    }
}

fn parse_difficulty(difficulty: Option<&str>) -> Difficulty {
    difficulty
        .and_then(|value| Difficulty::from_str(value).ok())
        .unwrap_or_default()
}

fn hand_from_ids(catalog: &Catalog, ids: &[String]) -> Result<Vec<game::SkillCard>, JsValue> {
    ids.iter()
        .map(|id| catalog.skill_card(id).map_err(to_js_error))
        .collect()
}

// ---------- 内容 ----------

#[wasm_bindgen(js_name = "sampleCatalog")]
pub fn sample_catalog() -> Result<JsValue, JsValue> {
    to_js(Catalog::sample())
}

/// 校验外部内容表并原样返回，格式错误时抛出 `Malformed`。
#[wasm_bindgen(js_name = "loadCatalog")]
pub fn load_catalog_json(json: String) -> Result<JsValue, JsValue> {
    let catalog = load_catalog(Some(json))?;
    to_js(catalog.as_ref())
}

#[wasm_bindgen(js_name = "opponentRoster")]
pub fn opponent_roster() -> Result<JsValue, JsValue> {
    to_js(ai::roster())
}

// ---------- 接续判定 ----------

#[wasm_bindgen(js_name = "checkConnection")]
pub fn check_connection(
    particle_id: &str,
    verb_id: &str,
    catalog_json: Option<String>,
) -> Result<JsValue, JsValue> {
    let catalog = load_catalog(catalog_json)?;
    let particle = catalog.particle(particle_id).map_err(to_js_error)?;
    let verb = catalog.verb(verb_id).map_err(to_js_error)?;
    to_js(&game::check_connection(particle, verb))
}

#[wasm_bindgen(js_name = "validateAnswer")]
pub fn validate_answer(
    particle_id: &str,
    verb_id: &str,
    chosen_form: &str,
    catalog_json: Option<String>,
) -> Result<JsValue, JsValue> {
    let catalog = load_catalog(catalog_json)?;
    let particle = catalog.particle(particle_id).map_err(to_js_error)?;
    let verb = catalog.verb(verb_id).map_err(to_js_error)?;
    to_js(&game::validate_answer(particle, verb, chosen_form))
}

#[wasm_bindgen(js_name = "listInflectedForms")]
pub fn list_inflected_forms(verb_id: &str, catalog_json: Option<String>) -> Result<JsValue, JsValue> {
    let catalog = load_catalog(catalog_json)?;
    let verb = catalog.verb(verb_id).map_err(to_js_error)?;
    to_js(&game::list_inflected_forms(verb))
}

// ---------- 单体战 ----------

#[wasm_bindgen(js_name = "createDuel")]
pub fn create_duel(
    enemy_id: &str,
    hand_ids: JsValue,
    player_level: u32,
    config_json: Option<String>,
    seed: Option<u32>,
    catalog_json: Option<String>,
) -> Result<JsValue, JsValue> {
    let catalog = load_catalog(catalog_json)?;
    let config = load_config(config_json)?;
    let enemy = catalog.enemy(enemy_id).map_err(to_js_error)?.clone();
    let ids: Vec<String> = from_js(hand_ids)?;
    let hand = hand_from_ids(&catalog, &ids)?;
    let mut rng = rng_from_seed(seed);
    let state = DuelState::new(
        enemy,
        hand,
        PlayerStats::for_level(player_level),
        config.duel,
        &mut rng,
    );
    to_js(&state)
}

#[wasm_bindgen(js_name = "advanceDuel")]
pub fn advance_duel(state: JsValue, question: JsValue) -> Result<JsValue, JsValue> {
    let state: DuelState = from_js(state)?;
    let question: Option<BattleQuestion> = from_js(question)?;
    to_js(&duel::advance(&state, question))
}

#[derive(Serialize)]
struct SubmitResponse {
    state: DuelState,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<TurnOutcome>,
}

#[wasm_bindgen(js_name = "submitAnswer")]
pub fn submit_answer(state: JsValue, answer: JsValue, seed: Option<u32>) -> Result<JsValue, JsValue> {
    let state: DuelState = from_js(state)?;
    let answer: Answer = from_js(answer)?;
    let mut rng = rng_from_seed(seed);
    let (state, outcome) = duel::submit_answer(&state, answer, &mut rng);
    to_js(&SubmitResponse { state, outcome })
}

#[wasm_bindgen(js_name = "specialAttack")]
pub fn special_attack(state: JsValue, card_index: usize) -> Result<JsValue, JsValue> {
    let state: DuelState = from_js(state)?;
    to_js(&duel::special_attack(&state, card_index))
}

#[wasm_bindgen(js_name = "summarizeDuel")]
pub fn summarize_duel(state: JsValue) -> Result<JsValue, JsValue> {
    let state: DuelState = from_js(state)?;
    to_js(&duel::summarize(&state))
}

// ---------- 卡牌战 ----------

#[wasm_bindgen(js_name = "validateDeck")]
pub fn validate_deck(deck: JsValue, catalog_json: Option<String>) -> Result<JsValue, JsValue> {
    let deck: DeckConfig = from_js(deck)?;
    let catalog = load_catalog(catalog_json)?;
    to_js(&game::validate_deck(&deck, &catalog))
}

#[wasm_bindgen(js_name = "createBoard")]
pub fn create_board(
    player_deck: JsValue,
    opponent_id: &str,
    config_json: Option<String>,
    seed: Option<u32>,
    catalog_json: Option<String>,
) -> Result<JsValue, JsValue> {
    let deck: DeckConfig = from_js(player_deck)?;
    let config = load_config(config_json)?;
    let catalog = load_catalog(catalog_json)?;
    let mut rng = rng_from_seed(seed);
    let state = new_board(&deck, opponent_id, &catalog, &config.board, &mut rng)?;
    to_js(&state)
}

fn new_board(
    deck: &DeckConfig,
    opponent_id: &str,
    catalog: &Catalog,
    config: &BoardConfig,
    rng: &mut SmallRng,
) -> Result<BoardState, JsValue> {
    let issues = game::validate_deck(deck, catalog);
    if !issues.is_empty() {
        return Err(to_js(&issues).unwrap_or_else(|err| err));
    }
    let opponent = ai::find_opponent(opponent_id)
        .ok_or_else(|| JsValue::from_str(&format!("unknown opponent: {opponent_id}")))?;
    BoardState::from_decks(deck, &opponent.deck, &opponent.name, catalog, config, rng)
        .map_err(to_js_error)
}

#[wasm_bindgen(js_name = "drawPhase")]
pub fn draw_phase(state: JsValue) -> Result<JsValue, JsValue> {
    let state: BoardState = from_js(state)?;
    to_js(&rules::draw_phase(&state))
}

#[wasm_bindgen(js_name = "applyBoardAction")]
pub fn apply_board_action(state: JsValue, side: &str, action: JsValue) -> Result<JsValue, JsValue> {
    let state: BoardState = from_js(state)?;
    let action: BoardAction = from_js(action)?;
    to_js(&rules::apply_action(&state, parse_side(side)?, &action))
}

#[wasm_bindgen(js_name = "resolveRound")]
pub fn resolve_round(state: JsValue) -> Result<JsValue, JsValue> {
    let state: BoardState = from_js(state)?;
    to_js(&rules::resolve_round(&state))
}

#[wasm_bindgen(js_name = "summarizeBoard")]
pub fn summarize_board(state: JsValue) -> Result<JsValue, JsValue> {
    let state: BoardState = from_js(state)?;
    to_js(&rules::summarize(&state))
}

#[wasm_bindgen(js_name = "validateBoard")]
pub fn validate_board(state: JsValue) -> Result<(), JsValue> {
    let state: BoardState = from_js(state)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))
}

#[wasm_bindgen(js_name = "computeAiAction")]
pub fn compute_ai_action(
    state: JsValue,
    side: &str,
    difficulty: Option<String>,
    seed: Option<u32>,
) -> Result<JsValue, JsValue> {
    let state: BoardState = from_js(state)?;
    let side = parse_side(side)?;
    let mut rng = rng_from_seed(seed);
    let decision = choose_action(&state, side, parse_difficulty(difficulty.as_deref()), &mut rng);
    to_js(&decision)
}

/// 延迟 `delay_ms` 后给出对手的决策，前端用来演出"思考中"。
#[wasm_bindgen(js_name = "thinkOpponent")]
pub fn think_opponent(
    state: JsValue,
    difficulty: Option<String>,
    delay_ms: Option<u32>,
    seed: Option<u32>,
) -> Result<Promise, JsValue> {
    let state: BoardState = from_js(state)?;
    let difficulty = parse_difficulty(difficulty.as_deref());
    let delay = delay_ms.unwrap_or(0);

    Ok(future_to_promise(async move {
        if delay > 0 {
            TimeoutFuture::new(delay).await;
        }
        let mut rng = rng_from_seed(seed);
        let decision = choose_action(&state, Side::Opponent, difficulty, &mut rng);
        to_js(&decision)
    }))
}

// ---------- 学习评估 ----------

/// 损坏或缺失的记录返回空记录，从不报错。
#[wasm_bindgen(js_name = "loadMastery")]
pub fn load_mastery(json: Option<String>) -> Result<JsValue, JsValue> {
    to_js(&MasteryBook::from_json_lenient(json.as_deref()))
}

#[wasm_bindgen(js_name = "recordTurn")]
pub fn record_turn(book: JsValue, outcome: JsValue) -> Result<JsValue, JsValue> {
    let book: MasteryBook = from_js(book)?;
    let outcome: TurnOutcome = from_js(outcome)?;
    to_js(&book.record_turn(&outcome))
}

#[wasm_bindgen(js_name = "recordQuiz")]
pub fn record_quiz(book: JsValue, quiz: JsValue) -> Result<JsValue, JsValue> {
    let book: MasteryBook = from_js(book)?;
    let quiz: ConnectionQuizResult = from_js(quiz)?;
    to_js(&book.record_quiz(&quiz))
}

#[wasm_bindgen(js_name = "buildWeights")]
pub fn build_weights(book: JsValue, config_json: Option<String>) -> Result<JsValue, JsValue> {
    let book: MasteryBook = from_js(book)?;
    let config = load_config(config_json)?;
    to_js(&WeightModel::from_book(&book, &config.sampler))
}

#[wasm_bindgen(js_name = "selectQuestionType")]
pub fn select_question_type(chapter: u32, is_boss: bool, seed: Option<u32>) -> Result<JsValue, JsValue> {
    let mut rng = rng_from_seed(seed);
    to_js(&assess::select_question_type(chapter, is_boss, &mut rng))
}

#[derive(Deserialize)]
struct QuestionRequest {
    chapter: u32,
    #[serde(default)]
    hand: Vec<String>,
    #[serde(default)]
    preferred: Option<game::QuestionType>,
    #[serde(default)]
    choice_count: Option<usize>,
    #[serde(default)]
    seed: Option<u32>,
}

/// 返回 `null` 表示当前章节没有可出的题。
#[wasm_bindgen(js_name = "drawQuestion")]
pub fn draw_question(
    request: JsValue,
    book: JsValue,
    config_json: Option<String>,
    catalog_json: Option<String>,
) -> Result<JsValue, JsValue> {
    let request: QuestionRequest = from_js(request)?;
    let book: MasteryBook = from_js(book)?;
    let config = load_config(config_json)?;
    let catalog = load_catalog(catalog_json)?;
    let hand = hand_from_ids(&catalog, &request.hand)?;
    let weights = WeightModel::from_book(&book, &config.sampler);
    let mut rng = rng_from_seed(request.seed);
    let question = assess::draw_question(
        &catalog,
        request.chapter,
        &hand,
        request.preferred,
        &weights,
        request.choice_count.unwrap_or(config.sampler.choice_count),
        &mut rng,
    );
    to_js(&question)
}

#[wasm_bindgen(js_name = "pickUnit")]
pub fn pick_unit(unit_ids: JsValue, book: JsValue, seed: Option<u32>) -> Result<JsValue, JsValue> {
    let unit_ids: Vec<String> = from_js(unit_ids)?;
    let book: MasteryBook = from_js(book)?;
    let weights = WeightModel::from_book(&book, &SamplerConfig::default());
    let mut rng = rng_from_seed(seed);
    to_js(&assess::pick_unit(&unit_ids, &weights, &mut rng))
}

#[wasm_bindgen(js_name = "levelUp")]
pub fn apply_level_up(level: u32, exp: u32, gained: u32) -> Result<JsValue, JsValue> {
    to_js(&level_up(level, exp, gained))
}

/// 单挑结束后的经验与宝石，星级决定经验倍率。
#[wasm_bindgen(js_name = "settleBattle")]
pub fn settle_battle(
    summary: JsValue,
    already_cleared: bool,
    is_boss: bool,
    level: u32,
    exp: u32,
) -> Result<JsValue, JsValue> {
    let summary: DuelSummary = from_js(summary)?;
    to_js(&game::settle_battle(&summary, already_cleared, is_boss, level, exp))
}

// ---------- 卡牌收集 ----------

#[wasm_bindgen(js_name = "upgradeCard")]
pub fn upgrade_card(card: JsValue, stones: u32) -> Result<JsValue, JsValue> {
    let card: SkillCard = from_js(card)?;
    let upgrade = collection::upgrade_card(&card, stones).map_err(to_js_error)?;
    to_js(&upgrade)
}

#[wasm_bindgen(js_name = "upgradeCost")]
pub fn upgrade_cost(card: JsValue) -> Result<u32, JsValue> {
    let card: SkillCard = from_js(card)?;
    Ok(collection::upgrade_cost(&card))
}

#[wasm_bindgen(js_name = "gachaPools")]
pub fn gacha_pools() -> Result<JsValue, JsValue> {
    to_js(collection::gacha_pools())
}

#[wasm_bindgen(js_name = "pullGacha")]
pub fn pull_gacha(
    pool_id: &str,
    stones: u32,
    seed: Option<u32>,
    catalog_json: Option<String>,
) -> Result<JsValue, JsValue> {
    let pool = collection::find_pool(pool_id).map_err(to_js_error)?;
    let catalog = load_catalog(catalog_json)?;
    let mut rng = rng_from_seed(seed);
    let pulled = collection::pull(pool, stones, &catalog, &mut rng).map_err(to_js_error)?;
    to_js(&pulled)
}

#[wasm_bindgen(js_name = "validateHandDeck")]
pub fn validate_hand_deck(deck: JsValue, owned: JsValue) -> Result<JsValue, JsValue> {
    let deck: Vec<String> = from_js(deck)?;
    let owned: Vec<SkillCard> = from_js(owned)?;
    to_js(&collection::validate_hand_deck(&deck, &owned))
}

#[wasm_bindgen(js_name = "swapHandCard")]
pub fn swap_hand_card(deck: JsValue, remove_id: &str, add_id: &str) -> Result<JsValue, JsValue> {
    let deck: Vec<String> = from_js(deck)?;
    to_js(&collection::swap_hand_card(&deck, remove_id, add_id))
}

#[wasm_bindgen(js_name = "availableForDeck")]
pub fn available_for_deck(owned: JsValue, deck: JsValue) -> Result<JsValue, JsValue> {
    let owned: Vec<SkillCard> = from_js(owned)?;
    let deck: Vec<String> = from_js(deck)?;
    to_js(&collection::available_for_deck(&owned, &deck))
}

// ---------- 首领连战 ----------

#[wasm_bindgen(js_name = "createBossRush")]
pub fn create_boss_rush() -> Result<JsValue, JsValue> {
    to_js(&BossRushState::new())
}

/// 连战结束后返回 `null`。
#[wasm_bindgen(js_name = "currentRushBoss")]
pub fn current_rush_boss(state: JsValue, catalog_json: Option<String>) -> Result<JsValue, JsValue> {
    let state: BossRushState = from_js(state)?;
    let catalog = load_catalog(catalog_json)?;
    let boss = state.current_boss(&catalog).map_err(to_js_error)?;
    to_js(&boss)
}

#[wasm_bindgen(js_name = "advanceBossRush")]
pub fn advance_boss_rush(state: JsValue, summary: JsValue) -> Result<JsValue, JsValue> {
    let state: BossRushState = from_js(state)?;
    let summary: DuelSummary = from_js(summary)?;
    to_js(&rush::advance(&state, &summary))
}

#[wasm_bindgen(js_name = "settleBossRush")]
pub fn settle_boss_rush(state: JsValue, level: u32, exp: u32) -> Result<JsValue, JsValue> {
    let state: BossRushState = from_js(state)?;
    to_js(&rush::settle(&state, level, exp))
}

// ---------- 有状态会话 ----------

#[derive(Serialize)]
struct AiTurnResponse {
    decision: AiDecision,
    applied: ActionResolution,
}

/// 持有一局卡牌战的会话，状态以 JSON 字符串进出。
#[wasm_bindgen]
pub struct BoardSession {
    state: BoardState,
    rng: SmallRng,
}

#[wasm_bindgen]
impl BoardSession {
    #[wasm_bindgen(constructor)]
    pub fn new(
        player_deck_json: Option<String>,
        opponent_id: &str,
        config_json: Option<String>,
        seed: Option<u32>,
        catalog_json: Option<String>,
    ) -> Result<BoardSession, JsValue> {
        let deck = match player_deck_json {
            Some(json) => serde_json::from_str(&json).map_err(serde_to_js_error)?,
            None => DeckConfig::default_deck(),
        };
        let config = load_config(config_json)?;
        let catalog = load_catalog(catalog_json)?;
        let mut rng = rng_from_seed(seed);
        let state = new_board(&deck, opponent_id, &catalog, &config.board, &mut rng)?;
        Ok(BoardSession { state, rng })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        self.state = serde_json::from_str(json).map_err(serde_to_js_error)?;
        Ok(())
    }

    pub fn draw(&mut self) -> Result<String, JsValue> {
        self.state = rules::draw_phase(&self.state);
        self.state_json()
    }

    pub fn act_json(&mut self, side: &str, action_json: &str) -> Result<String, JsValue> {
        let action: BoardAction = serde_json::from_str(action_json).map_err(serde_to_js_error)?;
        let resolution = rules::apply_action(&self.state, parse_side(side)?, &action);
        self.state = resolution.state.clone();
        serde_json::to_string(&resolution).map_err(serde_to_js_error)
    }

    pub fn opponent_turn(&mut self, difficulty: Option<String>) -> Result<String, JsValue> {
        let difficulty = parse_difficulty(difficulty.as_deref());
        let decision = choose_action(&self.state, Side::Opponent, difficulty, &mut self.rng);
        let applied = rules::apply_action(&self.state, Side::Opponent, &decision.action);
        self.state = applied.state.clone();
        serde_json::to_string(&AiTurnResponse { decision, applied }).map_err(serde_to_js_error)
    }

    pub fn resolve(&mut self) -> Result<String, JsValue> {
        self.state = rules::resolve_round(&self.state);
        self.state_json()
    }

    pub fn summary_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&rules::summarize(&self.state)).map_err(serde_to_js_error)
    }
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
