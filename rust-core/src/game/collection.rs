//! 卡牌收集：强化、抽卡与单挑手牌编成。

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::catalog::{Catalog, Rarity, SkillCard};

pub const MAX_CARD_LEVEL: u32 = 10;
pub const HAND_DECK_SIZE: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum CollectionError {
    #[error("card {card_id} is already at level {level}")]
    MaxLevel { card_id: String, level: u32 },
    #[error("need {required} stones, have {available}")]
    NotEnoughStones { required: u32, available: u32 },
    #[error("unknown gacha pool: {id}")]
    UnknownPool { id: String },
    #[error("gacha pool {id} has no card in the catalog")]
    EmptyPool { id: String },
}

fn cost_factor(rarity: Rarity) -> u32 {
    match rarity {
        Rarity::N => 1,
        Rarity::R => 2,
        Rarity::SR => 3,
        Rarity::SSR => 5,
    }
}

fn power_step(rarity: Rarity) -> u32 {
    match rarity {
        Rarity::N => 2,
        Rarity::R => 3,
        Rarity::SR => 4,
        Rarity::SSR => 5,
    }
}

pub fn upgrade_cost(card: &SkillCard) -> u32 {
    (3 + card.level * 2) * cost_factor(card.rarity)
}

pub fn can_upgrade(card: &SkillCard, stones: u32) -> bool {
    card.level < MAX_CARD_LEVEL && stones >= upgrade_cost(card)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Upgrade {
    pub card: SkillCard,
    pub stones_spent: u32,
    pub remaining_stones: u32,
}

/// 升一级并按稀有度提升基础威力，原卡不变。
pub fn upgrade_card(card: &SkillCard, stones: u32) -> Result<Upgrade, CollectionError> {
    if card.level >= MAX_CARD_LEVEL {
        return Err(CollectionError::MaxLevel {
            card_id: card.id.clone(),
            level: card.level,
        });
    }
    let cost = upgrade_cost(card);
    if stones < cost {
        return Err(CollectionError::NotEnoughStones {
            required: cost,
            available: stones,
        });
    }

    let mut upgraded = card.clone();
    upgraded.level += 1;
    upgraded.power += power_step(card.rarity);
    Ok(Upgrade {
        card: upgraded,
        stones_spent: cost,
        remaining_stones: stones - cost,
    })
}

/// 各稀有度的出货率，合计应为 1。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RarityRates {
    #[serde(rename = "N")]
    pub n: f64,
    #[serde(rename = "R")]
    pub r: f64,
    #[serde(rename = "SR")]
    pub sr: f64,
    #[serde(rename = "SSR")]
    pub ssr: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GachaPool {
    pub id: String,
    pub name: String,
    pub cost: u32,
    pub rates: RarityRates,
    pub cards: Vec<String>,
}

impl GachaPool {
    pub fn can_afford(&self, stones: u32) -> bool {
        stones >= self.cost
    }
}

const PREMIUM_CARDS: &[&str] = &[
    "ru", "raru", "su", "sasu", "tsu", "nu", "tari_kanryou", "beshi", "shimu", "ri", "ramu",
    "kemu", "mashi", "ji", "tashi", "muzu", "maji", "mahoshi", "tari_dantei", "nari_denbun",
    "gotoshi",
];

static POOLS: Lazy<Vec<GachaPool>> = Lazy::new(|| {
    let normal_cards = ["zu", "ki", "keri", "mu", "nari_dantei"]
        .iter()
        .chain(PREMIUM_CARDS.iter())
        .map(|id| id.to_string())
        .collect();
    vec![
        GachaPool {
            id: "normal".into(),
            name: "通常ガチャ".into(),
            cost: 10,
            rates: RarityRates {
                n: 0.50,
                r: 0.30,
                sr: 0.15,
                ssr: 0.05,
            },
            cards: normal_cards,
        },
        GachaPool {
            id: "premium".into(),
            name: "プレミアムガチャ".into(),
            cost: 30,
            rates: RarityRates {
                n: 0.20,
                r: 0.35,
                sr: 0.30,
                ssr: 0.15,
            },
            cards: PREMIUM_CARDS.iter().map(|id| id.to_string()).collect(),
        },
    ]
});

pub fn gacha_pools() -> &'static [GachaPool] {
    &POOLS
}

pub fn find_pool(id: &str) -> Result<&'static GachaPool, CollectionError> {
    POOLS
        .iter()
        .find(|pool| pool.id == id)
        .ok_or_else(|| CollectionError::UnknownPool { id: id.to_string() })
}

/// 从 SSR 往下累加概率，剩余部分落到 N。
pub fn roll_rarity<R>(rates: &RarityRates, rng: &mut R) -> Rarity
where
    R: Rng + ?Sized,
{
    let roll: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (rarity, rate) in [
        (Rarity::SSR, rates.ssr),
        (Rarity::SR, rates.sr),
        (Rarity::R, rates.r),
    ] {
        cumulative += rate;
        if roll < cumulative {
            return rarity;
        }
    }
    Rarity::N
}

fn rarity_power_bonus(rarity: Rarity) -> u32 {
    match rarity {
        Rarity::N => 0,
        Rarity::R => 3,
        Rarity::SR => 8,
        Rarity::SSR => 15,
    }
}

/// 抽一张卡。先定稀有度，再从同稀有度的卡里挑，没有则在整个卡池里挑。
/// 卡牌沿用抽到的稀有度，威力 = 助动词基础威力 + 稀有度加成。
pub fn roll_gacha<R>(
    pool: &GachaPool,
    catalog: &Catalog,
    rng: &mut R,
) -> Result<SkillCard, CollectionError>
where
    R: Rng + ?Sized,
{
    let rarity = roll_rarity(&pool.rates, rng);
    let known: Vec<_> = pool
        .cards
        .iter()
        .filter_map(|id| catalog.particle(id).ok())
        .collect();
    let matching: Vec<_> = known
        .iter()
        .copied()
        .filter(|particle| particle.rarity == rarity)
        .collect();
    let candidates = if matching.is_empty() { &known } else { &matching };
    let particle = candidates
        .choose(rng)
        .copied()
        .ok_or_else(|| CollectionError::EmptyPool {
            id: pool.id.clone(),
        })?;

    let serial: u32 = rng.gen();
    let mut card = SkillCard::from_particle(particle, format!("gacha_{}_{serial:08x}", particle.id));
    card.rarity = rarity;
    card.power = particle.power + rarity_power_bonus(rarity);
    Ok(card)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GachaPull {
    pub card: SkillCard,
    pub remaining_stones: u32,
}

/// 扣除宝石后抽一张。
pub fn pull<R>(
    pool: &GachaPool,
    stones: u32,
    catalog: &Catalog,
    rng: &mut R,
) -> Result<GachaPull, CollectionError>
where
    R: Rng + ?Sized,
{
    if !pool.can_afford(stones) {
        return Err(CollectionError::NotEnoughStones {
            required: pool.cost,
            available: stones,
        });
    }
    let card = roll_gacha(pool, catalog, rng)?;
    Ok(GachaPull {
        card,
        remaining_stones: stones - pool.cost,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum HandDeckIssue {
    #[error("hand deck needs {expected} cards, found {actual}")]
    Size { expected: usize, actual: usize },
    #[error("card {id} appears more than once")]
    Duplicate { id: String },
    #[error("card {id} is not owned")]
    NotOwned { id: String },
}

/// 单挑用手牌：恰好五张、不重复、均为已持有的卡。
pub fn validate_hand_deck(deck: &[String], owned: &[SkillCard]) -> Vec<HandDeckIssue> {
    let mut issues = Vec::new();
    if deck.len() != HAND_DECK_SIZE {
        issues.push(HandDeckIssue::Size {
            expected: HAND_DECK_SIZE,
            actual: deck.len(),
        });
    }
    for (index, id) in deck.iter().enumerate() {
        if deck[..index].contains(id) {
            let issue = HandDeckIssue::Duplicate { id: id.clone() };
            if !issues.contains(&issue) {
                issues.push(issue);
            }
        }
        if !owned.iter().any(|card| &card.id == id) {
            issues.push(HandDeckIssue::NotOwned { id: id.clone() });
        }
    }
    issues
}

/// 把 `remove_id` 换成 `add_id`；两张都在手牌里时交换位置。
pub fn swap_hand_card(deck: &[String], remove_id: &str, add_id: &str) -> Vec<String> {
    let mut next = deck.to_vec();
    let Some(remove_index) = deck.iter().position(|id| id == remove_id) else {
        return next;
    };
    if let Some(add_index) = deck.iter().position(|id| id == add_id) {
        next[add_index] = remove_id.to_string();
    }
    next[remove_index] = add_id.to_string();
    next
}

pub fn available_for_deck<'a>(owned: &'a [SkillCard], deck: &[String]) -> Vec<&'a SkillCard> {
    owned.iter().filter(|card| !deck.contains(&card.id)).collect()
}
