//! 卡牌战的 CPU 对手名册。

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::policy::Difficulty;
use crate::game::state::DeckConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Opponent {
    pub id: String,
    pub name: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub description: String,
    pub deck: DeckConfig,
}

fn opponent(
    id: &str,
    name: &str,
    difficulty: Difficulty,
    description: &str,
    units: [&str; 3],
    modifiers: [&str; 5],
) -> Opponent {
    Opponent {
        id: id.into(),
        name: name.into(),
        difficulty,
        description: description.into(),
        deck: DeckConfig {
            units: units.iter().map(|id| id.to_string()).collect(),
            modifiers: modifiers.iter().map(|id| id.to_string()).collect(),
        },
    }
}

static ROSTER: Lazy<Vec<Opponent>> = Lazy::new(|| {
    use Difficulty::*;
    vec![
        opponent(
            "opp_1",
            "見習い文法士",
            Beginner,
            "基本の四段活用を使う初心者。",
            ["v_kaku", "v_yomu", "v_yuku"],
            ["zu", "ki", "keri", "mu", "ru"],
        ),
        opponent(
            "opp_2",
            "古文道場の門番",
            Beginner,
            "連用形接続を好む守りの使い手。",
            ["v_tatsu", "v_kiku", "v_ari"],
            ["ki", "keri", "tsu", "nu", "tari_kanryou"],
        ),
        opponent(
            "opp_3",
            "放浪の歌人",
            Intermediate,
            "推量・意志の助動詞を自在に操る。",
            ["v_uku", "v_omofu", "v_miru"],
            ["mu", "beshi", "ramu", "raru", "sasu"],
        ),
        opponent(
            "opp_4",
            "闇の文法師",
            Intermediate,
            "打消・打消推量で相手を封じる。",
            ["v_otsu", "v_sutsu", "v_shinu"],
            ["zu", "ji", "maji", "mahoshi", "tashi"],
        ),
        opponent(
            "opp_5",
            "宮中の言語官",
            Expert,
            "断定・伝聞・特殊接続を使いこなす。",
            ["v_su", "v_ku", "v_saku"],
            ["nari_dantei", "tari_dantei", "nari_denbun", "ri", "gotoshi"],
        ),
        opponent(
            "opp_6",
            "言霊の帝",
            Expert,
            "全活用型を操る最強の相手。",
            ["v_ifu", "v_miru", "v_ari"],
            ["muzu", "maji", "tari_dantei", "gotoshi", "ri"],
        ),
    ]
});

pub fn roster() -> &'static [Opponent] {
    &ROSTER
}

pub fn find_opponent(id: &str) -> Option<&'static Opponent> {
    ROSTER.iter().find(|opponent| opponent.id == id)
}
