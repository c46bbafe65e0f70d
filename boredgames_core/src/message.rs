use crate::card::{Card, CardTriple, SET_LEN};
use crate::logic::ClaimOutcome;
use crate::state::{Game, GameId, GameState, Player, Slot};
use serde::{Deserialize, Serialize};

// --- 客户端 -> 服务器 的请求 ---

/// 创建新游戏
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewGameRequest {
    pub usernames: Vec<String>,
}

/// 认领一个 Set
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClaimRequest {
    pub username: String,
    /// 线上格式的牌编码，例如 "R1FD"。在服务端解析，方便把错误报告成 InvalidArg。
    pub cards: Vec<String>,
    /// 客户端看到的游戏版本。给出时，版本不一致的认领会被拒绝而不是罚牌。
    #[serde(default)]
    pub version: Option<u64>,
}

impl ClaimRequest {
    pub fn new(username: impl Into<String>, cards: &CardTriple) -> Self {
        ClaimRequest {
            username: username.into(),
            cards: cards.iter().map(Card::to_string).collect(),
            version: None,
        }
    }

    /// 解析三张牌。第一个出错的编码作为 Err 返回。
    pub fn parse_cards(&self) -> Result<CardTriple, String> {
        if self.cards.len() != SET_LEN {
            return Err(self.cards.join(" "));
        }
        let mut triple = Vec::with_capacity(SET_LEN);
        for code in &self.cards {
            triple.push(code.parse::<Card>().map_err(|e| e.input)?);
        }
        triple.try_into().map_err(|_| self.cards.join(" "))
    }
}

// --- 服务器 -> 客户端 的响应 ---

/// 游戏快照。玩家按用户名排序，保证输出稳定。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub id: GameId,
    pub players: Vec<Player>,
    pub deck: Vec<Card>,
    pub board: Vec<Slot>,
    pub claimed_set: Option<CardTriple>,
    pub claimed_username: String,
    pub state: GameState,
    pub version: u64,
}

impl From<&Game> for GameSnapshot {
    fn from(game: &Game) -> Self {
        GameSnapshot {
            id: game.id,
            // BTreeMap 的 values() 已经按键排好序
            players: game.players.values().cloned().collect(),
            deck: game.deck.cards().to_vec(),
            board: game.board.slots().to_vec(),
            claimed_set: game.claimed_set,
            claimed_username: game.claimed_username.clone(),
            state: game.state(),
            version: game.version,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClaimResponse {
    #[serde(flatten)]
    pub outcome: ClaimOutcome,
    pub game: GameSnapshot,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExpandResponse {
    /// 牌堆不足 3 张时为 false
    pub expanded: bool,
    pub game: GameSnapshot,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HintResponse {
    /// 没有 Set 且牌堆已空时为 None
    pub set: Option<CardTriple>,
    pub game: GameSnapshot,
}
