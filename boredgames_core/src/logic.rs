use crate::card::*;
use crate::error::GameError;
use crate::state::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// 一次认领的结果。被罚牌也是正常结果，不是错误。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ClaimOutcome {
    /// 认领成功，本轮结束
    Accepted,
    /// 认领无效，`returned` 是被退回牌堆的那组 Set (玩家之前没有 Set 时为 None)
    #[serde(rename_all = "camelCase")]
    Penalized { reason: PenaltyReason, returned: Option<CardTriple> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PenaltyReason {
    /// 三张牌不组成 Set
    NotASet,
    /// 至少有一张牌已不在桌面上 (被别人先认领了，或者根本没发出来)
    NotOnBoard,
}

// --- 核心游戏流程函数 ---

impl Game {
    /// 开始一局新游戏
    ///
    /// - 用户名不能为空，也不能重复。
    /// - 用调用方给的随机源洗牌，然后从牌堆顶发 12 张到桌面。
    pub fn new<I, S, R>(usernames: I, rng: &mut R) -> Result<Game, GameError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        R: Rng + ?Sized,
    {
        Game::with_deck(usernames, Deck::new_shuffled(rng))
    }

    /// 用一副已经排好顺序的牌开局
    ///
    /// # Panics
    /// 牌堆少于 12 张时 panic。
    pub(crate) fn with_deck<I, S>(usernames: I, mut deck: Deck) -> Result<Game, GameError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut players = BTreeMap::new();
        for username in usernames {
            let username: String = username.into();
            if username.is_empty() {
                return Err(GameError::invalid_arg("username", "empty"));
            }
            if players.contains_key(&username) {
                return Err(GameError::invalid_arg("username", format!("{} already present", username)));
            }
            players.insert(username.clone(), Player::new(username));
        }

        let mut board = Board::default();
        for _ in 0..INIT_BOARD_LEN {
            board.push(deck.pop());
        }

        Ok(Game {
            id: Uuid::new_v4(),
            players,
            deck,
            board,
            claimed_set: None,
            claimed_username: String::new(),
            version: 0,
        })
    }

    /// 处理玩家对一组牌的认领
    ///
    /// 1. 本轮已经被认领时返回 `InvalidState`。
    /// 2. 用户名不存在时返回 `InvalidArg`。
    /// 3. 不是 Set，或者有牌不在桌面上：罚牌，返回 `Ok(Penalized)`。
    /// 4. 否则清空这三个牌位，记入玩家的 Set，进入 SetClaimed。
    ///
    /// 没有逻辑时钟：如果一次认领在读到的时候有效、落地时桌面已被别人改过，
    /// 它会被当作无效认领罚牌。需要区分的调用方可以比较 `version`。
    pub fn claim_set(&mut self, username: &str, cards: CardTriple) -> Result<ClaimOutcome, GameError> {
        if self.state() != GameState::Playing {
            return Err(GameError::invalid_state(
                "ClaimSet",
                format!("round already claimed by {}", self.claimed_username),
            ));
        }
        if !self.players.contains_key(username) {
            return Err(GameError::invalid_arg("username", username));
        }

        if !is_set(&cards) {
            return Ok(self.penalty(username, PenaltyReason::NotASet));
        }
        let Some(indices) = self.board.locate_triple(&cards) else {
            return Ok(self.penalty(username, PenaltyReason::NotOnBoard));
        };

        for idx in indices {
            self.board.clear(idx);
        }
        if let Some(player) = self.players.get_mut(username) {
            player.record_set(cards);
        }
        self.claimed_username = username.to_string();
        self.claimed_set = Some(cards);
        self.version += 1;
        Ok(ClaimOutcome::Accepted)
    }

    /// 没人能找到 Set 时，再往桌面加一列 (3 张)。只在 Playing 状态下有效。
    ///
    /// 牌堆不足 3 张时什么也不发，返回 `Ok(false)`。
    pub fn expand(&mut self) -> Result<bool, GameError> {
        if self.state() != GameState::Playing {
            return Err(GameError::invalid_state(
                "Expand",
                format!("round already claimed by {}", self.claimed_username),
            ));
        }
        Ok(self.expand_board())
    }

    /// 从 SetClaimed 进入下一轮
    ///
    /// - 本轮扩展过桌面 (牌位多于 12)：去掉空位，不补牌。
    /// - 否则按牌位顺序从牌堆补齐空位。
    ///
    /// 之后如果牌堆已空，再去掉剩下的空位。
    pub fn next_round(&mut self) -> Result<(), GameError> {
        if self.state() != GameState::SetClaimed {
            return Err(GameError::invalid_state("NextRound", "round not yet claimed"));
        }

        if self.board.len() > INIT_BOARD_LEN {
            self.board.compress();
        } else {
            self.board.replenish(&mut self.deck);
        }
        if self.deck.is_empty() {
            self.board.compress();
        }

        self.claimed_username.clear();
        self.claimed_set = None;
        self.version += 1;
        Ok(())
    }

    /// 在桌面上找一个 Set，找不到就不断扩展桌面，直到牌堆耗尽。
    ///
    /// 返回 None 说明牌堆已空且桌面上没有 Set，游戏结束。
    pub fn find_expand_set(&mut self) -> Option<CardTriple> {
        loop {
            if let Some(cards) = self.board.find_triple(true) {
                return Some(cards);
            }
            if !self.expand_board() {
                return None;
            }
        }
    }

    /// 牌堆和桌面都不会再产生 Set 时游戏结束
    pub fn is_over(&self) -> bool {
        self.deck.is_empty() && self.board.find_triple(true).is_none()
    }

    // --- 辅助逻辑函数 ---

    fn expand_board(&mut self) -> bool {
        if self.deck.len() < SET_LEN {
            return false;
        }
        for _ in 0..SET_LEN {
            let card = self.deck.pop();
            self.board.push(card);
        }
        self.version += 1;
        true
    }

    /// 罚牌：把玩家最近认领的 Set 压回牌堆。玩家还没有 Set 时什么也不做。
    fn penalty(&mut self, username: &str, reason: PenaltyReason) -> ClaimOutcome {
        let returned = self.players.get_mut(username).and_then(Player::undo_last);
        if let Some(cards) = returned {
            self.deck.push_triple(cards);
            self.version += 1;
        }
        ClaimOutcome::Penalized { reason, returned }
    }
}

// --- 单元测试 ---
