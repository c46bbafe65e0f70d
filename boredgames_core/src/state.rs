use crate::card::{Card, CardTriple, Deck, SET_LEN, is_set};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub type GameId = Uuid;

/// 开局时桌面上的牌位数
pub const INIT_BOARD_LEN: usize = 12;

/// 桌面上的一个牌位：有牌，或者空着
pub type Slot = Option<Card>;

/// 桌面 (Board)
///
/// 一局之内牌位不会被删除，只会被置空，这样认领时引用的下标不会移动。
/// 只有 `compress` 会去掉空位。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board(Vec<Slot>);

impl Board {
    pub fn from_slots(slots: Vec<Slot>) -> Board {
        Board(slots)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.0
    }

    /// 桌面上实际存在的牌，按牌位顺序
    pub fn cards(&self) -> impl Iterator<Item = Card> + '_ {
        self.0.iter().flatten().copied()
    }

    pub fn push(&mut self, card: Card) {
        self.0.push(Some(card));
    }

    /// 按 (i<j<k) 的字典序枚举非空牌位组成的三元组，
    /// 返回第一个 `is_set(..) == want_set` 的组合
    pub fn find_triple(&self, want_set: bool) -> Option<CardTriple> {
        let occupied: Vec<Card> = self.cards().collect();
        let n = occupied.len();
        for i in 0..n {
            for j in i + 1..n {
                for k in j + 1..n {
                    let triple = [occupied[i], occupied[j], occupied[k]];
                    if is_set(&triple) == want_set {
                        return Some(triple);
                    }
                }
            }
        }
        None
    }

    /// 第一个放着这张牌的牌位下标
    pub fn find_card_index(&self, card: &Card) -> Option<usize> {
        self.0.iter().position(|slot| slot.as_ref() == Some(card))
    }

    /// 找出三张牌各自所在的牌位；任何一张不在桌面上时返回 None
    pub(crate) fn locate_triple(&self, cards: &CardTriple) -> Option<[usize; SET_LEN]> {
        let mut indices = [0; SET_LEN];
        for (idx, card) in indices.iter_mut().zip(cards) {
            *idx = self.find_card_index(card)?;
        }
        Some(indices)
    }

    pub(crate) fn clear(&mut self, index: usize) {
        self.0[index] = None;
    }

    /// 去掉所有空牌位，桌面随之缩短
    pub fn compress(&mut self) {
        self.0.retain(Option::is_some);
    }

    /// 按牌位顺序用牌堆里的牌补齐空位，牌堆空了就停下。返回补了几张。
    pub(crate) fn replenish(&mut self, deck: &mut Deck) -> usize {
        let mut dealt = 0;
        for slot in self.0.iter_mut().filter(|s| s.is_none()) {
            if deck.is_empty() {
                break;
            }
            *slot = Some(deck.pop());
            dealt += 1;
        }
        dealt
    }
}

/// 玩家 (Player)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub username: String,
    /// 认领过的 Set，按时间顺序。罚牌时从末尾撤回。
    pub sets: Vec<CardTriple>,
}

impl Player {
    pub fn new(username: impl Into<String>) -> Player {
        Player { username: username.into(), sets: Vec::new() }
    }

    pub fn score(&self) -> usize {
        self.sets.len()
    }

    pub(crate) fn record_set(&mut self, cards: CardTriple) {
        self.sets.push(cards);
    }

    /// 撤回最近一次认领的 Set
    pub(crate) fn undo_last(&mut self) -> Option<CardTriple> {
        self.sets.pop()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    /// 还没有人认领本轮的 Set
    Playing,
    /// 本轮已被认领，等待进入下一轮
    SetClaimed,
}

/// 一局 Set 游戏
///
/// 状态不单独存储：`claimed_username` 为空即 Playing，否则为 SetClaimed。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    /// 以用户名为键，BTreeMap 保证遍历和序列化顺序稳定
    pub players: BTreeMap<String, Player>,
    pub deck: Deck,
    pub board: Board,
    pub claimed_set: Option<CardTriple>,
    pub claimed_username: String,
    /// 每次改变游戏的操作都会加一，供存储层做乐观并发检查
    #[serde(default)]
    pub version: u64,
}

impl Game {
    pub fn state(&self) -> GameState {
        if self.claimed_username.is_empty() {
            GameState::Playing
        } else {
            GameState::SetClaimed
        }
    }

    /// 桌面、牌堆和所有玩家手里的 Set 中的每一张牌
    pub fn all_cards(&self) -> impl Iterator<Item = Card> + '_ {
        self.board
            .cards()
            .chain(self.deck.cards().iter().copied())
            .chain(self.players.values().flat_map(|p| p.sets.iter().flatten().copied()))
    }
}
