use rand::Rng;
use rand::seq::SliceRandom;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 一个 Set 由几张牌组成
pub const SET_LEN: usize = 3;
/// 每张牌的属性数量
pub const N_AXES: usize = 4;
/// 整副牌的张数 (3^4)
pub const FULL_DECK_LEN: usize = 81;

// --- 牌的属性 ---

/// 为三值属性生成 序号 <-> 变体 <-> 缩写 的转换。
/// 变体的声明顺序就是它在 base-3 编码中的序号。
macro_rules! attribute {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $abbr:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: [$name; 3] = [$($name::$variant),+];

            /// 在 base-3 编码中的数字 (0..3)
            pub fn ordinal(self) -> u8 {
                self as u8
            }

            pub fn from_ordinal(ordinal: u8) -> Option<Self> {
                Self::ALL.get(ordinal as usize).copied()
            }

            /// 线上格式中使用的单个字符
            pub fn abbr(self) -> char {
                match self {
                    $($name::$variant => $abbr),+
                }
            }

            /// 字母不区分大小写
            pub fn from_abbr(c: char) -> Option<Self> {
                match c.to_ascii_uppercase() {
                    $($abbr => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

attribute!(
    /// 颜色
    Color { Green = 'G', Purple = 'P', Red = 'R' }
);

attribute!(
    /// 填充方式
    Shading { Filled = 'F', Outline = 'O', Stripe = 'S' }
);

attribute!(
    /// 形状
    Shape { Diamond = 'D', Oval = 'O', Squiggle = 'S' }
);

attribute!(
    /// 图形个数
    Count { One = '1', Two = '2', Three = '3' }
);

impl Count {
    pub fn value(self) -> u8 {
        self.ordinal() + 1
    }
}

// --- 牌 ---

/// 单张 Set 牌 (Card)
///
/// 在 JSON 中序列化为 4 个字符的编码：颜色、个数、填充、形状，例如 `"R1FD"`。
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct Card {
    pub color: Color,
    pub count: Count,
    pub shading: Shading,
    pub shape: Shape,
}

/// 候选的或已被认领的三张牌。位置固定，但顺序对判定没有意义。
pub type CardTriple = [Card; SET_LEN];

impl Card {
    pub fn new(color: Color, count: Count, shading: Shading, shape: Shape) -> Card {
        Card { color, count, shading, shape }
    }

    /// 把牌看作一个 4 位的三进制数：`27·shading + 9·shape + 3·color + (count-1)`
    pub fn index(&self) -> u8 {
        27 * self.shading.ordinal() + 9 * self.shape.ordinal() + 3 * self.color.ordinal() + self.count.ordinal()
    }

    /// `index` 的逆运算，超出 0..81 时返回 None
    pub fn from_index(index: u8) -> Option<Card> {
        if index as usize >= FULL_DECK_LEN {
            return None;
        }
        Some(Card {
            shading: Shading::from_ordinal(index / 27)?,
            shape: Shape::from_ordinal(index % 27 / 9)?,
            color: Color::from_ordinal(index % 9 / 3)?,
            count: Count::from_ordinal(index % 3)?,
        })
    }

    /// 按编码顺序列出全部 81 张牌
    pub fn all() -> impl Iterator<Item = Card> {
        (0..FULL_DECK_LEN as u8).filter_map(Card::from_index)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}{}{}", self.color.abbr(), self.count.abbr(), self.shading.abbr(), self.shape.abbr())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid card {input:?}: {reason}")]
pub struct ParseCardError {
    pub input: String,
    pub reason: &'static str,
}

impl FromStr for Card {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| ParseCardError { input: s.to_string(), reason };
        let chars: Vec<char> = s.chars().collect();
        let &[color, count, shading, shape] = chars.as_slice() else {
            return Err(err("card code must have 4 characters"));
        };
        Ok(Card {
            color: Color::from_abbr(color).ok_or_else(|| err("unknown color"))?,
            count: Count::from_abbr(count).ok_or_else(|| err("count must be 1, 2 or 3"))?,
            shading: Shading::from_abbr(shading).ok_or_else(|| err("unknown shading"))?,
            shape: Shape::from_abbr(shape).ok_or_else(|| err("unknown shape"))?,
        })
    }
}

impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// --- Set 判定 ---

/// 三个属性值要么全相同，要么两两不同
fn attr_match<T: PartialEq>(a: T, b: T, c: T) -> bool {
    (a == b && b == c) || (a != b && b != c && a != c)
}

/// 判断三张牌是否组成一个 Set
///
/// 四个属性各自独立地满足"全同或全异"。三张牌中有重复的牌时永远不是 Set：
/// 真实的牌堆里不会出现重复，但客户端请求里可能出现。
pub fn is_set(cards: &CardTriple) -> bool {
    let [a, b, c] = cards;
    if a == b || b == c || a == c {
        return false;
    }
    attr_match(a.color, b.color, c.color)
        && attr_match(a.count, b.count, c.count)
        && attr_match(a.shading, b.shading, c.shading)
        && attr_match(a.shape, b.shape, c.shape)
}

// --- 牌堆 ---

/// 面朝下的牌堆，从末尾 (堆顶) 发牌，罚回的牌也压回末尾。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deck(Vec<Card>);

impl Deck {
    /// 用调用方提供的随机源洗好一副完整的 81 张牌
    pub fn new_shuffled<R: Rng + ?Sized>(rng: &mut R) -> Deck {
        let mut cards: Vec<Card> = Card::all().collect();
        cards.shuffle(rng);
        Deck(cards)
    }

    /// 按给定顺序构造牌堆，最后一张是堆顶
    pub fn from_cards(cards: Vec<Card>) -> Deck {
        Deck(cards)
    }

    /// 取出堆顶的牌
    ///
    /// # Panics
    /// 牌堆为空时 panic。调用方必须先检查长度。
    pub fn pop(&mut self) -> Card {
        self.0.pop().expect("pop from an empty deck")
    }

    /// 把一组牌按顺序压回堆顶
    pub fn push_triple(&mut self, cards: CardTriple) {
        self.0.extend(cards);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.0
    }
}

// --- 单元测试 ---

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;
    use Color::*;
    use Count::*;
    use Shading::*;
    use Shape::*;

    fn card(color: Color, count: Count, shading: Shading, shape: Shape) -> Card {
        Card::new(color, count, shading, shape)
    }

    #[test]
    fn test_index_round_trip() {
        for i in 0..FULL_DECK_LEN as u8 {
            let c = Card::from_index(i).unwrap();
            assert_eq!(c.index(), i);
            assert_eq!(Card::from_index(c.index()), Some(c));
        }
        assert_eq!(Card::from_index(81), None);
        assert_eq!(Card::from_index(255), None);
    }

    #[test]
    fn test_index_layout() {
        assert_eq!(card(Green, One, Filled, Diamond).index(), 0);
        assert_eq!(card(Green, Two, Filled, Diamond).index(), 1);
        assert_eq!(card(Purple, One, Filled, Diamond).index(), 3);
        assert_eq!(card(Green, One, Filled, Oval).index(), 9);
        assert_eq!(card(Green, One, Outline, Diamond).index(), 27);
        assert_eq!(card(Red, Three, Stripe, Squiggle).index(), 80);
    }

    #[test]
    fn test_all_cards_distinct() {
        let all: HashSet<Card> = Card::all().collect();
        assert_eq!(all.len(), FULL_DECK_LEN);
    }

    #[test]
    fn test_card_string() {
        assert_eq!(card(Red, One, Filled, Diamond).to_string(), "R1FD");
        assert_eq!(card(Purple, Three, Stripe, Oval).to_string(), "P3SO");
        assert_eq!(card(Green, Two, Outline, Squiggle).to_string(), "G2OS");
    }

    #[test]
    fn test_card_parse() {
        assert_eq!("R1FD".parse::<Card>().unwrap(), card(Red, One, Filled, Diamond));
        assert_eq!("g2os".parse::<Card>().unwrap(), card(Green, Two, Outline, Squiggle));
        for c in Card::all() {
            assert_eq!(c.to_string().parse::<Card>().unwrap(), c);
        }
    }

    #[test]
    fn test_card_parse_errors() {
        assert!("".parse::<Card>().is_err());
        assert!("R1F".parse::<Card>().is_err());
        assert!("R1FDX".parse::<Card>().is_err());
        assert!("X1FD".parse::<Card>().is_err());
        assert!("R4FD".parse::<Card>().is_err());
        assert!("R0FD".parse::<Card>().is_err());
        assert!("R1XD".parse::<Card>().is_err());
        assert!("R1FX".parse::<Card>().is_err());
        let e = "R1FX".parse::<Card>().unwrap_err();
        assert_eq!(e.input, "R1FX");
        assert_eq!(e.reason, "unknown shape");
    }

    #[test]
    fn test_card_json() {
        let c = card(Red, One, Filled, Diamond);
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"R1FD\"");
        assert_eq!(serde_json::from_str::<Card>("\"R1FD\"").unwrap(), c);
        assert!(serde_json::from_str::<Card>("\"R9FD\"").is_err());
        assert!(serde_json::from_str::<Card>("12").is_err());
    }

    #[test]
    fn test_duplicates_are_not_a_set() {
        let c = card(Red, One, Filled, Diamond);
        assert!(!is_set(&[c, c, c]));
        assert!(!is_set(&[c, c, card(Purple, One, Filled, Diamond)]));
    }

    #[test]
    fn test_not_a_set() {
        // 颜色两同一异
        let cards = [
            card(Red, One, Filled, Diamond),
            card(Red, One, Filled, Squiggle),
            card(Purple, One, Stripe, Squiggle),
        ];
        assert!(!is_set(&cards));
        let cards = [
            card(Red, One, Filled, Diamond),
            card(Red, Two, Filled, Diamond),
            card(Green, Three, Filled, Diamond),
        ];
        assert!(!is_set(&cards));
    }

    #[test]
    fn test_sets() {
        // 填充相同，其余全异
        assert!(is_set(&[
            card(Purple, One, Filled, Diamond),
            card(Red, Two, Filled, Squiggle),
            card(Green, Three, Filled, Oval),
        ]));
        // 形状相同，其余全异
        assert!(is_set(&[
            card(Purple, One, Filled, Squiggle),
            card(Red, Two, Stripe, Squiggle),
            card(Green, Three, Outline, Squiggle),
        ]));
        // 颜色和个数相同
        assert!(is_set(&[
            card(Purple, Two, Filled, Diamond),
            card(Purple, Two, Stripe, Squiggle),
            card(Purple, Two, Outline, Oval),
        ]));
        // 只有个数不同
        assert!(is_set(&[
            card(Red, One, Filled, Oval),
            card(Red, Two, Filled, Oval),
            card(Red, Three, Filled, Oval),
        ]));
        // 全部属性都不同
        assert!(is_set(&[
            card(Green, One, Filled, Diamond),
            card(Purple, Two, Outline, Oval),
            card(Red, Three, Stripe, Squiggle),
        ]));
    }

    #[test]
    fn test_is_set_ignores_order() {
        let a = card(Purple, One, Filled, Diamond);
        let b = card(Red, Two, Filled, Squiggle);
        let c = card(Green, Three, Filled, Oval);
        for t in [[a, b, c], [a, c, b], [b, a, c], [b, c, a], [c, a, b], [c, b, a]] {
            assert!(is_set(&t));
        }
    }

    #[test]
    fn test_any_two_cards_complete_exactly_one_set() {
        let all: Vec<Card> = Card::all().collect();
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                let completions = all.iter().filter(|c| is_set(&[*a, *b, **c])).count();
                assert_eq!(completions, 1, "{a} {b}");
            }
        }
    }

    #[test]
    fn test_shuffled_deck_is_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let deck = Deck::new_shuffled(&mut rng);
        assert_eq!(deck.len(), FULL_DECK_LEN);
        let distinct: HashSet<Card> = deck.cards().iter().copied().collect();
        assert_eq!(distinct.len(), FULL_DECK_LEN);
    }

    #[test]
    fn test_shuffle_is_deterministic_for_seed() {
        let a = Deck::new_shuffled(&mut StdRng::seed_from_u64(42));
        let b = Deck::new_shuffled(&mut StdRng::seed_from_u64(42));
        let c = Deck::new_shuffled(&mut StdRng::seed_from_u64(43));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_deck_pop_and_push() {
        let a = card(Red, One, Filled, Diamond);
        let b = card(Red, Two, Filled, Diamond);
        let c = card(Red, Three, Filled, Diamond);
        let mut deck = Deck::from_cards(vec![a]);
        deck.push_triple([a, b, c]);
        assert_eq!(deck.len(), 4);
        assert_eq!(deck.pop(), c);
        assert_eq!(deck.pop(), b);
        assert_eq!(deck.pop(), a);
        assert_eq!(deck.pop(), a);
        assert!(deck.is_empty());
    }

    #[test]
    #[should_panic(expected = "empty deck")]
    fn test_pop_empty_deck_panics() {
        Deck::default().pop();
    }
}
