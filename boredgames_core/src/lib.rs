//! # Set 纸牌游戏核心逻辑库
//!
//! 这个 `core` crate 包含了 Set 游戏的牌面模型、牌堆与桌面、
//! 认领/扩展/下一轮的状态机，以及客户端-服务器之间的请求和响应结构。
//! 它不做任何 I/O、不加锁、不持久化：调用方负责串行化对同一局游戏的操作，
//! 并在每次操作之后保存游戏快照。洗牌用的随机源由调用方传入。

mod card;
mod error;
mod logic;
mod message;
mod state;

pub use card::*;

pub use error::*;

pub use logic::*;

pub use message::*;

pub use state::*;
