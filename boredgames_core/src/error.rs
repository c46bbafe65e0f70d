use thiserror::Error;

/// 引擎返回给调用方的错误。两种都可以由调用方修正，不应自动重试。
///
/// 认领了不是 Set 的牌、或者认领的牌已不在桌面上，都不是错误：
/// 那是会被罚牌的正常结果，调用方仍然需要保存变化后的游戏。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// 参数不合法，例如不存在的用户名
    #[error("invalid value: {value} for arg: {arg}")]
    InvalidArg { arg: String, value: String },

    /// 在错误的状态下调用了方法
    #[error("invalid method: {method} detail: {details}")]
    InvalidState { method: String, details: String },
}

impl GameError {
    pub fn invalid_arg(arg: impl Into<String>, value: impl Into<String>) -> Self {
        GameError::InvalidArg { arg: arg.into(), value: value.into() }
    }

    pub fn invalid_state(method: impl Into<String>, details: impl Into<String>) -> Self {
        GameError::InvalidState { method: method.into(), details: details.into() }
    }
}
