//! 服务器配置，从环境变量读取，缺省值见 `ServerConfig::default`。
//!
//! - `BOREDGAMES_HOST` 监听地址，默认 `0.0.0.0`
//! - `BOREDGAMES_PORT` 端口，默认 `8080`
//! - `BOREDGAMES_SEED` 可选的洗牌种子。设置后每局新游戏的牌序都相同，便于复现。

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::str::FromStr;
use tracing::warn;

const HOST_VAR: &str = "BOREDGAMES_HOST";
const PORT_VAR: &str = "BOREDGAMES_PORT";
const SEED_VAR: &str = "BOREDGAMES_SEED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            seed: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 用给定的查找函数代替环境变量，方便测试
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup(HOST_VAR).filter(|h| !h.trim().is_empty()).unwrap_or(defaults.host),
            port: parse_var(PORT_VAR, lookup(PORT_VAR)).unwrap_or(defaults.port),
            seed: parse_var(SEED_VAR, lookup(SEED_VAR)),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 为一局新游戏准备随机源。每局一个独立的生成器，不同游戏之间不争用。
    pub fn game_rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }
}

/// 变量不存在时返回 None；无法解析时记录警告并返回 None
fn parse_var<T: FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("环境变量 {}={:?} 无法解析，使用缺省值", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg, ServerConfig::default());
        assert_eq!(cfg.addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[(HOST_VAR, "127.0.0.1"), (PORT_VAR, " 9000 "), (SEED_VAR, "42")]);
        assert_eq!(cfg.addr(), "127.0.0.1:9000");
        assert_eq!(cfg.seed, Some(42));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let cfg = config(&[(HOST_VAR, ""), (PORT_VAR, "http"), (SEED_VAR, "-1")]);
        assert_eq!(cfg, ServerConfig::default());
    }

    #[test]
    fn test_seeded_rng_repeats() {
        use rand::Rng;
        let cfg = config(&[(SEED_VAR, "7")]);
        let a: u64 = cfg.game_rng().random();
        let b: u64 = cfg.game_rng().random();
        assert_eq!(a, b);
    }
}
