//! Set 游戏的 REST 接口
//!
//! - GET    /health            健康检查
//! - GET    /sets              列出所有游戏
//! - POST   /sets              创建游戏
//! - GET    /sets/{id}         获取游戏快照
//! - DELETE /sets/{id}         删除游戏
//! - POST   /sets/{id}/claim   认领一个 Set
//! - POST   /sets/{id}/expand  扩展桌面
//! - POST   /sets/{id}/next    进入下一轮
//! - POST   /sets/{id}/hint    找一个 Set (必要时扩展桌面)

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use dashmap::DashMap;
use parking_lot::Mutex as P_Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use boredgames_core::{
    ClaimOutcome, ClaimRequest, ClaimResponse, ExpandResponse, Game, GameError, GameId, GameSnapshot,
    HintResponse, NewGameRequest,
};

use crate::config::ServerConfig;
use crate::store::{GameStore, StoreError};

/// 服务器全局状态
pub struct AppState {
    pub config: ServerConfig,
    pub store: Box<dyn GameStore>,
    // 每局游戏一把锁，串行化同一局上的 读取 -> 操作 -> 写回
    locks: DashMap<GameId, Arc<P_Mutex<()>>>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: ServerConfig, store: Box<dyn GameStore>) -> Self {
        Self { config, store, locks: DashMap::new() }
    }

    /// 取这局游戏的锁。只为存储里确实存在的游戏建锁，未知 id 不会留下条目。
    fn lock_for(&self, id: GameId) -> Result<Arc<P_Mutex<()>>, ApiError> {
        if let Some(lock) = self.locks.get(&id) {
            return Ok(lock.clone());
        }
        self.store.get(id)?;
        Ok(self.locks.entry(id).or_default().clone())
    }

    /// 游戏已不存在时丢掉它的锁
    fn forget_lock(&self, id: GameId, lock: &Arc<P_Mutex<()>>) {
        self.locks.remove_if(&id, |_, held| Arc::ptr_eq(held, lock));
    }

    /// 在这局游戏的锁内读出游戏、执行操作并写回。操作出错时不写回。
    fn with_game<T>(
        &self,
        id: GameId,
        op: impl FnOnce(&mut Game) -> Result<T, ApiError>,
    ) -> Result<(T, Game), ApiError> {
        let lock = self.lock_for(id)?;
        let _guard = lock.lock();
        let mut game = match self.store.get(id) {
            Ok(game) => game,
            Err(err) => {
                // 拿锁期间游戏被删除了
                if matches!(err, StoreError::NotFound { .. }) {
                    self.forget_lock(id, &lock);
                }
                return Err(err.into());
            }
        };
        let out = op(&mut game)?;
        self.store.update(&game)?;
        Ok((out, game))
    }
}

pub fn create_app(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sets", get(list_games).post(create_game))
        .route("/sets/{id}", get(get_game).delete(delete_game))
        .route("/sets/{id}/claim", post(claim_set))
        .route("/sets/{id}/expand", post(expand))
        .route("/sets/{id}/next", post(next_round))
        .route("/sets/{id}/hint", post(hint))
        .with_state(state)
}

// --- 错误处理 ---

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid request body: {}", .0.body_text())]
    Body(#[from] JsonRejection),
}

/// 和 `Json` 一样解析请求体，但解析失败时也返回 JSON 格式的错误
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Game(GameError::InvalidArg { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Game(GameError::InvalidState { .. }) => StatusCode::CONFLICT,
            ApiError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::AlreadyExists { .. }) => StatusCode::CONFLICT,
            ApiError::Store(StoreError::Internal { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Body(rejection) => rejection.status(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("请求失败: {}", self);
        } else {
            debug!("请求被拒绝: {}", self);
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// 无法解析的 id 与不存在的 id 一样按 NotFound 处理
fn parse_id(raw: &str) -> Result<GameId, ApiError> {
    raw.parse()
        .map_err(|_| StoreError::NotFound { key: raw.to_string() }.into())
}

// --- 请求处理 ---

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn list_games(State(state): State<SharedState>) -> Result<Json<Vec<GameSnapshot>>, ApiError> {
    let games = state.store.list()?;
    Ok(Json(games.iter().map(GameSnapshot::from).collect()))
}

async fn create_game(
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<NewGameRequest>,
) -> Result<(StatusCode, Json<GameSnapshot>), ApiError> {
    let mut rng = state.config.game_rng();
    let game = Game::new(req.usernames, &mut rng)?;
    state.store.insert(&game)?;
    info!("创建了新游戏 {}，玩家: {:?}", game.id, game.players.keys().collect::<Vec<_>>());
    Ok((StatusCode::CREATED, Json(GameSnapshot::from(&game))))
}

async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<GameSnapshot>, ApiError> {
    let game = state.store.get(parse_id(&id)?)?;
    Ok(Json(GameSnapshot::from(&game)))
}

async fn delete_game(State(state): State<SharedState>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    let lock = state.lock_for(id)?;
    {
        let _guard = lock.lock();
        state.store.delete(id)?;
    }
    state.forget_lock(id, &lock);
    info!("游戏 {} 已被删除", id);
    Ok(StatusCode::NO_CONTENT)
}

async fn claim_set(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ClaimRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let id = parse_id(&id)?;
    let cards = req.parse_cards().map_err(|value| GameError::invalid_arg("card", value))?;

    let (outcome, game) = state.with_game(id, |game| {
        if let Some(version) = req.version {
            if version != game.version {
                return Err(GameError::invalid_state(
                    "ClaimSet",
                    format!("stale version {}, current version is {}", version, game.version),
                )
                .into());
            }
        }
        Ok(game.claim_set(&req.username, cards)?)
    })?;

    match &outcome {
        ClaimOutcome::Accepted => info!("游戏 {}: {} 认领了 {:?}", id, req.username, req.cards),
        ClaimOutcome::Penalized { reason, returned } => info!(
            "游戏 {}: {} 的认领无效 ({:?})，退回 {:?}",
            id, req.username, reason, returned
        ),
    }
    Ok(Json(ClaimResponse { outcome, game: GameSnapshot::from(&game) }))
}

async fn expand(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ExpandResponse>, ApiError> {
    let (expanded, game) = state.with_game(parse_id(&id)?, |game| Ok(game.expand()?))?;
    debug!("游戏 {}: 扩展桌面 {}", game.id, expanded);
    Ok(Json(ExpandResponse { expanded, game: GameSnapshot::from(&game) }))
}

async fn next_round(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<GameSnapshot>, ApiError> {
    let ((), game) = state.with_game(parse_id(&id)?, |game| Ok(game.next_round()?))?;
    Ok(Json(GameSnapshot::from(&game)))
}

/// 找 Set 可能会扩展桌面，扩展后的状态同样需要写回
async fn hint(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<HintResponse>, ApiError> {
    let (set, game) = state.with_game(parse_id(&id)?, |game| Ok(game.find_expand_set()))?;
    if set.is_none() {
        info!("游戏 {} 已没有可找的 Set", game.id);
    }
    Ok(Json(HintResponse { set, game: GameSnapshot::from(&game) }))
}
