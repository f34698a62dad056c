use std::sync::Arc;
use rocket::{State, get, post, put, delete, http::Status, serde::json::{self, Json}};
use tracing::instrument;
use shared::models::*;
use shared::tally::SubmitOutcome;
use crate::{
    accounts::AccountProcessor,
    auth::{AdminUser, AuthUser, PasswordHasher, TokenIssuer},
    config::AppConfig,
    error::ApiError,
    processor::VoteProcessor,
    store::Store,
    utils::{parse_json, parse_user_id},
};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: TokenIssuer,
    pub passwords: PasswordHasher,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &AppConfig) -> Self {
        Self {
            store,
            tokens: TokenIssuer::new(&config.jwt_secret, config.token_ttl),
            passwords: PasswordHasher::new(config.password_iterations),
        }
    }
}

#[rocket::options("/<_..>")]
pub async fn all_options() -> Status {
    Status::Ok
}

#[get("/votes/options")]
pub async fn vote_options(state: &State<AppState>) -> Result<Json<Vec<VoteOption>>, ApiError> {
    VoteProcessor::get_vote_options(&*state.store).await.map(Json)
}

#[instrument(skip(state, user, request), fields(user_id = %user.0.id))]
#[post("/votes", data = "<request>")]
pub async fn submit_vote(
    state: &State<AppState>,
    user: AuthUser,
    request: Result<Json<SubmitVoteRequest>, json::Error<'_>>,
) -> Result<(Status, Json<MessageResponse>), ApiError> {
    let request = parse_json(request)?;
    let outcome = VoteProcessor::submit_vote(&*state.store, user.0.id, request.option.as_deref()).await?;
    let status = match outcome {
        SubmitOutcome::Created => Status::Created,
        SubmitOutcome::Updated => Status::Ok,
    };
    Ok((status, Json(MessageResponse::new(outcome.message()))))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.0.id))]
#[get("/votes/results")]
pub async fn vote_results(state: &State<AppState>, admin: AdminUser) -> Result<Json<VoteResults>, ApiError> {
    VoteProcessor::get_vote_results(&*state.store).await.map(Json)
}

#[get("/votes/me")]
pub async fn my_vote(state: &State<AppState>, user: AuthUser) -> Result<Json<UserVote>, ApiError> {
    VoteProcessor::get_user_vote(&*state.store, user.0.id).await.map(Json)
}

#[instrument(skip_all)]
#[post("/auth/register", data = "<request>")]
pub async fn register(
    state: &State<AppState>,
    request: Result<Json<RegisterRequest>, json::Error<'_>>,
) -> Result<(Status, Json<AuthResponse>), ApiError> {
    let request = parse_json(request)?;
    let response = AccountProcessor::register(&*state.store, &state.passwords, &state.tokens, &request).await?;
    Ok((Status::Created, Json(response)))
}

#[instrument(skip_all)]
#[post("/auth/login", data = "<request>")]
pub async fn login(
    state: &State<AppState>,
    request: Result<Json<LoginRequest>, json::Error<'_>>,
) -> Result<Json<AuthResponse>, ApiError> {
    let request = parse_json(request)?;
    AccountProcessor::login(&*state.store, &state.passwords, &state.tokens, &request).await.map(Json)
}

#[get("/users")]
pub async fn list_users(state: &State<AppState>, _admin: AdminUser) -> Result<Json<Vec<UserProfile>>, ApiError> {
    AccountProcessor::list_users(&*state.store).await.map(Json)
}

#[get("/users/<id>")]
pub async fn get_user(state: &State<AppState>, _admin: AdminUser, id: &str) -> Result<Json<UserProfile>, ApiError> {
    let id = parse_user_id(id)?;
    AccountProcessor::get_user(&*state.store, id).await.map(Json)
}

#[instrument(skip(state, admin, request), fields(admin_id = %admin.0.id))]
#[put("/users/<id>", data = "<request>")]
pub async fn update_user(
    state: &State<AppState>,
    admin: AdminUser,
    id: &str,
    request: Result<Json<UpdateUserRequest>, json::Error<'_>>,
) -> Result<Json<UserProfile>, ApiError> {
    let id = parse_user_id(id)?;
    let request = parse_json(request)?;
    AccountProcessor::update_user(&*state.store, id, &request).await.map(Json)
}

#[instrument(skip(state, admin), fields(admin_id = %admin.0.id))]
#[delete("/users/<id>")]
pub async fn delete_user(state: &State<AppState>, admin: AdminUser, id: &str) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_user_id(id)?;
    AccountProcessor::delete_user(&*state.store, id).await.map(Json)
}
