use chrono::Utc;
use email_address::EmailAddress;
use lambda_http::{Body, Response};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::keys;
use crate::records::{Record, UserAuthRecord, UserProfileRecord};
use crate::response;
use crate::table::StoreError;
use crate::types::{CreateUserRequest, LoginRequest, LoginResponse, Principal, UserProfile};
use crate::AppState;

/// Parse a JSON request body.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::InvalidBody(e.to_string()))
}

/// Register a new user: credential and profile items are written in one
/// transaction, each conditional on its key being free, so a taken email
/// fails atomically with 409 and nothing is partially written.
pub async fn register(state: &AppState, body: &[u8]) -> Result<Response<Body>, ApiError> {
    let table = state.table()?;
    let req: CreateUserRequest = parse_body(body)?;

    if !EmailAddress::is_valid(&req.email) {
        return Err(ApiError::InvalidEmail);
    }

    tracing::info!("Registering user: {}", req.email);

    let password_hash = state.hasher.hash(&req.password)?;
    let profile = UserProfileRecord::from_request(&req, Utc::now());
    let credential = UserAuthRecord::from_request(&req, password_hash);

    let items = vec![
        Record::UserAuth(credential).to_item(),
        Record::UserProfile(profile.clone()).to_item(),
    ];

    match table.put_all_new(items).await {
        Ok(()) => {}
        Err(StoreError::AlreadyExists { .. }) => return Err(ApiError::EmailTaken),
        Err(e) => return Err(e.into()),
    }

    tracing::info!("User registered: {}", profile.email);
    response::created(&UserProfile::from(&profile))
}

/// Exchange email and password for an access token.
///
/// Unknown email and wrong password produce the same 401 and the same
/// amount of hashing work.
pub async fn login(state: &AppState, body: &[u8]) -> Result<Response<Body>, ApiError> {
    let table = state.table()?;
    let tokens = state.tokens()?;
    let req: LoginRequest = parse_body(body)?;

    tracing::info!("Login attempt: {}", req.email);

    // Credential and profile share the user's partition; one query brings
    // back both.
    let mut credential = None;
    let mut profile = None;
    for item in table.query_partition(&keys::user_pk(&req.email)).await? {
        match Record::from_item(&item)? {
            Record::UserAuth(r) => credential = Some(r),
            Record::UserProfile(r) => profile = Some(r),
            Record::Post(r) => {
                tracing::warn!("Post {} stored under a user partition", r.post_id);
            }
        }
    }

    let stored_hash = credential.as_ref().map(|c| c.password_hash.as_str());
    if !state.hasher.verify(&req.password, stored_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let principal = Principal {
        email: req.email,
        full_name: profile.map(|p| p.full_name()).unwrap_or_default(),
    };
    let access_token = tokens.issue(&principal)?;

    tracing::info!("Login succeeded: {}", principal.email);
    response::ok(&LoginResponse { access_token })
}
