use super::cookie::CookiePolicy;
use super::error::*;
use crate::application_port::*;
use crate::domain_model::{AccountId, NewAccount, PhoneNumber};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::http::header::SET_COOKIE;
use warp::reject;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub token: String,
    pub expires_in_secs: i64,
    /// Unix seconds.
    pub exp: i64,
}

impl AccessTokenResponse {
    fn new(token: AccessToken, expires_at: DateTime<Utc>) -> Self {
        AccessTokenResponse {
            token: token.0,
            expires_in_secs: (expires_at - Utc::now()).num_seconds().max(0),
            exp: expires_at.timestamp(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupAccount {
    pub username: String,
    pub fullname: String,
    pub email: String,
    pub phone_number: Option<PhoneNumber>,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub account: SignupAccount,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub username: String,
}

pub async fn signup(
    body: SignupRequest,
    session_service: Arc<dyn SessionService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let input = SignupInput {
        account: NewAccount {
            username: body.account.username,
            fullname: body.account.fullname,
            email: body.account.email,
            phone_number: body.account.phone_number,
        },
        password: body.password,
    };
    let username = session_service
        .signup(input)
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&SignupResponse { username }),
        StatusCode::CREATED,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninRequest {
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub is_remember_me: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninResponse {
    pub access_token: AccessTokenResponse,
    pub username: String,
}

pub async fn signin(
    body: SigninRequest,
    session_service: Arc<dyn SessionService>,
    cookie_policy: Arc<CookiePolicy>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let input = SigninInput {
        username: body.username,
        password: body.password,
        remember_me: body.is_remember_me,
    };
    let result = session_service
        .signin(input)
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    let tokens = result.tokens;
    let cookie = cookie_policy.refresh_cookie(&tokens.refresh_token.0, tokens.refresh_token_ttl);
    let response = SigninResponse {
        access_token: AccessTokenResponse::new(tokens.access_token, tokens.access_token_expires_at),
        username: result.username,
    };
    Ok(warp::reply::with_header(
        warp::reply::json(&response),
        SET_COOKIE,
        cookie,
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: AccessTokenResponse,
}

pub async fn refresh_token(
    refresh_cookie: Option<String>,
    session_service: Arc<dyn SessionService>,
    cookie_policy: Arc<CookiePolicy>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let tokens = session_service
        .refresh(refresh_cookie.as_deref())
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    let cookie = cookie_policy.refresh_cookie(&tokens.refresh_token.0, tokens.refresh_token_ttl);
    let response = RefreshResponse {
        access_token: AccessTokenResponse::new(tokens.access_token, tokens.access_token_expires_at),
    };
    Ok(warp::reply::with_header(
        warp::reply::json(&response),
        SET_COOKIE,
        cookie,
    ))
}

pub async fn signout(
    refresh_cookie: Option<String>,
    session_service: Arc<dyn SessionService>,
    cookie_policy: Arc<CookiePolicy>,
) -> Result<impl warp::Reply, warp::Rejection> {
    session_service
        .signout(refresh_cookie.as_deref())
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::with_header(
        warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT),
        SET_COOKIE,
        cookie_policy.cleared_refresh_cookie(),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub username: String,
    pub fullname: String,
    pub email: String,
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub account: AccountResponse,
}

pub async fn me(
    account_id: AccountId,
    account_service: Arc<dyn AccountService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let account = account_service
        .get_account(account_id)
        .await
        .map_err(ApiError::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&MeResponse {
        account: AccountResponse {
            username: account.username,
            fullname: account.fullname,
            email: account.email,
            phone_number: account.phone_number,
        },
    }))
}
