use super::cookie::REFRESH_COOKIE_NAME;
use super::gate::with_verification;
use super::handler;
use crate::server::Server;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let signup = warp::path!("auth" / "signup")
        .and(warp::post())
        .and(json_body())
        .and(with(server.session_service.clone()))
        .and_then(handler::signup);

    let signin = warp::path!("auth" / "signin")
        .and(warp::post())
        .and(json_body())
        .and(with(server.session_service.clone()))
        .and(with(server.cookie_policy.clone()))
        .and_then(handler::signin);

    let refresh = warp::path!("auth" / "token" / "refresh")
        .and(warp::post())
        .and(warp::cookie::optional::<String>(REFRESH_COOKIE_NAME))
        .and(with(server.session_service.clone()))
        .and(with(server.cookie_policy.clone()))
        .and_then(handler::refresh_token);

    let signout = warp::path!("auth" / "token" / "signout")
        .and(warp::post())
        .and(warp::cookie::optional::<String>(REFRESH_COOKIE_NAME))
        .and(with(server.session_service.clone()))
        .and(with(server.cookie_policy.clone()))
        .and_then(handler::signout);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_verification(server.access_gate.clone()))
        .and(with(server.account_service.clone()))
        .and_then(handler::me);

    signup.or(signin).or(refresh).or(signout).or(me)
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}
