pub mod v1;

use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use uuid::Uuid;
use warp::Filter;

/// The full HTTP surface: `/api/v1/...`, rejection recovery and a request span.
pub fn filters(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    warp::path("api")
        .and(warp::path("v1"))
        .and(v1::routes(server))
        .recover(v1::recover_error)
        .with(warp::trace(|info| {
            tracing::info_span!(
                "request",
                id = %Uuid::new_v4(),
                method = %info.method(),
                path = info.path(),
            )
        }))
}
