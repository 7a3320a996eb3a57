use super::{experiment, health};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Health and experiment routes.
pub fn system_router<S>() -> OpenApiRouter<S>
where
    S: Send + Sync + Clone + 'static,
{
    health::mark_start();

    OpenApiRouter::<S>::new()
        .routes(routes!(health::health_handler))
        .routes(routes!(experiment::variant_handler))
}
