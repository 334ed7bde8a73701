use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use saut_backend::{
    AppState,
    config::Config,
    middleware::{RateLimiter, auth_middleware, log_errors, optional_auth_middleware, rate_limit},
    routes,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'saut_backend';").await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let redis_arc = Arc::new(redis_client.clone());

    let state = AppState {
        pool,
        config: config.clone(),
        redis: redis_arc,
    };

    let rate_limiter = Arc::new(RateLimiter::new(redis_client, config.clone()));

    let public_routes = Router::new()
        .route("/health", get(routes::health::ping))
        .route("/users/register", post(routes::user::register))
        .route("/users/login", post(routes::user::login))
        .route("/donations/public", get(routes::donation::list_public_donations))
        .route("/donations/stats", get(routes::donation::donation_stats));

    // Paths shared between anonymous and authenticated callers: a valid
    // token attaches the caller's identity, everything else goes through
    // anonymously. Handlers that need an identity enforce it themselves.
    let optional_auth_routes = Router::new()
        .route("/donations", post(routes::donation::initiate_donation))
        .route("/donations", get(routes::donation::list_donations))
        .route("/feedback", post(routes::feedback::create_feedback))
        .route("/feedback", get(routes::feedback::list_feedback))
        .route("/campaigns", get(routes::donation::list_campaigns))
        .route("/campaigns", post(routes::donation::create_campaign))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            optional_auth_middleware,
        ));

    let protected_routes = Router::new()
        // Users
        .route("/users/me", get(routes::user::me))
        .route("/users", get(routes::user::list_users))
        .route("/users/{user_id}", get(routes::user::get_user))
        .route("/users/{user_id}", put(routes::user::update_user))
        // Recitations
        .route("/recitations", post(routes::recitation::create_recitation))
        .route("/recitations", get(routes::recitation::list_recitations))
        .route("/recitations/pending", get(routes::recitation::list_pending))
        .route("/recitations/{recitation_id}", get(routes::recitation::get_recitation))
        .route("/recitations/{recitation_id}", put(routes::recitation::update_recitation))
        // Comments
        .route("/comments", post(routes::comment::create_comment))
        .route("/comments/recitation/{recitation_id}", get(routes::comment::list_comments))
        .route("/comments/mine", get(routes::comment::my_comments))
        .route("/comments/{comment_id}", put(routes::comment::update_comment))
        .route("/comments/{comment_id}", delete(routes::comment::delete_comment))
        // Markers
        .route("/markers", post(routes::marker::create_marker))
        .route("/markers/recitation/{recitation_id}", get(routes::marker::list_markers))
        .route("/markers/{marker_id}", put(routes::marker::update_marker))
        .route("/markers/{marker_id}", delete(routes::marker::delete_marker))
        // Loop regions
        .route("/loop-regions", post(routes::loop_region::create_loop_region))
        .route(
            "/loop-regions/recitation/{recitation_id}",
            get(routes::loop_region::list_loop_regions),
        )
        .route("/loop-regions/{region_id}", put(routes::loop_region::update_loop_region))
        .route("/loop-regions/{region_id}", delete(routes::loop_region::delete_loop_region))
        // Communities
        .route("/communities", post(routes::community::create_community))
        .route("/communities", get(routes::community::list_communities))
        .route("/communities/mine", get(routes::community::my_communities))
        .route("/communities/{community_id}", get(routes::community::get_community))
        .route("/communities/{community_id}", put(routes::community::update_community))
        .route("/communities/{community_id}/join", post(routes::community::join_community))
        .route("/communities/{community_id}/leave", delete(routes::community::leave_community))
        .route("/communities/{community_id}/stats", get(routes::community::community_stats))
        // Donations and campaigns
        .route("/donations/{donation_id}", put(routes::donation::update_donation))
        .route("/campaigns/{campaign_id}", put(routes::donation::update_campaign))
        // Feedback
        .route("/feedback/stats/summary", get(routes::feedback::feedback_stats))
        .route("/feedback/{feedback_id}", get(routes::feedback::get_feedback))
        .route("/feedback/{feedback_id}", put(routes::feedback::update_feedback))
        .route("/feedback/{feedback_id}", delete(routes::feedback::delete_feedback))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let router = Router::new().nest(
        &config.api_base_uri.clone(),
        Router::new()
            .merge(public_routes)
            .merge(optional_auth_routes)
            .merge(protected_routes),
    );

    let router = router.layer(axum::middleware::from_fn(log_errors)).layer(
        axum::middleware::from_fn_with_state(rate_limiter, rate_limit),
    );

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(CorsLayer::permissive())
    };

    let app = router.with_state(state.clone());

    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
