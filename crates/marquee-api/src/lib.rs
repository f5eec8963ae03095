// SPDX-License-Identifier: GPL-3.0-or-later
pub mod error;
pub mod handlers;
pub mod middleware;

use anyhow::Result;
use axum::{middleware as axum_middleware, routing::get, Router};
use handlers::{
    collections, commands, events, exclusions, index, movies, providers, rename, studios, system,
    tags,
};
use marquee_application::{AppState, ProviderKind};
use middleware::auth::{auth_middleware, ApiKey};
use middleware::metrics::{metrics_handler, track_requests, Metrics};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        system::health,
        system::list_backups,
        system::create_backup,
        system::delete_backup,
        events::events,
        collections::list_collections,
        collections::get_collection,
        collections::update_collection,
        collections::update_collections,
        movies::list_movies,
        movies::query_movies,
        movies::lookup_movies,
        movies::add_movie,
        movies::edit_movies,
        movies::delete_movies,
        movies::get_movie,
        movies::update_movie,
        movies::delete_movie,
        exclusions::list_exclusions,
        exclusions::create_exclusion,
        exclusions::delete_exclusion,
        index::get_preferences,
        index::set_sort,
        index::set_filter,
        index::set_view,
        index::set_mode,
        index::set_table_options,
        index::set_poster_options,
        index::set_overview_options,
        index::list_filters,
        index::save_custom_filter,
        index::delete_custom_filter,
        index::filter_builder,
        index::get_filter_options,
        studios::list_studios,
        studios::get_studio,
        studios::update_studio,
        rename::get_rename_previews,
        providers::list_providers,
        providers::get_schema,
        providers::get_provider,
        providers::create_provider,
        providers::update_provider,
        providers::delete_provider,
        providers::test_provider,
        providers::test_all_providers,
        providers::bulk_update_providers,
        providers::bulk_delete_providers,
        commands::list_commands,
        commands::push_command,
        commands::get_command,
        commands::cancel_command,
        tags::list_tags,
        tags::create_tag,
    ),
    components(schemas(system::HealthResponse, error::ErrorResponse, error::FailureResponse)),
    tags(
        (name = "system", description = "Health, backups and the event stream"),
        (name = "collections", description = "Movie collections"),
        (name = "movies", description = "Library movies and scenes"),
        (name = "exclusions", description = "Movies list imports must skip"),
        (name = "index", description = "Index page preferences and filters"),
        (name = "studios", description = "Studios"),
        (name = "rename", description = "Rename previews"),
        (name = "providers", description = "Indexers, metadata consumers, import lists and download clients"),
        (name = "commands", description = "Command queue"),
        (name = "tags", description = "Tags")
    ),
    info(
        title = "Marquee API",
        version = "0.1.0",
        description = "Movie and scene library manager",
    )
)]
pub struct ApiDoc;

pub fn router(state: AppState) -> Result<Router> {
    info!(target: "api", "building router");

    let metrics = Metrics::new()?;
    let api_key = ApiKey::new(state.config.auth.api_key.as_deref());
    if api_key.0.is_none() {
        info!(target: "api", "no api key configured, api is open");
    }

    let mut api_v1 = Router::new()
        .nest("/collections", collections::routes())
        .nest("/movies", movies::routes())
        .nest("/exclusions", exclusions::routes())
        .nest("/index", index::routes())
        .nest("/studios", studios::routes())
        .nest("/rename", rename::routes())
        .nest("/command", commands::routes())
        .nest("/system/backup", system::backup_routes())
        .nest("/tag", tags::routes())
        .route("/events", get(events::events));
    for kind in ProviderKind::ALL {
        api_v1 = api_v1.nest(&format!("/{kind}"), providers::routes(kind));
    }
    let api_v1 = api_v1.layer(axum_middleware::from_fn_with_state(api_key, auth_middleware));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(Router::new()
        .route("/health", get(system::health))
        .route("/metrics", get(metrics_handler).with_state(metrics.clone()))
        .nest("/api/v1", api_v1)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(axum_middleware::from_fn_with_state(metrics, track_requests))
        .layer(cors)
        .with_state(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use marquee_config::AppConfig;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn test_router(api_key: Option<&str>) -> (Router, TempDir) {
        test_router_with(|config| config.auth.api_key = api_key.map(str::to_string)).await
    }

    async fn test_router_with(configure: impl FnOnce(&mut AppConfig)) -> (Router, TempDir) {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut config = AppConfig::default();
        config.backup.folder = dir.path().join("Backups");
        // File-backed so `VACUUM INTO` backups have a real database to copy.
        config.database.url = format!("sqlite://{}", dir.path().join("marquee.db").display());
        configure(&mut config);
        let pool = marquee_infrastructure::init_database(&config)
            .await
            .expect("temp database");
        let state = AppState::new(config, pool, reqwest::Client::new());
        (router(state).expect("router"), dir)
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = router
            .clone()
            .oneshot(request.body(body).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_is_open_even_with_an_api_key() {
        let (router, _dir) = test_router(Some("secret")).await;
        let (status, body) = send(&router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn api_key_accepted_from_header_or_query() {
        let (router, _dir) = test_router(Some("secret")).await;

        let (status, body) = send(&router, Method::GET, "/api/v1/tag", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "api key required");

        let (status, _) = send(&router, Method::GET, "/api/v1/tag?apikey=wrong", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&router, Method::GET, "/api/v1/tag?apikey=secret", None).await;
        assert_eq!(status, StatusCode::OK);

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/tag")
                    .header("X-Api-Key", "secret")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn tags_are_created_once_per_label() {
        let (router, _dir) = test_router(None).await;
        let (status, first) = send(&router, Method::POST, "/api/v1/tag", Some(json!({"label": "Favorites"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["label"], "favorites");

        let (_, second) = send(&router, Method::POST, "/api/v1/tag", Some(json!({"label": "favorites "}))).await;
        assert_eq!(first["id"], second["id"]);

        let (_, list) = send(&router, Method::GET, "/api/v1/tag", None).await;
        assert_eq!(list.as_array().map(Vec::len), Some(1));

        let (status, _) = send(&router, Method::POST, "/api/v1/tag", Some(json!({"label": " "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn provider_routes_exist_for_every_kind() {
        let (router, _dir) = test_router(None).await;
        for kind in ProviderKind::ALL {
            let (status, body) = send(&router, Method::GET, &format!("/api/v1/{kind}"), None).await;
            assert_eq!(status, StatusCode::OK, "{kind}");
            assert_eq!(body, json!([]));

            let (status, schema) = send(&router, Method::GET, &format!("/api/v1/{kind}/schema"), None).await;
            assert_eq!(status, StatusCode::OK);
            assert!(!schema.as_array().expect("templates").is_empty(), "{kind}");
        }
    }

    #[tokio::test]
    async fn invalid_indexer_reports_field_failures() {
        let (router, _dir) = test_router(None).await;
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/v1/indexer",
            Some(json!({
                "kind": "indexer",
                "name": "Broken",
                "implementation": "Newznab",
                "settings": {"baseUrl": "not a url"}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let fields: Vec<_> = body["failures"]
            .as_array()
            .expect("failures")
            .iter()
            .map(|f| f["field"].as_str().unwrap_or_default().to_string())
            .collect();
        assert!(fields.contains(&"baseUrl".to_string()));
    }

    #[tokio::test]
    async fn provider_crud_and_bulk_delete() {
        let (router, _dir) = test_router(None).await;
        let definition = json!({
            "kind": "metadata",
            "name": "Kodi",
            "implementation": "Kodi",
            "settings": {}
        });
        let (status, created) = send(&router, Method::POST, "/api/v1/metadata", Some(definition)).await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        let id = created["id"].as_str().expect("id").to_string();

        let (status, fetched) = send(&router, Method::GET, &format!("/api/v1/metadata/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Kodi");

        let (status, _) = send(&router, Method::GET, &format!("/api/v1/indexer/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, updated) = send(&router, Method::PUT, "/api/v1/metadata/bulk", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated, json!([]));

        let (status, _) = send(&router, Method::DELETE, "/api/v1/metadata/bulk", Some(json!({"ids": [id]}))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, list) = send(&router, Method::GET, "/api/v1/metadata", None).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn commands_queue_and_cancel() {
        let (router, _dir) = test_router(None).await;
        let (status, queued) = send(&router, Method::POST, "/api/v1/command", Some(json!({"name": "Housekeeping"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(queued["name"], "Housekeeping");
        assert_eq!(queued["status"], "queued");
        let id = queued["id"].as_str().expect("id").to_string();

        let (_, again) = send(&router, Method::POST, "/api/v1/command", Some(json!({"name": "Housekeeping"}))).await;
        assert_eq!(again["id"], queued["id"]);

        let (status, cancelled) = send(&router, Method::DELETE, &format!("/api/v1/command/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cancelled["status"], "cancelled");

        let (status, _) = send(&router, Method::DELETE, &format!("/api/v1/command/{id}"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&router, Method::GET, "/api/v1/command/not-an-id", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn index_preferences_round_trip_through_the_api() {
        let (router, _dir) = test_router(None).await;
        let (status, defaults) = send(&router, Method::GET, "/api/v1/index/sceneIndex", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(defaults["sortKey"], "sortTitle");
        assert_eq!(defaults["view"], "posters");

        let (status, sorted) = send(
            &router,
            Method::PUT,
            "/api/v1/index/sceneIndex/sort",
            Some(json!({"sortKey": "sortTitle"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sorted["sortDirection"], "descending");

        let (_, stored) = send(&router, Method::GET, "/api/v1/index/sceneIndex", None).await;
        assert_eq!(stored["sortDirection"], "descending");

        let (status, _) = send(&router, Method::GET, "/api/v1/index/nowhere", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &router,
            Method::PUT,
            "/api/v1/index/sceneIndex/filter",
            Some(json!({"selectedFilterKey": "no-such-filter"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_library_listings() {
        let (router, _dir) = test_router(None).await;
        let (status, movies) = send(&router, Method::GET, "/api/v1/movies?section=movieIndex", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(movies["total"], 0);

        let (status, collections) = send(&router, Method::GET, "/api/v1/collections", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(collections, json!([]));

        let missing = marquee_domain::CollectionId::new();
        let (status, _) = send(&router, Method::GET, &format!("/api/v1/collections/{missing}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&router, Method::GET, "/api/v1/rename", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn movies_are_looked_up_added_edited_and_excluded() {
        let server = wiremock::MockServer::start().await;
        let heat = json!({"TmdbId": 949, "Title": "Heat", "Year": 1995, "Status": "Released"});
        wiremock::Mock::given(wiremock::matchers::path("/movie/949"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(&heat))
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::path("/search"))
            .and(wiremock::matchers::query_param("q", "heat"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(json!([heat])))
            .mount(&server)
            .await;
        let (router, _dir) = test_router_with(|config| config.metadata.base_url = server.uri()).await;

        let (status, hits) = send(&router, Method::GET, "/api/v1/movies/lookup?term=heat", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(hits[0]["folder"], "Heat (1995)");
        assert_eq!(hits[0]["isExistingMovie"], false);

        let request = json!({"tmdbId": 949, "rootFolderPath": "/movies"});
        let (status, movie) = send(&router, Method::POST, "/api/v1/movies", Some(request.clone())).await;
        assert_eq!(status, StatusCode::CREATED, "{movie}");
        assert_eq!(movie["path"], "/movies/Heat (1995)");
        let id = movie["id"].as_str().expect("id").to_string();

        let (status, _) = send(&router, Method::POST, "/api/v1/movies", Some(request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, hits) = send(&router, Method::GET, "/api/v1/movies/lookup?term=heat", None).await;
        assert_eq!(hits[0]["isExistingMovie"], true);
        assert_eq!(hits[0]["existingMovieId"], id.as_str());

        let (status, edited) = send(
            &router,
            Method::PUT,
            "/api/v1/movies/editor",
            Some(json!({"movieIds": [id], "monitored": false})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(edited[0]["monitored"], false);

        let (status, _) = send(
            &router,
            Method::DELETE,
            "/api/v1/movies/editor",
            Some(json!({"movieIds": [id], "addImportExclusion": true})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, hits) = send(&router, Method::GET, "/api/v1/movies/lookup?term=heat", None).await;
        assert_eq!(hits[0]["isExistingMovie"], false);
        assert_eq!(hits[0]["isExclusionMovie"], true);

        let (_, exclusions) = send(&router, Method::GET, "/api/v1/exclusions", None).await;
        assert_eq!(exclusions[0]["tmdb_id"], 949);
        let exclusion = exclusions[0]["id"].as_str().expect("id").to_string();
        let (status, _) = send(&router, Method::DELETE, &format!("/api/v1/exclusions/{exclusion}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&router, Method::DELETE, &format!("/api/v1/exclusions/{exclusion}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn manual_backups_are_listed_and_deleted() {
        let (router, _dir) = test_router(None).await;
        let (status, backup) = send(&router, Method::POST, "/api/v1/system/backup", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let name = backup["name"].as_str().expect("name").to_string();

        let (_, list) = send(&router, Method::GET, "/api/v1/system/backup", None).await;
        assert_eq!(list.as_array().map(Vec::len), Some(1));

        let (status, _) = send(&router, Method::DELETE, &format!("/api/v1/system/backup/{name}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&router, Method::DELETE, "/api/v1/system/backup/..", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn metrics_count_requests_by_route() {
        let (router, _dir) = test_router(None).await;
        send(&router, Method::GET, "/health", None).await;
        let response = router
            .clone()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("marquee_http_requests_total"));
        assert!(text.contains("route=\"/health\""));
    }
}
