//! Planet resource handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::AppState;
use planetdex_common::{
    errors::{AppError, Result},
    planets::{Pagination, Planet},
    service::PlanetResponse,
};

/// Query parameters accepted on `/planets` and `/planets/search`
#[derive(Debug, Default, Deserialize)]
pub struct PlanetQuery {
    pub id: Option<String>,
    pub name: Option<String>,
    pub limit: Option<String>,
    pub skip: Option<String>,
}

impl PlanetQuery {
    fn id(&self) -> Option<&str> {
        non_empty(&self.id)
    }

    fn name(&self) -> Option<&str> {
        non_empty(&self.name)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// JSON object body, with extractor rejections reported as 400s
type JsonBody = std::result::Result<Json<Map<String, Value>>, JsonRejection>;

fn read_body(payload: JsonBody) -> Result<Map<String, Value>> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::InvalidFormat {
            message: rejection.body_text(),
        })
}

/// Create a planet
#[instrument(skip(state, payload))]
pub async fn create_planet(
    State(state): State<AppState>,
    payload: JsonBody,
) -> Result<(StatusCode, Json<PlanetResponse>)> {
    let body = read_body(payload)?;
    let created = state.planets.create(&body).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Fetch one planet by `name` or `id`, or list a page of planets
#[instrument(skip(state))]
pub async fn get_planets(
    State(state): State<AppState>,
    Query(query): Query<PlanetQuery>,
) -> Result<Response> {
    if let Some(name) = query.name() {
        let planet = state.planets.find_by_name(name).await?;
        return Ok(Json(planet).into_response());
    }

    if let Some(id) = query.id() {
        let planet = state.planets.get(id).await?;
        return Ok(Json(planet).into_response());
    }

    let page = Pagination::from_query(query.limit.as_deref(), query.skip.as_deref())?;
    let planets = state.planets.list(page).await?;
    Ok(Json(planets).into_response())
}

/// Substring search by name, or exact lookup by id
#[instrument(skip(state))]
pub async fn search_planets(
    State(state): State<AppState>,
    Query(query): Query<PlanetQuery>,
) -> Result<Response> {
    if let Some(name) = query.name() {
        let planets = state.planets.search_by_name(name).await?;
        return Ok(Json(planets).into_response());
    }

    if let Some(id) = query.id() {
        let planet = state.planets.get(id).await?;
        return Ok(Json(planet).into_response());
    }

    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Get a planet by path id
#[instrument(skip(state))]
pub async fn get_planet(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Planet>> {
    Ok(Json(state.planets.get(&id).await?))
}

/// Apply a partial update restricted to name, climate and terrain
#[instrument(skip(state, payload))]
pub async fn update_planet(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: JsonBody,
) -> Result<Json<PlanetResponse>> {
    let body = read_body(payload)?;
    Ok(Json(state.planets.update(&id, &body).await?))
}

/// Delete a planet, returning the removed record
#[instrument(skip(state))]
pub async fn delete_planet(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Planet>> {
    Ok(Json(state.planets.delete(&id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_router, AppState};
    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Method, Request},
        Router,
    };
    use planetdex_common::{
        config::AppConfig,
        enrichment::{AppearanceLookup, StaticLookup},
        MemoryStore, PlanetService,
    };
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    const FIXTURES: [(&str, &str, &str); 6] = [
        ("Tatooine", "dry", "desert"),
        ("Naboo", "humid", "lush"),
        ("Mustafar", "hot", "volcanic"),
        ("Alderaan", "mild", "mountain"),
        ("Geonosis", "arid", "rocky"),
        ("Polys Massa", "artificial temperate", "asteroid"),
    ];

    struct TestApp {
        router: Router,
        seeded: Vec<Planet>,
    }

    struct TestResponse {
        status: StatusCode,
        content_type: Option<String>,
        bytes: Vec<u8>,
    }

    impl TestResponse {
        fn json(&self) -> Value {
            serde_json::from_slice(&self.bytes).unwrap()
        }
    }

    async fn test_app_with(lookup: Arc<dyn AppearanceLookup>) -> TestApp {
        // Fixtures always resolve against the healthy lookup
        let store = Arc::new(MemoryStore::new());
        let seeder = PlanetService::new(store.clone(), Arc::new(StaticLookup::canonical()));
        let mut seeded = Vec::new();
        for (name, climate, terrain) in FIXTURES {
            let body = json!({ "name": name, "climate": climate, "terrain": terrain });
            let created = seeder.create(body.as_object().unwrap()).await.unwrap();
            seeded.push(created.planet);
        }

        let state = AppState {
            config: Arc::new(AppConfig::default()),
            planets: PlanetService::new(store, lookup),
        };
        TestApp {
            router: create_router(state),
            seeded,
        }
    }

    async fn test_app() -> TestApp {
        test_app_with(Arc::new(StaticLookup::canonical())).await
    }

    async fn send(app: &TestApp, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = app.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();

        TestResponse {
            status,
            content_type,
            bytes,
        }
    }

    async fn planets_in_store(app: &TestApp) -> Vec<Value> {
        let res = send(app, Method::GET, "/planets?limit=0", None).await;
        res.json().as_array().cloned().unwrap()
    }

    fn id_of(app: &TestApp, name: &str) -> String {
        app.seeded
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.id.to_string())
            .unwrap()
    }

    fn missing_id() -> String {
        uuid::Uuid::now_v7().to_string()
    }

    // ------------------------------------------------------------------
    // Initial data
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_planets_are_json_and_match_fixture_length() {
        let app = test_app().await;
        let res = send(&app, Method::GET, "/planets?limit=0", None).await;

        assert_eq!(res.status, StatusCode::OK);
        assert!(res.content_type.as_deref().unwrap().starts_with("application/json"));
        assert_eq!(res.json().as_array().unwrap().len(), FIXTURES.len());
    }

    #[tokio::test]
    async fn test_every_planet_has_appearances() {
        let app = test_app().await;
        let res = send(&app, Method::GET, "/planets", None).await;

        for planet in res.json().as_array().unwrap() {
            assert!(planet["appearances"].is_i64());
            assert!(planet["id"].is_string());
            assert!(planet.get("name_key").is_none());
        }
    }

    // ------------------------------------------------------------------
    // POST
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_computes_appearances() {
        let app = test_app().await;
        let res = send(
            &app,
            Method::POST,
            "/planets",
            Some(json!({ "name": "Coruscant", "climate": "artificial temperate", "terrain": "urban" })),
        )
        .await;

        assert_eq!(res.status, StatusCode::CREATED);
        assert!(res.content_type.as_deref().unwrap().starts_with("application/json"));
        let body = res.json();
        assert_eq!(body["name"], "Coruscant");
        assert_eq!(body["appearances"], 4);
        assert!(body.get("enrichment").is_none());

        let planets = planets_in_store(&app).await;
        assert_eq!(planets.len(), FIXTURES.len() + 1);
        assert!(planets.iter().any(|p| p["name"] == "Coruscant"));
    }

    #[tokio::test]
    async fn test_create_duplicate_name_is_rejected_in_any_case() {
        let app = test_app().await;

        for name in ["Naboo", "naboo", "NABOO "] {
            let res = send(
                &app,
                Method::POST,
                "/planets",
                Some(json!({ "name": name, "climate": "humid", "terrain": "lush" })),
            )
            .await;

            assert_eq!(res.status, StatusCode::BAD_REQUEST);
            let body = res.json();
            assert_eq!(body["name"], "ValidationError");
            assert_eq!(body["errors"]["name"]["kind"], "unique");
        }

        assert_eq!(planets_in_store(&app).await.len(), FIXTURES.len());
    }

    #[tokio::test]
    async fn test_create_with_missing_property_is_rejected() {
        let app = test_app().await;
        let res = send(
            &app,
            Method::POST,
            "/planets",
            Some(json!({ "name": "Jakku", "climate": "", "terrain": "desert" })),
        )
        .await;

        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.json()["errors"]["climate"]["kind"], "required");
        assert_eq!(planets_in_store(&app).await.len(), FIXTURES.len());
    }

    #[tokio::test]
    async fn test_create_with_malformed_json_is_bad_request() {
        let app = test_app().await;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/planets")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{\"name\": "))
            .unwrap();

        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let res = send(&app, Method::POST, "/planets", Some(json!(["Jakku"]))).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_survives_enrichment_outage() {
        let app = test_app_with(Arc::new(StaticLookup::unavailable())).await;
        let res = send(
            &app,
            Method::POST,
            "/planets",
            Some(json!({ "name": "Coruscant", "climate": "temperate", "terrain": "urban" })),
        )
        .await;

        assert_eq!(res.status, StatusCode::CREATED);
        let body = res.json();
        assert_eq!(body["appearances"], 0);
        assert_eq!(body["enrichment"], "unavailable");
    }

    // ------------------------------------------------------------------
    // GET
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_returns_the_first_three_planets() {
        let app = test_app().await;
        let all = planets_in_store(&app).await;
        let res = send(&app, Method::GET, "/planets?limit=3", None).await;

        assert_eq!(res.status, StatusCode::OK);
        let page = res.json();
        let page = page.as_array().unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0]["name"], all[0]["name"]);
        assert_eq!(page[2]["name"], all[2]["name"]);
        assert_eq!(page[0]["name"], "Tatooine");
    }

    #[tokio::test]
    async fn test_returns_the_final_three_planets() {
        let app = test_app().await;
        let all = planets_in_store(&app).await;
        let res = send(&app, Method::GET, "/planets?limit=3&skip=3", None).await;

        assert_eq!(res.status, StatusCode::OK);
        let page = res.json();
        let page = page.as_array().unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0]["name"], all[3]["name"]);
        assert_eq!(page[2]["name"], all[5]["name"]);
        assert_eq!(page[2]["name"], "Polys Massa");
    }

    #[tokio::test]
    async fn test_default_page_and_bad_numbers() {
        let app = test_app().await;

        let res = send(&app, Method::GET, "/planets?skip=4", None).await;
        assert_eq!(res.json().as_array().unwrap().len(), 2);

        let res = send(&app, Method::GET, "/planets?limit=abc", None).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.json()["error"]["code"], "INVALID_FORMAT");
    }

    #[tokio::test]
    async fn test_page_counts_beyond_signed_range_are_bad_request() {
        let app = test_app().await;

        for uri in [
            "/planets?limit=9223372036854775808",
            "/planets?skip=9223372036854775808",
        ] {
            let res = send(&app, Method::GET, uri, None).await;
            assert_eq!(res.status, StatusCode::BAD_REQUEST);
            assert_eq!(res.json()["error"]["code"], "INVALID_FORMAT");
        }

        let res = send(&app, Method::GET, "/planets?skip=9223372036854775807", None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.json().as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_planet_by_query_id() {
        let app = test_app().await;
        let uri = format!("/planets?id={}", id_of(&app, "Mustafar"));
        let res = send(&app, Method::GET, &uri, None).await;

        assert_eq!(res.status, StatusCode::OK);
        assert!(res.content_type.as_deref().unwrap().starts_with("application/json"));
        let body = res.json();
        assert_eq!(body["name"], "Mustafar");
        assert_eq!(body["appearances"], 1);
    }

    #[tokio::test]
    async fn test_unknown_or_malformed_query_id_is_not_found() {
        let app = test_app().await;

        for id in [missing_id(), "5a422b3a5b54f676274d17f9".to_string()] {
            let res = send(&app, Method::GET, &format!("/planets?id={}", id), None).await;
            assert_eq!(res.status, StatusCode::NOT_FOUND);
            assert!(res.bytes.is_empty());
        }
    }

    #[tokio::test]
    async fn test_single_planet_by_query_name() {
        let app = test_app().await;

        let res = send(&app, Method::GET, "/planets?name=Alderaan", None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.json()["name"], "Alderaan");
        assert_eq!(res.json()["appearances"], 2);

        let res = send(&app, Method::GET, "/planets?name=alderaan", None).await;
        assert_eq!(res.json()["name"], "Alderaan");

        let res = send(&app, Method::GET, "/planets?name=Exagol", None).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert!(res.bytes.is_empty());
    }

    #[tokio::test]
    async fn test_planet_by_path_id() {
        let app = test_app().await;

        let uri = format!("/planets/{}", id_of(&app, "Tatooine"));
        let res = send(&app, Method::GET, &uri, None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.json()["appearances"], 5);

        let res = send(&app, Method::GET, &format!("/planets/{}", missing_id()), None).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);

        let res = send(&app, Method::GET, "/planets/not-an-id", None).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_search_by_name_substring() {
        let app = test_app().await;

        let res = send(&app, Method::GET, "/planets/search?name=MASSA", None).await;
        assert_eq!(res.status, StatusCode::OK);
        let hits = res.json();
        assert_eq!(hits.as_array().unwrap().len(), 1);
        assert_eq!(hits[0]["name"], "Polys Massa");

        let res = send(&app, Method::GET, "/planets/search?name=oo", None).await;
        assert_eq!(res.json().as_array().unwrap().len(), 2);

        let res = send(&app, Method::GET, "/planets/search?name=Exegol", None).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_fragment_whitespace_is_matched_literally() {
        let app = test_app().await;

        let res = send(&app, Method::GET, "/planets/search?name=%20", None).await;
        assert_eq!(res.status, StatusCode::OK);
        let hits = res.json();
        assert_eq!(hits.as_array().unwrap().len(), 1);
        assert_eq!(hits[0]["name"], "Polys Massa");

        let res = send(&app, Method::GET, "/planets/search?name=naboo%20", None).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_by_id_and_without_params() {
        let app = test_app().await;

        let uri = format!("/planets/search?id={}", id_of(&app, "Naboo"));
        let res = send(&app, Method::GET, &uri, None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.json()["name"], "Naboo");

        let res = send(&app, Method::GET, "/planets/search?id=bogus", None).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);

        let res = send(&app, Method::GET, "/planets/search", None).await;
        assert_eq!(res.status, StatusCode::NO_CONTENT);
        assert!(res.bytes.is_empty());
    }

    // ------------------------------------------------------------------
    // PATCH
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_misspelled_planet_has_zero_appearances() {
        let app = test_app().await;
        let uri = format!("/planets?id={}", id_of(&app, "Polys Massa"));
        let res = send(&app, Method::GET, &uri, None).await;

        assert_eq!(res.json()["name"], "Polys Massa");
        assert_eq!(res.json()["appearances"], 0);
    }

    #[tokio::test]
    async fn test_rename_recomputes_appearances() {
        let app = test_app().await;
        let uri = format!("/planets/{}", id_of(&app, "Polys Massa"));
        let res = send(&app, Method::PATCH, &uri, Some(json!({ "name": "Polis Massa" }))).await;

        assert_eq!(res.status, StatusCode::OK);
        assert!(res.content_type.as_deref().unwrap().starts_with("application/json"));
        assert_eq!(res.json()["name"], "Polis Massa");
        assert_eq!(res.json()["appearances"], 1);
    }

    #[tokio::test]
    async fn test_climate_change_keeps_appearances() {
        let app = test_app().await;
        let uri = format!("/planets/{}", id_of(&app, "Tatooine"));
        let res = send(&app, Method::PATCH, &uri, Some(json!({ "climate": "scorching" }))).await;

        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.json()["climate"], "scorching");
        assert_eq!(res.json()["appearances"], 5);
    }

    #[tokio::test]
    async fn test_invalid_update_is_rejected_and_nothing_changes() {
        let app = test_app().await;

        let res = send(
            &app,
            Method::PATCH,
            &format!("/planets/{}", missing_id()),
            Some(json!({ "population": 1000000 })),
        )
        .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.json(), json!({ "error": "Invalid updates" }));

        let uri = format!("/planets/{}", id_of(&app, "Polys Massa"));
        let res = send(
            &app,
            Method::PATCH,
            &uri,
            Some(json!({ "name": "Polis Massa", "population": 1000000 })),
        )
        .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);

        let res = send(&app, Method::GET, &uri, None).await;
        assert_eq!(res.json()["name"], "Polys Massa");
        assert!(res.json().get("population").is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_or_malformed_id_is_not_found() {
        let app = test_app().await;

        for id in [missing_id(), "5a422b3a5b54f676274d17f9".to_string()] {
            let res = send(
                &app,
                Method::PATCH,
                &format!("/planets/{}", id),
                Some(json!({ "name": "Mandalore" })),
            )
            .await;
            assert_eq!(res.status, StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn test_update_to_existing_name_is_rejected() {
        let app = test_app().await;
        let uri = format!("/planets/{}", id_of(&app, "Polys Massa"));

        let res = send(&app, Method::PATCH, &uri, Some(json!({ "name": "Naboo" }))).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.json()["errors"]["name"]["kind"], "unique");

        let res = send(&app, Method::GET, &uri, None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.json()["name"], "Polys Massa");
    }

    // ------------------------------------------------------------------
    // DELETE
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_delete_returns_the_planet() {
        let app = test_app().await;
        let id = id_of(&app, "Geonosis");
        let res = send(&app, Method::DELETE, &format!("/planets/{}", id), None).await;

        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.json()["name"], "Geonosis");

        let res = send(&app, Method::GET, &format!("/planets?id={}", id), None).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(planets_in_store(&app).await.len(), FIXTURES.len() - 1);
    }

    #[tokio::test]
    async fn test_delete_unknown_planet_is_not_found() {
        let app = test_app().await;

        for id in [missing_id(), "5a422b3a5b54f676274d17f9".to_string()] {
            let res = send(&app, Method::DELETE, &format!("/planets/{}", id), None).await;
            assert_eq!(res.status, StatusCode::NOT_FOUND);
        }
        assert_eq!(planets_in_store(&app).await.len(), FIXTURES.len());
    }

    #[tokio::test]
    async fn test_delete_twice_is_not_found() {
        let app = test_app().await;
        let uri = format!("/planets/{}", id_of(&app, "Alderaan"));

        let res = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(res.status, StatusCode::OK);
        let res = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);

        assert_eq!(planets_in_store(&app).await.len(), FIXTURES.len() - 1);
    }

    // ------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_health_and_ready() {
        let app = test_app().await;

        let res = send(&app, Method::GET, "/health", None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.json()["status"], "healthy");

        let res = send(&app, Method::GET, "/ready", None).await;
        assert_eq!(res.json()["status"], "ready");
        assert_eq!(res.json()["checks"]["database"]["status"], "up");
        assert!(res.json()["checks"]["database"]["latency_ms"].is_u64());
        assert_eq!(res.json()["checks"]["enrichment"]["provider"], "swapi");
    }
}
