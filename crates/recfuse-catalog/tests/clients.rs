//! Integration tests for the catalog clients using wiremock HTTP mocks.

use recfuse_catalog::{
    AvailabilityClient, AvailabilityLookup, CandidateQuery, CatalogError, CatalogHttpConfig,
    CatalogSource, PrimaryCatalogClient, SecondaryCatalogClient, TitleResolver,
};
use recfuse_core::{ContentKind, Source};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_config(base_url: &str, max_retries: u32) -> CatalogHttpConfig {
    CatalogHttpConfig {
        base_url: base_url.to_owned(),
        timeout_secs: 5,
        max_retries,
    }
}

fn drama_query(limit: usize) -> CandidateQuery {
    CandidateQuery {
        genres: vec!["Drama".to_owned()],
        kind: ContentKind::Movie,
        limit,
        ..CandidateQuery::default()
    }
}

#[tokio::test]
async fn primary_discover_normalizes_and_truncates() {
    let server = MockServer::start().await;
    let body = serde_json::json!({
        "results": [
            { "id": 550, "title": "Fight Club", "release_date": "1999-10-15",
              "vote_average": 8.4, "popularity": 61.4,
              "genres": [{ "name": "Drama" }],
              "production_companies": [{ "name": "Fox 2000 Pictures" }] },
            { "id": 551, "title": "", "vote_average": 5.0 },
            { "id": 680, "title": "Pulp Fiction", "release_date": "1994-09-10",
              "vote_average": 8.5, "genres": [{ "name": "Crime" }] },
            { "id": 13, "title": "Forrest Gump", "release_date": "1994-06-23",
              "vote_average": 8.5, "genres": [{ "name": "Drama" }] }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/discover/movie"))
        .and(query_param("api_key", "test-key"))
        .and(query_param("with_genres", "Drama"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = PrimaryCatalogClient::new(&http_config(&server.uri(), 0), Some("test-key".into()))
        .expect("client construction should not fail");
    let candidates = client
        .fetch_candidates(&drama_query(2))
        .await
        .expect("discover should succeed");

    assert_eq!(candidates.len(), 2, "blank title dropped, then truncated");
    assert_eq!(candidates[0].canonical_id.as_deref(), Some("550"));
    assert_eq!(candidates[0].creator.as_deref(), Some("Fox 2000 Pictures"));
    assert_eq!(candidates[0].reason, "Matches your interest in Drama");
    assert_eq!(candidates[1].title, "Pulp Fiction");
    assert!(candidates.iter().all(|c| c.source == Source::Primary));
}

#[tokio::test]
async fn primary_resolves_exact_normalized_title_only() {
    let server = MockServer::start().await;
    let body = serde_json::json!({
        "results": [
            { "id": 1, "name": "The Office: Superfans" },
            { "id": 2316, "name": "The Office" }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/search/tv"))
        .and(query_param("query", "the office"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/tv"))
        .and(query_param("query", "Nonexistent Show"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "results": [] })))
        .mount(&server)
        .await;

    let client = PrimaryCatalogClient::new(&http_config(&server.uri(), 0), None).unwrap();
    let id = client.resolve_id("the office", ContentKind::Show).await.unwrap();
    assert_eq!(id.as_deref(), Some("2316"));

    let missing = client
        .resolve_id("Nonexistent Show", ContentKind::Show)
        .await
        .unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn primary_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/discover/movie"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/discover/movie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{ "id": 9, "title": "Heat", "vote_average": 8.3 }]
        })))
        .mount(&server)
        .await;

    let client = PrimaryCatalogClient::new(&http_config(&server.uri(), 1), None).unwrap();
    let candidates = client.fetch_candidates(&drama_query(5)).await.unwrap();
    assert_eq!(candidates.len(), 1);
}

#[tokio::test]
async fn primary_surfaces_client_errors_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/discover/movie"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = PrimaryCatalogClient::new(&http_config(&server.uri(), 2), None).unwrap();
    let err = client.fetch_candidates(&drama_query(5)).await.unwrap_err();
    assert!(matches!(
        err,
        CatalogError::UnexpectedStatus { status: 401, .. }
    ));
}

#[tokio::test]
async fn secondary_trending_sends_headers_and_genre_slugs() {
    let server = MockServer::start().await;
    let body = serde_json::json!([
        { "watchers": 120, "show": {
            "title": "Shogun", "year": 2024,
            "ids": { "trakt": 1, "tmdb": 126_308 },
            "genres": ["drama", "history"], "rating": 8.7, "network": "FX" } },
        { "watchers": 80, "show": {
            "title": "Untracked", "year": 2024, "ids": { "trakt": 2 } } }
    ]);
    Mock::given(method("GET"))
        .and(path("/shows/trending"))
        .and(header("trakt-api-version", "2"))
        .and(header("trakt-api-key", "client-123"))
        .and(query_param("genres", "science-fiction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client =
        SecondaryCatalogClient::new(&http_config(&server.uri(), 0), Some("client-123".into()))
            .unwrap();
    let query = CandidateQuery {
        genres: vec!["Science Fiction".to_owned()],
        kind: ContentKind::Show,
        limit: 10,
        ..CandidateQuery::default()
    };
    let candidates = client.fetch_candidates(&query).await.unwrap();

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].canonical_id.as_deref(), Some("126308"));
    assert_eq!(candidates[0].creator.as_deref(), Some("FX"));
    assert_eq!(candidates[1].canonical_id, None);
    assert!(candidates.iter().all(|c| c.source == Source::Secondary));
}

#[tokio::test]
async fn secondary_malformed_body_is_deserialize_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movies/trending"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"not\":\"a list\"}"))
        .mount(&server)
        .await;

    let client = SecondaryCatalogClient::new(&http_config(&server.uri(), 0), None).unwrap();
    let err = client.fetch_candidates(&drama_query(5)).await.unwrap_err();
    assert!(matches!(err, CatalogError::Deserialize { .. }));
}

#[tokio::test]
async fn tertiary_search_requires_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "title_results": []
        })))
        .expect(0)
        .mount(&server)
        .await;

    let client = AvailabilityClient::new(&http_config(&server.uri(), 0), None).unwrap();
    let candidates = client.fetch_candidates(&drama_query(5)).await.unwrap();
    assert!(candidates.is_empty());
}

#[tokio::test]
async fn tertiary_search_returns_candidates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("apiKey", "wm-key"))
        .and(query_param("search_field", "name"))
        .and(query_param("search_value", "heist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "title_results": [
                { "id": 1_001, "name": "Heist Night", "type": "movie", "year": 2025,
                  "tmdb_id": 777, "user_rating": 7.2, "source_count": 3 },
                { "id": 1_002, "name": "The Heist", "type": "movie", "year": 2001 }
            ]
        })))
        .mount(&server)
        .await;

    let client = AvailabilityClient::new(&http_config(&server.uri(), 0), Some("wm-key".into()))
        .unwrap();
    let query = CandidateQuery {
        text: Some("heist".to_owned()),
        ..drama_query(5)
    };
    let candidates = client.fetch_candidates(&query).await.unwrap();

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].canonical_id.as_deref(), Some("777"));
    assert!(candidates[0].streaming_available);
    assert_eq!(candidates[1].canonical_id, None);
    assert_eq!(candidates[1].source, Source::Tertiary);
}

#[tokio::test]
async fn availability_falls_back_to_title_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("search_field", "tmdb_movie_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "title_results": []
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("search_field", "name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "title_results": [{ "id": 42, "name": "Arrival" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/title/42/sources/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "name": "Paramount+", "type": "sub", "region": "US" },
            { "name": "Apple TV", "type": "buy", "region": "US" },
            { "name": "Pluto TV", "type": "free", "region": "US" }
        ])))
        .mount(&server)
        .await;

    let client = AvailabilityClient::new(&http_config(&server.uri(), 0), None).unwrap();
    let availability = client
        .get_availability("329865", "Arrival", ContentKind::Movie)
        .await
        .unwrap();

    assert_eq!(availability.platform_count, 3);
    assert_eq!(availability.monetized_platforms, 2);
    assert_eq!(availability.top_platforms[0], "Paramount+");
}

#[tokio::test]
async fn availability_for_unknown_title_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "title_results": []
        })))
        .mount(&server)
        .await;

    let client = AvailabilityClient::new(&http_config(&server.uri(), 0), None).unwrap();
    let availability = client
        .get_availability("1", "Nothing Here", ContentKind::Show)
        .await
        .unwrap();
    assert_eq!(availability.platform_count, 0);
    assert!(availability.top_platforms.is_empty());
}

#[test]
fn invalid_base_url_is_rejected() {
    let err = PrimaryCatalogClient::new(&http_config("not a url", 0), None).unwrap_err();
    assert!(matches!(err, CatalogError::InvalidConfig(_)));
}
