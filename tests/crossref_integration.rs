//! Integration tests for DOI retrieval against a mock Crossref server.

use std::time::Duration;

use refstyle_core::lookup::{CrossrefLookup, DoiLookup};
use refstyle_core::pipeline::{DoiRetrieval, process_text};
use refstyle_core::style::CrossrefMatch;
use refstyle_core::{JournalTable, StyleOptions};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

const TITLE: &str = "A revision of the genus Rana in South America";

fn works_body(doi: &str, title: &str) -> serde_json::Value {
    json!({
        "status": "ok",
        "message-type": "work-list",
        "message": {
            "total-results": 1,
            "items": [{ "DOI": doi, "title": [title] }]
        }
    })
}

fn lookup(base_url: String) -> CrossrefLookup {
    CrossrefLookup::with_base_url(
        Some("refs@example.org".to_string()),
        Duration::from_secs(5),
        base_url,
    )
    .unwrap()
}

#[tokio::test]
async fn test_crossref_exact_title_match_returns_doi() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("query.bibliographic", TITLE))
        .and(query_param("rows", "1"))
        .and(query_param("mailto", "refs@example.org"))
        .respond_with(ResponseTemplate::new(200).set_body_json(works_body(
            "10.1111/rana.2001",
            "A Revision of the Genus Rana in South America",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let doi = lookup(server.uri()).lookup_doi(TITLE, false).await;
    assert_eq!(doi.as_deref(), Some("doi:10.1111/rana.2001"));
}

#[tokio::test]
async fn test_crossref_fuzzy_match_respects_threshold() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/works"))
        .respond_with(ResponseTemplate::new(200).set_body_json(works_body(
            "10.1111/rana.2001",
            "A revision of the genus Rana in South-America",
        )))
        .mount(&server)
        .await;

    let strict = lookup(server.uri());
    assert_eq!(strict.lookup_doi(TITLE, false).await, None);
    assert_eq!(
        strict.lookup_doi(TITLE, true).await.as_deref(),
        Some("doi:10.1111/rana.2001")
    );

    let stricter = lookup(server.uri()).with_fuzzy_threshold(100).unwrap();
    assert_eq!(stricter.lookup_doi(TITLE, true).await, None);
}

#[tokio::test]
async fn test_crossref_unrelated_hit_is_rejected() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/works"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(works_body("10.9999/other", "Birds of the Pacific islands")),
        )
        .mount(&server)
        .await;

    assert_eq!(lookup(server.uri()).lookup_doi(TITLE, true).await, None);
}

#[tokio::test]
async fn test_crossref_server_error_yields_none() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/works"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert_eq!(lookup(server.uri()).lookup_doi(TITLE, false).await, None);
}

#[tokio::test]
async fn test_crossref_empty_items_and_bad_json_yield_none() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("query.bibliographic", "No hits here"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "message": { "items": [] }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("query.bibliographic", "Broken body here"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let lookup = lookup(server.uri());
    assert_eq!(lookup.lookup_doi("No hits here", false).await, None);
    assert_eq!(lookup.lookup_doi("Broken body here", false).await, None);
}

#[tokio::test]
async fn test_process_text_appends_doi_from_crossref() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("query.bibliographic", TITLE))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(works_body("10.1111/rana.2001", TITLE)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let input = format!(
        "Smith J 2001. {TITLE}. Zootaxa 12: 1-20.\nDoe A 2002. Already has one here. Zootaxa 3: 4-5. doi:10.1/kept\n"
    );
    let options = StyleOptions {
        crossref: CrossrefMatch::Exact,
        ..StyleOptions::default()
    };
    let lookup = lookup(server.uri());
    let output = process_text(
        &input,
        &options,
        Some(JournalTable::bundled().unwrap()),
        Some(DoiRetrieval::new(&lookup, 2)),
    )
    .await;
    assert_eq!(
        output[0],
        format!("Smith, J (2001): {TITLE}. Zootaxa 12: 1-20. doi:10.1111/rana.2001")
    );
    assert!(output[1].ends_with("doi:10.1/kept"));
}
