//! Tests for `PgroongaClient` against a canned executor

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]

use std::sync::Arc;

use ftsearch_search::{
    FILTER, LIVENESS_PREDICATE, MockSearchExecutor, PgroongaClient, SearchCommand,
    SearchCommandCompiler, SearchError, TABLE,
};
use serde_json::json;

const INDEX: &str = "searcher_records_index";

fn client() -> (PgroongaClient, MockSearchExecutor) {
    let executor = MockSearchExecutor::new();
    let client = PgroongaClient::new(
        Arc::new(executor.clone()),
        SearchCommandCompiler::new(INDEX),
    );
    (client, executor)
}

#[tokio::test]
async fn test_select_parses_result_set() {
    let (client, executor) = client();
    executor.respond_with(
        r#"[[0, 1700000000.0, 0.002],
            [[[1], [["_id", "UInt32"], ["filename", "ShortText"]], [12, "report.pdf"]]]]"#,
    );

    let command = SearchCommand::select()
        .with("match_columns", "content")
        .with("query", "report")
        .with("limit", 10_i64);
    let response = client.select(&command).await.unwrap();

    let result = response.select().unwrap();
    assert_eq!(result.n_hits, 1);
    assert_eq!(result.value(0, "filename"), Some(&json!("report.pdf")));
}

#[tokio::test]
async fn test_select_sends_bound_parameters_with_liveness() {
    let (client, executor) = client();
    executor.respond_with(r#"[[0, 1.0, 0.1], [[[0], [["_id", "UInt32"]]]]]"#);

    let command = SearchCommand::select()
        .with("query", "x'); DROP TABLE searcher_records; --")
        .with(FILTER, "container_type == \"Issue\"");
    client.select(&command).await.unwrap();

    let query = executor.last_query().unwrap();
    assert!(!query.sql.contains("DROP TABLE"));
    assert_eq!(query.params[0], "select");
    assert_eq!(query.params[1], INDEX);
    assert!(
        query
            .params
            .contains(&format!("(container_type == \"Issue\") && {LIVENESS_PREDICATE}"))
    );
    assert!(
        query
            .params
            .contains(&"x'); DROP TABLE searcher_records; --".to_string())
    );
}

#[tokio::test]
async fn test_response_carries_command_as_sent() {
    let (client, executor) = client();
    executor.respond_with(r#"[[0, 1.0, 0.1], [[[0], [["_id", "UInt32"]]]]]"#);

    let command = SearchCommand::select()
        .with(TABLE, "users")
        .with(FILTER, "is_private == false");
    let response = client.select(&command).await.unwrap();

    assert_eq!(
        response.command.filter().as_deref(),
        Some(format!("(is_private == false) && {LIVENESS_PREDICATE}").as_str())
    );
    assert_eq!(
        response.command.get(TABLE).map(ToString::to_string).as_deref(),
        Some(format!("pgroonga_table_name('{INDEX}')").as_str())
    );
    assert_eq!(
        command.filter().as_deref(),
        Some("is_private == false"),
        "the caller's command is left untouched"
    );
}

#[tokio::test]
async fn test_engine_error_is_reported() {
    let (client, executor) = client();
    executor.respond_with(r#"[[-63, 1.0, 0.1, "syntax error in query"], []]"#);

    let error = client
        .select(&SearchCommand::select().with("query", "(("))
        .await
        .unwrap_err();

    match error {
        SearchError::Engine {
            return_code,
            message,
            ..
        } => {
            assert_eq!(return_code, -63);
            assert_eq!(message, "syntax error in query");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_null_result_is_empty_response() {
    let (client, executor) = client();
    executor.respond_null();

    let error = client.select(&SearchCommand::select()).await.unwrap_err();
    assert!(matches!(error, SearchError::EmptyResponse { .. }));
}

#[tokio::test]
async fn test_driver_failure_is_query_failed() {
    let (client, executor) = client();
    executor.fail_with("connection reset");

    let error = client.select(&SearchCommand::select()).await.unwrap_err();
    assert!(matches!(error, SearchError::QueryFailed { .. }));
    assert_eq!(executor.queries.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_payload() {
    let (client, executor) = client();
    executor.respond_with("<html>");

    let error = client.select(&SearchCommand::select()).await.unwrap_err();
    assert!(matches!(error, SearchError::MalformedResponse { .. }));
}
