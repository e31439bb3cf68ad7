//! Predicate compilation and query execution tests.
//!
//! Runs the whole compile → lower → execute path against the in-memory
//! store and checks both the native query sent and the parsed result.

mod common;

use hashdex_index::{
    analyze, compile, to_native, ClauseQuery, Field, Fingerprint, IndexError, NativeQuery,
    QueryOutcome, Reply, StoreOp,
};
use pretty_assertions::assert_eq;

fn native(predicate: hashdex_index::Predicate) -> String {
    let schema = analyze(&common::people_schema()).unwrap();
    to_native(&compile(&schema, &predicate).unwrap()).unwrap()
}

// ============================================================================
// Fingerprints
// ============================================================================

#[test]
fn test_fingerprint_determinism_and_order() {
    let a = analyze(&common::people_schema()).unwrap();
    let b = analyze(&common::people_schema()).unwrap();
    assert_eq!(Fingerprint::of(&a.fields), Fingerprint::of(&b.fields));

    let mut reversed = a.fields.clone();
    reversed.reverse();
    assert_ne!(Fingerprint::of(&a.fields), Fingerprint::of(&reversed));
}

// ============================================================================
// Clause translation
// ============================================================================

#[test]
fn test_numeric_translation() {
    let age = Field::<i32>::new("age");
    assert_eq!(native(age.gt(30)), "@age:[30 +inf]");
    assert_eq!(native(age.eq(30)), "@age:[30 30]");
    assert_eq!(native(age.ne(30)), "-@age:[30 30]");
}

#[test]
fn test_strict_bound_matches_inclusive_bound() {
    // Known boundary case: `>` is translated as `>=`
    let age = Field::<i32>::new("age");
    assert_eq!(native(age.gt(30)), native(age.ge(30)));
}

#[test]
fn test_tag_translation_escapes_reserved_characters() {
    let status = Field::<String>::new("status");
    assert_eq!(native(status.eq("a&b")), r"@status:{a\&b}");
}

#[test]
fn test_text_contains_translation() {
    let bio = Field::<String>::new("bio");
    assert_eq!(native(bio.contains("hello")), "@bio:*hello*");
}

#[test]
fn test_compiled_text_form_is_annotated() {
    let schema = analyze(&common::people_schema()).unwrap();
    let age = Field::<i32>::new("age");
    let status = Field::<String>::new("status");

    let compiled = compile(&schema, &(age.gt(30) | !status.eq("x"))).unwrap();
    assert_eq!(
        compiled.to_string(),
        "( @age|Numeric| > 30 OR NOT @status|Tag| == x )"
    );
    assert_eq!(
        to_native(&compiled).unwrap(),
        "@age:[30 +inf] | -@status:{x}"
    );
}

// ============================================================================
// Execution
// ============================================================================

#[tokio::test]
async fn test_pagination_offset_and_total_pages() {
    let (store, executor) = common::executor();
    store.push_search_reply(common::ids_reply(45, &["people:21", "people:22"]));

    let page = executor
        .search(&NativeQuery::all("people"), 2, 20)
        .await
        .into_value();

    assert_eq!(store.last_search().unwrap().offset, 20);
    assert_eq!(page.total_count, 45);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.ids, vec!["21", "22"]);
}

#[tokio::test]
async fn test_unsupported_predicate_fails_before_store_call() {
    let (store, _executor) = common::executor();
    let schema = analyze(&common::people_schema()).unwrap();
    let bio = Field::<String>::new("bio");

    let err = NativeQuery::all("people")
        .filter(&schema, &bio.call("is_empty"))
        .unwrap_err();

    assert!(matches!(err, IndexError::UnsupportedPredicate(_)));
    assert_eq!(store.count(StoreOp::Search), 0);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_compiled_query_reaches_store() {
    let (store, executor) = common::executor();
    let schema = analyze(&common::people_schema()).unwrap();
    let age = Field::<i32>::new("age");
    let status = Field::<String>::new("status");

    let query = NativeQuery::from_predicate(&schema, &(age.ge(18) & status.eq("active")))
        .unwrap();
    executor.search(&query, 1, 10).await;

    assert_eq!(
        store.last_search().unwrap().query,
        "@age:[18 +inf] @status:{active}"
    );
}

#[tokio::test]
async fn test_backend_failure_is_a_degraded_outcome() {
    let (store, executor) = common::executor();
    store.fail_on(StoreOp::Search);

    let outcome = executor.search(&NativeQuery::all("people"), 1, 10).await;

    match outcome {
        QueryOutcome::Degraded { ref reason } => assert!(reason.contains("injected")),
        QueryOutcome::Complete(_) => panic!("expected a degraded outcome"),
    }
    let page = outcome.into_value();
    assert!(page.ids.is_empty());
    assert_eq!(page.total_count, 0);
    assert_eq!(page.total_pages, 0);
}

#[tokio::test]
async fn test_every_successful_search_counts() {
    let (store, executor) = common::executor();
    let query = NativeQuery::new("people", ClauseQuery::new().tag("status", "x").render());

    executor.search(&query, 1, 10).await;
    executor.count(&query).await;

    assert_eq!(store.hash("index:people").unwrap()["totalQueries"], "2");
}

#[tokio::test]
async fn test_select_rows_carry_ids_and_values() {
    let (store, executor) = common::executor();
    store.push_search_reply(Reply::Array(vec![
        Reply::Int(2),
        Reply::Data("people:1".to_string()),
        Reply::Array(vec![
            Reply::Data("status".to_string()),
            Reply::Data("active".to_string()),
        ]),
        Reply::Data("people:2".to_string()),
        Reply::Array(vec![
            Reply::Data("status".to_string()),
            Reply::Data("away".to_string()),
        ]),
    ]));

    let page = executor
        .select(
            &NativeQuery::all("people"),
            &["status".to_string()],
            1,
            10,
        )
        .await
        .into_value();

    let statuses: Vec<(&str, &str)> = page
        .rows
        .iter()
        .map(|r| (r.id.as_str(), r.values["status"].as_str()))
        .collect();
    assert_eq!(statuses, vec![("1", "active"), ("2", "away")]);
    assert_eq!(page.total_pages, 1);
}
