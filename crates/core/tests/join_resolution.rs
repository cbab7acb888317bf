//! Join resolver behaviour across strategies and cardinalities.

mod common;

use anyquery_common::{record, Record, Value};
use anyquery_core::{Cardinality, Join, JoinStrategy, Locator, Model, ModelSchema};
use anyquery_error::ErrorCode;
use common::{memory_model, MemoryAdapter};
use std::sync::{Arc, Mutex};

fn users() -> Vec<Record> {
    vec![
        record([("id", Value::Int(1)), ("name", Value::from("ada"))]),
        record([("id", Value::Int(2)), ("name", Value::from("bob"))]),
        record([("id", Value::Int(3)), ("name", Value::from("cyd"))]),
    ]
}

fn articles() -> Vec<Record> {
    vec![
        record([("id", Value::Int(10)), ("user_id", Value::Int(2))]),
        record([("id", Value::Int(11)), ("user_id", Value::Int(1))]),
        record([("id", Value::Int(12)), ("user_id", Value::Int(2))]),
        record([("id", Value::Int(13)), ("user_id", Value::Int(9))]),
        record([("id", Value::Int(14)), ("user_id", Value::Null)]),
    ]
}

fn comments() -> Vec<Record> {
    vec![
        record([("id", Value::Int(100)), ("article_id", Value::Int(10))]),
        record([("id", Value::Int(101)), ("article_id", Value::Int(11))]),
        record([("id", Value::Int(102)), ("article_id", Value::Int(10))]),
        record([("id", Value::Int(103)), ("article_id", Value::Null)]),
    ]
}

fn user_names(rows: &[anyquery_core::Row]) -> Vec<Value> {
    rows.iter()
        .map(|r| r.dig(["user", "name"]).unwrap())
        .collect()
}

#[tokio::test]
async fn test_single_join_attaches_entry_or_null() {
    let (users, _) = memory_model("users", users());
    let (articles, _) = memory_model("articles", articles());

    let rows = articles
        .all()
        .joins(
            Join::new(&users, "id", "user_id")
                .into_field("user")
                .cardinality(Cardinality::Single),
        )
        .rows()
        .await
        .unwrap();

    assert_eq!(rows.len(), 5);
    assert_eq!(
        user_names(&rows),
        vec![
            Value::from("bob"),
            Value::from("ada"),
            Value::from("bob"),
            Value::Null,
            Value::Null,
        ]
    );
    // The field is present even when unmatched.
    assert!(rows[3].attributes().contains_key("user"));
}

#[tokio::test]
async fn test_list_join_groups_in_fetch_order() {
    let (articles, _) = memory_model("articles", articles());
    let (comments, _) = memory_model("comments", comments());

    let rows = articles
        .all()
        .joins(Join::new(&comments, "article_id", "id").cardinality(Cardinality::List))
        .rows()
        .await
        .unwrap();

    let counts: Vec<usize> = rows
        .iter()
        .map(|r| r.get("comments").as_list().map(<[Value]>::len).unwrap_or(99))
        .collect();
    assert_eq!(counts, vec![2, 1, 0, 0, 0]);

    let first: Vec<Value> = rows[0]
        .get("comments")
        .as_list()
        .unwrap()
        .iter()
        .map(|c| c.as_record().unwrap()["id"].clone())
        .collect();
    assert_eq!(first, vec![Value::Int(100), Value::Int(102)]);
}

#[tokio::test]
async fn test_single_cardinality_last_match_wins() {
    let (articles, _) = memory_model("articles", articles());
    let (comments, _) = memory_model("comments", comments());

    let rows = articles
        .all()
        .limit(1)
        .joins(
            Join::new(&comments, "article_id", "id")
                .into_field("latest_comment")
                .cardinality(Cardinality::Single)
                .strategy(JoinStrategy::FullScan),
        )
        .rows()
        .await
        .unwrap();

    assert_eq!(
        rows[0].dig(["latest_comment", "id"]).unwrap(),
        Value::Int(102)
    );
}

#[tokio::test]
async fn test_strategies_agree() {
    let (users, _) = memory_model("users", users());
    let (articles, _) = memory_model("articles", articles());
    let user_lookup = users.clone();

    let strategies = vec![
        JoinStrategy::Default,
        JoinStrategy::Single,
        JoinStrategy::FullScan,
        JoinStrategy::custom(move |keys| {
            let users = user_lookup.clone();
            async move { users.all().filter_in("id", keys).records().await }
        }),
    ];

    let mut results = Vec::new();
    for strategy in strategies {
        let rows = articles
            .all()
            .joins(
                Join::new(&users, "id", "user_id")
                    .into_field("user")
                    .cardinality(Cardinality::Single)
                    .strategy(strategy),
            )
            .rows()
            .await
            .unwrap();
        results.push(rows);
    }

    for rows in &results[1..] {
        assert_eq!(rows, &results[0]);
    }
}

#[tokio::test]
async fn test_single_strategy_deduplicates_keys() {
    let (users, user_adapter) = memory_model("users", users());
    let (articles, _) = memory_model("articles", articles());

    articles
        .all()
        .joins(Join::new(&users, "id", "user_id").strategy(JoinStrategy::Single))
        .to_list()
        .await
        .unwrap();

    // user_id 2 appears twice, null is dropped: keys are 2, 1, 9.
    assert_eq!(user_adapter.single_count(), 3);
    assert_eq!(
        *user_adapter.requested_ids.lock().unwrap(),
        vec![Value::Int(2), Value::Int(1), Value::Int(9)]
    );
}

#[tokio::test]
async fn test_custom_resolver_sees_unique_keys_in_first_seen_order() {
    let (users, _) = memory_model("users", users());
    let (articles, _) = memory_model("articles", articles());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();

    articles
        .all()
        .joins(
            Join::new(&users, "id", "user_id").strategy(JoinStrategy::custom(move |keys| {
                recorder.lock().unwrap().push(keys);
                async { Ok(Vec::new()) }
            })),
        )
        .to_list()
        .await
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![vec![Value::Int(2), Value::Int(1), Value::Int(9)]]
    );
}

#[tokio::test]
async fn test_default_strategy_skips_fetch_without_keys() {
    let (users, user_adapter) = memory_model("users", users());
    let (articles, _) = memory_model(
        "articles",
        vec![record([("id", Value::Int(1)), ("user_id", Value::Null)])],
    );

    let rows = articles
        .all()
        .joins(Join::new(&users, "id", "user_id").into_field("user"))
        .rows()
        .await
        .unwrap();

    assert_eq!(user_adapter.load_count(), 0);
    assert!(rows[0].attributes().contains_key("user"));
    assert_eq!(rows[0].get("user"), Value::Null);
}

#[tokio::test]
async fn test_nested_foreign_key() {
    let (users, _) = memory_model("users", users());
    let mut article = record([("id", Value::Int(1))]);
    article.insert(
        "meta".to_string(),
        Value::Record(record([("author_id", Value::Int(3))])),
    );
    let (articles, _) = memory_model("articles", vec![article]);

    let rows = articles
        .all()
        .joins(
            Join::new(&users, "id", Locator::path(["meta", "author_id"]))
                .into_field("user")
                .cardinality(Cardinality::Single),
        )
        .rows()
        .await
        .unwrap();
    assert_eq!(user_names(&rows), vec![Value::from("cyd")]);
}

#[tokio::test]
async fn test_broken_foreign_key_path_fails() {
    let (users, _) = memory_model("users", users());
    let (articles, _) = memory_model(
        "articles",
        vec![record([("id", Value::Int(1)), ("user_id", Value::Int(1))])],
    );

    let err = articles
        .all()
        .joins(Join::new(&users, "id", ["user_id", "nested"]))
        .to_list()
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResolutionFailed);
}

#[tokio::test]
async fn test_with_single_replaces_rows_with_details() {
    let listed = vec![
        record([("id", Value::Int(1)), ("title", Value::from("short"))]),
        record([("id", Value::Int(2)), ("title", Value::from("short"))]),
    ];
    let details = vec![record([
        ("id", Value::Int(1)),
        ("title", Value::from("short")),
        ("body", Value::from("full text")),
    ])];
    let adapter = Arc::new(MemoryAdapter::with_details(listed, details, "id"));
    let articles = Model::new(ModelSchema::new("articles"), adapter.clone());

    let rows = articles.all().with_single().rows().await.unwrap();

    assert_eq!(adapter.single_count(), 2);
    assert_eq!(rows[0].get("body"), Value::from("full text"));
    // No detail for id 2: the listed row is kept.
    assert_eq!(rows[1].get("body"), Value::Null);
    assert_eq!(rows[1].get("title"), Value::from("short"));
}
