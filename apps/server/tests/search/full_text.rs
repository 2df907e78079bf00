use crate::support::*;
use serde_json::json;

async fn seeded(bodies: &[(&str, serde_json::Value)]) -> anyhow::Result<TestStore> {
    let t = TestStore::new();
    t.collection("foo").await?;
    for (slug, body) in bodies {
        t.annotate("foo", slug, AnnotationBuilder::new().body(body.clone()).build())
            .await?;
    }
    Ok(t)
}

#[tokio::test]
async fn fts_is_case_insensitive_prefix_by_default() -> anyhow::Result<()> {
    let t = seeded(&[("upper", json!("FOO")), ("other", json!("bar"))]).await?;

    let result = t
        .engine()
        .search_items(&items(&[("fts", r#"{"body": {"query": "fo"}}"#)]))
        .await?;
    assert_slugs(&result, &["upper"]);
    Ok(())
}

#[tokio::test]
async fn fts_exact_match_without_prefix() -> anyhow::Result<()> {
    let t = seeded(&[("quxx", json!("quxx")), ("qux", json!("a qux b"))]).await?;

    let result = t
        .engine()
        .search_items(&items(&[(
            "fts",
            r#"{"body": {"query": "qux", "prefix": false}}"#,
        )]))
        .await?;
    assert_slugs(&result, &["qux"]);
    Ok(())
}

#[tokio::test]
async fn fts_never_matches_field_names() -> anyhow::Result<()> {
    let t = seeded(&[
        ("keyed", json!({"foo": "bar"})),
        ("valued", json!({"baz": "foo"})),
    ])
    .await?;

    let result = t
        .engine()
        .search_items(&items(&[("fts", r#"{"body": {"query": "foo"}}"#)]))
        .await?;
    assert_slugs(&result, &["valued"]);
    Ok(())
}

#[tokio::test]
async fn fts_and_versus_or() -> anyhow::Result<()> {
    let t = seeded(&[
        ("both", json!("foo and bar")),
        ("foo", json!("just foo")),
        ("bar", json!("just bar")),
        ("none", json!("nothing")),
    ])
    .await?;
    let engine = t.engine();

    let and = engine
        .search_items(&items(&[("fts", r#"{"body": {"query": "foo bar"}}"#)]))
        .await?;
    assert_slugs(&and, &["both"]);

    let or = engine
        .search_items(&items(&[(
            "fts",
            r#"{"body": {"query": "foo bar", "operator": "or"}}"#,
        )]))
        .await?;
    assert_slugs(&or, &["both", "foo", "bar"]);
    Ok(())
}

#[tokio::test]
async fn fts_searches_nested_values_and_numbers() -> anyhow::Result<()> {
    let t = seeded(&[
        ("nested", json!([{"value": "Deeply Nested"}, {"page": 1984}])),
        ("flat", json!("shallow")),
    ])
    .await?;
    let engine = t.engine();

    let text = engine
        .search_items(&items(&[("fts", r#"{"body": {"query": "nest"}}"#)]))
        .await?;
    assert_slugs(&text, &["nested"]);

    let number = engine
        .search_items(&items(&[(
            "fts",
            r#"{"body": {"query": "1984", "prefix": false}}"#,
        )]))
        .await?;
    assert_slugs(&number, &["nested"]);
    Ok(())
}

#[tokio::test]
async fn fts_on_one_field_ignores_others() -> anyhow::Result<()> {
    let t = TestStore::new();
    t.collection("foo").await?;
    t.annotate(
        "foo",
        "in-target",
        AnnotationBuilder::new()
            .body(json!("nothing here"))
            .target(json!("http://example.com/foo"))
            .build(),
    )
    .await?;

    let body = t
        .engine()
        .search_items(&items(&[("fts", r#"{"body": {"query": "example"}}"#)]))
        .await?;
    assert_eq!(body.total, 0);

    let target = t
        .engine()
        .search_items(&items(&[("fts", r#"{"target": {"query": "example"}}"#)]))
        .await?;
    assert_slugs(&target, &["in-target"]);
    Ok(())
}

#[tokio::test]
async fn phrase_requires_contiguous_order_by_default() -> anyhow::Result<()> {
    let t = seeded(&[
        ("ordered", json!("foo bar baz")),
        ("reversed", json!("bar foo baz")),
        ("gapped", json!("foo x bar")),
    ])
    .await?;

    let result = t
        .engine()
        .search_items(&items(&[("fts_phrase", r#"{"body": {"query": "foo bar"}}"#)]))
        .await?;
    assert_slugs(&result, &["ordered"]);
    Ok(())
}

#[tokio::test]
async fn phrase_distance_counts_word_positions() -> anyhow::Result<()> {
    let t = seeded(&[
        ("three-apart", json!("foo bar baz qux")),
        ("two-apart", json!("foo bar qux")),
        ("adjacent", json!("foo qux")),
        ("four-apart", json!("foo a b c qux")),
    ])
    .await?;
    let engine = t.engine();

    let three = engine
        .search_items(&items(&[(
            "fts_phrase",
            r#"{"body": {"query": "foo qux", "distance": 3}}"#,
        )]))
        .await?;
    assert_slugs(&three, &["three-apart"]);

    let four = engine
        .search_items(&items(&[(
            "fts_phrase",
            r#"{"body": {"query": "foo qux", "distance": 4}}"#,
        )]))
        .await?;
    assert_slugs(&four, &["four-apart"]);

    let one = engine
        .search_items(&items(&[(
            "fts_phrase",
            r#"{"body": {"query": "foo qux", "distance": 1}}"#,
        )]))
        .await?;
    assert_slugs(&one, &["adjacent"]);
    Ok(())
}

#[tokio::test]
async fn phrase_does_not_span_separate_values() -> anyhow::Result<()> {
    let t = seeded(&[("split", json!(["alpha foo", "bar omega"]))]).await?;

    let result = t
        .engine()
        .search_items(&items(&[("fts_phrase", r#"{"body": {"query": "foo bar"}}"#)]))
        .await?;
    assert_eq!(result.total, 0);
    Ok(())
}

#[tokio::test]
async fn phrase_is_case_insensitive_and_ignores_punctuation() -> anyhow::Result<()> {
    let t = seeded(&[("punctuated", json!("Hello, World!"))]).await?;

    let result = t
        .engine()
        .search_items(&items(&[(
            "fts_phrase",
            r#"{"body": {"query": "hello world"}}"#,
        )]))
        .await?;
    assert_slugs(&result, &["punctuated"]);
    Ok(())
}
