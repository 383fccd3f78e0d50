//! End-to-end mapper behavior against the in-memory backend.
//!
//! Run with: cargo test --package gsm-graph --test mapper

mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use gsm_core::{Cardinality, Dialect, MapperConfig, PropertyWrite, SchemaError, Value, VertexId};
use gsm_graph::{anon, GraphError, MapperError, Operator, Order, Predicate};

use common::{seed, setup, Account, Baseless, Clash, LogCapture, Person};

fn ages(people: &[Person]) -> Vec<i64> {
    people.iter().map(|p| p.age).collect()
}

// ── Upsert ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_assigns_id_and_timestamps() {
    let (mapper, recorder) = setup(MapperConfig::default());

    let mut ada = Person::new("Ada", 36);
    mapper.save(&mut ada).await.unwrap();

    let added = recorder.added();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].label, "Person");
    assert!(added[0]
        .properties
        .contains(&PropertyWrite::single("name", Value::from("Ada"))));
    assert!(added[0].properties.iter().all(|w| w.name != "id"));

    assert_eq!(ada.base.id, Some(VertexId::Int(1)));
    assert!(ada.base.created_at.is_some());
    assert_eq!(ada.base.created_at, ada.base.last_modified);
}

#[tokio::test]
async fn test_update_keeps_created_at() {
    let (mapper, recorder) = setup(MapperConfig::default());

    let mut ada = Person::new("Ada", 36);
    mapper.save(&mut ada).await.unwrap();
    let created_at = ada.base.created_at;
    let first_modified = ada.base.last_modified;

    tokio::time::sleep(Duration::from_millis(5)).await;
    ada.name = "Grace".to_string();
    mapper.save(&mut ada).await.unwrap();

    assert_eq!(recorder.added().len(), 1);
    let merged = recorder.merged();
    assert_eq!(merged.len(), 1);
    assert!(merged[0].on_match.writes.iter().all(|w| w.name != "createdAt"));

    assert_eq!(ada.base.created_at, created_at);
    assert!(ada.base.last_modified > first_modified);

    let stored = mapper
        .model::<Person>()
        .lookup_by_id(VertexId::Int(1))
        .await
        .unwrap();
    assert_eq!(stored.name, "Grace");
    assert_eq!(stored.base.created_at, created_at);
    assert_eq!(stored.base.last_modified, ada.base.last_modified);
}

#[tokio::test]
async fn test_update_replaces_sequences() {
    let (mapper, _) = setup(MapperConfig::default());

    let mut ada = Person::new("Ada", 36);
    ada.tags = vec!["a".into(), "b".into()];
    mapper.save(&mut ada).await.unwrap();

    ada.tags = vec!["c".into()];
    mapper.save(&mut ada).await.unwrap();

    let stored = mapper.model::<Person>().take().await.unwrap();
    assert_eq!(stored.tags, vec!["c".to_string()]);
}

#[tokio::test]
async fn test_update_unknown_id_is_not_found() {
    let (mapper, recorder) = setup(MapperConfig::default());

    let mut ghost = Person::new("Ghost", 1);
    ghost.base.id = Some(VertexId::Int(99));
    let err = mapper.save(&mut ghost).await.unwrap_err();

    assert!(matches!(
        err,
        MapperError::NotFound { ref label, id: Some(VertexId::Int(99)) } if label == "Person"
    ));
    assert_eq!(recorder.graph().vertex_count(), 0);
    assert!(ghost.base.last_modified.is_none());
}

#[tokio::test]
async fn test_update_without_id_is_not_found() {
    let (mapper, recorder) = setup(MapperConfig::default());

    let mut fresh = Person::new("Fresh", 1);
    let err = mapper.update(&mut fresh).await.unwrap_err();
    assert!(matches!(err, MapperError::NotFound { id: None, .. }));
    assert!(recorder.merged().is_empty());
}

#[tokio::test]
async fn test_explicit_label() {
    let (mapper, recorder) = setup(MapperConfig::default());

    let mut account = Account {
        email: "ada@example.com".into(),
        ..Account::default()
    };
    mapper.create(&mut account).await.unwrap();
    assert_eq!(recorder.added()[0].label, "user_account");

    let found = mapper.model::<Account>().take().await.unwrap();
    assert_eq!(found.email, "ada@example.com");
    assert_eq!(
        recorder.last_traversal().unwrap(),
        "g.V().hasLabel('user_account')"
    );
}

#[tokio::test]
async fn test_schema_errors_abort_before_backend() {
    let (mapper, recorder) = setup(MapperConfig::default());

    let mut clash = Clash::default();
    let err = mapper.save(&mut clash).await.unwrap_err();
    assert!(matches!(
        err,
        MapperError::Schema(SchemaError::DuplicateProperty { ref name, .. }) if name == "name"
    ));

    let mut baseless = Baseless::default();
    let err = mapper.save(&mut baseless).await.unwrap_err();
    assert!(matches!(err, MapperError::Schema(SchemaError::MissingBase { .. })));

    let err = mapper.model::<Baseless>().count().await.unwrap_err();
    assert!(matches!(err, MapperError::Schema(_)));

    assert!(recorder.added().is_empty());
    assert!(recorder.traversals().is_empty());
}

// ── Cardinality ──────────────────────────────────────────────────

#[tokio::test]
async fn test_sequence_cardinality_follows_dialect() {
    for (dialect, expected) in [
        (Dialect::Standard, Cardinality::List),
        (Dialect::SetOnly, Cardinality::Set),
    ] {
        let (mapper, recorder) = setup(MapperConfig::default().with_dialect(dialect));

        let mut tagged = Person::new("Tagged", 1);
        tagged.tags = vec!["x".into(), "y".into()];
        mapper.save(&mut tagged).await.unwrap();

        let tag_writes: Vec<_> = recorder.added()[0]
            .properties
            .iter()
            .filter(|w| w.name == "tags")
            .cloned()
            .collect();
        assert_eq!(tag_writes.len(), 2);
        assert!(tag_writes.iter().all(|w| w.cardinality == expected));
    }
}

#[tokio::test]
async fn test_set_only_backend_rejects_list_writes() {
    let recorder = std::sync::Arc::new(common::Recorder::new(gsm_graph::MemoryGraph::with_dialect(
        Dialect::SetOnly,
    )));
    let backend: std::sync::Arc<dyn gsm_graph::TraversalBackend> = recorder.clone();
    let mapper = gsm_graph::Mapper::from_arc(backend, MapperConfig::default());

    let mut tagged = Person::new("Tagged", 1);
    tagged.tags = vec!["x".into()];
    let err = mapper.save(&mut tagged).await.unwrap_err();

    assert!(matches!(err, MapperError::Graph(GraphError::Rejected(_))));
    assert!(tagged.base.id.is_none());
    assert_eq!(recorder.graph().vertex_count(), 0);
}

#[tokio::test]
async fn test_map_fields_write_keys() {
    let (mapper, recorder) = setup(MapperConfig::default());

    let mut person = Person::new("Ada", 36);
    person.attrs = BTreeMap::from([
        ("color".to_string(), "red".to_string()),
        ("size".to_string(), "xl".to_string()),
    ]);
    mapper.save(&mut person).await.unwrap();

    let attr_writes: Vec<_> = recorder.added()[0]
        .properties
        .iter()
        .filter(|w| w.name == "attrs")
        .cloned()
        .collect();
    assert_eq!(
        attr_writes,
        vec![
            PropertyWrite::new(Cardinality::Set, "attrs", Value::from("color")),
            PropertyWrite::new(Cardinality::Set, "attrs", Value::from("size")),
        ]
    );
}

// ── Queries ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_filtered_take() {
    let (mapper, recorder) = setup(MapperConfig::default());
    seed(&mapper, vec![Person::new("Bob", 40), Person::new("Ada", 36)]).await;

    let ada = mapper
        .model::<Person>()
        .where_("name", Operator::Eq, "Ada")
        .take()
        .await
        .unwrap();

    assert_eq!(ada.name, "Ada");
    assert_eq!(ada.age, 36);
    assert_eq!(ada.base.id, Some(VertexId::Int(2)));
    assert_eq!(
        recorder.last_traversal().unwrap(),
        "g.V().hasLabel('Person').has('name', eq('Ada'))"
    );
}

#[tokio::test]
async fn test_take_without_match_is_not_found() {
    let (mapper, _) = setup(MapperConfig::default());
    seed(&mapper, vec![Person::new("Ada", 36)]).await;

    let err = mapper
        .where_::<Person>("name", Operator::Eq, "Nobody")
        .take()
        .await
        .unwrap_err();
    assert!(matches!(err, MapperError::NotFound { id: None, .. }));
}

#[tokio::test]
async fn test_pagination() {
    let (mapper, recorder) = setup(MapperConfig::default());
    seed(
        &mapper,
        vec![
            Person::new("c", 40),
            Person::new("a", 20),
            Person::new("d", 50),
            Person::new("b", 30),
        ],
    )
    .await;

    let page = mapper
        .model::<Person>()
        .order_by("age", Order::Asc)
        .offset(1)
        .limit(2)
        .find()
        .await
        .unwrap();

    assert_eq!(ages(&page), vec![30, 40]);
    assert_eq!(
        recorder.last_traversal().unwrap(),
        "g.V().hasLabel('Person').order().by('age', asc).skip(1).limit(2)"
    );
}

#[tokio::test]
async fn test_second_order_by_wins() {
    let (mapper, _) = setup(MapperConfig::default());
    seed(&mapper, vec![Person::new("b", 20), Person::new("a", 30)]).await;

    let query = mapper
        .model::<Person>()
        .order_by("name", Order::Asc)
        .order_by("age", Order::Desc);
    assert_eq!(query.spec().order.as_ref().unwrap().field, "age");

    let people = query.find().await.unwrap();
    assert_eq!(ages(&people), vec![30, 20]);
}

#[tokio::test]
async fn test_ambiguous_decode() {
    let (mapper, _) = setup(MapperConfig::default());

    let mut many = Person::new("many", 1);
    many.tags = vec!["a".into(), "b".into()];
    let mut one = Person::new("one", 2);
    one.tags = vec!["a".into()];
    seed(&mapper, vec![many, one]).await;

    let many = mapper
        .where_::<Person>("name", Operator::Eq, "many")
        .take()
        .await
        .unwrap();
    assert_eq!(many.tags, vec!["a".to_string(), "b".to_string()]);

    let one = mapper
        .where_::<Person>("name", Operator::Eq, "one")
        .take()
        .await
        .unwrap();
    assert_eq!(one.tags, vec!["a".to_string()]);
    assert_eq!(one.nickname, None);
}

#[tokio::test]
async fn test_count_and_delete() {
    let (mapper, recorder) = setup(MapperConfig::default());
    seed(
        &mapper,
        vec![Person::new("a", 1), Person::new("b", 2), Person::new("c", 3)],
    )
    .await;

    assert_eq!(mapper.model::<Person>().count().await.unwrap(), 3);
    mapper.model::<Person>().limit(1).delete().await.unwrap();
    assert_eq!(mapper.model::<Person>().count().await.unwrap(), 2);

    assert!(recorder
        .traversals()
        .contains(&"g.V().hasLabel('Person').limit(1)".to_string()));
}

#[tokio::test]
async fn test_delete_only_touches_label() {
    let (mapper, _) = setup(MapperConfig::default());
    seed(&mapper, vec![Person::new("a", 1)]).await;
    let mut account = Account::default();
    mapper.save(&mut account).await.unwrap();

    mapper.model::<Person>().delete().await.unwrap();
    assert_eq!(mapper.model::<Person>().count().await.unwrap(), 0);
    assert_eq!(mapper.model::<Account>().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_comparison_operators() {
    let (mapper, _) = setup(MapperConfig::default());
    seed(
        &mapper,
        vec![
            Person::new("Ada", 20),
            Person::new("Bob", 30),
            Person::new("Dana", 40),
        ],
    )
    .await;

    let count = |op: Operator, field: &'static str, value: Value| {
        let mapper = mapper.clone();
        async move { mapper.where_::<Person>(field, op, value).count().await.unwrap() }
    };

    assert_eq!(count(Operator::Gt, "age", Value::Int(20)).await, 2);
    assert_eq!(count(Operator::Gte, "age", Value::Int(20)).await, 3);
    assert_eq!(count(Operator::Lt, "age", Value::Int(30)).await, 1);
    assert_eq!(count(Operator::Lte, "age", Value::Int(30)).await, 2);
    assert_eq!(count(Operator::Neq, "name", Value::from("Bob")).await, 2);
    assert_eq!(count(Operator::In, "age", Value::from(vec![20i64, 40])).await, 2);
    assert_eq!(count(Operator::Without, "name", Value::from(vec!["Ada"])).await, 2);
    assert_eq!(count(Operator::Contains, "name", Value::from("da")).await, 1);
    // Mismatched value shapes leave the query unfiltered.
    assert_eq!(count(Operator::In, "age", Value::Int(20)).await, 3);
    assert_eq!(count(Operator::Contains, "name", Value::Int(1)).await, 3);
}

#[tokio::test]
async fn test_where_raw_and_ids() {
    let (mapper, recorder) = setup(MapperConfig::default());
    let saved = seed(
        &mapper,
        vec![Person::new("Ada", 20), Person::new("Bob", 30), Person::new("Cy", 40)],
    )
    .await;

    let older = mapper
        .model::<Person>()
        .where_raw(anon().has_predicate("age", Predicate::Gte(Value::Int(30))))
        .order_by("age", Order::Desc)
        .find()
        .await
        .unwrap();
    assert_eq!(ages(&older), vec![40, 30]);

    let ids: Vec<VertexId> = saved.iter().take(2).filter_map(|p| p.base.id.clone()).collect();
    let picked = mapper.model::<Person>().ids(ids).find().await.unwrap();
    assert_eq!(ages(&picked), vec![20, 30]);
    assert_eq!(recorder.last_traversal().unwrap(), "g.V(1, 2)");

    let by_id = mapper
        .where_::<Person>("id", Operator::Eq, Value::Int(3))
        .take()
        .await
        .unwrap();
    assert_eq!(by_id.name, "Cy");
}

#[tokio::test]
async fn test_lookup_by_id() {
    let (mapper, recorder) = setup(MapperConfig::default());
    let saved = seed(&mapper, vec![Person::new("Ada", 36)]).await;
    let id = saved[0].base.id.clone().unwrap();

    let found = mapper
        .model::<Person>()
        .where_("name", Operator::Eq, "ignored")
        .lookup_by_id(id.clone())
        .await
        .unwrap();
    assert_eq!(found, saved[0]);
    assert_eq!(recorder.last_traversal().unwrap(), "g.V(1)");

    let err = mapper
        .model::<Person>()
        .lookup_by_id(VertexId::Int(42))
        .await
        .unwrap_err();
    assert!(matches!(err, MapperError::NotFound { id: Some(VertexId::Int(42)), .. }));
}

#[tokio::test]
async fn test_update_property() {
    let (mapper, recorder) = setup(MapperConfig::default());
    let saved = seed(&mapper, vec![Person::new("Ada", 36), Person::new("Bob", 40)]).await;

    tokio::time::sleep(Duration::from_millis(5)).await;
    let updated = mapper
        .where_::<Person>("name", Operator::Eq, "Ada")
        .update_property("age", 37i64)
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let ada = mapper
        .where_::<Person>("name", Operator::Eq, "Ada")
        .take()
        .await
        .unwrap();
    assert_eq!(ada.age, 37);
    assert!(ada.base.last_modified > saved[0].base.last_modified);
    assert_eq!(ada.base.created_at, saved[0].base.created_at);

    let bob = mapper
        .where_::<Person>("name", Operator::Eq, "Bob")
        .take()
        .await
        .unwrap();
    assert_eq!(bob.age, 40);

    let before = recorder.traversals().len();
    let err = mapper
        .model::<Person>()
        .update_property("shoeSize", 44i64)
        .await
        .unwrap_err();
    assert!(matches!(err, MapperError::UnknownProperty { ref name, .. } if name == "shoeSize"));

    let err = mapper
        .model::<Person>()
        .update_property("createdAt", Value::Null)
        .await
        .unwrap_err();
    assert!(matches!(err, MapperError::ImmutableProperty { .. }));
    assert_eq!(recorder.traversals().len(), before);
}

#[tokio::test]
async fn test_update_property_sequence() {
    let (mapper, _) = setup(MapperConfig::default());
    let mut ada = Person::new("Ada", 36);
    ada.tags = vec!["old".into()];
    seed(&mapper, vec![ada]).await;

    mapper
        .model::<Person>()
        .update_property("tags", vec!["x", "y"])
        .await
        .unwrap();

    let ada = mapper.model::<Person>().take().await.unwrap();
    assert_eq!(ada.tags, vec!["x".to_string(), "y".to_string()]);
}

#[tokio::test]
async fn test_compile_is_stable() {
    let (mapper, _) = setup(MapperConfig::default().with_debug_traversals(true));
    let query = mapper
        .model::<Person>()
        .where_("age", Operator::Gt, 18i64)
        .dedup()
        .order_by("name", Order::Asc)
        .limit(10);
    assert_eq!(query.to_traversal(), query.to_traversal());
    assert_eq!(
        query.to_traversal().to_string(),
        "g.V().hasLabel('Person').has('age', gt(18)).dedup().order().by('name', asc).limit(10)"
    );
}

#[tokio::test]
async fn test_debug_traversals_logs_compiled_traversal() {
    let logs = LogCapture::default();
    let _guard = tracing::subscriber::set_default(logs.subscriber());

    let (mapper, _) = setup(MapperConfig::default().with_debug_traversals(true));
    mapper.model::<Person>().where_("age", Operator::Gt, 18i64).count().await.unwrap();

    let out = logs.contents();
    assert!(out.contains("Compiled traversal"), "{out}");
    assert!(out.contains("terminal=\"count\""), "{out}");
    assert!(out.contains("g.V().hasLabel('Person').has('age', gt(18))"), "{out}");
}

#[tokio::test]
async fn test_traversals_not_logged_by_default() {
    let logs = LogCapture::default();
    let _guard = tracing::subscriber::set_default(logs.subscriber());

    let (mapper, _) = setup(MapperConfig::default());
    mapper.model::<Person>().where_("age", Operator::Gt, 18i64).count().await.unwrap();

    assert!(!logs.contents().contains("Compiled traversal"));
}

// ── Raw queries ──────────────────────────────────────────────────

#[tokio::test]
async fn test_raw_label_query() {
    let (mapper, _) = setup(MapperConfig::default());
    let mut ada = Person::new("Ada", 36);
    ada.tags = vec!["a".into(), "b".into()];
    seed(&mapper, vec![ada, Person::new("Bob", 40)]).await;

    let rows = mapper.label("Person").has("name", "Ada").to_list().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], Value::from("Ada"));
    assert_eq!(rows[0]["tags"], Value::from(vec!["a", "b"]));
    assert_eq!(rows[0]["label"], Value::from("Person"));
    assert_eq!(rows[0]["id"], Value::Int(1));

    let older = mapper
        .label("Person")
        .where_raw(anon().has_predicate("age", Predicate::Gt(Value::Int(38))))
        .next()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(older["name"], Value::from("Bob"));

    let none = mapper.label("Robot").limit(5).next().await.unwrap();
    assert!(none.is_none());
}

// ── Concurrency ──────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_saves() {
    let (mapper, recorder) = setup(MapperConfig::default());

    let mut handles = Vec::new();
    for i in 0..8 {
        let mapper = mapper.clone();
        handles.push(tokio::spawn(async move {
            let mut person = Person::new(&format!("p{i}"), i);
            mapper.save(&mut person).await.map(|_| person)
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let person = handle.await.unwrap().unwrap();
        ids.push(person.base.id.unwrap());
    }
    ids.sort();
    ids.dedup();

    assert_eq!(ids.len(), 8);
    assert_eq!(recorder.graph().vertex_count(), 8);
    assert_eq!(mapper.model::<Person>().count().await.unwrap(), 8);
}
