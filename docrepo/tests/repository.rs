mod common;

use docrepo::{
    bson::{DateTime, oid::ObjectId},
    memory::InMemoryStoreBuilder,
    prelude::*,
};

use common::{Address, Restaurant, names, restaurant, seeded};

#[tokio::test]
async fn dynamic_filter_returns_matches_in_arrival_order() {
    let (store, inserted) = seeded(500).await;
    let repo = store.repository::<Restaurant>();

    let expected: Vec<String> = inserted
        .iter()
        .filter(|r| r.borough == "Manhattan" && r.name.contains("Do"))
        .map(|r| r.name.clone())
        .collect();
    assert!(!expected.is_empty());

    let dynamic = repo
        .find_str(r#"borough.Equals("Manhattan") AND name.Contains("Do")"#)
        .await
        .unwrap();
    let typed = repo
        .find(Restaurant::BOROUGH.eq("Manhattan").and(Restaurant::NAME.contains("Do")))
        .await
        .unwrap();

    assert_eq!(names(&dynamic), expected);
    assert_eq!(dynamic, typed);
}

#[tokio::test]
async fn string_operators_are_case_sensitive() {
    let (store, _) = seeded(50).await;
    let repo = store.repository::<Restaurant>();

    assert!(repo.find(Restaurant::NAME.contains("do")).await.unwrap().iter().all(|r| r.name.contains("do")));
    assert!(repo.find(Restaurant::NAME.starts_with("dom")).await.unwrap().is_empty());
    assert_eq!(repo.count_where(Restaurant::NAME.ends_with("#7")).await.unwrap(), 1);
}

#[tokio::test]
async fn page_three_of_thirty_five() {
    let (store, inserted) = seeded(500).await;
    let repo = store.repository::<Restaurant>();

    let page = repo.page(Criteria::new(), 3, 35).await.unwrap();

    assert_eq!(page.len(), 35);
    assert_eq!(names(&page), names(&inserted[70..105]));
}

#[tokio::test]
async fn paging_rejects_zero_arguments() {
    let (store, _) = seeded(5).await;
    let repo = store.repository::<Restaurant>();

    assert!(matches!(
        repo.page(Criteria::new(), 0, 10).await,
        Err(DocumentStoreError::InvalidArgument(_))
    ));
    assert!(matches!(
        repo.page(Criteria::new(), 1, 0).await,
        Err(DocumentStoreError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn paginate_reports_neighbours_and_count() {
    let (store, _) = seeded(100).await;
    let repo = store.repository::<Restaurant>();

    let bronx = Restaurant::BOROUGH.eq("Bronx");
    let first = repo.paginate(bronx.clone(), 1, 8).await.unwrap();
    let last = repo.paginate(bronx, 3, 8).await.unwrap();

    assert_eq!(first.count, 20);
    assert_eq!(first.items.len(), 8);
    assert_eq!(first.next_page, Some(2));
    assert_eq!(first.previous_page, None);
    assert_eq!(last.items.len(), 4);
    assert_eq!(last.next_page, None);
    assert_eq!(last.previous_page, Some(2));
}

#[tokio::test]
async fn ordered_queries_sort_stably() {
    let (store, inserted) = seeded(60).await;
    let repo = store.repository::<Restaurant>();

    let sorted = repo
        .find_str_ordered("stars >= 0", "borough desc, stars")
        .await
        .unwrap();

    let mut expected = inserted.clone();
    expected.sort_by(|a, b| b.borough.cmp(&a.borough).then(a.stars.cmp(&b.stars)));
    assert_eq!(names(&sorted), names(&expected));

    let typed = repo
        .find(
            Criteria::new()
                .order_by(Restaurant::BOROUGH.desc())
                .order_by(Restaurant::STARS.asc()),
        )
        .await
        .unwrap();
    assert_eq!(typed, sorted);
}

#[tokio::test]
async fn nested_fields_are_addressable() {
    let (store, inserted) = seeded(40).await;
    let repo = store.repository::<Restaurant>();

    let on_broadway = repo
        .find(Restaurant::ADDRESS.then(Address::STREET).eq("Broadway"))
        .await
        .unwrap();
    let dynamic = repo
        .find_str(r#"Address.Street == "Broadway""#)
        .await
        .unwrap();

    assert_eq!(on_broadway.len(), inserted.iter().filter(|r| r.address.street == "Broadway").count());
    assert_eq!(on_broadway, dynamic);

    let graded_a = repo.count_str(r#"grades.grade = "A""#).await.unwrap();
    assert_eq!(graded_a, inserted.iter().filter(|r| r.grades[0].grade == "A").count());
}

#[tokio::test]
async fn array_fields_match_elements() {
    let (store, inserted) = seeded(60).await;
    let repo = store.repository::<Restaurant>();

    let top = repo.find(Restaurant::TAGS.has("top rated")).await.unwrap();
    assert_eq!(names(&top), names(&inserted.iter().filter(|r| r.stars >= 4).cloned().collect::<Vec<_>>()));

    assert_eq!(repo.count_where(Restaurant::TAGS.has("ital")).await.unwrap(), 0);
    assert_eq!(repo.count_where(Restaurant::TAGS.has("top")).await.unwrap(), 0);
    assert_eq!(
        repo.count_where(Restaurant::TAGS.has("italian")).await.unwrap(),
        inserted.iter().filter(|r| r.cuisine == "Italian").count()
    );

    let top_italian = repo
        .count_where(Restaurant::TAGS.has_all(["italian", "top rated"]))
        .await
        .unwrap();
    assert_eq!(
        top_italian,
        inserted.iter().filter(|r| r.stars >= 4 && r.cuisine == "Italian").count()
    );

    let any_of = repo
        .count_where(Restaurant::BOROUGH.any_of(["Bronx", "Queens"]))
        .await
        .unwrap();
    assert_eq!(any_of, 24);
    assert_eq!(
        repo.count_where(Restaurant::BOROUGH.none_of(["Bronx", "Queens"])).await.unwrap(),
        36
    );
}

#[tokio::test]
async fn unknown_fields_and_bad_syntax_are_reported() {
    let (store, _) = seeded(3).await;
    let repo = store.repository::<Restaurant>();

    match repo.find_str(r#"rating > 3"#).await {
        Err(DocumentStoreError::FieldResolution { field, document }) => {
            assert_eq!(field, "rating");
            assert_eq!(document, "Restaurant");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    assert!(matches!(
        repo.find_str("borough ==").await,
        Err(DocumentStoreError::Parse { position: 10, .. })
    ));
    assert!(matches!(
        repo.find_str_ordered("stars > 1", "unknown desc").await,
        Err(DocumentStoreError::FieldResolution { .. })
    ));
}

#[tokio::test]
async fn first_and_last() {
    let (store, inserted) = seeded(30).await;
    let repo = store.repository::<Restaurant>();

    let first = repo.first_or_default(Restaurant::BOROUGH.eq("Queens")).await.unwrap();
    assert_eq!(first.unwrap().name, inserted[3].name);
    assert_eq!(repo.first_or_default_str(r#"borough = "Mars""#).await.unwrap(), None);

    let greatest = inserted
        .iter()
        .max_by_key(|r| ObjectId::parse_str(r.id.as_ref().unwrap()).unwrap())
        .unwrap();
    let last = repo.last(Criteria::new()).await.unwrap().unwrap();
    assert_eq!(last.id, greatest.id);

    let last_by_stars = repo
        .last(Criteria::new().order_by(Restaurant::STARS.asc()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(last_by_stars.stars, 5);
    assert_eq!(last_by_stars.name, inserted.iter().rev().find(|r| r.stars == 5).unwrap().name);
}

#[tokio::test]
async fn last_of_nothing_is_none() {
    common::init_logging();
    let store = DocumentStore::new(InMemoryStore::new());
    let repo = store.repository::<Restaurant>();

    assert_eq!(repo.last(Criteria::new()).await.unwrap(), None);
    assert_eq!(repo.last_str("stars > 2").await.unwrap(), None);
}

#[tokio::test]
async fn insert_assigns_identity_and_timestamp() {
    common::init_logging();
    let store = DocumentStore::new(InMemoryStore::new());
    let repo = store.repository::<Restaurant>();

    let before = DateTime::now();
    let inserted = repo.insert_one(restaurant(7)).await.unwrap();
    let after = DateTime::now();

    let id = inserted.id.clone().unwrap();
    let stamped = inserted.modified_on.unwrap();
    assert!(before <= stamped && stamped <= after);

    let fetched = repo.get_by_id(&id).await.unwrap().unwrap();
    assert_eq!(fetched, inserted);
    assert_eq!(repo.get_by_id(&ObjectId::new().to_hex()).await.unwrap(), None);
}

#[tokio::test]
async fn insert_many_of_nothing_is_a_no_op() {
    let (store, _) = seeded(2).await;
    let repo = store.repository::<Restaurant>();

    assert!(repo.insert_many(Vec::new()).await.unwrap().is_empty());
    assert_eq!(repo.count().await.unwrap(), 2);
}

#[tokio::test]
async fn duplicate_identity_is_a_write_error() {
    let (store, inserted) = seeded(3).await;
    let repo = store.repository::<Restaurant>();

    let mut duplicate = restaurant(99);
    duplicate.id = inserted[1].id.clone();

    let err = repo.insert_one(duplicate).await.unwrap_err();
    assert!(err.is_write(), "unexpected error: {err:?}");
    assert_eq!(repo.count().await.unwrap(), 3);
}

#[tokio::test]
async fn updates_stamp_the_modification_time() {
    let (store, inserted) = seeded(10).await;
    let repo = store.repository::<Restaurant>();
    let id = inserted[4].id.clone().unwrap();

    let before = DateTime::now();
    let acknowledged = repo
        .update_by_id(
            &id,
            Update::new()
                .set(Restaurant::CUISINE, "Thai")
                .inc(Restaurant::STARS, 10),
        )
        .await
        .unwrap();
    let after = DateTime::now();
    assert!(acknowledged);

    let updated = repo.get_by_id(&id).await.unwrap().unwrap();
    let stamped = updated.modified_on.unwrap();
    assert_eq!(updated.cuisine, "Thai");
    assert_eq!(updated.stars, inserted[4].stars + 10);
    assert!(before <= stamped && stamped <= after);

    let untouched = repo.get_by_id(inserted[5].id.as_ref().unwrap()).await.unwrap().unwrap();
    assert_eq!(untouched, inserted[5]);
}

#[tokio::test]
async fn updates_by_predicate() {
    let (store, _) = seeded(50).await;
    let repo = store.repository::<Restaurant>();

    assert!(repo
        .update_field(Restaurant::BOROUGH.eq("Bronx"), Restaurant::CUISINE, "Greek")
        .await
        .unwrap());
    assert!(repo
        .update(Restaurant::BOROUGH.eq("Mars"), Update::new().set(Restaurant::STARS, 0))
        .await
        .unwrap());

    assert_eq!(repo.count_where(Restaurant::CUISINE.eq("Greek")).await.unwrap(), 10);
    assert_eq!(
        repo.count_where(Restaurant::CUISINE.eq("Greek").and(Restaurant::BOROUGH.ne("Bronx")))
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn updating_identity_or_timestamp_is_rejected() {
    let (store, inserted) = seeded(1).await;
    let repo = store.repository::<Restaurant>();
    let id = inserted[0].id.clone().unwrap();

    assert!(matches!(
        repo.update_by_id(&id, Update::new().set(Restaurant::MODIFIED_ON, DateTime::now())).await,
        Err(DocumentStoreError::InvalidArgument(_))
    ));
    assert!(matches!(
        repo.update_by_id(&id, Update::new().set_path("_id", "other")).await,
        Err(DocumentStoreError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn replace_requires_an_existing_document() {
    let (store, inserted) = seeded(5).await;
    let repo = store.repository::<Restaurant>();

    let mut missing = restaurant(42);
    missing.id = Some(ObjectId::new().to_hex());
    assert!(!repo.replace_one(&missing).await.unwrap());
    assert_eq!(repo.count().await.unwrap(), 5);

    assert!(matches!(
        repo.replace_one(&restaurant(43)).await,
        Err(DocumentStoreError::InvalidArgument(_))
    ));

    let mut renamed = inserted[2].clone();
    renamed.name = "Katz's Delicatessen".into();
    assert!(repo.replace_one(&renamed).await.unwrap());

    let stored = repo.to_list().await.unwrap();
    assert_eq!(stored[2].name, "Katz's Delicatessen");
    assert_eq!(stored[2].id, inserted[2].id);
    assert!(stored[2].modified_on >= inserted[2].modified_on);
}

#[tokio::test]
async fn deletes() {
    let (store, inserted) = seeded(20).await;
    let repo = store.repository::<Restaurant>();

    assert!(repo.delete(&inserted[0]).await.unwrap());
    assert!(repo.delete_by_id(inserted[1].id.as_ref().unwrap()).await.unwrap());
    assert!(repo.delete_by_id(&ObjectId::new().to_hex()).await.unwrap());
    assert_eq!(repo.count().await.unwrap(), 18);

    assert!(repo.delete_many(Restaurant::STARS.lt(3)).await.unwrap());
    let remaining = repo.to_list().await.unwrap();
    assert!(remaining.iter().all(|r| r.stars >= 3));
    assert_eq!(
        names(&remaining),
        names(&inserted[2..].iter().filter(|r| r.stars >= 3).cloned().collect::<Vec<_>>())
    );

    assert!(matches!(
        repo.delete(&restaurant(1)).await,
        Err(DocumentStoreError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn counts() {
    let (store, inserted) = seeded(500).await;
    let repo = store.repository::<Restaurant>();

    assert_eq!(repo.count().await.unwrap(), 500);
    assert_eq!(repo.long_count().await.unwrap(), 500);
    assert_eq!(repo.count_where(Restaurant::BOROUGH.eq("Bronx")).await.unwrap(), 100);
    assert_eq!(repo.long_count_where(Restaurant::STARS.gte(3)).await.unwrap(), 249);
    assert_eq!(
        repo.count_str(r#"cuisine = "Italian" || stars = 1"#).await.unwrap(),
        inserted.iter().filter(|r| r.cuisine == "Italian" || r.stars == 1).count()
    );
}

#[tokio::test]
async fn client_side_evaluation_matches_native_results() {
    let (native_store, _) = seeded(120).await;
    let fallback_store = DocumentStore::new(
        InMemoryStoreBuilder::default()
            .unsupported_operator(FieldOp::Contains)
            .build()
            .await
            .unwrap(),
    );
    fallback_store
        .repository::<Restaurant>()
        .insert_many(common::restaurants(120))
        .await
        .unwrap();

    let native = native_store.repository::<Restaurant>();
    let fallback = fallback_store.repository::<Restaurant>();
    let criteria = Criteria::new()
        .and(Restaurant::NAME.contains("Do").or(Restaurant::STARS.eq(2)))
        .order_by(Restaurant::BOROUGH.asc())
        .page(2, 7)
        .unwrap();

    assert_eq!(
        names(&native.query(&criteria).await.unwrap()),
        names(&fallback.query(&criteria).await.unwrap())
    );
    assert_eq!(
        native.count_where(Restaurant::NAME.contains("Do")).await.unwrap(),
        fallback.count_where(Restaurant::NAME.contains("Do")).await.unwrap()
    );

    assert!(fallback
        .update_field(Restaurant::NAME.contains("Dragon"), Restaurant::CUISINE, "Sichuan")
        .await
        .unwrap());
    assert!(fallback.delete_many(Restaurant::NAME.contains("Star")).await.unwrap());

    let remaining = fallback.to_list().await.unwrap();
    assert!(remaining.iter().all(|r| !r.name.contains("Star")));
    assert!(remaining
        .iter()
        .filter(|r| r.name.contains("Dragon"))
        .all(|r| r.cuisine == "Sichuan"));
}
