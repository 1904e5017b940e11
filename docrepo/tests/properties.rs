mod common;

use docrepo::prelude::*;
use proptest::prelude::*;

use common::{BOROUGHS, Restaurant, names, restaurants};

fn store_with(count: usize) -> (BlockingDocumentStore<InMemoryStore>, Vec<Restaurant>) {
    common::init_logging();

    let store = BlockingDocumentStore::new(DocumentStore::new(InMemoryStore::new())).unwrap();
    let inserted = store
        .repository::<Restaurant>()
        .insert_many(restaurants(count))
        .unwrap();
    (store, inserted)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn pages_concatenate_to_the_full_result(
        count in 0usize..90,
        page_size in 1u64..25,
        borough in prop::option::of(0usize..BOROUGHS.len()),
        min_stars in 0i32..6,
        sort_field in 0usize..3,
        descending in any::<bool>(),
    ) {
        let (store, inserted) = store_with(count);
        let repo = store.repository::<Restaurant>();

        let mut criteria = Criteria::new().and(Restaurant::STARS.gte(min_stars));
        if let Some(borough) = borough {
            criteria = criteria.and(Restaurant::BOROUGH.eq(BOROUGHS[borough]));
        }
        criteria = match sort_field {
            0 => criteria.order_by(Restaurant::CUISINE.sort(descending)),
            1 => criteria.order_by(Restaurant::STARS.sort(descending)),
            _ => criteria,
        };

        let mut expected: Vec<Restaurant> = inserted
            .into_iter()
            .filter(|r| r.stars >= min_stars && borough.is_none_or(|b| r.borough == BOROUGHS[b]))
            .collect();
        expected.sort_by(|a, b| {
            let order = match sort_field {
                0 => a.cuisine.cmp(&b.cuisine),
                1 => a.stars.cmp(&b.stars),
                _ => std::cmp::Ordering::Equal,
            };
            if descending { order.reverse() } else { order }
        });

        let mut collected = Vec::new();
        let mut page_number = 1;
        loop {
            let page = repo.page(criteria.clone(), page_number, page_size).unwrap();
            prop_assert!(page.len() as u64 <= page_size);
            if page.is_empty() {
                break;
            }
            collected.extend(page);
            page_number += 1;
        }

        prop_assert_eq!(names(&collected), names(&expected));
        prop_assert_eq!(names(&repo.find(criteria.clone()).unwrap()), names(&expected));

        let pages = page_number - 1;
        if pages > 0 {
            let combined = repo.page(criteria, 1, pages * page_size).unwrap();
            prop_assert_eq!(names(&combined), names(&collected));
        }
    }

    #[test]
    fn equal_sort_keys_keep_arrival_order(count in 0usize..80, descending in any::<bool>()) {
        let (store, inserted) = store_with(count);
        let repo = store.repository::<Restaurant>();

        let sorted = repo.find(Criteria::new().order_by(Restaurant::CUISINE.sort(descending))).unwrap();

        let mut expected = inserted;
        expected.sort_by(|a, b| {
            let order = a.cuisine.cmp(&b.cuisine);
            if descending { order.reverse() } else { order }
        });
        prop_assert_eq!(names(&sorted), names(&expected));
    }

    #[test]
    fn dynamic_and_typed_filters_agree(
        borough in 0usize..BOROUGHS.len(),
        min_stars in 0i32..7,
        prefix in prop::sample::select(vec!["Do", "Golden", "Lu", "Shadow", "X"]),
    ) {
        let (store, inserted) = store_with(70);
        let repo = store.repository::<Restaurant>();
        let borough = BOROUGHS[borough];

        let dynamic = repo
            .find_str(&format!(
                r#"(Borough == "{borough}" AND Stars >= {min_stars}) OR Name.StartsWith("{prefix}")"#
            ))
            .unwrap();
        let typed = repo
            .find(
                Restaurant::BOROUGH
                    .eq(borough)
                    .and(Restaurant::STARS.gte(min_stars))
                    .or(Restaurant::NAME.starts_with(prefix)),
            )
            .unwrap();

        let expected: Vec<String> = inserted
            .iter()
            .filter(|r| (r.borough == borough && r.stars >= min_stars) || r.name.starts_with(prefix))
            .map(|r| r.name.clone())
            .collect();

        prop_assert_eq!(&dynamic, &typed);
        prop_assert_eq!(names(&dynamic), expected);
        prop_assert_eq!(repo.count_where(Restaurant::STARS.gte(min_stars)).unwrap(),
            inserted.iter().filter(|r| r.stars >= min_stars).count());
    }

    #[test]
    fn blocking_results_match_async_results(count in 0usize..60, page in 1u64..5, size in 1u64..15) {
        let (store, _) = store_with(count);
        let repo = store.repository::<Restaurant>();
        let criteria = Criteria::new()
            .and(Restaurant::STARS.lt(4))
            .order_by(Restaurant::BOROUGH.asc());

        let blocking = repo.paginate(criteria.clone(), page, size).unwrap();
        let asynchronous = store.block_on(repo.as_async().paginate(criteria, page, size)).unwrap();

        prop_assert_eq!(blocking, asynchronous);
    }
}
