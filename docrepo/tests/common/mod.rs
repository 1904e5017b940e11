#![allow(dead_code)]

use std::sync::Once;

use docrepo::{bson::DateTime, prelude::*};

pub const BOROUGHS: [&str; 5] = ["Manhattan", "Bronx", "Brooklyn", "Queens", "Staten Island"];
pub const NAMES: [&str; 7] = [
    "Dominick's",
    "Donut Plaza",
    "Golden Dragon",
    "Shadow Diner",
    "Ludo Cafe",
    "Doyers Tea",
    "Lucky Star",
];
pub const CUISINES: [&str; 3] = ["Italian", "Chinese", "American"];

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(colog::init);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Embedded)]
pub struct Address {
    pub building: String,
    pub street: String,
    pub zipcode: String,
    pub coord: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Embedded)]
pub struct Grade {
    pub date: DateTime,
    pub grade: String,
    pub score: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
#[document(collection = "restaurants")]
pub struct Restaurant {
    pub id: Option<String>,
    pub modified_on: Option<DateTime>,
    pub restaurant_id: String,
    pub name: String,
    pub borough: String,
    pub cuisine: String,
    pub stars: i32,
    pub tags: Vec<String>,
    pub address: Address,
    pub grades: Vec<Grade>,
}

/// A restaurant whose fields are all derived from `i`.
pub fn restaurant(i: usize) -> Restaurant {
    Restaurant {
        id: None,
        modified_on: None,
        restaurant_id: format!("{:08}", 40_000_000 + i),
        name: format!("{} #{}", NAMES[i % NAMES.len()], i),
        borough: BOROUGHS[i % BOROUGHS.len()].to_string(),
        cuisine: CUISINES[i % CUISINES.len()].to_string(),
        stars: (i % 6) as i32,
        tags: if i % 6 >= 4 {
            vec![CUISINES[i % CUISINES.len()].to_lowercase(), "top rated".into()]
        } else {
            vec![CUISINES[i % CUISINES.len()].to_lowercase()]
        },
        address: Address {
            building: format!("{}", 100 + i),
            street: if i % 2 == 0 { "Broadway".into() } else { "Arthur Avenue".into() },
            zipcode: format!("{}", 10_000 + i % 50),
            coord: vec![-73.9 - (i as f64) / 1000.0, 40.7],
        },
        grades: vec![Grade {
            date: DateTime::from_millis(1_600_000_000_000 + i as i64 * 86_400_000),
            grade: ["A", "B", "C"][i % 3].to_string(),
            score: Some((i % 30) as i32),
        }],
    }
}

pub fn restaurants(count: usize) -> Vec<Restaurant> {
    (0..count).map(restaurant).collect()
}

pub fn names(restaurants: &[Restaurant]) -> Vec<String> {
    restaurants.iter().map(|r| r.name.clone()).collect()
}

/// A store holding `count` fixture restaurants, with the inserted documents in arrival order.
pub async fn seeded(count: usize) -> (DocumentStore<InMemoryStore>, Vec<Restaurant>) {
    init_logging();

    let store = DocumentStore::new(InMemoryStore::new());
    let inserted = store
        .repository::<Restaurant>()
        .insert_many(restaurants(count))
        .await
        .unwrap();

    (store, inserted)
}
