//! End-to-end specification evaluation against both backends

mod common;

use std::sync::Arc;

use acton_data::filter::FilterCondition;
use acton_data::pagination::PaginationFilter;
use acton_data::query::{MemoryQuery, ProjectedQueryable, Projector, Queryable};
use acton_data::specification::evaluators::{
    InMemorySpecificationEvaluator, SpecificationEvaluator,
};
use acton_data::specification::{ProjectionSpecification, Specification, SpecificationValidator};
use acton_data::store::IncludeLoaderRegistry;
use tokio_util::sync::CancellationToken;

use common::{roster, user, TestUser};

type Evaluator = SpecificationEvaluator<TestUser, MemoryQuery<TestUser>>;

#[tokio::test]
async fn search_filters_to_matching_names() {
    common::init_tracing();
    // Substring "ap" plus an explicit filter on active.
    let spec = Specification::<TestUser>::builder()
        .filter(FilterCondition::eq("active", true))
        .unwrap()
        .search("name", "ap")
        .unwrap()
        .order_by("name")
        .unwrap()
        .build();

    let rows = Evaluator::default()
        .apply(MemoryQuery::new(roster()), &spec)
        .unwrap()
        .to_list(CancellationToken::new())
        .await
        .unwrap();
    let names: Vec<&str> = rows.iter().map(|u| u.name.as_str()).collect();
    // apricot matches "ap" but is inactive; avocado does not contain "ap".
    assert_eq!(names, vec!["apple"]);
}

#[tokio::test]
async fn ordered_window_takes_middle_of_descending_sort() {
    let spec = Specification::<TestUser>::builder()
        .order_by_descending("age")
        .unwrap()
        .skip(1)
        .unwrap()
        .take(2)
        .unwrap()
        .build();

    let rows = Evaluator::default()
        .apply(MemoryQuery::new(roster()), &spec)
        .unwrap()
        .to_list(CancellationToken::new())
        .await
        .unwrap();
    let names: Vec<&str> = rows.iter().map(|u| u.name.as_str()).collect();
    // Ages descending: avocado 40, cherry 35, apple 30, banana 25, apricot 22.
    assert_eq!(names, vec!["cherry", "apple"]);
}

#[tokio::test]
async fn both_backends_agree_on_the_same_specification() {
    let build = || {
        Specification::<TestUser>::builder()
            .filter(FilterCondition::gte("age", 25_i64))
            .unwrap()
            .search("name", "a")
            .unwrap()
            .order_by("age")
            .unwrap()
            .then_by("name")
            .unwrap()
            .with_pagination_filter(PaginationFilter::new(1, 3))
            .unwrap()
            .build()
    };

    let query_side = Evaluator::default()
        .apply(MemoryQuery::new(roster()), &build())
        .unwrap()
        .to_list(CancellationToken::new())
        .await
        .unwrap();
    let memory_side = InMemorySpecificationEvaluator::default()
        .evaluate(roster(), &build())
        .unwrap();

    assert_eq!(query_side, memory_side);
    assert_eq!(query_side.len(), 3);
}

#[test]
fn one_specification_instance_evaluates_identically_twice() {
    let spec = Specification::<TestUser>::builder()
        .filter(FilterCondition::gte("age", 25_i64))
        .unwrap()
        .search("name", "a")
        .unwrap()
        .order_by_descending("age")
        .unwrap()
        .take(3)
        .unwrap()
        .build();
    let evaluator = InMemorySpecificationEvaluator::default();

    // The second pass reuses the delegates compiled during the first.
    let first = evaluator.evaluate(roster(), &spec).unwrap();
    let second = evaluator.evaluate(roster(), &spec).unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn group_by_clusters_rows_by_field() {
    let spec = Specification::<TestUser>::builder()
        .order_by("id")
        .unwrap()
        .group_by("active")
        .build();

    let rows = Evaluator::default()
        .apply(MemoryQuery::new(roster()), &spec)
        .unwrap()
        .to_list(CancellationToken::new())
        .await
        .unwrap();
    // Active users first (id order puts an active user at position 0),
    // then the inactive cluster.
    let actives: Vec<bool> = rows.iter().map(|u| u.active).collect();
    assert_eq!(actives, vec![true, true, true, false, false]);
}

#[tokio::test]
async fn typed_includes_run_registered_loaders() {
    struct Profile;

    let registry = Arc::new(IncludeLoaderRegistry::new());
    registry.register::<TestUser, Profile>(|u: &mut TestUser| {
        u.email = Some(format!("{}@loaded.example", u.name));
    });

    let spec = Specification::<TestUser>::builder()
        .include::<Profile>("profile")
        .unwrap()
        .take(2)
        .unwrap()
        .build();

    let rows = Evaluator::default()
        .apply(MemoryQuery::with_loaders(roster(), registry), &spec)
        .unwrap()
        .to_list(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows
        .iter()
        .all(|u| u.email.as_deref().is_some_and(|e| e.ends_with("@loaded.example"))));
}

#[tokio::test]
async fn projection_runs_after_shaping() {
    let spec = ProjectionSpecification::<TestUser, (String, i64)>::builder()
        .filter(FilterCondition::eq("active", true))
        .unwrap()
        .order_by_descending("age")
        .unwrap()
        .select(Arc::new(|u: TestUser| (u.name, u.age)) as Projector<TestUser, (String, i64)>)
        .build();

    let pairs = Evaluator::default()
        .apply_projected(MemoryQuery::new(roster()), &spec)
        .unwrap()
        .to_list(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        pairs,
        vec![
            ("cherry".to_string(), 35),
            ("apple".to_string(), 30),
            ("banana".to_string(), 25),
        ]
    );
}

#[test]
fn validator_agrees_with_filter_evaluation() {
    let spec = Specification::<TestUser>::builder()
        .filter(FilterCondition::eq("active", true))
        .unwrap()
        .search("name", "ap")
        .unwrap()
        .build();
    let validator = SpecificationValidator::default();

    let survivors = InMemorySpecificationEvaluator::default()
        .evaluate(roster(), &spec)
        .unwrap();
    for candidate in roster() {
        let satisfied = validator.is_satisfied_by(&spec, &candidate);
        assert_eq!(satisfied, survivors.contains(&candidate));
    }
}

#[tokio::test]
async fn null_fields_never_match_filters_or_search() {
    let mut rows = roster();
    rows.push(TestUser {
        email: None,
        ..user(6, "no-email", true, 50)
    });

    let spec = Specification::<TestUser>::builder()
        .search("email", "example")
        .unwrap()
        .build();
    let found = Evaluator::default()
        .apply(MemoryQuery::new(rows.clone()), &spec)
        .unwrap()
        .to_list(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(found.len(), 5);

    let spec = Specification::<TestUser>::builder()
        .filter(FilterCondition::is_null("email"))
        .unwrap()
        .build();
    let found = Evaluator::default()
        .apply(MemoryQuery::new(rows), &spec)
        .unwrap()
        .to_list(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "no-email");
}
