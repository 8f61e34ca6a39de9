//! Behaviour tests for list envelope normalisation and page translation.

use std::cell::RefCell;

use pagination::{EnvelopeShape, ListQuery, NormalizedList, PageRequest, normalize_list};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};

#[derive(Default)]
struct EnvelopeWorld {
    page: RefCell<Option<PageRequest>>,
    pairs: RefCell<Vec<(String, String)>>,
    response: RefCell<Value>,
    normalised: RefCell<Option<NormalizedList>>,
}

impl EnvelopeWorld {
    fn pair(&self, name: &str) -> Option<String> {
        self.pairs
            .borrow()
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    fn with_normalised<F>(&self, f: F)
    where
        F: FnOnce(&NormalizedList),
    {
        let normalised = self.normalised.borrow();
        f(normalised.as_ref().expect("response should be normalised"));
    }
}

fn rows(count: usize) -> Vec<Value> {
    (1..=count).map(|id| json!({ "id": id })).collect()
}

#[fixture]
fn world() -> EnvelopeWorld {
    EnvelopeWorld::default()
}

#[given("the screen is on page {page} with {size} rows per page")]
fn the_screen_is_on_page(world: &EnvelopeWorld, page: u32, size: u32) {
    let request = PageRequest::new(page, size).expect("valid page request");
    *world.page.borrow_mut() = Some(request);
}

#[given("a list response with {count} rows under content and totalElements {total}")]
fn a_content_response(world: &EnvelopeWorld, count: usize, total: u64) {
    *world.response.borrow_mut() = json!({ "content": rows(count), "totalElements": total });
}

#[given("a bare array response with {count} rows")]
fn a_bare_array_response(world: &EnvelopeWorld, count: usize) {
    *world.response.borrow_mut() = Value::Array(rows(count));
}

#[given("a plain text response")]
fn a_plain_text_response(world: &EnvelopeWorld) {
    *world.response.borrow_mut() = json!("service temporarily unavailable");
}

#[when("the list query is built")]
fn the_list_query_is_built(world: &EnvelopeWorld) {
    let page = world.page.borrow().expect("page should be set");
    *world.pairs.borrow_mut() = ListQuery::paged(page).to_pairs();
}

#[when("the response is normalised")]
fn the_response_is_normalised(world: &EnvelopeWorld) {
    let normalised = normalize_list(&world.response.borrow(), "users");
    *world.normalised.borrow_mut() = Some(normalised);
}

#[then("the backend page parameter is {expected}")]
fn the_backend_page_parameter_is(world: &EnvelopeWorld, expected: String) {
    assert_eq!(world.pair("page"), Some(expected));
}

#[then("the size parameter is {expected}")]
fn the_size_parameter_is(world: &EnvelopeWorld, expected: String) {
    assert_eq!(world.pair("size"), Some(expected));
}

#[then("{count} rows are extracted")]
fn rows_are_extracted(world: &EnvelopeWorld, count: usize) {
    world.with_normalised(|list| assert_eq!(list.items.len(), count));
}

#[then("the total is {total}")]
fn the_total_is(world: &EnvelopeWorld, total: u64) {
    world.with_normalised(|list| assert_eq!(list.total, total));
}

#[then("the shape is unrecognised")]
fn the_shape_is_unrecognised(world: &EnvelopeWorld) {
    world.with_normalised(|list| assert_eq!(list.shape, EnvelopeShape::Unrecognised));
}

// -----------------------------------------------------------------------------
// Scenario Bindings
// -----------------------------------------------------------------------------

#[scenario(
    path = "tests/features/list_envelopes.feature",
    name = "First screen page is requested as backend page one"
)]
fn first_screen_page_is_backend_page_one(world: EnvelopeWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/list_envelopes.feature",
    name = "Content envelope reports its own total"
)]
fn content_envelope_reports_total(world: EnvelopeWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/list_envelopes.feature",
    name = "Bare array response counts its rows"
)]
fn bare_array_counts_rows(world: EnvelopeWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/list_envelopes.feature",
    name = "Unknown response shape degrades to an empty list"
)]
fn unknown_shape_degrades(world: EnvelopeWorld) {
    let _ = world;
}
