//! Pagination state kept in the location query string.
//!
//! The location (`?page=3&size=20`) is the only stored copy of the pagination
//! state. `PaginationSync::state` re-derives page index and size from it on
//! every call, and the grid receives that projection on each render, so there
//! is no second mutable copy to drift out of sync.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::form_urlencoded;

/// Page sizes the grid offers
pub const PAGE_SIZES: [usize; 5] = [10, 20, 30, 40, 50];

const PAGE_PARAM: &str = "page";
const SIZE_PARAM: &str = "size";

/// A page size from the allowed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct PageSize(usize);

impl PageSize {
  /// Returns `None` for sizes outside `PAGE_SIZES`
  pub fn new(size: usize) -> Option<Self> {
    PAGE_SIZES.contains(&size).then_some(Self(size))
  }

  pub fn get(self) -> usize {
    self.0
  }

  fn position(self) -> usize {
    PAGE_SIZES.iter().position(|s| *s == self.0).unwrap_or(0)
  }

  /// Next larger size, wrapping to the smallest
  pub fn next(self) -> Self {
    Self(PAGE_SIZES[(self.position() + 1) % PAGE_SIZES.len()])
  }

  /// Next smaller size, wrapping to the largest
  pub fn prev(self) -> Self {
    let len = PAGE_SIZES.len();
    Self(PAGE_SIZES[(self.position() + len - 1) % len])
  }
}

impl Default for PageSize {
  fn default() -> Self {
    Self(PAGE_SIZES[0])
  }
}

impl TryFrom<usize> for PageSize {
  type Error = String;

  fn try_from(size: usize) -> Result<Self, Self::Error> {
    Self::new(size).ok_or_else(|| format!("page size must be one of {:?}, got {}", PAGE_SIZES, size))
  }
}

impl From<PageSize> for usize {
  fn from(size: PageSize) -> usize {
    size.0
  }
}

impl fmt::Display for PageSize {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Zero-based page index and page size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaginationState {
  pub page_index: usize,
  pub page_size: PageSize,
}

impl PaginationState {
  pub fn new(page_index: usize, page_size: PageSize) -> Self {
    Self {
      page_index,
      page_size,
    }
  }

  /// Number of pages for `total_rows` rows. An empty set still has one page.
  pub fn page_count(&self, total_rows: usize) -> usize {
    total_rows.div_ceil(self.page_size.get()).max(1)
  }

  /// Same state with the page index pulled back inside `total_rows`
  pub fn clamped(self, total_rows: usize) -> Self {
    let last = self.page_count(total_rows) - 1;
    Self {
      page_index: self.page_index.min(last),
      ..self
    }
  }

  /// Index of the first row on this page
  pub fn offset(&self) -> usize {
    self.page_index.saturating_mul(self.page_size.get())
  }

  /// Change the page size, keeping the current first row visible
  pub fn with_page_size(self, page_size: PageSize) -> Self {
    Self {
      page_index: self.offset() / page_size.get(),
      page_size,
    }
  }
}

/// An update in the shape the grid hands out: a replacement state, or a
/// function from the previous state to the next.
pub enum PaginationUpdate {
  Set(PaginationState),
  Map(Box<dyn FnOnce(PaginationState) -> PaginationState + Send>),
}

impl PaginationUpdate {
  pub fn map(f: impl FnOnce(PaginationState) -> PaginationState + Send + 'static) -> Self {
    Self::Map(Box::new(f))
  }

  fn apply(self, previous: PaginationState) -> PaginationState {
    match self {
      Self::Set(state) => state,
      Self::Map(f) => f(previous),
    }
  }
}

impl From<PaginationState> for PaginationUpdate {
  fn from(state: PaginationState) -> Self {
    Self::Set(state)
  }
}

/// Keeps pagination state in a location query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationSync {
  params: Vec<(String, String)>,
  default_size: PageSize,
}

impl PaginationSync {
  /// Start from a location such as `?page=3&size=20` (the leading `?` is optional)
  pub fn new(location: &str, default_size: PageSize) -> Self {
    Self {
      params: parse_query(location),
      default_size,
    }
  }

  /// Current location, `""` when there are no parameters
  pub fn location(&self) -> String {
    if self.params.is_empty() {
      return String::new();
    }
    let query = form_urlencoded::Serializer::new(String::new())
      .extend_pairs(&self.params)
      .finish();
    format!("?{}", query)
  }

  /// Derive the pagination state from the location.
  ///
  /// A missing or malformed `page` means the first page; a `size` outside the
  /// allowed set means the default size.
  pub fn state(&self) -> PaginationState {
    let page_index = self.param(PAGE_PARAM).map(parse_page_index).unwrap_or(0);
    let page_size = self
      .param(SIZE_PARAM)
      .and_then(parse_page_size)
      .unwrap_or(self.default_size);
    PaginationState::new(page_index, page_size)
  }

  /// Apply an update and write the result back to the location.
  pub fn on_change(&mut self, update: impl Into<PaginationUpdate>) -> PaginationState {
    let next = update.into().apply(self.state());
    self.write(next);
    self.state()
  }

  /// Replace the location wholesale (e.g. the user typed a new one).
  pub fn navigate(&mut self, location: &str) -> PaginationState {
    self.params = parse_query(location);
    self.state()
  }

  fn param(&self, name: &str) -> Option<&str> {
    self
      .params
      .iter()
      .find(|(key, _)| key == name)
      .map(|(_, value)| value.as_str())
  }

  fn write(&mut self, state: PaginationState) {
    let page = state.page_index.saturating_add(1).to_string();
    self.set_param(PAGE_PARAM, Some(page));

    let size = (state.page_size != self.default_size).then(|| state.page_size.to_string());
    self.set_param(SIZE_PARAM, size);
  }

  /// Set (or with `None`, delete) a parameter, keeping its position and the
  /// other parameters intact
  fn set_param(&mut self, name: &str, value: Option<String>) {
    let position = self.params.iter().position(|(key, _)| key == name);
    self.params.retain(|(key, _)| key != name);

    if let Some(value) = value {
      let entry = (name.to_string(), value);
      match position {
        Some(index) => self.params.insert(index.min(self.params.len()), entry),
        None => self.params.push(entry),
      }
    }
  }
}

fn parse_query(location: &str) -> Vec<(String, String)> {
  let query = location.trim();
  let query = query.strip_prefix('?').unwrap_or(query);
  form_urlencoded::parse(query.as_bytes())
    .into_owned()
    .collect()
}

/// One-based page number to zero-based index
fn parse_page_index(value: &str) -> usize {
  match value.trim().parse::<usize>() {
    Ok(page) if page > 0 => page - 1,
    _ => 0,
  }
}

fn parse_page_size(value: &str) -> Option<PageSize> {
  value.trim().parse::<usize>().ok().and_then(PageSize::new)
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  fn size(n: usize) -> PageSize {
    PageSize::new(n).unwrap()
  }

  #[test]
  fn test_empty_location_defaults() {
    let sync = PaginationSync::new("", size(10));
    assert_eq!(sync.state(), PaginationState::new(0, size(10)));
    assert_eq!(sync.location(), "");
  }

  #[test]
  fn test_invalid_size_falls_back_but_page_is_kept() {
    let sync = PaginationSync::new("?size=15&page=3", size(10));
    assert_eq!(sync.state(), PaginationState::new(2, size(10)));
  }

  #[test]
  fn test_valid_size_is_honoured() {
    let sync = PaginationSync::new("page=2&size=40", size(10));
    assert_eq!(sync.state(), PaginationState::new(1, size(40)));
  }

  #[test]
  fn test_malformed_page_means_first_page() {
    for location in ["?page=0", "?page=-2", "?page=abc", "?page=", "?page=99999999999999999999999"] {
      let sync = PaginationSync::new(location, size(10));
      assert_eq!(sync.state().page_index, 0, "location {}", location);
    }
  }

  #[test]
  fn test_on_change_writes_one_based_page() {
    let mut sync = PaginationSync::new("", size(10));
    sync.on_change(PaginationState::new(4, size(10)));
    assert_eq!(sync.location(), "?page=5");
  }

  #[test]
  fn test_default_size_is_omitted() {
    let mut sync = PaginationSync::new("?page=1&size=30", size(10));
    sync.on_change(PaginationState::new(0, size(10)));
    assert_eq!(sync.location(), "?page=1");

    sync.on_change(PaginationState::new(0, size(20)));
    assert_eq!(sync.location(), "?page=1&size=20");
  }

  #[test]
  fn test_other_params_are_preserved() {
    let mut sync = PaginationSync::new("?q=phone&page=2", size(10));
    sync.on_change(PaginationUpdate::map(|s| PaginationState {
      page_index: s.page_index + 1,
      ..s
    }));
    assert_eq!(sync.location(), "?q=phone&page=3");
  }

  #[test]
  fn test_functional_update_sees_previous_state() {
    let mut sync = PaginationSync::new("?page=3&size=20", size(10));
    let state = sync.on_change(PaginationUpdate::map(|s| s.with_page_size(size(40))));
    // First row of page 3 at size 20 is row 40, which is on page 2 at size 40
    assert_eq!(state, PaginationState::new(1, size(40)));
    assert_eq!(sync.location(), "?page=2&size=40");
  }

  #[test]
  fn test_navigate_rederives_state() {
    let mut sync = PaginationSync::new("?page=3", size(10));
    let state = sync.navigate("?page=7&size=50");
    assert_eq!(state, PaginationState::new(6, size(50)));
    assert_eq!(sync.state(), state);
  }

  #[test]
  fn test_page_count_and_clamp() {
    let state = PaginationState::new(9, size(10));
    assert_eq!(state.page_count(0), 1);
    assert_eq!(state.page_count(10), 1);
    assert_eq!(state.page_count(11), 2);
    assert_eq!(state.clamped(25).page_index, 2);
    assert_eq!(state.clamped(0).page_index, 0);
    assert_eq!(state.clamped(1000).page_index, 9);
  }

  #[test]
  fn test_page_size_cycles() {
    assert_eq!(size(10).next(), size(20));
    assert_eq!(size(50).next(), size(10));
    assert_eq!(size(10).prev(), size(50));
    assert!(PageSize::new(15).is_none());
  }

  #[test]
  fn test_page_size_deserialize() {
    let ok: PageSize = serde_yaml::from_str("30").unwrap();
    assert_eq!(ok, size(30));
    assert!(serde_yaml::from_str::<PageSize>("15").is_err());
  }

  #[derive(Debug, Clone)]
  enum Op {
    Set(usize, usize),
    Next,
    Prev,
    Resize(usize),
    Navigate(usize, usize),
  }

  fn op_strategy() -> impl Strategy<Value = Op> {
    let size = prop::sample::select(PAGE_SIZES.to_vec());
    prop_oneof![
      (0usize..10_000, size.clone()).prop_map(|(i, s)| Op::Set(i, s)),
      Just(Op::Next),
      Just(Op::Prev),
      size.clone().prop_map(Op::Resize),
      (1usize..10_000, size).prop_map(|(p, s)| Op::Navigate(p, s)),
    ]
  }

  proptest! {
    /// After any sequence of changes, re-reading the written location gives
    /// back the in-memory state, and that state is what the update asked for.
    #[test]
    fn prop_location_and_state_agree(
      default in prop::sample::select(PAGE_SIZES.to_vec()),
      ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
      let default = PageSize::new(default).unwrap();
      let mut sync = PaginationSync::new("", default);

      for op in ops {
        let expected = match op {
          Op::Set(index, s) => {
            let wanted = PaginationState::new(index, PageSize::new(s).unwrap());
            let got = sync.on_change(wanted);
            prop_assert_eq!(got, wanted);
            wanted
          }
          Op::Next => {
            let before = sync.state();
            sync.on_change(PaginationUpdate::map(|s| PaginationState { page_index: s.page_index + 1, ..s }));
            PaginationState { page_index: before.page_index + 1, ..before }
          }
          Op::Prev => {
            let before = sync.state();
            sync.on_change(PaginationUpdate::map(|s| PaginationState { page_index: s.page_index.saturating_sub(1), ..s }));
            PaginationState { page_index: before.page_index.saturating_sub(1), ..before }
          }
          Op::Resize(s) => {
            let before = sync.state();
            let new_size = PageSize::new(s).unwrap();
            sync.on_change(PaginationUpdate::map(move |st| st.with_page_size(new_size)));
            before.with_page_size(new_size)
          }
          Op::Navigate(page, s) => {
            sync.navigate(&format!("?page={}&size={}", page, s));
            PaginationState::new(page - 1, PageSize::new(s).unwrap())
          }
        };

        prop_assert_eq!(sync.state(), expected);
        let reparsed = PaginationSync::new(&sync.location(), default);
        prop_assert_eq!(reparsed.state(), sync.state());
      }
    }
  }
}
