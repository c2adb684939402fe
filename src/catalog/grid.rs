//! Client-side data grid: filter, sort and paginate an in-memory row set.

use crate::api::types::Product;
use crate::catalog::pagination::PaginationState;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Grid columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
  Id,
  Title,
  Brand,
  Category,
  Price,
  Rating,
  Stock,
}

impl Column {
  pub const ALL: [Column; 7] = [
    Column::Id,
    Column::Title,
    Column::Brand,
    Column::Category,
    Column::Price,
    Column::Rating,
    Column::Stock,
  ];

  pub fn label(&self) -> &'static str {
    match self {
      Column::Id => "Id",
      Column::Title => "Title",
      Column::Brand => "Brand",
      Column::Category => "Category",
      Column::Price => "Price",
      Column::Rating => "Rating",
      Column::Stock => "Stock",
    }
  }

  /// Id and title identify a row and always stay visible
  pub fn can_hide(&self) -> bool {
    !matches!(self, Column::Id | Column::Title)
  }

  fn compare(&self, a: &Product, b: &Product) -> Ordering {
    match self {
      Column::Id => a.id.cmp(&b.id),
      Column::Title => compare_text(&a.title, &b.title),
      Column::Brand => compare_text(&a.brand, &b.brand),
      Column::Category => compare_text(&a.category, &b.category),
      Column::Price => a.price.total_cmp(&b.price),
      Column::Rating => a.rating.total_cmp(&b.rating),
      Column::Stock => a.stock.cmp(&b.stock),
    }
  }
}

fn compare_text(a: &str, b: &str) -> Ordering {
  a.to_lowercase().cmp(&b.to_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
  Asc,
  Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
  pub column: Column,
  pub direction: SortDirection,
}

/// One rendered page of the grid
#[derive(Debug)]
pub struct GridPage<'a> {
  /// Rows on this page
  pub rows: Vec<&'a Product>,
  /// Pagination state after clamping to the filtered row count
  pub state: PaginationState,
  pub page_count: usize,
  /// Rows matching the filter, across all pages
  pub filtered_rows: usize,
}

/// Sorting, filtering and column visibility for the product grid
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataGrid {
  sort: Option<Sort>,
  title_filter: String,
  hidden: BTreeSet<Column>,
}

impl DataGrid {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn sort(&self) -> Option<Sort> {
    self.sort
  }

  /// Cycle a column through ascending, descending and unsorted
  pub fn toggle_sort(&mut self, column: Column) {
    self.sort = match self.sort {
      Some(Sort {
        column: current,
        direction: SortDirection::Asc,
      }) if current == column => Some(Sort {
        column,
        direction: SortDirection::Desc,
      }),
      Some(Sort {
        column: current,
        direction: SortDirection::Desc,
      }) if current == column => None,
      _ => Some(Sort {
        column,
        direction: SortDirection::Asc,
      }),
    };
  }

  pub fn title_filter(&self) -> &str {
    &self.title_filter
  }

  pub fn set_title_filter(&mut self, value: &str) {
    self.title_filter = value.to_string();
  }

  pub fn is_filtered(&self) -> bool {
    !self.title_filter.is_empty()
  }

  pub fn reset_filters(&mut self) {
    self.title_filter.clear();
  }

  pub fn is_visible(&self, column: Column) -> bool {
    !self.hidden.contains(&column)
  }

  /// Toggle a column's visibility. Returns the new visibility.
  pub fn toggle_column(&mut self, column: Column) -> bool {
    if !column.can_hide() {
      return true;
    }
    if !self.hidden.remove(&column) {
      self.hidden.insert(column);
    }
    self.is_visible(column)
  }

  pub fn visible_columns(&self) -> Vec<Column> {
    Column::ALL
      .into_iter()
      .filter(|c| self.is_visible(*c))
      .collect()
  }

  fn matches(&self, product: &Product) -> bool {
    self.title_filter.is_empty()
      || product
        .title
        .to_lowercase()
        .contains(&self.title_filter.to_lowercase())
  }

  /// Filtered and sorted rows
  pub fn rows<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
    let mut rows: Vec<&Product> = products.iter().filter(|p| self.matches(p)).collect();

    if let Some(sort) = self.sort {
      rows.sort_by(|a, b| {
        let ordering = sort.column.compare(a, b);
        match sort.direction {
          SortDirection::Asc => ordering,
          SortDirection::Desc => ordering.reverse(),
        }
      });
    }

    rows
  }

  /// Rows for one page. The page index is clamped so it never points past the
  /// last page of the filtered set.
  pub fn page<'a>(&self, products: &'a [Product], state: PaginationState) -> GridPage<'a> {
    let rows = self.rows(products);
    let filtered_rows = rows.len();
    let state = state.clamped(filtered_rows);
    let rows = rows
      .into_iter()
      .skip(state.offset())
      .take(state.page_size.get())
      .collect();

    GridPage {
      rows,
      state,
      page_count: state.page_count(filtered_rows),
      filtered_rows,
    }
  }
}
