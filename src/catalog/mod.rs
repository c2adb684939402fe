//! Catalog state logic: pagination kept in the location, the client-side
//! grid, debounced search, form validation and optimistic cache patches.

pub mod debounce;
pub mod form;
pub mod grid;
pub mod pagination;
pub mod patch;
