//! Row filtering for the user table
//!
//! Caller selections arrive as a [`FilterSet`]; each predicate becomes a
//! boolean mask, the masks are AND-ed and applied to every column at once.

pub mod core;
pub mod error;
pub mod options;
pub mod predicate;

pub use self::core::{and_masks, filter_record_batch};
pub use options::{FilterOptions, distinct_values};
pub use predicate::{
    BatchFilter, CITY_COLUMN, COMPANY_COLUMN, FilterSet, NAME_COLUMN, Predicate, Selection,
};
