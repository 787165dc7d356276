//! Metadata-driven mapping between host record types and relational columns.
//!
//! This crate defines the foundational types for persisting application
//! records in an embedded SQL database:
//!
//! - [`Model`] — the registry trait a host type implements to describe its
//!   own columns (name, tag options, and a reference to each live cell).
//! - [`Field`] — the runtime handle pairing one column's metadata with the
//!   record's live value cell and its staging cell.
//! - [`Predicate`] — a compositional WHERE-clause tree compiled against a
//!   field set and a parameter bag.
//! - [`ListOptions`] — pagination, sort, detail projection, and predicate
//!   parameters for list and count operations.
//!
//! Column behavior is controlled by a comma-separated tag string on each
//! field: `pk`, `key`, `const`, `virtual`, `dN`, `unique(GROUP)`, and
//! `fk:TABLE(FIELD)`. See [`Tag`] for the grammar.
//!
//! The crate has no database dependency; the companion storage crate renders
//! SQL from these descriptors and moves row data through the staging cells.
//!
//! # Example
//!
//! ```
//! use model_store_core::{Field, Model, ValueCell};
//!
//! #[derive(Default)]
//! struct Label {
//!     id: String,
//!     name: String,
//!     count: i64,
//! }
//!
//! impl Model for Label {
//!     fn table_name() -> &'static str {
//!         "Label"
//!     }
//!
//!     fn fields(&mut self) -> Vec<Field<'_>> {
//!         vec![
//!             Field::new("ID", "pk", ValueCell::Text(&mut self.id)),
//!             Field::new("Name", "key", ValueCell::Text(&mut self.name)),
//!             Field::new("Count", "", ValueCell::Int(&mut self.count)),
//!         ]
//!     }
//! }
//!
//! let mut label = Label::default();
//! let fields = label.fields();
//! assert!(model_store_core::validate(&fields).is_ok());
//! ```

mod error;
mod field;
mod model;
mod options;
mod predicate;
mod tag;

pub use error::{Error, Result};
pub use field::{Category, Field, JsonColumn, Literal, Staged, ValueCell};
pub use model::{
    find, key_fields, mutable_fields, pk_field, pk_field_mut, real_fields, validate, Model,
};
pub use options::{
    ListOptions, Page, ParamBag, DETAIL_ALL, DETAIL_CORE, DETAIL_ENCODED, DETAIL_PLAIN,
};
pub use predicate::Predicate;
pub use tag::{ForeignKey, Tag};
