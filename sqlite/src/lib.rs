//! SQLite storage backend for model-store record types.
//!
//! This crate turns the field descriptors of `model-store-core` into a
//! working persistence layer: it derives schema, renders parameterized CRUD
//! statements, marshals values through the staging cells, synthesizes
//! deterministic primary keys from natural-key fields, and serializes
//! concurrent writers against a single connection.
//!
//! # Architecture
//!
//! The crate is organized into four modules:
//!
//! - **`schema`** — CREATE TABLE / CREATE INDEX rendering from field
//!   metadata, including UNIQUE and FOREIGN KEY constraints.
//! - **`statement`** — INSERT/UPDATE/DELETE/GET/LIST/COUNT rendering
//!   (internal).
//! - **`table`** — statement execution: parameter binding, row scanning,
//!   upsert-on-collision, and pk synthesis.
//! - **`client`** — the connection owner: model registration, open/close,
//!   reader/writer dispatch, and transactions.
//!
//! # Quick start
//!
//! ```no_run
//! use model_store_core::{Field, ListOptions, Model, Predicate, ValueCell};
//! use model_store_sqlite::Client;
//!
//! #[derive(Default)]
//! struct Label {
//!     id: String,
//!     name: String,
//!     kind: String,
//!     data: String,
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
//!             Field::new("Kind", "key", ValueCell::Text(&mut self.kind)),
//!             Field::new("Data", "", ValueCell::Text(&mut self.data)),
//!         ]
//!     }
//! }
//!
//! let mut client = Client::new("inventory.db");
//! client.register::<Label>();
//! client.open(false).unwrap();
//!
//! // The pk is synthesized from the natural keys when left empty.
//! let mut label = Label { name: "alpha".into(), kind: "tag".into(), ..Label::default() };
//! client.insert(&mut label).unwrap();
//!
//! // Structured predicates compile to parameterized WHERE clauses.
//! let mut options = ListOptions::default();
//! options.predicate = Some(Predicate::eq("Kind", "tag"));
//! let labels: Vec<Label> = client.list(&mut options).unwrap();
//! println!("{} labels", labels.len());
//! ```

mod client;
mod error;
mod schema;
mod statement;
mod table;

pub use client::{Client, Tx};
pub use error::{Result, StoreError};
pub use schema::{create_index_sql, create_table_sql, model_ddl};
pub use table::Table;
