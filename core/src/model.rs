//! The model registry: host types describe their own columns.
//!
//! Instead of inspecting records at runtime, a host type implements
//! [`Model`] and hands out [`Field`] descriptors bound to its live cells.
//! Embedded records are flattened explicitly: the outer implementation
//! extends its own list with the embedded value's `fields()`.
//!
//! Field declaration order is load-bearing — it defines column order in the
//! table definition, parameter order in statements, and the byte order of
//! natural-key hashing.

use crate::error::{Error, Result};
use crate::field::Field;

/// A record type persisted by the storage layer.
///
/// # Example
///
/// ```
/// use model_store_core::{Field, Model, ValueCell};
///
/// #[derive(Default)]
/// struct Audit {
///     created: String,
/// }
///
/// impl Audit {
///     fn fields(&mut self) -> Vec<Field<'_>> {
///         vec![Field::new("Created", "const", ValueCell::Text(&mut self.created))]
///     }
/// }
///
/// #[derive(Default)]
/// struct Tagged {
///     id: String,
///     name: String,
///     audit: Audit,
/// }
///
/// impl Model for Tagged {
///     fn table_name() -> &'static str {
///         "Tagged"
///     }
///
///     fn fields(&mut self) -> Vec<Field<'_>> {
///         let mut fields = vec![
///             Field::new("ID", "pk", ValueCell::Text(&mut self.id)),
///             Field::new("Name", "key", ValueCell::Text(&mut self.name)),
///         ];
///         // Embedded records are flattened in place.
///         fields.extend(self.audit.fields());
///         fields
///     }
/// }
/// ```
pub trait Model {
    /// Table name used in generated SQL.
    fn table_name() -> &'static str;

    /// Field descriptors in declaration order, bound to this instance's
    /// cells.
    fn fields(&mut self) -> Vec<Field<'_>>;
}

/// The `pk` field, if present.
pub fn pk_field<'s, 'f>(fields: &'s [Field<'f>]) -> Option<&'s Field<'f>> {
    fields.iter().find(|field| field.is_pk())
}

/// Mutable access to the `pk` field, if present.
pub fn pk_field_mut<'s, 'f>(fields: &'s mut [Field<'f>]) -> Option<&'s mut Field<'f>> {
    fields.iter_mut().find(|field| field.is_pk())
}

/// The field with the given column name, if present.
pub fn find<'s, 'f>(fields: &'s [Field<'f>], name: &str) -> Option<&'s Field<'f>> {
    fields.iter().find(|field| field.name() == name)
}

/// The natural-key fields, in declaration order.
pub fn key_fields<'s, 'f>(fields: &'s [Field<'f>]) -> Vec<&'s Field<'f>> {
    fields.iter().filter(|field| field.is_key()).collect()
}

/// The non-virtual fields: those present in the table definition.
pub fn real_fields<'s, 'f>(fields: &'s [Field<'f>]) -> Vec<&'s Field<'f>> {
    fields.iter().filter(|field| !field.is_virtual()).collect()
}

/// The fields included in an update's SET list.
pub fn mutable_fields<'s, 'f>(fields: &'s [Field<'f>]) -> Vec<&'s Field<'f>> {
    fields.iter().filter(|field| field.is_mutable()).collect()
}

/// Validate a field list: per-field category checks plus the pk invariant.
///
/// # Errors
///
/// [`Error::MustHavePk`] when no field carries the `pk` option;
/// [`Error::PkType`] when the pk field's category is not permitted.
pub fn validate(fields: &[Field<'_>]) -> Result<()> {
    for field in fields {
        field.validate()?;
    }
    if pk_field(fields).is_none() {
        return Err(Error::MustHavePk);
    }
    Ok(())
}
