//! List options: pagination, sort, detail projection, and the parameter bag.

use crate::error::Result;
use crate::field::{Field, Literal};
use crate::predicate::Predicate;

/// Detail level selecting pk, key, and virtual fields only.
pub const DETAIL_CORE: u8 = 0;
/// Detail level selecting every field unconditionally.
pub const DETAIL_ALL: u8 = 1;
/// Detail level selecting core and plain fields.
pub const DETAIL_PLAIN: u8 = 2;
/// Detail level additionally selecting JSON-encoded fields.
pub const DETAIL_ENCODED: u8 = 3;

/// Pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

/// Named parameters accumulated during predicate compilation.
///
/// Insertion order is preserved so the driver can bind by name or position.
#[derive(Debug, Default)]
pub struct ParamBag {
    params: Vec<(String, Literal)>,
}

impl ParamBag {
    /// Register a value under a bag-unique name derived from the field name
    /// and the current bag size. Returns the `:name` token to splice into
    /// the SQL fragment.
    pub fn add(&mut self, field: &str, value: Literal) -> String {
        let name = format!("{}{}", field, self.params.len());
        let token = format!(":{}", name);
        self.params.push((name, value));
        token
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// The accumulated `(name, value)` pairs, in insertion order. Names do
    /// not carry the `:` prefix.
    pub fn iter(&self) -> impl Iterator<Item = &(String, Literal)> {
        self.params.iter()
    }
}

/// Options qualifying a list or count operation.
///
/// `detail` selects the projected fields (see the `DETAIL_*` constants);
/// `sort` holds 1-based positions into the projection, negative values
/// sorting descending. Building compiles the predicate against the record's
/// field list and refills the parameter bag, so a shared options value
/// always reflects the most recent call.
#[derive(Debug, Default)]
pub struct ListOptions {
    pub page: Option<Page>,
    pub sort: Vec<i64>,
    pub detail: u8,
    pub predicate: Option<Predicate>,
    params: ParamBag,
}

impl ListOptions {
    /// Compile the predicate (if any) against the record's field list.
    /// Returns the WHERE fragment; the coerced literals land in the bag.
    pub fn build(&mut self, fields: &[Field<'_>]) -> Result<Option<String>> {
        self.params = ParamBag::default();
        match &self.predicate {
            Some(predicate) => predicate.build(fields, &mut self.params).map(Some),
            None => Ok(None),
        }
    }

    /// The parameters accumulated by the last [`build`](Self::build).
    pub fn params(&self) -> &ParamBag {
        &self.params
    }

    /// The fields included by the current detail level, in declaration
    /// order.
    pub fn selected<'s, 'f>(&self, fields: &'s [Field<'f>]) -> Vec<&'s Field<'f>> {
        fields
            .iter()
            .filter(|field| field.match_detail(self.detail))
            .collect()
    }
}
