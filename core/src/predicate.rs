//! Compositional WHERE-clause trees.
//!
//! A [`Predicate`] is built from comparison leaves and logical composites,
//! then compiled once against a record's field list. Compilation coerces
//! each leaf literal to its field's category, registers the coerced value
//! with the enclosing [`ParamBag`](crate::ParamBag), and assembles a
//! parameterized SQL fragment — literal values never appear in the SQL
//! text.
//!
//! # Example
//!
//! ```
//! use model_store_core::Predicate;
//!
//! let predicate = Predicate::and([
//!     Predicate::eq("Kind", "k"),
//!     Predicate::lt("Count", 10),
//! ]);
//! ```

use crate::error::{Error, Result};
use crate::field::{Field, Literal};
use crate::model;
use crate::options::ParamBag;

/// A WHERE-clause tree. Leaves reference a field by column name; composites
/// hold an ordered child list.
#[derive(Debug, Clone)]
pub enum Predicate {
    Eq(String, Literal),
    Neq(String, Literal),
    Lt(String, Literal),
    Gt(String, Literal),
    In(String, Vec<Literal>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Literal>) -> Self {
        Predicate::Eq(field.into(), value.into())
    }

    pub fn neq(field: impl Into<String>, value: impl Into<Literal>) -> Self {
        Predicate::Neq(field.into(), value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Literal>) -> Self {
        Predicate::Lt(field.into(), value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Literal>) -> Self {
        Predicate::Gt(field.into(), value.into())
    }

    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        Predicate::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn and(children: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Or(children.into_iter().collect())
    }

    pub fn not(child: Predicate) -> Self {
        Predicate::Not(Box::new(child))
    }

    /// Compile to a SQL fragment, coercing leaf literals against the field
    /// list and registering them with the parameter bag.
    ///
    /// # Errors
    ///
    /// [`Error::PredicateRef`] for unknown field names,
    /// [`Error::PredicateType`] for an ordered comparison against a boolean
    /// or JSON field, and the coercion errors of
    /// [`Field::as_value`](crate::Field::as_value).
    pub fn build(&self, fields: &[Field<'_>], params: &mut ParamBag) -> Result<String> {
        match self {
            Predicate::Eq(name, value) => leaf(fields, params, name, value, "="),
            Predicate::Neq(name, value) => leaf(fields, params, name, value, "<>"),
            Predicate::Lt(name, value) => ordered(fields, params, name, value, "<"),
            Predicate::Gt(name, value) => ordered(fields, params, name, value, ">"),
            Predicate::In(name, values) => {
                let field = resolve(fields, name)?;
                let mut tokens = Vec::with_capacity(values.len());
                for value in values {
                    let coerced = field.as_value(value)?;
                    tokens.push(params.add(name, coerced));
                }
                Ok(format!("{} IN ({})", name, tokens.join(",")))
            }
            Predicate::And(children) => composite(children, fields, params, " AND ", "TRUE"),
            Predicate::Or(children) => composite(children, fields, params, " OR ", "FALSE"),
            Predicate::Not(child) => Ok(format!("NOT ({})", child.build(fields, params)?)),
        }
    }
}

fn resolve<'s, 'f>(fields: &'s [Field<'f>], name: &str) -> Result<&'s Field<'f>> {
    model::find(fields, name).ok_or_else(|| Error::PredicateRef(name.to_string()))
}

fn leaf(
    fields: &[Field<'_>],
    params: &mut ParamBag,
    name: &str,
    value: &Literal,
    operator: &str,
) -> Result<String> {
    let field = resolve(fields, name)?;
    let coerced = field.as_value(value)?;
    let token = params.add(name, coerced);
    Ok(format!("{} {} {}", name, operator, token))
}

fn ordered(
    fields: &[Field<'_>],
    params: &mut ParamBag,
    name: &str,
    value: &Literal,
    operator: &str,
) -> Result<String> {
    let field = resolve(fields, name)?;
    if !field.orderable() {
        return Err(Error::PredicateType(name.to_string()));
    }
    let coerced = field.as_value(value)?;
    let token = params.add(name, coerced);
    Ok(format!("{} {} {}", name, operator, token))
}

fn composite(
    children: &[Predicate],
    fields: &[Field<'_>],
    params: &mut ParamBag,
    joiner: &str,
    empty: &str,
) -> Result<String> {
    if children.is_empty() {
        return Ok(empty.to_string());
    }
    let mut parts = Vec::with_capacity(children.len());
    for child in children {
        parts.push(child.build(fields, params)?);
    }
    Ok(format!("({})", parts.join(joiner)))
}
