//! Table operations: execute the generated statements against a connection
//! and move row data through the field staging cells.
//!
//! Every operation follows the same shape: derive the field descriptors,
//! synthesize the primary key if needed, render the statement, bind the
//! flagged parameters, execute, and push scanned values back into the
//! record.

use model_store_core::{
    pk_field_mut, validate, Category, Field, ListOptions, Literal, Model, ParamBag, Predicate,
    Staged,
};
use rusqlite::types::Value;
use rusqlite::{Connection, ToSql};
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::statement;

/// Executes model operations against a borrowed connection. When the
/// connection has an open transaction, every operation runs inside it.
pub struct Table<'c> {
    conn: &'c Connection,
}

impl<'c> Table<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Table { conn }
    }

    /// Insert the model, synthesizing the pk from the natural keys when it
    /// is unset. A constraint violation retries as an update: the row is
    /// addressed by the pk the record carries.
    pub fn insert<M: Model>(&self, model: &mut M) -> Result<()> {
        let outcome = {
            let mut fields = model.fields();
            validate(&fields)?;
            set_pk(&mut fields)?;
            let sql = statement::insert_sql(M::table_name(), &mut fields);
            let params = bind(&mut fields)?;
            let bound = param_refs(&params);
            self.conn.execute(&sql, bound.as_slice())
        };
        match outcome {
            Ok(_) => {
                debug!(table = M::table_name(), "inserted");
                Ok(())
            }
            Err(error) if is_constraint_violation(&error) => self.update(model),
            Err(error) => Err(error.into()),
        }
    }

    /// Update the model's mutable fields, addressed by pk.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when no row matches the pk.
    pub fn update<M: Model>(&self, model: &mut M) -> Result<()> {
        let mut fields = model.fields();
        validate(&fields)?;
        set_pk(&mut fields)?;
        let sql = statement::update_sql(M::table_name(), &mut fields)?;
        let params = bind(&mut fields)?;
        let bound = param_refs(&params);
        let rows = self.conn.execute(&sql, bound.as_slice())?;
        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        debug!(table = M::table_name(), "updated");
        Ok(())
    }

    /// Delete the model's row. Deleting an absent row is success.
    pub fn delete<M: Model>(&self, model: &mut M) -> Result<()> {
        let mut fields = model.fields();
        validate(&fields)?;
        set_pk(&mut fields)?;
        let sql = statement::delete_sql(M::table_name(), &mut fields)?;
        let params = bind(&mut fields)?;
        let bound = param_refs(&params);
        self.conn.execute(&sql, bound.as_slice())?;
        Ok(())
    }

    /// Fetch the model's row by pk and populate every field.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when no row matches the pk.
    pub fn get<M: Model>(&self, model: &mut M) -> Result<()> {
        let mut fields = model.fields();
        validate(&fields)?;
        set_pk(&mut fields)?;
        let sql = statement::get_sql(M::table_name(), &mut fields)?;
        let params = bind(&mut fields)?;
        let bound = param_refs(&params);
        let categories: Vec<Category> = fields.iter().map(|field| field.category()).collect();
        let staged = match self
            .conn
            .query_row(&sql, bound.as_slice(), |row| read_row(row, &categories))
        {
            Ok(staged) => staged,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Err(StoreError::NotFound),
            Err(error) => return Err(error.into()),
        };
        for (field, value) in fields.iter_mut().zip(staged) {
            field.set_staged(value);
            field.push()?;
        }
        Ok(())
    }

    /// List models qualified by the options: predicate, sort, pagination,
    /// and detail projection. Fields outside the projection are left at
    /// their default values in the returned records.
    pub fn list<M: Model + Default>(&self, options: &mut ListOptions) -> Result<Vec<M>> {
        let mut probe = M::default();
        let (sql, categories) = {
            let fields = probe.fields();
            validate(&fields)?;
            let where_expr = options.build(&fields)?;
            let selected = options.selected(&fields);
            let columns: Vec<&str> = selected.iter().map(|field| field.name()).collect();
            let categories: Vec<Category> =
                selected.iter().map(|field| field.category()).collect();
            let sql = statement::list_sql(
                M::table_name(),
                &columns,
                where_expr.as_deref(),
                &options.sort,
                options.page,
            );
            (sql, categories)
        };
        let params = literal_params(options.params());
        let bound = param_refs(&params);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(bound.as_slice())?;
        let mut list = Vec::new();
        while let Some(row) = rows.next()? {
            let staged = read_row(row, &categories)?;
            let mut record = M::default();
            {
                let mut fields = record.fields();
                let selected = fields
                    .iter_mut()
                    .filter(|field| field.match_detail(options.detail));
                for (field, value) in selected.zip(staged) {
                    field.set_staged(value);
                    field.push()?;
                }
            }
            list.push(record);
        }
        debug!(table = M::table_name(), rows = list.len(), "listed");
        Ok(list)
    }

    /// Count the rows matching the predicate; all rows when `None`.
    pub fn count<M: Model + Default>(&self, predicate: Option<Predicate>) -> Result<i64> {
        let mut probe = M::default();
        let mut options = ListOptions::default();
        options.predicate = predicate;
        let sql = {
            let fields = probe.fields();
            validate(&fields)?;
            let where_expr = options.build(&fields)?;
            statement::count_sql(M::table_name(), where_expr.as_deref())
        };
        let params = literal_params(options.params());
        let bound = param_refs(&params);
        let count = self
            .conn
            .query_row(&sql, bound.as_slice(), |row| row.get(0))?;
        Ok(count)
    }
}

/// Synthesize the primary key when the pk cell is text and empty: the
/// lowercase hex SHA-1 over the natural-key staging cells, in declaration
/// order. Text stages feed UTF-8 bytes; integer stages (booleans included)
/// feed big-endian 8-byte values. A populated pk, and any non-text pk, is
/// left to the caller.
pub(crate) fn set_pk(fields: &mut [Field<'_>]) -> Result<()> {
    let needs_value = {
        let Some(pk) = pk_field_mut(fields) else {
            return Ok(());
        };
        if pk.category() != Category::Text {
            return Ok(());
        }
        match pk.pull()? {
            Staged::Text(text) => text.is_empty(),
            Staged::Int(_) => false,
        }
    };
    if !needs_value {
        return Ok(());
    }
    generate_pk(fields)
}

fn generate_pk(fields: &mut [Field<'_>]) -> Result<()> {
    let mut hasher = Sha1::new();
    for field in fields
        .iter_mut()
        // JSON-category fields never participate in key hashing.
        .filter(|field| field.is_key() && field.category() != Category::Json)
    {
        match field.pull()? {
            Staged::Text(text) => hasher.update(text.as_bytes()),
            Staged::Int(value) => hasher.update(value.to_be_bytes()),
        }
    }
    let digest = format!("{:x}", hasher.finalize());
    let Some(pk) = pk_field_mut(fields) else {
        return Ok(());
    };
    if pk.category() != Category::Text {
        return Err(model_store_core::Error::GenPkType.into());
    }
    pk.set_staged(Staged::Text(digest));
    pk.push()?;
    Ok(())
}

/// Named parameters for the fields flagged during statement rendering.
fn bind(fields: &mut [Field<'_>]) -> Result<Vec<(String, Value)>> {
    let mut params = Vec::new();
    for field in fields.iter_mut().filter(|field| field.is_param()) {
        let value = match field.pull()? {
            Staged::Int(value) => Value::Integer(*value),
            Staged::Text(text) => Value::Text(text.clone()),
        };
        params.push((format!(":{}", field.name()), value));
    }
    Ok(params)
}

/// Named parameters for a compiled predicate's bag.
fn literal_params(bag: &ParamBag) -> Vec<(String, Value)> {
    bag.iter()
        .map(|(name, literal)| {
            let value = match literal {
                Literal::Int(value) => Value::Integer(*value),
                Literal::Bool(value) => Value::Integer(i64::from(*value)),
                Literal::Text(text) => Value::Text(text.clone()),
                // Composites are rejected during coercion.
                Literal::Composite(_) => Value::Null,
            };
            (format!(":{}", name), value)
        })
        .collect()
}

fn param_refs(params: &[(String, Value)]) -> Vec<(&str, &dyn ToSql)> {
    params
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect()
}

fn read_row(row: &rusqlite::Row<'_>, categories: &[Category]) -> rusqlite::Result<Vec<Staged>> {
    let mut staged = Vec::with_capacity(categories.len());
    for (index, category) in categories.iter().enumerate() {
        match category {
            Category::Int => staged.push(Staged::Int(row.get(index)?)),
            Category::Text | Category::Json => staged.push(Staged::Text(row.get(index)?)),
        }
    }
    Ok(staged)
}

fn is_constraint_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
