//! DDL generation: CREATE TABLE and CREATE INDEX from field metadata.
//!
//! Rendering is pure string construction over the field descriptors.
//! Constraint ordering is deterministic: UNIQUE groups are emitted in
//! group-discovery order over the declaration-ordered field list, followed
//! by FOREIGN KEY clauses in field order. The same model type therefore
//! always produces byte-identical DDL.

use model_store_core::{key_fields, real_fields, validate, Field, Model};

use crate::error::Result;

/// Renders the DDL statements for a model type: the table itself and, when
/// natural-key fields exist, the covering index.
///
/// # Errors
///
/// Fails when the model's field list does not validate (no pk field, or a
/// pk of an unsupported category).
pub fn model_ddl<M: Model + Default>() -> Result<Vec<String>> {
    let mut model = M::default();
    let fields = model.fields();
    validate(&fields)?;
    let mut statements = vec![create_table_sql(M::table_name(), &fields)];
    if let Some(index) = create_index_sql(M::table_name(), &fields) {
        statements.push(index);
    }
    Ok(statements)
}

/// `CREATE TABLE IF NOT EXISTS` over the non-virtual fields plus
/// constraints.
pub fn create_table_sql(table: &str, fields: &[Field<'_>]) -> String {
    let mut defs: Vec<String> = real_fields(fields)
        .iter()
        .map(|field| field.ddl())
        .collect();
    defs.extend(constraints(fields));
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n{}\n);",
        defs.join(",\n")
    )
}

/// `CREATE INDEX IF NOT EXISTS` over the natural-key fields, if any.
pub fn create_index_sql(table: &str, fields: &[Field<'_>]) -> Option<String> {
    let keys: Vec<&str> = key_fields(fields)
        .iter()
        .filter(|field| !field.is_virtual())
        .map(|field| field.name())
        .collect();
    if keys.is_empty() {
        return None;
    }
    Some(format!(
        "CREATE INDEX IF NOT EXISTS {table}Index ON {table} ({});",
        keys.join(",")
    ))
}

/// Constraint clauses: UNIQUE groups in discovery order, then FOREIGN KEY
/// references in field order.
pub(crate) fn constraints(fields: &[Field<'_>]) -> Vec<String> {
    let mut groups: Vec<(String, Vec<&str>)> = Vec::new();
    for field in fields {
        for group in field.unique_groups() {
            match groups.iter_mut().find(|(name, _)| *name == group) {
                Some((_, columns)) => columns.push(field.name()),
                None => groups.push((group, vec![field.name()])),
            }
        }
    }
    let mut clauses: Vec<String> = groups
        .iter()
        .map(|(_, columns)| format!("UNIQUE ({})", columns.join(",")))
        .collect();
    for field in fields {
        if let Some(fk) = field.foreign_key() {
            clauses.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE CASCADE",
                field.name(),
                fk.table,
                fk.column
            ));
        }
    }
    clauses
}
