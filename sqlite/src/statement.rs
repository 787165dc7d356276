//! Parameterized statement rendering from field metadata.
//!
//! Statements are built by pure string construction over the descriptors;
//! values never appear in the SQL text. Rendering a field as `:Name` flags
//! it as a parameter, and the table layer binds exactly the flagged fields.

use model_store_core::{pk_field_mut, Error, Field, Page};

use crate::error::Result;

/// `INSERT` over the non-virtual fields.
pub(crate) fn insert_sql(table: &str, fields: &mut [Field<'_>]) -> String {
    let mut columns = Vec::new();
    let mut values = Vec::new();
    for field in fields.iter_mut().filter(|field| !field.is_virtual()) {
        columns.push(field.name());
        values.push(field.param());
    }
    format!(
        "INSERT INTO {table} ({}) VALUES ({});",
        columns.join(","),
        values.join(",")
    )
}

/// `UPDATE` setting the mutable fields, addressed by pk.
pub(crate) fn update_sql(table: &str, fields: &mut [Field<'_>]) -> Result<String> {
    let mut sets = Vec::new();
    for field in fields.iter_mut().filter(|field| field.is_mutable()) {
        let token = field.param();
        sets.push(format!("{} = {}", field.name(), token));
    }
    let pk = pk_field_mut(fields).ok_or(Error::MustHavePk)?;
    let token = pk.param();
    Ok(format!(
        "UPDATE {table} SET {} WHERE {} = {};",
        sets.join(","),
        pk.name(),
        token
    ))
}

/// `DELETE` addressed by pk.
pub(crate) fn delete_sql(table: &str, fields: &mut [Field<'_>]) -> Result<String> {
    let pk = pk_field_mut(fields).ok_or(Error::MustHavePk)?;
    let token = pk.param();
    Ok(format!("DELETE FROM {table} WHERE {} = {};", pk.name(), token))
}

/// `SELECT` of the full field set, addressed by pk. Virtual fields are
/// projected here: they exist for read-back even though the table
/// definition omits them.
pub(crate) fn get_sql(table: &str, fields: &mut [Field<'_>]) -> Result<String> {
    let columns: Vec<&str> = fields.iter().map(|field| field.name()).collect();
    let projection = columns.join(",");
    let pk = pk_field_mut(fields).ok_or(Error::MustHavePk)?;
    let token = pk.param();
    Ok(format!(
        "SELECT {projection} FROM {table} WHERE {} = {};",
        pk.name(),
        token
    ))
}

/// `SELECT` of the chosen projection with optional WHERE, ORDER BY, and
/// LIMIT/OFFSET clauses.
pub(crate) fn list_sql(
    table: &str,
    columns: &[&str],
    where_expr: Option<&str>,
    sort: &[i64],
    page: Option<Page>,
) -> String {
    let mut sql = format!("SELECT {} FROM {table}", columns.join(","));
    if let Some(expr) = where_expr {
        sql.push_str(" WHERE ");
        sql.push_str(expr);
    }
    if !sort.is_empty() {
        let positions: Vec<String> = sort
            .iter()
            .map(|position| {
                if *position < 0 {
                    format!("{} DESC", -position)
                } else {
                    position.to_string()
                }
            })
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&positions.join(","));
    }
    if let Some(page) = page {
        sql.push_str(&format!(" LIMIT {} OFFSET {}", page.limit, page.offset));
    }
    sql.push(';');
    sql
}

/// `SELECT COUNT(*)` with an optional WHERE clause.
pub(crate) fn count_sql(table: &str, where_expr: Option<&str>) -> String {
    let mut sql = format!("SELECT COUNT(*) FROM {table}");
    if let Some(expr) = where_expr {
        sql.push_str(" WHERE ");
        sql.push_str(expr);
    }
    sql.push(';');
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_store_core::ValueCell;

    fn label_fields<'a>(
        id: &'a mut String,
        name: &'a mut String,
        count: &'a mut i64,
        data: &'a mut String,
    ) -> Vec<Field<'a>> {
        vec![
            Field::new("ID", "pk", ValueCell::Text(id)),
            Field::new("Name", "key", ValueCell::Text(name)),
            Field::new("Count", "const", ValueCell::Int(count)),
            Field::new("Data", "", ValueCell::Text(data)),
        ]
    }

    #[test]
    fn test_insert_sql() {
        let (mut id, mut name, mut count, mut data) =
            (String::new(), String::new(), 0i64, String::new());
        let mut fields = label_fields(&mut id, &mut name, &mut count, &mut data);
        let sql = insert_sql("Label", &mut fields);
        assert_eq!(
            sql,
            "INSERT INTO Label (ID,Name,Count,Data) VALUES (:ID,:Name,:Count,:Data);"
        );
        assert!(fields.iter().all(|field| field.is_param()));
    }

    #[test]
    fn test_update_sql_sets_mutable_fields_only() {
        let (mut id, mut name, mut count, mut data) =
            (String::new(), String::new(), 0i64, String::new());
        let mut fields = label_fields(&mut id, &mut name, &mut count, &mut data);
        let sql = update_sql("Label", &mut fields).unwrap();
        assert_eq!(sql, "UPDATE Label SET Data = :Data WHERE ID = :ID;");
        // Only the SET fields and the pk are bound.
        let bound: Vec<&str> = fields
            .iter()
            .filter(|field| field.is_param())
            .map(|field| field.name())
            .collect();
        assert_eq!(bound, vec!["ID", "Data"]);
    }

    #[test]
    fn test_delete_sql() {
        let (mut id, mut name, mut count, mut data) =
            (String::new(), String::new(), 0i64, String::new());
        let mut fields = label_fields(&mut id, &mut name, &mut count, &mut data);
        let sql = delete_sql("Label", &mut fields).unwrap();
        assert_eq!(sql, "DELETE FROM Label WHERE ID = :ID;");
    }

    #[test]
    fn test_get_sql_projects_all_fields() {
        let (mut id, mut name, mut count, mut data) =
            (String::new(), String::new(), 0i64, String::new());
        let mut fields = label_fields(&mut id, &mut name, &mut count, &mut data);
        let sql = get_sql("Label", &mut fields).unwrap();
        assert_eq!(sql, "SELECT ID,Name,Count,Data FROM Label WHERE ID = :ID;");
    }

    #[test]
    fn test_list_sql_clauses() {
        let sql = list_sql("Label", &["ID", "Name"], None, &[], None);
        assert_eq!(sql, "SELECT ID,Name FROM Label;");

        let sql = list_sql(
            "Label",
            &["ID", "Name"],
            Some("Name = :Name0"),
            &[2, -1],
            Some(Page {
                limit: 10,
                offset: 20,
            }),
        );
        assert_eq!(
            sql,
            "SELECT ID,Name FROM Label WHERE Name = :Name0 ORDER BY 2,1 DESC LIMIT 10 OFFSET 20;"
        );
    }

    #[test]
    fn test_count_sql() {
        assert_eq!(count_sql("Label", None), "SELECT COUNT(*) FROM Label;");
        assert_eq!(
            count_sql("Label", Some("Kind = :Kind0")),
            "SELECT COUNT(*) FROM Label WHERE Kind = :Kind0;"
        );
    }
}
