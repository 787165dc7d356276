//! Field descriptors: the runtime handle pairing one column's metadata with
//! the record's live value cell and its staging cell.
//!
//! A [`Field`] borrows one cell of a record through a tagged [`ValueCell`]
//! reference. Values move between the cell and the database row through the
//! [`Staged`] cell: `pull` stages the live value, `push` writes the staged
//! value back. Composite and collection cells are serialized as JSON text
//! through the [`JsonColumn`] seam.
//!
//! Storage categories map onto SQLite type affinities the same way the
//! logical column types of a schema-described table do: integers and
//! booleans are stored as `INTEGER`, everything else as `TEXT`.

use std::collections::{BTreeMap, HashMap};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::options::{DETAIL_ALL, DETAIL_CORE, DETAIL_ENCODED, DETAIL_PLAIN};
use crate::tag::{ForeignKey, Tag};

/// Storage category of a column.
///
/// `Int` covers integer and boolean cells; `Text` covers text; `Json` covers
/// composite and collection cells serialized as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Int,
    Text,
    Json,
}

/// A JSON-encoded composite cell.
///
/// Implementations are provided for `Vec<T>`, `BTreeMap<String, V>`,
/// `HashMap<String, V>`, and `Option<T>`. An empty collection encodes to
/// `[]` or `{}`; a `None` composite encodes to the empty string. Decoding
/// the empty string leaves the cell untouched — this asymmetry is part of
/// the storage contract.
pub trait JsonColumn {
    /// Serialize the cell to its column text.
    fn encode(&self) -> Result<String>;
    /// Replace the cell from column text.
    fn decode(&mut self, text: &str) -> Result<()>;
}

impl<T: Serialize + DeserializeOwned> JsonColumn for Vec<T> {
    fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn decode(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        *self = serde_json::from_str(text)?;
        Ok(())
    }
}

impl<V: Serialize + DeserializeOwned> JsonColumn for BTreeMap<String, V> {
    fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn decode(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        *self = serde_json::from_str(text)?;
        Ok(())
    }
}

impl<V: Serialize + DeserializeOwned> JsonColumn for HashMap<String, V> {
    fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn decode(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        *self = serde_json::from_str(text)?;
        Ok(())
    }
}

impl<T: Serialize + DeserializeOwned> JsonColumn for Option<T> {
    fn encode(&self) -> Result<String> {
        match self {
            None => Ok(String::new()),
            Some(value) => Ok(serde_json::to_string(value)?),
        }
    }

    fn decode(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        *self = Some(serde_json::from_str(text)?);
        Ok(())
    }
}

/// A tagged mutable reference to one of the record's cells.
pub enum ValueCell<'a> {
    Int(&'a mut i64),
    Bool(&'a mut bool),
    Text(&'a mut String),
    Json(&'a mut dyn JsonColumn),
}

impl ValueCell<'_> {
    /// The storage category of the referenced cell.
    pub fn category(&self) -> Category {
        match self {
            ValueCell::Int(_) | ValueCell::Bool(_) => Category::Int,
            ValueCell::Text(_) => Category::Text,
            ValueCell::Json(_) => Category::Json,
        }
    }
}

/// The staging cell between a live value and a database row.
///
/// Exactly one variant is authoritative per category: `Int` for integer and
/// boolean cells, `Text` for text and JSON cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staged {
    Int(i64),
    Text(String),
}

/// A predicate literal.
///
/// Composite values can be carried but are rejected during coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Text(String),
    Int(i64),
    Bool(bool),
    Composite(serde_json::Value),
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Text(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(i64::from(value))
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<serde_json::Value> for Literal {
    fn from(value: serde_json::Value) -> Self {
        Literal::Composite(value)
    }
}

/// One column of one record: metadata, the live cell, and the staging cell.
pub struct Field<'a> {
    name: &'static str,
    tag: Tag,
    cell: ValueCell<'a>,
    staged: Staged,
    is_param: bool,
}

impl<'a> Field<'a> {
    /// Create a descriptor for a column named `name` with the given tag
    /// options, bound to the record's live cell.
    pub fn new(name: &'static str, tag: &'static str, cell: ValueCell<'a>) -> Self {
        let staged = match cell.category() {
            Category::Int => Staged::Int(0),
            Category::Text | Category::Json => Staged::Text(String::new()),
        };
        Field {
            name,
            tag: Tag::new(tag),
            cell,
            staged,
            is_param: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn category(&self) -> Category {
        self.cell.category()
    }

    /// Whether `<` / `>` comparisons are meaningful for this cell.
    pub fn orderable(&self) -> bool {
        matches!(self.cell, ValueCell::Int(_) | ValueCell::Text(_))
    }

    pub fn is_pk(&self) -> bool {
        self.tag.has_opt("pk")
    }

    pub fn is_key(&self) -> bool {
        self.tag.has_opt("key")
    }

    /// A virtual field is read-back only and managed inside the database.
    pub fn is_virtual(&self) -> bool {
        self.tag.has_opt("virtual")
    }

    /// Only mutable fields appear in an update's SET list.
    pub fn is_mutable(&self) -> bool {
        if self.is_pk() || self.is_key() || self.is_virtual() {
            return false;
        }
        !self.tag.has_opt("const")
    }

    pub fn unique_groups(&self) -> Vec<String> {
        self.tag.unique_groups()
    }

    pub fn foreign_key(&self) -> Option<ForeignKey> {
        self.tag.foreign_key()
    }

    /// Validate the descriptor against the category invariants.
    pub fn validate(&self) -> Result<()> {
        if self.is_pk() && self.category() == Category::Json {
            return Err(Error::PkType);
        }
        Ok(())
    }

    /// Stage the live cell's value. Booleans map to 1/0; JSON cells are
    /// serialized to their column text.
    pub fn pull(&mut self) -> Result<&Staged> {
        self.staged = match &self.cell {
            ValueCell::Int(value) => Staged::Int(**value),
            ValueCell::Bool(value) => Staged::Int(i64::from(**value)),
            ValueCell::Text(value) => Staged::Text((**value).clone()),
            ValueCell::Json(value) => Staged::Text(value.encode()?),
        };
        Ok(&self.staged)
    }

    /// Write the staging cell back into the live cell. An empty JSON text
    /// leaves the cell untouched.
    pub fn push(&mut self) -> Result<()> {
        match (&mut self.cell, &self.staged) {
            (ValueCell::Int(value), Staged::Int(staged)) => **value = *staged,
            (ValueCell::Bool(value), Staged::Int(staged)) => **value = *staged != 0,
            (ValueCell::Text(value), Staged::Text(staged)) => **value = staged.clone(),
            (ValueCell::Json(value), Staged::Text(staged)) => value.decode(staged)?,
            // The staging variant always matches the cell's category.
            (_, _) => {}
        }
        Ok(())
    }

    /// The staging cell, as last pulled or scanned.
    pub fn staged(&self) -> &Staged {
        &self.staged
    }

    /// Replace the staging cell; used by the storage layer's scan path.
    pub fn set_staged(&mut self, staged: Staged) {
        self.staged = staged;
    }

    /// The named-parameter token for this field; flags the field as bound.
    pub fn param(&mut self) -> String {
        self.is_param = true;
        format!(":{}", self.name)
    }

    pub fn is_param(&self) -> bool {
        self.is_param
    }

    /// Column definition fragment: `NAME TYPE CONSTRAINT`.
    pub fn ddl(&self) -> String {
        let sql_type = match self.category() {
            Category::Int => "INTEGER",
            Category::Text | Category::Json => "TEXT",
        };
        let constraint = if self.is_pk() { "PRIMARY KEY" } else { "NOT NULL" };
        format!("{} {} {}", self.name, sql_type, constraint)
    }

    /// Coerce a literal to this field's category.
    ///
    /// # Errors
    ///
    /// [`Error::PredicateValue`] for composite literals or text that does
    /// not parse; [`Error::FieldType`] when the field itself is a JSON
    /// column.
    pub fn as_value(&self, literal: &Literal) -> Result<Literal> {
        match (&self.cell, literal) {
            (_, Literal::Composite(value)) => Err(Error::PredicateValue(value.to_string())),
            (ValueCell::Text(_), Literal::Text(text)) => Ok(Literal::Text(text.clone())),
            (ValueCell::Text(_), Literal::Bool(value)) => Ok(Literal::Text(value.to_string())),
            (ValueCell::Text(_), Literal::Int(value)) => Ok(Literal::Text(value.to_string())),
            (ValueCell::Int(_), Literal::Text(text)) => Ok(Literal::Int(parse_int(text)?)),
            (ValueCell::Int(_), Literal::Bool(value)) => Ok(Literal::Int(i64::from(*value))),
            (ValueCell::Int(_), Literal::Int(value)) => Ok(Literal::Int(*value)),
            (ValueCell::Bool(_), Literal::Text(text)) => Ok(Literal::Bool(parse_bool(text)?)),
            (ValueCell::Bool(_), Literal::Bool(value)) => Ok(Literal::Bool(*value)),
            (ValueCell::Bool(_), Literal::Int(value)) => Ok(Literal::Bool(*value != 0)),
            (ValueCell::Json(_), _) => Err(Error::FieldType),
        }
    }

    /// Detail level: an explicit `dN` option dominates; otherwise pk, key,
    /// and virtual fields are core, JSON fields are encoded, and everything
    /// else is plain.
    pub fn detail(&self) -> u8 {
        if let Some(level) = self.tag.explicit_detail() {
            return level;
        }
        let mut level = DETAIL_PLAIN;
        if self.is_pk() || self.is_key() || self.is_virtual() {
            level = DETAIL_CORE;
        }
        if self.category() == Category::Json {
            level = DETAIL_ENCODED;
        }
        level
    }

    /// Whether this field is included at the given detail level.
    pub fn match_detail(&self, level: u8) -> bool {
        if level == DETAIL_ALL {
            return true;
        }
        self.detail() <= level
    }
}

/// Parse a signed integer with automatic base detection (`0x`, `0o`, `0b`).
fn parse_int(text: &str) -> Result<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let parsed = if let Some(hex) = strip_base_prefix(digits, "0x") {
        i64::from_str_radix(hex, 16)
    } else if let Some(oct) = strip_base_prefix(digits, "0o") {
        i64::from_str_radix(oct, 8)
    } else if let Some(bin) = strip_base_prefix(digits, "0b") {
        i64::from_str_radix(bin, 2)
    } else {
        digits.parse::<i64>()
    };
    match parsed {
        Ok(value) => Ok(if negative { -value } else { value }),
        Err(_) => Err(Error::PredicateValue(text.to_string())),
    }
}

fn strip_base_prefix<'t>(text: &'t str, prefix: &str) -> Option<&'t str> {
    text.strip_prefix(prefix)
        .or_else(|| text.strip_prefix(prefix.to_uppercase().as_str()))
}

/// Parse a boolean from its accepted text forms: `1`, `t`, `T`, `true`,
/// `True`, `TRUE` and the matching false forms.
fn parse_bool(text: &str) -> Result<bool> {
    match text {
        "1" | "t" | "T" | "true" | "True" | "TRUE" => Ok(true),
        "0" | "f" | "F" | "false" | "False" | "FALSE" => Ok(false),
        _ => Err(Error::PredicateValue(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Meta {
        owner: String,
    }

    #[test]
    fn test_pull_int_and_bool() {
        let mut count = 7i64;
        let mut field = Field::new("Count", "", ValueCell::Int(&mut count));
        assert_eq!(field.pull().unwrap(), &Staged::Int(7));

        let mut flag = true;
        let mut field = Field::new("Flag", "", ValueCell::Bool(&mut flag));
        assert_eq!(field.pull().unwrap(), &Staged::Int(1));
    }

    #[test]
    fn test_push_int_and_bool() {
        let mut count = 0i64;
        {
            let mut field = Field::new("Count", "", ValueCell::Int(&mut count));
            field.set_staged(Staged::Int(42));
            field.push().unwrap();
        }
        assert_eq!(count, 42);

        let mut flag = false;
        {
            let mut field = Field::new("Flag", "", ValueCell::Bool(&mut flag));
            field.set_staged(Staged::Int(1));
            field.push().unwrap();
        }
        assert!(flag);
    }

    #[test]
    fn test_pull_text() {
        let mut name = "alpha".to_string();
        let mut field = Field::new("Name", "", ValueCell::Text(&mut name));
        assert_eq!(field.pull().unwrap(), &Staged::Text("alpha".to_string()));
    }

    #[test]
    fn test_empty_collection_encodes_as_json() {
        let mut tags: Vec<String> = Vec::new();
        let mut field = Field::new("Tags", "", ValueCell::Json(&mut tags));
        assert_eq!(field.pull().unwrap(), &Staged::Text("[]".to_string()));

        let mut attrs: BTreeMap<String, String> = BTreeMap::new();
        let mut field = Field::new("Attrs", "", ValueCell::Json(&mut attrs));
        assert_eq!(field.pull().unwrap(), &Staged::Text("{}".to_string()));
    }

    #[test]
    fn test_none_composite_encodes_empty() {
        let mut meta: Option<Meta> = None;
        let mut field = Field::new("Meta", "", ValueCell::Json(&mut meta));
        assert_eq!(field.pull().unwrap(), &Staged::Text(String::new()));
    }

    #[test]
    fn test_push_empty_json_leaves_cell_untouched() {
        let mut meta = Some(Meta {
            owner: "admin".to_string(),
        });
        {
            let mut field = Field::new("Meta", "", ValueCell::Json(&mut meta));
            field.set_staged(Staged::Text(String::new()));
            field.push().unwrap();
        }
        assert_eq!(
            meta,
            Some(Meta {
                owner: "admin".to_string()
            })
        );
    }

    #[test]
    fn test_json_round_trip() {
        let mut tags = vec!["a".to_string(), "b".to_string()];
        let encoded = {
            let mut field = Field::new("Tags", "", ValueCell::Json(&mut tags));
            match field.pull().unwrap() {
                Staged::Text(text) => text.clone(),
                Staged::Int(_) => panic!("json stages as text"),
            }
        };

        let mut restored: Vec<String> = Vec::new();
        {
            let mut field = Field::new("Tags", "", ValueCell::Json(&mut restored));
            field.set_staged(Staged::Text(encoded));
            field.push().unwrap();
        }
        assert_eq!(restored, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_ddl() {
        let mut id = String::new();
        let field = Field::new("ID", "pk", ValueCell::Text(&mut id));
        assert_eq!(field.ddl(), "ID TEXT PRIMARY KEY");

        let mut count = 0i64;
        let field = Field::new("Count", "", ValueCell::Int(&mut count));
        assert_eq!(field.ddl(), "Count INTEGER NOT NULL");

        let mut tags: Vec<String> = Vec::new();
        let field = Field::new("Tags", "", ValueCell::Json(&mut tags));
        assert_eq!(field.ddl(), "Tags TEXT NOT NULL");
    }

    #[test]
    fn test_param_flags_field() {
        let mut name = String::new();
        let mut field = Field::new("Name", "", ValueCell::Text(&mut name));
        assert!(!field.is_param());
        assert_eq!(field.param(), ":Name");
        assert!(field.is_param());
    }

    #[test]
    fn test_validate_rejects_json_pk() {
        let mut tags: Vec<String> = Vec::new();
        let field = Field::new("ID", "pk", ValueCell::Json(&mut tags));
        assert!(matches!(field.validate(), Err(Error::PkType)));

        let mut id = String::new();
        let field = Field::new("ID", "pk", ValueCell::Text(&mut id));
        assert!(field.validate().is_ok());
    }

    #[test]
    fn test_as_value_text_field() {
        let mut name = String::new();
        let field = Field::new("Name", "", ValueCell::Text(&mut name));
        assert_eq!(
            field.as_value(&Literal::from("x")).unwrap(),
            Literal::Text("x".to_string())
        );
        assert_eq!(
            field.as_value(&Literal::from(true)).unwrap(),
            Literal::Text("true".to_string())
        );
        assert_eq!(
            field.as_value(&Literal::from(12i64)).unwrap(),
            Literal::Text("12".to_string())
        );
    }

    #[test]
    fn test_as_value_int_field() {
        let mut count = 0i64;
        let field = Field::new("Count", "", ValueCell::Int(&mut count));
        assert_eq!(
            field.as_value(&Literal::from("12")).unwrap(),
            Literal::Int(12)
        );
        assert_eq!(
            field.as_value(&Literal::from("0x10")).unwrap(),
            Literal::Int(16)
        );
        assert_eq!(
            field.as_value(&Literal::from(true)).unwrap(),
            Literal::Int(1)
        );
        assert!(matches!(
            field.as_value(&Literal::from("twelve")),
            Err(Error::PredicateValue(_))
        ));
    }

    #[test]
    fn test_as_value_bool_field() {
        let mut flag = false;
        let field = Field::new("Flag", "", ValueCell::Bool(&mut flag));
        assert_eq!(
            field.as_value(&Literal::from("t")).unwrap(),
            Literal::Bool(true)
        );
        assert_eq!(
            field.as_value(&Literal::from(0i64)).unwrap(),
            Literal::Bool(false)
        );
        assert_eq!(
            field.as_value(&Literal::from(7i64)).unwrap(),
            Literal::Bool(true)
        );
        assert!(matches!(
            field.as_value(&Literal::from("yes")),
            Err(Error::PredicateValue(_))
        ));
    }

    #[test]
    fn test_as_value_rejects_composite_literal() {
        let mut name = String::new();
        let field = Field::new("Name", "", ValueCell::Text(&mut name));
        let literal = Literal::from(serde_json::json!({"a": 1}));
        assert!(matches!(
            field.as_value(&literal),
            Err(Error::PredicateValue(_))
        ));
    }

    #[test]
    fn test_as_value_rejects_json_field() {
        let mut tags: Vec<String> = Vec::new();
        let field = Field::new("Tags", "", ValueCell::Json(&mut tags));
        assert!(matches!(
            field.as_value(&Literal::from("x")),
            Err(Error::FieldType)
        ));
    }

    #[test]
    fn test_parse_int_bases() {
        assert_eq!(parse_int("12").unwrap(), 12);
        assert_eq!(parse_int("-12").unwrap(), -12);
        assert_eq!(parse_int("+3").unwrap(), 3);
        assert_eq!(parse_int("0x1f").unwrap(), 31);
        assert_eq!(parse_int("0o17").unwrap(), 15);
        assert_eq!(parse_int("0b101").unwrap(), 5);
        assert!(parse_int("").is_err());
        assert!(parse_int("1.5").is_err());
    }

    #[test]
    fn test_detail_defaults() {
        let mut id = String::new();
        assert_eq!(Field::new("ID", "pk", ValueCell::Text(&mut id)).detail(), 0);

        let mut name = String::new();
        assert_eq!(
            Field::new("Name", "key", ValueCell::Text(&mut name)).detail(),
            0
        );

        let mut data = String::new();
        assert_eq!(Field::new("Data", "", ValueCell::Text(&mut data)).detail(), 2);

        let mut tags: Vec<String> = Vec::new();
        assert_eq!(
            Field::new("Tags", "", ValueCell::Json(&mut tags)).detail(),
            3
        );
    }

    #[test]
    fn test_detail_explicit_override() {
        let mut data = String::new();
        let field = Field::new("Data", "d7", ValueCell::Text(&mut data));
        assert_eq!(field.detail(), 7);
    }

    #[test]
    fn test_match_detail() {
        let mut data = String::new();
        let field = Field::new("Data", "", ValueCell::Text(&mut data));
        assert!(!field.match_detail(0));
        // Level 1 matches everything.
        assert!(field.match_detail(1));
        assert!(field.match_detail(2));
        assert!(field.match_detail(3));
    }
}
