//! Column tag grammar.
//!
//! A field's tag is a comma-separated option list:
//!
//! ```text
//! option := "pk" | "key" | "const" | "virtual"
//!         | "d" DIGIT
//!         | "unique" "(" IDENT ")"
//!         | "fk:" IDENT "(" IDENT ")"
//! ```
//!
//! - `pk` — the primary key.
//! - `key` — part of the natural key; feeds pk synthesis and the table index.
//! - `const` — immutable; excluded from updates.
//! - `virtual` — read-back only; absent from the table definition.
//! - `dN` — explicit detail level (0–9).
//! - `unique(G)` — unique constraint collated by group label `G`.
//! - `fk:T(F)` — foreign key referencing table `T`, column `F`.
//!
//! Single-keyword options are matched exactly over the trimmed list;
//! `unique(...)` and `fk:...(...)` are matched by shape.

use std::sync::LazyLock;

use regex::Regex;

static UNIQUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^unique\((.+)\)$").expect("static regex must compile"));

static FK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^fk:(.+)\((.+)\)$").expect("static regex must compile"));

/// A foreign-key reference parsed from an `fk:TABLE(FIELD)` option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Referenced table name.
    pub table: String,
    /// Referenced column name.
    pub column: String,
}

/// Parsed view over a field's comma-separated tag options.
#[derive(Debug, Clone, Copy)]
pub struct Tag(&'static str);

impl Tag {
    pub fn new(raw: &'static str) -> Self {
        Tag(raw)
    }

    fn options(&self) -> impl Iterator<Item = &'static str> {
        self.0.split(',').map(str::trim).filter(|opt| !opt.is_empty())
    }

    /// Exact-match lookup over the trimmed options.
    pub fn has_opt(&self, name: &str) -> bool {
        self.options().any(|opt| opt == name)
    }

    /// Unique-constraint group labels, in tag order. A field may belong to
    /// more than one group.
    pub fn unique_groups(&self) -> Vec<String> {
        self.options()
            .filter_map(|opt| UNIQUE_RE.captures(opt))
            .map(|captures| captures[1].to_string())
            .collect()
    }

    /// The foreign-key reference, if any.
    pub fn foreign_key(&self) -> Option<ForeignKey> {
        self.options().find_map(|opt| {
            let captures = FK_RE.captures(opt)?;
            Some(ForeignKey {
                table: captures[1].to_string(),
                column: captures[2].to_string(),
            })
        })
    }

    /// Explicit `dN` detail level, if present.
    pub fn explicit_detail(&self) -> Option<u8> {
        self.options().find_map(|opt| {
            let digit = opt.strip_prefix('d')?;
            if digit.len() != 1 {
                return None;
            }
            digit.chars().next()?.to_digit(10).map(|level| level as u8)
        })
    }
}
