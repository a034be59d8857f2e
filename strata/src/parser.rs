//! Parser for catalog files: one `name (field type [pk], ...)` table per line.

use chumsky::prelude::*;

use crate::error::{DbError, Result};
use crate::tuple::{Type, TupleDesc};

#[derive(Debug, PartialEq, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub field_type: Type,
    pub primary_key: bool,
}

#[derive(Debug, PartialEq, Clone)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableDef {
    pub fn tuple_desc(&self) -> TupleDesc {
        TupleDesc::new(
            self.columns.iter().map(|c| c.field_type).collect(),
            self.columns.iter().map(|c| c.name.as_str()).collect(),
        )
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.primary_key)
            .map(|c| c.name.as_str())
    }
}

fn table_def() -> impl Parser<char, TableDef, Error = Simple<char>> {
    let ident = text::ident::<char, Simple<char>>().padded();

    let field_type = text::ident::<char, Simple<char>>()
        .try_map(|s: String, span| match s.to_lowercase().as_str() {
            "int" => Ok(Type::Int),
            "string" => Ok(Type::String),
            _ => Err(Simple::custom(span, format!("unknown type: {}", s))),
        })
        .padded();

    let annotation = text::ident::<char, Simple<char>>()
        .try_map(|s: String, span| {
            if s.eq_ignore_ascii_case("pk") {
                Ok(())
            } else {
                Err(Simple::custom(span, format!("unknown annotation: {}", s)))
            }
        })
        .padded();

    let column = ident
        .then(field_type)
        .then(annotation.or_not())
        .map(|((name, field_type), pk)| ColumnDef {
            name,
            field_type,
            primary_key: pk.is_some(),
        });

    ident
        .then(
            column
                .separated_by(just(',').padded())
                .at_least(1)
                .delimited_by(just('(').padded(), just(')').padded()),
        )
        .then_ignore(end())
        .try_map(|(name, columns), span| {
            if columns.iter().filter(|c: &&ColumnDef| c.primary_key).count() > 1 {
                Err(Simple::custom(span, "more than one primary key"))
            } else {
                Ok(TableDef { name, columns })
            }
        })
}

/// Parses a whole catalog file. Blank lines are skipped; line numbers in
/// errors are 1-based.
pub fn parse_catalog(src: &str) -> Result<Vec<TableDef>> {
    let parser = table_def();
    let mut tables = Vec::new();
    for (i, line) in src.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let table = parser.parse(line).map_err(|errs| DbError::CatalogParse {
            line: i + 1,
            message: errs
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        })?;
        tables.push(table);
    }
    Ok(tables)
}
