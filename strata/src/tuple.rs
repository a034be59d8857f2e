//! Schema and record value types.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use bytes::{Buf, BufMut};

use crate::error::{DbError, Result};
use crate::page::PageId;

/// Bytes reserved for the payload of every string field.
pub const STRING_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    String,
}

impl Type {
    /// Serialized width of a field of this type.
    pub fn byte_len(self) -> usize {
        match self {
            Type::Int => 4,
            Type::String => 4 + STRING_LEN,
        }
    }

    /// Decodes one field of this type, consuming exactly `self.byte_len()` bytes.
    pub fn parse(self, buf: &mut impl Buf) -> Field {
        match self {
            Type::Int => Field::Int(buf.get_i32()),
            Type::String => {
                let len = (buf.get_u32() as usize).min(STRING_LEN);
                let mut raw = vec![0u8; STRING_LEN];
                buf.copy_to_slice(&mut raw);
                raw.truncate(len);
                Field::Str(String::from_utf8_lossy(&raw).into_owned())
            }
        }
    }

    fn default_field(self) -> Field {
        match self {
            Type::Int => Field::Int(0),
            Type::String => Field::Str(String::new()),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "INT"),
            Type::String => write!(f, "STRING"),
        }
    }
}

/// Comparison operators usable in filter and join predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,
    Like,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Equals => "=",
            CmpOp::NotEquals => "<>",
            CmpOp::GreaterThan => ">",
            CmpOp::GreaterThanOrEq => ">=",
            CmpOp::LessThan => "<",
            CmpOp::LessThanOrEq => "<=",
            CmpOp::Like => "LIKE",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Int(i32),
    Str(String),
}

impl Field {
    pub fn field_type(&self) -> Type {
        match self {
            Field::Int(_) => Type::Int,
            Field::Str(_) => Type::String,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Field::Int(v) => Some(*v),
            Field::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Str(s) => Some(s),
            Field::Int(_) => None,
        }
    }

    /// Evaluates `self op other`. Fields of different types never compare true.
    pub fn compare(&self, op: CmpOp, other: &Field) -> bool {
        match (self, other) {
            (Field::Int(a), Field::Int(b)) => match op {
                CmpOp::Like => a == b,
                _ => op_holds(op, a.cmp(b)),
            },
            (Field::Str(a), Field::Str(b)) => match op {
                CmpOp::Like => a.contains(b.as_str()),
                _ => op_holds(op, a.cmp(b)),
            },
            _ => false,
        }
    }

    /// Writes the fixed-width encoding. Strings longer than `STRING_LEN` bytes
    /// are cut at the last char boundary that fits.
    pub fn serialize(&self, buf: &mut impl BufMut) {
        match self {
            Field::Int(v) => buf.put_i32(*v),
            Field::Str(s) => {
                let mut end = s.len().min(STRING_LEN);
                while !s.is_char_boundary(end) {
                    end -= 1;
                }
                buf.put_u32(end as u32);
                buf.put_slice(&s.as_bytes()[..end]);
                buf.put_bytes(0, STRING_LEN - end);
            }
        }
    }
}

fn op_holds(op: CmpOp, ord: Ordering) -> bool {
    match op {
        CmpOp::Equals => ord == Ordering::Equal,
        CmpOp::NotEquals => ord != Ordering::Equal,
        CmpOp::GreaterThan => ord == Ordering::Greater,
        CmpOp::GreaterThanOrEq => ord != Ordering::Less,
        CmpOp::LessThan => ord == Ordering::Less,
        CmpOp::LessThanOrEq => ord != Ordering::Greater,
        CmpOp::Like => ord == Ordering::Equal,
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for Field {
    fn from(v: i32) -> Self {
        Field::Int(v)
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field::Str(s.to_string())
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Field::Str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TdItem {
    pub field_type: Type,
    pub field_name: Option<String>,
}

/// Ordered field types and (optional) names of a tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleDesc {
    items: Vec<TdItem>,
}

impl TupleDesc {
    pub fn new(types: Vec<Type>, names: Vec<&str>) -> Self {
        assert_eq!(types.len(), names.len(), "every field needs a name");
        let items = types
            .into_iter()
            .zip(names)
            .map(|(field_type, name)| TdItem {
                field_type,
                field_name: Some(name.to_string()),
            })
            .collect();
        Self { items }
    }

    pub fn from_items(items: Vec<TdItem>) -> Self {
        Self { items }
    }

    /// Anonymous fields.
    pub fn from_types(types: Vec<Type>) -> Self {
        let items = types
            .into_iter()
            .map(|field_type| TdItem {
                field_type,
                field_name: None,
            })
            .collect();
        Self { items }
    }

    pub fn num_fields(&self) -> usize {
        self.items.len()
    }

    pub fn field_type(&self, i: usize) -> Type {
        self.items[i].field_type
    }

    pub fn field_name(&self, i: usize) -> Option<&str> {
        self.items[i].field_name.as_deref()
    }

    pub fn items(&self) -> impl Iterator<Item = &TdItem> {
        self.items.iter()
    }

    pub fn types(&self) -> impl Iterator<Item = Type> + '_ {
        self.items.iter().map(|item| item.field_type)
    }

    /// Index of the first field called `name`.
    pub fn field_name_to_index(&self, name: &str) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.field_name.as_deref() == Some(name))
            .ok_or_else(|| DbError::NoSuchElement(format!("no field named {}", name)))
    }

    /// Serialized size in bytes of a tuple with this descriptor.
    pub fn size(&self) -> usize {
        self.items.iter().map(|item| item.field_type.byte_len()).sum()
    }

    /// Same field types in the same order, ignoring names.
    pub fn same_types(&self, other: &TupleDesc) -> bool {
        self.types().eq(other.types())
    }

    /// Concatenation of `a` followed by `b`.
    pub fn merge(a: &TupleDesc, b: &TupleDesc) -> TupleDesc {
        let items = a.items.iter().chain(b.items.iter()).cloned().collect();
        TupleDesc { items }
    }
}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(
                f,
                "{}({})",
                item.field_type,
                item.field_name.as_deref().unwrap_or("null")
            )?;
        }
        Ok(())
    }
}

/// Physical location of a tuple: page plus slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: usize,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: usize) -> Self {
        Self { page_id, slot }
    }
}

#[derive(Debug, Clone)]
pub struct Tuple {
    desc: Arc<TupleDesc>,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// A tuple with every field set to its type's zero value.
    pub fn new(desc: Arc<TupleDesc>) -> Self {
        let fields = desc.types().map(Type::default_field).collect();
        Self {
            desc,
            fields,
            record_id: None,
        }
    }

    pub fn from_fields(desc: Arc<TupleDesc>, fields: Vec<Field>) -> Result<Self> {
        if fields.len() != desc.num_fields()
            || !fields.iter().map(Field::field_type).eq(desc.types())
        {
            let found = fields
                .iter()
                .map(|f| f.field_type().to_string())
                .collect::<Vec<_>>()
                .join(",");
            return Err(DbError::SchemaMismatch {
                expected: desc.to_string(),
                found,
            });
        }
        Ok(Self {
            desc,
            fields,
            record_id: None,
        })
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, rid: Option<RecordId>) {
        self.record_id = rid;
    }

    pub fn field(&self, i: usize) -> &Field {
        &self.fields[i]
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Panics if `i` is out of range or `field` has the wrong type.
    pub fn set_field(&mut self, i: usize, field: Field) {
        assert!(
            i < self.fields.len(),
            "field index {} out of range for {}",
            i,
            self.desc
        );
        assert_eq!(
            field.field_type(),
            self.desc.field_type(i),
            "field {} has the wrong type",
            i
        );
        self.fields[i] = field;
    }

    /// Re-labels the tuple with `desc`, which must have the same field types.
    pub fn rebind(mut self, desc: Arc<TupleDesc>) -> Result<Self> {
        if !self.desc.same_types(&desc) {
            return Err(DbError::SchemaMismatch {
                expected: desc.to_string(),
                found: self.desc.to_string(),
            });
        }
        self.desc = desc;
        Ok(self)
    }

    /// Concatenates two tuples under the already merged descriptor `desc`.
    pub fn merge(left: &Tuple, right: &Tuple, desc: Arc<TupleDesc>) -> Self {
        let fields = left.fields.iter().chain(right.fields.iter()).cloned().collect();
        Self {
            desc,
            fields,
            record_id: None,
        }
    }

    pub fn serialize(&self, buf: &mut impl BufMut) {
        for field in &self.fields {
            field.serialize(buf);
        }
    }

    pub fn parse(desc: Arc<TupleDesc>, buf: &mut impl Buf) -> Self {
        let fields = desc.types().map(|t| t.parse(buf)).collect();
        Self {
            desc,
            fields,
            record_id: None,
        }
    }
}

/// Tuples are equal when their descriptors and field values agree.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields && self.desc == other.desc
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn two_ints() -> Arc<TupleDesc> {
        Arc::new(TupleDesc::new(vec![Type::Int, Type::Int], vec!["a", "b"]))
    }

    #[test]
    fn desc_size_and_lookup() {
        let desc = TupleDesc::new(vec![Type::Int, Type::String], vec!["id", "name"]);
        assert_eq!(desc.size(), 4 + 4 + STRING_LEN);
        assert_eq!(desc.field_name_to_index("name").unwrap(), 1);
        assert!(matches!(
            desc.field_name_to_index("missing"),
            Err(DbError::NoSuchElement(_))
        ));
        assert_eq!(desc.to_string(), "INT(id),STRING(name)");
    }

    #[test]
    fn merge_concatenates() {
        let a = TupleDesc::new(vec![Type::Int], vec!["x"]);
        let b = TupleDesc::new(vec![Type::String, Type::Int], vec!["y", "z"]);
        let merged = TupleDesc::merge(&a, &b);
        assert_eq!(merged.num_fields(), 3);
        assert_eq!(merged.field_name(2), Some("z"));
        assert_eq!(merged.field_type(1), Type::String);
    }

    #[test]
    fn desc_equality_considers_names() {
        let a = TupleDesc::new(vec![Type::Int], vec!["x"]);
        let b = TupleDesc::new(vec![Type::Int], vec!["y"]);
        assert_ne!(a, b);
        assert!(a.same_types(&b));
    }

    #[test]
    fn field_comparisons() {
        let one = Field::Int(1);
        let two = Field::Int(2);
        assert!(one.compare(CmpOp::LessThan, &two));
        assert!(two.compare(CmpOp::GreaterThanOrEq, &two));
        assert!(one.compare(CmpOp::NotEquals, &two));
        assert!(Field::from("database").compare(CmpOp::Like, &Field::from("tab")));
        assert!(!Field::from("1").compare(CmpOp::Equals, &one));
    }

    #[test]
    fn tuple_encoding_is_fixed_width() {
        let desc = Arc::new(TupleDesc::new(
            vec![Type::Int, Type::String],
            vec!["id", "name"],
        ));
        let tuple =
            Tuple::from_fields(desc.clone(), vec![Field::Int(-7), Field::from("bob")]).unwrap();
        let mut buf = BytesMut::new();
        tuple.serialize(&mut buf);
        assert_eq!(buf.len(), desc.size());
        assert_eq!(&buf[..4], &(-7i32).to_be_bytes());
        assert_eq!(&buf[4..8], &3u32.to_be_bytes());

        let decoded = Tuple::parse(desc, &mut buf.freeze());
        assert_eq!(decoded, tuple);
    }

    #[test]
    fn long_strings_are_truncated() {
        let long = "x".repeat(STRING_LEN + 10);
        let mut buf = BytesMut::new();
        Field::Str(long).serialize(&mut buf);
        assert_eq!(buf.len(), Type::String.byte_len());
        let parsed = Type::String.parse(&mut buf.freeze());
        assert_eq!(parsed.as_str().map(str::len), Some(STRING_LEN));
    }

    #[test]
    fn from_fields_checks_types() {
        let err = Tuple::from_fields(two_ints(), vec![Field::Int(1), Field::from("x")]);
        assert!(matches!(err, Err(DbError::SchemaMismatch { .. })));
    }

    #[test]
    #[should_panic]
    fn set_field_out_of_range_panics() {
        let mut t = Tuple::new(two_ints());
        t.set_field(2, Field::Int(1));
    }

    #[test]
    fn rebind_keeps_values() {
        let t = Tuple::from_fields(two_ints(), vec![Field::Int(1), Field::Int(2)]).unwrap();
        let renamed = Arc::new(TupleDesc::new(vec![Type::Int, Type::Int], vec!["x", "y"]));
        let rebound = t.rebind(renamed.clone()).unwrap();
        assert_eq!(rebound.tuple_desc(), &renamed);
        assert_eq!(rebound.field(1), &Field::Int(2));
    }
}
