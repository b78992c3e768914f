use crate::error::CatalogError;
use serde::Serialize;
use sql::parser::{ColumnDef, ForeignKeyRef, Nullability};
use std::fmt::{Display, Formatter};

/// A table column. Primary-key columns are always `NOT NULL`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    name: String,
    column_type: String,
    encoding: Option<String>,
    fk_reference: Option<ForeignKeyRef>,
    position: usize,
    is_distkey: bool,
    is_sortkey: bool,
    is_primary: bool,
    nullability: Nullability,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            encoding: None,
            fk_reference: None,
            position,
            is_distkey: false,
            is_sortkey: false,
            is_primary: false,
            nullability: Nullability::Unspecified,
        }
    }

    pub fn from_def(def: &ColumnDef) -> Result<Self, CatalogError> {
        let mut column = Column::new(&def.name, &def.column_type, def.position);
        column.encoding = def.encoding.clone();
        column.fk_reference = def.fk_reference.clone();
        column.is_distkey = def.is_distkey;
        column.is_sortkey = def.is_sortkey;
        column.set_nullability(def.nullability)?;
        if def.is_primary {
            column.set_primary();
        }
        Ok(column)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> &str {
        &self.column_type
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn fk_reference(&self) -> Option<&ForeignKeyRef> {
        self.fk_reference.as_ref()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_distkey(&self) -> bool {
        self.is_distkey
    }

    pub fn is_sortkey(&self) -> bool {
        self.is_sortkey
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    pub fn is_null(&self) -> bool {
        self.nullability == Nullability::Null
    }

    pub fn is_not_null(&self) -> bool {
        self.nullability == Nullability::NotNull
    }

    pub fn set_nullability(&mut self, nullability: Nullability) -> Result<(), CatalogError> {
        if self.is_primary && nullability != Nullability::NotNull {
            return Err(CatalogError::structure(format!(
                "primary key column '{}' must stay NOT NULL",
                self.name
            )));
        }
        self.nullability = nullability;
        Ok(())
    }

    /// Marks the column as part of the primary key. An explicit `NULL`
    /// declaration is overridden.
    pub fn set_primary(&mut self) {
        self.is_primary = true;
        self.nullability = Nullability::NotNull;
    }

    pub(crate) fn mark_distkey(&mut self) {
        self.is_distkey = true;
    }

    pub(crate) fn mark_sortkey(&mut self) {
        self.is_sortkey = true;
    }
}

/// `name type`, the form used by schema-only clones.
impl Display for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.column_type)
    }
}
