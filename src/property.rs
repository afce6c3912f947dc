use crate::error::{OrmError, Result};
use crate::value::SqlType;

/// One scalar field of an entity and the column it is stored in.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    key: String,
    column_name: String,
    sql_type: SqlType,
    non_null: bool,
    unique: bool,
}

impl Property {
    /// Property stored in a column named after its key.
    pub fn new(key: &str, sql_type: SqlType) -> Result<Self> {
        Self::with_column(key, key, sql_type)
    }

    pub fn with_column(key: &str, column_name: &str, sql_type: SqlType) -> Result<Self> {
        if key.is_empty() {
            return Err(OrmError::Schema("property key must not be empty".to_string()));
        }
        validate_identifier("column", column_name)?;
        Ok(Self {
            key: key.to_string(),
            column_name: column_name.to_string(),
            sql_type,
            non_null: false,
            unique: false,
        })
    }

    pub fn not_null(mut self) -> Self {
        self.non_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    pub fn is_non_null(&self) -> bool {
        self.non_null
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_persistent(&self) -> bool {
        self.sql_type.is_persistent()
    }

    /// Column definition fragment: `<column> <TYPE>[ NOT NULL][ UNIQUE]`.
    pub fn column_definition(&self) -> String {
        let mut def = self.column_name.clone();
        let ty = self.sql_type.to_sql();
        if !ty.is_empty() {
            def.push(' ');
            def.push_str(ty);
        }
        if self.non_null {
            def.push_str(" NOT NULL");
        }
        if self.unique {
            def.push_str(" UNIQUE");
        }
        def
    }
}

/// Table and column names are interpolated into generated SQL, so only plain
/// identifiers are accepted.
pub(crate) fn validate_identifier(kind: &str, ident: &str) -> Result<()> {
    let mut chars = ident.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(OrmError::Schema(format!("invalid {} name: {:?}", kind, ident)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_definition() {
        let p = Property::with_column("email", "email_address", SqlType::Text)
            .unwrap()
            .not_null()
            .unique();
        assert_eq!(p.column_definition(), "email_address TEXT NOT NULL UNIQUE");

        let p = Property::new("extra", SqlType::Null).unwrap();
        assert_eq!(p.column_definition(), "extra");
    }

    #[test]
    fn test_rejects_unsafe_identifiers() {
        for name in ["", "1abc", "name; DROP TABLE x", "a-b", "\"q\""] {
            assert!(
                matches!(
                    Property::with_column("k", name, SqlType::Text),
                    Err(OrmError::Schema(_))
                ),
                "accepted {:?}",
                name
            );
        }
        assert!(Property::new("_row2", SqlType::Integer).is_ok());
        assert!(Property::with_column("", "col", SqlType::Integer).is_err());
    }
}
