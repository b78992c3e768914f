use crate::error::CatalogError;
use common::config::components::databases::Permission;
use sql::{SqlScript, SqlStatement};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Table,
    View,
}

impl Display for RelationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RelationKind::Table => "TABLE",
            RelationKind::View => "VIEW",
        })
    }
}

/// A named warehouse object built from its CREATE statement.
pub trait Relation {
    fn full_name(&self) -> &str;
    fn kind(&self) -> RelationKind;
    /// The CREATE statement the relation was parsed from.
    fn statement(&self) -> &SqlStatement;
    /// Names of the relations this one references.
    fn dependencies(&self) -> Vec<String>;

    fn schema(&self) -> Option<&str> {
        self.full_name().rsplit_once('.').map(|(schema, _)| schema)
    }

    fn local_name(&self) -> &str {
        self.full_name()
            .rsplit_once('.')
            .map_or(self.full_name(), |(_, name)| name)
    }

    fn create_script(&self, permissions: &[Permission]) -> SqlScript {
        let mut script = SqlScript::from(self.statement().clone());
        script.append(self.grant_script(permissions));
        script
    }

    fn grant_script(&self, permissions: &[Permission]) -> SqlScript {
        grant_script(self.full_name(), permissions)
    }

    fn drop_script(&self) -> SqlScript {
        SqlScript::new(&format!(
            "DROP {} IF EXISTS {} CASCADE;",
            self.kind(),
            self.full_name()
        ))
    }

    fn recreate_script(&self, permissions: &[Permission]) -> SqlScript {
        let mut script = self.drop_script();
        script.append(self.create_script(permissions));
        script
    }

    fn select_script(&self) -> SqlScript {
        SqlScript::new(&format!("SELECT * FROM {};", self.full_name()))
    }
}

/// Something rows can be read from: a relation or a parenthesised select.
pub trait Projection {
    /// Expression placed after `FROM` / `USING`.
    fn from_expression(&self) -> String;
    /// Prefix for the source's columns in join conditions.
    fn qualifier(&self) -> String;
    fn column_count(&self) -> usize;
    fn column_names(&self) -> Result<Vec<String>, CatalogError>;
}

/// `GRANT` statements for `name`. Each permission grants to its user and/or
/// group.
pub fn grant_script(name: &str, permissions: &[Permission]) -> SqlScript {
    let mut script = SqlScript::default();
    for permission in permissions {
        if let Some(user) = &permission.user {
            let option = if permission.with_grant_option {
                " WITH GRANT OPTION"
            } else {
                ""
            };
            script.append_sql(&format!(
                "GRANT {} ON {name} TO {user}{option};",
                permission.permission
            ));
        }
        if let Some(group) = &permission.group {
            script.append_sql(&format!(
                "GRANT {} ON {name} TO GROUP {group};",
                permission.permission
            ));
        }
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permission(user: Option<&str>, group: Option<&str>, grant: bool) -> Permission {
        Permission {
            permission: "SELECT".into(),
            user: user.map(Into::into),
            group: group.map(Into::into),
            with_grant_option: grant,
        }
    }

    #[test]
    fn grants_expand_user_and_group() {
        let script = grant_script(
            "analytics.orders",
            &[
                permission(Some("etl_admin"), Some("analysts"), true),
                permission(None, Some("readers"), false),
            ],
        );
        assert_eq!(
            script.sql(),
            "GRANT SELECT ON analytics.orders TO etl_admin WITH GRANT OPTION;\n\
             GRANT SELECT ON analytics.orders TO GROUP analysts;\n\
             GRANT SELECT ON analytics.orders TO GROUP readers;"
        );
    }

    #[test]
    fn no_permissions_no_grants() {
        assert!(grant_script("t", &[]).is_empty());
    }
}
