use crate::error::CatalogError;
use crate::relation::{Relation, RelationKind};
use crate::table::Table;
use crate::view::View;
use common::config::components::databases::Permission;
use common::utils::paths_with_ext;
use log::{debug, info};
use sql::{SqlScript, SqlStatement};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbRelation {
    Table(Table),
    View(View),
}

impl DbRelation {
    /// Classify a CREATE statement; anything else is unsupported.
    pub fn from_statement(statement: &SqlStatement) -> Result<Self, CatalogError> {
        if statement.creates_table() {
            Ok(DbRelation::Table(Table::from_statement(statement.clone())?))
        } else if statement.creates_view() {
            Ok(DbRelation::View(View::from_statement(statement.clone())?))
        } else {
            Err(CatalogError::unsupported(format!(
                "'{}' is neither a CREATE TABLE nor a CREATE VIEW",
                statement.sql()
            )))
        }
    }

    fn inner(&self) -> &dyn Relation {
        match self {
            DbRelation::Table(t) => t,
            DbRelation::View(v) => v,
        }
    }
}

impl Relation for DbRelation {
    fn full_name(&self) -> &str {
        self.inner().full_name()
    }

    fn kind(&self) -> RelationKind {
        self.inner().kind()
    }

    fn statement(&self) -> &SqlStatement {
        self.inner().statement()
    }

    fn dependencies(&self) -> Vec<String> {
        self.inner().dependencies()
    }
}

/// Relations keyed by full name, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Database {
    relations: Vec<DbRelation>,
    index: HashMap<String, usize>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_relations(
        relations: impl IntoIterator<Item = DbRelation>,
    ) -> Result<Self, CatalogError> {
        let mut database = Self::new();
        for relation in relations {
            database.add(relation)?;
        }
        Ok(database)
    }

    /// Every statement of every file becomes a relation.
    pub fn from_files(paths: &[PathBuf]) -> Result<Self, CatalogError> {
        let mut database = Self::new();
        for path in paths {
            debug!("loading relations from {}", path.display());
            let script = SqlScript::from_file(path)?;
            for statement in script.statements() {
                database.add(DbRelation::from_statement(statement)?)?;
            }
        }
        info!("loaded {} relations", database.len());
        Ok(database)
    }

    /// All `.sql` files below `dir`.
    pub fn from_directory(dir: &Path) -> Result<Self, CatalogError> {
        Self::from_files(&paths_with_ext(dir, "sql")?)
    }

    pub fn add(&mut self, relation: DbRelation) -> Result<(), CatalogError> {
        let name = relation.full_name().to_string();
        if self.index.contains_key(&name) {
            return Err(CatalogError::duplicate(name));
        }
        self.index.insert(name, self.relations.len());
        self.relations.push(relation);
        Ok(())
    }

    pub fn relation(&self, name: &str) -> Option<&DbRelation> {
        self.index.get(name).map(|&i| &self.relations[i])
    }

    pub fn relations(&self) -> &[DbRelation] {
        &self.relations
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Dependencies of relation `i` that are inside the database, self
    /// references excluded.
    fn internal_dependencies(&self, i: usize) -> Vec<usize> {
        self.relations[i]
            .dependencies()
            .iter()
            .filter_map(|name| self.index.get(name).copied())
            .filter(|&dep| dep != i)
            .collect()
    }

    pub fn has_cycles(&self) -> bool {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        fn visit(db: &Database, i: usize, marks: &mut [Mark]) -> bool {
            match marks[i] {
                Mark::Active => return true,
                Mark::Done => return false,
                Mark::New => {}
            }
            marks[i] = Mark::Active;
            for dep in db.internal_dependencies(i) {
                if visit(db, dep, marks) {
                    return true;
                }
            }
            marks[i] = Mark::Done;
            false
        }

        let mut marks = vec![Mark::New; self.relations.len()];
        (0..self.relations.len()).any(|i| visit(self, i, &mut marks))
    }

    /// Relations ordered so each comes after everything it depends on.
    /// Ties keep insertion order.
    pub fn sorted_relations(&self) -> Result<Vec<&DbRelation>, CatalogError> {
        let mut emitted = vec![false; self.relations.len()];
        let mut order = Vec::with_capacity(self.relations.len());

        while order.len() < self.relations.len() {
            let mut progressed = false;
            for i in 0..self.relations.len() {
                if emitted[i] {
                    continue;
                }
                if self.internal_dependencies(i).iter().all(|&dep| emitted[dep]) {
                    emitted[i] = true;
                    order.push(&self.relations[i]);
                    progressed = true;
                }
            }
            if !progressed {
                let stuck: Vec<&str> = self
                    .relations
                    .iter()
                    .zip(&emitted)
                    .filter(|(_, done)| !**done)
                    .map(|(r, _)| r.full_name())
                    .collect();
                return Err(CatalogError::cycle(&stuck));
            }
        }
        Ok(order)
    }

    pub fn create_relations_script(
        &self,
        permissions: &[Permission],
    ) -> Result<SqlScript, CatalogError> {
        let mut script = SqlScript::default();
        for relation in self.sorted_relations()? {
            script.append(relation.create_script(permissions));
        }
        Ok(script)
    }

    pub fn drop_relations_script(&self) -> Result<SqlScript, CatalogError> {
        let mut script = SqlScript::default();
        for relation in self.sorted_relations()?.into_iter().rev() {
            script.append(relation.drop_script());
        }
        Ok(script)
    }
}
