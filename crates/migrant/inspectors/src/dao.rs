// Migrant
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Data access object detection
//!
//! Flags classes that talk to the database through raw JDBC, plus classes
//! named as DAOs, and records the JDBC types each one touches.

use crate::java_source::JAVA_SOURCE;
use crate::MIGRATION_REQUIRED;
use migrant_core::{ClassEntity, EntityKind, Inspector, InspectorContract, InspectorError, NodeDecorator, RequirementScope};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

pub const ID: &str = "dao.classes";
pub const DAO_CLASS: &str = "dao.class";
pub const DAO_JDBC_APIS: &str = "dao.jdbcApis";

static JDBC_IMPORT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*import\s+(?:java|javax)\.sql\.").expect("jdbc import pattern"));
static JDBC_API: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(Connection|DataSource|DriverManager|PreparedStatement|CallableStatement|ResultSet|Statement)\b").expect("jdbc api pattern")
});

/// JDBC types referenced by a source file that imports `java.sql` or `javax.sql`
pub fn jdbc_apis(source: &str) -> BTreeSet<String> {
    if !JDBC_IMPORT.is_match(source) {
        return BTreeSet::new();
    }
    // import lines would otherwise count as usage
    let body: Vec<&str> = source.lines().filter(|line| !line.trim_start().starts_with("import ")).collect();
    JDBC_API
        .captures_iter(&body.join("\n"))
        .filter_map(|captures| captures.get(1).map(|api| api.as_str().to_string()))
        .collect()
}

fn named_as_dao(simple_name: &str) -> bool {
    simple_name.ends_with("Dao") || simple_name.ends_with("DAO") || simple_name.ends_with("DaoImpl") || simple_name.ends_with("DAOImpl")
}

pub struct DaoClasses {
    contract: InspectorContract,
}

impl Default for DaoClasses {
    fn default() -> Self {
        Self::new()
    }
}

impl DaoClasses {
    pub fn new() -> Self {
        Self {
            contract: InspectorContract::builder(ID, EntityKind::Class)
                .requires(JAVA_SOURCE)
                .scope(RequirementScope::Linked)
                .produces(DAO_CLASS)
                .produces(DAO_JDBC_APIS)
                .shares(MIGRATION_REQUIRED)
                .build(),
        }
    }
}

impl Inspector for DaoClasses {
    type Target = ClassEntity;

    fn contract(&self) -> &InspectorContract {
        &self.contract
    }

    fn analyze(&self, entity: &ClassEntity, decorator: &mut NodeDecorator<'_>) -> Result<(), InspectorError> {
        let Some(source) = decorator.source()? else {
            decorator.not_applicable();
            return Ok(());
        };

        let apis = jdbc_apis(&source);
        if apis.is_empty() && !named_as_dao(entity.simple_name()) {
            decorator.not_applicable();
            return Ok(());
        }

        decorator.set_tag(DAO_CLASS, true)?;
        decorator.set_property(DAO_JDBC_APIS, &apis)?;
        if !apis.is_empty() {
            decorator.set_tag(MIGRATION_REQUIRED, true)?;
        }
        Ok(())
    }
}
