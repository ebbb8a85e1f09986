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

//! Java source type discovery
//!
//! Finds the top-level type declared in each `.java` file and links the file
//! to the class entity named by its fully qualified name.

use migrant_core::{EntityKind, FileEntity, FileKind, Inspector, InspectorContract, InspectorError, ProjectFileDecorator};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub const ID: &str = "java.source-types";
pub const JAVA_SOURCE: &str = "java.source";
pub const JAVA_TYPE_KIND: &str = "java.typeKind";

static PACKAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*package\s+([\w.]+)\s*;").expect("package pattern"));
static TYPE_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:(?:public|protected|private|abstract|final|static|sealed|non-sealed|strictfp)\s+)*(class|interface|enum|record|@interface)\s+([A-Za-z_$][\w$]*)")
        .expect("type declaration pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Enum => "enum",
            TypeKind::Record => "record",
            TypeKind::Annotation => "annotation",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "class" => Some(TypeKind::Class),
            "interface" => Some(TypeKind::Interface),
            "enum" => Some(TypeKind::Enum),
            "record" => Some(TypeKind::Record),
            "@interface" => Some(TypeKind::Annotation),
            _ => None,
        }
    }
}

/// First top-level type of a compilation unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDeclaration {
    pub package: Option<String>,
    pub name: String,
    pub kind: TypeKind,
}

impl TypeDeclaration {
    pub fn fqn(&self) -> String {
        match &self.package {
            Some(package) => format!("{package}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

pub fn parse_declaration(source: &str) -> Option<TypeDeclaration> {
    let declaration = TYPE_DECLARATION.captures(source)?;
    let kind = TypeKind::from_keyword(declaration.get(1)?.as_str())?;
    let name = declaration.get(2)?.as_str().to_string();
    let package = PACKAGE.captures(source).and_then(|captures| captures.get(1)).map(|package| package.as_str().to_string());
    Some(TypeDeclaration { package, name, kind })
}

pub struct JavaSourceTypes {
    contract: InspectorContract,
}

impl Default for JavaSourceTypes {
    fn default() -> Self {
        Self::new()
    }
}

impl JavaSourceTypes {
    pub fn new() -> Self {
        Self {
            contract: InspectorContract::builder(ID, EntityKind::File).produces(JAVA_SOURCE).produces(JAVA_TYPE_KIND).build(),
        }
    }
}

impl Inspector for JavaSourceTypes {
    type Target = FileEntity;

    fn contract(&self) -> &InspectorContract {
        &self.contract
    }

    fn supports(&self, entity: &FileEntity) -> bool {
        entity.kind() == FileKind::JavaSource
    }

    fn analyze(&self, _entity: &FileEntity, decorator: &mut ProjectFileDecorator<'_>) -> Result<(), InspectorError> {
        let content = decorator.content()?;
        // package-info.java and module-info.java declare no type
        let Some(declaration) = parse_declaration(&content) else {
            decorator.not_applicable();
            return Ok(());
        };

        decorator.set_tag(JAVA_SOURCE, true)?;
        decorator.set_tag(JAVA_TYPE_KIND, declaration.kind.as_str())?;
        decorator.link_class(&declaration.fqn())
    }
}
