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

//! Built-in Java EE migration inspectors
//!
//! Heuristic rules that classify Java sources, EJB descriptors, enterprise
//! beans, JDBC data access classes and transaction demarcation.

pub mod dao;
pub mod ejb_beans;
pub mod ejb_descriptor;
pub mod java_source;
pub mod transactions;

pub use dao::DaoClasses;
pub use ejb_beans::EjbBeans;
pub use ejb_descriptor::{BeanKind, DescriptorBean, EjbDescriptor};
pub use java_source::{JavaSourceTypes, TypeDeclaration, TypeKind};
pub use transactions::TransactionPatterns;

use migrant_core::EngineBuilder;

/// Boolean fact raised by every inspector that finds migration work on a class
pub const MIGRATION_REQUIRED: &str = "migration.required";

/// Registers every built-in inspector
pub fn register_defaults(builder: EngineBuilder) -> EngineBuilder {
    builder
        .register(JavaSourceTypes::new())
        .register(EjbDescriptor::new())
        .register(EjbBeans::new())
        .register(DaoClasses::new())
        .register(TransactionPatterns::new())
}
