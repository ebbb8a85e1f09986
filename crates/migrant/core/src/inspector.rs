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

//! Inspector plugin interface

use crate::contract::{InspectorContract, InspectorId};
use crate::decorator::Decorator;
use crate::error::InspectorError;
use crate::graph::GraphEntity;

/// A pluggable analysis rule.
///
/// The engine calls `supports` and then `analyze` at most once per entity of
/// kind `Target` and pass. All graph writes go through the decorator.
pub trait Inspector: Send + Sync {
    /// Entity kind this inspector runs on
    type Target: GraphEntity;

    /// Static dependency declaration, identical on every call
    fn contract(&self) -> &InspectorContract;

    fn id(&self) -> &InspectorId {
        &self.contract().id
    }

    /// Cheap applicability check
    fn supports(&self, _entity: &Self::Target) -> bool {
        true
    }

    fn analyze(&self, entity: &Self::Target, decorator: &mut Decorator<'_, Self::Target>) -> Result<(), InspectorError>;
}
