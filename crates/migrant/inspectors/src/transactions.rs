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

//! Transaction demarcation patterns of enterprise beans

use crate::ejb_beans::EJB_BEAN;
use crate::ejb_descriptor;
use migrant_core::{ClassEntity, EntityKind, Inspector, InspectorContract, InspectorError, NodeDecorator};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

pub const ID: &str = "tx.patterns";
pub const TX_BEAN_MANAGED: &str = "tx.beanManaged";
pub const TX_ATTRIBUTES: &str = "tx.attributes";

static BEAN_MANAGED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@TransactionManagement\s*\(\s*(?:value\s*=\s*)?(?:[\w.]*\.)?TransactionManagementType\.BEAN\b|\bUserTransaction\b").expect("bean managed pattern")
});
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bTransactionAttributeType\.([A-Z_]+)\b").expect("transaction attribute pattern"));

/// Converts descriptor spelling (`RequiresNew`) to the annotation constant (`REQUIRES_NEW`)
fn constant_case(attribute: &str) -> String {
    let attribute = attribute.trim();
    if attribute.chars().all(|ch| ch.is_ascii_uppercase() || ch == '_') {
        return attribute.to_string();
    }
    let mut constant = String::with_capacity(attribute.len() + 4);
    for (index, ch) in attribute.chars().enumerate() {
        if ch.is_ascii_uppercase() && index > 0 && !constant.ends_with('_') {
            constant.push('_');
        }
        constant.push(ch.to_ascii_uppercase());
    }
    constant
}

pub struct TransactionPatterns {
    contract: InspectorContract,
}

impl Default for TransactionPatterns {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionPatterns {
    pub fn new() -> Self {
        Self {
            contract: InspectorContract::builder(ID, EntityKind::Class)
                .requires(EJB_BEAN)
                .produces(TX_BEAN_MANAGED)
                .produces(TX_ATTRIBUTES)
                .build(),
        }
    }
}

impl Inspector for TransactionPatterns {
    type Target = ClassEntity;

    fn contract(&self) -> &InspectorContract {
        &self.contract
    }

    fn analyze(&self, entity: &ClassEntity, decorator: &mut NodeDecorator<'_>) -> Result<(), InspectorError> {
        let declared = ejb_descriptor::find_bean(decorator.graph(), entity.fqn());
        let source = decorator.source()?;

        let mut bean_managed = declared
            .as_ref()
            .and_then(|bean| bean.transaction_type.as_deref())
            .is_some_and(|kind| kind.eq_ignore_ascii_case("bean"));
        let mut attributes: BTreeSet<String> = declared
            .iter()
            .flat_map(|bean| bean.transaction_attributes.iter())
            .map(|attribute| constant_case(attribute))
            .collect();

        if let Some(source) = &source {
            bean_managed |= BEAN_MANAGED.is_match(source);
            attributes.extend(ATTRIBUTE.captures_iter(source).filter_map(|captures| captures.get(1)).map(|attribute| attribute.as_str().to_string()));
        }

        decorator.set_tag(TX_BEAN_MANAGED, bean_managed)?;
        decorator.set_property(TX_ATTRIBUTES, &attributes)
    }
}
