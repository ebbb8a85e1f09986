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

//! Enterprise bean classification
//!
//! A class is a bean when a descriptor names it as `ejb-class` or when its
//! source carries an EJB annotation or implements one of the EJB 2.x bean
//! interfaces.

use crate::ejb_descriptor::{self, BeanKind, DescriptorBean};
use crate::java_source::JAVA_SOURCE;
use crate::MIGRATION_REQUIRED;
use migrant_core::{ClassEntity, EntityKind, Inspector, InspectorContract, InspectorError, NodeDecorator, RequirementScope};
use regex::Regex;
use std::sync::LazyLock;

pub const ID: &str = "ejb.beans";
pub const EJB_BEAN: &str = "ejb.bean";
pub const EJB_SESSION_BEAN: &str = "ejb.sessionBean";
pub const EJB_MESSAGE_DRIVEN_BEAN: &str = "ejb.messageDrivenBean";
pub const EJB_BEAN_KIND: &str = "ejb.beanKind";

pub const HOME_INTERFACE_EDGE: &str = "ejb.home-interface";
pub const REMOTE_INTERFACE_EDGE: &str = "ejb.remote-interface";

static BEAN_ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(?:javax\.ejb\.|jakarta\.ejb\.)?(Stateless|Stateful|Singleton|MessageDriven)\b").expect("bean annotation pattern"));
static BEAN_INTERFACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bimplements\b[^{]*?\b(SessionBean|MessageDrivenBean|EntityBean)\b").expect("bean interface pattern"));

/// Bean kind declared in Java source, if any
pub fn kind_from_source(source: &str) -> Option<BeanKind> {
    let marker = BEAN_ANNOTATION
        .captures(source)
        .or_else(|| BEAN_INTERFACE.captures(source))
        .and_then(|captures| captures.get(1))?;
    match marker.as_str() {
        "Stateless" | "Stateful" | "Singleton" | "SessionBean" => Some(BeanKind::Session),
        "MessageDriven" | "MessageDrivenBean" => Some(BeanKind::MessageDriven),
        "EntityBean" => Some(BeanKind::Entity),
        _ => None,
    }
}

pub struct EjbBeans {
    contract: InspectorContract,
}

impl Default for EjbBeans {
    fn default() -> Self {
        Self::new()
    }
}

impl EjbBeans {
    pub fn new() -> Self {
        Self {
            contract: InspectorContract::builder(ID, EntityKind::Class)
                .needs(ejb_descriptor::ID)
                .requires(JAVA_SOURCE)
                .scope(RequirementScope::Linked)
                .produces(EJB_BEAN)
                .produces(EJB_SESSION_BEAN)
                .produces(EJB_MESSAGE_DRIVEN_BEAN)
                .produces(EJB_BEAN_KIND)
                .shares(MIGRATION_REQUIRED)
                .build(),
        }
    }

    fn link_interfaces(decorator: &mut NodeDecorator<'_>, bean: &DescriptorBean) {
        if let Some(home) = bean.home.as_deref().or(bean.local_home.as_deref()) {
            decorator.add_edge(home, HOME_INTERFACE_EDGE);
        }
        if let Some(remote) = bean.remote.as_deref() {
            decorator.add_edge(remote, REMOTE_INTERFACE_EDGE);
        }
    }
}

impl Inspector for EjbBeans {
    type Target = ClassEntity;

    fn contract(&self) -> &InspectorContract {
        &self.contract
    }

    fn analyze(&self, entity: &ClassEntity, decorator: &mut NodeDecorator<'_>) -> Result<(), InspectorError> {
        let declared = ejb_descriptor::find_bean(decorator.graph(), entity.fqn());
        let kind = match &declared {
            Some(bean) => Some(bean.kind),
            None => decorator.source()?.and_then(|source| kind_from_source(&source)),
        };
        let Some(kind) = kind else {
            decorator.not_applicable();
            return Ok(());
        };

        decorator.set_tag(EJB_BEAN, true)?;
        decorator.set_tag(EJB_SESSION_BEAN, kind == BeanKind::Session)?;
        decorator.set_tag(EJB_MESSAGE_DRIVEN_BEAN, kind == BeanKind::MessageDriven)?;
        decorator.set_tag(EJB_BEAN_KIND, kind.as_str())?;
        decorator.set_tag(MIGRATION_REQUIRED, true)?;

        if let Some(bean) = &declared {
            Self::link_interfaces(decorator, bean);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_kinds() {
        assert_eq!(kind_from_source("@Stateless\npublic class PriceBean {}"), Some(BeanKind::Session));
        assert_eq!(kind_from_source("@javax.ejb.MessageDriven(mappedName = \"jms/q\")\nclass Listener {}"), Some(BeanKind::MessageDriven));
    }

    #[test]
    fn test_legacy_interfaces() {
        let source = "public class AccountBean implements javax.ejb.EntityBean, Serializable {\n}";
        assert_eq!(kind_from_source(source), Some(BeanKind::Entity));
        assert_eq!(kind_from_source("class CartBean implements SessionBean {}"), Some(BeanKind::Session));
    }

    #[test]
    fn test_plain_class_is_not_a_bean() {
        assert_eq!(kind_from_source("public class Helper implements Runnable { SessionBean ref; }"), None);
    }

    #[test]
    fn test_contract_needs_descriptor() {
        let contract = EjbBeans::new().contract().clone();
        assert!(contract.need.contains(ejb_descriptor::ID));
        assert!(contract.shares(MIGRATION_REQUIRED));
        assert_eq!(contract.scope, RequirementScope::Linked);
    }
}
