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

//! `ejb-jar.xml` deployment descriptor parsing
//!
//! Extracts the enterprise beans declared in a descriptor, with their
//! interfaces and container transaction settings. Elements are matched by
//! local name, so namespace prefixes such as `j2ee:` make no difference.

use migrant_core::{EntityKind, FileEntity, Inspector, InspectorContract, InspectorError, KnowledgeGraph, ProjectFileDecorator};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub const ID: &str = "ejb.descriptor";
pub const EJB_DESCRIPTOR: &str = "ejb.descriptor";
pub const EJB_DESCRIPTOR_BEANS: &str = "ejb.descriptorBeans";

const DESCRIPTOR_FILE_NAME: &str = "ejb-jar.xml";
const ROOT_ELEMENT: &str = "ejb-jar";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BeanKind {
    Session,
    MessageDriven,
    Entity,
}

impl BeanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BeanKind::Session => "session",
            BeanKind::MessageDriven => "message-driven",
            BeanKind::Entity => "entity",
        }
    }

    fn from_element(name: &str) -> Option<Self> {
        match name {
            "session" => Some(BeanKind::Session),
            "message-driven" => Some(BeanKind::MessageDriven),
            "entity" => Some(BeanKind::Entity),
            _ => None,
        }
    }
}

/// One bean declared in `ejb-jar.xml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorBean {
    pub name: String,
    pub ejb_class: String,
    pub kind: BeanKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_home: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    /// Container transaction attributes as written in the descriptor
    #[serde(default)]
    pub transaction_attributes: Vec<String>,
}

/// Bean element being read; `depth` is its position in the element path
struct PendingBean {
    kind: BeanKind,
    depth: usize,
    elements: BTreeMap<String, String>,
}

impl PendingBean {
    fn finish(mut self) -> Result<DescriptorBean, String> {
        let name = self.elements.remove("ejb-name").ok_or_else(|| format!("{} bean without <ejb-name>", self.kind.as_str()))?;
        let ejb_class = self.elements.remove("ejb-class").ok_or_else(|| format!("bean '{name}' without <ejb-class>"))?;
        Ok(DescriptorBean {
            name,
            ejb_class,
            kind: self.kind,
            session_type: self.elements.remove("session-type"),
            home: self.elements.remove("home"),
            remote: self.elements.remove("remote"),
            local_home: self.elements.remove("local-home"),
            local: self.elements.remove("local"),
            transaction_type: self.elements.remove("transaction-type"),
            transaction_attributes: Vec::new(),
        })
    }
}

#[derive(Default)]
struct ContainerTransaction {
    beans: Vec<String>,
    attribute: Option<String>,
}

fn element_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

/// Parses the beans of an `ejb-jar.xml` document.
///
/// Returns a message describing the problem when the document is not
/// well-formed, is not a descriptor, or a bean lacks its name or
/// implementation class.
pub fn parse_descriptor(xml: &str) -> Result<Vec<DescriptorBean>, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut seen_root = false;
    let mut pending: Option<PendingBean> = None;
    let mut transaction: Option<ContainerTransaction> = None;
    let mut transactions = Vec::new();
    let mut beans = Vec::new();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(err) => return Err(format!("malformed descriptor at byte {}: {err}", reader.buffer_position())),
        };

        match event {
            Event::Start(start) => {
                let name = element_name(start.local_name().as_ref());
                if path.is_empty() {
                    if name != ROOT_ELEMENT {
                        return Err(format!("missing <{ROOT_ELEMENT}> root element"));
                    }
                    seen_root = true;
                }
                if pending.is_none() && path.last().is_some_and(|parent| parent == "enterprise-beans") {
                    if let Some(kind) = BeanKind::from_element(&name) {
                        pending = Some(PendingBean {
                            kind,
                            depth: path.len(),
                            elements: BTreeMap::new(),
                        });
                    }
                }
                if name == "container-transaction" {
                    transaction = Some(ContainerTransaction::default());
                }
                path.push(name);
                text.clear();
            }
            Event::Empty(empty) if path.is_empty() => {
                if element_name(empty.local_name().as_ref()) != ROOT_ELEMENT {
                    return Err(format!("missing <{ROOT_ELEMENT}> root element"));
                }
                seen_root = true;
            }
            Event::Text(value) => {
                let value = value.unescape().map_err(|err| format!("malformed descriptor text: {err}"))?;
                text.push_str(&value);
            }
            Event::CData(value) => {
                let value = reader.decoder().decode(&value).map_err(|err| format!("malformed descriptor text: {err}"))?;
                text.push_str(&value);
            }
            Event::End(_) => {
                let Some(name) = path.pop() else {
                    return Err("unbalanced closing element".to_string());
                };
                let value = text.trim().to_string();
                text.clear();
                let depth = path.len();

                match pending.as_ref().map(|bean| bean.depth) {
                    Some(bean_depth) if bean_depth == depth => {
                        if let Some(bean) = pending.take() {
                            beans.push(bean.finish()?);
                        }
                    }
                    Some(bean_depth) if bean_depth + 1 == depth && !value.is_empty() => {
                        if let Some(bean) = pending.as_mut() {
                            bean.elements.entry(name.clone()).or_insert_with(|| value.clone());
                        }
                    }
                    _ => {}
                }

                if name == "container-transaction" {
                    transactions.extend(transaction.take());
                } else if let Some(current) = transaction.as_mut() {
                    match name.as_str() {
                        "ejb-name" => current.beans.push(value),
                        "trans-attribute" => current.attribute = Some(value),
                        _ => {}
                    }
                }
            }
            Event::Eof => {
                if let Some(open) = path.last() {
                    return Err(format!("descriptor ends inside <{open}>"));
                }
                if !seen_root {
                    return Err(format!("missing <{ROOT_ELEMENT}> root element"));
                }
                break;
            }
            _ => {}
        }
    }

    for ContainerTransaction { beans: names, attribute } in transactions {
        let Some(attribute) = attribute else {
            continue;
        };
        for bean in beans.iter_mut().filter(|bean| names.contains(&bean.name)) {
            if !bean.transaction_attributes.contains(&attribute) {
                bean.transaction_attributes.push(attribute.clone());
            }
        }
    }

    Ok(beans)
}

/// Beans recorded on every analyzed descriptor in the graph
pub fn descriptor_beans(graph: &KnowledgeGraph) -> Vec<DescriptorBean> {
    graph
        .files()
        .iter()
        .filter_map(|file| file.facts().property(EJB_DESCRIPTOR_BEANS).map(|value| (file.path().to_string(), value)))
        .flat_map(|(path, value)| match serde_json::from_value::<Vec<DescriptorBean>>(value) {
            Ok(beans) => beans,
            Err(err) => {
                debug!(%path, %err, "ignoring unreadable descriptor beans");
                Vec::new()
            }
        })
        .collect()
}

/// Descriptor entry whose implementation class is `fqn`
pub fn find_bean(graph: &KnowledgeGraph, fqn: &str) -> Option<DescriptorBean> {
    descriptor_beans(graph).into_iter().find(|bean| bean.ejb_class == fqn)
}

pub struct EjbDescriptor {
    contract: InspectorContract,
}

impl Default for EjbDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

impl EjbDescriptor {
    pub fn new() -> Self {
        Self {
            contract: InspectorContract::builder(ID, EntityKind::File)
                .produces(EJB_DESCRIPTOR)
                .produces(EJB_DESCRIPTOR_BEANS)
                .build(),
        }
    }
}

impl Inspector for EjbDescriptor {
    type Target = FileEntity;

    fn contract(&self) -> &InspectorContract {
        &self.contract
    }

    fn supports(&self, entity: &FileEntity) -> bool {
        entity.file_name() == DESCRIPTOR_FILE_NAME
    }

    fn analyze(&self, entity: &FileEntity, decorator: &mut ProjectFileDecorator<'_>) -> Result<(), InspectorError> {
        let content = decorator.content()?;
        let beans = parse_descriptor(&content).map_err(|message| InspectorError::Parse {
            path: entity.path().to_string(),
            message,
        })?;

        debug!(path = entity.path(), beans = beans.len(), "parsed ejb descriptor");
        decorator.set_tag(EJB_DESCRIPTOR, true)?;
        decorator.set_property(EJB_DESCRIPTOR_BEANS, &beans)
    }
}
