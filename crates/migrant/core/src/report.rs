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

//! Run records and the per-run report

use crate::contract::{EntityKind, InspectorId};
use crate::facts::FactName;
use crate::graph::GraphEntity;
use serde::Serialize;
use std::fmt;

/// Why a pair was not applicable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Skip {
    /// `supports()` returned false
    Unsupported,
    /// A required fact was not present
    MissingFact(FactName),
    /// The inspector called `not_applicable()`
    Declined,
}

/// Outcome of one `(inspector, entity)` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    NotApplicable(Skip),
    Failed(String),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Outcome::NotApplicable(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Applied => f.write_str("applied"),
            Outcome::NotApplicable(Skip::Unsupported) => f.write_str("not applicable (unsupported)"),
            Outcome::NotApplicable(Skip::MissingFact(fact)) => write!(f, "not applicable (missing '{fact}')"),
            Outcome::NotApplicable(Skip::Declined) => f.write_str("not applicable (declined)"),
            Outcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Reference to a graph entity by kind and key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub key: String,
}

impl EntityRef {
    pub fn of<E: GraphEntity>(entity: &E) -> Self {
        Self {
            kind: E::KIND,
            key: entity.key().to_string(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRecord {
    pub inspector: InspectorId,
    pub entity: EntityRef,
    pub outcome: Outcome,
}

/// Counts for one inspector's pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageSummary {
    pub inspector: InspectorId,
    pub applied: usize,
    pub not_applicable: usize,
    pub failed: usize,
}

impl StageSummary {
    pub fn total(&self) -> usize {
        self.applied + self.not_applicable + self.failed
    }
}

/// Complete log of one analysis pass, in execution order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    records: Vec<RunRecord>,
    stages: Vec<StageSummary>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the records of one finished stage
    pub fn push_stage(&mut self, inspector: InspectorId, records: Vec<RunRecord>) -> &StageSummary {
        let mut summary = StageSummary {
            inspector,
            ..StageSummary::default()
        };
        for record in &records {
            match record.outcome {
                Outcome::Applied => summary.applied += 1,
                Outcome::NotApplicable(_) => summary.not_applicable += 1,
                Outcome::Failed(_) => summary.failed += 1,
            }
        }
        self.records.extend(records);
        self.stages.push(summary);
        &self.stages[self.stages.len() - 1]
    }

    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    pub fn stages(&self) -> &[StageSummary] {
        &self.stages
    }

    /// Outcome recorded for an inspector on an entity
    pub fn outcome(&self, inspector: &str, kind: EntityKind, key: &str) -> Option<&Outcome> {
        self.records
            .iter()
            .find(|record| record.inspector.as_str() == inspector && record.entity.kind == kind && record.entity.key == key)
            .map(|record| &record.outcome)
    }

    pub fn records_for<'a>(&'a self, inspector: &'a str) -> impl Iterator<Item = &'a RunRecord> + 'a {
        self.records.iter().filter(move |record| record.inspector.as_str() == inspector)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RunRecord> + '_ {
        self.records.iter().filter(|record| record.outcome.is_failed())
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Totals across all stages
    pub fn totals(&self) -> StageSummary {
        self.stages.iter().fold(StageSummary::default(), |mut acc, stage| {
            acc.applied += stage.applied;
            acc.not_applicable += stage.not_applicable;
            acc.failed += stage.failed;
            acc
        })
    }
}
