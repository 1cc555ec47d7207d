//! Eager loading of declared relationships.
//!
//! One follow-up query per relationship, `WHERE foreign_key IN (parent
//! keys)`, run concurrently. Related rows are partitioned back onto their
//! parents by comparing normalized key values.

use std::collections::{HashMap, HashSet};

use futures::future::try_join_all;
use strata_core::SqlValue;
use tracing::debug;

use super::clause::{Binding, Group, Operator, RawQuery};
use crate::attributes::Attributes;
use crate::database::Database;
use crate::error::{OrmError, Result};
use crate::metadata::{ModelMetadata, RelationKind, RelationshipDefinition};
use crate::relations::RelationData;

/// Loads `relations` for `parents`.
///
/// Returns, per relation, one [`RelationData`] per parent in parent order.
/// Names without a declared relationship are skipped.
pub(crate) async fn load(
    db: &Database,
    parent: &ModelMetadata,
    parents: &[Attributes],
    relations: &[String],
) -> Result<Vec<(String, Vec<RelationData>)>> {
    let loads = relations
        .iter()
        .filter_map(|name| parent.relationship(name))
        .map(|definition| load_relation(db, definition, parents));
    try_join_all(loads).await
}

async fn load_relation(
    db: &Database,
    definition: &RelationshipDefinition,
    parents: &[Attributes],
) -> Result<(String, Vec<RelationData>)> {
    let related = db.models().resolve(&definition.related);

    let mut seen = HashSet::new();
    let keys: Vec<SqlValue> = parents
        .iter()
        .filter_map(|row| row.value(&definition.local_key))
        .filter(|value| value.match_key().is_some_and(|key| seen.insert(key)))
        .cloned()
        .collect();

    let mut by_key: HashMap<String, Vec<Attributes>> = HashMap::new();
    if !keys.is_empty() {
        let mut query = RawQuery::select(related.table());
        query.push_binding(Binding::new(
            definition.foreign_key.as_str(),
            Operator::In,
            SqlValue::List(keys),
            Group::And,
        ));
        let rows = db.fetch(&query.compile()?).await?;
        debug!(
            relation = %definition.property,
            table = %related.table(),
            rows = rows.len(),
            "eager loaded relation"
        );
        for row in rows {
            let row = related
                .cast_attributes(row)
                .map_err(|e| OrmError::Hydrate {
                    model: related.name().to_string(),
                    source: Box::new(e),
                })?;
            if let Some(key) = row.value(&definition.foreign_key).and_then(SqlValue::match_key) {
                by_key.entry(key).or_default().push(row);
            }
        }
    }

    let data = parents
        .iter()
        .map(|parent| {
            let matches = parent
                .value(&definition.local_key)
                .and_then(SqlValue::match_key)
                .and_then(|key| by_key.get(&key));
            match definition.kind {
                RelationKind::HasMany => RelationData::Many(matches.cloned().unwrap_or_default()),
                RelationKind::HasOne => {
                    RelationData::One(matches.and_then(|rows| rows.first().cloned()))
                }
            }
        })
        .collect();

    Ok((definition.property.clone(), data))
}
