//! Multi-way join over named datasets.
//!
//! The join asks every source for its rows ordered by the common
//! identifiers, then folds the sources pairwise from left to right with a
//! `SortMergeJoin`. The first fold reads keys from the first source's own
//! structure through the component mapping; every later fold reads keys
//! from already merged rows, which carry the output structure.
//!
//! All sources are registered with one `Closer`. Closing the result stream
//! releases each of them once; failing to wire up the join releases the
//! ones already opened before the error is returned.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use vtlset_core::prelude::{
    Component, DataStructure, EngineConfig, Error, Filtering, Ordering, Result,
};

use crate::closer::Closer;
use crate::join::key::KeyExtractor;
use crate::join::mapping::ComponentMapping;
use crate::join::merge::SortMergeJoin;
use crate::join::merger::{Merger, StructureMerger};
use crate::join::strategy::JoinKind;
use crate::sort::{compatible_order, get_or_sort};
use crate::stream::{DataStream, Rows};
use crate::traits::Dataset;

pub struct JoinOperation {
    kind: JoinKind,
    datasets: Vec<(String, Arc<dyn Dataset>)>,
    identifiers: Vec<Arc<Component>>,
    mapping: ComponentMapping,
    structure: Arc<DataStructure>,
    config: EngineConfig,
}

impl JoinOperation {
    /// Join `datasets` on the named identifiers.
    ///
    /// Fails before any row is read when the structures conflict, when a
    /// name is not an identifier of every dataset, or when more than one
    /// dataset is given without a common identifier.
    pub fn new<S: Into<String>>(
        kind: JoinKind,
        datasets: impl IntoIterator<Item = (S, Arc<dyn Dataset>)>,
        identifiers: &[&str],
    ) -> Result<Self> {
        let datasets: Vec<(String, Arc<dyn Dataset>)> =
            datasets.into_iter().map(|(n, d)| (n.into(), d)).collect();
        if datasets.is_empty() {
            return Err(Error::Argument("a join needs at least one dataset".into()));
        }
        let mut seen = HashSet::new();
        for (name, _) in &datasets {
            if !seen.insert(name.as_str()) {
                return Err(Error::Argument(format!("dataset '{name}' joined twice")));
            }
        }

        let mut structure = DataStructure::clone(datasets[0].1.structure());
        for (_, dataset) in &datasets[1..] {
            structure = structure.merge(dataset.structure())?;
        }
        let structure = Arc::new(structure);

        let identifiers = identifiers
            .iter()
            .map(|name| match structure.get(name) {
                Some(c) if c.is_identifier() => Ok(Arc::clone(c)),
                Some(_) => Err(Error::Argument(format!("'{name}' is not an identifier"))),
                None => Err(Error::UnknownComponent(name.to_string())),
            })
            .collect::<Result<Vec<_>>>()?;
        if identifiers.is_empty() && datasets.len() > 1 {
            return Err(Error::Argument(format!(
                "datasets {} share no identifier to join on",
                datasets
                    .iter()
                    .map(|(n, _)| n.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        let mapping = ComponentMapping::build(
            &identifiers,
            datasets.iter().map(|(n, d)| (n.as_str(), d.structure().as_ref())),
        )?;

        Ok(Self {
            kind,
            datasets,
            identifiers,
            mapping,
            structure,
            config: EngineConfig::default(),
        })
    }

    /// Join on every identifier the datasets have in common.
    pub fn on_common_identifiers<S: Into<String>>(
        kind: JoinKind,
        datasets: impl IntoIterator<Item = (S, Arc<dyn Dataset>)>,
    ) -> Result<Self> {
        let datasets: Vec<(String, Arc<dyn Dataset>)> =
            datasets.into_iter().map(|(n, d)| (n.into(), d)).collect();
        let common: Vec<String> = match datasets.first() {
            None => Vec::new(),
            Some((_, first)) => first
                .structure()
                .identifiers()
                .filter(|c| {
                    datasets[1..].iter().all(|(_, d)| {
                        d.structure().get(c.name()).is_some_and(|o| o.is_identifier())
                    })
                })
                .map(|c| c.name().to_string())
                .collect(),
        };
        let names: Vec<&str> = common.iter().map(String::as_str).collect();
        Self::new(kind, datasets, &names)
    }

    pub fn inner<S: Into<String>>(
        datasets: impl IntoIterator<Item = (S, Arc<dyn Dataset>)>,
    ) -> Result<Self> {
        Self::on_common_identifiers(JoinKind::Inner, datasets)
    }

    pub fn outer<S: Into<String>>(
        datasets: impl IntoIterator<Item = (S, Arc<dyn Dataset>)>,
    ) -> Result<Self> {
        Self::on_common_identifiers(JoinKind::Outer, datasets)
    }

    pub fn left<S: Into<String>>(
        datasets: impl IntoIterator<Item = (S, Arc<dyn Dataset>)>,
    ) -> Result<Self> {
        Self::on_common_identifiers(JoinKind::Left, datasets)
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    pub fn identifiers(&self) -> &[Arc<Component>] {
        &self.identifiers
    }

    pub fn mapping(&self) -> &ComponentMapping {
        &self.mapping
    }

    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.datasets.iter().map(|(n, _)| n.as_str())
    }

    fn required_ordering(&self, requested: &Ordering) -> Result<Ordering> {
        compatible_order(&self.identifiers, requested).ok_or_else(|| {
            Error::Unsupported(format!(
                "{} join cannot produce rows ordered by {}: only the common identifiers ({}) can be used",
                self.kind.strategy().name(),
                requested,
                self.identifier_names().join(", ")
            ))
        })
    }

    fn identifier_names(&self) -> Vec<&str> {
        self.identifiers.iter().map(|c| c.name()).collect()
    }

    fn open_source(
        &self,
        name: &str,
        dataset: &dyn Dataset,
        required: &Ordering,
        filtering: &Filtering,
        columns: &[String],
        closer: &mut Closer,
    ) -> Result<Rows> {
        let ordering = required.project_onto(dataset.structure())?;
        let columns: Vec<String> = columns
            .iter()
            .filter(|c| dataset.structure().contains(c))
            .cloned()
            .collect();
        let stream = get_or_sort(dataset, &ordering, filtering, &columns, &self.config)?;
        Ok(closer.register(name, stream))
    }

    fn wire(
        &self,
        required: &Ordering,
        filtering: &Filtering,
        columns: &[String],
        closer: &mut Closer,
    ) -> Result<Rows> {
        let (first_name, first) = &self.datasets[0];
        let first_rows =
            self.open_source(first_name, first.as_ref(), required, filtering, columns, closer)?;

        if self.datasets.len() == 1 {
            let merger = StructureMerger::single(first.structure(), Arc::clone(&self.structure))?;
            return Ok(Box::new(
                first_rows.map(move |row| row.map(|p| merger.merge(Some(&p), None))),
            ));
        }

        let mut left_rows = first_rows;
        let mut left_structure = Arc::clone(first.structure());
        let mut first_fold = true;
        for (name, dataset) in &self.datasets[1..] {
            let right_rows =
                self.open_source(name, dataset.as_ref(), required, filtering, columns, closer)?;

            let left_keys = if first_fold {
                KeyExtractor::new(&left_structure, required, |logical| {
                    Ok(self.mapping.resolve(logical, first_name)?.name().to_string())
                })?
            } else {
                KeyExtractor::by_name(&left_structure, required)?
            };
            let right_keys = KeyExtractor::new(dataset.structure(), required, |logical| {
                Ok(self.mapping.resolve(logical, name)?.name().to_string())
            })?;
            let merger = StructureMerger::new(
                &left_structure,
                dataset.structure(),
                Arc::clone(&self.structure),
            )?;

            left_rows = Box::new(SortMergeJoin::new(
                (left_rows, left_keys),
                (right_rows, right_keys),
                required.clone(),
                Box::new(merger),
                self.kind.strategy(),
            ));
            left_structure = Arc::clone(&self.structure);
            first_fold = false;
        }
        Ok(left_rows)
    }
}

impl Dataset for JoinOperation {
    fn structure(&self) -> &Arc<DataStructure> {
        &self.structure
    }

    fn compute_data(
        &self,
        ordering: &Ordering,
        filtering: &Filtering,
        columns: &[String],
    ) -> Result<DataStream> {
        let required = self.required_ordering(ordering)?;
        if !filtering.refers_only_to(self.identifier_names()) {
            return Err(Error::Unsupported(format!(
                "{} join cannot filter by {:?}: only the common identifiers ({}) can be used",
                self.kind.strategy().name(),
                filtering,
                self.identifier_names().join(", ")
            )));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            kind = self.kind.strategy().name(),
            sources = self.datasets.len(),
            ordering = %required,
            "wiring join"
        );

        let mut closer = Closer::new();
        let rows = match self.wire(&required, filtering, columns, &mut closer) {
            Ok(rows) => rows,
            Err(e) => return Err(closer.close_with(e)),
        };
        Ok(DataStream::new(Arc::clone(&self.structure), rows)
            .requested(ordering.clone(), filtering.clone())
            .applied(required, filtering.clone())
            .on_close(move || closer.close()))
    }

    fn unsupported_ordering(&self, ordering: &Ordering) -> Ordering {
        match compatible_order(&self.identifiers, ordering) {
            Some(_) => Ordering::any(),
            None => ordering.clone(),
        }
    }

    fn unsupported_filtering(&self, filtering: &Filtering) -> Filtering {
        if filtering.refers_only_to(self.identifier_names()) {
            Filtering::all()
        } else {
            filtering.clone()
        }
    }

    fn size(&self) -> Option<u64> {
        match self.datasets.as_slice() {
            [(_, only)] => only.size(),
            _ => None,
        }
    }
}

impl fmt::Debug for JoinOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinOperation")
            .field("kind", &self.kind)
            .field("datasets", &self.dataset_names().collect::<Vec<_>>())
            .field("identifiers", &self.identifier_names())
            .field("structure", &self.structure.to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDataset;
    use vtlset_core::prelude::{Direction, Role, Value, ValueType};

    fn dataset(measure: &str, rows: &[(i64, &str, i64)]) -> Arc<dyn Dataset> {
        let s = Arc::new(
            DataStructure::try_new([
                ("time".to_string(), Role::Identifier, ValueType::Integer),
                ("geo".to_string(), Role::Identifier, ValueType::String),
                (measure.to_string(), Role::Measure, ValueType::Integer),
            ])
            .unwrap(),
        );
        let rows = rows.iter().map(|&(t, g, m)| {
            vec![
                ("time", Value::from(t)),
                ("geo", Value::from(g)),
                (measure, Value::from(m)),
            ]
        });
        Arc::new(MemoryDataset::from_pairs(s, rows).unwrap())
    }

    #[test]
    fn infers_common_identifiers() {
        let join = JoinOperation::inner([
            ("a", dataset("m1", &[])),
            ("b", dataset("m2", &[])),
        ])
        .unwrap();
        assert_eq!(join.identifier_names(), vec!["time", "geo"]);
        assert_eq!(join.structure().len(), 4);
        assert_eq!(join.mapping().len(), 4);
    }

    #[test]
    fn single_dataset_passes_through() {
        let join = JoinOperation::outer([("a", dataset("m1", &[(2010, "NO", 1)]))]).unwrap();
        assert_eq!(join.size(), Some(1));
        let rows: Vec<_> = join.data().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn descending_request_is_honoured() {
        let join = JoinOperation::inner([
            ("a", dataset("m1", &[(2010, "NO", 1), (2011, "NO", 2)])),
            ("b", dataset("m2", &[(2010, "NO", 3), (2011, "NO", 4)])),
        ])
        .unwrap();
        let time = Arc::clone(join.structure().get("time").unwrap());
        let ordering = Ordering::any().then(time, Direction::Desc);
        assert!(join.unsupported_ordering(&ordering).is_empty());

        let stream = join.compute_data(&ordering, &Filtering::all(), &[]).unwrap();
        assert!(stream.residual_ordering().is_empty());
        let times: Vec<i64> = stream
            .map(|p| p.unwrap().get("time").and_then(Value::as_i64).unwrap())
            .collect();
        assert_eq!(times, vec![2011, 2010]);
    }

    #[test]
    fn identifier_filter_is_pushed_down() {
        let join = JoinOperation::outer([
            ("a", dataset("m1", &[(2010, "NO", 1), (2011, "NO", 2)])),
            ("b", dataset("m2", &[(2011, "NO", 4), (2012, "NO", 5)])),
        ])
        .unwrap();
        let keep = Filtering::eq("time", 2011_i64);
        assert!(join.unsupported_filtering(&keep).is_all());
        let stream = join.compute_data(&Ordering::any(), &keep, &[]).unwrap();
        assert!(stream.residual_filtering().is_all());
        assert_eq!(stream.count(), 1);

        let on_measure = Filtering::eq("m1", 1_i64);
        assert_eq!(join.unsupported_filtering(&on_measure), on_measure);
        let err = join.compute_data(&Ordering::any(), &on_measure, &[]).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn rejects_duplicate_names_and_missing_identifiers() {
        let err = JoinOperation::inner([("a", dataset("m1", &[])), ("a", dataset("m2", &[]))])
            .unwrap_err();
        assert!(matches!(err, Error::Argument(_)));

        let err = JoinOperation::new(
            JoinKind::Inner,
            [("a", dataset("m1", &[])), ("b", dataset("m2", &[]))],
            &["m1"],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
    }
}
