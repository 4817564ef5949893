//! Grouped aggregation over rows ordered by the group-by columns.
//!
//! Groups are consecutive runs of equal group-by values, so only the
//! current group's accumulator and the first row of the next group are held
//! in memory. The input ordering is negotiated with the source the same way
//! the join does it.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use vtlset_core::prelude::{
    Component, DataPoint, DataStructure, EngineConfig, Error, Filtering, Ordering, Result, Role,
    Value, ValueType,
};

use crate::closer::Closer;
use crate::join::KeyExtractor;
use crate::sort::{compatible_order, get_or_sort};
use crate::stream::{DataStream, Rows};
use crate::traits::Dataset;

/// Reduction applied to the measure of each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    Sum,
    Min,
    Max,
    Count,
}

impl Reducer {
    pub fn name(self) -> &'static str {
        match self {
            Reducer::Sum => "sum",
            Reducer::Min => "min",
            Reducer::Max => "max",
            Reducer::Count => "count",
        }
    }

    fn output_type(self, input: ValueType) -> ValueType {
        match self {
            Reducer::Count => ValueType::Integer,
            _ => input,
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct Accumulator {
    reducer: Reducer,
    acc: Value,
    count: i64,
}

impl Accumulator {
    fn new(reducer: Reducer, ty: ValueType) -> Self {
        Self {
            reducer,
            acc: Value::null(ty),
            count: 0,
        }
    }

    // Nulls do not contribute.
    fn update(&mut self, value: &Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        self.count += 1;
        if self.acc.is_null() {
            self.acc = value.clone();
            return Ok(());
        }
        self.acc = match self.reducer {
            Reducer::Sum => self.acc.add(value)?,
            Reducer::Min if value.compare(&self.acc)? == Some(std::cmp::Ordering::Less) => {
                value.clone()
            }
            Reducer::Max if value.compare(&self.acc)? == Some(std::cmp::Ordering::Greater) => {
                value.clone()
            }
            Reducer::Min | Reducer::Max | Reducer::Count => return Ok(()),
        };
        Ok(())
    }

    fn finish(self) -> Value {
        match self.reducer {
            Reducer::Count => Value::from(self.count),
            _ => self.acc,
        }
    }
}

pub struct AggregationOperation {
    child: Arc<dyn Dataset>,
    group_by: Vec<Arc<Component>>,
    measure: Arc<Component>,
    reducer: Reducer,
    structure: Arc<DataStructure>,
    config: EngineConfig,
}

impl AggregationOperation {
    /// Reduce `measure` of `child` per distinct `group_by` value.
    pub fn new(
        child: Arc<dyn Dataset>,
        group_by: &[&str],
        measure: &str,
        reducer: Reducer,
    ) -> Result<Self> {
        let source = Arc::clone(child.structure());
        let group_by = group_by
            .iter()
            .map(|name| {
                source
                    .get(name)
                    .cloned()
                    .ok_or_else(|| Error::UnknownComponent(name.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        let measure = source
            .get(measure)
            .cloned()
            .ok_or_else(|| Error::UnknownComponent(measure.to_string()))?;
        if group_by.iter().any(|c| c.name() == measure.name()) {
            return Err(Error::Argument(format!(
                "'{}' cannot be both grouped by and aggregated",
                measure.name()
            )));
        }
        if reducer != Reducer::Count && !measure.value_type().is_numeric() {
            return Err(Error::Argument(format!(
                "{reducer} needs a numeric measure, '{}' is {}",
                measure.name(),
                measure.value_type()
            )));
        }

        let output = Arc::new(Component::new(
            measure.name(),
            Role::Measure,
            reducer.output_type(measure.value_type()),
        ));
        // Grouped measures and attributes become identifiers of the output.
        let keys = group_by.iter().map(|c| {
            if c.is_identifier() {
                Arc::clone(c)
            } else {
                Arc::new(Component::new(c.name(), Role::Identifier, c.value_type()))
            }
        });
        let structure = Arc::new(DataStructure::from_components(
            keys.chain(std::iter::once(output)),
        )?);

        Ok(Self {
            child,
            group_by,
            measure,
            reducer,
            structure,
            config: EngineConfig::default(),
        })
    }

    /// Sum the only measure of `child`. Fails unless it has exactly one.
    pub fn sum(child: Arc<dyn Dataset>, group_by: &[&str]) -> Result<Self> {
        let measures: Vec<String> = child
            .structure()
            .measures()
            .map(|c| c.name().to_string())
            .collect();
        match measures.as_slice() {
            [only] => Self::new(Arc::clone(&child), group_by, only, Reducer::Sum),
            _ => Err(Error::Argument(format!(
                "sum without an explicit measure needs a dataset with exactly one measure, {} has {} ({})",
                child.structure(),
                measures.len(),
                measures.join(", ")
            ))),
        }
    }

    /// Sum `measure` of `child`, whatever else it carries.
    pub fn sum_of(child: Arc<dyn Dataset>, group_by: &[&str], measure: &str) -> Result<Self> {
        Self::new(child, group_by, measure, Reducer::Sum)
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn group_by(&self) -> &[Arc<Component>] {
        &self.group_by
    }

    pub fn measure(&self) -> &Arc<Component> {
        &self.measure
    }

    pub fn reducer(&self) -> Reducer {
        self.reducer
    }

    fn group_names(&self) -> Vec<&str> {
        self.group_by.iter().map(|c| c.name()).collect()
    }
}

impl Dataset for AggregationOperation {
    fn structure(&self) -> &Arc<DataStructure> {
        &self.structure
    }

    fn compute_data(
        &self,
        ordering: &Ordering,
        filtering: &Filtering,
        columns: &[String],
    ) -> Result<DataStream> {
        let required = compatible_order(&self.group_by, ordering).ok_or_else(|| {
            Error::Unsupported(format!(
                "aggregation cannot produce rows ordered by {}: only the group-by columns ({}) can be used",
                ordering,
                self.group_names().join(", ")
            ))
        })?;
        if !filtering.refers_only_to(self.group_names()) {
            return Err(Error::Unsupported(format!(
                "aggregation cannot filter by {:?}: only the group-by columns ({}) can be used",
                filtering,
                self.group_names().join(", ")
            )));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            reducer = self.reducer.name(),
            measure = self.measure.name(),
            ordering = %required,
            "wiring aggregation"
        );

        let mut columns: Vec<String> = columns
            .iter()
            .filter(|c| self.child.structure().contains(c))
            .cloned()
            .collect();
        if !columns.is_empty() && !columns.iter().any(|c| c == self.measure.name()) {
            columns.push(self.measure.name().to_string());
        }

        let mut closer = Closer::new();
        let stream = get_or_sort(
            self.child.as_ref(),
            &required.project_onto(self.child.structure())?,
            filtering,
            &columns,
            &self.config,
        )?;
        let source = Arc::clone(stream.structure());
        let rows = closer.register("aggregation input", stream);

        let grouped = match Grouped::new(rows, &source, self, &required) {
            Ok(grouped) => grouped,
            Err(e) => return Err(closer.close_with(e)),
        };
        Ok(DataStream::new(Arc::clone(&self.structure), grouped)
            .requested(ordering.clone(), filtering.clone())
            .applied(required, filtering.clone())
            .on_close(move || closer.close()))
    }

    fn unsupported_ordering(&self, ordering: &Ordering) -> Ordering {
        match compatible_order(&self.group_by, ordering) {
            Some(_) => Ordering::any(),
            None => ordering.clone(),
        }
    }

    fn unsupported_filtering(&self, filtering: &Filtering) -> Filtering {
        if filtering.refers_only_to(self.group_names()) {
            Filtering::all()
        } else {
            filtering.clone()
        }
    }
}

impl fmt::Debug for AggregationOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregationOperation")
            .field("group_by", &self.group_names())
            .field("measure", &self.measure.name())
            .field("reducer", &self.reducer)
            .finish()
    }
}

/// Emits one row per run of equal group-by keys.
struct Grouped {
    input: Rows,
    keys: KeyExtractor,
    ordering: Ordering,
    measure_pos: usize,
    measure_name: String,
    reducer: Reducer,
    measure_type: ValueType,
    output: Arc<DataStructure>,
    /// First row of the next group.
    carry: Option<(Vec<Value>, DataPoint)>,
    done: bool,
}

impl Grouped {
    fn new(
        input: Rows,
        source: &DataStructure,
        op: &AggregationOperation,
        ordering: &Ordering,
    ) -> Result<Self> {
        let measure_pos = source
            .index_of(op.measure.name())
            .ok_or_else(|| Error::UnknownComponent(op.measure.name().to_string()))?;
        Ok(Self {
            input,
            keys: KeyExtractor::by_name(source, ordering)?,
            ordering: ordering.clone(),
            measure_pos,
            measure_name: op.measure.name().to_string(),
            reducer: op.reducer,
            measure_type: op.measure.value_type(),
            output: Arc::clone(&op.structure),
            carry: None,
            done: false,
        })
    }

    fn pull(&mut self) -> Result<Option<(Vec<Value>, DataPoint)>> {
        if let Some(carried) = self.carry.take() {
            return Ok(Some(carried));
        }
        match self.input.next() {
            None => Ok(None),
            Some(item) => {
                let point = item?;
                let key = self.keys.extract(&point)?;
                Ok(Some((key, point)))
            }
        }
    }

    fn measure_of<'p>(&self, point: &'p DataPoint) -> Result<&'p Value> {
        let pos = self.measure_pos;
        match point.structure().components().get(pos) {
            Some(c) if c.name() == self.measure_name => Ok(&point.values()[pos]),
            _ => Err(Error::Invariant(format!(
                "row {point} does not hold measure '{}' at position {pos}",
                self.measure_name
            ))),
        }
    }

    fn next_group(&mut self) -> Result<Option<DataPoint>> {
        let Some((key, first)) = self.pull()? else {
            return Ok(None);
        };
        let mut acc = Accumulator::new(self.reducer, self.measure_type);
        acc.update(self.measure_of(&first)?)?;
        while let Some((next_key, point)) = self.pull()? {
            if self.ordering.compare_keys(&key, &next_key) != std::cmp::Ordering::Equal {
                self.carry = Some((next_key, point));
                break;
            }
            acc.update(self.measure_of(&point)?)?;
        }

        // Keys are in ordering order, output columns in group-by order.
        let mut values = Vec::with_capacity(self.output.len());
        for component in self.output.components() {
            match self.ordering.columns().position(|c| c == component.name()) {
                Some(pos) => values.push(key[pos].clone()),
                None => values.push(Value::null(component.value_type())),
            }
        }
        if let Some(last) = values.last_mut() {
            *last = acc.finish();
        }
        Ok(Some(DataPoint::from_trusted(Arc::clone(&self.output), values)))
    }
}

impl Iterator for Grouped {
    type Item = Result<DataPoint>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_group() {
            Ok(Some(point)) => Some(Ok(point)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDataset;

    fn dataset(rows: &[(i64, &str, Option<i64>)]) -> Arc<dyn Dataset> {
        let s = Arc::new(
            DataStructure::try_new([
                ("time", Role::Identifier, ValueType::Integer),
                ("geo", Role::Identifier, ValueType::String),
                ("m1", Role::Measure, ValueType::Integer),
            ])
            .unwrap(),
        );
        let rows = rows.iter().map(|&(t, g, m)| {
            vec![
                ("time", Value::from(t)),
                ("geo", Value::from(g)),
                ("m1", Value::Integer(m)),
            ]
        });
        Arc::new(MemoryDataset::from_pairs(s, rows).unwrap())
    }

    fn reduce(reducer: Reducer, rows: &[(i64, &str, Option<i64>)]) -> Vec<(i64, Value)> {
        let op = AggregationOperation::new(dataset(rows), &["time"], "m1", reducer).unwrap();
        op.data()
            .unwrap()
            .map(|p| {
                let p = p.unwrap();
                (p.get("time").and_then(Value::as_i64).unwrap(), p.get("m1").unwrap().clone())
            })
            .collect()
    }

    const ROWS: &[(i64, &str, Option<i64>)] = &[
        (2010, "NO", Some(20)),
        (2011, "NO", None),
        (2010, "SE", Some(40)),
        (2011, "SE", Some(3)),
        (2012, "NO", None),
    ];

    #[test]
    fn reducers_skip_nulls() {
        assert_eq!(
            reduce(Reducer::Sum, ROWS),
            vec![
                (2010, Value::from(60_i64)),
                (2011, Value::from(3_i64)),
                (2012, Value::Integer(None)),
            ]
        );
        assert_eq!(reduce(Reducer::Min, ROWS)[0].1, Value::from(20_i64));
        assert_eq!(reduce(Reducer::Max, ROWS)[0].1, Value::from(40_i64));
        assert_eq!(
            reduce(Reducer::Count, ROWS),
            vec![
                (2010, Value::from(2_i64)),
                (2011, Value::from(1_i64)),
                (2012, Value::from(0_i64)),
            ]
        );
    }

    #[test]
    fn output_structure_keeps_group_by_and_measure() {
        let op = AggregationOperation::sum(dataset(ROWS), &["time"]).unwrap();
        let names: Vec<&str> = op.structure().components().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["time", "m1"]);
        assert!(op.structure().get("m1").unwrap().is_measure());

        let count = AggregationOperation::new(dataset(ROWS), &["geo"], "m1", Reducer::Count).unwrap();
        assert_eq!(count.structure().get("m1").unwrap().value_type(), ValueType::Integer);
    }

    #[test]
    fn non_numeric_measure_is_rejected() {
        let err =
            AggregationOperation::new(dataset(ROWS), &["time"], "geo", Reducer::Sum).unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
    }

    #[test]
    fn requested_group_order_is_honoured() {
        let op = AggregationOperation::sum(dataset(ROWS), &["time", "geo"]).unwrap();
        let geo = Arc::clone(op.structure().get("geo").unwrap());
        let ordering = Ordering::any().then(geo, vtlset_core::prelude::Direction::Desc);
        let geos: Vec<String> = op
            .compute_data(&ordering, &Filtering::all(), &[])
            .unwrap()
            .map(|p| p.unwrap().get("geo").and_then(Value::as_str).unwrap().to_string())
            .collect();
        assert_eq!(geos, vec!["SE", "SE", "NO", "NO", "NO"]);
    }

    #[test]
    fn filtering_outside_group_by_is_unsupported() {
        let op = AggregationOperation::sum(dataset(ROWS), &["time"]).unwrap();
        let err = op
            .compute_data(&Ordering::any(), &Filtering::eq("geo", "NO"), &[])
            .unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn grouping_by_a_measure_makes_it_an_identifier() {
        let s = Arc::new(
            DataStructure::try_new([
                ("time", Role::Identifier, ValueType::Integer),
                ("m1", Role::Measure, ValueType::Integer),
                ("m2", Role::Measure, ValueType::Integer),
            ])
            .unwrap(),
        );
        let ds = MemoryDataset::from_pairs(
            s,
            vec![
                vec![("time", 2010_i64), ("m1", 1_i64), ("m2", 5_i64)],
                vec![("time", 2011_i64), ("m1", 1_i64), ("m2", 7_i64)],
                vec![("time", 2012_i64), ("m1", 2_i64), ("m2", 9_i64)],
            ],
        )
        .unwrap();
        let op = AggregationOperation::sum_of(Arc::new(ds), &["m1"], "m2").unwrap();

        assert!(op.structure().get("m1").unwrap().is_identifier());
        assert_eq!(op.structure().measures().count(), 1);
        let sums: Vec<(i64, i64)> = op
            .data()
            .unwrap()
            .map(|p| {
                let p = p.unwrap();
                (
                    p.get("m1").and_then(Value::as_i64).unwrap(),
                    p.get("m2").and_then(Value::as_i64).unwrap(),
                )
            })
            .collect();
        assert_eq!(sums, vec![(1, 12), (2, 9)]);
    }

    /// Declares one layout but yields rows bound to an equal, reordered one.
    struct Misaligned {
        structure: Arc<DataStructure>,
        rows: Vec<DataPoint>,
    }

    impl Dataset for Misaligned {
        fn structure(&self) -> &Arc<DataStructure> {
            &self.structure
        }

        fn compute_data(
            &self,
            ordering: &Ordering,
            filtering: &Filtering,
            _columns: &[String],
        ) -> Result<DataStream> {
            Ok(DataStream::from_points(Arc::clone(&self.structure), self.rows.clone())
                .requested(ordering.clone(), filtering.clone())
                .applied(ordering.clone(), filtering.clone()))
        }
    }

    #[test]
    fn misaligned_rows_are_an_invariant_error() {
        let declared = Arc::clone(dataset(ROWS).structure());
        let reordered = Arc::new(
            DataStructure::try_new([
                ("m1", Role::Measure, ValueType::Integer),
                ("geo", Role::Identifier, ValueType::String),
                ("time", Role::Identifier, ValueType::Integer),
            ])
            .unwrap(),
        );
        let rows = vec![
            reordered
                .wrap([("time", Value::from(2010_i64)), ("geo", Value::from("NO")), ("m1", Value::from(20_i64))])
                .unwrap(),
            reordered
                .wrap([("time", Value::from(2010_i64)), ("geo", Value::from("SE")), ("m1", Value::from(40_i64))])
                .unwrap(),
        ];
        let source = Arc::new(Misaligned {
            structure: declared,
            rows,
        });

        let op = AggregationOperation::sum(source, &["time"]).unwrap();
        let first = op.data().unwrap().next().unwrap();
        assert!(matches!(first, Err(Error::Invariant(_))));
    }
}
