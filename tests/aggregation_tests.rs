//! Grouped aggregation over single- and multi-measure datasets.

mod common;

use std::sync::Arc;

use common::{dataset, render, shared, CloseCounter};
use vtlset::prelude::*;

fn yearly() -> MemoryDataset {
    dataset(
        &["m1"],
        &[
            (2010, "NO", &[20]),
            (2010, "SE", &[40]),
            (2010, "DK", &[60]),
            (2011, "NO", &[31]),
            (2011, "SE", &[31]),
            (2011, "DK", &[31]),
            (2012, "NO", &[82]),
            (2012, "SE", &[82]),
            (2012, "DK", &[82]),
        ],
    )
}

#[test]
fn sum_by_time() {
    let sum = AggregationOperation::sum(shared(yearly()), &["time"]).unwrap();
    assert_eq!(
        render(sum.data().unwrap()),
        vec!["(2010, 120)", "(2011, 93)", "(2012, 246)"]
    );
    assert_eq!(
        sum.structure().get("m1").map(|c| c.value_type()),
        Some(ValueType::Integer)
    );
}

#[test]
fn one_row_per_distinct_key() {
    let sum = AggregationOperation::sum(shared(yearly()), &["geo"]).unwrap();
    let rows: Vec<DataPoint> = sum.data().unwrap().collect::<Result<_>>().unwrap();
    assert_eq!(rows.len(), 3);
    let no = rows
        .iter()
        .find(|p| p.get("geo").and_then(Value::as_str) == Some("NO"))
        .unwrap();
    assert_eq!(no.get("m1"), Some(&Value::from(133_i64)));
}

#[test]
fn convenience_form_rejects_multiple_measures() {
    let two = dataset(&["m1", "m2"], &[(2010, "NO", &[1, 2])]);
    let err = AggregationOperation::sum(shared(two), &["time"]).unwrap_err();
    match err {
        Error::Argument(message) => {
            assert!(message.contains("m1"));
            assert!(message.contains("m2"));
        }
        other => panic!("expected argument error, got {other}"),
    }
}

#[test]
fn convenience_form_rejects_no_measure() {
    let none = dataset(&[], &[(2010, "NO", &[])]);
    let err = AggregationOperation::sum(shared(none), &["time"]).unwrap_err();
    assert!(matches!(err, Error::Argument(_)));
}

#[test]
fn explicit_measure_on_multi_measure_dataset() {
    let two = dataset(
        &["m1", "m2"],
        &[(2010, "NO", &[1, 10]), (2010, "SE", &[2, 20]), (2011, "NO", &[3, 30])],
    );
    let sum = AggregationOperation::sum_of(shared(two), &["time"], "m2").unwrap();
    let names: Vec<&str> = sum.structure().components().iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["time", "m2"]);
    assert_eq!(render(sum.data().unwrap()), vec!["(2010, 30)", "(2011, 30)"]);
}

#[test]
fn unsorted_input_uses_sort_fallback_when_enabled() {
    let shuffled = || {
        dataset(
            &["m1"],
            &[(2011, "NO", &[1]), (2010, "NO", &[2]), (2011, "SE", &[3])],
        )
        .rejecting_ordering()
    };
    let sum = AggregationOperation::sum(shared(shuffled()), &["time"]).unwrap();
    assert!(sum.data().unwrap_err().is_unsupported());

    let sum = AggregationOperation::sum(shared(shuffled()), &["time"])
        .unwrap()
        .with_config(EngineConfig::default().with_sort_fallback(true));
    assert_eq!(render(sum.data().unwrap()), vec!["(2010, 2)", "(2011, 4)"]);
}

#[test]
fn input_is_released_once() {
    let counter = CloseCounter::default();
    let sum = AggregationOperation::sum(shared(counter.attach("yearly", yearly())), &["time"]).unwrap();
    let mut stream = sum.data().unwrap();
    assert!(stream.next().is_some());
    stream.close().unwrap();
    drop(stream);
    assert_eq!(counter.closes(), 1);
}

#[test]
fn group_filter_is_pushed_down() {
    let sum = AggregationOperation::sum(shared(yearly()), &["time"]).unwrap();
    let keep = Filtering::compare("time", CompareOp::Ge, 2011_i64);
    assert!(sum.unsupported_filtering(&keep).is_all());
    let stream = sum.compute_data(&Ordering::any(), &keep, &[]).unwrap();
    assert_eq!(render(stream), vec!["(2011, 93)", "(2012, 246)"]);
}

#[test]
fn descending_group_order() {
    let sum = AggregationOperation::sum(shared(yearly()), &["time"]).unwrap();
    let time = Arc::clone(sum.structure().get("time").unwrap());
    let stream = sum
        .compute_data(&Ordering::any().then(time, Direction::Desc), &Filtering::all(), &[])
        .unwrap();
    assert_eq!(
        render(stream),
        vec!["(2012, 246)", "(2011, 93)", "(2010, 120)"]
    );
}

#[test]
fn rows_built_for_a_reordered_structure_sum_by_name() {
    let declared = common::structure(&["m1"]);
    let reordered = Arc::new(
        DataStructure::try_new([
            ("m1", Role::Measure, ValueType::Integer),
            ("geo", Role::Identifier, ValueType::String),
            ("time", Role::Identifier, ValueType::Integer),
        ])
        .unwrap(),
    );
    let rows = [("NO", 20_i64), ("SE", 40_i64)]
        .into_iter()
        .map(|(geo, m1)| {
            reordered
                .wrap([
                    ("time", Value::from(2010_i64)),
                    ("geo", Value::from(geo)),
                    ("m1", Value::from(m1)),
                ])
                .unwrap()
        })
        .collect();
    let input = MemoryDataset::new(declared, rows).unwrap();

    let sum = AggregationOperation::sum(shared(input), &["time"]).unwrap();
    assert_eq!(render(sum.data().unwrap()), vec!["(2010, 60)"]);
}
