//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use vtlset::prelude::*;

/// Structure `time: integer id, geo: string id, <measures>: integer`.
pub fn structure(measures: &[&str]) -> Arc<DataStructure> {
    let mut triples = vec![
        ("time".to_string(), Role::Identifier, ValueType::Integer),
        ("geo".to_string(), Role::Identifier, ValueType::String),
    ];
    for m in measures {
        triples.push((m.to_string(), Role::Measure, ValueType::Integer));
    }
    Arc::new(DataStructure::try_new(triples).unwrap())
}

/// Rows of `(time, geo, measure values...)` over `structure(measures)`.
pub fn dataset(measures: &[&str], rows: &[(i64, &str, &[i64])]) -> MemoryDataset {
    let s = structure(measures);
    let rows = rows.iter().map(|(time, geo, values)| {
        let mut pairs = vec![
            ("time".to_string(), Value::from(*time)),
            ("geo".to_string(), Value::from(*geo)),
        ];
        for (m, v) in measures.iter().zip(values.iter()) {
            pairs.push((m.to_string(), Value::from(*v)));
        }
        pairs
    });
    MemoryDataset::from_pairs(s, rows).unwrap()
}

/// Counts closes and fails on any close after the first.
#[derive(Clone, Default)]
pub struct CloseCounter {
    closes: Arc<AtomicUsize>,
}

impl CloseCounter {
    pub fn attach(&self, name: &str, ds: MemoryDataset) -> MemoryDataset {
        let closes = Arc::clone(&self.closes);
        let name = name.to_string();
        ds.with_close_hook(move || {
            if closes.fetch_add(1, AtomicOrdering::SeqCst) > 0 {
                return Err(Error::Close {
                    source_name: name.clone(),
                    message: "closed twice".into(),
                });
            }
            Ok(())
        })
    }

    pub fn closes(&self) -> usize {
        self.closes.load(AtomicOrdering::SeqCst)
    }
}

pub fn shared(ds: MemoryDataset) -> Arc<dyn Dataset> {
    Arc::new(ds)
}

/// Render rows for comparison, e.g. `(2010, NO, 20, 2)`.
pub fn render(stream: DataStream) -> Vec<String> {
    stream.map(|p| p.unwrap().to_string()).collect()
}
