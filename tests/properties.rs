//! Property tests for identifiers, capture and replay.

mod common;

use common::Seen;
use proptest::prelude::*;
use recycle::{recyclable, Driver, Identifier, Recyclable, SourceNode, Stream};
use serde_json::json;
use std::collections::BTreeMap;

/// Shape of a source tree with stream leaves.
#[derive(Clone, Debug)]
enum Shape {
    Leaf,
    Map(BTreeMap<String, Shape>),
}

fn shape() -> impl Strategy<Value = Shape> {
    Just(Shape::Leaf).prop_recursive(3, 24, 4, |inner| {
        prop::collection::btree_map("[a-c]{1,2}", inner, 1..4).prop_map(Shape::Map)
    })
}

fn build(shape: &Shape) -> SourceNode {
    match shape {
        Shape::Leaf => SourceNode::Stream(Stream::new()),
        Shape::Map(children) => {
            SourceNode::Mapping(children.iter().map(|(k, v)| (k.clone(), build(v))).collect())
        }
    }
}

fn leaves(shape: &Shape) -> usize {
    match shape {
        Shape::Leaf => 1,
        Shape::Map(children) => children.values().map(leaves).sum(),
    }
}

/// A driver exposing `streams` flat streams named `s0..sN`, handing the
/// raw streams back so the test can emit on them.
fn flat_driver(streams: usize) -> (Recyclable, Vec<Stream>, SourceNode) {
    let raw: Vec<Stream> = (0..streams).map(|_| Stream::new()).collect();
    let inner = raw.clone();
    let driver = recyclable(move |_sink: Stream| {
        Ok(SourceNode::mapping(
            inner
                .iter()
                .enumerate()
                .map(|(i, s)| (format!("s{}", i), SourceNode::Stream(s.clone()))),
        ))
    });
    let sources = driver.call(Stream::new()).unwrap();
    (driver, raw, sources)
}

fn emissions() -> impl Strategy<Value = (usize, Vec<(usize, i64)>)> {
    (1usize..5).prop_flat_map(|streams| {
        (
            Just(streams),
            prop::collection::vec((0..streams, any::<i64>()), 0..40),
        )
    })
}

proptest! {
    #[test]
    fn prop_identifiers_are_stable(shape in shape()) {
        let first = {
            let shape = shape.clone();
            recyclable(move |_sink: Stream| Ok(build(&shape)))
        };
        let second = {
            let shape = shape.clone();
            recyclable(move |_sink: Stream| Ok(build(&shape)))
        };
        first.call(Stream::new()).unwrap();
        second.call(Stream::new()).unwrap();

        prop_assert_eq!(first.identifiers(), second.identifiers());
        prop_assert_eq!(first.identifiers().len(), leaves(&shape));
    }

    #[test]
    fn prop_every_emission_is_recorded_once_in_order((streams, events) in emissions()) {
        let (driver, raw, _sources) = flat_driver(streams);
        for (index, value) in &events {
            raw[*index].emit(*value);
        }

        let log = driver.log();
        prop_assert_eq!(log.len(), events.len());
        for (entry, (index, value)) in log.iter().zip(&events) {
            prop_assert_eq!(&entry.identifier, &Identifier::root().key(format!("s{}", index)));
            prop_assert_eq!(&entry.event, &json!(value));
        }
    }

    #[test]
    fn prop_replay_reproduces_each_stream((streams, events) in emissions()) {
        let (old, old_raw, _) = flat_driver(streams);
        for (index, value) in &events {
            old_raw[*index].emit(*value);
        }
        let captured = old.log();

        let (new, _, new_sources) = flat_driver(streams);
        let observers: Vec<Seen> = (0..streams)
            .map(|i| {
                let seen = Seen::new();
                let stream = new_sources.get(&format!("s{}", i)).and_then(SourceNode::as_stream).unwrap();
                seen.observe(stream);
                seen
            })
            .collect();

        let report = new.replay(old.take_log()).unwrap();

        prop_assert_eq!(report.replayed, events.len());
        for (i, seen) in observers.iter().enumerate() {
            let expected: Vec<_> = events
                .iter()
                .filter(|(index, _)| *index == i)
                .map(|(_, value)| json!(value))
                .collect();
            prop_assert_eq!(seen.values(), expected);
        }
        // Nothing was appended while replaying.
        prop_assert_eq!(new.log(), captured);
    }
}
