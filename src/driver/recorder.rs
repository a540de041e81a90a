//! Recursive proxy builder over a driver's source tree.
//!
//! Returns a tree of the same shape in which every stream is tapped for
//! logging and every function is wrapped so that its results are proxied in
//! turn, under an identifier derived from the call.

use crate::source::{SourceFn, SourceNode};
use crate::stream::Stream;
use crate::types::Identifier;
use std::sync::Arc;

use super::wrapper::DriverState;

/// Proxy `node`, found at `identifier`, into `state`.
pub(crate) fn record(state: &Arc<DriverState>, node: SourceNode, identifier: Identifier) -> SourceNode {
    match node {
        SourceNode::Mapping(entries) => SourceNode::Mapping(
            entries
                .into_iter()
                .map(|(key, child)| {
                    if key == state.config.namespace_key {
                        return (key, child);
                    }
                    let child_id = identifier.key(key.as_str());
                    (key, record(state, child, child_id))
                })
                .collect(),
        ),
        SourceNode::Stream(stream) => SourceNode::Stream(record_stream(state, stream, identifier)),
        SourceNode::Function(func) => SourceNode::Function(record_function(state, func, identifier)),
        node @ (SourceNode::Sequence(_) | SourceNode::Absent) => node,
    }
}

fn record_stream(state: &Arc<DriverState>, stream: Stream, identifier: Identifier) -> Stream {
    state.register(identifier.clone(), stream.clone());

    let owner = Arc::downgrade(state);
    let (tapped, tap) = stream.tap(move |event| {
        if let Some(state) = owner.upgrade() {
            state.capture(&identifier, event);
        }
    });
    state.hold(tap);
    tapped
}

fn record_function(state: &Arc<DriverState>, func: SourceFn, identifier: Identifier) -> SourceFn {
    let owner = Arc::downgrade(state);
    let name = func.name().to_string();

    SourceFn::new(name.clone(), move |args| {
        let result = func.call(args)?;
        let call_id = identifier.call(name.as_str(), args);
        Ok(match owner.upgrade() {
            Some(state) => record(&state, result, call_id),
            None => result,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RecyclableConfig;
    use serde_json::json;

    fn state() -> Arc<DriverState> {
        Arc::new(DriverState::new(RecyclableConfig::default()))
    }

    #[test]
    fn test_mapping_streams_are_registered_and_logged() {
        let state = state();
        let clicks = Stream::new();
        let tree = SourceNode::mapping([("clicks", SourceNode::Stream(clicks.clone()))]);

        let proxied = record(&state, tree, Identifier::root());
        let tapped = proxied.get("clicks").and_then(SourceNode::as_stream).unwrap();
        let listener = tapped.listen();

        clicks.emit(1);
        clicks.emit(2);

        assert_eq!(listener.drain(), vec![json!(1), json!(2)]);
        let log = state.log.lock().clone();
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].identifier.to_string(), ":root/clicks");

        let registered = state.proxies.lock().get(&Identifier::root().key("clicks")).cloned();
        assert!(registered.unwrap().ptr_eq(&clicks));
    }

    #[test]
    fn test_namespace_key_passes_through() {
        let state = state();
        let hidden = Stream::new();
        let tree = SourceNode::mapping([("_namespace", SourceNode::Stream(hidden.clone()))]);

        let proxied = record(&state, tree, Identifier::root());
        let passed = proxied.get("_namespace").and_then(SourceNode::as_stream).unwrap();

        assert!(passed.ptr_eq(&hidden));
        hidden.emit("ignored");
        assert!(state.log.lock().is_empty());
        assert!(state.proxies.lock().is_empty());
    }

    #[test]
    fn test_function_results_are_proxied_per_call() {
        let state = state();
        let tree = SourceNode::function("channel", |_| Ok(SourceNode::Stream(Stream::new())));

        let proxied = record(&state, tree, Identifier::root());
        proxied.call(&[json!("a")]).unwrap();
        proxied.call(&[json!("b")]).unwrap();

        let mut ids: Vec<String> = state.proxies.lock().keys().map(|id| id.to_string()).collect();
        ids.sort();
        assert_eq!(ids, vec![":root/channel(a)", ":root/channel(b)"]);
    }

    #[test]
    fn test_nested_functions() {
        let state = state();
        let tree = SourceNode::mapping([(
            "dom",
            SourceNode::function("select", |_| {
                Ok(SourceNode::function("events", |_| Ok(SourceNode::Stream(Stream::new()))))
            }),
        )]);

        let proxied = record(&state, tree, Identifier::root());
        proxied
            .get("dom")
            .unwrap()
            .call(&[json!(".btn")])
            .unwrap()
            .call(&[json!("click")])
            .unwrap();

        let ids: Vec<String> = state.proxies.lock().keys().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec![":root/dom/select(.btn)/events(click)"]);
    }

    #[test]
    fn test_leaves_pass_through() {
        let state = state();
        let tree = SourceNode::mapping([
            ("items", SourceNode::Sequence(vec![json!(1)])),
            ("nothing", SourceNode::Absent),
        ]);

        let proxied = record(&state, tree, Identifier::root());
        assert!(matches!(proxied.get("items"), Some(SourceNode::Sequence(v)) if v == &vec![json!(1)]));
        assert!(matches!(proxied.get("nothing"), Some(SourceNode::Absent)));
        assert!(state.proxies.lock().is_empty());
    }

    #[test]
    fn test_function_outliving_driver_state() {
        let state = state();
        let tree = SourceNode::function("channel", |_| Ok(SourceNode::Stream(Stream::new())));
        let proxied = record(&state, tree, Identifier::root());
        drop(state);

        let result = proxied.call(&[json!("a")]).unwrap();
        assert!(result.as_stream().is_some());
    }
}
