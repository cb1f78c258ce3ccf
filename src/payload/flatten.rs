// src/payload/flatten.rs

//! Group-node flattening.
//!
//! A group node carries a whole sub-flow in `data.node.flow`. Before the
//! graph is built, every group is replaced by its inner nodes and the outer
//! edges touching the group are rewired:
//!
//! - edges *into* the group follow the target handle's `proxy` to the inner
//!   node that owns the field;
//! - edges *out of* the group start at the inner flow's last node.

use serde_json::Value;
use tracing::debug;

use crate::errors::{FlowdagError, Result};
use crate::payload::model::{
    EdgeDescriptor, FlowPayload, NodeDescriptor, ProxyRef, TargetHandle,
};

/// Return a copy of `payload` with every group node (recursively) ungrouped.
pub fn flatten_groups(payload: &FlowPayload) -> Result<FlowPayload> {
    let mut flow = payload.clone();

    while let Some(index) = flow.nodes.iter().position(|n| n.data.node.flow.is_some()) {
        let group = flow.nodes.remove(index);
        flow = ungroup_node(group, flow)?;
    }

    Ok(flow)
}

fn ungroup_node(mut group: NodeDescriptor, mut outer: FlowPayload) -> Result<FlowPayload> {
    let group_id = group.id.clone();
    let inner = match group.data.node.flow.take() {
        Some(flow) => flow.data,
        None => return Ok(outer),
    };

    debug!(
        group = %group_id,
        inner_nodes = inner.nodes.len(),
        "ungrouping group node"
    );

    let mut inner_nodes = inner.nodes;
    for node in inner_nodes.iter_mut() {
        node.parent_node_id = Some(group_id.clone());
    }

    update_proxied_templates(&group, &mut inner_nodes);

    let (touching, mut kept): (Vec<EdgeDescriptor>, Vec<EdgeDescriptor>) = outer
        .edges
        .drain(..)
        .partition(|e| e.source == group_id || e.target == group_id);

    let mut rewired = Vec::with_capacity(touching.len());
    for edge in touching {
        let mut edge = edge;
        if edge.target == group_id {
            redirect_target(&mut edge, &inner_nodes)?;
        }
        if edge.source == group_id {
            redirect_source(&mut edge, &inner_nodes, &inner.edges, &group_id)?;
        }
        rewired.push(edge);
    }

    kept.extend(inner.edges);
    kept.extend(rewired);

    outer.nodes.extend(inner_nodes);
    outer.edges = kept;
    Ok(outer)
}

/// Copy values of proxied group fields into the inner nodes that own them,
/// keeping the inner field's visibility flags and display name.
fn update_proxied_templates(group: &NodeDescriptor, inner_nodes: &mut [NodeDescriptor]) {
    for value in group.data.node.template.fields.values() {
        let Some(proxy) = value
            .get("proxy")
            .and_then(|p| serde_json::from_value::<ProxyRef>(p.clone()).ok())
        else {
            continue;
        };

        let Some(node) = inner_nodes.iter_mut().find(|n| n.id == proxy.id) else {
            continue;
        };
        let fields = &mut node.data.node.template.fields;
        let Some(old) = fields.get(&proxy.field).cloned() else {
            continue;
        };

        let mut new_field = value.clone();
        if let Value::Object(ref mut map) = new_field {
            for key in ["show", "advanced"] {
                if let Some(v) = old.get(key) {
                    map.insert(key.to_string(), v.clone());
                }
            }
            let display_name = old.get("display_name").or_else(|| old.get("name")).cloned();
            if let Some(name) = display_name {
                map.insert("display_name".to_string(), name);
            }
        }
        fields.insert(proxy.field.clone(), new_field);
    }
}

fn redirect_target(edge: &mut EdgeDescriptor, inner_nodes: &[NodeDescriptor]) -> Result<()> {
    let handle = &edge.data.target_handle;
    let Some(proxy) = handle.proxy.clone() else {
        return Ok(());
    };
    let Some(node) = inner_nodes.iter().find(|n| n.id == proxy.id) else {
        return Ok(());
    };

    let handle_type = handle.handle_type.clone().ok_or_else(|| {
        FlowdagError::InvalidPayload(format!(
            "edge {} -> {}: the 'type' key must be present in targetHandle",
            edge.source, edge.target
        ))
    })?;

    // The inner node may itself be a group that proxies the field further.
    let nested_proxy = if node.data.node.flow.is_some() {
        node.data
            .node
            .template
            .fields
            .get(&proxy.field)
            .and_then(|f| f.get("proxy"))
            .and_then(|p| serde_json::from_value::<ProxyRef>(p.clone()).ok())
    } else {
        None
    };

    edge.target = proxy.id.clone();
    edge.data.target_handle = TargetHandle {
        field_name: Some(proxy.field.clone()),
        id: Some(proxy.id.clone()),
        input_types: handle.input_types.clone(),
        handle_type: Some(handle_type),
        proxy: nested_proxy,
    };
    Ok(())
}

fn redirect_source(
    edge: &mut EdgeDescriptor,
    inner_nodes: &[NodeDescriptor],
    inner_edges: &[EdgeDescriptor],
    group_id: &str,
) -> Result<()> {
    let last = find_last_node(inner_nodes, inner_edges).ok_or_else(|| {
        FlowdagError::InvalidPayload(format!(
            "group node {group_id} has no terminal inner node to connect from"
        ))
    })?;

    edge.source = last.id.clone();
    edge.data.source_handle.id = Some(last.id.clone());
    Ok(())
}

/// First node that is not the source of any edge.
pub fn find_last_node<'a>(
    nodes: &'a [NodeDescriptor],
    edges: &[EdgeDescriptor],
) -> Option<&'a NodeDescriptor> {
    nodes
        .iter()
        .find(|n| edges.iter().all(|e| e.source != n.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::loader::from_value;
    use serde_json::json;

    fn node(id: &str) -> Value {
        json!({"id": id, "data": {"type": "Prompt", "node": {"template": {
            "_type": "Prompt",
            "text": {"value": "", "show": true, "advanced": false, "name": "text"}
        }}}})
    }

    fn grouped_flow() -> FlowPayload {
        from_value(json!({
            "nodes": [
                node("Outer-1"),
                {"id": "Group-1", "data": {"type": "Group", "node": {
                    "template": {
                        "_type": "Group",
                        "text_Inner-1": {"value": "from group", "proxy": {"field": "text", "id": "Inner-1"}}
                    },
                    "flow": {"data": {
                        "nodes": [node("Inner-1"), node("Inner-2")],
                        "edges": [{"source": "Inner-1", "target": "Inner-2"}]
                    }}
                }}},
                node("Outer-2")
            ],
            "edges": [
                {"source": "Outer-1", "target": "Group-1", "data": {
                    "sourceHandle": {"id": "Outer-1"},
                    "targetHandle": {"fieldName": "text_Inner-1", "type": "str",
                                     "proxy": {"field": "text", "id": "Inner-1"}}}},
                {"source": "Group-1", "target": "Outer-2", "data": {
                    "sourceHandle": {"id": "Group-1"},
                    "targetHandle": {"fieldName": "text", "type": "str"}}}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn group_is_replaced_by_inner_nodes() {
        let flat = flatten_groups(&grouped_flow()).unwrap();

        let ids: Vec<&str> = flat.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["Outer-1", "Outer-2", "Inner-1", "Inner-2"]);
        assert!(
            flat.nodes
                .iter()
                .filter(|n| n.id.starts_with("Inner"))
                .all(|n| n.parent_node_id.as_deref() == Some("Group-1"))
        );
    }

    #[test]
    fn edges_are_rewired_through_proxies() {
        let flat = flatten_groups(&grouped_flow()).unwrap();

        let pairs: Vec<(&str, &str)> = flat
            .edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();
        assert!(pairs.contains(&("Outer-1", "Inner-1")));
        assert!(pairs.contains(&("Inner-2", "Outer-2")));
        assert!(pairs.contains(&("Inner-1", "Inner-2")));
        assert!(!pairs.iter().any(|(s, t)| *s == "Group-1" || *t == "Group-1"));

        let into_inner = flat.edges.iter().find(|e| e.target == "Inner-1").unwrap();
        assert_eq!(into_inner.data.target_handle.field_name.as_deref(), Some("text"));
    }

    #[test]
    fn proxied_values_reach_inner_template() {
        let flat = flatten_groups(&grouped_flow()).unwrap();
        let inner = flat.nodes.iter().find(|n| n.id == "Inner-1").unwrap();
        let field = inner.data.node.template.fields.get("text").unwrap();

        assert_eq!(field["value"], json!("from group"));
        assert_eq!(field["show"], json!(true));
        assert_eq!(field["display_name"], json!("text"));
    }

    #[test]
    fn proxied_edge_without_type_is_rejected() {
        let mut flow = grouped_flow();
        flow.edges[0].data.target_handle.handle_type = None;
        assert!(matches!(
            flatten_groups(&flow),
            Err(FlowdagError::InvalidPayload(_))
        ));
    }
}
