//! Terminal rendering for finder results and validation reports.

use std::sync::Arc;

use tabled::settings::Style;
use tabled::{Table, Tabled};
use termtree::Tree;

use crate::gps::Node;
use crate::resource::{Attributes, ValidationError, Value};

#[derive(Debug, Tabled)]
pub struct NodeRow {
    pub project: String,
    pub environment: String,
    pub configuration: String,
    #[tabled(rename = "type")]
    pub node_type: String,
    pub name: String,
    pub resources: usize,
}

impl From<&Node> for NodeRow {
    fn from(node: &Node) -> Self {
        let id = node.id();
        Self {
            project: id.project.clone(),
            environment: id.environment.clone(),
            configuration: id.configuration.clone(),
            node_type: id.node_type.clone(),
            name: id.name.clone(),
            resources: node.resources().count(),
        }
    }
}

pub fn node_table<'a>(nodes: impl IntoIterator<Item = &'a Arc<Node>>) -> String {
    let rows: Vec<NodeRow> = nodes.into_iter().map(|node| NodeRow::from(node.as_ref())).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// A node, its resources and their output attributes.
pub fn node_tree(node: &Node) -> Tree<String> {
    let leaves = node.resources().map(|(key, resource)| {
        Tree::new(format!("{} ({})", key, resource.terraform_name()))
            .with_leaves(attribute_leaves(&resource.to_output_mapping()))
    });
    Tree::new(node.id().to_string()).with_leaves(leaves)
}

fn attribute_leaves(attributes: &Attributes) -> Vec<Tree<String>> {
    attributes
        .iter()
        .map(|(key, value)| match value {
            Value::String(text) => Tree::new(format!("{} = {}", key, text)),
            Value::Map(map) => Tree::new(key.clone()).with_leaves(attribute_leaves(map)),
            Value::List(entries) => Tree::new(format!("{} [{}]", key, entries.len()))
                .with_leaves(entries.iter().enumerate().map(|(index, entry)| {
                    Tree::new(format!("[{}]", index)).with_leaves(attribute_leaves(entry))
                })),
        })
        .collect()
}

pub fn validation_report(errors: &[ValidationError]) -> String {
    if errors.is_empty() {
        return "all resources valid".to_string();
    }
    let mut report = format!("{} validation error(s):\n", errors.len());
    for error in errors {
        report.push_str(&format!("  {}\n", error));
    }
    report
}
