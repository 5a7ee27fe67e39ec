use std::collections::{HashMap, HashSet};

use super::record::{CallRef, FunctionKey, FunctionRecord};

pub type NodeIndex = usize;

/// A function node stored once in the forest arena. Parents refer to it by
/// index, so a callee shared by several callers is never copied.
#[derive(Clone, Debug)]
pub struct ForestNode {
    pub key: FunctionKey,
    pub name: String,
    pub file_path: String,
    pub line: Option<u32>,
    /// Callees in call-list order, duplicates kept.
    pub children: Vec<NodeIndex>,
    /// Set for callees that are absent from the dataset.
    pub synthetic: bool,
}

impl ForestNode {
    fn from_record(record: &FunctionRecord) -> Self {
        Self {
            key: record.key(),
            name: record.name.clone(),
            file_path: record.file_path.clone(),
            line: Some(record.line),
            children: Vec::new(),
            synthetic: false,
        }
    }

    fn from_call_ref(call: &CallRef) -> Self {
        Self {
            key: call.key(),
            name: call.name.clone(),
            file_path: call.file_path.clone(),
            line: call.line,
            children: Vec::new(),
            synthetic: true,
        }
    }

    pub fn call_count(&self) -> usize {
        self.children.len()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct CallForest {
    nodes: Vec<ForestNode>,
    index_by_key: HashMap<FunctionKey, NodeIndex>,
    roots: Vec<NodeIndex>,
}

impl CallForest {
    /// Builds the forest for one dataset scope (an upload, a page or a search
    /// slice). Root-ness is relative to `records`.
    pub fn build(records: &[FunctionRecord]) -> Self {
        let (mut forest, record_slots) = Self::build_nodes(records);
        forest.roots = root_positions(records)
            .into_iter()
            .filter_map(|position| record_slots[position])
            .collect();
        forest
    }

    /// Builds the forest with a fixed root list, for slices whose roots were
    /// decided over a larger set (a search page). Keys without a record in
    /// `records` are skipped.
    pub fn build_with_roots(records: &[FunctionRecord], roots: &[FunctionKey]) -> Self {
        let (mut forest, record_slots) = Self::build_nodes(records);
        let backed = record_slots.into_iter().flatten().collect::<HashSet<_>>();
        forest.roots = roots
            .iter()
            .filter_map(|key| forest.index_of(key))
            .filter(|index| backed.contains(index))
            .collect();
        forest
    }

    fn build_nodes(records: &[FunctionRecord]) -> (Self, Vec<Option<NodeIndex>>) {
        let mut nodes = Vec::with_capacity(records.len());
        let mut index_by_key = HashMap::with_capacity(records.len());
        let mut record_slots = Vec::with_capacity(records.len());

        for record in records {
            let key = record.key();
            if index_by_key.contains_key(&key) {
                tracing::debug!(%key, "duplicate record ignored; first occurrence wins");
                record_slots.push(None);
                continue;
            }
            let index = nodes.len();
            nodes.push(ForestNode::from_record(record));
            index_by_key.insert(key, index);
            record_slots.push(Some(index));
        }

        for (record, slot) in records.iter().zip(&record_slots) {
            let Some(parent) = *slot else {
                continue;
            };

            let mut children = Vec::with_capacity(record.calls.len());
            for call in &record.calls {
                let key = call.key();
                let child = match index_by_key.get(&key) {
                    Some(&index) => index,
                    None => {
                        let index = nodes.len();
                        nodes.push(ForestNode::from_call_ref(call));
                        index_by_key.insert(key, index);
                        index
                    }
                };
                children.push(child);
            }
            nodes[parent].children = children;
        }

        let forest = Self {
            nodes,
            index_by_key,
            roots: Vec::new(),
        };
        (forest, record_slots)
    }

    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    pub fn node(&self, index: NodeIndex) -> Option<&ForestNode> {
        self.nodes.get(index)
    }

    pub fn index_of(&self, key: &FunctionKey) -> Option<NodeIndex> {
        self.index_by_key.get(key).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Positions in `records` of every record whose key is never listed as a
/// callee by any record of the same list, in list order. A self-call counts as
/// an incoming call. Later duplicates of an already seen key are skipped.
pub fn root_positions(records: &[FunctionRecord]) -> Vec<usize> {
    let called = records
        .iter()
        .flat_map(|record| record.calls.iter().map(CallRef::key))
        .collect::<HashSet<_>>();

    let mut seen = HashSet::with_capacity(records.len());
    records
        .iter()
        .enumerate()
        .filter_map(|(position, record)| {
            let key = record.key();
            if called.contains(&key) || !seen.insert(key) {
                None
            } else {
                Some(position)
            }
        })
        .collect()
}
