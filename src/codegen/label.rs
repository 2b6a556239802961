//! Jump labels and the per-emission label table.
//!
//! A statement's begin/continue/end labels are looked up by statement id in
//! a layered table instead of being stored in the tree. Emitting a subtree a
//! second time (a finally body inlined at another exit, a dispose block)
//! pushes a layer that owns the ids of that subtree, so the copy gets fresh
//! labels while jumps to statements outside it still find the shared ones.

use crate::ast::StmtId;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A jump target, bound to an instruction position at most once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Labels of a loop, switch or labeled statement in one emission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementLabels {
    pub begin: Label,
    /// Where `continue` lands: the update clause, index increment or
    /// condition recheck for loops; unused otherwise
    pub continue_: Label,
    pub end: Label,
}

#[derive(Debug, Default)]
struct Layer {
    /// `None` owns every statement
    owned: Option<HashSet<StmtId>>,
    labels: HashMap<StmtId, StatementLabels>,
}

impl Layer {
    fn owns(&self, id: StmtId) -> bool {
        self.owned.as_ref().map_or(true, |ids| ids.contains(&id))
    }
}

#[derive(Debug)]
pub struct LabelTable {
    layers: Vec<Layer>,
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelTable {
    pub fn new() -> Self {
        Self { layers: vec![Layer::default()] }
    }

    /// Start a re-emission of the statements in `ids`
    pub fn push_layer(&mut self, ids: impl IntoIterator<Item = StmtId>) {
        self.layers.push(Layer {
            owned: Some(ids.into_iter().collect()),
            labels: HashMap::new(),
        });
    }

    pub fn pop_layer(&mut self) {
        if self.layers.len() > 1 {
            self.layers.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    fn owning_layer(&self, id: StmtId) -> usize {
        self.layers
            .iter()
            .rposition(|l| l.owns(id))
            .unwrap_or(0)
    }

    /// Labels of `id` in the current emission, if allocated
    pub fn get(&self, id: StmtId) -> Option<StatementLabels> {
        let layer = self.owning_layer(id);
        self.layers[layer].labels.get(&id).copied()
    }

    /// Labels of `id` in the current emission, allocating them on first use
    pub fn get_or_alloc(&mut self, id: StmtId, mut alloc: impl FnMut() -> Label) -> StatementLabels {
        let layer = self.owning_layer(id);
        *self.layers[layer].labels.entry(id).or_insert_with(|| StatementLabels {
            begin: alloc(),
            continue_: alloc(),
            end: alloc(),
        })
    }
}
