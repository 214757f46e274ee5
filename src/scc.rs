//! Strongly connected components and recursion classification.
//!
//! Tarjan's algorithm over the grammar graph (an edge A→B for every
//! production of A mentioning B; terminals ignored). Components come out in
//! reverse topological order, leaves first, which is exactly the order the
//! charset fix-point wants. The recursion of a component says where its
//! concatenations reach back into the component: only at the leftmost
//! position (LEFT), only at the rightmost (RIGHT), not at all (NONE), or
//! both (BOTH).

use std::collections::{BTreeMap, BTreeSet};

use crate::grammar::{Grammar, Production};
use crate::types::NtId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recursion {
    None,
    Left,
    Right,
    Both,
}

impl Recursion {
    /// NONE is the identity; equal flags stay; disagreement is BOTH.
    pub fn combine(self, other: Recursion) -> Recursion {
        match (self, other) {
            (Recursion::None, x) | (x, Recursion::None) => x,
            (x, y) if x == y => x,
            _ => Recursion::Both,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Component {
    pub members: BTreeSet<NtId>,
    pub recursion: Recursion,
}

/// Condenses the grammar graph: components in reverse topological order
/// (every component before its predecessors), each with its recursion
/// classified.
pub fn condense(grammar: &Grammar) -> Vec<Component> {
    let mut components = tarjan(grammar);
    for comp in &mut components {
        comp.recursion = determine_recursion(grammar, &comp.members);
    }
    components
}

/// Maps every nonterminal to the index of its component in `components`.
pub fn component_map(components: &[Component]) -> BTreeMap<NtId, usize> {
    let mut map = BTreeMap::new();
    for (i, comp) in components.iter().enumerate() {
        for &id in &comp.members {
            map.insert(id, i);
        }
    }
    map
}

/// Inspects every concatenation of the component's members: a member at
/// the first position sets the LEFT flag, at the second the RIGHT flag.
pub fn determine_recursion(grammar: &Grammar, members: &BTreeSet<NtId>) -> Recursion {
    let mut recursion = Recursion::None;
    for &id in members {
        for p in grammar.nonterminal(id).productions() {
            if let Production::Concat(t1, t2) = p {
                if members.contains(t1) {
                    recursion = recursion.combine(Recursion::Left);
                }
                if members.contains(t2) {
                    recursion = recursion.combine(Recursion::Right);
                }
            }
        }
    }
    recursion
}

/// Is `id` recursive through its component: in a component with other
/// members, or mentioning itself on some right-hand side?
pub fn is_component_recursive(grammar: &Grammar, members: &BTreeSet<NtId>, id: NtId) -> bool {
    members.len() > 1
        || grammar
            .nonterminal(id)
            .productions()
            .iter()
            .any(|p| p.targets().contains(&id))
}

// Iterative Tarjan so deep grammars cannot overflow the call stack.
fn tarjan(grammar: &Grammar) -> Vec<Component> {
    struct Data {
        index: BTreeMap<NtId, usize>,
        lowlink: BTreeMap<NtId, usize>,
        on_stack: BTreeSet<NtId>,
        stack: Vec<NtId>,
        next_index: usize,
        components: Vec<Component>,
    }

    let successors: BTreeMap<NtId, Vec<NtId>> = grammar
        .ids()
        .map(|id| (id, grammar.successors_of(id)))
        .collect();

    let mut data = Data {
        index: BTreeMap::new(),
        lowlink: BTreeMap::new(),
        on_stack: BTreeSet::new(),
        stack: Vec::new(),
        next_index: 0,
        components: Vec::new(),
    };

    // Explicit DFS frames: (node, next successor position).
    for root in grammar.ids() {
        if data.index.contains_key(&root) {
            continue;
        }
        let mut frames: Vec<(NtId, usize)> = vec![(root, 0)];
        data.index.insert(root, data.next_index);
        data.lowlink.insert(root, data.next_index);
        data.next_index += 1;
        data.stack.push(root);
        data.on_stack.insert(root);

        while let Some(frame) = frames.last_mut() {
            let v = frame.0;
            let pos = frame.1;
            frame.1 += 1;
            let succs = &successors[&v];
            if pos < succs.len() {
                let w = succs[pos];
                if !data.index.contains_key(&w) {
                    data.index.insert(w, data.next_index);
                    data.lowlink.insert(w, data.next_index);
                    data.next_index += 1;
                    data.stack.push(w);
                    data.on_stack.insert(w);
                    frames.push((w, 0));
                } else if data.on_stack.contains(&w) {
                    let low = data.lowlink[&v].min(data.index[&w]);
                    data.lowlink.insert(v, low);
                }
            } else {
                frames.pop();
                if let Some(&(parent, _)) = frames.last() {
                    let low = data.lowlink[&parent].min(data.lowlink[&v]);
                    data.lowlink.insert(parent, low);
                }
                if data.lowlink[&v] == data.index[&v] {
                    let mut members = BTreeSet::new();
                    loop {
                        let w = data.stack.pop().expect("tarjan stack underflow");
                        data.on_stack.remove(&w);
                        members.insert(w);
                        if w == v {
                            break;
                        }
                    }
                    data.components.push(Component {
                        members,
                        recursion: Recursion::None,
                    });
                }
            }
        }
    }
    data.components
}
