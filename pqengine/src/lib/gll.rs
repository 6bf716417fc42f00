//! Context-free path querying with a GLL-style parse of the graph.
//!
//! Instead of materializing the intersection of the graph with the RSM, this
//! engine walks both in lockstep, the way a GLL parser walks its input. The
//! call structure lives in a *graph-structured stack* (GSS): at most one
//! stack node exists per (automaton state, graph node) pair, and every call
//! to that pair merges into it. A GSS node remembers which callers to resume
//! when a derivation of its rule completes ("pops"), and at which graph
//! nodes it has already popped — both are idempotent set registrations over
//! a finite key space, which is what keeps the parse finite on cyclic graphs
//! and left-recursive rules.
//!
//! GSS nodes live in an arena owned by the query and are addressed by index;
//! nothing is freed until the query ends, so the cyclic caller/callee
//! structure needs no reference counting.

use std::{collections::HashSet, fmt, hash::Hash};

use fnv::{FnvHashMap, FnvHashSet};

use pqautomata::{Graph, NodeIdx};
use pqgrammar::{Rsm, RsmBox, Symbol, TIdx};

use crate::QueryError;

/// A state of the machine as a whole: a rule's box and a state within it.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
struct AutState {
    ridx: pqgrammar::RIdx,
    state: pqgrammar::BIdx,
}

/// The index of a GSS node in the query's arena.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
struct GssIdx(usize);

/// An in-flight parsing configuration: resume `state` at graph node `node`,
/// returning through `gss` when the current box completes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
struct Descriptor {
    gss: GssIdx,
    state: AutState,
    node: NodeIdx,
}

struct GssNode {
    /// The graph node this GSS node was created at.
    node: NodeIdx,
    /// Created to seed a query start node: popping it completes a whole
    /// derivation of the initial rule, i.e. a reachable pair.
    accepting: bool,
    /// Which (return state, caller) continuations to resume on a pop.
    returns: FnvHashMap<AutState, FnvHashSet<GssIdx>>,
    /// The graph nodes this GSS node has already popped at.
    popped: FnvHashSet<NodeIdx>,
}

/// What a box state can do, precomputed once per query.
struct StateData {
    term_edges: Vec<(TIdx, AutState)>,
    /// Call edges as (callee box start, return state) pairs.
    call_edges: Vec<(AutState, AutState)>,
    is_final: bool,
}

/// All the mutable state of one query. Dropped wholesale when the query
/// returns.
struct QueryState {
    gss: Vec<GssNode>,
    gss_index: FnvHashMap<(AutState, NodeIdx), GssIdx>,
    added: FnvHashSet<Descriptor>,
    todo: Vec<Descriptor>,
    reachable: FnvHashSet<(NodeIdx, NodeIdx)>,
}

impl QueryState {
    fn new() -> Self {
        QueryState {
            gss: Vec::new(),
            gss_index: FnvHashMap::default(),
            added: FnvHashSet::default(),
            todo: Vec::new(),
            reachable: FnvHashSet::default(),
        }
    }

    /// Find or lazily create the GSS node keyed (`state`, `node`).
    fn gss_node(&mut self, state: AutState, node: NodeIdx, accepting: bool) -> GssIdx {
        use std::collections::hash_map::Entry;
        match self.gss_index.entry((state, node)) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let idx = GssIdx(self.gss.len());
                e.insert(idx);
                self.gss.push(GssNode {
                    node,
                    accepting,
                    returns: FnvHashMap::default(),
                    popped: FnvHashSet::default(),
                });
                idx
            }
        }
    }

    /// Schedule `d` unless it has been scheduled before.
    fn add(&mut self, d: Descriptor) {
        if self.added.insert(d) {
            self.todo.push(d);
        }
    }
}

/// Find every pair of graph nodes connected by a path derivable from `rsm`'s
/// initial rule, parsing the graph directly against the RSM.
pub fn cfpq_gll<N: Clone + Eq + Hash + fmt::Debug>(
    rsm: &Rsm,
    graph: &Graph<N>,
    start_nodes: Option<&HashSet<N>>,
    final_nodes: Option<&HashSet<N>>,
) -> Result<HashSet<(N, N)>, QueryError> {
    let starts = graph.resolve_node_set(start_nodes)?;
    let finals = graph.resolve_node_set(final_nodes)?;
    rsm.validate()?;

    // Per box state: its outgoing terminal and call edges, and whether it
    // is final.
    let mut state_data: FnvHashMap<AutState, StateData> = FnvHashMap::default();
    for ridx in rsm.iter_ridxs() {
        if let Some(bx) = rsm.box_for(ridx) {
            for state in 0..bx.states_len() {
                let state = pqgrammar::BIdx::from_usize(state);
                let mut data = StateData {
                    term_edges: Vec::new(),
                    call_edges: Vec::new(),
                    is_final: bx.is_final(state),
                };
                for (sym, to) in bx.edges(state) {
                    let to = AutState { ridx, state: to };
                    match sym {
                        Symbol::Token(t) => data.term_edges.push((t, to)),
                        Symbol::Rule(r) => data.call_edges.push((
                            AutState {
                                ridx: r,
                                state: RsmBox::start_state(),
                            },
                            to,
                        )),
                    }
                }
                state_data.insert(AutState { ridx, state }, data);
            }
        }
    }

    // Per graph node: its outgoing neighbors grouped by token. Labels the
    // RSM doesn't know can never be matched and are dropped here.
    let mut node_edges: Vec<FnvHashMap<TIdx, Vec<NodeIdx>>> =
        vec![FnvHashMap::default(); graph.nodes_len()];
    for (from, label, to) in graph.edges() {
        if let Some(t) = rsm.token_idx(label) {
            node_edges[usize::from(from)].entry(t).or_default().push(to);
        }
    }

    let init_state = AutState {
        ridx: rsm.start_rule(),
        state: RsmBox::start_state(),
    };
    let mut qs = QueryState::new();
    for v in starts.iter_set_bits(..) {
        let node = NodeIdx::from_usize(v);
        let gss = qs.gss_node(init_state, node, true);
        qs.add(Descriptor {
            gss,
            state: init_state,
            node,
        });
    }

    while let Some(d) = qs.todo.pop() {
        let data = &state_data[&d.state];

        for &(t, next) in &data.term_edges {
            if let Some(succs) = node_edges[usize::from(d.node)].get(&t) {
                for &node in succs {
                    qs.add(Descriptor {
                        gss: d.gss,
                        state: next,
                        node,
                    });
                }
            }
        }

        for &(callee_start, ret) in &data.call_edges {
            let callee = qs.gss_node(callee_start, d.node, false);
            // Registering an existing continuation is a no-op; a new one
            // replays every pop the callee has already performed.
            if qs.gss[callee.0].returns.entry(ret).or_default().insert(d.gss) {
                let popped = qs.gss[callee.0].popped.iter().copied().collect::<Vec<_>>();
                for node in popped {
                    qs.add(Descriptor {
                        gss: d.gss,
                        state: ret,
                        node,
                    });
                }
            }
            qs.add(Descriptor {
                gss: callee,
                state: callee_start,
                node: d.node,
            });
        }

        if data.is_final {
            let gnode = &mut qs.gss[d.gss.0];
            if gnode.popped.insert(d.node) {
                if gnode.accepting {
                    qs.reachable.insert((gnode.node, d.node));
                }
                let conts = gnode
                    .returns
                    .iter()
                    .flat_map(|(&state, gs)| gs.iter().map(move |&gss| (state, gss)))
                    .collect::<Vec<_>>();
                for (state, gss) in conts {
                    qs.add(Descriptor {
                        gss,
                        state,
                        node: d.node,
                    });
                }
            }
        }
    }
    log::debug!(
        "gll CFPQ processed {} descriptors over {} GSS nodes",
        qs.added.len(),
        qs.gss.len()
    );

    let mut result = HashSet::new();
    for &(from, to) in &qs.reachable {
        if finals[usize::from(to)] {
            result.insert((graph.node(from).clone(), graph.node(to).clone()));
        }
    }
    Ok(result)
}
