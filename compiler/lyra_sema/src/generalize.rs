//! Call-graph bookkeeping for function-type generalization.
//!
//! Functions without an explicit return type are analyzed lazily, on
//! first reference, through a strongly-connected-component discovery over
//! the call graph as it is found. The component stack and low-link
//! bookkeeping live here as explicit per-function state; body analysis
//! itself re-enters through the analyzer, which reports each in-progress
//! reference back via [`CallGraph::note_reference`].
//!
//! A function referenced from outside its completed component gets fresh
//! type variables per reference; a reference from inside the component
//! (mutual recursion) stays monomorphic so instantiation cannot loop.

use lyra_ir::NodeId;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::DefId;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct VertexId(u32);

impl VertexId {
    #[inline]
    const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a vertex is in its lifecycle.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum BodyState {
    /// Body not yet analyzed; holds the body node.
    Pending(NodeId),
    /// Body analysis running somewhere up the call stack.
    Analyzing,
    /// Component completed and generalized.
    Done,
}

#[derive(Debug)]
struct FunctionVertex {
    def: DefId,
    discovery: u32,
    low_link: u32,
    on_stack: bool,
    state: BodyState,
}

/// The lazily discovered call graph of inferred-return functions.
#[derive(Default)]
pub struct CallGraph {
    vertices: Vec<FunctionVertex>,
    by_def: FxHashMap<DefId, VertexId>,
    /// Tarjan component stack.
    stack: Vec<VertexId>,
    /// Chain of vertices whose bodies are currently being analyzed,
    /// innermost last; low-links propagate along it.
    active: Vec<VertexId>,
    next_discovery: u32,
}

impl CallGraph {
    pub fn new() -> Self {
        CallGraph::default()
    }

    /// Register an inferred-return function when it is declared.
    #[allow(clippy::cast_possible_truncation)]
    pub fn register(&mut self, def: DefId, body: NodeId) -> VertexId {
        debug_assert!(!self.by_def.contains_key(&def));
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(FunctionVertex {
            def,
            discovery: 0,
            low_link: 0,
            on_stack: false,
            state: BodyState::Pending(body),
        });
        self.by_def.insert(def, id);
        id
    }

    pub fn vertex_of(&self, def: DefId) -> Option<VertexId> {
        self.by_def.get(&def).copied()
    }

    pub fn state(&self, id: VertexId) -> BodyState {
        self.vertices[id.index()].state
    }

    pub fn is_on_stack(&self, id: VertexId) -> bool {
        self.vertices[id.index()].on_stack
    }

    /// Start analyzing a pending vertex: assign discovery numbers, push it
    /// on both stacks, and hand back the body to analyze.
    pub fn begin_visit(&mut self, id: VertexId) -> NodeId {
        let number = self.next_discovery;
        self.next_discovery += 1;
        let vertex = &mut self.vertices[id.index()];
        let BodyState::Pending(body) = vertex.state else {
            debug_assert!(false, "begin_visit on a non-pending vertex");
            return NodeId::from_raw(0);
        };
        trace!(def = ?vertex.def, discovery = number, "scc visit");
        vertex.discovery = number;
        vertex.low_link = number;
        vertex.on_stack = true;
        vertex.state = BodyState::Analyzing;
        self.stack.push(id);
        self.active.push(id);
        body
    }

    /// Record a reference to an on-stack vertex from the innermost body
    /// currently being analyzed.
    pub fn note_reference(&mut self, target: VertexId) {
        debug_assert!(self.vertices[target.index()].on_stack);
        let target_discovery = self.vertices[target.index()].discovery;
        if let Some(&current) = self.active.last() {
            let vertex = &mut self.vertices[current.index()];
            vertex.low_link = vertex.low_link.min(target_discovery);
        }
    }

    /// Finish analyzing a vertex's body. If the vertex roots a component,
    /// pops and returns the whole component (in pop order) with every
    /// member marked done; otherwise returns `None`.
    pub fn finish_visit(&mut self, id: VertexId) -> Option<SmallVec<[DefId; 2]>> {
        let popped = self.active.pop();
        debug_assert_eq!(popped, Some(id));
        let low_link = self.vertices[id.index()].low_link;
        if let Some(&parent) = self.active.last() {
            let vertex = &mut self.vertices[parent.index()];
            vertex.low_link = vertex.low_link.min(low_link);
        }
        if low_link != self.vertices[id.index()].discovery {
            return None;
        }
        // Component root: pop down to and including it.
        let mut component = SmallVec::new();
        loop {
            let member = self.stack.pop()?;
            let vertex = &mut self.vertices[member.index()];
            vertex.on_stack = false;
            vertex.state = BodyState::Done;
            component.push(vertex.def);
            if member == id {
                break;
            }
        }
        trace!(size = component.len(), "scc component completed");
        Some(component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn def(raw: u32) -> DefId {
        DefId::from_raw(raw)
    }

    fn body(raw: u32) -> NodeId {
        NodeId::from_raw(raw)
    }

    #[test]
    fn self_recursive_function_is_a_single_vertex_component() {
        let mut graph = CallGraph::new();
        let f = graph.register(def(0), body(0));

        let b = graph.begin_visit(f);
        assert_eq!(b, body(0));
        // The body references the function itself.
        assert!(graph.is_on_stack(f));
        graph.note_reference(f);
        let component = graph.finish_visit(f);
        assert_eq!(component, Some(SmallVec::from_slice(&[def(0)])));
        assert_eq!(graph.state(f), BodyState::Done);
        assert!(!graph.is_on_stack(f));
    }

    #[test]
    fn mutual_recursion_forms_one_component() {
        let mut graph = CallGraph::new();
        let a = graph.register(def(0), body(0));
        let b = graph.register(def(1), body(1));

        graph.begin_visit(a);
        // Body of a references b, which is pending: visit it nested.
        graph.begin_visit(b);
        // Body of b references a, which is on stack.
        graph.note_reference(a);
        // b is not a component root; a is.
        assert_eq!(graph.finish_visit(b), None);
        assert_eq!(graph.state(b), BodyState::Analyzing);
        let component = graph.finish_visit(a);
        assert_eq!(component, Some(SmallVec::from_slice(&[def(1), def(0)])));
        assert_eq!(graph.state(a), BodyState::Done);
        assert_eq!(graph.state(b), BodyState::Done);
    }

    #[test]
    fn independent_functions_form_separate_components() {
        let mut graph = CallGraph::new();
        let a = graph.register(def(0), body(0));
        let b = graph.register(def(1), body(1));

        graph.begin_visit(a);
        // a calls b, which completes on its own.
        graph.begin_visit(b);
        assert_eq!(
            graph.finish_visit(b),
            Some(SmallVec::from_slice(&[def(1)]))
        );
        // b's completion must not drag a along.
        assert!(graph.is_on_stack(a));
        assert_eq!(
            graph.finish_visit(a),
            Some(SmallVec::from_slice(&[def(0)]))
        );
    }
}
