use super::state::{Graph, InputRecord, NodeRecord};

pub trait GraphVisitor {
    fn on_graph(&mut self, _graph: &Graph) {}
    fn on_input(&mut self, _graph: &Graph, _input: &InputRecord) {}
    fn on_node(&mut self, _graph: &Graph, _index: usize, _node: &NodeRecord) {}
}

/// Visits inputs first, then nodes in insertion (topological) order.
pub fn walk_graph<V: GraphVisitor + ?Sized>(graph: &Graph, visitor: &mut V) {
    visitor.on_graph(graph);
    for input in graph.inputs() {
        visitor.on_input(graph, input);
    }
    for (idx, node) in graph.nodes().iter().enumerate() {
        visitor.on_node(graph, idx, node);
    }
}
