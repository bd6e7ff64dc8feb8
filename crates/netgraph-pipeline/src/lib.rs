pub mod pipeline;

pub use pipeline::*;

pub use netgraph_ai as ai;
pub use netgraph_collect as collect;
pub use netgraph_core as core;
pub use netgraph_graph as graph;
