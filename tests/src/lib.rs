pub mod mock_graph;
pub mod utils;

pub use mock_graph::{start_mock_graph_service, MockGraphState};
