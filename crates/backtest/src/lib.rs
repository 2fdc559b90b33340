//! Divergence trade simulation and grid-search optimization.
//!
//! The pipeline: the grid generator enumerates `(entry, exit)` threshold
//! pairs, the splitter deterministically partitions event ids, the simulator
//! replays each event's aligned timeline through the divergence state
//! machine under the cost model, and the orchestrator fans the whole cross
//! product out over a bounded worker pool before applying the selection
//! policy.

pub mod costs;
pub mod grid;
pub mod metrics;
pub mod orchestrator;
pub mod provider;
pub mod selection;
pub mod sim;
pub mod split;

pub use costs::{clamp_price, CostModel};
pub use grid::{generate_grid, GridCombination};
pub use metrics::CombinationMetrics;
pub use orchestrator::{CancelFlag, CombinationRow, GridSearchOrchestrator, GridSearchReport};
pub use provider::{InMemoryProvider, ProviderError, TimelineProvider};
pub use selection::{select_best, SelectionReport, SELECTION_METHOD};
pub use sim::{simulate_event, EventSimResult, Trade, TradePrices};
pub use split::{assign_splits, SplitAssignment};
