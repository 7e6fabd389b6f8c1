//! Draft / committed / navigation filter reconciliation.
//!
//! - `state`: the filter value type and partial patches
//! - `navigation`: persisted navigation state and query-string encoding
//! - `reconciler`: the single writer of the committed filter, load gating
//!   and search commit policies

pub mod navigation;
pub mod reconciler;
pub mod state;

pub use navigation::{MemoryNavigation, NavigationStore, parse_query_string, to_query_string};
pub use reconciler::{
    FilterReconciler, FilterTimer, LoadMode, LoadOutcome, LoadRequest, ReconcilerConfig, RequestId,
    SearchPolicy, changed,
};
pub use state::{FilterPatch, FilterState, PAGE_KEY};
