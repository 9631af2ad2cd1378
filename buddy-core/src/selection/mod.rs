//! Manual-mode selection: tri-state checkbox propagation over the catalog
//! tree and the audit ledger of selected episodes.

mod ledger;
mod model;

pub use ledger::{LedgerDelta, ManualSelections};
pub use model::{SelectionError, SelectionModel};
