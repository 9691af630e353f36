pub mod ledger;
pub mod locks;
pub mod orchestrator;
pub mod reconciler;
