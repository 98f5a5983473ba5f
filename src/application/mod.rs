pub mod classifier;
pub mod matcher;
pub mod reconciler;
pub mod retry;
pub mod saga;
pub mod settlement;
pub mod status;
