/// Linking flow: ephemeral state storage and the coordinator state machine
pub mod coordinator;
pub mod store;

pub use coordinator::{CallbackOutcome, FlowCoordinator};
pub use store::{ConsumeOutcome, FlowState, FlowStateStore};
