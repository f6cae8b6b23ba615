// Service request lifecycle state machine
//
// The transition table and its guards are pure functions; the
// RequestStateMachine ties them to a store and the event publisher.

pub mod actions;
pub mod errors;
pub mod events;
pub mod guards;
pub mod request_state_machine;
pub mod states;

// Re-export main types for convenient access
pub use actions::{
    PublishTransitionEventAction, RequestPatch, TransitionEffects, TransitionExpectation,
};
pub use errors::{GuardError, GuardResult};
pub use events::RequestEvent;
pub use guards::{authorize, TransitionGuard};
pub use request_state_machine::RequestStateMachine;
pub use states::RequestStatus;
