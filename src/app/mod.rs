// Application layer - Use case interactors

pub mod analyze_interactor;
pub mod inspect_interactor;
pub mod verify_interactor;

// Re-export interactors
pub use analyze_interactor::AnalyzeInteractor;
pub use inspect_interactor::{InspectInteractor, InspectResponse};
pub use verify_interactor::{VerifyInteractor, VerifyRequest};
