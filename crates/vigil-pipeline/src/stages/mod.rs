//! Stage implementations, one module per pipeline stage.

pub mod communication;
pub mod evidence;
pub mod reasoning;
pub mod safety;
pub mod structuring;

pub use communication::CommunicationStage;
pub use evidence::EvidenceStage;
pub use reasoning::ReasoningStage;
pub use safety::SafetyStage;
pub use structuring::StructuringStage;
