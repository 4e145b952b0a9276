pub mod clock;
pub mod legality;
pub mod pipeline;
pub mod utils;

pub use clock::{ClockModel, ClockReading};
pub use legality::LegalityAdapter;
pub use pipeline::{MovePipeline, PipelineState, Transition};
