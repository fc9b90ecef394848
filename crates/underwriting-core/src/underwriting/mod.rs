pub mod assumptions;
pub mod debt_service;
pub mod metrics;
pub mod model;
pub mod projection;
pub mod scenario;
pub mod sensitivity;

pub use assumptions::{normalize, IrrMethod, RawUnderwritingInput, UnderwritingInput};
pub use model::{underwrite, underwrite_raw, UnderwritingReport, UnderwritingResult};
pub use scenario::UnderwritingScenario;
pub use sensitivity::{calculate_sensitivity, SensitivityAnalysis, SensitivityAxis};
