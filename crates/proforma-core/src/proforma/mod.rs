pub mod amortization;
pub mod analysis;
pub mod exit;
pub mod normalize;
pub mod pipeline;
pub mod projection;
pub mod request;

pub use analysis::{analyze_year_one, OperatingStatement, YearOneMetrics};
pub use exit::{compute_exit, ExitReturns, IrrStatus};
pub use normalize::{normalize_form, FormDefaults, FormField, NormalizedForm, PropertyForm, Provenance};
pub use pipeline::{analyze_form, analyze_property, AnalysisSummary, ProFormaOutput};
pub use projection::{project_years, Projector, YearRow};
pub use request::AnalysisRequest;
