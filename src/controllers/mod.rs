mod session;
mod strain;

pub use session::{AnalysisSession, SessionState};
pub use strain::{AnalysisEntry, StrainAnalysesView};
