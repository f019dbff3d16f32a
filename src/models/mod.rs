mod analysis;
mod ceparium;
mod task;
mod upload;

pub use analysis::{AnalysisRecord, AnalysisType};
pub use ceparium::{NewOrganism, NewStrain, Organism, OrganismRef, OrganismUpdate, Strain};
pub use task::{SubmitOutcome, TaskHandle, TaskState, TaskStatus};
pub use upload::{UploadFile, UploadRequest};
