pub mod models;
pub mod selectors;
mod session;

pub use models::{
    ClassRecord, Credentials, DownloadReport, LoginOutcome, ResourceLink, SectionRecord,
};
pub use session::PiazzaSession;
