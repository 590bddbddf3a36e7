pub mod drafts;
pub mod monitoring;
pub mod session;
pub mod validation;
