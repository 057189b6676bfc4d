pub mod cache;
pub mod catalog;
pub mod history;
pub mod jobs;
pub mod session;
