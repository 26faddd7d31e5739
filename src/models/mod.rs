pub mod call;
pub mod candidate;
pub mod connection;
pub mod correlation;
pub mod job;
pub mod remote;
pub mod sync_report;
