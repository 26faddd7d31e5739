pub mod call_service;
pub mod candidate_service;
pub mod connection_registry;
pub mod elevenlabs_service;
pub mod gateway;
pub mod inflight;
pub mod job_service;
pub mod link_service;
pub mod matching;
pub mod merge_service;
pub mod question_service;
pub mod retry;
pub mod sync_service;
