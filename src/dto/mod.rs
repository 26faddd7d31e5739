pub mod call_dto;
pub mod candidate_dto;
pub mod connection_dto;
pub mod job_dto;
pub mod webhook_dto;
