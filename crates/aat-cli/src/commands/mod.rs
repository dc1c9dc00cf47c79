pub mod auto;
pub mod clear;
pub mod common;
pub mod device;
pub mod local;
pub mod pull;
pub mod push;
pub mod stats;
pub mod status;
