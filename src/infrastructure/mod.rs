pub mod command_log;
pub mod config;
pub mod error;
pub mod feed_client;
pub mod report_codec;
pub mod storage;
