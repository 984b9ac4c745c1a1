pub mod messages;
pub mod metrics;
pub mod provider;
pub mod providers;
pub mod segmenter;
pub mod sse_parser;
pub mod types;
