pub mod charts;
pub mod dataset_store;
pub mod engine;
pub mod profiler;
pub mod table;
