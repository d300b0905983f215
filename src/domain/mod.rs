pub mod aggregation;
pub mod heatmap;
pub mod models;
pub mod partition;
