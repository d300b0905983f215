pub mod bootstrap;
pub mod heatmap_session;
pub mod redraw_scheduler;
pub mod report_pages;
pub mod site;
