pub mod chart_service;
pub mod format_service;
pub mod poll_service;
pub mod render_service;
