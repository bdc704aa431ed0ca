pub mod adjustments_panel;
pub mod drop_zone;
pub mod histogram_panel;
pub mod history_panel;
pub mod sidebar;
pub mod status_badge;
