pub mod blur_settings;
pub mod region_redactor;
