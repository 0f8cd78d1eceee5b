pub mod area;
pub mod image;
pub mod image_area;
pub mod review_task;

// Re-export core models for easy access
pub use area::Area;
pub use image::{Image, NewImage};
pub use image_area::ImageArea;
pub use review_task::ReviewTask;
