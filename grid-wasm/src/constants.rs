/// Browser-side constants. Sizes are CSS/backing-store pixels unless noted.
/// Largest image file accepted from the picker (bytes).
pub const MAX_UPLOAD_BYTES: f64 = 10.0 * 1024.0 * 1024.0;
/// Stored source images are re-encoded at this width or less.
pub const UPLOAD_MAX_WIDTH: u32 = 1500;
pub const UPLOAD_QUALITY: f64 = 0.8;
/// Stored cropped images are re-encoded at this width or less.
pub const CROP_MAX_WIDTH: u32 = 1200;
pub const CROP_QUALITY: f64 = 0.75;
pub const STORED_IMAGE_TYPE: &str = "image/webp";
/// Label font used when the page does not pass `?font=`.
pub const DEFAULT_FONT_PATH: &str = "fonts/label.ttf";
/// Crop region scale step per wheel notch.
pub const CROP_WHEEL_STEP: f64 = 0.05;

pub const QUOTA_MESSAGE: &str = "Storage quota exceeded. Try using a smaller image.";
pub const TOO_LARGE_MESSAGE: &str = "Image is too large. Please select an image under 10MB.";
pub const NOTHING_TO_SAVE_MESSAGE: &str = "Nothing to save yet. Please complete the setup first.";
pub const POPUP_BLOCKED_MESSAGE: &str = "Please allow pop-ups to print the grid.";
