pub mod delivery;
pub mod upload;

pub use delivery::build_delivery_url;
pub use upload::{MediaClient, MediaUploader};
