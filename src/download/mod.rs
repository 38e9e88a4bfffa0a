pub mod downloader;
pub mod mime;
pub mod sanitize;

pub use downloader::{Downloader, FetchedFile};
pub use mime::{extension_for_content_type, file_name_for};
pub use sanitize::{sanitize_component, sanitize_stem};
