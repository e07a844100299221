pub mod http_upload;

pub use http_upload::HttpUploadSource;
