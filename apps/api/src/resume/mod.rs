// Resume intake: multipart upload, PDF text extraction, job registration.

pub mod extractor;
pub mod handlers;
