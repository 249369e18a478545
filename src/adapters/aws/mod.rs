//! AWS adapters: S3 object storage and CloudFront invalidation.

pub mod cloudfront;
pub mod s3;

pub use cloudfront::CdnBackend;
pub use s3::S3Backend;
