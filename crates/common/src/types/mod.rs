mod frequency;
mod s3;

pub use frequency::Frequency;
pub use s3::S3Path;
