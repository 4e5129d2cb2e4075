pub mod publisher;
pub mod s3_publisher;
