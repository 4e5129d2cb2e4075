use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;
use tokio::runtime::Runtime;

use crate::{
    errors::{PerimeterError, Result},
    geofile::geojson::GEOJSON_CONTENT_TYPE,
};

use super::publisher::Publisher;

/// Current-thread runtime the async AWS SDK is driven from.
pub fn create_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| PerimeterError::PublishError(err.into()))
}

/// Credentials come from the AWS environment chain. `region` overrides the region of that chain.
pub fn create_s3_client(runtime: &Runtime, region: Option<&str>) -> aws_sdk_s3::Client {
    runtime.block_on(async {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        aws_sdk_s3::Client::new(&loader.load().await)
    })
}

/// Puts the GeoJSON into an S3 object.
///
/// The AWS SDK is async only. The publisher owns a current-thread runtime and blocks on each request, so the
/// rest of the pipeline stays sequential. Construct one per run and drop it when done.
pub struct S3Publisher {
    runtime: Runtime,
    client: aws_sdk_s3::Client,
    bucket: String,
    key: String,
}

impl S3Publisher {
    pub fn new(runtime: Runtime, client: aws_sdk_s3::Client, bucket: &str, key: &str) -> Self {
        Self {
            runtime,
            client,
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }
}

impl Publisher for S3Publisher {
    fn destination(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }

    fn publish_geojson(&self, geojson: String) -> Result<()> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .content_type(GEOJSON_CONTENT_TYPE)
            .body(ByteStream::from(geojson.into_bytes()));
        self.runtime
            .block_on(request.send())
            .map_err(|err| PerimeterError::PublishError(err.into()))?;
        Ok(())
    }
}
