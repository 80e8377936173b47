use async_trait::async_trait;
use aws_sdk_cloudfront::{
    types::{
        AllowedMethods, CachedMethods, CookiePreference, CustomOriginConfig, DefaultCacheBehavior,
        DistributionConfig, ForwardedValues, Headers, ItemSelection, Method, Origin,
        OriginProtocolPolicy, OriginSslProtocols, Origins, PriceClass, QueryStringCacheKeys,
        SslProtocol, TrustedSigners, ViewerProtocolPolicy,
    },
    Client,
};
use chrono::Utc;
use tracing::{error, info};

use super::{
    pending::PendingDeletes, profile::CacheProfile, Distribution, DistributionClient, Error,
};
use crate::{config::DistributionConfig as LifecycleConfig, id};

const DEPLOYED_STATUS: &str = "Deployed";

#[derive(Clone)]
pub struct CloudFrontClient {
    client: Client,
    profile: CacheProfile,
    lifecycle: LifecycleConfig,
    pending: PendingDeletes,
}

impl CloudFrontClient {
    pub fn new(
        config: &aws_config::SdkConfig,
        profile: CacheProfile,
        lifecycle: LifecycleConfig,
        pending: PendingDeletes,
    ) -> Self {
        Self {
            client: Client::new(config),
            profile,
            lifecycle,
            pending,
        }
    }

    fn distribution_config(&self, label: &str, origin_host: &str) -> Result<DistributionConfig, Error> {
        let origin_id = id::resource_id();
        let profile = &self.profile;

        let origin = Origin::builder()
            .id(&origin_id)
            .domain_name(origin_host)
            .custom_origin_config(
                CustomOriginConfig::builder()
                    .http_port(80)
                    .https_port(443)
                    .origin_protocol_policy(OriginProtocolPolicy::MatchViewer)
                    .origin_ssl_protocols(
                        OriginSslProtocols::builder()
                            .quantity(1)
                            .items(SslProtocol::TlSv12)
                            .build()
                            .map_err(Error::build)?,
                    )
                    .origin_read_timeout(30)
                    .origin_keepalive_timeout(5)
                    .build()
                    .map_err(Error::build)?,
            )
            .connection_attempts(3)
            .connection_timeout(10)
            .build()
            .map_err(Error::build)?;

        let allowed_methods = AllowedMethods::builder()
            .quantity(2)
            .items(Method::Head)
            .items(Method::Get)
            .cached_methods(
                CachedMethods::builder()
                    .quantity(2)
                    .items(Method::Head)
                    .items(Method::Get)
                    .build()
                    .map_err(Error::build)?,
            )
            .build()
            .map_err(Error::build)?;

        let forwarded_values = ForwardedValues::builder()
            .query_string(true)
            .cookies(
                CookiePreference::builder()
                    .forward(ItemSelection::None)
                    .build()
                    .map_err(Error::build)?,
            )
            .headers(Headers::builder().quantity(0).build().map_err(Error::build)?)
            .query_string_cache_keys(
                QueryStringCacheKeys::builder()
                    .quantity(profile.query_string_cache_keys.len() as i32)
                    .set_items(Some(profile.query_string_cache_keys.clone()))
                    .build()
                    .map_err(Error::build)?,
            )
            .build()
            .map_err(Error::build)?;

        let cache_behavior = DefaultCacheBehavior::builder()
            .target_origin_id(&origin_id)
            .trusted_signers(
                TrustedSigners::builder()
                    .enabled(false)
                    .quantity(0)
                    .build()
                    .map_err(Error::build)?,
            )
            .viewer_protocol_policy(ViewerProtocolPolicy::RedirectToHttps)
            .allowed_methods(allowed_methods)
            .smooth_streaming(false)
            .compress(false)
            .forwarded_values(forwarded_values)
            .min_ttl(profile.min_ttl)
            .default_ttl(profile.default_ttl)
            .max_ttl(profile.max_ttl)
            .build()
            .map_err(Error::build)?;

        DistributionConfig::builder()
            .caller_reference(format!("{}-{}", Utc::now().timestamp_millis(), id::short_id()))
            .origins(
                Origins::builder()
                    .quantity(1)
                    .items(origin)
                    .build()
                    .map_err(Error::build)?,
            )
            .default_cache_behavior(cache_behavior)
            .comment(format!("Distribution for {}", id::tag_value(label)))
            .price_class(PriceClass::from(profile.price_class.as_str()))
            .enabled(true)
            .build()
            .map_err(Error::build)
    }

    /// An enabled distribution cannot be deleted.
    async fn disable(&self, distribution_id: &str) -> Result<(), Error> {
        let current = self
            .client
            .get_distribution_config()
            .id(distribution_id)
            .send()
            .await
            .map_err(Error::sdk)?;

        let mut config = current
            .distribution_config()
            .cloned()
            .ok_or(Error::MissingField("DistributionConfig"))?;

        if !config.enabled {
            return Ok(());
        }

        let etag = current.e_tag().ok_or(Error::MissingField("ETag"))?;
        config.enabled = false;

        self.client
            .update_distribution()
            .id(distribution_id)
            .if_match(etag)
            .distribution_config(config)
            .send()
            .await
            .map_err(Error::sdk)?;

        info!(%distribution_id, "Disabled distribution");
        Ok(())
    }

    async fn remove_when_deployed(&self, distribution_id: &str) -> Result<(), Error> {
        let etag = self.wait_deployed(distribution_id).await?;

        self.client
            .delete_distribution()
            .id(distribution_id)
            .if_match(etag)
            .send()
            .await
            .map_err(Error::sdk)?;

        Ok(())
    }

    /// Polls until the last configuration change is deployed and returns the fresh ETag.
    async fn wait_deployed(&self, distribution_id: &str) -> Result<String, Error> {
        for _ in 0..self.lifecycle.disable_poll_attempts {
            let output = self
                .client
                .get_distribution()
                .id(distribution_id)
                .send()
                .await
                .map_err(Error::sdk)?;

            let status = output.distribution().map(|distribution| distribution.status());

            if status == Some(DEPLOYED_STATUS) {
                return output
                    .e_tag()
                    .map(ToOwned::to_owned)
                    .ok_or(Error::MissingField("ETag"));
            }

            tokio::time::sleep(self.lifecycle.disable_poll_interval).await;
        }

        Err(Error::DeployTimedOut(distribution_id.to_owned()))
    }
}

#[async_trait]
impl DistributionClient for CloudFrontClient {
    async fn create_distribution(
        &self,
        label: &str,
        origin_host: &str,
    ) -> Result<Distribution, Error> {
        let config = self.distribution_config(label, origin_host)?;

        let output = self
            .client
            .create_distribution()
            .distribution_config(config)
            .send()
            .await
            .map_err(Error::sdk)?;

        let distribution = output
            .distribution()
            .ok_or(Error::MissingField("Distribution"))?;

        Ok(Distribution {
            id: distribution.id().to_owned(),
            domain: distribution.domain_name().to_owned(),
        })
    }

    async fn delete_distribution(&self, distribution_id: &str) -> Result<(), Error> {
        self.disable(distribution_id).await?;

        let this = self.clone();
        let resource = format!("distribution/{}", distribution_id);
        let distribution_id = distribution_id.to_owned();

        self.pending.spawn(resource, async move {
            match this.remove_when_deployed(&distribution_id).await {
                Ok(()) => info!(%distribution_id, "Deleted distribution"),
                Err(err) => error!(%distribution_id, %err, "Disabled distribution was not deleted"),
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use aws_sdk_cloudfront::config::{BehaviorVersion, Credentials, Region};
    use httpmock::prelude::*;

    use super::*;

    const DISTRIBUTION_PATH: &str = "/2020-05-31/distribution/E2QWRUHEXAMPLE";
    const CONFIG_PATH: &str = "/2020-05-31/distribution/E2QWRUHEXAMPLE/config";

    fn client(server: &MockServer) -> CloudFrontClient {
        let config = aws_sdk_cloudfront::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("akid", "secret", None, None, "test"))
            .endpoint_url(server.base_url())
            .build();

        CloudFrontClient {
            client: Client::from_conf(config),
            profile: CacheProfile::default(),
            lifecycle: LifecycleConfig {
                disable_poll_interval: Duration::from_millis(10),
                disable_poll_attempts: 3,
            },
            pending: PendingDeletes::default(),
        }
    }

    fn distribution_config(enabled: bool) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<DistributionConfig xmlns="http://cloudfront.amazonaws.com/doc/2020-05-31/">
    <CallerReference>1622541600000-abcd1234</CallerReference>
    <Comment>Distribution for Demo Room</Comment>
    <Enabled>{}</Enabled>
</DistributionConfig>"#,
            enabled
        )
    }

    fn distribution(status: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Distribution xmlns="http://cloudfront.amazonaws.com/doc/2020-05-31/">
    <Id>E2QWRUHEXAMPLE</Id>
    <ARN>arn:aws:cloudfront::123456789012:distribution/E2QWRUHEXAMPLE</ARN>
    <Status>{}</Status>
    <LastModifiedTime>2021-06-01T10:00:00.000Z</LastModifiedTime>
    <InProgressInvalidationBatches>0</InProgressInvalidationBatches>
    <DomainName>d111111abcdef8.cloudfront.net</DomainName>
</Distribution>"#,
            status
        )
    }

    #[tokio::test]
    async fn enabled_distribution_is_disabled_before_delete() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(CONFIG_PATH);
                then.status(200)
                    .header("ETag", "E1")
                    .header("content-type", "text/xml")
                    .body(distribution_config(true));
            })
            .await;
        let update = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path(CONFIG_PATH)
                    .header("if-match", "E1")
                    .body_contains("<Enabled>false</Enabled>");
                then.status(200)
                    .header("ETag", "E2")
                    .header("content-type", "text/xml")
                    .body(distribution("InProgress"));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(DISTRIBUTION_PATH);
                then.status(200)
                    .header("ETag", "E3")
                    .header("content-type", "text/xml")
                    .body(distribution("Deployed"));
            })
            .await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path(DISTRIBUTION_PATH)
                    .header("if-match", "E3");
                then.status(204);
            })
            .await;

        let client = client(&server);
        client
            .delete_distribution("E2QWRUHEXAMPLE")
            .await
            .expect("failed to delete distribution");

        update.assert_async().await;
        assert_eq!(client.pending.drain(Duration::from_secs(5)).await, 0);
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn disabled_distribution_is_not_updated() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(CONFIG_PATH);
                then.status(200)
                    .header("ETag", "E1")
                    .header("content-type", "text/xml")
                    .body(distribution_config(false));
            })
            .await;
        let update = server
            .mock_async(|when, then| {
                when.method(PUT).path(CONFIG_PATH);
                then.status(200)
                    .header("ETag", "E2")
                    .header("content-type", "text/xml")
                    .body(distribution("InProgress"));
            })
            .await;

        client(&server)
            .disable("E2QWRUHEXAMPLE")
            .await
            .expect("failed to disable distribution");

        update.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn delete_returns_once_disabled() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(CONFIG_PATH);
                then.status(200)
                    .header("ETag", "E1")
                    .header("content-type", "text/xml")
                    .body(distribution_config(false));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(DISTRIBUTION_PATH);
                then.status(200)
                    .header("ETag", "E2")
                    .header("content-type", "text/xml")
                    .body(distribution("InProgress"));
            })
            .await;

        let mut client = client(&server);
        client.lifecycle.disable_poll_interval = Duration::from_secs(60);

        tokio::time::timeout(
            Duration::from_secs(5),
            client.delete_distribution("E2QWRUHEXAMPLE"),
        )
        .await
        .expect("delete waited for deployment")
        .expect("failed to delete distribution");

        // Shutdown gives up on the delete still waiting for deployment.
        assert_eq!(client.pending.drain(Duration::from_millis(50)).await, 1);
    }

    #[tokio::test]
    async fn delete_waits_for_deployment() {
        let server = MockServer::start_async().await;
        let get = server
            .mock_async(|when, then| {
                when.method(GET).path(DISTRIBUTION_PATH);
                then.status(200)
                    .header("ETag", "E2")
                    .header("content-type", "text/xml")
                    .body(distribution("InProgress"));
            })
            .await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE).path(DISTRIBUTION_PATH);
                then.status(204);
            })
            .await;

        let err = client(&server)
            .remove_when_deployed("E2QWRUHEXAMPLE")
            .await
            .expect_err("wait should give up");

        assert!(matches!(err, Error::DeployTimedOut(id) if id == "E2QWRUHEXAMPLE"));
        get.assert_hits_async(3).await;
        delete.assert_hits_async(0).await;
    }
}
