//! Website delivery unit - certificate, distribution, and DNS record

use crate::core::{
    bucket::BucketRef,
    error::SynthError,
    naming::Naming,
    template::{Environment, ParameterSource, RemovalPolicy, Resource, Stack},
    token::Token,
};
use crate::website::{
    config::{AssetStore, WebsiteConfig},
    dns::ARecord,
};
use serde_json::{json, Value};
use tracing::{debug, info};

/// ACM certificates used by CloudFront must be issued here
pub const CERTIFICATE_REGION: &str = "us-east-1";

/// Document served for `/` and for every 403/404
pub const INDEX_DOCUMENT: &str = "index.html";

/// Managed `CachingOptimized` cache policy
const CACHING_OPTIMIZED_POLICY_ID: &str = "658327ea-f89d-4fab-a63d-7e88639e58f6";

const ORIGIN_ID: &str = "asset-store";

/// Name of the certificate output and of the parameter that receives it
const CERTIFICATE_ARN: &str = "CertificateArn";

/// Handle to the distribution, for pipelines that need to invalidate it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionHandle {
    /// Stack that declares the distribution
    pub stack_name: String,

    /// Logical ID within that stack
    pub logical_id: String,

    /// Distribution ID, valid inside the declaring stack
    pub distribution_id: Token,

    /// `*.cloudfront.net` domain name
    pub domain_name: Token,

    /// Export carrying the distribution ID to other stacks
    pub distribution_id_export: String,
}

impl DistributionHandle {
    /// Distribution ID as seen from another stack in the same region
    pub fn imported_distribution_id(&self) -> Token {
        Token::import(&self.distribution_id_export)
    }
}

/// Result of building the website delivery unit
#[derive(Debug, Clone)]
pub struct WebsiteDeployment {
    /// Certificate stack (when it cannot share the website's region) then website stack
    pub stacks: Vec<Stack>,

    /// The distribution serving the site
    pub distribution: DistributionHandle,

    /// Asset bucket as seen from other stacks
    pub asset_store: BucketRef,
}

impl WebsiteDeployment {
    /// Compose the certificate, distribution, and record for `config`
    pub fn build(
        naming: &Naming,
        environment: &Environment,
        config: &WebsiteConfig,
    ) -> Result<Self, SynthError> {
        config.validate()?;

        let stack_name = naming.stack_name("website");
        info!("Composing website stack {} for {}", stack_name, config.domain_name);

        let mut stacks = Vec::new();
        let mut stack = Stack::new(&stack_name, environment.clone())
            .with_description(format!("Static website hosting for {}", config.domain_name));

        // Certificate
        let certificate_arn = if environment.region == CERTIFICATE_REGION {
            declare_certificate(&mut stack, naming, config)?
        } else {
            let mut certificate_stack = Stack::new(
                naming.stack_name("certificate"),
                environment.in_region(CERTIFICATE_REGION),
            )
            .with_description(format!("TLS certificate for {}", config.domain_name));
            let arn = declare_certificate(&mut certificate_stack, naming, config)?;
            certificate_stack.add_output(CERTIFICATE_ARN, arn, "ARN of the website certificate");

            debug!(
                "Certificate issued from {} for distribution in {}",
                CERTIFICATE_REGION, environment.region
            );
            let parameter = stack.add_parameter(
                CERTIFICATE_ARN,
                format!("Output {} of stack {}", CERTIFICATE_ARN, certificate_stack.name),
            )?;
            stack.bind_parameter(
                CERTIFICATE_ARN,
                ParameterSource {
                    stack: certificate_stack.name.clone(),
                    output: CERTIFICATE_ARN.to_string(),
                },
            );
            stacks.push(certificate_stack);
            parameter
        };

        // Origin
        let (bucket, exported_bucket) = match &config.asset_store {
            AssetStore::Bucket(bucket) => (bucket.clone(), bucket.clone()),
            AssetStore::Create => {
                let logical_id = naming.logical_id("website-bucket");
                stack.add_resource(
                    &logical_id,
                    Resource::new("AWS::S3::Bucket", Value::Null)
                        .with_removal_policy(RemovalPolicy::Retain),
                )?;
                let bucket = BucketRef::owned(&logical_id);
                let name_export = naming.export_name("website-bucket-name");
                let arn_export = naming.export_name("website-bucket-arn");
                stack.export("WebsiteBucketName", &name_export, bucket.name.clone());
                stack.export("WebsiteBucketArn", &arn_export, bucket.arn.clone());
                (bucket, BucketRef::imported(&name_export, &arn_export))
            }
        };

        let identity_id = naming.logical_id("origin-access-identity");
        let identity = stack.add_resource(
            &identity_id,
            Resource::new(
                "AWS::CloudFront::CloudFrontOriginAccessIdentity",
                json!({
                    "CloudFrontOriginAccessIdentityConfig": {
                        "Comment": format!("Identity for {}", config.domain_name),
                    },
                }),
            ),
        )?;

        if bucket.logical_id.is_some() {
            stack.add_resource(
                naming.logical_id("website-bucket-policy"),
                Resource::new(
                    "AWS::S3::BucketPolicy",
                    json!({
                        "Bucket": bucket.name,
                        "PolicyDocument": {
                            "Version": "2012-10-17",
                            "Statement": [{
                                "Action": "s3:GetObject",
                                "Effect": "Allow",
                                "Principal": {
                                    "CanonicalUser": Token::get_att(&identity_id, "S3CanonicalUserId"),
                                },
                                "Resource": bucket.objects_arn(),
                            }],
                        },
                    }),
                ),
            )?;
        }

        // Distribution
        let distribution_id = naming.logical_id("distribution");
        let distribution = stack.add_resource(
            &distribution_id,
            Resource::new(
                "AWS::CloudFront::Distribution",
                json!({
                    "DistributionConfig": distribution_config(
                        config,
                        &bucket,
                        &environment.region,
                        &identity,
                        &certificate_arn,
                    ),
                }),
            ),
        )?;
        let domain_name = Token::get_att(&distribution_id, "DomainName");

        // Record
        let record = ARecord::new(&config.zone, &config.domain_name, domain_name.clone());
        stack.add_resource(
            naming.logical_id("a-record"),
            Resource::new("AWS::Route53::RecordSet", record.properties()),
        )?;

        let distribution_id_export = naming.export_name("distribution-id");
        stack.export("DistributionId", &distribution_id_export, distribution.clone());
        stack.add_output(
            "DistributionDomainName",
            domain_name.clone(),
            "CloudFront domain name of the website",
        );

        stacks.push(stack);

        Ok(Self {
            stacks,
            distribution: DistributionHandle {
                stack_name,
                logical_id: distribution_id,
                distribution_id: distribution,
                domain_name,
                distribution_id_export,
            },
            asset_store: exported_bucket,
        })
    }

    /// The stack holding the distribution
    pub fn website_stack(&self) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name == self.distribution.stack_name)
    }
}

fn declare_certificate(
    stack: &mut Stack,
    naming: &Naming,
    config: &WebsiteConfig,
) -> Result<Token, SynthError> {
    stack.add_resource(
        naming.logical_id("dns-validated-certificate"),
        Resource::new(
            "AWS::CertificateManager::Certificate",
            json!({
                "DomainName": config.domain_name,
                "ValidationMethod": "DNS",
                "DomainValidationOptions": [{
                    "DomainName": config.domain_name,
                    "HostedZoneId": config.zone.id,
                }],
            }),
        ),
    )
}

/// Every 403 and 404 serves the app shell so client-side routes resolve
fn spa_error_responses() -> Value {
    let page = format!("/{}", INDEX_DOCUMENT);
    json!([
        { "ErrorCode": 403, "ResponseCode": 200, "ResponsePagePath": page },
        { "ErrorCode": 404, "ResponseCode": 200, "ResponsePagePath": page },
    ])
}

fn distribution_config(
    config: &WebsiteConfig,
    bucket: &BucketRef,
    region: &str,
    identity: &Token,
    certificate_arn: &Token,
) -> Value {
    json!({
        "Enabled": true,
        "Aliases": [config.domain_name],
        "DefaultRootObject": INDEX_DOCUMENT,
        "HttpVersion": "http2",
        "IPV6Enabled": true,
        "Origins": [{
            "Id": ORIGIN_ID,
            "DomainName": bucket.regional_domain_name(region),
            "S3OriginConfig": {
                "OriginAccessIdentity": Token::join([
                    Token::literal("origin-access-identity/cloudfront/"),
                    identity.clone(),
                ]),
            },
        }],
        "DefaultCacheBehavior": {
            "TargetOriginId": ORIGIN_ID,
            "ViewerProtocolPolicy": "redirect-to-https",
            "CachePolicyId": CACHING_OPTIMIZED_POLICY_ID,
            "Compress": true,
        },
        "CustomErrorResponses": spa_error_responses(),
        "ViewerCertificate": {
            "AcmCertificateArn": certificate_arn,
            "SslSupportMethod": "sni-only",
            "MinimumProtocolVersion": "TLSv1.2_2021",
        },
    })
}
