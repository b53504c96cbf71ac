//! Website delivery unit
//!
//! Serves a bucket of built assets over HTTPS at a custom domain: an ACM
//! certificate validated through the hosted zone, a CloudFront distribution
//! with single-page-application fallback routing, and an alias record.

pub mod config;
pub mod deployment;
pub mod dns;

pub use config::{AssetStore, HostedZone, WebsiteConfig};
pub use deployment::{DistributionHandle, WebsiteDeployment, CERTIFICATE_REGION};
pub use dns::{ZoneResolver, RECORD_TTL_SECS};
