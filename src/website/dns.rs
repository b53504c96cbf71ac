//! DNS records and hosted zone resolution

use crate::core::token::Token;
use crate::website::config::HostedZone;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Alias hosted zone ID shared by every CloudFront distribution
pub const CLOUDFRONT_ALIAS_ZONE_ID: &str = "Z2FDTNDATAQYW2";

/// TTL requested for the website record
///
/// The record is always an alias to the distribution, and Route 53 rejects a
/// TTL on alias records: they are answered with the target's TTL instead, so
/// this value never reaches the template.
pub const RECORD_TTL_SECS: u64 = 60;

/// Finds the hosted zone that serves a domain
#[async_trait]
pub trait ZoneResolver: Send + Sync {
    async fn find_zone(&self, domain_name: &str) -> anyhow::Result<HostedZone>;
}

/// An `A` alias record pointing a domain at a CloudFront distribution
#[derive(Debug, Clone)]
pub struct ARecord {
    pub zone: HostedZone,
    pub record_name: String,

    /// The distribution's domain name
    pub alias_target: Token,
}

impl ARecord {
    pub fn new(zone: &HostedZone, record_name: &str, alias_target: Token) -> Self {
        Self {
            zone: zone.clone(),
            record_name: record_name.to_string(),
            alias_target,
        }
    }

    /// Fully qualified record name with its trailing dot
    pub fn fqdn(&self) -> String {
        format!("{}.", self.record_name.trim_end_matches('.'))
    }

    /// `AWS::Route53::RecordSet` properties
    pub fn properties(&self) -> Value {
        json!({
            "Name": self.fqdn(),
            "Type": "A",
            "HostedZoneId": self.zone.id,
            "AliasTarget": {
                "DNSName": self.alias_target,
                "HostedZoneId": CLOUDFRONT_ALIAS_ZONE_ID,
            },
        })
    }
}
