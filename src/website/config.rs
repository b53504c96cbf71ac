//! Website delivery configuration

use crate::core::{bucket::BucketRef, error::SynthError};
use serde::{Deserialize, Serialize};

/// A Route 53 hosted zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HostedZoneFields")]
pub struct HostedZone {
    /// Zone ID, e.g. `Z0123456789ABC`
    pub id: String,

    /// Zone apex, e.g. `example.com`
    pub name: String,
}

impl HostedZone {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: strip_zone_prefix(&id.into()).to_string(),
            name: name.into().trim_end_matches('.').to_string(),
        }
    }

    /// Whether `domain_name` is the apex or a subdomain of this zone
    pub fn contains(&self, domain_name: &str) -> bool {
        is_within(domain_name, &self.name)
    }
}

/// Zone attributes as written by hand or reported by Route 53
#[derive(Deserialize)]
struct HostedZoneFields {
    id: String,
    name: String,
}

impl From<HostedZoneFields> for HostedZone {
    fn from(fields: HostedZoneFields) -> Self {
        HostedZone::new(fields.id, fields.name)
    }
}

/// Whether `domain_name` equals `apex` or is a subdomain of it
pub fn is_within(domain_name: &str, apex: &str) -> bool {
    let domain = domain_name.trim_end_matches('.').to_ascii_lowercase();
    let apex = apex.trim_end_matches('.').to_ascii_lowercase();
    domain == apex || domain.ends_with(&format!(".{}", apex))
}

/// Route 53 reports zone IDs as `/hostedzone/<id>`
fn strip_zone_prefix(id: &str) -> &str {
    id.trim_start_matches("/hostedzone/")
}

/// Where the built site assets live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetStore {
    /// An existing bucket
    Bucket(BucketRef),
    /// Declare a new bucket in the website stack
    Create,
}

/// Inputs to the website delivery unit
#[derive(Debug, Clone)]
pub struct WebsiteConfig {
    /// Zone the domain is served from
    pub zone: HostedZone,

    /// Domain the website is available at
    pub domain_name: String,

    /// Bucket holding the built site
    pub asset_store: AssetStore,
}

impl WebsiteConfig {
    pub fn validate(&self) -> Result<(), SynthError> {
        if !self.zone.contains(&self.domain_name) {
            return Err(SynthError::DomainOutsideZone {
                domain: self.domain_name.clone(),
                zone: self.zone.name.clone(),
            });
        }
        Ok(())
    }
}
