//! References to S3 buckets, owned or imported

use crate::core::{error::SynthError, policy::PolicyStatement, token::Token};

/// A bucket as seen by the construct that uses it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRef {
    /// Bucket name
    pub name: Token,

    /// Bucket ARN
    pub arn: Token,

    /// Logical ID when the bucket is declared in the same stack
    pub logical_id: Option<String>,
}

impl BucketRef {
    /// Reference an existing bucket by ARN, e.g. `arn:aws:s3:::my-bucket`
    pub fn from_arn(arn: &str) -> Result<Self, SynthError> {
        let name = parse_bucket_arn(arn)?;
        Ok(Self {
            name: Token::literal(name),
            arn: Token::literal(arn),
            logical_id: None,
        })
    }

    /// A bucket declared in the same stack
    pub fn owned(logical_id: &str) -> Self {
        Self {
            name: Token::reference(logical_id),
            arn: Token::get_att(logical_id, "Arn"),
            logical_id: Some(logical_id.to_string()),
        }
    }

    /// A bucket exported by another stack
    pub fn imported(name_export: &str, arn_export: &str) -> Self {
        Self {
            name: Token::import(name_export),
            arn: Token::import(arn_export),
            logical_id: None,
        }
    }

    /// ARN pattern covering every object in the bucket
    pub fn objects_arn(&self) -> Token {
        Token::join([self.arn.clone(), Token::literal("/*")])
    }

    /// Read, write, and delete access to the bucket and its objects
    pub fn read_write_statement(&self) -> PolicyStatement {
        PolicyStatement::allow(
            [
                "s3:GetObject*",
                "s3:GetBucket*",
                "s3:List*",
                "s3:PutObject*",
                "s3:DeleteObject*",
                "s3:Abort*",
            ],
            [self.arn.clone(), self.objects_arn()],
        )
    }

    /// Regional endpoint used as a CloudFront origin
    pub fn regional_domain_name(&self, region: &str) -> Token {
        match &self.logical_id {
            Some(id) => Token::get_att(id, "RegionalDomainName"),
            None => Token::join([
                self.name.clone(),
                Token::literal(format!(".s3.{}.amazonaws.com", region)),
            ]),
        }
    }
}

/// Extract the bucket name from an S3 ARN in any partition
pub fn parse_bucket_arn(arn: &str) -> Result<&str, SynthError> {
    let parts: Vec<&str> = arn.splitn(6, ':').collect();
    match parts.as_slice() {
        ["arn", partition, "s3", "", "", name]
            if !partition.is_empty() && !name.is_empty() && !name.contains('/') =>
        {
            Ok(*name)
        }
        _ => Err(SynthError::InvalidBucketArn(arn.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bucket_arn() {
        assert_eq!(parse_bucket_arn("arn:aws:s3:::test-bucket").unwrap(), "test-bucket");
        assert_eq!(parse_bucket_arn("arn:aws-cn:s3:::cn-bucket").unwrap(), "cn-bucket");
    }

    #[test]
    fn test_parse_bucket_arn_rejects_malformed() {
        for arn in [
            "test-bucket",
            "arn:aws:s3:::",
            "arn:aws:s3:::bucket/key",
            "arn:aws:sqs:::queue",
            "arn:aws:s3:ap-southeast-2:1234567890:bucket",
        ] {
            assert!(parse_bucket_arn(arn).is_err(), "{} should be rejected", arn);
        }
    }

    #[test]
    fn test_imported_bucket_regional_domain() {
        let bucket = BucketRef::from_arn("arn:aws:s3:::site").unwrap();
        assert_eq!(
            bucket.regional_domain_name("ap-southeast-2"),
            Token::literal("site.s3.ap-southeast-2.amazonaws.com")
        );
        assert_eq!(bucket.objects_arn(), Token::literal("arn:aws:s3:::site/*"));
    }

    #[test]
    fn test_read_write_statement_covers_bucket_and_objects() {
        let statement = BucketRef::owned("SiteBucket").read_write_statement();
        assert!(statement.action.iter().any(|a| a == "s3:DeleteObject*"));
        assert_eq!(
            statement.resource,
            [
                Token::get_att("SiteBucket", "Arn"),
                Token::join([Token::get_att("SiteBucket", "Arn"), Token::literal("/*")]),
            ]
        );
    }
}
