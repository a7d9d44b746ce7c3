//! Guess the signing service and region from a request.

use crate::constants::{DEFAULT_REGION, X_AMZ_TARGET};
use http::{HeaderMap, Uri};
use once_cell::sync::Lazy;
use regex::Regex;

/// Service and region detected from a request, empty if unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceRegion {
    /// Signing name of the service, e.g. `s3` or `ses`.
    pub service: String,
    /// Region, e.g. `us-west-2`.
    pub region: String,
}

impl ServiceRegion {
    fn new(service: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            region: region.into(),
        }
    }
}

static LAMBDA_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^.]{1,63}\.lambda-url\.([^.]{1,63})\.on\.aws$").expect("regex must be valid")
});
static BACKBLAZE_B2: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[^.]{1,63}\.)?s3\.([^.]{1,63})\.backblazeb2\.com$")
        .expect("regex must be valid")
});
static AMAZONAWS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([^.]{1,63})\.(?:([^.]{0,63})\.)?amazonaws\.com(?:\.cn)?$")
        .expect("regex must be valid")
});
static ENDS_WITH_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-\d$").expect("regex must be valid"));

/// Rules for hosts outside `amazonaws.com`, evaluated in order.
///
/// A host matching a rule's suffix is fully decided by that rule.
enum HostRule {
    /// Region taken from the first capture; no match means nothing detected.
    Capture {
        suffix: &'static str,
        service: &'static str,
        pattern: &'static Lazy<Regex>,
    },
    /// Fixed service and region.
    Literal {
        suffix: &'static str,
        service: &'static str,
        region: &'static str,
    },
}

static HOST_RULES: [HostRule; 3] = [
    // Lambda function URLs: `<id>.lambda-url.<region>.on.aws`
    HostRule::Capture {
        suffix: ".on.aws",
        service: "lambda",
        pattern: &LAMBDA_URL,
    },
    // Cloudflare R2
    HostRule::Literal {
        suffix: ".r2.cloudflarestorage.com",
        service: "s3",
        region: "auto",
    },
    // Backblaze B2: `[bucket.]s3.<region>.backblazeb2.com`
    HostRule::Capture {
        suffix: ".backblazeb2.com",
        service: "s3",
        pattern: &BACKBLAZE_B2,
    },
];

/// Endpoint prefixes whose signing name differs.
static SERVICE_ALIASES: [(&str, &str); 10] = [
    ("appstream2", "appstream"),
    ("cloudhsmv2", "cloudhsm"),
    ("email", "ses"),
    ("marketplace", "aws-marketplace"),
    ("mobile", "AWSMobileHubService"),
    ("pinpoint", "mobiletargeting"),
    ("queue", "sqs"),
    ("git-codecommit", "codecommit"),
    ("mturk-requester-sandbox", "mturk-requester"),
    ("personalize-runtime", "personalize"),
];

/// Detect service and region from the url only.
pub fn detect(uri: &Uri) -> ServiceRegion {
    detect_with_headers(uri, &HeaderMap::new())
}

/// Detect service and region from the url, using `x-amz-target` to tell
/// autoscaling flavours apart.
///
/// Both fields are empty when nothing could be detected. When a service is
/// found without a region, the region defaults to `us-east-1`.
pub fn detect_with_headers(uri: &Uri, headers: &HeaderMap) -> ServiceRegion {
    let host = uri.host().unwrap_or_default().to_ascii_lowercase();
    let mut detected = detect_host(&host, uri.path(), headers);

    if !detected.service.is_empty() && detected.region.is_empty() {
        detected.region = DEFAULT_REGION.to_string();
    }
    detected
}

fn detect_host(host: &str, path: &str, headers: &HeaderMap) -> ServiceRegion {
    for rule in HOST_RULES.iter() {
        match rule {
            HostRule::Capture {
                suffix,
                service,
                pattern,
            } if host.ends_with(suffix) => {
                return match pattern.captures(host) {
                    Some(caps) => ServiceRegion::new(*service, &caps[1]),
                    None => ServiceRegion::default(),
                };
            }
            HostRule::Literal {
                suffix,
                service,
                region,
            } if host.ends_with(suffix) => {
                return ServiceRegion::new(*service, *region);
            }
            _ => {}
        }
    }

    let stripped = host.replacen("dualstack.", "", 1);
    let Some(caps) = AMAZONAWS.captures(&stripped) else {
        return ServiceRegion::default();
    };
    let mut service = caps[1].to_string();
    let mut region = caps.get(2).map(|v| v.as_str().to_string());

    if region.as_deref() == Some("us-gov") {
        region = Some("us-gov-west-1".to_string());
    } else if matches!(region.as_deref(), Some("s3" | "s3-accelerate")) {
        region = Some(DEFAULT_REGION.to_string());
        service = "s3".to_string();
    } else if service == "iot" {
        service = if host.starts_with("iot.") {
            "execute-api"
        } else if host.starts_with("data.jobs.iot.") {
            "iot-jobs-data"
        } else if path == "/mqtt" {
            "iotdevicegateway"
        } else {
            "iotdata"
        }
        .to_string();
    } else if service == "autoscaling" {
        let target = headers
            .get(X_AMZ_TARGET)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        match target.split('.').next() {
            Some("AnyScaleFrontendService") => service = "application-autoscaling".to_string(),
            Some("AnyScaleScalingPlannerFrontendService") => {
                service = "autoscaling-plans".to_string()
            }
            _ => {}
        }
    } else if region.is_none() && service.starts_with("s3-") {
        let suffix = &service["s3-".len()..];
        let suffix = suffix
            .strip_prefix("fips-")
            .or_else(|| suffix.strip_prefix("external-1"))
            .unwrap_or(suffix);
        region = Some(suffix.to_string());
        service = "s3".to_string();
    } else if let Some(stripped) = service.strip_suffix("-fips") {
        service = stripped.to_string();
    } else if let Some(r) = region.as_deref().filter(|r| !r.is_empty()) {
        // Some endpoints put the region before the service.
        if ENDS_WITH_DIGIT.is_match(&service) && !ENDS_WITH_DIGIT.is_match(r) {
            let r = r.to_string();
            region = Some(std::mem::replace(&mut service, r));
        }
    }

    if let Some((_, alias)) = SERVICE_ALIASES.iter().find(|(raw, _)| *raw == service) {
        service = alias.to_string();
    }

    ServiceRegion::new(service, region.unwrap_or_default())
}
