//! Homepage URL reduction to a comparable root domain.

use std::net::IpAddr;

use url::Url;

/// Second-level labels that sit under a country TLD ("co.uk", "com.au").
const SECOND_LEVEL_LABELS: &[&str] = &["co", "com", "ac", "org", "net", "gov", "edu", "ne", "or", "go"];

/// Hosting and aggregator roots whose subdomains belong to unrelated owners.
pub const SHARED_HOSTING: &[&str] = &[
    "github.io",
    "blogspot.com",
    "wordpress.com",
    "wixsite.com",
    "google.com",
    "sites.google.com",
    "linkedin.com",
    "facebook.com",
    "twitter.com",
    "wikipedia.org",
];

/// Reduce a homepage URL or bare host to its registrable root domain.
///
/// `https://www.research.ibm.com/labs` and `ibm.com` both yield `ibm.com`;
/// `http://www.bbc.co.uk` yields `bbc.co.uk`. Returns `None` for IP hosts and
/// inputs that do not parse to a host.
pub fn root_domain(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };
    let parsed = Url::parse(&with_scheme).ok()?;
    let host = parsed.host_str()?.trim_end_matches('.').to_lowercase();
    if host.parse::<IpAddr>().is_ok() || host.starts_with('[') {
        return None;
    }

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return None;
    }
    let tld = labels[labels.len() - 1];
    let second = labels[labels.len() - 2];
    let keep = if tld.len() == 2 && SECOND_LEVEL_LABELS.contains(&second) {
        3
    } else {
        2
    };
    if labels.len() < keep {
        return None;
    }
    Some(labels[labels.len() - keep..].join("."))
}

/// The registrable label of a root domain ("ibm.co.uk" -> "ibm").
pub fn domain_label(root: &str) -> &str {
    root.split('.').next().unwrap_or(root)
}

/// Whether a root domain is a shared host that says nothing about ownership.
pub fn is_shared_hosting(root: &str) -> bool {
    SHARED_HOSTING.contains(&root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_domain_strips_subdomains_and_paths() {
        assert_eq!(
            root_domain("https://www.research.ibm.com/labs?x=1").as_deref(),
            Some("ibm.com")
        );
        assert_eq!(root_domain("ibm.com").as_deref(), Some("ibm.com"));
        assert_eq!(root_domain("WWW.IBM.COM.").as_deref(), Some("ibm.com"));
    }

    #[test]
    fn test_root_domain_country_second_level() {
        assert_eq!(root_domain("http://www.bbc.co.uk").as_deref(), Some("bbc.co.uk"));
        assert_eq!(root_domain("anu.edu.au").as_deref(), Some("anu.edu.au"));
        assert_eq!(root_domain("co.uk"), None);
    }

    #[test]
    fn test_root_domain_rejects_junk() {
        assert_eq!(root_domain(""), None);
        assert_eq!(root_domain("localhost"), None);
        assert_eq!(root_domain("http://192.168.0.1/"), None);
        assert_eq!(root_domain("http://"), None);
    }

    #[test]
    fn test_domain_label() {
        assert_eq!(domain_label("ibm.co.uk"), "ibm");
        assert_eq!(domain_label("ibm.com"), "ibm");
    }

    #[test]
    fn test_shared_hosting() {
        assert!(is_shared_hosting("github.io"));
        assert!(!is_shared_hosting("ibm.com"));
    }
}
