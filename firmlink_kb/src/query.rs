//! Query builder for organization lookups.

use url::Url;

/// Lookup parameters for a single organization.
///
/// At least one of `name` or `external_id` should be set; the provider
/// resolves by external id first when both are present.
#[derive(Clone, Debug, Default)]
pub struct LookupQuery {
    pub name: Option<String>,
    pub external_id: Option<String>,
    pub country: Option<String>,
    pub homepage: Option<String>,
}

impl LookupQuery {
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_external_id(mut self, external_id: &str) -> Self {
        self.external_id = Some(external_id.to_string());
        self
    }

    pub fn with_country(mut self, country: &str) -> Self {
        self.country = Some(country.to_uppercase());
        self
    }

    pub fn with_homepage(mut self, homepage: &str) -> Self {
        self.homepage = Some(homepage.to_string());
        self
    }

    /// True when the query carries nothing the provider can resolve on.
    pub fn is_empty(&self) -> bool {
        self.name.as_deref().map_or(true, |n| n.trim().is_empty())
            && self.external_id.as_deref().map_or(true, |id| id.trim().is_empty())
    }

    /// Appends this query's parameters to the given URL, returning the modified URL.
    pub fn add_to_url(&self, url: &Url) -> Url {
        let mut url = url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(external_id) = &self.external_id {
                pairs.append_pair("id", external_id);
            }
            if let Some(name) = &self.name {
                pairs.append_pair("name", name);
            }
            if let Some(country) = &self.country {
                pairs.append_pair("country", country);
            }
            if let Some(homepage) = &self.homepage {
                pairs.append_pair("homepage", homepage);
            }
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_adds_nothing() {
        let url = Url::parse("https://kb.example.org/v1/organizations/lookup").unwrap();
        let built = LookupQuery::default().add_to_url(&url);
        assert_eq!(built.query(), Some(""));
        assert!(LookupQuery::default().is_empty());
    }

    #[test]
    fn params_are_encoded_in_fixed_order() {
        let url = Url::parse("https://kb.example.org/v1/organizations/lookup").unwrap();
        let built = LookupQuery::default()
            .with_name("Google DeepMind")
            .with_external_id("Q15733006")
            .with_country("gb")
            .add_to_url(&url);
        assert_eq!(
            built.query(),
            Some("id=Q15733006&name=Google+DeepMind&country=GB")
        );
    }

    #[test]
    fn whitespace_name_is_empty() {
        assert!(LookupQuery::default().with_name("   ").is_empty());
        assert!(!LookupQuery::default().with_external_id("Q95").is_empty());
    }
}
