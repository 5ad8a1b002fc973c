use url::Url;

/// Lower-cased host of `link` with a leading `www.` removed; empty when the
/// link does not parse.
pub fn normalize_domain(link: &str) -> String {
    let Ok(url) = Url::parse(link) else {
        return String::new();
    };
    let host = url.host_str().unwrap_or_default().to_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

/// Decides whether a source domain is trusted. Matching is by substring so
/// that subdomains of a whitelisted outlet are accepted too.
#[derive(Debug, Clone)]
pub struct TrustClassifier {
    whitelist: Vec<String>,
}

impl TrustClassifier {
    /// Uses `configured` when it has any usable entry, `defaults` otherwise.
    pub fn effective(configured: &[String], defaults: &[String]) -> Self {
        let clean = |list: &[String]| -> Vec<String> {
            list.iter()
                .map(|d| d.trim().to_lowercase())
                .filter(|d| !d.is_empty())
                .collect()
        };
        let mut whitelist = clean(configured);
        if whitelist.is_empty() {
            whitelist = clean(defaults);
        }
        Self { whitelist }
    }

    pub fn is_trusted(&self, source_domain: &str) -> bool {
        !source_domain.is_empty() && self.whitelist.iter().any(|w| source_domain.contains(w.as_str()))
    }

    pub fn domains(&self) -> &[String] {
        &self.whitelist
    }
}
