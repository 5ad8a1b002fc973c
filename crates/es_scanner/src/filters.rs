/// Case-insensitive substring gate applied to article titles.
///
/// Exclusion phrases are checked first and are absolute: advice and lifestyle
/// content is dropped even when it mentions a disease keyword.
#[derive(Debug, Clone)]
pub struct TextFilter {
    exclusions: Vec<String>,
}

impl TextFilter {
    pub fn new(exclusions: &[String]) -> Self {
        Self {
            exclusions: exclusions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    pub fn is_excluded(&self, text: &str) -> bool {
        self.excludes_lowered(&text.to_lowercase())
    }

    fn excludes_lowered(&self, lowered: &str) -> bool {
        self.exclusions.iter().any(|ex| !ex.is_empty() && lowered.contains(ex.as_str()))
    }

    /// Returns every keyword found in `text`, in the order supplied, or
    /// `None` when the text is excluded or nothing matches.
    pub fn match_relevant(&self, text: &str, keywords: &[String]) -> Option<Vec<String>> {
        if text.is_empty() {
            return None;
        }
        let lowered = text.to_lowercase();
        if self.excludes_lowered(&lowered) {
            return None;
        }

        let matched: Vec<String> = keywords
            .iter()
            .filter(|kw| {
                let kw = kw.to_lowercase();
                !kw.is_empty() && lowered.contains(&kw)
            })
            .cloned()
            .collect();

        if matched.is_empty() {
            None
        } else {
            Some(matched)
        }
    }
}
