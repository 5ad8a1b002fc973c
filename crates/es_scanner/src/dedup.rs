use std::collections::HashSet;

/// Links already encountered during one scan, across all feeds.
#[derive(Debug, Default)]
pub struct SeenLinks {
    links: HashSet<String>,
}

impl SeenLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `link` and returns true only the first time it is seen.
    pub fn first_sighting(&mut self, link: &str) -> bool {
        if self.links.contains(link) {
            return false;
        }
        self.links.insert(link.to_string())
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
