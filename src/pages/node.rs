/// A named vertex in the outlink or backlink graph
///
/// Links are kept in first-seen order and never repeated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageNode {
    pub normalized_url: String,
    links: Vec<String>,
}

impl PageNode {
    pub fn new(normalized_url: impl Into<String>) -> Self {
        Self {
            normalized_url: normalized_url.into(),
            links: Vec::new(),
        }
    }

    /// Appends `link` unless it is already present; returns true if added
    pub fn append_link(&mut self, link: &str) -> bool {
        if self.contains(link) {
            return false;
        }
        self.links.push(link.to_string());
        true
    }

    /// Removes `link`; returns true if it was present
    pub fn remove_link(&mut self, link: &str) -> bool {
        let before = self.links.len();
        self.links.retain(|l| l != link);
        self.links.len() != before
    }

    pub fn contains(&self, link: &str) -> bool {
        self.links.iter().any(|l| l == link)
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
