use url::Url;

use crate::configuration::RegistrySettings;

/// Builds search and detail URLs for the upstream registry.
#[derive(Debug, Clone)]
pub struct Registry {
    base_url: Url,
    search_path: String,
    search_param: String,
}

impl Registry {
    pub fn new(settings: &RegistrySettings) -> Result<Self, url::ParseError> {
        Ok(Registry {
            base_url: Url::parse(&settings.base_url)?,
            search_path: settings.search_path.clone(),
            search_param: settings.search_param.clone(),
        })
    }

    pub fn search_url(&self, name: &str) -> Result<Url, url::ParseError> {
        let mut url = self.base_url.join(&self.search_path)?;
        url.query_pairs_mut().append_pair(&self.search_param, name);
        Ok(url)
    }

    /// Resolves a detail path (or an already absolute URL) against the base.
    pub fn detail_url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }
}
