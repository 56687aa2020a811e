/// Default size tokens used by the catalog's image CDN
pub const POSTER_SIZE: &str = "w500";
pub const BACKDROP_SIZE: &str = "w1280";
pub const PROFILE_SIZE: &str = "w185";

/// Builds image URLs as `base + size + path`.
#[derive(Debug, Clone)]
pub struct ImageUrls {
  base: String,
}

impl ImageUrls {
  pub fn new(base: impl Into<String>) -> Self {
    let mut base = base.into();
    if !base.ends_with('/') {
      base.push('/');
    }
    Self { base }
  }

  /// `None` when the path is missing or blank; never builds a URL without one.
  pub fn url(&self, path: Option<&str>, size: &str) -> Option<String> {
    let path = path.map(str::trim).filter(|p| !p.is_empty())?;
    Some(format!("{}{}{}", self.base, size, path))
  }

  pub fn poster(&self, path: Option<&str>) -> Option<String> {
    self.url(path, POSTER_SIZE)
  }

  pub fn backdrop(&self, path: Option<&str>) -> Option<String> {
    self.url(path, BACKDROP_SIZE)
  }

  pub fn profile(&self, path: Option<&str>) -> Option<String> {
    self.url(path, PROFILE_SIZE)
  }
}
