//! Track id to playable resource resolution

use crate::error::{Result, SessionError};
use serde::{Deserialize, Serialize};

/// Location of a playable resource (URL, file URI, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceLocator(String);

impl ResourceLocator {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps a track id to something the audio device can load
///
/// Implementations must be pure lookups. A failure is handled by the
/// session exactly like the device refusing to play the track.
pub trait ResourceResolver: Send + Sync {
    fn resolve(&self, track_id: &str) -> Result<ResourceLocator>;
}

impl<F> ResourceResolver for F
where
    F: Fn(&str) -> Result<ResourceLocator> + Send + Sync,
{
    fn resolve(&self, track_id: &str) -> Result<ResourceLocator> {
        self(track_id)
    }
}

/// Placeholder replaced by the track id in URL templates
pub const ID_PLACEHOLDER: &str = "{id}";

/// Resolver that substitutes the track id into a URL template
///
/// `https://media.example.com/tracks/{id}.mp3` resolves track `42` to
/// `https://media.example.com/tracks/42.mp3`.
#[derive(Debug, Clone)]
pub struct UrlTemplateResolver {
    template: String,
}

impl UrlTemplateResolver {
    /// Create a resolver from a template containing `{id}`
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains(ID_PLACEHOLDER) {
            return Err(SessionError::resolution(
                "",
                format!("template {template:?} has no {ID_PLACEHOLDER} placeholder"),
            ));
        }
        Ok(Self { template })
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl ResourceResolver for UrlTemplateResolver {
    fn resolve(&self, track_id: &str) -> Result<ResourceLocator> {
        if track_id.is_empty() {
            return Err(SessionError::resolution(track_id, "empty track id"));
        }
        if track_id.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(SessionError::resolution(
                track_id,
                "track id contains characters that cannot appear in a locator",
            ));
        }
        Ok(ResourceLocator::new(
            self.template.replace(ID_PLACEHOLDER, track_id),
        ))
    }
}
