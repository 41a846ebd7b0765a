use std::fmt;
use std::sync::Arc;

/// Decides which installed packages are not looked up in the registry.
///
/// Skipped packages are still reported, as degraded records.
#[derive(Clone)]
pub struct SkipPolicy {
    predicate: Arc<dyn Fn(&str) -> bool + Send + Sync>,
    description: String,
}

impl SkipPolicy {
    /// Look up every package.
    pub fn none() -> Self {
        Self::custom("none", |_| false)
    }

    /// Skip names containing any of `chars` (path-like or local entries).
    pub fn containing(chars: &[char]) -> Self {
        let chars = chars.to_vec();
        let description = format!("names containing any of {chars:?}");
        Self {
            predicate: Arc::new(move |name: &str| name.contains(chars.as_slice())),
            description,
        }
    }

    pub fn custom(
        description: impl Into<String>,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            predicate: Arc::new(predicate),
            description: description.into(),
        }
    }

    pub fn should_skip(&self, name: &str) -> bool {
        (self.predicate)(name)
    }
}

impl Default for SkipPolicy {
    fn default() -> Self {
        Self::containing(&['-', '.'])
    }
}

impl fmt::Debug for SkipPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipPolicy")
            .field("description", &self.description)
            .finish()
    }
}
