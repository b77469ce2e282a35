use std::fmt;
use std::sync::Arc;

use crate::candidates;
use crate::config::SlugSettings;
use crate::entity::slug::{MAX_SLUG_LENGTH, normalize_scope};
use crate::error::{SlugError, SlugResult};
use crate::owner::Sluggable;

/// Produces raw slug text for an owner; `None` or an empty string means "skip me".
pub type Generator<O> = Box<dyn Fn(&O) -> Option<String> + Send + Sync>;
/// Turns arbitrary text into a URL-safe token.
pub type Slugifier = Arc<dyn Fn(&str) -> String + Send + Sync>;
/// Returns the URL path prefix (slash included) that scopes an owner's slugs.
pub type ScopeFn<O> = Box<dyn Fn(&O) -> Option<String> + Send + Sync>;

/// Default slugifier: lowercase ASCII words joined with hyphens.
pub fn default_slugifier() -> Slugifier {
    Arc::new(|text: &str| ::slug::slugify(text))
}

/// Slugging rules for one owner type.
///
/// Generators are tried in declaration order; the first one is also the base
/// of the last-resort `text{separator}{id}` candidate.
pub struct SluggedConfig<O> {
    generators: Vec<Generator<O>>,
    slugifier: Slugifier,
    id_separator: String,
    scope: Option<ScopeFn<O>>,
    blacklist: Vec<String>,
    max_length: usize,
}

impl<O: Sluggable> SluggedConfig<O> {
    pub fn builder(settings: &SlugSettings) -> SluggedConfigBuilder<O> {
        SluggedConfigBuilder {
            generators: Vec::new(),
            slugifier: default_slugifier(),
            id_separator: settings.id_separator.clone(),
            scope: None,
            blacklist: settings.blacklist.clone(),
            max_length: settings.max_length,
        }
    }

    /// Slug candidates for `owner`, highest priority first.
    pub fn candidates(&self, owner: &O) -> SlugResult<Vec<String>> {
        let generated: Vec<String> = self
            .generators
            .iter()
            .filter_map(|generator| generator(owner))
            .filter(|raw| !raw.is_empty())
            .map(|raw| candidates::truncate(&(self.slugifier)(&raw), self.max_length))
            .filter(|slug| !slug.is_empty())
            .collect();

        if generated.is_empty() {
            return Err(SlugError::GenerationExhausted(owner.owner_ref()));
        }

        Ok(candidates::finalize(
            generated,
            &self.id_separator,
            owner.owner_id(),
            self.max_length,
            &self.blacklist,
        ))
    }

    /// The owner's scope, or `None` for the universal scope.
    pub fn scope_for(&self, owner: &O) -> Option<String> {
        normalize_scope(self.scope.as_ref().and_then(|scope| scope(owner)))
    }
}

impl<O> fmt::Debug for SluggedConfig<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SluggedConfig")
            .field("generators", &self.generators.len())
            .field("id_separator", &self.id_separator)
            .field("scoped", &self.scope.is_some())
            .field("blacklist", &self.blacklist)
            .field("max_length", &self.max_length)
            .finish()
    }
}

pub struct SluggedConfigBuilder<O> {
    generators: Vec<Generator<O>>,
    slugifier: Slugifier,
    id_separator: String,
    scope: Option<ScopeFn<O>>,
    blacklist: Vec<String>,
    max_length: usize,
}

impl<O: Sluggable> SluggedConfigBuilder<O> {
    /// Appends a generator with the lowest priority so far.
    pub fn generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(&O) -> Option<String> + Send + Sync + 'static,
    {
        self.generators.push(Box::new(generator));
        self
    }

    pub fn slugifier<F>(mut self, slugifier: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.slugifier = Arc::new(slugifier);
        self
    }

    pub fn id_separator(mut self, separator: impl Into<String>) -> Self {
        self.id_separator = separator.into();
        self
    }

    pub fn scope<F>(mut self, scope: F) -> Self
    where
        F: Fn(&O) -> Option<String> + Send + Sync + 'static,
    {
        self.scope = Some(Box::new(scope));
        self
    }

    /// Replaces the default blacklist.
    pub fn blacklist<I, S>(mut self, blacklist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist = blacklist.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn build(self) -> SlugResult<SluggedConfig<O>> {
        if self.generators.is_empty() {
            return Err(SlugError::Config(
                "must provide at least one slug generator".into(),
            ));
        }
        if self.max_length == 0 || self.max_length > MAX_SLUG_LENGTH {
            return Err(SlugError::Config(format!(
                "max_length must be between 1 and {MAX_SLUG_LENGTH}, got {}",
                self.max_length
            )));
        }

        Ok(SluggedConfig {
            generators: self.generators,
            slugifier: self.slugifier,
            id_separator: self.id_separator,
            scope: self.scope,
            blacklist: self.blacklist,
            max_length: self.max_length,
        })
    }
}
