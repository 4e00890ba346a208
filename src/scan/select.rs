use std::{fmt, path::Path};

use crate::config::{extension_of, ExtensionSet};

/// Predicate over `(path, extension)`; a match keeps the file out of the job.
pub type ExcludeFn = dyn Fn(&Path, &str) -> bool + Send + Sync;

/// Decides which scanned files become upload jobs.
pub struct Selector {
    extensions: ExtensionSet,
    exclude: Option<Box<ExcludeFn>>,
}

impl Selector {
    /// Selects files by extension, skipping generated thumbnails.
    pub fn new(extensions: ExtensionSet) -> Self {
        Selector {
            extensions,
            exclude: Some(Box::new(is_thumbnail)),
        }
    }

    pub fn with_exclude<F>(mut self, exclude: F) -> Self
    where
        F: Fn(&Path, &str) -> bool + Send + Sync + 'static,
    {
        self.exclude = Some(Box::new(exclude));
        self
    }

    pub fn without_exclude(mut self) -> Self {
        self.exclude = None;
        self
    }

    pub fn selects(&self, path: &Path) -> bool {
        let extension = extension_of(path);
        if !self.extensions.contains(&extension) {
            return false;
        }

        match &self.exclude {
            Some(exclude) => !exclude(path, &extension),
            None => true,
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("extensions", &self.extensions)
            .field("exclude", &self.exclude.is_some())
            .finish()
    }
}

/// Thumbnails are generated next to the original with a `_` before the extension.
pub fn is_thumbnail(path: &Path, _extension: &str) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().contains("_."))
}
