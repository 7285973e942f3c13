//! Error taxonomy for the component compiler.
//!
//! Every failure carries a stable diagnostic code so that logs and error
//! responses can be grepped independently of the message wording.

use std::path::PathBuf;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_SOURCE_NOT_FOUND: &str = "GOO-ERR-SOURCE-001";
pub const ERR_MALFORMED_SOURCE: &str = "GOO-ERR-SOURCE-002";
pub const ERR_IMPORT_RESOLUTION: &str = "GOO-ERR-IMPORT-001";
pub const ERR_CYCLIC_IMPORT: &str = "GOO-ERR-IMPORT-002";
pub const ERR_AMBIGUOUS_NAME: &str = "GOO-ERR-NAME-001";
pub const ERR_TEMPLATE_COMPOSITION: &str = "GOO-ERR-TEMPLATE-001";
pub const ERR_RENDER: &str = "GOO-ERR-RENDER-001";
pub const ERR_STRUCTURE: &str = "GOO-ERR-STRUCTURE-001";
pub const ERR_CONFIG: &str = "GOO-ERR-CONFIG-001";
pub const ERR_SERVE: &str = "GOO-ERR-SERVE-001";

#[derive(Debug, Error)]
pub enum GooError {
    #[error("cannot read source {path:?}: {source}")]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed source {path:?}: {reason}")]
    MalformedSource { path: PathBuf, reason: String },

    /// Recursive compile of an imported component failed.
    #[error("failed to resolve import '{import}' from {importer:?}: {source}")]
    ImportResolutionFailure {
        importer: PathBuf,
        import: String,
        #[source]
        source: Box<GooError>,
    },

    #[error("import cycle detected at {path:?}")]
    CyclicImport { path: PathBuf },

    #[error("component name '{name}' is bound to both {first:?} and {second:?}")]
    AmbiguousComponentName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("template '{template}' failed to parse: {source}")]
    TemplateCompositionFailure {
        template: String,
        #[source]
        source: Box<handlebars::TemplateError>,
    },

    #[error("failed to render page {page:?}: {source}")]
    RenderFailure {
        page: PathBuf,
        #[source]
        source: Box<handlebars::RenderError>,
    },

    #[error("invalid project structure: {0}")]
    StructuralValidationFailure(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("server failure: {0}")]
    Serve(#[from] std::io::Error),
}

impl GooError {
    /// Stable diagnostic code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            GooError::SourceNotFound { .. } => ERR_SOURCE_NOT_FOUND,
            GooError::MalformedSource { .. } => ERR_MALFORMED_SOURCE,
            GooError::ImportResolutionFailure { .. } => ERR_IMPORT_RESOLUTION,
            GooError::CyclicImport { .. } => ERR_CYCLIC_IMPORT,
            GooError::AmbiguousComponentName { .. } => ERR_AMBIGUOUS_NAME,
            GooError::TemplateCompositionFailure { .. } => ERR_TEMPLATE_COMPOSITION,
            GooError::RenderFailure { .. } => ERR_RENDER,
            GooError::StructuralValidationFailure(_) => ERR_STRUCTURE,
            GooError::Config(_) => ERR_CONFIG,
            GooError::Serve(_) => ERR_SERVE,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        GooError::MalformedSource {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Walks through import wrappers down to the error that started the failure.
    pub fn root_cause(&self) -> &GooError {
        match self {
            GooError::ImportResolutionFailure { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, GooError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_nested_imports() {
        let inner = GooError::malformed("b.goo", "unclosed <script>");
        let middle = GooError::ImportResolutionFailure {
            importer: PathBuf::from("a.goo"),
            import: "./b.goo".to_string(),
            source: Box::new(inner),
        };
        let outer = GooError::ImportResolutionFailure {
            importer: PathBuf::from("page.goo"),
            import: "./a.goo".to_string(),
            source: Box::new(middle),
        };

        assert_eq!(outer.code(), ERR_IMPORT_RESOLUTION);
        assert_eq!(outer.root_cause().code(), ERR_MALFORMED_SOURCE);
    }
}
