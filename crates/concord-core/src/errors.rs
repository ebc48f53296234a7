use concord_core_types::{RequestId, TraceId};
use thiserror::Error;

/// Result type alias using ConcordError
pub type Result<T> = std::result::Result<T, ConcordError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling and in exported reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Input/Validation
    InvalidInput,
    NotFound,
    AlreadyExists,
    /// A stored annotation set exists but cannot be decoded or fails validation
    Corrupt,

    // Diff / agreement / merge
    /// Zero sources qualify for a diff run
    NoEligibleSources,
    /// The merge reference source is not among the diffed sources
    ReferenceSourceNotFound,
    /// One source could not be read or upgraded and was excluded
    UnreadableSource,
    /// The agreement measure cannot represent the requested category set
    UnsupportedMeasureConfiguration,

    // Integration/IO
    Io,
    Serialization,
    Persistence,
    Concurrency,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::Corrupt => "ERR_CORRUPT",
            ExErrorKind::NoEligibleSources => "ERR_NO_ELIGIBLE_SOURCES",
            ExErrorKind::ReferenceSourceNotFound => "ERR_REFERENCE_SOURCE_NOT_FOUND",
            ExErrorKind::UnreadableSource => "ERR_UNREADABLE_SOURCE",
            ExErrorKind::UnsupportedMeasureConfiguration => {
                "ERR_UNSUPPORTED_MEASURE_CONFIGURATION"
            }
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling and context
/// (operation, document, source) for diagnostics.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    document_id: Option<String>,
    source_label: Option<String>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<ExError>>,
    sources: Option<Vec<String>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            document_id: None,
            source_label: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
            sources: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add document context
    pub fn with_document_id(mut self, id: impl Into<String>) -> Self {
        self.document_id = Some(id.into());
        self
    }

    /// Add annotation source (annotator) context
    pub fn with_source_label(mut self, label: impl Into<String>) -> Self {
        self.source_label = Some(label.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add trace ID context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Add the set of sources involved (available sources, excluded sources, ...)
    pub fn with_sources(mut self, labels: Vec<String>) -> Self {
        self.sources = Some(labels);
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the document context, if any
    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    /// Get the source label context, if any
    pub fn source_label(&self) -> Option<&str> {
        self.source_label.as_deref()
    }

    /// Get the request ID context, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Get the trace ID context, if any
    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Get the involved source labels, if any
    pub fn sources(&self) -> Option<&[String]> {
        self.sources.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(document_id) = &self.document_id {
            write!(f, " (document: {})", document_id)?;
        }
        if let Some(label) = &self.source_label {
            write!(f, " (source: {})", label)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain error taxonomy for diff, agreement, merge and ordering operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConcordError {
    // ===== Source selection =====
    /// No source qualifies for a diff run
    #[error("No eligible annotation sets for document {document_id} (required status: {required_status}); check permissions and assignment")]
    NoEligibleSources {
        document_id: String,
        required_status: String,
    },

    /// Two stores passed to one diff run share a source label
    #[error("Source {label} was supplied more than once")]
    DuplicateSource { label: String },

    /// Merge reference is not among the diffed sources
    #[error("Reference source {reference} is not part of the diff (available: {available:?})")]
    ReferenceSourceNotFound {
        reference: String,
        available: Vec<String>,
    },

    /// A source store could not be read or upgraded
    #[error("Annotation set of {label} for document {document_id} is unreadable: {reason}")]
    UnreadableSource {
        document_id: String,
        label: String,
        reason: String,
    },

    // ===== Agreement =====
    /// Measure cannot represent the requested categories
    #[error("Agreement measure {measure} cannot be used here: {reason}")]
    UnsupportedMeasureConfiguration { measure: String, reason: String },

    /// Unknown measure name in configuration
    #[error("Unknown agreement measure: {name}")]
    UnknownMeasure { name: String },

    // ===== Store validation =====
    /// Span offsets are inverted
    #[error("Annotation {id} in store {label} has begin {begin} > end {end}")]
    InvalidOffsets {
        label: String,
        id: u64,
        begin: usize,
        end: usize,
    },

    /// Two annotations share one id
    #[error("Annotation id {id} occurs more than once in store {label}")]
    DuplicateAnnotationId { label: String, id: u64 },

    /// A reference does not resolve to an annotation of the required kind
    #[error("Annotation {id} in store {label} references {target}, which is not a {expected}")]
    DanglingReference {
        label: String,
        id: u64,
        target: u64,
        expected: String,
    },

    /// A coreference chain loops back on itself
    #[error("Chain link {id} in store {label} is part of a cycle")]
    CyclicChain { label: String, id: u64 },

    /// A layer name was requested twice with conflicting descriptions
    #[error("Layer {layer} is declared more than once")]
    DuplicateLayer { layer: String },

    // ===== Ordering =====
    /// Ordered item not present in its ordering scope
    #[error("Ordered item not found: {item}")]
    OrderedItemNotFound { item: String },

    /// Per-project ordering lock was poisoned by a panicking holder
    #[error("Ordering lock for project {project_id} is poisoned")]
    OrderingLockPoisoned { project_id: String },

    // ===== Generic Errors =====
    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ConcordError {
    /// True for errors produced by [`crate::model::AnnotationStore::validate`]
    pub fn is_store_validation(&self) -> bool {
        matches!(
            self,
            ConcordError::InvalidOffsets { .. }
                | ConcordError::DuplicateAnnotationId { .. }
                | ConcordError::DanglingReference { .. }
                | ConcordError::CyclicChain { .. }
        )
    }
}

/// Conversion from ConcordError to ExError
impl From<ConcordError> for ExError {
    fn from(err: ConcordError) -> Self {
        let message = err.to_string();
        match err {
            ConcordError::NoEligibleSources { document_id, .. } => {
                ExError::new(ExErrorKind::NoEligibleSources)
                    .with_document_id(document_id)
                    .with_message(message)
            }
            ConcordError::DuplicateSource { label } => ExError::new(ExErrorKind::InvalidInput)
                .with_source_label(label)
                .with_message(message),
            ConcordError::ReferenceSourceNotFound {
                reference,
                available,
            } => ExError::new(ExErrorKind::ReferenceSourceNotFound)
                .with_source_label(reference)
                .with_sources(available)
                .with_message(message),
            ConcordError::UnreadableSource {
                document_id, label, ..
            } => ExError::new(ExErrorKind::UnreadableSource)
                .with_document_id(document_id)
                .with_source_label(label)
                .with_message(message),
            ConcordError::UnsupportedMeasureConfiguration { .. } => {
                ExError::new(ExErrorKind::UnsupportedMeasureConfiguration).with_message(message)
            }
            ConcordError::UnknownMeasure { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }
            ConcordError::InvalidOffsets { label, .. }
            | ConcordError::DuplicateAnnotationId { label, .. }
            | ConcordError::DanglingReference { label, .. }
            | ConcordError::CyclicChain { label, .. } => ExError::new(ExErrorKind::Corrupt)
                .with_source_label(label)
                .with_message(message),
            ConcordError::DuplicateLayer { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }
            ConcordError::OrderedItemNotFound { .. } => {
                ExError::new(ExErrorKind::NotFound).with_message(message)
            }
            ConcordError::OrderingLockPoisoned { .. } => {
                ExError::new(ExErrorKind::Concurrency).with_message(message)
            }
            ConcordError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
            ConcordError::Internal { .. } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for ConcordError {
    fn from(err: serde_json::Error) -> Self {
        ConcordError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_kind_codes_are_stable() {
        assert_eq!(
            ExErrorKind::NoEligibleSources.code(),
            "ERR_NO_ELIGIBLE_SOURCES"
        );
        assert_eq!(
            ExErrorKind::ReferenceSourceNotFound.code(),
            "ERR_REFERENCE_SOURCE_NOT_FOUND"
        );
        assert_eq!(
            ExErrorKind::UnsupportedMeasureConfiguration.code(),
            "ERR_UNSUPPORTED_MEASURE_CONFIGURATION"
        );
    }

    #[test]
    fn test_ex_error_sources_none_by_default() {
        let err = ExError::new(ExErrorKind::Internal);
        assert!(err.sources().is_none());
        assert!(err.source_error().is_none());
    }

    #[test]
    fn test_display_includes_code_and_context() {
        let err = ExError::new(ExErrorKind::UnreadableSource)
            .with_op("read_store")
            .with_document_id("doc-1")
            .with_source_label("alice")
            .with_message("bad json");
        let text = err.to_string();
        assert!(text.starts_with("[ERR_UNREADABLE_SOURCE]"));
        assert!(text.contains("read_store"));
        assert!(text.contains("doc-1"));
        assert!(text.contains("alice"));
    }

    #[test]
    fn test_validation_errors_map_to_corrupt() {
        let err = ConcordError::CyclicChain {
            label: "bob".to_string(),
            id: 3,
        };
        assert!(err.is_store_validation());
        let ex: ExError = err.into();
        assert_eq!(ex.kind(), ExErrorKind::Corrupt);
        assert_eq!(ex.source_label(), Some("bob"));
    }
}
