//! Field keys and event names shared by every log line
//!
//! The `log_op_*` macros write these keys as literal identifiers; the
//! constants exist so that readers of captured events (tests, log
//! pipelines) do not repeat the strings.

pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";

/// What a diff or merge is about
pub const FIELD_PROJECT_ID: &str = "project_id";
pub const FIELD_DOCUMENT_ID: &str = "document_id";
pub const FIELD_SOURCE: &str = "source";

pub const FIELD_SOURCE_COUNT: &str = "source_count";
pub const FIELD_SET_COUNT: &str = "set_count";
pub const FIELD_UNRESOLVED_COUNT: &str = "unresolved_count";

pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

/// Values of the `event` field
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
