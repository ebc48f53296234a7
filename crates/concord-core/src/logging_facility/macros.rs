//! Operation boundary macros
//!
//! `diff`, `merge`, `pairwise_agreement` and the engine commands each emit a
//! start event and exactly one of end / end_error, tagged with `op` and
//! `event` so log pipelines can filter without per-operation rules.
//! Callers must depend on `concord-core-types` for the schema constants.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_op_event {
    ($level:ident, $op:expr, $event:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $event,
            $($($field)*)?
        )
    };
}

/// Start of an operation
///
/// ```
/// # use concord_core::log_op_start;
/// log_op_start!("diff");
/// log_op_start!("diff", source_count = 3);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(info, $op, concord_core_types::schema::EVENT_START $(, $($field)*)?)
    };
}

/// Successful end of an operation; `duration_ms` is mandatory
///
/// ```
/// # use concord_core::log_op_end;
/// log_op_end!("merge", duration_ms = 42, unresolved_count = 2);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(
            info,
            $op,
            concord_core_types::schema::EVENT_END,
            duration_ms = $duration
            $(, $($field)*)?
        )
    };
}

/// Failed end of an operation
///
/// `$err` is anything convertible into [`ExError`](crate::errors::ExError);
/// its stable code and kind become the `err_code` and `err_kind` fields.
///
/// ```
/// # use concord_core::{log_op_error, errors::ConcordError};
/// let err = ConcordError::DuplicateSource { label: "alice".to_string() };
/// log_op_error!("diff", err, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        $crate::__log_op_event!(
            error,
            $op,
            concord_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code()
            $(, $($field)*)?
        )
    }};
}
