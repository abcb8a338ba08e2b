//! Structured logging macros with consistent fields.
//!
//! Every event carries `component`, so log pipelines can split the filter,
//! lock and guard streams without parsing targets.

/// Log an event tagged with its component.
#[macro_export]
macro_rules! log_event {
    (info, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (warn, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (error, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (debug, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log an event about one cache key.
#[macro_export]
macro_rules! log_key_event {
    ($level:ident, $component:expr, $msg:expr, $key:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            key = %$key,
            $($($field)*,)?
            $msg
        )
    };
}
