//! Log macros with consistent field names.
//!
//! Block-scoped lines always carry `component`, `block` and `hash` so log
//! pipelines can join them across crates.

/// Log a block-related event with standard fields.
///
/// ```rust,ignore
/// log_block_event!(info, "monitor", "Block processed", header.number, hash, proposer = %p);
/// ```
#[macro_export]
macro_rules! log_block_event {
    ($level:ident, $component:expr, $msg:expr, $block:expr, $hash:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            block = $block,
            hash = %$hash,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log an RPC-related event with standard fields.
#[macro_export]
macro_rules! log_rpc_event {
    ($level:ident, $msg:expr, $method:expr, $id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = "rpc",
            method = %$method,
            request_id = $id,
            $($($field)*,)?
            $msg
        )
    };
}
