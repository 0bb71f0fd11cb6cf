//! Call-stack snapshots for error records
//!
//! A snapshot is a short list of `"function:line"` strings, innermost
//! first. `skip` raw frames are dropped starting at the unwinder; after that,
//! leading frames that belong to the logging machinery (the unwinder,
//! `tracing`, the `log` bridge, this crate, and runtime glue in `std`/`core`)
//! are dropped too, so the first entry is the code that emitted the record.

/// Symbol prefixes treated as logging machinery
const MACHINERY_PREFIXES: &[&str] = &[
    "backtrace::",
    "tracing::",
    "tracing_core::",
    "tracing_subscriber::",
    "tracing_log::",
    "log::",
    "arc_swap::",
    "logkit_logging::",
    "std::",
    "core::",
    "alloc::",
];

fn is_machinery(function: &str) -> bool {
    let mut name = function.trim_start_matches(['<', '&']);
    for qualifier in ["mut ", "dyn "] {
        name = name.strip_prefix(qualifier).unwrap_or(name);
    }
    MACHINERY_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Capture up to `max_depth` frames, skipping `skip` raw frames first
///
/// Frames whose symbol cannot be resolved are dropped; a missing line
/// number renders as `0`. Never fails: the worst case is an empty list.
pub fn capture(skip: usize, max_depth: usize) -> Vec<String> {
    let mut stack = Vec::with_capacity(max_depth);
    if max_depth == 0 {
        return stack;
    }

    let mut seen = 0usize;
    let mut leading = true;
    backtrace::trace(|frame| {
        seen += 1;
        if seen <= skip {
            return true;
        }

        let mut resolved: Option<(String, u32)> = None;
        backtrace::resolve_frame(frame, |symbol| {
            if resolved.is_none() {
                if let Some(name) = symbol.name() {
                    resolved = Some((format!("{:#}", name), symbol.lineno().unwrap_or(0)));
                }
            }
        });

        let Some((function, line)) = resolved else {
            return true;
        };
        if leading && is_machinery(&function) {
            return true;
        }
        leading = false;

        stack.push(format!("{}:{}", function, line));
        stack.len() < max_depth
    });
    stack
}
