/// One execution-trace event as emitted by an instrumented client.
///
/// Exists only in flight: deserialized from a wire message, handed to the
/// store for normalization, then discarded. The persisted representation is
/// the normalized relational form, never this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    /// Process id of the emitting client.
    pub pid: u32,
    /// Thread id within the emitting process.
    pub tid: u32,
    /// Client-supplied epoch timestamp; stored verbatim, never interpreted.
    pub timestamp: u64,
    /// Verbosity level of the tracepoint that fired.
    pub verbosity: u32,
    /// Entry type discriminator (wire field `type`).
    pub kind: u32,
    /// Source file path of the call site.
    pub path: String,
    /// Source line of the call site.
    pub lineno: u32,
    /// Function containing the call site.
    pub function: String,
    /// Free-form message text.
    pub message: String,
}
