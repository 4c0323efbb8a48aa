use std::borrow::Cow;
use std::collections::HashMap;

/// Completion status of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error,
}

impl SpanStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SpanStatus::Unset => "unset",
            SpanStatus::Ok => "ok",
            SpanStatus::Error => "error",
        }
    }
}

/// One timed, named operation within a trace.
///
/// Attribute values are kept as the strings they arrived as; comparisons
/// coerce them on demand.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Span {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub operation_name: String,
    pub service_name: String,
    pub status: SpanStatus,
    pub start_time_unix_nano: u64,
    pub end_time_unix_nano: u64,
    pub attributes: HashMap<String, String>,
}

impl Span {
    #[must_use]
    pub fn new(operation_name: &str) -> Self {
        Self {
            operation_name: operation_name.to_owned(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_service(mut self, service_name: &str) -> Self {
        self.service_name = service_name.to_owned();
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: SpanStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_ids(mut self, trace_id: &str, span_id: &str, parent: Option<&str>) -> Self {
        self.trace_id = trace_id.to_owned();
        self.span_id = span_id.to_owned();
        self.parent_span_id = parent.map(str::to_owned);
        self
    }

    #[must_use]
    pub fn with_timing(mut self, start_unix_nano: u64, end_unix_nano: u64) -> Self {
        self.start_time_unix_nano = start_unix_nano;
        self.end_time_unix_nano = end_unix_nano;
        self
    }

    /// Set an attribute. Non-string values are stored in their display form.
    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: impl ToString) -> Self {
        self.attributes.insert(key.to_owned(), value.to_string());
        self
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Value of `name` as seen by `where` filters: the attribute map first,
    /// then the span's own fields (`operation_name`, `service_name`,
    /// `status` and `duration` in nanoseconds, with camelCase aliases).
    /// An empty service name counts as absent.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        if let Some(value) = self.attributes.get(name) {
            return Some(Cow::Borrowed(value));
        }
        match name {
            "operation_name" | "operationName" => Some(Cow::Borrowed(&self.operation_name)),
            "service_name" | "serviceName" if !self.service_name.is_empty() => {
                Some(Cow::Borrowed(&self.service_name))
            }
            "status" => Some(Cow::Borrowed(self.status.as_str())),
            "duration" => Some(Cow::Owned(self.duration_nanos().to_string())),
            _ => None,
        }
    }

    /// Duration in nanoseconds, zero when the timestamps are unset or reversed.
    #[must_use]
    pub fn duration_nanos(&self) -> u64 {
        self.end_time_unix_nano
            .saturating_sub(self.start_time_unix_nano)
    }
}

/// The spans of one distributed request. Order carries no meaning for
/// evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Trace {
    spans: Vec<Span>,
}

impl Trace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.spans.push(span);
        self
    }

    pub fn push(&mut self, span: Span) {
        self.spans.push(span);
    }

    #[must_use]
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Spans whose operation name is exactly `operation`.
    pub fn spans_named<'a>(&'a self, operation: &'a str) -> impl Iterator<Item = &'a Span> + 'a {
        self.spans
            .iter()
            .filter(move |s| s.operation_name == operation)
    }

    #[must_use]
    pub fn count(&self, operation: &str) -> usize {
        self.spans_named(operation).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

impl From<Vec<Span>> for Trace {
    fn from(spans: Vec<Span>) -> Self {
        Self { spans }
    }
}

impl FromIterator<Span> for Trace {
    fn from_iter<I: IntoIterator<Item = Span>>(iter: I) -> Self {
        Self {
            spans: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a Span;
    type IntoIter = std::slice::Iter<'a, Span>;

    fn into_iter(self) -> Self::IntoIter {
        self.spans.iter()
    }
}
