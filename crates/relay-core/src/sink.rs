//! [`RecordSink`] that writes one JSON object per line.

use std::io::Write;

use relay_types::{EmittedRecord, RecordSink, SinkError};
use serde::Serialize;

#[derive(Serialize)]
struct Line {
    attributes: std::collections::BTreeMap<&'static str, String>,
    body: serde_json::Value,
}

/// Writes each record as `{"attributes": {...}, "body": <event>}` followed by
/// a newline, flushing after every record.
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn emit(&mut self, record: &EmittedRecord) -> Result<(), SinkError> {
        let body: serde_json::Value = serde_json::from_str(&record.body)
            .map_err(|e| SinkError::Backend(format!("record body is not JSON: {e}")))?;
        let line = Line {
            attributes: record.attributes(),
            body,
        };
        serde_json::to_writer(&mut self.writer, &line).map_err(std::io::Error::from)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::EventKind;

    #[test]
    fn writes_one_line_per_record() {
        let mut sink = JsonLinesSink::new(Vec::new());
        for path in ["/logs/a", "/logs/b"] {
            sink.emit(&EmittedRecord {
                event_type: EventKind::Create,
                event_path: path.to_string(),
                body: format!(r#"{{"eventType":"CREATE","path":"{path}"}}"#),
            })
            .expect("emit");
        }

        let output = String::from_utf8(sink.into_inner()).expect("utf-8");
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).expect("line is json"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["attributes"]["event-type"], "CREATE");
        assert_eq!(lines[0]["attributes"]["content-type"], "application/json");
        assert_eq!(lines[1]["attributes"]["event-path"], "/logs/b");
        assert_eq!(lines[1]["body"]["path"], "/logs/b");
    }

    #[test]
    fn rejects_non_json_body() {
        let mut sink = JsonLinesSink::new(Vec::new());
        let err = sink
            .emit(&EmittedRecord {
                event_type: EventKind::Close,
                event_path: "/x".to_string(),
                body: "not json".to_string(),
            })
            .expect_err("body must be json");
        assert!(matches!(err, SinkError::Backend(_)));
    }
}
