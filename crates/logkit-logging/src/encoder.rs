//! Base record encoders
//!
//! [`RecordHandler`] is the seam between the enriching [`LogHandler`](crate::LogHandler)
//! and the final encoding. Two implementations exist, selected once at
//! construction by [`LogFormat`]:
//!
//! - [`TextHandler`]: `time=... level=INFO source=app::db:42 msg="..." k=v`
//! - [`JsonHandler`]: one JSON object per line, keys in emission order

use std::io::Write;

use logkit_core_types::schema::{FIELD_LEVEL, FIELD_MESSAGE, FIELD_SOURCE, FIELD_TIME};
use logkit_errors::LogError;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriter};

use crate::options::{HandlerOptions, LogFormat};
use crate::record::{Record, Value};

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// Encodes a record and writes it out
pub trait RecordHandler: Send + Sync {
    fn handle(&self, record: &Record) -> Result<(), LogError>;
}

/// Select the encoder for `format`
pub(crate) fn for_format(
    format: LogFormat,
    writer: BoxMakeWriter,
    options: HandlerOptions,
) -> Box<dyn RecordHandler> {
    match format {
        LogFormat::Text => Box::new(TextHandler::new(writer, options)),
        LogFormat::Json => Box::new(JsonHandler::new(writer, options)),
    }
}

/// Top-level entries of a record after the replace hook ran
fn entries(record: &Record, options: &HandlerOptions) -> Vec<(String, Value)> {
    let mut out = Vec::with_capacity(record.fields().len() + 4);
    out.push((
        FIELD_TIME.to_string(),
        Value::Str(record.time.format(TIME_FORMAT).to_string()),
    ));
    out.push((
        FIELD_LEVEL.to_string(),
        Value::Str(record.level.as_str().to_string()),
    ));
    if options.add_source {
        if let Some(source) = &record.source {
            out.push((FIELD_SOURCE.to_string(), Value::Str(source.to_string())));
        }
    }
    out.push((FIELD_MESSAGE.to_string(), Value::Str(record.message.clone())));
    out.extend(record.fields().iter().cloned());

    match &options.replace_field {
        Some(replace) => out
            .into_iter()
            .filter_map(|(key, value)| replace(&key, value).map(|value| (key, value)))
            .collect(),
        None => out,
    }
}

fn write_out(writer: &BoxMakeWriter, buf: &[u8]) -> Result<(), LogError> {
    let mut w = writer.make_writer();
    w.write_all(buf)?;
    w.flush()?;
    Ok(())
}

pub struct TextHandler {
    writer: BoxMakeWriter,
    options: HandlerOptions,
}

impl TextHandler {
    pub fn new(writer: BoxMakeWriter, options: HandlerOptions) -> Self {
        Self { writer, options }
    }
}

fn needs_quoting(s: &str) -> bool {
    s.is_empty()
        || s
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '=' || c == '"')
}

fn text_value(value: &Value) -> String {
    let rendered = value.to_string();
    if needs_quoting(&rendered) {
        format!("{:?}", rendered)
    } else {
        rendered
    }
}

impl RecordHandler for TextHandler {
    fn handle(&self, record: &Record) -> Result<(), LogError> {
        let line = entries(record, &self.options)
            .iter()
            .map(|(key, value)| format!("{}={}", key, text_value(value)))
            .collect::<Vec<_>>()
            .join(" ");
        let mut buf = line.into_bytes();
        buf.push(b'\n');
        write_out(&self.writer, &buf)
    }
}

pub struct JsonHandler {
    writer: BoxMakeWriter,
    options: HandlerOptions,
}

impl JsonHandler {
    pub fn new(writer: BoxMakeWriter, options: HandlerOptions) -> Self {
        Self { writer, options }
    }
}

impl RecordHandler for JsonHandler {
    fn handle(&self, record: &Record) -> Result<(), LogError> {
        let object: serde_json::Map<String, serde_json::Value> = entries(record, &self.options)
            .into_iter()
            .map(|(key, value)| (key, value.to_json()))
            .collect();
        let mut buf = serde_json::to_vec(&object)?;
        buf.push(b'\n');
        write_out(&self.writer, &buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Source;
    use crate::test_capture::CaptureWriter;
    use chrono::{Local, TimeZone};
    use tracing::Level;

    fn sample() -> Record {
        Record::new(Level::WARN, "disk almost full")
            .with_time(Local.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap())
            .with_source(Source {
                function: "app::disk".to_string(),
                file: None,
                line: 7,
            })
            .with_field("mount", "/var")
            .with_field("pct", 93u64)
    }

    #[test]
    fn test_text_encoding() {
        let capture = CaptureWriter::new();
        let handler = TextHandler::new(
            BoxMakeWriter::new(capture.clone()),
            HandlerOptions::default(),
        );
        handler.handle(&sample()).unwrap();

        let line = capture.contents();
        assert!(line.starts_with("time=2026-10-19T08:30:00.000"));
        assert!(line.ends_with(
            "level=WARN source=app::disk:7 msg=\"disk almost full\" mount=/var pct=93\n"
        ));
    }

    #[test]
    fn test_json_encoding_keeps_key_order() {
        let capture = CaptureWriter::new();
        let handler = JsonHandler::new(
            BoxMakeWriter::new(capture.clone()),
            HandlerOptions::default(),
        );
        handler.handle(&sample()).unwrap();

        let value: serde_json::Value = serde_json::from_str(capture.contents().trim_end()).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["time", "level", "source", "msg", "mount", "pct"]);
        assert_eq!(value["pct"], serde_json::json!(93));
        assert_eq!(value["source"], serde_json::json!("app::disk:7"));
    }

    #[test]
    fn test_add_source_false_omits_source() {
        let capture = CaptureWriter::new();
        let options = HandlerOptions {
            add_source: false,
            replace_field: None,
        };
        let handler = TextHandler::new(BoxMakeWriter::new(capture.clone()), options);
        handler.handle(&sample()).unwrap();
        assert!(!capture.contents().contains("source="));
    }

    #[test]
    fn test_replace_field_can_drop_and_rewrite() {
        let capture = CaptureWriter::new();
        let options = HandlerOptions::default().with_replace_field(|key, value| match key {
            "time" => None,
            "mount" => Some(Value::Str("<redacted>".to_string())),
            _ => Some(value),
        });
        let handler = TextHandler::new(BoxMakeWriter::new(capture.clone()), options);
        handler.handle(&sample()).unwrap();
        assert_eq!(
            capture.contents(),
            "level=WARN source=app::disk:7 msg=\"disk almost full\" mount=<redacted> pct=93\n"
        );
    }

    #[test]
    fn test_text_quotes_values_with_equals_and_quotes() {
        assert_eq!(text_value(&Value::from("a=b")), "\"a=b\"");
        assert_eq!(text_value(&Value::from("say \"hi\"")), "\"say \\\"hi\\\"\"");
        assert_eq!(text_value(&Value::from("")), "\"\"");
        assert_eq!(text_value(&Value::from("plain")), "plain");
    }
}
