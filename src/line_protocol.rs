use crate::record::{Field, FieldValue, Record, Tag};
use log::trace;
use std::fmt::Write;
use std::time::Instant;

// Newlines and carriage returns are always written as `\n` and `\r` so a
// record never spans more than one line.
const MEASUREMENT_ESCAPES: &[char] = &['\\', ',', ' '];
const KEY_ESCAPES: &[char] = &['\\', ',', '=', ' '];
const STRING_ESCAPES: &[char] = &['\\', '"'];

#[tracing::instrument(skip_all, level = tracing::Level::TRACE)]
pub fn encode_batch(records: &[Record]) -> String {
    // Encodes records as newline-separated line protocol, without a trailing newline.

    let function_start = Instant::now();
    let mut output = String::with_capacity(records.len() * 64);
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        write_record(&mut output, record);
    }
    trace!(
        "encode_batch duration: {:?} ({} records, {} bytes)",
        function_start.elapsed(),
        records.len(),
        output.len()
    );
    output
}

pub fn encode_record(record: &Record) -> String {
    let mut output = String::new();
    write_record(&mut output, record);
    output
}

fn write_record(output: &mut String, record: &Record) {
    // name[,tag=value...] field=value[,field=value...][ timestamp]

    escape_into(output, &record.name, MEASUREMENT_ESCAPES);
    for tag in record.tags.iter() {
        output.push(',');
        write_tag(output, tag);
    }
    for (i, field) in record.fields.iter().enumerate() {
        output.push(if i == 0 { ' ' } else { ',' });
        write_field(output, field);
    }
    if let Some(timestamp) = record.timestamp.as_ref() {
        let _ = write!(output, " {}", record.precision.timestamp_value(timestamp));
    }
}

fn write_tag(output: &mut String, tag: &Tag) {
    escape_into(output, tag.key(), KEY_ESCAPES);
    output.push('=');
    escape_into(output, tag.value(), KEY_ESCAPES);
}

fn write_field(output: &mut String, field: &Field) {
    escape_into(output, field.key(), KEY_ESCAPES);
    output.push('=');
    write_field_value(output, field.value());
}

pub fn write_field_value(output: &mut String, value: &FieldValue) {
    match value {
        FieldValue::Boolean(v) => output.push_str(if *v { "true" } else { "false" }),
        FieldValue::Integer(v) => {
            let _ = write!(output, "{}i", v);
        }
        FieldValue::Float(v) => output.push_str(&format_float(*v)),
        FieldValue::String(v) => {
            output.push('"');
            escape_into(output, v, STRING_ESCAPES);
            output.push('"');
        }
    }
}

pub fn format_float(value: f64) -> String {
    // Display never switches to exponent form and always uses '.', so only
    // whole numbers need the decimal point added.

    let mut formatted = value.to_string();
    if !formatted.contains('.') {
        formatted.push_str(".0");
    }
    formatted
}

fn escape_into(output: &mut String, value: &str, reserved: &[char]) {
    for c in value.chars() {
        match c {
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            c if reserved.contains(&c) => {
                output.push('\\');
                output.push(c);
            }
            c => output.push(c),
        }
    }
}

#[cfg(test)]
pub mod tests;
