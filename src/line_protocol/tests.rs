use super::{encode_batch, encode_record, format_float};
use crate::record::{Field, FieldValue, Precision, Record, Tag};
use anyhow::{anyhow, Error};
use chrono::{TimeZone, Utc};
use influxdb_line_protocol::{self, parse_lines, ParsedLine};

// A parsed line reduced to plain values so it can be compared with what was encoded.
#[derive(Debug, PartialEq)]
struct ParsedPoint {
    name: String,
    tags: Vec<(String, String)>,
    fields: Vec<(String, FieldValue)>,
    timestamp: Option<i64>,
}

fn parsed_line_to_point(parsed_line: ParsedLine) -> ParsedPoint {
    // Converts an influxdb_line_protocol ParsedLine back into plain values.

    let mut tags: Vec<(String, String)> = Vec::new();
    if let Some(tag_set) = parsed_line.series.tag_set.as_ref() {
        for (tag_key, tag_value) in tag_set {
            tags.push((tag_key.to_string(), tag_value.to_string()));
        }
    }

    let mut fields: Vec<(String, FieldValue)> = Vec::new();
    for (field_key, field_value) in parsed_line.field_set.as_ref() {
        let value = match field_value {
            influxdb_line_protocol::FieldValue::I64(v) => FieldValue::Integer(*v),
            influxdb_line_protocol::FieldValue::U64(v) => FieldValue::Integer(*v as i64),
            influxdb_line_protocol::FieldValue::F64(v) => FieldValue::Float(*v),
            influxdb_line_protocol::FieldValue::String(v) => FieldValue::String(v.to_string()),
            influxdb_line_protocol::FieldValue::Boolean(v) => FieldValue::Boolean(*v),
        };
        fields.push((field_key.to_string(), value));
    }

    ParsedPoint {
        name: parsed_line.series.measurement.to_string(),
        tags,
        fields,
        timestamp: parsed_line.timestamp,
    }
}

fn parse_back(line_protocol: &str) -> Result<Vec<ParsedPoint>, Error> {
    let mut points = Vec::new();
    for line_result in parse_lines(line_protocol) {
        match line_result {
            Ok(line) => points.push(parsed_line_to_point(line)),
            Err(error) => return Err(anyhow!("Failed to parse line: {}", error)),
        }
    }
    Ok(points)
}

fn reading(fields: Vec<Field>) -> Record {
    Record::new("readings", vec![], fields, None, Precision::Seconds)
}

#[test]
fn test_encode_integer_field() -> Result<(), Error> {
    // Integers carry the i suffix and no decimal point.
    let record = reading(vec![Field::new("incline", 125i64)?]);

    assert_eq!(encode_record(&record), "readings incline=125i");
    let points = parse_back(&encode_record(&record))?;
    assert_eq!(points[0].fields, vec![("incline".to_string(), FieldValue::Integer(125))]);
    Ok(())
}

#[test]
fn test_encode_float_field() -> Result<(), Error> {
    // Floats always contain a decimal point, including whole values.
    let record = reading(vec![
        Field::new("incline", 125.0)?,
        Field::new("grade", 0.25)?,
        Field::new("tiny", 0.0000001)?,
        Field::new("huge", 1e21)?,
        Field::new("negative", -3.5)?,
    ]);

    assert_eq!(
        encode_record(&record),
        "readings incline=125.0,grade=0.25,tiny=0.0000001,huge=1000000000000000000000.0,negative=-3.5"
    );
    let points = parse_back(&encode_record(&record))?;
    assert_eq!(points[0].fields[0].1, FieldValue::Float(125.0));
    assert_eq!(points[0].fields[3].1, FieldValue::Float(1e21));
    Ok(())
}

#[test]
fn test_encode_boolean_field() -> Result<(), Error> {
    let record = reading(vec![Field::new("up", true)?, Field::new("down", false)?]);

    assert_eq!(encode_record(&record), "readings up=true,down=false");
    Ok(())
}

#[test]
fn test_encode_string_field_escaping() -> Result<(), Error> {
    // String values are quoted, with quotes and backslashes escaped.
    let record = reading(vec![Field::new("message", r#"said "hi" at C:\tmp"#)?]);

    assert_eq!(
        encode_record(&record),
        r#"readings message="said \"hi\" at C:\\tmp""#
    );
    let points = parse_back(&encode_record(&record))?;
    assert_eq!(
        points[0].fields[0].1,
        FieldValue::String(r#"said "hi" at C:\tmp"#.to_string())
    );
    Ok(())
}

#[test]
fn test_encode_escapes_names_and_tags() -> Result<(), Error> {
    // Spaces and commas in names, plus '=' in keys and tag values, are escaped.
    let record = Record::new(
        "cpu load,total",
        vec![Tag::new("data center", "us east,1")?, Tag::new("a=b", "c=d")?],
        vec![Field::new("value key", 1i64)?],
        None,
        Precision::Seconds,
    );

    assert_eq!(
        encode_record(&record),
        r"cpu\ load\,total,data\ center=us\ east\,1,a\=b=c\=d value\ key=1i"
    );
    let points = parse_back(&encode_record(&record))?;
    assert_eq!(points[0].name, "cpu load,total");
    assert_eq!(
        points[0].tags,
        vec![
            ("data center".to_string(), "us east,1".to_string()),
            ("a=b".to_string(), "c=d".to_string()),
        ]
    );
    assert_eq!(points[0].fields[0].0, "value key");
    Ok(())
}

#[test]
fn test_encode_preserves_insertion_order() -> Result<(), Error> {
    // Tags and fields keep the order they were added in, they are not sorted.
    let record = Record::new(
        "readings",
        vec![Tag::new("zone", "b")?, Tag::new("area", "a")?],
        vec![Field::new("z", 1i64)?, Field::new("a", 2i64)?],
        None,
        Precision::Seconds,
    );

    assert_eq!(encode_record(&record), "readings,zone=b,area=a z=1i,a=2i");
    Ok(())
}

#[test]
fn test_encode_without_timestamp_has_no_trailing_token() -> Result<(), Error> {
    let record = reading(vec![Field::new("value", 1.5)?]);
    let encoded = encode_record(&record);

    assert!(!encoded.ends_with(' '));
    assert_eq!(encoded.split(' ').count(), 2);
    assert_eq!(parse_back(&encoded)?[0].timestamp, None);
    Ok(())
}

#[test]
fn test_encode_timestamp_for_each_precision() -> Result<(), Error> {
    // 2020-01-01T00:00:00.123456789Z rendered in every unit.
    let timestamp = Utc.timestamp_opt(1577836800, 123_456_789).unwrap();
    let expected = [
        (Precision::Nanoseconds, "1577836800123456789"),
        (Precision::Microseconds, "1577836800123456"),
        (Precision::Milliseconds, "1577836800123"),
        (Precision::Seconds, "1577836800"),
        (Precision::Minutes, "26297280"),
        (Precision::Hours, "438288"),
    ];

    for (precision, value) in expected {
        let record = Record::new(
            "readings",
            vec![],
            vec![Field::new("value", 1i64)?],
            Some(timestamp),
            precision,
        );
        assert_eq!(encode_record(&record), format!("readings value=1i {}", value));
    }
    Ok(())
}

#[test]
fn test_encode_batch_line_count() -> Result<(), Error> {
    // One line per record, no trailing newline.
    let records: Vec<Record> = (0..5)
        .map(|i| reading(vec![Field::new("value", i as i64).unwrap()]))
        .collect();
    let encoded = encode_batch(&records);

    assert_eq!(encoded.split('\n').count(), records.len());
    assert!(!encoded.ends_with('\n'));
    assert_eq!(parse_back(&encoded)?.len(), records.len());
    Ok(())
}

#[test]
fn test_encode_empty_batch() {
    assert_eq!(encode_batch(&[]), "");
}

#[test]
fn test_encode_gauge_scenario() -> Result<(), Error> {
    let record = Record::new(
        "memory",
        vec![Tag::new("env", "prod")?, Tag::new("host", "node1")?],
        vec![Field::new("value", 42.5)?],
        Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        Precision::Seconds,
    );

    assert_eq!(
        encode_record(&record),
        "memory,env=prod,host=node1 value=42.5 1704067200"
    );
    Ok(())
}

#[test]
fn test_tag_and_field_round_trip() -> Result<(), Error> {
    // Whatever key/value a tag or field accepts comes back unchanged from the parser.
    let samples = [
        "plain",
        "with space",
        "comma,here",
        "equals=sign",
        "ünïcödé",
        "a\\",
        "x\\y",
    ];
    for sample in samples {
        let record = Record::new(
            "readings",
            vec![Tag::new(sample, sample)?],
            vec![Field::new(sample, sample)?],
            None,
            Precision::Seconds,
        );
        let points = parse_back(&encode_record(&record))?;
        assert_eq!(points[0].tags, vec![(sample.to_string(), sample.to_string())]);
        assert_eq!(
            points[0].fields,
            vec![(sample.to_string(), FieldValue::String(sample.to_string()))]
        );
    }
    Ok(())
}

#[test]
fn test_encode_escapes_trailing_backslash() -> Result<(), Error> {
    // A trailing backslash must not escape the separator that follows it.
    let record = Record::new(
        "path\\",
        vec![Tag::new("dir", "C:\\")?],
        vec![Field::new("size\\", 1i64)?],
        None,
        Precision::Seconds,
    );

    assert_eq!(encode_record(&record), r"path\\,dir=C:\\ size\\=1i");
    let points = parse_back(&encode_record(&record))?;
    assert_eq!(points[0].name, "path\\");
    assert_eq!(points[0].tags, vec![("dir".to_string(), "C:\\".to_string())]);
    assert_eq!(points[0].fields[0].0, "size\\");
    Ok(())
}

#[test]
fn test_encode_newlines_stay_on_one_line() -> Result<(), Error> {
    // Multi-line text (e.g. an exception in a health message) keeps one line per record.
    let records = vec![
        Record::new(
            "health_check",
            vec![Tag::new("check", "db\nprimary")?],
            vec![
                Field::new("healthy", false)?,
                Field::new("message", "connection lost\r\n  at pool.rs:10\n  at main.rs:3")?,
            ],
            None,
            Precision::Seconds,
        ),
        Record::new("multi\nline", vec![], vec![Field::new("value", 1i64)?], None, Precision::Seconds),
    ];
    let encoded = encode_batch(&records);

    assert_eq!(encoded.split('\n').count(), records.len());
    assert_eq!(
        encoded,
        r#"health_check,check=db\nprimary healthy=false,message="connection lost\r\n  at pool.rs:10\n  at main.rs:3"
multi\nline value=1i"#
    );
    Ok(())
}

#[test]
fn test_format_float_is_locale_invariant() {
    assert_eq!(format_float(1234567.5), "1234567.5");
    assert_eq!(format_float(-0.0), "-0.0");
    assert_eq!(format_float(3.0), "3.0");
}
