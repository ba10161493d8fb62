//! Record parser
//!
//! Turns the CSV input into an ordered list of [`ProvisionRequest`]s. The
//! first structural problem aborts the whole parse: a batch never starts
//! with only part of its records.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use crate::domain::request::{NetworkSettings, ProvisionRequest, RecordField};
use crate::error::ParseError;

/// Parse the records in the file at `path`
pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<ProvisionRequest>, ParseError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ParseError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let requests = parse_requests(file)?;
    debug!(path = %path.display(), records = requests.len(), "Parsed input file");
    Ok(requests)
}

/// Parse headerless, comma-separated records from `reader`
pub fn parse_requests<R: Read>(reader: R) -> Result<Vec<ProvisionRequest>, ParseError> {
    // Field counts are checked per record so the error can name the record.
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut requests = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record_number = index + 1;
        let record = result.map_err(|source| ParseError::Read {
            record: record_number,
            line: source.position().map(|p| p.line()).unwrap_or(0),
            source,
        })?;
        requests.push(parse_record(&record, record_number)?);
    }

    Ok(requests)
}

fn parse_record(
    record: &StringRecord,
    record_number: usize,
) -> Result<ProvisionRequest, ParseError> {
    let line = record
        .position()
        .map(|p| p.line())
        .unwrap_or(record_number as u64);

    if record.len() != RecordField::COUNT {
        return Err(ParseError::FieldCount {
            record: record_number,
            line,
            expected: RecordField::COUNT,
            found: record.len(),
        });
    }

    let text = |field: RecordField| record[field.index()].to_string();

    Ok(ProvisionRequest {
        name: text(RecordField::Name),
        template: text(RecordField::Template),
        cluster: text(RecordField::Cluster),
        class: text(RecordField::Class),
        network: NetworkSettings {
            nic: text(RecordField::Nic),
            ip: text(RecordField::Ip),
            gateway: text(RecordField::Gateway),
            mask: text(RecordField::Mask),
            dns: [
                text(RecordField::Dns),
                text(RecordField::Dns1),
                text(RecordField::Dns2),
            ],
        },
        cpu_cores: parse_integer(record, RecordField::CpuCores, record_number, line)?,
        cpu_sockets: parse_integer(record, RecordField::CpuSockets, record_number, line)?,
        memory_bytes: parse_integer(record, RecordField::Memory, record_number, line)?,
        memory_guaranteed_bytes: parse_integer(
            record,
            RecordField::MemoryGuaranteed,
            record_number,
            line,
        )?,
        disk_size_bytes: parse_integer(record, RecordField::Size, record_number, line)?,
    })
}

fn parse_integer<T>(
    record: &StringRecord,
    field: RecordField,
    record_number: usize,
    line: u64,
) -> Result<T, ParseError>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    let value = &record[field.index()];
    value.parse::<T>().map_err(|source| ParseError::InvalidInteger {
        record: record_number,
        line,
        field,
        value: value.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const WEB01: &str = "web01,rhel9,prod,gold,eth0,10.0.0.11,10.0.0.1,255.255.255.0,10.0.0.2,10.0.0.3,10.0.0.4,2,1,4294967296,2147483648,21474836480";
    const DB01: &str = "db01,rhel9,prod,silver,eth1,10.0.0.12,10.0.0.1,255.255.255.0,10.0.0.2,10.0.0.3,10.0.0.4,4,2,8589934592,8589934592,107374182400";

    #[test]
    fn test_parses_full_record() {
        let requests = parse_requests(WEB01.as_bytes()).unwrap();

        assert_eq!(
            requests,
            vec![ProvisionRequest {
                name: "web01".to_string(),
                template: "rhel9".to_string(),
                cluster: "prod".to_string(),
                class: "gold".to_string(),
                network: NetworkSettings {
                    nic: "eth0".to_string(),
                    ip: "10.0.0.11".to_string(),
                    gateway: "10.0.0.1".to_string(),
                    mask: "255.255.255.0".to_string(),
                    dns: [
                        "10.0.0.2".to_string(),
                        "10.0.0.3".to_string(),
                        "10.0.0.4".to_string(),
                    ],
                },
                cpu_cores: 2,
                cpu_sockets: 1,
                memory_bytes: 4_294_967_296,
                memory_guaranteed_bytes: 2_147_483_648,
                disk_size_bytes: 21_474_836_480,
            }]
        );
    }

    #[test]
    fn test_preserves_input_order() {
        let input = format!("{}\n{}\n", DB01, WEB01);
        let names: Vec<_> = parse_requests(input.as_bytes())
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["db01".to_string(), "web01".to_string()]);
    }

    #[test]
    fn test_empty_input_yields_no_requests() {
        assert!(parse_requests("".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_short_record_cites_its_number() {
        // Second record drops the disk size column.
        let short = DB01.rsplit_once(',').unwrap().0;
        let input = format!("{}\n{}\n", WEB01, short);

        match parse_requests(input.as_bytes()) {
            Err(ParseError::FieldCount {
                record,
                line,
                expected,
                found,
            }) => {
                assert_eq!(record, 2);
                assert_eq!(line, 2);
                assert_eq!(expected, 16);
                assert_eq!(found, 15);
            }
            other => panic!("Expected FieldCount error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_cpu_cores() {
        let bad = WEB01.replace(",2,1,", ",two,1,");

        match parse_requests(bad.as_bytes()) {
            Err(ParseError::InvalidInteger {
                record,
                field,
                value,
                ..
            }) => {
                assert_eq!(record, 1);
                assert_eq!(field, RecordField::CpuCores);
                assert_eq!(value, "two");
            }
            other => panic!("Expected InvalidInteger error, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_size_is_rejected() {
        let bad = WEB01.replace(",21474836480", ",-1");
        let err = parse_requests(bad.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidInteger {
                field: RecordField::Size,
                ..
            }
        ));
    }

    #[test]
    fn test_later_bad_record_discards_earlier_ones() {
        let bad = DB01.replace(",8589934592,8589934592,", ",8589934592,lots,");
        let input = format!("{}\n{}\n", WEB01, bad);
        let err = parse_requests(input.as_bytes()).unwrap_err();
        assert_eq!(err.record(), Some(2));
        assert!(err.to_string().contains("memoryGuaranteed"));
    }

    #[test]
    fn test_parse_file_reads_from_disk() {
        let path = std::env::temp_dir().join(format!("vmbatch-parser-{}.csv", std::process::id()));
        {
            let mut file = File::create(&path).unwrap();
            writeln!(file, "{}", WEB01).unwrap();
            writeln!(file, "{}", DB01).unwrap();
        }

        let requests = parse_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].cpu_sockets, 2);
    }

    #[test]
    fn test_parse_file_missing() {
        let err = parse_file("/nonexistent/vmbatch/input.csv").unwrap_err();
        assert!(matches!(err, ParseError::Open { .. }));
    }
}
