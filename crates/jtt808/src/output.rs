use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use jtt808_codec::{AdditionalInfo, Body, Message, Response};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    message_id: String,
    message_name: &'a str,
    peer: &'a str,
    frame_size: usize,
    timestamp: String,
    message: &'a Message,
}

pub fn print_message(message: &Message, wire: &[u8], peer: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                message_id: format!("{:#06x}", message.header.message_id),
                message_name: message.name(),
                peer,
                frame_size: wire.len(),
                timestamp: now_unix_seconds(),
                message,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => println!("{}", message_table(message, peer)),
        OutputFormat::Pretty => println!("{}", summary_line(message, peer)),
        OutputFormat::Raw => print_raw(wire),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn message_table(message: &Message, peer: &str) -> Table {
    let header = &message.header;
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["FIELD", "VALUE"]);

    table.add_row(vec!["peer".to_string(), peer.to_string()]);
    table.add_row(vec![
        "message".to_string(),
        format!("{:#06x} {}", header.message_id, message.name()),
    ]);
    table.add_row(vec!["phone".to_string(), header.phone.to_string()]);
    table.add_row(vec!["serial".to_string(), header.serial_num.to_string()]);
    table.add_row(vec![
        "body length".to_string(),
        header.attr.body_length.to_string(),
    ]);
    table.add_row(vec![
        "encryption".to_string(),
        format!("{:?}", header.attr.encryption),
    ]);
    if let Some(segment) = header.segment {
        table.add_row(vec![
            "segment".to_string(),
            format!("{}/{}", segment.segment_num, segment.total_segments),
        ]);
    }
    table.add_row(vec![
        "checksum".to_string(),
        format!("{:#04x}", message.checksum),
    ]);

    match &message.body {
        Body::LocationReport(report) => {
            let basic = &report.basic;
            table.add_row(vec![
                "position".to_string(),
                format!("{:.6}, {:.6}", basic.latitude, basic.longitude),
            ]);
            table.add_row(vec!["altitude".to_string(), format!("{} m", basic.altitude)]);
            table.add_row(vec![
                "speed".to_string(),
                format!("{:.1} km/h", basic.speed_kmh()),
            ]);
            table.add_row(vec!["direction".to_string(), basic.direction.to_string()]);
            table.add_row(vec!["time".to_string(), basic.timestamp.to_rfc3339()]);
            table.add_row(vec![
                "alert / state".to_string(),
                format!("{:#010x} / {:#010x}", basic.alert_flags, basic.state_flags),
            ]);
            for info in &report.additional {
                table.add_row(vec![
                    format!("info {:#04x}", info.id()),
                    describe_info(info),
                ]);
            }
        }
        body => {
            table.add_row(vec!["body".to_string(), body_summary(body)]);
        }
    }

    table
}

/// One line per message, in the spirit of a log line.
pub fn summary_line(message: &Message, peer: &str) -> String {
    format!(
        "{} ({:#06x}) phone={} serial={} peer={} {}",
        message.name(),
        message.header.message_id,
        message.header.phone,
        message.header.serial_num,
        peer,
        body_summary(&message.body)
    )
}

pub fn body_summary(body: &Body) -> String {
    match body {
        Body::ServerResponse(response) | Body::ClientResponse(response) => {
            response_summary(response)
        }
        Body::LocationReport(report) => format!(
            "lat={:.6} lon={:.6} speed={:.1} time={} info={}",
            report.basic.latitude,
            report.basic.longitude,
            report.basic.speed_kmh(),
            report.basic.timestamp.to_rfc3339(),
            report
                .additional
                .iter()
                .map(|info| format!("{:#04x}", info.id()))
                .collect::<Vec<_>>()
                .join(",")
        ),
        Body::Raw(raw) => format!("raw={}", hex::encode(&raw.data)),
    }
}

fn response_summary(response: &Response) -> String {
    format!(
        "answered={:#06x} serial={} result={}",
        response.message_id,
        response.serial_num,
        response.outcome()
    )
}

fn describe_info(info: &AdditionalInfo) -> String {
    match info {
        AdditionalInfo::Wifi(list) => list
            .access_points
            .iter()
            .map(|ap| format!("{} {}dBm", ap.mac_string(), ap.dbm()))
            .collect::<Vec<_>>()
            .join("\n"),
        AdditionalInfo::Battery(battery) => format!(
            "battery {:.0}% ext={}",
            battery.percentage(),
            battery.extension
        ),
        AdditionalInfo::Unknown(unknown) => {
            format!("{} bytes {}", unknown.length, hex::encode(&unknown.raw))
        }
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use jtt808_codec::{Header, RawBody, CLIENT_RESPONSE};

    use super::*;

    #[test]
    fn summary_names_message_and_result() {
        let message = Message::new(
            Header::new(CLIENT_RESPONSE, 19_161_017_001, 4),
            Body::ClientResponse(Response::failure(2, 0x8103)),
        );
        let line = summary_line(&message, "127.0.0.1:9");
        assert!(line.starts_with("CLIENT_RESPONSE (0x0001)"));
        assert!(line.contains("phone=19161017001"));
        assert!(line.contains("result=failure"));
    }

    #[test]
    fn raw_body_summary_is_hex() {
        let body = Body::Raw(RawBody::new(vec![0x7e, 0x00]));
        assert_eq!(body_summary(&body), "raw=7e00");
    }

    #[test]
    fn table_lists_header_fields() {
        let message = Message::new(
            Header::new(0x8001, 1, 1).with_segment(2, 1),
            Body::ServerResponse(Response::success(1, 2)),
        );
        let rendered = message_table(&message, "peer").to_string();
        assert!(rendered.contains("segment"));
        assert!(rendered.contains("1/2"));
        assert!(rendered.contains("SERVER_RESPONSE"));
    }
}
