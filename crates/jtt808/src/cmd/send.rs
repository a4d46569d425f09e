use std::net::TcpStream;
use std::thread;

use jtt808_codec::{Body, Codec, CodecError, Header, Message};
use jtt808_frame::{FrameConfig, FrameReader, FrameWriter};
use tracing::{info, warn};

use crate::cmd::{parse_duration, parse_hex, SendArgs};
use crate::exit::{codec_error, frame_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_message, OutputFormat};

/// Location report with a ten-entry wifi scan, captured from a terminal.
pub const SAMPLE_LOCATION_FRAME: &str = concat!(
    "7e02000149019161017001000000000000000040000158708c06c94a6e00000000000016101710275654470a",
    "ec26cad75fdec1dc9c9fcdf89cbb9c216ade77b2b8c83a354e4ab8b5388345ac2af4b31cfa6883aafcb3a429",
    "40641e5db1b0411d0abae2aef8dfa8f07d0140adec26ca1986e6adef7be60a0601cc000024900e6100000000",
    "ffaa00000000000001cc000024900e6d00000000ffae00000000000001cc00002490128600000000ffa30000",
    "0000000001cc000024900e6b00000000ffa100000000000001cc000024900ffd00000000ff9b000000000000",
    "01cc00002490114500000000ff9a000000000000fe65e602000162f2000c000151800100000000000000f300",
    "0102f400010ef5000100f900040000063520000a898602b513165013127007002e563a392e302e3030305432",
    "323b4353513a31342c302c312c312c302c322c302c302c313031383130303935312c303a7e",
);

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let interval = parse_duration(&args.interval)?;
    if args.count == 0 {
        return Err(CliError::new(USAGE, "--count must be greater than zero"));
    }

    let frame = parse_hex(args.hex.as_deref().unwrap_or(SAMPLE_LOCATION_FRAME))?;
    let codec = Codec::new();
    let request = match codec.decode(&frame) {
        Ok(message) => Some(message.header),
        Err(err) => {
            warn!(error = %err, "frame does not decode locally, sending as is");
            None
        }
    };
    let config = FrameConfig {
        read_timeout: Some(wait_timeout),
        write_timeout: Some(wait_timeout),
        ..FrameConfig::default()
    };

    let stream = TcpStream::connect(&args.addr).map_err(|err| io_error("connect failed", err))?;
    let write_half = stream
        .try_clone()
        .map_err(|err| io_error("connect failed", err))?;
    let mut writer = FrameWriter::with_config_tcp(write_half, config.clone())
        .map_err(|err| frame_error("connect failed", err))?;
    let mut reader = FrameReader::with_config_tcp(stream, config)
        .map_err(|err| frame_error("connect failed", err))?;
    info!(addr = %args.addr, "connected");

    for round in 0..args.count {
        if round > 0 {
            thread::sleep(interval);
        }

        writer
            .send_raw(&frame)
            .map_err(|err| frame_error("send failed", err))?;
        info!(round, size = frame.len(), "frame sent");

        let wire = reader
            .read_frame()
            .map_err(|err| frame_error("receive failed", err))?;
        match check_ack(&codec, &wire, request.as_ref()) {
            Ok(ack) => print_message(&ack, &wire, &args.addr, format),
            Err(err) => return Err(codec_error("acknowledgement invalid", err)),
        }
    }

    Ok(SUCCESS)
}

/// Decode an acknowledgement, warning when it answers a different message.
fn check_ack(codec: &Codec, wire: &[u8], request: Option<&Header>) -> Result<Message, CodecError> {
    let ack = codec.decode(wire)?;
    if let (Body::ServerResponse(response), Some(request)) = (&ack.body, request) {
        if response.message_id != request.message_id || response.serial_num != request.serial_num {
            warn!(
                answered_id = response.message_id,
                answered_serial = response.serial_num,
                "acknowledgement answers a different message"
            );
        }
    }
    Ok(ack)
}

#[cfg(test)]
mod tests {
    use jtt808_codec::{Response, LOCATION_REPORT};

    use super::*;

    #[test]
    fn sample_frame_decodes() {
        let frame = parse_hex(SAMPLE_LOCATION_FRAME).unwrap();
        let message = Codec::new().decode(&frame).unwrap();
        assert_eq!(message.header.message_id, LOCATION_REPORT);
    }

    #[test]
    fn check_ack_accepts_matching_response() {
        let codec = Codec::new();
        let request = Header::new(LOCATION_REPORT, 19_161_017_001, 0);
        let ack = Message::server_ack(Some(&request), 1, 0);
        let wire = codec.encode(&ack).unwrap();

        let decoded = check_ack(&codec, &wire, Some(&request)).unwrap();
        assert_eq!(
            decoded.body,
            Body::ServerResponse(Response::success(0, LOCATION_REPORT))
        );
    }

    #[test]
    fn check_ack_without_request() {
        let codec = Codec::new();
        let wire = codec.encode(&Message::server_ack(None, 1, 1)).unwrap();
        assert!(check_ack(&codec, &wire, None).is_ok());
        assert!(check_ack(&codec, &wire[..wire.len() - 2], None).is_err());
    }
}
