use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use jtt808_codec::{Codec, CodecConfig, Message, RESULT_FAILURE, RESULT_SUCCESS};
use jtt808_frame::{FrameConfig, FrameError, FrameReader, FrameWriter};
use tracing::{debug, info, warn};

use crate::cmd::{parse_duration, ServeArgs};
use crate::exit::{io_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_message, OutputFormat};

const ACCEPT_POLL: Duration = Duration::from_millis(50);

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let frame_config = FrameConfig {
        max_frame_size: args.max_frame_size,
        read_timeout: args.idle_timeout.as_deref().map(parse_duration).transpose()?,
        write_timeout: None,
    };
    let codec = Arc::new(Codec::with_config(CodecConfig {
        strict_body_length: args.strict,
    }));

    let listener =
        TcpListener::bind(&args.addr).map_err(|err| io_error("bind failed", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| io_error("listener setup failed", err))?;
    let local = listener
        .local_addr()
        .map_err(|err| io_error("listener setup failed", err))?;
    info!(addr = %local, "listening");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                let codec = codec.clone();
                let config = frame_config.clone();
                thread::spawn(move || serve_connection(stream, peer, &codec, config, format));
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(io_error("accept failed", err)),
        }
    }

    info!("shutting down");
    Ok(SUCCESS)
}

fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    codec: &Codec,
    config: FrameConfig,
    format: OutputFormat,
) {
    info!(%peer, "connection accepted");
    match handle_connection(stream, peer, codec, config, format) {
        Ok(()) | Err(FrameError::ConnectionClosed) => info!(%peer, "connection closed"),
        Err(err) => warn!(%peer, error = %err, "connection dropped"),
    }
}

fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    codec: &Codec,
    config: FrameConfig,
    format: OutputFormat,
) -> jtt808_frame::Result<()> {
    // Accepted sockets may inherit the listener's non-blocking mode.
    stream.set_nonblocking(false)?;
    let mut writer = FrameWriter::with_config_tcp(stream.try_clone()?, config.clone())?;
    let mut reader = FrameReader::with_config_tcp(stream, config)?;
    let peer_label = peer.to_string();
    let mut serial: u16 = 0;

    loop {
        let wire = reader.read_frame()?;
        debug!(%peer, frame = %hex::encode(&wire), "frame received");

        let ack = match codec.decode_traced(&wire) {
            Ok(message) => {
                print_message(&message, &wire, &peer_label, format);
                Message::server_ack(Some(&message.header), serial, RESULT_SUCCESS)
            }
            Err(failure) => {
                warn!(
                    %peer,
                    message_id = failure.header.as_ref().map(|h| h.message_id),
                    serial = failure.header.as_ref().map(|h| h.serial_num),
                    error = %failure.error,
                    "decode failed"
                );
                Message::server_ack(failure.header.as_ref(), serial, RESULT_FAILURE)
            }
        };

        match codec.encode(&ack) {
            Ok(frame) => writer.send_raw(&frame)?,
            Err(err) => warn!(%peer, error = %err, "acknowledgement encode failed"),
        }
        serial = serial.wrapping_add(1);
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
