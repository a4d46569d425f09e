use jtt808_codec::{Codec, CodecConfig};

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{codec_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let wire = parse_hex(&args.hex)?;
    let config = CodecConfig {
        strict_body_length: args.strict,
    };

    let message = Codec::with_config(config)
        .decode(&wire)
        .map_err(|err| codec_error("decode failed", err))?;
    print_message(&message, &wire, "-", format);

    Ok(SUCCESS)
}
