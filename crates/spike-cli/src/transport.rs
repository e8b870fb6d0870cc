use anyhow::Result;
use log::{debug, info};
use spike_lib::{request::handle_str, SpikeDetectorConfig};
use std::io::{BufRead, Write};

/// Answer newline-delimited JSON requests until EOF, one response line each.
/// Returns the number of requests answered.
pub fn serve<R: BufRead, W: Write>(
    mut reader: R,
    writer: &mut W,
    base: &SpikeDetectorConfig,
) -> Result<usize> {
    info!("Listening for detection requests on stdin/stdout");
    let mut answered = 0;
    loop {
        let mut line = String::new();
        let bytes = reader.read_line(&mut line)?;
        if bytes == 0 {
            info!("EOF reached after {} request(s)", answered);
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let response = handle_str(line.trim(), base);
        debug!("request {} answered ({} bytes)", answered + 1, response.len());
        writer.write_all(response.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        answered += 1;
    }
    Ok(answered)
}
