use super::Recording;
use anyhow::{anyhow, Context, Result};
use edf_reader::file_reader::SyncFileReader;
use edf_reader::sync_reader::SyncEDFReader;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Positional reads over one open EDF file.
struct EdfFile(File);

impl SyncFileReader for EdfFile {
    fn read(&self, offset: u64, length: u64) -> Result<Vec<u8>, std::io::Error> {
        let mut file = &self.0;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// One EDF channel (by index); the rate comes from the header.
pub fn read_edf_channel(path: &Path, channel: usize) -> Result<Recording> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = SyncEDFReader::init_with_file_reader(EdfFile(file))
        .with_context(|| format!("reading EDF header of {}", path.display()))?;
    let header = &reader.edf_header;
    let hdr_chan = header.channels.get(channel).ok_or_else(|| {
        anyhow!(
            "EDF file has {} channels; channel {} is out of range",
            header.channels.len(),
            channel
        )
    })?;
    // block_duration is in milliseconds
    let fs = hdr_chan.number_of_samples_in_data_record as f64 * 1000.0
        / header.block_duration as f64;
    let total_duration = header.block_duration * header.number_of_blocks;
    let mut data = reader.read_data_window(0, total_duration)?;
    if channel >= data.len() {
        return Err(anyhow!("missing data for channel {}", channel));
    }
    let samples = data
        .swap_remove(channel)
        .into_iter()
        .map(f64::from)
        .collect();
    Ok(Recording {
        samples,
        fs: Some(fs),
    })
}
