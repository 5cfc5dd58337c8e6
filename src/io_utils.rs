//! I/O utilities for CSV reading, writing, encoding, and delimiter resolution.
//!
//! - **Delimiter resolution**: extension-based auto-detection (`.csv` → comma,
//!   `.tsv` → tab) with manual override support.
//! - **Encoding**: input decoding and output transcoding via `encoding_rs`,
//!   defaulting to UTF-8. Input decoding can be made lossy for exports that
//!   carry stray bytes.
//! - **stdin/stdout**: the `-` path convention routes through standard streams.
//! - **Headers**: readers never consume the header themselves; the pipeline
//!   receives it as the first record.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn resolve_output_delimiter(path: Option<&Path>, provided: Option<u8>, fallback: u8) -> u8 {
    if let Some(delim) = provided {
        return delim;
    }
    if let Some(path) = path {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => return DEFAULT_TSV_DELIMITER,
            Some(ext) if ext.eq_ignore_ascii_case("csv") => return DEFAULT_CSV_DELIMITER,
            _ => {}
        }
    }
    fallback
}

/// Ragged rows are let through so the pipeline can drop them one by one.
pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(path: &Path, delimiter: u8) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    Ok(open_csv_reader(reader, delimiter))
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(io::stdout()),
    })
}

pub fn open_csv_sink(
    path: Option<&Path>,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<CsvSink<Box<dyn Write>>> {
    Ok(CsvSink::new(open_output(path)?, delimiter, encoding))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

/// Decodes invalid sequences to U+FFFD instead of failing.
pub fn decode_bytes_lossy(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

pub fn decode_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
    lossy: bool,
) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| {
            if lossy {
                Ok(decode_bytes_lossy(field, encoding))
            } else {
                decode_bytes(field, encoding)
            }
        })
        .collect()
}

/// Writes CSV records one at a time, transcoding each from UTF-8 when needed.
pub struct CsvSink<W: Write> {
    inner: W,
    delimiter: u8,
    encoding: &'static Encoding,
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W, delimiter: u8, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            delimiter,
            encoding,
        }
    }

    pub fn write_record(&mut self, record: &[String]) -> Result<()> {
        let bytes = self.render(record)?;
        if self.encoding == UTF_8 {
            self.inner.write_all(&bytes)?;
            return Ok(());
        }
        let text = String::from_utf8(bytes).context("Rendered record is not valid UTF-8")?;
        let (encoded, _, had_errors) = self.encoding.encode(&text);
        if had_errors {
            return Err(anyhow!(
                "Failed to encode text using {}",
                self.encoding.name()
            ));
        }
        self.inner.write_all(encoded.as_ref())?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().context("Flushing output")
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn render(&self, record: &[String]) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote_style(QuoteStyle::Necessary)
            .double_quote(true)
            .from_writer(Vec::new());
        writer.write_record(record)?;
        writer
            .into_inner()
            .map_err(|err| anyhow!("Buffering output record: {}", err.error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;

    #[test]
    fn delimiters_follow_extension_unless_overridden() {
        assert_eq!(resolve_input_delimiter(Path::new("trials.tsv"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("trials.csv"), None), b',');
        assert_eq!(resolve_input_delimiter(Path::new("trials.tsv"), Some(b';')), b';');
        assert_eq!(
            resolve_output_delimiter(Some(Path::new("out.tsv")), None, b','),
            b'\t'
        );
        assert_eq!(resolve_output_delimiter(None, None, b'|'), b'|');
    }

    #[test]
    fn lossy_decoding_replaces_invalid_bytes() {
        assert!(decode_bytes(b"Caf\xe9", UTF_8).is_err());
        assert_eq!(decode_bytes_lossy(b"Caf\xe9", UTF_8), "Caf\u{FFFD}");
    }

    #[test]
    fn sink_quotes_only_when_needed() {
        let mut sink = CsvSink::new(Vec::new(), b',', UTF_8);
        sink.write_record(&["Drug|Device".to_string(), "Masking: None, Open".to_string()])
            .unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "Drug|Device,\"Masking: None, Open\"\n");
    }

    #[test]
    fn sink_transcodes_output() {
        let mut sink = CsvSink::new(Vec::new(), b',', WINDOWS_1252);
        sink.write_record(&["Caf\u{e9}".to_string()]).unwrap();
        assert_eq!(sink.into_inner(), b"Caf\xe9\n".to_vec());
    }
}
