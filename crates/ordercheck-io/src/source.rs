use crate::bounds::Bounds;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use ordercheck_core::{AppError, AppResult};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use tracing::debug;
use zstd::stream::read::Decoder;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Plain,
    Gzip,
    Zstd,
}

impl Compression {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => Compression::Gzip,
            Some("zst") => Compression::Zstd,
            _ => Compression::Plain,
        }
    }

    fn sniff(header: &[u8]) -> Self {
        if header.starts_with(&ZSTD_MAGIC) {
            Compression::Zstd
        } else if header.starts_with(&GZIP_MAGIC) {
            Compression::Gzip
        } else {
            Compression::Plain
        }
    }
}

pub fn read_text(path: &Path, bounds: Bounds) -> AppResult<String> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| AppError::usage(format!("missing file {}: {e}", path.display())))?;
    if metadata.len() > bounds.max_file_bytes {
        return Err(AppError::malformed(format!(
            "{} exceeds max_file_bytes",
            path.display()
        )));
    }

    let file = File::open(path)
        .map_err(|e| AppError::usage(format!("failed to open {}: {e}", path.display())))?;
    let mut buffered = BufReader::new(file);
    let header = buffered
        .fill_buf()
        .map_err(|e| map_io_error(path, e))?
        .to_vec();

    let compression = Compression::sniff(&header);
    let inner: Box<dyn Read> = match compression {
        Compression::Plain => Box::new(buffered),
        Compression::Gzip => Box::new(MultiGzDecoder::new(buffered)),
        Compression::Zstd => Box::new(Decoder::with_buffer(buffered).map_err(|e| {
            AppError::malformed(format!("zstd decode error in {}: {e}", path.display()))
        })?),
    };
    let mut reader = BoundedRead::new(inner, bounds.max_decompressed_bytes);

    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| map_io_error(path, e))?;
    debug!(path = %path.display(), ?compression, bytes = bytes.len(), "read text source");
    String::from_utf8(bytes)
        .map_err(|e| AppError::malformed(format!("{} is not utf-8: {e}", path.display())))
}

pub fn write_text(path: &Path, content: &str) -> AppResult<()> {
    let bytes = match Compression::from_path(path) {
        Compression::Plain => content.as_bytes().to_vec(),
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder
                .write_all(content.as_bytes())
                .map_err(|e| AppError::internal(format!("gzip encode error: {e}")))?;
            encoder
                .finish()
                .map_err(|e| AppError::internal(format!("gzip finish failed: {e}")))?
        }
        Compression::Zstd => zstd::stream::encode_all(content.as_bytes(), 0)
            .map_err(|e| AppError::internal(format!("zstd encode error: {e}")))?,
    };
    std::fs::write(path, bytes)
        .map_err(|e| AppError::internal(format!("failed to write {}: {e}", path.display())))
}

struct BoundedRead<R> {
    inner: R,
    max_bytes: u64,
    read: u64,
}

impl<R> BoundedRead<R> {
    fn new(inner: R, max_bytes: u64) -> Self {
        Self {
            inner,
            max_bytes,
            read: 0,
        }
    }
}

impl<R: Read> Read for BoundedRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.read = self.read.saturating_add(n as u64);
        if self.read > self.max_bytes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "max_decompressed_bytes exceeded",
            ));
        }
        Ok(n)
    }
}

fn map_io_error(path: &Path, err: io::Error) -> AppError {
    if err
        .to_string()
        .to_lowercase()
        .contains("max_decompressed_bytes")
    {
        AppError::malformed(format!("{} exceeds max_decompressed_bytes", path.display()))
    } else if err.kind() == io::ErrorKind::UnexpectedEof {
        AppError::malformed(format!("unexpected end of {}", path.display()))
    } else {
        AppError::malformed(format!("read error in {}: {err}", path.display()))
    }
}
