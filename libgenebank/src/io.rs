use std::fs::{metadata, File};
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

/// Opens a GenBank file, decompressing `.gz` and `.sz`/`.snappy` files on
/// the fly. Returns the on-disk size, whether it is compressed, and the
/// reader.
pub fn generic_open_file<P: AsRef<Path>>(path: P) -> Result<(u64, bool, Box<dyn Read + Send>)>
{
    generic_open_file_with(path, |file| file)
}

/// [`generic_open_file`], with `wrap` applied to the raw file before any
/// decoder, e.g. to count compressed bytes for a progress bar
pub fn generic_open_file_with<P, W, R>(
    path: P,
    wrap: W,
) -> Result<(u64, bool, Box<dyn Read + Send>)>
where
    P: AsRef<Path>,
    W: FnOnce(File) -> R,
    R: Read + Send + 'static,
{
    let path = path.as_ref();
    let filesize = metadata(path)
        .map_err(|e| Error::open(path, e))?
        .len();
    let file = File::open(path).map_err(|e| Error::open(path, e))?;
    let inner = wrap(file);

    let name = path.to_string_lossy();
    let (compressed, reader): (bool, Box<dyn Read + Send>) = if name.ends_with("gz") {
        (true, Box::new(flate2::read::MultiGzDecoder::new(inner)))
    } else if name.ends_with("snappy") || name.ends_with("sz") {
        (true, Box::new(snap::read::FrameDecoder::new(inner)))
    } else {
        (false, Box::new(inner))
    };

    Ok((filesize, compressed, reader))
}

#[cfg(test)]
mod tests
{
    use std::io::Write;

    use super::*;

    const RECORD: &[u8] = b"ORIGIN\n        1 acgtacgt\n//\n";

    fn read_all(path: &Path) -> (bool, Vec<u8>)
    {
        let (size, compressed, mut reader) = generic_open_file(path).unwrap();
        assert_eq!(size, std::fs::metadata(path).unwrap().len());
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        (compressed, out)
    }

    #[test]
    fn plain_gzip_and_snappy()
    {
        let dir = tempfile::tempdir().unwrap();

        let plain = dir.path().join("seq.gbk");
        std::fs::write(&plain, RECORD).unwrap();
        assert_eq!(read_all(&plain), (false, RECORD.to_vec()));

        let gz = dir.path().join("seq.gbk.gz");
        let mut encoder = flate2::write::GzEncoder::new(
            File::create(&gz).unwrap(),
            flate2::Compression::default(),
        );
        encoder.write_all(RECORD).unwrap();
        encoder.finish().unwrap();
        assert_eq!(read_all(&gz), (true, RECORD.to_vec()));

        let sz = dir.path().join("seq.gbk.sz");
        let mut encoder = snap::write::FrameEncoder::new(File::create(&sz).unwrap());
        encoder.write_all(RECORD).unwrap();
        encoder.flush().unwrap();
        drop(encoder);
        assert_eq!(read_all(&sz), (true, RECORD.to_vec()));
    }

    #[test]
    fn wrapper_sees_compressed_bytes()
    {
        let dir = tempfile::tempdir().unwrap();
        let gz = dir.path().join("seq.gbk.gz");
        let mut encoder = flate2::write::GzEncoder::new(
            File::create(&gz).unwrap(),
            flate2::Compression::best(),
        );
        encoder.write_all(&RECORD.repeat(100)).unwrap();
        encoder.finish().unwrap();

        let counted = std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0));
        let counter = counted.clone();
        let (size, compressed, mut reader) = generic_open_file_with(&gz, move |file| {
            CountingReader {
                inner: file,
                counted: counter,
            }
        })
        .unwrap();

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert!(compressed);
        assert_eq!(out.len(), RECORD.len() * 100);
        assert_eq!(counted.load(std::sync::atomic::Ordering::Relaxed), size);
    }

    struct CountingReader
    {
        inner: File,
        counted: std::sync::Arc<std::sync::atomic::AtomicU64>,
    }

    impl Read for CountingReader
    {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>
        {
            let n = self.inner.read(buf)?;
            self.counted
                .fetch_add(n as u64, std::sync::atomic::Ordering::Relaxed);
            Ok(n)
        }
    }

    #[test]
    fn missing_file_names_the_path()
    {
        let err = generic_open_file("/definitely/not/here.gbk").err().unwrap();
        assert!(matches!(err, Error::Open { .. }));
        assert!(err.to_string().contains("/definitely/not/here.gbk"));
    }
}
