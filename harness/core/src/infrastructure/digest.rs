// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Streaming checksums and gzip handling.
//!
//! Files here are routinely tens of gigabytes, so everything streams:
//! md5 over a fixed buffer, content md5 through a gzip decoder, and the
//! bed comment scan line by line. All functions are synchronous; callers
//! run them on the blocking pool.

use flate2::read::MultiGzDecoder;
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Hex md5 of a file's bytes as stored.
pub fn md5_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Gzip magic sniff on the first two bytes. An empty or one-byte file is
/// not gzipped.
pub fn is_gzipped(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    let mut read = 0;
    while read < 2 {
        let n = file.read(&mut magic[read..])?;
        if n == 0 {
            return Ok(false);
        }
        read += n;
    }
    Ok(magic == [0x1f, 0x8b])
}

/// Hex md5 of a gzipped file's decompressed content.
pub fn content_md5_of_gzip(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut decoder = MultiGzDecoder::new(BufReader::with_capacity(BUF_SIZE, file));
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = decoder.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Buffered reader over a gzipped file's decompressed bytes.
pub fn gzip_reader(path: &Path) -> io::Result<impl BufRead> {
    let file = File::open(path)?;
    Ok(BufReader::with_capacity(
        BUF_SIZE,
        MultiGzDecoder::new(BufReader::with_capacity(BUF_SIZE, file)),
    ))
}

/// Number of `#` comment lines in a gzipped bed file.
pub fn count_bed_comments(path: &Path) -> io::Result<u64> {
    let reader = gzip_reader(path)?;
    let mut count = 0;
    for line in reader.split(b'\n') {
        let line = line?;
        if line.first() == Some(&b'#') {
            count += 1;
        }
    }
    Ok(count)
}

/// Write a decompressed copy of a gzipped bed file with `#` comment lines
/// removed. The validator chokes on comments, the portal stores them.
pub fn strip_bed_comments(src: &Path, dest: &Path) -> io::Result<()> {
    let reader = gzip_reader(src)?;
    let mut writer = io::BufWriter::new(File::create(dest)?);
    for line in reader.split(b'\n') {
        let line = line?;
        if line.first() == Some(&b'#') {
            continue;
        }
        writer.write_all(&line)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write as _;

    fn write_gz(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap();
        path
    }

    #[test]
    fn md5_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello world\n").unwrap();
        // md5 of "hello world\n"
        assert_eq!(md5_file(&path).unwrap(), "6f5902ac237024bdd0c176cb93063dc4");
    }

    #[test]
    fn gzip_sniffing() {
        let dir = tempfile::tempdir().unwrap();
        let gz = write_gz(dir.path(), "a.gz", b"payload");
        assert!(is_gzipped(&gz).unwrap());

        let plain = dir.path().join("b.txt");
        std::fs::write(&plain, b"payload").unwrap();
        assert!(!is_gzipped(&plain).unwrap());

        let empty = dir.path().join("c.txt");
        std::fs::write(&empty, b"").unwrap();
        assert!(!is_gzipped(&empty).unwrap());
    }

    #[test]
    fn content_md5_sees_through_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let gz = write_gz(dir.path(), "hello.gz", b"hello world\n");
        assert_eq!(
            content_md5_of_gzip(&gz).unwrap(),
            "6f5902ac237024bdd0c176cb93063dc4"
        );
    }

    #[test]
    fn bed_comment_scan_and_strip() {
        let dir = tempfile::tempdir().unwrap();
        let bed = b"# browser line\n# track line\nchr1\t10\t20\nchr2\t5\t15\n";
        let gz = write_gz(dir.path(), "x.bed.gz", bed);
        assert_eq!(count_bed_comments(&gz).unwrap(), 2);

        let stripped = dir.path().join("x_modified.bed");
        strip_bed_comments(&gz, &stripped).unwrap();
        let content = std::fs::read_to_string(&stripped).unwrap();
        assert_eq!(content, "chr1\t10\t20\nchr2\t5\t15\n");
    }

    #[test]
    fn comment_free_bed_counts_zero() {
        let dir = tempfile::tempdir().unwrap();
        let gz = write_gz(dir.path(), "y.bed.gz", b"chr1\t10\t20\n");
        assert_eq!(count_bed_comments(&gz).unwrap(), 0);
    }
}
