use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

/// zlib-compress a blob before it goes into a binary column
pub fn zlib(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

pub fn unzlib(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Inflate a stored text column, falling back to lossy UTF-8
pub fn unzlib_string(bytes: &[u8]) -> std::io::Result<String> {
    let raw = unzlib(bytes)?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inflates_what_it_deflates() {
        let text = "CodeChecker analyze compile_commands.json -o reports";
        let packed = zlib(text.as_bytes()).unwrap();
        assert_ne!(packed.as_slice(), text.as_bytes());
        assert_eq!(unzlib_string(&packed).unwrap(), text);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(unzlib(b"not zlib at all").is_err());
    }
}
