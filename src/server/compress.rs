// Content negotiation and encoders for on-demand compression.

use std::io::Write;

use brotli::CompressorWriter;
use flate2::{write::GzEncoder, Compression};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Brotli,
    Gzip,
}

impl Encoding {
    pub fn header_value(self) -> &'static str {
        match self {
            Encoding::Brotli => "br",
            Encoding::Gzip => "gzip",
        }
    }
}

/// Pick an encoding from `Accept-Encoding`, brotli first. Tokens with `q=0`
/// are treated as refused.
pub fn negotiate(accept_encoding: Option<&str>) -> Option<Encoding> {
    let accept = accept_encoding?;
    let mut gzip = false;
    for token in accept.split(',') {
        let mut params = token.split(';');
        let name = params.next().unwrap_or("").trim().to_ascii_lowercase();
        let refused = params.any(|p| {
            p.trim()
                .strip_prefix("q=")
                .and_then(|q| q.trim().parse::<f32>().ok())
                .is_some_and(|q| q <= 0.0)
        });
        if refused {
            continue;
        }
        match name.as_str() {
            "br" => return Some(Encoding::Brotli),
            "gzip" => gzip = true,
            _ => {}
        }
    }
    gzip.then_some(Encoding::Gzip)
}

pub fn compress(bytes: &[u8], encoding: Encoding) -> std::io::Result<Vec<u8>> {
    match encoding {
        Encoding::Gzip => {
            let mut encoder = GzEncoder::new(
                Vec::with_capacity((bytes.len() / 2).max(256)),
                Compression::default(),
            );
            encoder.write_all(bytes)?;
            encoder.finish()
        }
        Encoding::Brotli => {
            let mut compressed = Vec::with_capacity((bytes.len() / 2).max(256));
            {
                let mut writer = CompressorWriter::new(&mut compressed, 4096, 5, 22);
                writer.write_all(bytes)?;
                writer.flush()?;
            }
            Ok(compressed)
        }
    }
}
