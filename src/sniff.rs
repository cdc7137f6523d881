//! Format identification by masked signature matching, with optional
//! content heuristics for payloads that match no signature.

use alloc::vec::Vec;
use std::io::{Read, Seek, SeekFrom};

use crate::error::TexError;

/// Bytes sampled from the start of a payload; covers the longest signature.
pub const SNIFF_LEN: usize = 16;

/// Longest pattern a [`FormatSignature`] can hold.
pub const MAX_SIGNATURE: usize = 64;

/// Kind of payload identified by [`Sniffer`].
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileKind {
    Png,
    Bmp,
    Dds,
    Jtex,
    /// Recognized only; not decoded.
    Jpeg,
    /// Recognized only; not decoded.
    Gif,
    /// Recognized only; not decoded.
    Webp,
    /// RIFF/WAVE audio, recognized only.
    Wav,
    /// Windows icon, recognized only.
    Ico,
    /// No signature matched.
    Binary,
    /// Mostly printable bytes.
    Text,
    /// Text wrapped in `{ ... }`.
    Json,
}

/// A byte pattern with per-byte "must match" bits.
#[derive(Clone, Copy, Debug)]
pub struct FormatSignature {
    pub kind: FileKind,
    pattern: [u8; MAX_SIGNATURE],
    /// Bit `i` set: byte `i` must equal `pattern[i]`.
    mask: u64,
    len: usize,
}

impl FormatSignature {
    /// Signature whose every byte must match.
    pub const fn exact(kind: FileKind, pattern: &[u8]) -> Self {
        let mask = if pattern.len() >= 64 {
            u64::MAX
        } else {
            (1u64 << pattern.len()) - 1
        };
        Self::masked(kind, pattern, mask)
    }

    pub const fn masked(kind: FileKind, pattern: &[u8], mask: u64) -> Self {
        assert!(pattern.len() <= MAX_SIGNATURE);
        let mut buf = [0u8; MAX_SIGNATURE];
        let mut i = 0;
        while i < pattern.len() {
            buf[i] = pattern[i];
            i += 1;
        }
        Self {
            kind,
            pattern: buf,
            mask,
            len: pattern.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `sample` starts with this signature.
    pub fn matches(&self, sample: &[u8]) -> bool {
        if sample.len() < self.len {
            return false;
        }
        (0..self.len).all(|i| self.mask & (1 << i) == 0 || sample[i] == self.pattern[i])
    }
}

/// RIFF container: fixed marker, 4 size bytes we don't care about, sub-type.
const RIFF_MASK: u64 = 0b1111_0000_1111;

/// Known signatures, ordered by [`FileKind`].
pub static SIGNATURES: &[FormatSignature] = &[
    FormatSignature::exact(FileKind::Png, &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]),
    FormatSignature::exact(FileKind::Bmp, b"BM"),
    FormatSignature::exact(FileKind::Dds, b"DDS "),
    FormatSignature::exact(FileKind::Jtex, b"JTEX"),
    FormatSignature::exact(FileKind::Jpeg, &[0xFF, 0xD8, 0xFF]),
    FormatSignature::exact(FileKind::Gif, b"GIF8"),
    FormatSignature::masked(FileKind::Webp, b"RIFF\0\0\0\0WEBP", RIFF_MASK),
    FormatSignature::masked(FileKind::Wav, b"RIFF\0\0\0\0WAVE", RIFF_MASK),
    FormatSignature::exact(FileKind::Ico, &[0x00, 0x00, 0x01, 0x00]),
];

/// How much content inspection to do when no signature matches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Analysis {
    /// Signatures only; anything else is [`FileKind::Binary`].
    #[default]
    None,
    /// Classify as [`FileKind::Text`] when ≥75% of bytes are printable.
    Simple,
    /// Simple, plus [`FileKind::Json`] for text trimmed to `{ ... }`.
    /// Shallow: the content is not parsed.
    Complex,
}

/// Result of a sniff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sniffed {
    pub kind: FileKind,
    /// Length of the matched signature, 0 when none matched.
    pub signature_len: usize,
}

/// Signature matcher with optional content analysis and sample transform.
#[derive(Clone, Copy, Default)]
pub struct Sniffer<'t> {
    analysis: Analysis,
    transform: Option<&'t dyn Fn(&mut [u8])>,
}

impl<'t> Sniffer<'t> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_analysis(mut self, analysis: Analysis) -> Self {
        self.analysis = analysis;
        self
    }

    /// Rewrite the sampled bytes before matching, e.g. to unwrap a payload
    /// nested inside another container.
    ///
    /// Only the signature sample is rewritten. Text and JSON analysis
    /// always sees the payload as stored.
    pub fn with_transform(mut self, transform: &'t dyn Fn(&mut [u8])) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Identify an in-memory payload.
    pub fn sniff(&self, data: &[u8]) -> Sniffed {
        let n = data.len().min(SNIFF_LEN);
        let mut sample = [0u8; SNIFF_LEN];
        sample[..n].copy_from_slice(&data[..n]);
        if let Some(sig) = self.match_sample(&mut sample[..n]) {
            return sig;
        }
        self.analyze(data)
    }

    /// Identify a stream starting at its current position.
    ///
    /// Afterwards the stream is positioned just past the matched signature,
    /// or back at the starting position when `reset` is set.
    pub fn sniff_stream<R: Read + Seek>(
        &self,
        stream: &mut R,
        reset: bool,
    ) -> Result<Sniffed, TexError> {
        let start = stream.stream_position()?;
        let mut sample = [0u8; SNIFF_LEN];
        let n = read_up_to(stream, &mut sample)?;

        let sniffed = match self.match_sample(&mut sample[..n]) {
            Some(sig) => sig,
            None if self.analysis == Analysis::None => Sniffed {
                kind: FileKind::Binary,
                signature_len: 0,
            },
            None => {
                stream.seek(SeekFrom::Start(start))?;
                let mut payload = Vec::new();
                stream.read_to_end(&mut payload)?;
                self.analyze(&payload)
            }
        };

        let offset = if reset { 0 } else { sniffed.signature_len as u64 };
        stream.seek(SeekFrom::Start(start + offset))?;
        Ok(sniffed)
    }

    fn match_sample(&self, sample: &mut [u8]) -> Option<Sniffed> {
        if let Some(transform) = self.transform {
            transform(sample);
        }
        let found = SIGNATURES.iter().find(|sig| sig.matches(sample))?;
        tracing::trace!(kind = ?found.kind, "signature matched");
        Some(Sniffed {
            kind: found.kind,
            signature_len: found.len(),
        })
    }

    fn analyze(&self, payload: &[u8]) -> Sniffed {
        let kind = match self.analysis {
            Analysis::None => FileKind::Binary,
            Analysis::Simple if is_mostly_printable(payload) => FileKind::Text,
            Analysis::Complex if is_mostly_printable(payload) => {
                if looks_like_json(payload) {
                    FileKind::Json
                } else {
                    FileKind::Text
                }
            }
            _ => FileKind::Binary,
        };
        tracing::trace!(?kind, len = payload.len(), "content analysis");
        Sniffed {
            kind,
            signature_len: 0,
        }
    }
}

/// Identify `data` by signature only.
pub fn sniff(data: &[u8]) -> FileKind {
    Sniffer::new().sniff(data).kind
}

fn read_up_to<R: Read>(stream: &mut R, buf: &mut [u8]) -> Result<usize, TexError> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

fn is_printable(b: u8) -> bool {
    matches!(b, 0x20..=0x7E | b'\t' | b'\n' | b'\r')
}

fn is_mostly_printable(payload: &[u8]) -> bool {
    if payload.is_empty() {
        return false;
    }
    let printable = payload.iter().filter(|&&b| is_printable(b)).count();
    printable * 4 >= payload.len() * 3
}

fn looks_like_json(payload: &[u8]) -> bool {
    let trimmed = payload.trim_ascii();
    trimmed.first() == Some(&b'{') && trimmed.last() == Some(&b'}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn png_and_bmp_signatures() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        assert_eq!(sniff(&png), FileKind::Png);
        assert_eq!(sniff(&[0x42, 0x4D, 0x00]), FileKind::Bmp);
        assert_eq!(sniff(b"DDS \x7c\0\0\0"), FileKind::Dds);
        assert_eq!(sniff(b"JTEX"), FileKind::Jtex);
    }

    #[test]
    fn riff_subtype_ignores_size_bytes() {
        assert_eq!(sniff(b"RIFF\x12\x34\x56\x78WEBPVP8 "), FileKind::Webp);
        assert_eq!(sniff(b"RIFF\xff\xff\xff\xffWAVEfmt "), FileKind::Wav);
        assert_eq!(sniff(b"RIFF\0\0\0\0AVI LIST"), FileKind::Binary);
    }

    #[test]
    fn truncated_signature_does_not_match() {
        assert_eq!(sniff(&[0x89, 0x50, 0x4E]), FileKind::Binary);
        assert_eq!(sniff(&[]), FileKind::Binary);
    }

    #[test]
    fn printable_text_needs_analysis() {
        let text = [b'a'; 100];
        assert_eq!(sniff(&text), FileKind::Binary);
        let s = Sniffer::new().with_analysis(Analysis::Simple).sniff(&text);
        assert_eq!(s.kind, FileKind::Text);
        assert_eq!(s.signature_len, 0);
    }

    #[test]
    fn text_ratio_threshold() {
        let mut data = vec![b'x'; 75];
        data.extend_from_slice(&[0u8; 25]);
        let simple = Sniffer::new().with_analysis(Analysis::Simple);
        assert_eq!(simple.sniff(&data).kind, FileKind::Text);
        data.push(0);
        assert_eq!(simple.sniff(&data).kind, FileKind::Binary);
    }

    #[test]
    fn json_only_under_complex_analysis() {
        let json = b"  {\"a\": [1, 2]}\n";
        let simple = Sniffer::new().with_analysis(Analysis::Simple);
        let complex = Sniffer::new().with_analysis(Analysis::Complex);
        assert_eq!(simple.sniff(json).kind, FileKind::Text);
        assert_eq!(complex.sniff(json).kind, FileKind::Json);
        assert_eq!(complex.sniff(b"{ not closed").kind, FileKind::Text);
    }

    #[test]
    fn transform_applies_before_matching() {
        let xored: Vec<u8> = b"BMxxxx".iter().map(|b| b ^ 0x5A).collect();
        assert_eq!(sniff(&xored), FileKind::Binary);
        let unxor = |s: &mut [u8]| s.iter_mut().for_each(|b| *b ^= 0x5A);
        let s = Sniffer::new().with_transform(&unxor).sniff(&xored);
        assert_eq!(s.kind, FileKind::Bmp);
    }

    #[test]
    fn transform_does_not_touch_analysis() {
        let text = b"plain readable text, nothing to unwrap here";
        let scramble = |s: &mut [u8]| s.iter_mut().for_each(|b| *b = 0);
        let s = Sniffer::new()
            .with_analysis(Analysis::Simple)
            .with_transform(&scramble)
            .sniff(text);
        assert_eq!(s.kind, FileKind::Text);
    }

    #[test]
    fn stream_position_after_sniff() {
        let mut data = b"junk".to_vec();
        data.extend_from_slice(b"DDS \x7c\0\0\0");
        let mut stream = Cursor::new(data);
        stream.set_position(4);

        let s = Sniffer::new().sniff_stream(&mut stream, false).unwrap();
        assert_eq!(s.kind, FileKind::Dds);
        assert_eq!(stream.position(), 8);

        stream.set_position(4);
        Sniffer::new().sniff_stream(&mut stream, true).unwrap();
        assert_eq!(stream.position(), 4);
    }

    #[test]
    fn stream_text_analysis_rewinds() {
        let mut stream = Cursor::new(b"hello world, this is plain text".to_vec());
        let s = Sniffer::new()
            .with_analysis(Analysis::Simple)
            .sniff_stream(&mut stream, false)
            .unwrap();
        assert_eq!(s.kind, FileKind::Text);
        assert_eq!(stream.position(), 0);
    }
}
