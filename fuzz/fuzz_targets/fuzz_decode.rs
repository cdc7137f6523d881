#![no_main]
use libfuzzer_sys::fuzz_target;
use zentex::{DecodeRequest, ImageFormat, ImageInfo, Limits};

fuzz_target!(|data: &[u8]| {
    let limits = Limits {
        max_pixels: Some(1 << 22),
        max_memory_bytes: Some(1 << 26),
        ..Limits::default()
    };

    // Auto-detect decode and probe must never panic
    let _ = zentex::decode(data, enough::Unstoppable);
    let _ = ImageInfo::from_bytes(data);

    // Try each format explicitly, with and without palette building
    for format in [ImageFormat::Png, ImageFormat::Bmp, ImageFormat::Dds, ImageFormat::Jtex] {
        let _ = DecodeRequest::new(data)
            .with_format(format)
            .with_limits(limits.clone())
            .decode(enough::Unstoppable);
        let _ = DecodeRequest::new(data)
            .with_format(format)
            .with_limits(limits.clone())
            .with_palette(0)
            .decode(enough::Unstoppable);
    }

    // Raw blocks: the first two bytes pick the dimensions
    if let [w, h, rest @ ..] = data {
        for format in [ImageFormat::Dxt1, ImageFormat::Dxt5] {
            let _ = DecodeRequest::new(rest)
                .with_format(format)
                .with_dimensions(u32::from(*w), u32::from(*h))
                .decode(enough::Unstoppable);
        }
    }
});
