use enough::Unstoppable;
use zentex::*;

fn rgb_image(w: u32, h: u32, pixels: Vec<u8>) -> ImageBuffer {
    ImageBuffer::from_pixels(w, h, PixelFormat::Rgb24, pixels).unwrap()
}

fn indexed_image(w: u32, h: u32, palette: &[[u8; 4]], indices: &[u8]) -> ImageBuffer {
    let mut image = ImageBuffer::new(w, h, PixelFormat::Indexed8).unwrap();
    for (dst, color) in image.palette_mut().chunks_exact_mut(4).zip(palette) {
        dst.copy_from_slice(color);
    }
    image.pixels_mut().copy_from_slice(indices);
    image
}

#[test]
fn png_roundtrip_rgb24() {
    let image = rgb_image(
        3,
        2,
        vec![
            255, 0, 0, 0, 255, 0, 0, 0, 255, // row 0: R G B
            128, 128, 128, 64, 64, 64, 0, 0, 0, // row 1: gray dark black
        ],
    );
    let encoded = EncodeRequest::png().encode(&image, Unstoppable).unwrap();
    assert_eq!(&encoded[..8], b"\x89PNG\r\n\x1a\n");

    let decoded = DecodeRequest::new(&encoded).decode(Unstoppable).unwrap();
    assert_eq!(decoded, image);
}

#[test]
fn png_roundtrip_rgba32() {
    let pixels = vec![
        255, 0, 0, 255, 0, 255, 0, 128, // row 0
        0, 0, 255, 0, 128, 128, 128, 255, // row 1
    ];
    let image = ImageBuffer::from_pixels(2, 2, PixelFormat::Rgba32, pixels).unwrap();
    for level in [0, 6, 9] {
        let encoded = EncodeRequest::png()
            .with_compression_level(level)
            .encode(&image, Unstoppable)
            .unwrap();
        assert_eq!(decode(&encoded, Unstoppable).unwrap(), image, "level {level}");
    }
}

#[test]
fn png_roundtrip_indexed8() {
    let palette = [[255, 0, 0, 255], [0, 255, 0, 128], [0, 0, 255, 0], [9, 9, 9, 255]];
    let image = indexed_image(2, 2, &palette, &[3, 2, 1, 0]);
    let encoded = EncodeRequest::png().encode(&image, Unstoppable).unwrap();
    let decoded = decode(&encoded, Unstoppable).unwrap();
    assert_eq!(decoded, image);
}

#[test]
fn png_roundtrip_gray() {
    let image = ImageBuffer::from_pixels(4, 1, PixelFormat::R8, vec![0, 85, 170, 255]).unwrap();
    let encoded = EncodeRequest::png().encode(&image, Unstoppable).unwrap();
    assert_eq!(decode(&encoded, Unstoppable).unwrap(), image);
}

#[test]
fn png_indexed16_writes_truecolor() {
    let mut image = ImageBuffer::with_palette_size(2, 1, PixelFormat::Indexed16, 512).unwrap();
    image.palette_mut()[300 * 4..301 * 4].copy_from_slice(&[1, 2, 3, 77]);
    image.pixels_mut().copy_from_slice(&300u16.to_le_bytes().repeat(2));
    let encoded = EncodeRequest::png().encode(&image, Unstoppable).unwrap();
    let decoded = decode(&encoded, Unstoppable).unwrap();
    assert_eq!(decoded.format(), PixelFormat::Rgba32);
    assert_eq!(decoded.pixels(), &[1, 2, 3, 77, 1, 2, 3, 77]);
}

#[test]
fn png_decode_with_palette_reconstructs_colors() {
    let mut pixels = Vec::new();
    for i in 0..(20u32 * 20) {
        pixels.extend_from_slice(&[(i % 7 * 30) as u8, (i % 5 * 50) as u8, 9]);
    }
    let image = rgb_image(20, 20, pixels);
    let encoded = EncodeRequest::png().encode(&image, Unstoppable).unwrap();
    let indexed = DecodeRequest::new(&encoded)
        .with_palette(0)
        .decode(Unstoppable)
        .unwrap();
    assert_eq!(indexed.format(), PixelFormat::Indexed8);
    assert_eq!(indexed.to_truecolor().unwrap().pixels(), image.pixels());
}

#[test]
fn png_with_too_many_colors_stays_truecolor() {
    // 300x300 with a distinct color per pixel: 90000 > 65536.
    let mut pixels = Vec::with_capacity(300 * 300 * 3);
    for i in 0..(300u32 * 300) {
        let [a, b, c, _] = i.to_le_bytes();
        pixels.extend_from_slice(&[a, b, c]);
    }
    let image = rgb_image(300, 300, pixels);
    let encoded = EncodeRequest::png()
        .with_compression_level(1)
        .encode(&image, Unstoppable)
        .unwrap();
    let decoded = DecodeRequest::new(&encoded)
        .with_palette(0)
        .decode(Unstoppable)
        .unwrap();
    assert_eq!(decoded, image);
}

#[test]
fn bmp_roundtrip_rgb24() {
    // 3 pixels per row exercises row padding.
    let image = rgb_image(3, 2, (0..18).map(|v| v * 13).collect());
    let encoded = EncodeRequest::bmp().encode(&image, Unstoppable).unwrap();
    assert_eq!(&encoded[0..2], b"BM");
    assert_eq!(decode(&encoded, Unstoppable).unwrap(), image);
}

#[test]
fn bmp_roundtrip_rgba32() {
    let pixels = vec![
        255, 0, 0, 255, 0, 255, 0, 128, // row 0
        0, 0, 255, 64, 128, 128, 128, 255, // row 1
    ];
    let image = ImageBuffer::from_pixels(2, 2, PixelFormat::Rgba32, pixels).unwrap();
    let encoded = EncodeRequest::bmp().encode(&image, Unstoppable).unwrap();
    assert_eq!(decode(&encoded, Unstoppable).unwrap(), image);
}

#[test]
fn bmp_roundtrip_indexed8_forces_opaque_palette() {
    let palette = [[10, 20, 30, 255], [40, 50, 60, 0], [70, 80, 90, 255], [1, 2, 3, 255]];
    let image = indexed_image(2, 2, &palette, &[0, 1, 2, 3]);
    let encoded = EncodeRequest::bmp().encode(&image, Unstoppable).unwrap();
    let decoded = decode(&encoded, Unstoppable).unwrap();
    assert_eq!(decoded.format(), PixelFormat::Indexed8);
    assert_eq!(decoded.indices(), &[0, 1, 2, 3]);
    assert_eq!(decoded.palette_entry(1), [40, 50, 60, 255]);
    assert_eq!(decoded.palette_entry(3), [1, 2, 3, 255]);
}

#[test]
fn dds_roundtrip_rgba32() {
    let pixels: Vec<u8> = (0..4 * 3 * 4).map(|v| (v * 5) as u8).collect();
    let image = ImageBuffer::from_pixels(4, 3, PixelFormat::Rgba32, pixels).unwrap();
    let encoded = EncodeRequest::dds().encode(&image, Unstoppable).unwrap();
    assert_eq!(&encoded[..4], b"DDS ");
    assert_eq!(decode(&encoded, Unstoppable).unwrap(), image);
}

#[test]
fn jtex_keeps_everything() {
    let mut image = ImageBuffer::new(3, 1, PixelFormat::Rgba64).unwrap();
    image.flags = 7;
    for (i, b) in image.pixels_mut().iter_mut().enumerate() {
        *b = i as u8;
    }
    let encoded = EncodeRequest::jtex().encode(&image, Unstoppable).unwrap();
    assert_eq!(decode(&encoded, Unstoppable).unwrap(), image);
}

#[test]
fn dxt_needs_dimensions_and_encode_is_unsupported() {
    let blocks = [0u8; 8];
    let err = DecodeRequest::new(&blocks)
        .with_format(ImageFormat::Dxt1)
        .decode(Unstoppable)
        .unwrap_err();
    assert!(matches!(err, TexError::InvalidHeader(_)));

    let image = DecodeRequest::new(&blocks)
        .with_format(ImageFormat::Dxt1)
        .with_dimensions(4, 4)
        .decode(Unstoppable)
        .unwrap();
    assert_eq!(image.format(), PixelFormat::Rgba32);

    let err = EncodeRequest::new(ImageFormat::Dxt5).encode(&image, Unstoppable).unwrap_err();
    assert!(err.is_unsupported());
}

#[test]
fn decode_with_palette_applies_to_bmp() {
    let image = rgb_image(2, 1, vec![5, 6, 7, 5, 6, 7]);
    let encoded = EncodeRequest::bmp().encode(&image, Unstoppable).unwrap();
    let decoded = DecodeRequest::new(&encoded)
        .with_palette(0)
        .decode(Unstoppable)
        .unwrap();
    assert_eq!(decoded.format(), PixelFormat::Indexed8);
    assert_eq!(decoded.indices(), &[0, 0]);
    assert_eq!(decoded.palette_entry(0), [5, 6, 7, 255]);
}

#[test]
fn image_info_probe() {
    let image = rgb_image(1, 2, vec![255; 6]);
    for (format, expected) in [
        (ImageFormat::Png, PixelFormat::Rgb24),
        (ImageFormat::Bmp, PixelFormat::Rgb24),
        (ImageFormat::Dds, PixelFormat::Rgb24),
        (ImageFormat::Jtex, PixelFormat::Rgb24),
    ] {
        let encoded = encode(&image, format, Unstoppable).unwrap();
        let info = ImageInfo::from_bytes(&encoded).unwrap();
        assert_eq!(info.width, 1);
        assert_eq!(info.height, 2);
        assert_eq!(info.format, format);
        assert_eq!(info.pixel_format, expected);
    }
}

#[test]
fn stream_probe_restores_position_and_decodes() {
    let image = rgb_image(2, 2, (0..12).collect());
    let encoded = EncodeRequest::png().encode(&image, Unstoppable).unwrap();
    let mut stream = std::io::Cursor::new(encoded);

    let info = ImageInfo::from_reader(&mut stream).unwrap();
    assert_eq!((info.width, info.height), (2, 2));
    assert_eq!(stream.position(), 0);

    let decoded = decode_reader(&mut stream, None, Unstoppable).unwrap();
    assert_eq!(decoded, image);
}

#[test]
fn stream_memory_limit() {
    let image = rgb_image(8, 8, vec![1; 192]);
    let encoded = EncodeRequest::bmp().encode(&image, Unstoppable).unwrap();
    let limits = Limits {
        max_memory_bytes: Some(64),
        ..Default::default()
    };
    let err = decode_reader(&mut std::io::Cursor::new(encoded), Some(limits), Unstoppable).unwrap_err();
    assert!(matches!(err, TexError::LimitExceeded(_)));
}

#[test]
fn encode_to_writer() {
    let image = rgb_image(1, 1, vec![1, 2, 3]);
    let mut out = Vec::new();
    EncodeRequest::png()
        .with_idat_chunk_size(4)
        .encode_to(&image, &mut out, Unstoppable)
        .unwrap();
    assert_eq!(decode(&out, Unstoppable).unwrap(), image);
}

#[test]
fn limits_reject_large() {
    let image = rgb_image(1, 2, vec![255; 6]);
    let limits = Limits {
        max_pixels: Some(1), // only 1 pixel allowed
        ..Default::default()
    };
    for format in [ImageFormat::Png, ImageFormat::Bmp, ImageFormat::Dds, ImageFormat::Jtex] {
        let encoded = encode(&image, format, Unstoppable).unwrap();
        let result = DecodeRequest::new(&encoded)
            .with_limits(limits.clone())
            .decode(Unstoppable);
        match result {
            Err(TexError::LimitExceeded(_)) => {}
            other => panic!("{format:?}: expected LimitExceeded, got {other:?}"),
        }
    }
}

#[test]
fn decode_into_keeps_target_on_failure() {
    let mut target = rgb_image(1, 1, vec![4, 5, 6]);
    let before = target.clone();
    let err = DecodeRequest::new(b"BM\x00\x00").decode_into(&mut target, Unstoppable);
    assert!(err.is_err());
    assert_eq!(target, before);

    let png = EncodeRequest::png()
        .encode(&rgb_image(2, 1, vec![1, 1, 1, 2, 2, 2]), Unstoppable)
        .unwrap();
    DecodeRequest::new(&png).decode_into(&mut target, Unstoppable).unwrap();
    assert_eq!(target.width(), 2);
}

fn bmp_2x2_indexed(height: i32, rows: [[u8; 2]; 2]) -> Vec<u8> {
    let palette = [[0u8, 0, 255], [0, 255, 0], [255, 0, 0], [10, 20, 30]]; // BGR
    let offset = 14 + 40 + 16;
    let mut bmp = Vec::new();
    bmp.extend_from_slice(b"BM");
    bmp.extend_from_slice(&(offset + 8u32).to_le_bytes());
    bmp.extend_from_slice(&[0; 4]);
    bmp.extend_from_slice(&offset.to_le_bytes());
    bmp.extend_from_slice(&40u32.to_le_bytes());
    bmp.extend_from_slice(&2i32.to_le_bytes());
    bmp.extend_from_slice(&height.to_le_bytes());
    bmp.extend_from_slice(&1u16.to_le_bytes()); // planes
    bmp.extend_from_slice(&8u16.to_le_bytes()); // depth
    bmp.extend_from_slice(&0u32.to_le_bytes()); // BI_RGB
    bmp.extend_from_slice(&8u32.to_le_bytes()); // image size
    bmp.extend_from_slice(&[0; 8]); // resolution
    bmp.extend_from_slice(&4u32.to_le_bytes()); // colors used
    bmp.extend_from_slice(&0u32.to_le_bytes()); // important
    for [b, g, r] in palette {
        bmp.extend_from_slice(&[b, g, r, 0]);
    }
    for row in rows {
        bmp.extend_from_slice(&[row[0], row[1], 0, 0]);
    }
    bmp
}

#[test]
fn bmp_indexed_row_order() {
    let bottom_up = bmp_2x2_indexed(2, [[2, 3], [0, 1]]);
    let top_down = bmp_2x2_indexed(-2, [[0, 1], [2, 3]]);
    let expected = [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255], [30, 20, 10, 255]];
    for data in [bottom_up, top_down] {
        let image = decode(&data, Unstoppable).unwrap();
        assert_eq!(image.format(), PixelFormat::Indexed8);
        assert_eq!((image.width(), image.height()), (2, 2));
        let colors: Vec<[u8; 4]> = (0..4).map(|i| image.rgba_at(i)).collect();
        assert_eq!(colors, expected);
    }
}

#[test]
fn decode_with_palette_applies_to_gray() {
    let image = ImageBuffer::from_pixels(3, 1, PixelFormat::R8, vec![7, 7, 200]).unwrap();
    let encoded = EncodeRequest::jtex().encode(&image, Unstoppable).unwrap();
    let decoded = DecodeRequest::new(&encoded)
        .with_palette(0)
        .decode(Unstoppable)
        .unwrap();
    assert_eq!(decoded.format(), PixelFormat::Indexed8);
    assert_eq!(decoded.indices(), &[0, 0, 1]);
    assert_eq!(decoded.palette_entry(1), [200, 200, 200, 255]);
}
