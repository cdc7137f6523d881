#!/usr/bin/env -S cargo +nightly -Zscript
//! Generate seed corpus files for fuzzing.
//! Run: cargo +nightly -Zscript fuzz/generate_seeds.rs

fn chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    // CRC is not verified on decode
    out.extend_from_slice(&[0; 4]);
}

fn main() {
    use std::fs;
    let dir = "fuzz/corpus/fuzz_decode";
    fs::create_dir_all(dir).unwrap();

    // PNG 1x1 RGB, stored deflate block
    let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&1u32.to_be_bytes());
    ihdr.extend_from_slice(&1u32.to_be_bytes());
    ihdr.extend_from_slice(&[8, 2, 0, 0, 0]);
    chunk(&mut png, b"IHDR", &ihdr);
    let idat = [
        0x78, 0x01, // zlib header
        0x01, 0x04, 0x00, 0xfb, 0xff, // final stored block, len 4
        0x00, 0xff, 0x00, 0x00, // filter None, red
        0x03, 0x01, 0x01, 0x00, // adler32
    ];
    chunk(&mut png, b"IDAT", &idat);
    chunk(&mut png, b"IEND", &[]);
    fs::write(format!("{dir}/png_1x1.png"), png).unwrap();

    // Minimal BMP 1x1 24-bit
    let mut bmp = vec![0u8; 58]; // 54 header + 4 pixel (3 + 1 padding)
    bmp[0] = b'B'; bmp[1] = b'M';
    bmp[2..6].copy_from_slice(&58u32.to_le_bytes()); // file size
    bmp[10..14].copy_from_slice(&54u32.to_le_bytes()); // data offset
    bmp[14..18].copy_from_slice(&40u32.to_le_bytes()); // DIB header size
    bmp[18..22].copy_from_slice(&1i32.to_le_bytes()); // width
    bmp[22..26].copy_from_slice(&1i32.to_le_bytes()); // height
    bmp[26..28].copy_from_slice(&1u16.to_le_bytes()); // planes
    bmp[28..30].copy_from_slice(&24u16.to_le_bytes()); // bpp
    bmp[54] = 0xff; bmp[55] = 0x00; bmp[56] = 0x00; // BGR
    fs::write(format!("{dir}/bmp_1x1.bmp"), bmp).unwrap();

    // DDS 1x1 ARGB32
    let mut dds = b"DDS ".to_vec();
    let mut header = [0u32; 31];
    header[0] = 124; // header size
    header[1] = 0x1 | 0x2 | 0x4 | 0x8 | 0x1000; // caps, height, width, pitch, pixel format
    header[2] = 1; // height
    header[3] = 1; // width
    header[4] = 4; // pitch
    header[18] = 32; // pixel format size
    header[19] = 0x40 | 0x1; // RGB | ALPHAPIXELS
    header[21] = 32; // bit count
    header[22] = 0x00ff_0000;
    header[23] = 0x0000_ff00;
    header[24] = 0x0000_00ff;
    header[25] = 0xff00_0000;
    header[26] = 0x1000; // texture
    for field in header {
        dds.extend_from_slice(&field.to_le_bytes());
    }
    dds.extend_from_slice(&[0x00, 0x00, 0xff, 0x80]); // BGRA
    fs::write(format!("{dir}/dds_1x1.dds"), dds).unwrap();

    // JTEX 2x1 Rgba32 (format tag 4)
    let mut jtex = b"JTEX".to_vec();
    for field in [0u32, 2, 1, 4, 0, 0] {
        jtex.extend_from_slice(&field.to_le_bytes());
    }
    jtex.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
    fs::write(format!("{dir}/jtex_2x1.jtex"), jtex).unwrap();

    // Truncated/malformed seeds for edge coverage
    fs::write(format!("{dir}/empty.bin"), b"").unwrap();
    fs::write(format!("{dir}/png_sig_only.bin"), b"\x89PNG\r\n\x1a\n").unwrap();
    fs::write(format!("{dir}/bm_short.bin"), b"BM\x00\x00").unwrap();
    fs::write(format!("{dir}/dds_fourcc.bin"), b"DDS \x7c\x00\x00\x00").unwrap();

    println!("Generated seed corpus in {dir}/");
}
