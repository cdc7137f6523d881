#![no_main]
use libfuzzer_sys::fuzz_target;
use zentex::*;

fuzz_target!(|data: &[u8]| {
    // If we can decode it, re-encoding and decoding again must produce identical pixels
    let limits = Limits {
        max_pixels: Some(1 << 20),
        ..Limits::default()
    };
    let Ok(decoded) = DecodeRequest::new(data)
        .with_limits(limits)
        .decode(enough::Unstoppable)
    else {
        return;
    };

    // JTEX keeps every format bit for bit
    let jtex = EncodeRequest::jtex()
        .encode(&decoded, enough::Unstoppable)
        .expect("JTEX encode of a decoded image");
    let Ok(decoded2) = decode(&jtex, enough::Unstoppable) else {
        panic!("re-encoded JTEX failed to decode");
    };
    assert_eq!(decoded, decoded2, "JTEX roundtrip mismatch");

    // PNG only writes 8-bit samples
    let Ok(png) = EncodeRequest::png().encode(&decoded, enough::Unstoppable) else {
        return;
    };
    let Ok(decoded3) = decode(&png, enough::Unstoppable) else {
        panic!("re-encoded PNG failed to decode");
    };
    let expected = decoded.to_truecolor().expect("expand palette");
    let actual = decoded3.to_truecolor().expect("expand palette");
    assert_eq!(expected.width(), actual.width());
    assert_eq!(expected.height(), actual.height());
    if expected.format() == actual.format() {
        assert_eq!(expected.pixels(), actual.pixels(), "PNG roundtrip pixel mismatch");
    }
});
