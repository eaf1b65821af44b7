pub fn fixed_xor(buf1: &[u8], buf2: &[u8]) -> Vec<u8> {
    assert_eq!(buf1.len(), buf2.len());
    buf1.iter()
        .zip(buf2.iter())
        .map(|(x,y)| x ^ y)
        .collect()
}

#[test]
fn test_fixed_xor() {
    let case_buf1 = hex!("1c0111001f010100061a024b53535009181c");
    let case_buf2 = hex!("686974207468652062756c6c277320657965");
    let expected = hex!("746865206b696420646f6e277420706c6179");
    let result = fixed_xor(&case_buf1, &case_buf2);
    assert_eq!(result, expected);
}

// Keystream modes hand over a final block that may be shorter than the stream block
pub fn truncating_xor(buf: &[u8], keystream: &[u8]) -> Vec<u8> {
    assert!(keystream.len() >= buf.len());
    fixed_xor(buf, &keystream[..buf.len()])
}

#[test]
fn test_truncating_xor() {
    let result = truncating_xor(b"\x01\x02\x03", b"\x01\x01\x01\xff");
    assert_eq!(b"\x00\x03\x02".to_vec(), result);
}

pub fn byte_xor(buf: &[u8], b: u8) -> Vec<u8> {
    buf.iter()
        .map(|x| x ^ b )
        .collect()
}

#[test]
fn test_byte_xor() {
    assert_eq!(vec![0x03, 0x00, 0xfe], byte_xor(&[0x02, 0x01, 0xff], 0x01));
}
