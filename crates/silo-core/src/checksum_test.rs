use super::*;

#[test]
fn same_bytes_same_checksum() {
    let a = compute_checksum(b"indicator,year_label,value");
    let b = compute_checksum(b"indicator,year_label,value");
    assert_eq!(a, b);
}

#[test]
fn different_bytes_different_checksum() {
    let a = compute_checksum(b"one");
    let b = compute_checksum(b"two");
    assert_ne!(a, b);
}

#[test]
fn checksum_is_lowercase_hex() {
    let sum = compute_checksum(b"");
    assert_eq!(sum.len(), 64);
    assert!(sum.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    // SHA-256 of the empty string is a fixed constant.
    assert_eq!(
        sum,
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn structural_fingerprint_sensitive_to_column_order() {
    let ab = structural_fingerprint(&[
        ("indicator".to_string(), "text".to_string()),
        ("value".to_string(), "number".to_string()),
    ]);
    let ba = structural_fingerprint(&[
        ("value".to_string(), "number".to_string()),
        ("indicator".to_string(), "text".to_string()),
    ]);
    assert_ne!(ab, ba);
}

#[test]
fn structural_fingerprint_sensitive_to_type_change() {
    let text = structural_fingerprint(&[("value".to_string(), "text".to_string())]);
    let num = structural_fingerprint(&[("value".to_string(), "number".to_string())]);
    assert_ne!(text, num);
}

#[test]
fn structural_fingerprint_stable() {
    let cols = vec![
        ("indicator".to_string(), "text".to_string()),
        ("year_label".to_string(), "text".to_string()),
        ("value".to_string(), "number".to_string()),
    ];
    assert_eq!(structural_fingerprint(&cols), structural_fingerprint(&cols));
}
