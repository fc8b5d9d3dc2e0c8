//! Fuzz the request document reader and the LDAP filter builder.
//!
//!  - Arbitrary bytes are parsed as a JSON request document.
//!  - Every identifier that reaches a filter must come out with balanced
//!    parentheses and no unescaped filter metacharacters.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use samguard::filter::{equality, escape_value};
use samguard::request::RequestDocument;

#[derive(Debug, Arbitrary)]
struct FInput {
    document: Vec<u8>,
    identifier: Vec<u8>,
}

fn check_escaped(escaped: &str) {
    assert!(escaped.is_ascii());
    assert!(!escaped.contains(&['(', ')', '*', '\0'][..]));
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let hi = chars.next().unwrap();
            let lo = chars.next().unwrap();
            assert!(hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit());
        }
    }
}

fuzz_target!(|fi: FInput| {
    let escaped = escape_value(&fi.identifier);
    check_escaped(&escaped);
    let filter = equality("sAMAccountName", &fi.identifier);
    assert_eq!(filter, format!("(sAMAccountName={})", escaped));

    let data = String::from_utf8_lossy(&fi.document);
    if let Ok(doc) = RequestDocument::from_json(&data) {
        if let Ok(req) = doc.into_request() {
            if let Some(id) = req.first_value("sAMAccountName") {
                check_escaped(&escape_value(id));
            }
            let _ = req.has_object_class("computer");
            let _ = req.is_bypassed("1.3.6.1.4.1.10176.1004.0.4.1");
        }
    }
});
