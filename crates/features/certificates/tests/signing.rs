use chrono::{TimeZone, Utc};
use feq_certificates::{CertificatePayload, CertificateSigner};
use proptest::prelude::*;
use uuid::Uuid;

fn payload(learner: String, score: f64) -> CertificatePayload {
    let issued_at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    CertificatePayload {
        enrollment_id: Uuid::nil(),
        learner,
        course: "Forklift Operator".to_owned(),
        score,
        issued_at,
        expires_at: issued_at + chrono::Duration::days(1095),
        code: "ABCDEFGH23".to_owned(),
    }
}

fn replace_at(text: &str, idx: usize, ch: char) -> String {
    text.chars().enumerate().map(|(i, c)| if i == idx { ch } else { c }).collect()
}

#[test]
fn signatures_are_lowercase_hex() {
    let signer = CertificateSigner::new("secret").unwrap();
    let signed = signer.sign_payload(&payload("Ana".to_owned(), 0.9)).unwrap();
    assert_eq!(signed.signature.len(), 64);
    assert!(signed.signature.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    assert!(signer.verify_payload(&signed.json, &signed.signature));
}

#[test]
fn other_secrets_do_not_verify() {
    let signed = CertificateSigner::new("secret")
        .unwrap()
        .sign_payload(&payload("Ana".to_owned(), 0.9))
        .unwrap();
    let other = CertificateSigner::new("another").unwrap();
    assert!(!other.verify_payload(&signed.json, &signed.signature));
    assert!(!other.verify_payload(&signed.json, &signed.signature.to_uppercase()));
    assert!(!other.verify_payload(&signed.json, ""));
}

proptest! {
    #[test]
    fn any_json_mutation_fails(
        learner in "[A-Za-z ]{1,40}",
        score in 0.0f64..=1.0,
        pos in any::<prop::sample::Index>(),
        ch in prop::char::range('!', '~'),
    ) {
        let signer = CertificateSigner::new("secret").unwrap();
        let signed = signer.sign_payload(&payload(learner, score)).unwrap();
        prop_assert!(signer.verify_payload(&signed.json, &signed.signature));

        let idx = pos.index(signed.json.chars().count());
        prop_assume!(signed.json.chars().nth(idx) != Some(ch));
        let tampered = replace_at(&signed.json, idx, ch);
        prop_assert!(!signer.verify_payload(&tampered, &signed.signature));
    }

    #[test]
    fn any_signature_mutation_fails(
        pos in 0usize..64,
        ch in prop::char::range('0', 'z'),
    ) {
        let signer = CertificateSigner::new("secret").unwrap();
        let signed = signer.sign_payload(&payload("Ana".to_owned(), 1.0)).unwrap();

        prop_assume!(signed.signature.chars().nth(pos) != Some(ch));
        let tampered = replace_at(&signed.signature, pos, ch);
        prop_assert!(!signer.verify_payload(&signed.json, &tampered));
    }
}
