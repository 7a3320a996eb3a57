use feq_commerce::WebhookVerifier;
use proptest::prelude::*;

const NOW: i64 = 1_760_000_000;
const BODY: &[u8] = b"{}";

fn verifier() -> WebhookVerifier {
    WebhookVerifier::new("whsec_property", 300)
}

proptest! {
    #[test]
    fn signed_payloads_verify(payload in proptest::collection::vec(any::<u8>(), 0..512), age in 0i64..=300) {
        let header = verifier().sign(NOW - age, &payload).unwrap();
        prop_assert!(verifier().verify(&header, &payload, NOW).is_ok());
    }

    #[test]
    fn flipped_bytes_are_rejected(
        payload in proptest::collection::vec(any::<u8>(), 1..512),
        index in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let header = verifier().sign(NOW, &payload).unwrap();
        let mut tampered = payload.clone();
        let at = index.index(tampered.len());
        tampered[at] ^= flip;
        prop_assert!(verifier().verify(&header, &tampered, NOW).is_err());
    }

    #[test]
    fn old_signatures_expire(age in 301i64..100_000) {
        let header = verifier().sign(NOW - age, BODY).unwrap();
        prop_assert!(verifier().verify(&header, BODY, NOW).is_err());
    }
}

#[test]
fn any_matching_v1_entry_is_accepted() {
    let good = verifier().sign(NOW, BODY).unwrap();
    let v1 = good.split(",v1=").nth(1).unwrap();
    let rotated = format!("t={NOW},v1={},v1={v1}", "00".repeat(32));
    assert!(verifier().verify(&rotated, BODY, NOW).is_ok());
    assert!(verifier().verify(&format!("v1={v1}"), BODY, NOW).is_err());
}

#[test]
fn extreme_timestamps_are_stale_not_fatal() {
    let v1 = "00".repeat(32);
    for t in [i64::MIN, i64::MAX] {
        let header = format!("t={t},v1={v1}");
        assert!(verifier().verify(&header, BODY, NOW).is_err(), "{t}");
        assert!(verifier().verify(&header, BODY, i64::MIN).is_err(), "{t}");
    }
}
