use feq_domain::constants::{AB_VARIANT_COOKIE, AB_VARIANT_MAX_AGE_SECS, ENROLLMENTS, RPC_ALLOCATE_SEAT};

#[test]
fn constants_match_schema_names() {
    assert_eq!(ENROLLMENTS, "enrollments");
    assert_eq!(RPC_ALLOCATE_SEAT, "allocate_seat");
    assert_eq!(AB_VARIANT_COOKIE, "ab_variant");
    assert_eq!(AB_VARIANT_MAX_AGE_SECS, 7_776_000);
}
