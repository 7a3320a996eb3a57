#[test]
fn feq_error_expansions_compile() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/feq_error_pass.rs");
    t.pass("tests/ui/feq_error_status.rs");
}
