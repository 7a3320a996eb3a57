use feq_domain::roles::{Permission, Role};

#[test]
fn owner_holds_every_permission() {
    assert_eq!(Role::Owner.permissions(), Permission::all());
}

#[test]
fn seat_management_is_limited_to_owner_and_admin() {
    assert!(Role::Owner.allows(Permission::MANAGE_SEATS));
    assert!(Role::Admin.allows(Permission::MANAGE_SEATS));
    assert!(!Role::Trainer.allows(Permission::MANAGE_SEATS));
    assert!(!Role::Member.allows(Permission::MANAGE_SEATS));
}

#[test]
fn trainers_can_evaluate_but_not_manage_members() {
    assert!(Role::Trainer.allows(Permission::EVALUATE_PRACTICAL));
    assert!(Role::Trainer.allows(Permission::VIEW_ROSTER));
    assert!(!Role::Trainer.allows(Permission::MANAGE_MEMBERS));
    assert!(!Role::Admin.allows(Permission::MANAGE_BILLING));
    assert!(Role::Member.permissions().is_empty());
}

#[test]
fn roles_parse_and_serialize_lowercase() {
    assert_eq!("trainer".parse::<Role>(), Ok(Role::Trainer));
    assert!("root".parse::<Role>().is_err());
    assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    assert_eq!(serde_json::from_str::<Role>("\"owner\"").unwrap(), Role::Owner);
}
