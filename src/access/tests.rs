use super::*;
use proptest::prelude::*;

#[test]
fn test_qualify_user_id() {
    assert_eq!(qualify_user_id("5511999990000"), "5511999990000@c.us");
    assert_eq!(qualify_user_id("+55 11-9999"), "55119999@c.us");
    assert_eq!(qualify_user_id(" 123@c.us "), "123@c.us");
    assert_eq!(qualify_user_id("123@s.whatsapp.net"), "123@s.whatsapp.net");
}

#[test]
fn test_authorize_denied_is_unauthorized() {
    let wl = Whitelist::new(&["5511"]);
    assert!(authorize("5511@c.us", "5511@c.us", false, &wl).is_ok());
    assert!(matches!(
        authorize("5522@c.us", "5522@c.us", false, &wl),
        Err(BridgeError::Unauthorized)
    ));
    assert!(matches!(
        authorize("1203@g.us", "5511@c.us", true, &wl),
        Err(BridgeError::Unauthorized)
    ));
}

#[test]
fn test_group_always_rejected() {
    let empty = Whitelist::default();
    assert!(!allow("120363@g.us", "5511@c.us", true, &empty));
    assert!(!allow("120363@g.us", "5511@c.us", false, &empty));
    assert!(!allow("5511@c.us", "5511@c.us", true, &empty));

    let listed = Whitelist::new(&["5511"]);
    assert!(!allow("120363@g.us", "5511@c.us", true, &listed));
}

#[test]
fn test_empty_whitelist_allows_direct() {
    assert!(allow("5511@c.us", "5511@c.us", false, &Whitelist::default()));
}

#[test]
fn test_whitelist_exact_match() {
    let wl = Whitelist::new(&["+55 11 99999-0000", "5521888887777"]);
    assert_eq!(wl.len(), 2);
    assert!(allow(
        "5511999990000@c.us",
        "5511999990000@c.us",
        false,
        &wl
    ));
    assert!(allow("5521888887777@c.us", "5521888887777@c.us", false, &wl));
    assert!(!allow("5511999990001@c.us", "5511999990001@c.us", false, &wl));
    // no prefix or substring matching
    assert!(!allow("551199999@c.us", "551199999@c.us", false, &wl));
}

#[test]
fn test_from_csv_skips_blank_entries() {
    let wl = Whitelist::from_csv("5511, ,5522,,");
    assert_eq!(wl.len(), 2);
    assert!(wl.contains("5511@c.us"));
    assert!(wl.contains("5522@c.us"));
    assert_eq!(wl.entries(), ["5511@c.us", "5522@c.us"]);
    assert!(Whitelist::from_csv("").is_empty());
}

proptest! {
    #[test]
    fn prop_groups_never_allowed(id in "[0-9]{5,15}", sender in "[0-9]{5,15}") {
        let conv = format!("{id}@g.us");
        let sender = format!("{sender}@c.us");
        prop_assert!(!allow(&conv, &sender, false, &Whitelist::default()));
        prop_assert!(!allow(&conv, &sender, true, &Whitelist::new(&[sender.as_str()])));
    }

    #[test]
    fn prop_unlisted_sender_denied(listed in "[0-9]{8,12}", other in "[0-9]{8,12}") {
        prop_assume!(listed != other);
        let wl = Whitelist::new(&[listed.as_str()]);
        let sender = format!("{other}@c.us");
        prop_assert!(!allow(&sender, &sender, false, &wl));
    }
}
