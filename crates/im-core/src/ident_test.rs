use super::*;

#[test]
fn test_plain_name() {
    let ident = SqlIdent::parse("group_messages").unwrap();
    assert_eq!(ident.as_str(), "group_messages");
    assert_eq!(ident.name(), "group_messages");
    assert_eq!(ident.schema(), None);
    assert_eq!(ident.quoted(), r#""group_messages""#);
}

#[test]
fn test_schema_qualified() {
    let ident = SqlIdent::parse("chat.group_messages").unwrap();
    assert_eq!(ident.schema(), Some("chat"));
    assert_eq!(ident.name(), "group_messages");
    assert_eq!(ident.quoted(), r#""chat"."group_messages""#);
}

#[test]
fn test_rejects_injection() {
    assert!(SqlIdent::parse("users; DROP TABLE users").is_err());
    assert!(SqlIdent::parse(r#"my"table"#).is_err());
    assert!(SqlIdent::parse("a b").is_err());
}

#[test]
fn test_rejects_malformed() {
    assert!(SqlIdent::parse("").is_err());
    assert!(SqlIdent::parse("1table").is_err());
    assert!(SqlIdent::parse("a.b.c").is_err());
    assert!(SqlIdent::parse(".table").is_err());
    assert!(SqlIdent::parse("schema.").is_err());
    assert!(SqlIdent::parse(&"x".repeat(64)).is_err());
}

#[test]
fn test_accepts_underscore_and_digits() {
    assert!(SqlIdent::parse("_private").is_ok());
    assert!(SqlIdent::parse("table_2").is_ok());
    assert!(SqlIdent::parse(&"x".repeat(63)).is_ok());
}

#[test]
fn test_deserialize_validates() {
    let ok: SqlIdent = serde_yaml::from_str("public_id").unwrap();
    assert_eq!(ok, "public_id");

    let err = serde_yaml::from_str::<SqlIdent>("\"bad name\"");
    assert!(err.is_err());
}
