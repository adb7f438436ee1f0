use tabledb::{Field, FieldKind, Schema, SchemaRegistry, TableError, Value, IDENTITY_FIELD};

#[test]
fn builtin_kinds() {
    let registry = SchemaRegistry::new();
    assert_eq!(registry.kinds(), vec!["DemoData", "ScoreData", "VersionData"]);

    let demo = registry.resolve("DemoData").unwrap();
    assert_eq!(demo.header(), vec!["UserID", "Name", "Score"]);
    assert_eq!(demo.field("Name").unwrap().kind, FieldKind::Text);
    assert_eq!(demo.field("Score").unwrap().kind, FieldKind::Integer);

    let version = registry.resolve("VersionData").unwrap();
    assert_eq!(version.header(), vec!["UserID", "Version"]);
}

#[test]
fn unknown_kind() {
    let registry = SchemaRegistry::new();
    assert!(matches!(
        registry.resolve("Nope"),
        Err(TableError::UnknownKind(kind)) if kind == "Nope"
    ));
}

// resolving twice hands out the same descriptor
#[test]
fn resolve_is_shared() {
    let registry = SchemaRegistry::new();
    let a = registry.resolve("ScoreData").unwrap();
    let b = registry.resolve("ScoreData").unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
}

#[test]
fn identity_field_comes_first() {
    let schema = Schema::new("PlayerData", vec![Field::new("Level", FieldKind::Integer)]).unwrap();
    assert_eq!(schema.fields()[0].name, IDENTITY_FIELD);
    assert_eq!(schema.index_of("UserID").unwrap(), 0);
    assert_eq!(schema.index_of("Level").unwrap(), 1);
    assert_eq!(schema.len(), 2);
    assert!(!schema.is_empty());
    assert!(matches!(schema.index_of("Score"), Err(TableError::UnknownField(_))));
}

#[test]
fn invalid_schemas() {
    let cases = vec![
        ("", vec![]),
        ("A", vec![Field::new("", FieldKind::Text)]),
        ("A", vec![Field::new("x,y", FieldKind::Text)]),
        ("A", vec![Field::new(IDENTITY_FIELD, FieldKind::Integer)]),
        (
            "A",
            vec![
                Field::new("Score", FieldKind::Integer),
                Field::new("Score", FieldKind::Text),
            ],
        ),
    ];
    for (kind, fields) in cases {
        assert!(matches!(
            Schema::new(kind, fields),
            Err(TableError::InvalidSchema { .. })
        ));
    }
}

#[test]
fn register_custom_kind() {
    let mut registry = SchemaRegistry::new();
    registry
        .register("PlayerData", vec![Field::new("Level", FieldKind::Integer)])
        .unwrap();
    let schema = registry.resolve("PlayerData").unwrap();
    assert_eq!(schema.kind(), "PlayerData");
    assert!(schema.has_field("Level"));
    assert!(!schema.has_field("Score"));
}

#[test]
fn default_values() {
    let schema = SchemaRegistry::new().resolve("DemoData").unwrap();
    assert_eq!(
        schema.default_values("u1"),
        vec![
            Value::Text("u1".to_string()),
            Value::Text("sample".to_string()),
            Value::Integer(0),
        ]
    );
}

#[test]
fn value_parsing() {
    assert_eq!(Value::parse("-12"), Value::Integer(-12));
    assert_eq!(Value::parse("12a"), Value::Text("12a".to_string()));
    assert_eq!(Value::parse(""), Value::Text(String::new()));
    assert_eq!(Value::parse("7").as_integer(), Some(7));
    assert_eq!(Value::parse("x").as_integer(), None);
    assert_eq!(Value::Integer(-3).to_string(), "-3");

    let score = Field::new("Score", FieldKind::Integer);
    let name = Field::new("Name", FieldKind::Text);
    assert_eq!(Value::parse_for(&score, "5").unwrap(), Value::Integer(5));
    assert!(matches!(
        Value::parse_for(&score, "five"),
        Err(TableError::InvalidValue { field, value }) if field == "Score" && value == "five"
    ));
    assert_eq!(Value::parse_for(&name, "five").unwrap().to_string(), "five");
    assert_eq!(Value::parse_for(&name, "5").unwrap().to_string(), "5");
    assert_eq!(Value::parse_for(&name, "007").unwrap(), Value::Text("007".into()));
    assert_eq!(Value::parse_for(&name, "+5").unwrap(), Value::Text("+5".into()));
    assert_eq!(Value::parse_for(&score, "+5").unwrap(), Value::Integer(5));
}

#[test]
fn field_kind_serde() {
    let field: Field = serde_json::from_str(r#"{ "name": "Level", "kind": "integer" }"#).unwrap();
    assert_eq!(field, Field::new("Level", FieldKind::Integer));
    assert_eq!(
        serde_json::to_string(&FieldKind::Text).unwrap(),
        r#""text""#
    );
}
