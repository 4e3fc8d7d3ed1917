//! Type-info projection tests

use super::create_test_engine;
use jscore::typeinfo::MemberInfo;
use jscore::TypeInfoError;

#[test]
fn test_projects_functions_and_data() {
    let mut engine = create_test_engine();
    let obj = engine
        .eval("({ count: 1, add: function(a, b) { return a + b; }, abs: Math.abs })")
        .unwrap();
    let obj = obj.as_object().unwrap().clone();

    let info = engine.type_info(&obj).unwrap();
    assert_eq!(info.class, "Object");
    assert_eq!(
        info.members,
        vec![
            MemberInfo::Data { name: "count".to_string() },
            MemberInfo::Function {
                name: "add".to_string(),
                params: vec!["a".to_string(), "b".to_string()],
            },
            MemberInfo::Function {
                name: "abs".to_string(),
                params: Vec::new(),
            },
        ]
    );
}

#[test]
fn test_hidden_members_are_skipped() {
    let mut engine = create_test_engine();
    let obj = engine
        .eval("var o = { shown: 1 }; Object.defineProperty(o, 'hidden', { value: 2 }); o")
        .unwrap();
    let obj = obj.as_object().unwrap().clone();

    let info = engine.type_info(&obj).unwrap();
    let names: Vec<&str> = info.members.iter().map(|m| m.name()).collect();
    assert_eq!(names, ["shown"]);
}

#[test]
fn test_case_collision_is_ambiguous() {
    let mut engine = create_test_engine();
    let obj = engine.eval("({ Value: 1, value: 2 })").unwrap();
    let obj = obj.as_object().unwrap().clone();

    match engine.type_info(&obj) {
        Err(TypeInfoError::Ambiguous { first, second }) => {
            assert_eq!(first, "Value");
            assert_eq!(second, "value");
        }
        other => panic!("expected an ambiguity, got {:?}", other),
    }
}

#[test]
fn test_serializes_to_json() {
    let mut engine = create_test_engine();
    let obj = engine.eval("({ run: function(x) {} })").unwrap();
    let obj = obj.as_object().unwrap().clone();

    let json = engine.type_info(&obj).unwrap().to_json();
    assert_eq!(
        json,
        r#"{"class":"Object","members":[{"kind":"function","name":"run","params":["x"]}]}"#
    );
}
