//! Scope chains
//!
//! A scope chain is a linked list of `Scope` objects, each pointing at the
//! object consulted for that link: a function's variable object, a block's
//! bindings, a caught exception or the operand of `with`. The global object
//! ends every chain without having a link of its own.

use crate::compiler::ScopeInfo;
use crate::error::JsError;
use crate::object::{
    CaseMode, ClassId, ObjectData, PropFlags, PropId, ScopeData, SlotKind, find_own,
    find_with_prototype, prop_get, put_member,
};
use crate::value::{CheapClone, JsObjectRef, JsString, JsValue};

use super::Interpreter;

/// Flags of a declared binding
pub fn binding_flags(is_const: bool) -> PropFlags {
    if is_const {
        PropFlags::ENUMERABLE | PropFlags::CONST
    } else {
        PropFlags::WRITABLE | PropFlags::ENUMERABLE
    }
}

/// Link `object` in front of `next`
pub fn push_scope(interp: &Interpreter, object: JsObjectRef, next: Option<JsObjectRef>) -> JsObjectRef {
    interp.alloc(ObjectData::Scope(ScopeData { object, next }), None)
}

/// Object consulted by a scope link, and the link after it
fn scope_link(scope: &JsObjectRef) -> Option<(JsObjectRef, Option<JsObjectRef>)> {
    let s = scope.borrow();
    s.as_scope().map(|d| (d.object.cheap_clone(), d.next.clone()))
}

/// The link after `scope`
pub fn parent_scope(scope: &JsObjectRef) -> Option<JsObjectRef> {
    scope_link(scope).and_then(|(_, next)| next)
}

/// Find the object holding `name` along the chain, and the slot through
/// which it resolves
pub fn resolve(
    interp: &Interpreter,
    scope: Option<&JsObjectRef>,
    name: &str,
) -> Result<Option<(JsObjectRef, PropId)>, JsError> {
    let mut current = scope.cloned();
    while let Some(link) = current {
        let Some((object, next)) = scope_link(&link) else {
            break;
        };
        if let Some(id) = find_with_prototype(&object, name, CaseMode::Sensitive)? {
            return Ok(Some((object, id)));
        }
        current = next;
    }
    let global = interp.global.cheap_clone();
    Ok(find_with_prototype(&global, name, CaseMode::Sensitive)?.map(|id| (global, id)))
}

/// Value of an identifier; unresolved names raise a ReferenceError
pub fn get_identifier(
    interp: &mut Interpreter,
    scope: Option<&JsObjectRef>,
    name: &str,
) -> Result<JsValue, JsError> {
    match resolve(interp, scope, name)? {
        Some((holder, id)) => prop_get(interp, &holder, id),
        None => Err(JsError::reference_error(name)),
    }
}

/// Store a declaration's value, bypassing read-only flags of an own slot
pub fn init_binding(
    interp: &mut Interpreter,
    obj: &JsObjectRef,
    name: &JsString,
    value: JsValue,
) -> Result<(), JsError> {
    if let Some(id) = find_own(obj, name.as_str(), CaseMode::Sensitive)? {
        let mut o = obj.borrow_mut();
        if let Some(slot) = o.props.slot_mut(id)
            && matches!(slot.kind, SlotKind::Value(_))
        {
            slot.kind = SlotKind::Value(value);
            return Ok(());
        }
    }
    put_member(interp, obj, name, value)
}

/// Initialize the innermost block binding of `name`, falling back to the
/// variable object
pub fn init_lexical(
    interp: &mut Interpreter,
    scope: Option<&JsObjectRef>,
    var_obj: &JsObjectRef,
    name: &JsString,
    value: JsValue,
) -> Result<(), JsError> {
    let mut current = scope.cloned();
    while let Some(link) = current {
        let Some((object, next)) = scope_link(&link) else {
            break;
        };
        let owns = {
            let o = object.borrow();
            o.class() == ClassId::Variables
                && o.props
                    .find(name.as_str(), CaseMode::Sensitive)
                    .and_then(|id| o.props.kind(id))
                    .is_some_and(|k| !k.is_deleted())
        };
        if owns {
            return init_binding(interp, &object, name, value);
        }
        current = next;
    }
    init_binding(interp, var_obj, name, value)
}

/// Fresh bindings of a block, all `undefined`
pub fn create_block_scope(interp: &Interpreter, info: &ScopeInfo) -> JsObjectRef {
    let vars = interp.alloc(ObjectData::plain(ClassId::Variables), None);
    {
        let mut v = vars.borrow_mut();
        for local in &info.names {
            v.props.add(
                local.name.cheap_clone(),
                binding_flags(local.is_const),
                SlotKind::Value(JsValue::Undefined),
            );
        }
    }
    vars
}

/// Bindings object holding a caught exception
pub fn create_catch_scope(interp: &Interpreter, name: &JsString, value: JsValue) -> JsObjectRef {
    let vars = interp.alloc(ObjectData::plain(ClassId::Variables), None);
    vars.borrow_mut().props.add(
        name.cheap_clone(),
        binding_flags(false),
        SlotKind::Value(value),
    );
    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::LocalVar;
    use crate::interpreter::EngineConfig;

    #[test]
    fn test_resolve_walks_links_then_global() {
        let mut interp = Interpreter::new(EngineConfig::default());
        let outer = create_catch_scope(&interp, &JsString::from("a"), JsValue::Int(1));
        let inner = create_catch_scope(&interp, &JsString::from("b"), JsValue::Int(2));
        let chain = push_scope(&interp, outer, None);
        let chain = push_scope(&interp, inner, Some(chain));

        let a = get_identifier(&mut interp, Some(&chain), "a").unwrap();
        assert_eq!(a, JsValue::Int(1));
        let b = get_identifier(&mut interp, Some(&chain), "b").unwrap();
        assert_eq!(b, JsValue::Int(2));

        interp.define_global("g", JsValue::Int(3));
        let g = get_identifier(&mut interp, Some(&chain), "g").unwrap();
        assert_eq!(g, JsValue::Int(3));

        let missing = get_identifier(&mut interp, Some(&chain), "nope");
        assert!(matches!(missing, Err(JsError::Runtime { .. })));
    }

    #[test]
    fn test_init_lexical_targets_innermost_block() {
        let mut interp = Interpreter::new(EngineConfig::default());
        let info = ScopeInfo {
            names: vec![LocalVar {
                name: JsString::from("x"),
                is_const: true,
            }],
        };
        let block = create_block_scope(&interp, &info);
        let chain = push_scope(&interp, block.cheap_clone(), None);
        let global = interp.global.cheap_clone();

        init_lexical(&mut interp, Some(&chain), &global, &JsString::from("x"), JsValue::Int(7)).unwrap();
        assert_eq!(block.borrow().own_value("x"), Some(JsValue::Int(7)));
        assert!(global.borrow().own_value("x").is_none());
    }
}
