//! Object constructor and Object.prototype

use crate::error::{ErrorCode, JsError};
use crate::interpreter::Interpreter;
use crate::object::{
    ClassId, EnumMode, ObjectData, PropFlags, PropertyDescriptor, SlotKind, define_property,
    fill_class_members, get_member, get_own_property_descriptor, has_own_property, has_property,
    property_names,
};
use crate::value::{CheapClone, JsObjectRef, JsValue};

use super::arg;

/// Initialize Object.prototype and publish the Object constructor
pub fn init_object(interp: &mut Interpreter) {
    let proto = interp.object_prototype.clone();

    interp.register_method(&proto, "toString", object_to_string, 0);
    interp.register_method(&proto, "toLocaleString", object_to_string, 0);
    interp.register_method(&proto, "valueOf", object_value_of, 0);
    interp.register_method(&proto, "hasOwnProperty", object_has_own_property, 1);
    interp.register_method(&proto, "propertyIsEnumerable", object_property_is_enumerable, 1);
    interp.register_method(&proto, "isPrototypeOf", object_is_prototype_of, 1);

    let constructor = interp.create_constructor("Object", object_constructor_fn, object_constructor_fn, 1, &proto);

    interp.register_method(&constructor, "getPrototypeOf", object_get_prototype_of, 1);
    interp.register_method(&constructor, "create", object_create, 2);
    interp.register_method(&constructor, "defineProperty", object_define_property, 3);
    interp.register_method(&constructor, "defineProperties", object_define_properties, 2);
    interp.register_method(&constructor, "getOwnPropertyDescriptor", object_get_own_property_descriptor, 2);
    interp.register_method(&constructor, "getOwnPropertyNames", object_get_own_property_names, 1);
    interp.register_method(&constructor, "keys", object_keys, 1);
    interp.register_method(&constructor, "preventExtensions", object_prevent_extensions, 1);
    interp.register_method(&constructor, "isExtensible", object_is_extensible, 1);
    interp.register_method(&constructor, "freeze", object_freeze, 1);
    interp.register_method(&constructor, "isFrozen", object_is_frozen, 1);

    interp.define_global("Object", JsValue::Object(constructor));
}

/// Object(value) and new Object(value)
pub fn object_constructor_fn(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    match arg(args, 0) {
        JsValue::Undefined | JsValue::Null => Ok(JsValue::Object(interp.create_object())),
        value => Ok(JsValue::Object(interp.to_object(&value)?)),
    }
}

/// The object argument of an `Object.*` function
fn object_arg(args: &[JsValue], index: usize) -> Result<JsObjectRef, JsError> {
    match args.get(index) {
        Some(JsValue::Object(obj)) => Ok(obj.cheap_clone()),
        _ => Err(JsError::object_expected()),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Object.prototype
// ═══════════════════════════════════════════════════════════════════════════

pub fn object_to_string(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let class = match &this {
        JsValue::Object(obj) => obj.borrow().class_name(),
        JsValue::String(_) => ClassId::String.name(),
        JsValue::Int(_) | JsValue::Number(_) => ClassId::Number.name(),
        JsValue::Boolean(_) => ClassId::Boolean.name(),
        JsValue::Undefined | JsValue::Null => ClassId::Object.name(),
    };
    Ok(JsValue::from(format!("[object {}]", class)))
}

pub fn object_value_of(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Object(interp.to_object(&this)?))
}

pub fn object_has_own_property(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let key = interp.to_property_key(&arg(args, 0))?;
    Ok(JsValue::Boolean(has_own_property(&obj, key.as_str())?))
}

pub fn object_property_is_enumerable(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let key = interp.to_property_key(&arg(args, 0))?;
    let desc = get_own_property_descriptor(interp, &obj, key.as_str())?;
    Ok(JsValue::Boolean(
        desc.and_then(|d| d.enumerable).unwrap_or(false),
    ))
}

pub fn object_is_prototype_of(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let JsValue::Object(value) = arg(args, 0) else {
        return Ok(JsValue::Boolean(false));
    };
    let proto = interp.to_object(&this)?;
    let mut current = value.borrow().prototype.clone();
    while let Some(p) = current {
        if p == proto {
            return Ok(JsValue::Boolean(true));
        }
        current = p.borrow().prototype.clone();
    }
    Ok(JsValue::Boolean(false))
}

// ═══════════════════════════════════════════════════════════════════════════
// Object.*
// ═══════════════════════════════════════════════════════════════════════════

pub fn object_get_prototype_of(_interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = object_arg(args, 0)?;
    let proto = obj.borrow().prototype.clone();
    Ok(proto.map_or(JsValue::Null, JsValue::Object))
}

/// Object.create(proto, properties)
pub fn object_create(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let proto = match arg(args, 0) {
        JsValue::Object(proto) => Some(proto),
        JsValue::Null => None,
        _ => {
            return Err(JsError::type_error(
                ErrorCode::INVALID_PROTOTYPE,
                "Object prototype may only be an Object or null",
            ));
        }
    };
    let obj = interp.alloc(ObjectData::plain(ClassId::Object), proto);
    if let JsValue::Object(props) = arg(args, 1) {
        define_properties(interp, &obj, &props)?;
    }
    Ok(JsValue::Object(obj))
}

/// Object.defineProperty(obj, name, descriptor)
pub fn object_define_property(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = object_arg(args, 0)?;
    let name = interp.to_property_key(&arg(args, 1))?;
    let desc = to_descriptor(interp, &arg(args, 2))?;
    define_property(interp, &obj, &name, desc)?;
    Ok(JsValue::Object(obj))
}

pub fn object_define_properties(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = object_arg(args, 0)?;
    let props = object_arg(args, 1)?;
    define_properties(interp, &obj, &props)?;
    Ok(JsValue::Object(obj))
}

fn define_properties(interp: &mut Interpreter, obj: &JsObjectRef, props: &JsObjectRef) -> Result<(), JsError> {
    for name in property_names(props, EnumMode::EnumOnly)? {
        let desc_value = get_member(interp, props, name.as_str())?;
        let desc = to_descriptor(interp, &desc_value)?;
        define_property(interp, obj, &name, desc)?;
    }
    Ok(())
}

pub fn object_get_own_property_descriptor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let obj = object_arg(args, 0)?;
    let name = interp.to_property_key(&arg(args, 1))?;
    match get_own_property_descriptor(interp, &obj, name.as_str())? {
        Some(desc) => Ok(JsValue::Object(from_descriptor(interp, &desc))),
        None => Ok(JsValue::Undefined),
    }
}

pub fn object_get_own_property_names(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let obj = object_arg(args, 0)?;
    let names = property_names(&obj, EnumMode::Own)?;
    let values = names.into_iter().map(JsValue::String).collect();
    Ok(JsValue::Object(interp.create_array(values)))
}

pub fn object_keys(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = object_arg(args, 0)?;
    let names = property_names(&obj, EnumMode::EnumOnly)?;
    let values = names.into_iter().map(JsValue::String).collect();
    Ok(JsValue::Object(interp.create_array(values)))
}

pub fn object_prevent_extensions(_interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = object_arg(args, 0)?;
    obj.borrow_mut().extensible = false;
    Ok(JsValue::Object(obj))
}

pub fn object_is_extensible(_interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = object_arg(args, 0)?;
    let extensible = obj.borrow().extensible;
    Ok(JsValue::Boolean(extensible))
}

/// Object.freeze(obj): every own property becomes read-only and
/// non-configurable, and no property can be added
pub fn object_freeze(_interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = object_arg(args, 0)?;
    fill_class_members(&obj)?;
    {
        let mut o = obj.borrow_mut();
        let ids: Vec<_> = o.props.iter().filter(|(_, s)| s.kind.is_own()).map(|(id, _)| id).collect();
        for id in ids {
            if let Some(slot) = o.props.slot_mut(id) {
                let keep_writable = matches!(slot.kind, SlotKind::Accessor { .. }) && slot.flags.writable();
                slot.flags = slot
                    .flags
                    .with(PropFlags::CONFIGURABLE, false)
                    .with(PropFlags::WRITABLE, keep_writable);
            }
        }
        o.extensible = false;
    }
    Ok(JsValue::Object(obj))
}

pub fn object_is_frozen(_interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = object_arg(args, 0)?;
    fill_class_members(&obj)?;
    let o = obj.borrow();
    if o.extensible {
        return Ok(JsValue::Boolean(false));
    }
    let frozen = o.props.iter().filter(|(_, s)| s.kind.is_own()).all(|(_, s)| {
        !s.flags.configurable() && (matches!(s.kind, SlotKind::Accessor { .. }) || !s.flags.writable())
    });
    Ok(JsValue::Boolean(frozen))
}

// ═══════════════════════════════════════════════════════════════════════════
// Descriptor conversion
// ═══════════════════════════════════════════════════════════════════════════

/// ToPropertyDescriptor
pub fn to_descriptor(interp: &mut Interpreter, value: &JsValue) -> Result<PropertyDescriptor, JsError> {
    let JsValue::Object(obj) = value else {
        return Err(JsError::object_expected());
    };
    let mut desc = PropertyDescriptor::default();

    let field = |interp: &mut Interpreter, name: &str| -> Result<Option<JsValue>, JsError> {
        if has_property(obj, name)? {
            Ok(Some(get_member(interp, obj, name)?))
        } else {
            Ok(None)
        }
    };

    desc.enumerable = field(interp, "enumerable")?.map(|v| v.to_boolean());
    desc.configurable = field(interp, "configurable")?.map(|v| v.to_boolean());
    desc.value = field(interp, "value")?;
    desc.writable = field(interp, "writable")?.map(|v| v.to_boolean());

    for (name, is_getter) in [("get", true), ("set", false)] {
        let Some(accessor) = field(interp, name)? else {
            continue;
        };
        let accessor = match accessor {
            JsValue::Undefined => None,
            JsValue::Object(f) if f.borrow().is_callable() => Some(f),
            _ => return Err(JsError::function_expected()),
        };
        if is_getter {
            desc.getter = Some(accessor);
        } else {
            desc.setter = Some(accessor);
        }
    }

    if desc.is_accessor() && desc.is_data() {
        return Err(JsError::type_error(
            ErrorCode::UNSUPPORTED_ACTION,
            "Invalid property descriptor: cannot both specify accessors and a value or writable attribute",
        ));
    }
    Ok(desc)
}

/// FromPropertyDescriptor
pub fn from_descriptor(interp: &mut Interpreter, desc: &PropertyDescriptor) -> JsObjectRef {
    let obj = interp.create_object();
    let mut fields: Vec<(&str, JsValue)> = Vec::new();
    if desc.is_accessor() {
        let as_value = |f: &Option<Option<JsObjectRef>>| {
            f.clone().flatten().map_or(JsValue::Undefined, JsValue::Object)
        };
        fields.push(("get", as_value(&desc.getter)));
        fields.push(("set", as_value(&desc.setter)));
    } else {
        fields.push(("value", desc.value.clone().unwrap_or_default()));
        fields.push(("writable", JsValue::Boolean(desc.writable.unwrap_or(false))));
    }
    fields.push(("enumerable", JsValue::Boolean(desc.enumerable.unwrap_or(false))));
    fields.push(("configurable", JsValue::Boolean(desc.configurable.unwrap_or(false))));

    for (name, value) in fields {
        let key = interp.intern(name);
        obj.borrow_mut().set_own(key, value, PropFlags::ALL);
    }
    obj
}
