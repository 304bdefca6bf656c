//! Skeletons of compiled units, shaped like the ones built from source.

use crate::stubs::{
    ClassHeader, MethodHeader, class_stub, enum_constant_stub, field_stub, file_stub, method_stub,
    param_stub,
};
use lathe_api::{BinaryUnit, ClassDescriptor, ClassFlavor, MethodDescriptor, StubNode};

pub fn unit_skeleton(unit: &BinaryUnit) -> StubNode {
    let mut file = file_stub(unit.class.package());
    file.push(class(unit));
    file
}

fn is_interface(flavor: ClassFlavor) -> bool {
    matches!(flavor, ClassFlavor::Interface | ClassFlavor::Annotation)
}

fn class(unit: &BinaryUnit) -> StubNode {
    let desc = &unit.class;
    let (extends, implements) = if is_interface(desc.flavor) {
        (desc.interfaces.clone(), Vec::new())
    } else {
        (desc.super_class.iter().cloned().collect(), desc.interfaces.clone())
    };
    let mut stub = class_stub(ClassHeader {
        name: desc.simple_name().to_string(),
        flavor: Some(desc.flavor),
        modifiers: desc.modifiers.clone(),
        annotations: desc.annotations.clone(),
        type_params: desc.type_params.clone(),
        extends,
        implements,
    });

    for field in desc.fields.iter().filter(|f| f.enum_constant) {
        stub.push(enum_constant_stub(&field.name));
    }
    for field in desc.fields.iter().filter(|f| !f.enum_constant && !f.synthetic) {
        let mut modifiers = field.modifiers.clone();
        if is_interface(desc.flavor) {
            modifiers.retain(|m| !matches!(m.as_str(), "public" | "static" | "final"));
        }
        stub.push(field_stub(
            &field.name,
            &field.type_name,
            modifiers,
            field.annotations.clone(),
            field.constant.clone(),
        ));
    }
    for method in desc.methods.iter().filter(|m| is_visible(desc, m)) {
        stub.push(method_node(desc, method));
    }
    for nested in &unit.nested {
        stub.push(class(nested));
    }
    stub
}

/// Compiler-generated members have no source counterpart.
fn is_visible(desc: &ClassDescriptor, method: &MethodDescriptor) -> bool {
    if method.synthetic || method.is_static_initializer() {
        return false;
    }
    if desc.flavor == ClassFlavor::Enum && method.modifiers.iter().any(|m| m == "static") {
        let generated = match method.name.as_str() {
            "values" => method.params.is_empty(),
            "valueOf" => method.params.len() == 1 && method.params[0] == "java.lang.String",
            _ => false,
        };
        return !generated;
    }
    true
}

fn method_node(desc: &ClassDescriptor, method: &MethodDescriptor) -> StubNode {
    let interface = is_interface(desc.flavor);
    let mut modifiers = method.modifiers.clone();
    if interface {
        let is_abstract = modifiers.iter().any(|m| m == "abstract");
        let is_static = modifiers.iter().any(|m| m == "static");
        let is_private = modifiers.iter().any(|m| m == "private");
        modifiers.retain(|m| !matches!(m.as_str(), "public" | "abstract"));
        if !is_abstract && !is_static && !is_private {
            modifiers.push("default".to_string());
        }
    }

    let mut params: &[String] = &method.params;
    if method.is_constructor() && !method.from_signature {
        // Descriptor-only constructors carry parameters javac adds.
        let hidden = if desc.flavor == ClassFlavor::Enum {
            2
        } else if desc.own_inner_entry().is_some_and(|e| {
            e.outer.is_some() && !desc.modifiers.iter().any(|m| m == "static")
        }) && !interface
        {
            1
        } else {
            0
        };
        params = &params[hidden.min(params.len())..];
    }

    let mut stub = method_stub(MethodHeader {
        name: if method.is_constructor() {
            desc.simple_name().to_string()
        } else {
            method.name.clone()
        },
        modifiers,
        annotations: method.annotations.clone(),
        type_params: method.type_params.clone(),
        returns: (!method.is_constructor()).then(|| method.return_type.clone()),
        throws: method.throws.clone(),
        default: None,
    });
    for (i, param) in params.iter().enumerate() {
        stub.push(param_stub(&format!("arg{i}"), param, Vec::new(), Vec::new()));
    }
    stub
}

#[cfg(test)]
mod tests {
    use super::*;
    use lathe_api::{FieldDescriptor, InnerClassEntry, StubKind};
    use lathe_api::models::attr;

    fn method(name: &str, params: &[&str], modifiers: &[&str]) -> MethodDescriptor {
        MethodDescriptor {
            name: name.to_string(),
            type_params: None,
            return_type: "void".to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            varargs: false,
            throws: Vec::new(),
            modifiers: modifiers.iter().map(|m| m.to_string()).collect(),
            annotations: Vec::new(),
            synthetic: false,
            from_signature: false,
        }
    }

    fn class(name: &str, flavor: ClassFlavor) -> ClassDescriptor {
        ClassDescriptor {
            name: name.to_string(),
            flavor,
            modifiers: vec!["public".to_string()],
            annotations: Vec::new(),
            type_params: None,
            super_class: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            inner_classes: Vec::new(),
        }
    }

    #[test]
    fn test_enum_hides_generated_members() {
        let mut color = class("p.Color", ClassFlavor::Enum);
        color.fields.push(FieldDescriptor {
            name: "RED".to_string(),
            type_name: "p.Color".to_string(),
            modifiers: vec!["public".into(), "static".into(), "final".into()],
            annotations: Vec::new(),
            constant: None,
            enum_constant: true,
            synthetic: false,
        });
        color.methods.push(method("values", &[], &["public", "static"]));
        color.methods.push(method("valueOf", &["java.lang.String"], &["public", "static"]));
        color.methods.push(method("<init>", &["java.lang.String", "int", "int"], &["private"]));
        color.methods.push(method("<clinit>", &[], &["static"]));

        let file = unit_skeleton(&BinaryUnit::leaf(color));
        assert_eq!(file.str_attr(attr::PACKAGE), Some("p"));
        let stub = &file.children[0];
        let kinds: Vec<_> = stub.children.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![StubKind::EnumConstant, StubKind::Constructor]);
        let ctor = &stub.children[1];
        assert_eq!(ctor.name(), Some("Color"));
        assert_eq!(ctor.children.len(), 1);
        assert_eq!(ctor.children[0].str_attr(attr::TYPE), Some("int"));
    }

    #[test]
    fn test_inner_class_constructor_drops_outer_instance() {
        let mut inner = class("p.Outer$Inner", ClassFlavor::Class);
        inner.inner_classes.push(InnerClassEntry {
            inner: "p.Outer$Inner".to_string(),
            outer: Some("p.Outer".to_string()),
            simple_name: Some("Inner".to_string()),
            modifiers: vec!["public".to_string()],
        });
        inner.methods.push(method("<init>", &["p.Outer", "int"], &["public"]));
        let stub = unit_skeleton(&BinaryUnit::leaf(inner));
        let class = &stub.children[0];
        assert_eq!(class.name(), Some("Inner"));
        assert_eq!(class.children[0].children.len(), 1);
    }

    #[test]
    fn test_interface_methods_get_default() {
        let mut api = class("Api", ClassFlavor::Interface);
        api.interfaces.push("java.lang.Runnable".to_string());
        api.methods.push(method("run", &[], &["public", "abstract"]));
        api.methods.push(method("log", &[], &["public"]));
        let stub = unit_skeleton(&BinaryUnit::leaf(api));
        assert!(stub.str_attr(attr::PACKAGE).is_none());
        let iface = &stub.children[0];
        assert_eq!(iface.list_attr(attr::EXTENDS), ["java.lang.Runnable"]);
        assert!(iface.children[0].list_attr(attr::MODIFIERS).is_empty());
        assert_eq!(iface.children[1].list_attr(attr::MODIFIERS), ["default"]);
    }
}
