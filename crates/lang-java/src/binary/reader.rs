//! Decodes class-file bytes into a [`ClassDescriptor`].

use super::converter::{JavaModifierConverter, JavaTypeConverter, source_name, varargs};
use super::signature::{parse_class_signature, parse_field_signature, parse_method_signature};
use lathe_api::{
    ClassDescriptor, ClassFlavor, FieldDescriptor, FormatError, FormatResult, InnerClassEntry,
    MethodDescriptor,
};
use ristretto_classfile::attributes::Attribute;
use ristretto_classfile::{
    ClassAccessFlags, ClassFile, Constant, ConstantPool, FieldAccessFlags, FieldType,
    MethodAccessFlags,
};
use std::io::Cursor;

const NESTED_INTERFACE: u16 = 0x0200;
const NESTED_ENUM: u16 = 0x4000;

fn malformed(context: &str, err: impl std::fmt::Debug) -> FormatError {
    FormatError::Malformed(format!("{context}: {err:?}"))
}

fn utf8(pool: &ConstantPool, index: u16) -> FormatResult<String> {
    pool.try_get_utf8(index)
        .map(|s| s.to_string())
        .map_err(|e| malformed("utf8 constant", e))
}

/// Dotted binary name of a `Class` constant, `$` kept.
fn class_name(pool: &ConstantPool, index: u16) -> FormatResult<String> {
    match pool.get(index) {
        Some(Constant::Class(name_index)) => Ok(utf8(pool, *name_index)?.replace('/', ".")),
        other => Err(FormatError::Malformed(format!(
            "expected class constant at #{index}, found {other:?}"
        ))),
    }
}

fn signature_of(pool: &ConstantPool, attributes: &[Attribute]) -> FormatResult<Option<String>> {
    for attribute in attributes {
        if let Attribute::Signature {
            signature_index, ..
        } = attribute
        {
            return Ok(Some(utf8(pool, *signature_index)?));
        }
    }
    Ok(None)
}

fn annotations_of(pool: &ConstantPool, attributes: &[Attribute]) -> FormatResult<Vec<String>> {
    let mut out = Vec::new();
    for attribute in attributes {
        if let Attribute::RuntimeVisibleAnnotations { annotations, .. } = attribute {
            for annotation in annotations {
                let descriptor = utf8(pool, annotation.type_index)?;
                let internal = descriptor
                    .strip_prefix('L')
                    .and_then(|d| d.strip_suffix(';'))
                    .unwrap_or(&descriptor);
                out.push(format!("@{}", source_name(internal)));
            }
        }
    }
    Ok(out)
}

fn has_synthetic_attribute(attributes: &[Attribute]) -> bool {
    attributes
        .iter()
        .any(|a| matches!(a, Attribute::Synthetic { .. }))
}

pub fn read_class(bytes: &[u8]) -> FormatResult<ClassDescriptor> {
    let class = ClassFile::from_bytes(&mut Cursor::new(bytes.to_vec()))
        .map_err(|e| malformed("class file", e))?;
    let pool = &class.constant_pool;
    let flags = class.access_flags;

    let name = class_name(pool, class.this_class)?;
    let flavor = if flags.contains(ClassAccessFlags::ANNOTATION) {
        ClassFlavor::Annotation
    } else if flags.contains(ClassAccessFlags::INTERFACE) {
        ClassFlavor::Interface
    } else if flags.contains(ClassAccessFlags::ENUM) {
        ClassFlavor::Enum
    } else {
        ClassFlavor::Class
    };

    let inner_classes = inner_classes(pool, &class.attributes)?;

    let mut super_class = if class.super_class == 0 {
        None
    } else {
        Some(class_name(pool, class.super_class)?)
    };
    let mut interfaces = class
        .interfaces
        .iter()
        .map(|index| class_name(pool, *index))
        .collect::<FormatResult<Vec<_>>>()?;
    let mut type_params = None;

    match signature_of(pool, &class.attributes)? {
        Some(signature) => match parse_class_signature(&signature) {
            Ok(parsed) => {
                type_params = parsed.type_params;
                super_class = parsed.super_class;
                interfaces = parsed.interfaces;
            }
            Err(e) => tracing::debug!("Ignoring class signature of {}: {}", name, e),
        },
        None => {
            super_class = super_class.map(|s| source_name(&s));
            interfaces = interfaces.iter().map(|i| source_name(i)).collect();
        }
    }

    let implied_super = match flavor {
        ClassFlavor::Enum => "java.lang.Enum",
        _ => "java.lang.Object",
    };
    if super_class
        .as_deref()
        .is_some_and(|s| s == "java.lang.Object" || s.starts_with(implied_super))
    {
        super_class = None;
    }
    if flavor == ClassFlavor::Annotation {
        interfaces.retain(|i| i != "java.lang.annotation.Annotation");
    }

    let mut descriptor = ClassDescriptor {
        name,
        flavor,
        modifiers: Vec::new(),
        annotations: annotations_of(pool, &class.attributes)?,
        type_params,
        super_class,
        interfaces,
        fields: Vec::new(),
        methods: Vec::new(),
        inner_classes,
    };
    descriptor.modifiers = match descriptor.own_inner_entry() {
        Some(entry) => entry.modifiers.clone(),
        None => JavaModifierConverter::parse_class(flags),
    };

    for field in &class.fields {
        descriptor.fields.push(read_field(pool, field)?);
    }
    for method in &class.methods {
        descriptor.methods.push(read_method(pool, method)?);
    }
    Ok(descriptor)
}

fn inner_classes(pool: &ConstantPool, attributes: &[Attribute]) -> FormatResult<Vec<InnerClassEntry>> {
    let mut out = Vec::new();
    for attribute in attributes {
        let Attribute::InnerClasses { classes, .. } = attribute else {
            continue;
        };
        for row in classes {
            let bits = row.access_flags.bits();
            out.push(InnerClassEntry {
                inner: class_name(pool, row.class_info_index)?,
                outer: if row.outer_class_info_index == 0 {
                    None
                } else {
                    Some(class_name(pool, row.outer_class_info_index)?)
                },
                simple_name: if row.name_index == 0 {
                    None
                } else {
                    Some(utf8(pool, row.name_index)?)
                },
                modifiers: JavaModifierConverter::parse_nested(
                    bits,
                    bits & NESTED_INTERFACE != 0,
                    bits & NESTED_ENUM != 0,
                ),
            });
        }
    }
    Ok(out)
}

fn read_field(pool: &ConstantPool, field: &ristretto_classfile::Field) -> FormatResult<FieldDescriptor> {
    let name = utf8(pool, field.name_index)?;
    let mut type_name = JavaTypeConverter::convert_type(&field.field_type);
    if let Some(signature) = signature_of(pool, &field.attributes)? {
        match parse_field_signature(&signature) {
            Ok(rendered) => type_name = rendered,
            Err(e) => tracing::debug!("Ignoring signature of field {}: {}", name, e),
        }
    }
    let mut constant = None;
    for attribute in &field.attributes {
        if let Attribute::ConstantValue {
            constant_value_index,
            ..
        } = attribute
        {
            constant = constant_literal(pool, *constant_value_index, &field.field_type)?;
        }
    }
    Ok(FieldDescriptor {
        name,
        type_name,
        modifiers: JavaModifierConverter::parse_field(field.access_flags),
        annotations: annotations_of(pool, &field.attributes)?,
        constant,
        enum_constant: field.access_flags.contains(FieldAccessFlags::ENUM),
        synthetic: field.access_flags.contains(FieldAccessFlags::SYNTHETIC)
            || has_synthetic_attribute(&field.attributes),
    })
}

fn read_method(
    pool: &ConstantPool,
    method: &ristretto_classfile::Method,
) -> FormatResult<MethodDescriptor> {
    let name = utf8(pool, method.name_index)?;
    let descriptor = utf8(pool, method.descriptor_index)?;
    let is_varargs = method.access_flags.contains(MethodAccessFlags::VARARGS);
    let (mut return_type, mut params) = JavaTypeConverter::convert_method(&descriptor, is_varargs)
        .map_err(|e| malformed(&format!("descriptor of {name}"), e))?;

    let mut type_params = None;
    let mut throws = Vec::new();
    let mut from_signature = false;
    if let Some(signature) = signature_of(pool, &method.attributes)? {
        match parse_method_signature(&signature) {
            Ok(parsed) => {
                type_params = parsed.type_params;
                return_type = parsed.return_type;
                params = parsed.params;
                if is_varargs {
                    if let Some(last) = params.pop() {
                        params.push(varargs(last));
                    }
                }
                throws = parsed.throws;
                from_signature = true;
            }
            Err(e) => tracing::debug!("Ignoring signature of method {}: {}", name, e),
        }
    }
    if throws.is_empty() {
        for attribute in &method.attributes {
            if let Attribute::Exceptions {
                exception_indexes, ..
            } = attribute
            {
                for index in exception_indexes {
                    throws.push(source_name(&class_name(pool, *index)?));
                }
            }
        }
    }

    let flags = method.access_flags;
    Ok(MethodDescriptor {
        name,
        type_params,
        return_type,
        params,
        varargs: is_varargs,
        throws,
        modifiers: JavaModifierConverter::parse_method(flags),
        annotations: annotations_of(pool, &method.attributes)?,
        synthetic: flags.contains(MethodAccessFlags::SYNTHETIC)
            || flags.contains(MethodAccessFlags::BRIDGE)
            || has_synthetic_attribute(&method.attributes),
        from_signature,
    })
}

/// Source literal for a `ConstantValue`. Non-finite floating values have
/// no literal form and are dropped.
fn constant_literal(
    pool: &ConstantPool,
    index: u16,
    field_type: &FieldType,
) -> FormatResult<Option<String>> {
    use ristretto_classfile::BaseType;

    let literal = match (pool.get(index), field_type) {
        (Some(Constant::Integer(v)), FieldType::Base(BaseType::Boolean)) => {
            Some(if *v == 0 { "false" } else { "true" }.to_string())
        }
        (Some(Constant::Integer(v)), FieldType::Base(BaseType::Char)) => {
            Some(char_literal(*v as u32))
        }
        (Some(Constant::Integer(v)), _) => Some(v.to_string()),
        (Some(Constant::Long(v)), _) => Some(format!("{v}L")),
        (Some(Constant::Float(v)), _) => v.is_finite().then(|| format!("{v:?}f")),
        (Some(Constant::Double(v)), _) => v.is_finite().then(|| format!("{v:?}")),
        (Some(Constant::String(utf8_index)), _) => {
            Some(string_literal(&utf8(pool, *utf8_index)?))
        }
        (other, _) => {
            return Err(FormatError::Malformed(format!(
                "unexpected constant value at #{index}: {other:?}"
            )));
        }
    };
    Ok(literal)
}

fn char_literal(code: u32) -> String {
    match char::from_u32(code) {
        Some('\'') => "'\\''".to_string(),
        Some('\\') => "'\\\\'".to_string(),
        Some(c) if c.is_ascii_graphic() || c == ' ' => format!("'{c}'"),
        _ => format!("'\\u{code:04x}'"),
    }
}

pub(crate) fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals_escape() {
        assert_eq!(string_literal("a\"b\\\n"), "\"a\\\"b\\\\\\n\"");
        assert_eq!(char_literal('x' as u32), "'x'");
        assert_eq!(char_literal(0), "'\\u0000'");
        assert_eq!(char_literal('\'' as u32), "'\\''");
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            read_class(&[0xCA, 0xFE, 0x00]),
            Err(FormatError::Malformed(_))
        ));
    }
}
