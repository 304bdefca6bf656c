use ristretto_classfile::{BaseType, ClassAccessFlags, FieldAccessFlags, FieldType, MethodAccessFlags};

/// Renders descriptor types the way they are written in source.
pub struct JavaTypeConverter;

impl JavaTypeConverter {
    /// Return type and parameter types of a raw method descriptor.
    pub fn convert_method(
        descriptor: &str,
        is_varargs: bool,
    ) -> Result<(String, Vec<String>), ristretto_classfile::Error> {
        let (params, ret) = FieldType::parse_method_descriptor(descriptor)?;
        let return_type = match ret {
            None => "void".to_string(),
            Some(field_type) => Self::convert_type(&field_type),
        };
        let last = params.len().saturating_sub(1);
        let parameters = params
            .iter()
            .enumerate()
            .map(|(i, field_type)| {
                let rendered = Self::convert_type(field_type);
                if is_varargs && i == last {
                    varargs(rendered)
                } else {
                    rendered
                }
            })
            .collect();
        Ok((return_type, parameters))
    }

    pub fn convert_type(ty: &FieldType) -> String {
        match ty {
            FieldType::Base(BaseType::Byte) => "byte".to_string(),
            FieldType::Base(BaseType::Char) => "char".to_string(),
            FieldType::Base(BaseType::Double) => "double".to_string(),
            FieldType::Base(BaseType::Float) => "float".to_string(),
            FieldType::Base(BaseType::Int) => "int".to_string(),
            FieldType::Base(BaseType::Long) => "long".to_string(),
            FieldType::Base(BaseType::Short) => "short".to_string(),
            FieldType::Base(BaseType::Boolean) => "boolean".to_string(),
            FieldType::Object(name) => source_name(name),
            FieldType::Array(component) => {
                let mut dimensions = 1usize;
                let mut current = component.as_ref();
                while let FieldType::Array(inner) = current {
                    dimensions += 1;
                    current = inner.as_ref();
                }
                format!("{}{}", Self::convert_type(current), "[]".repeat(dimensions))
            }
        }
    }
}

/// `a/b/Outer$Inner` as written in source: `a.b.Outer.Inner`.
pub fn source_name(internal: &str) -> String {
    internal.replace(['/', '$'], ".")
}

/// Last array dimension of a varargs parameter written as `...`.
pub fn varargs(rendered: String) -> String {
    match rendered.strip_suffix("[]") {
        Some(element) => format!("{element}..."),
        None => rendered,
    }
}

pub struct JavaModifierConverter;

impl JavaModifierConverter {
    pub fn parse_class(flags: ClassAccessFlags) -> Vec<String> {
        let mut mods = Vec::new();
        if flags.contains(ClassAccessFlags::PUBLIC) {
            mods.push("public".into());
        }
        let implicit_final = flags.contains(ClassAccessFlags::ENUM);
        if flags.contains(ClassAccessFlags::FINAL) && !implicit_final {
            mods.push("final".into());
        }
        if flags.contains(ClassAccessFlags::ABSTRACT) && !flags.contains(ClassAccessFlags::INTERFACE)
        {
            mods.push("abstract".into());
        }
        mods
    }

    /// Flags from an inner-class row, which carry the member modifiers the
    /// class header cannot express.
    pub fn parse_nested(bits: u16, is_type_interface: bool, is_enum: bool) -> Vec<String> {
        const PUBLIC: u16 = 0x0001;
        const PRIVATE: u16 = 0x0002;
        const PROTECTED: u16 = 0x0004;
        const STATIC: u16 = 0x0008;
        const FINAL: u16 = 0x0010;
        const ABSTRACT: u16 = 0x0400;

        let mut mods = Vec::new();
        if bits & PUBLIC != 0 {
            mods.push("public".into());
        }
        if bits & PRIVATE != 0 {
            mods.push("private".into());
        }
        if bits & PROTECTED != 0 {
            mods.push("protected".into());
        }
        if bits & STATIC != 0 && !is_type_interface && !is_enum {
            mods.push("static".into());
        }
        if bits & FINAL != 0 && !is_enum {
            mods.push("final".into());
        }
        if bits & ABSTRACT != 0 && !is_type_interface {
            mods.push("abstract".into());
        }
        mods
    }

    pub fn parse_field(flags: FieldAccessFlags) -> Vec<String> {
        FIELD_MODIFIERS
            .iter()
            .filter(|(flag, _)| flags.contains(*flag))
            .map(|(_, name)| name.to_string())
            .collect()
    }

    pub fn parse_method(flags: MethodAccessFlags) -> Vec<String> {
        METHOD_MODIFIERS
            .iter()
            .filter(|(flag, _)| flags.contains(*flag))
            .map(|(_, name)| name.to_string())
            .collect()
    }
}

// Source order of modifiers.
const FIELD_MODIFIERS: &[(FieldAccessFlags, &str)] = &[
    (FieldAccessFlags::PUBLIC, "public"),
    (FieldAccessFlags::PRIVATE, "private"),
    (FieldAccessFlags::PROTECTED, "protected"),
    (FieldAccessFlags::STATIC, "static"),
    (FieldAccessFlags::FINAL, "final"),
    (FieldAccessFlags::VOLATILE, "volatile"),
    (FieldAccessFlags::TRANSIENT, "transient"),
];

const METHOD_MODIFIERS: &[(MethodAccessFlags, &str)] = &[
    (MethodAccessFlags::PUBLIC, "public"),
    (MethodAccessFlags::PRIVATE, "private"),
    (MethodAccessFlags::PROTECTED, "protected"),
    (MethodAccessFlags::STATIC, "static"),
    (MethodAccessFlags::FINAL, "final"),
    (MethodAccessFlags::SYNCHRONIZED, "synchronized"),
    (MethodAccessFlags::NATIVE, "native"),
    (MethodAccessFlags::ABSTRACT, "abstract"),
    (MethodAccessFlags::STRICT, "strictfp"),
];
