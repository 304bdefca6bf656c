//! Minimal class-file writer for tests. Emits just enough structure for the
//! reader: constant pool, members, and the attributes skeletons look at.

use std::collections::HashMap;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_BRIDGE: u16 = 0x0040;
pub const ACC_VARARGS: u16 = 0x0080;
pub const ACC_NATIVE: u16 = 0x0100;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_SYNTHETIC: u16 = 0x1000;
pub const ACC_ANNOTATION: u16 = 0x2000;
pub const ACC_ENUM: u16 = 0x4000;

#[derive(Debug, Clone, Copy)]
pub enum ConstValue<'a> {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(&'a str),
}

#[derive(Debug, Clone, Copy)]
pub enum Attr<'a> {
    Signature(&'a str),
    Constant(ConstValue<'a>),
    /// Internal names of thrown classes.
    Exceptions(&'a [&'a str]),
    /// Descriptor of a runtime-visible annotation, e.g. `Ljava/lang/Deprecated;`.
    Annotation(&'a str),
    Synthetic,
}

#[derive(Debug)]
pub struct ClassFileWriter {
    pool: Vec<u8>,
    next_index: u16,
    utf8s: HashMap<String, u16>,
    classes: HashMap<String, u16>,
    access: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
    inner_rows: Vec<[u16; 4]>,
    attributes: Vec<Vec<u8>>,
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

impl ClassFileWriter {
    /// `name` is the internal name, e.g. `p/Outer$Inner`. The superclass
    /// starts out as `java/lang/Object`.
    pub fn new(name: &str, access: u16) -> Self {
        let mut writer = Self {
            pool: Vec::new(),
            next_index: 1,
            utf8s: HashMap::new(),
            classes: HashMap::new(),
            access,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            inner_rows: Vec::new(),
            attributes: Vec::new(),
        };
        writer.this_class = writer.class(name);
        writer.super_class = writer.class("java/lang/Object");
        writer
    }

    pub fn utf8(&mut self, value: &str) -> u16 {
        if let Some(index) = self.utf8s.get(value) {
            return *index;
        }
        let index = self.next_index;
        self.pool.push(1);
        put_u16(&mut self.pool, value.len() as u16);
        self.pool.extend_from_slice(value.as_bytes());
        self.next_index += 1;
        self.utf8s.insert(value.to_string(), index);
        index
    }

    pub fn class(&mut self, internal: &str) -> u16 {
        if let Some(index) = self.classes.get(internal) {
            return *index;
        }
        let name = self.utf8(internal);
        let index = self.next_index;
        self.pool.push(7);
        put_u16(&mut self.pool, name);
        self.next_index += 1;
        self.classes.insert(internal.to_string(), index);
        index
    }

    fn constant(&mut self, value: ConstValue<'_>) -> u16 {
        let index = self.next_index;
        match value {
            ConstValue::Int(v) => {
                self.pool.push(3);
                self.pool.extend_from_slice(&v.to_be_bytes());
                self.next_index += 1;
            }
            ConstValue::Float(v) => {
                self.pool.push(4);
                self.pool.extend_from_slice(&v.to_bits().to_be_bytes());
                self.next_index += 1;
            }
            ConstValue::Long(v) => {
                self.pool.push(5);
                self.pool.extend_from_slice(&v.to_be_bytes());
                self.next_index += 2;
            }
            ConstValue::Double(v) => {
                self.pool.push(6);
                self.pool.extend_from_slice(&v.to_bits().to_be_bytes());
                self.next_index += 2;
            }
            ConstValue::Str(s) => {
                let utf8 = self.utf8(s);
                let index = self.next_index;
                self.pool.push(8);
                put_u16(&mut self.pool, utf8);
                self.next_index += 1;
                return index;
            }
        }
        index
    }

    /// `None` leaves the class without a superclass, like `java.lang.Object`.
    pub fn super_class(mut self, internal: Option<&str>) -> Self {
        self.super_class = match internal {
            Some(name) => self.class(name),
            None => 0,
        };
        self
    }

    pub fn interface(mut self, internal: &str) -> Self {
        let index = self.class(internal);
        self.interfaces.push(index);
        self
    }

    pub fn attr(mut self, attr: Attr<'_>) -> Self {
        let encoded = self.encode_attr(attr);
        self.attributes.push(encoded);
        self
    }

    /// A row of the `InnerClasses` table, names given in internal form.
    pub fn inner_class(
        mut self,
        inner: &str,
        outer: Option<&str>,
        simple_name: Option<&str>,
        access: u16,
    ) -> Self {
        let row = [
            self.class(inner),
            outer.map(|o| self.class(o)).unwrap_or(0),
            simple_name.map(|n| self.utf8(n)).unwrap_or(0),
            access,
        ];
        self.inner_rows.push(row);
        self
    }

    pub fn field(mut self, access: u16, name: &str, descriptor: &str, attrs: &[Attr<'_>]) -> Self {
        let member = self.member(access, name, descriptor, attrs, false);
        self.fields.push(member);
        self
    }

    /// Non-abstract, non-native methods get a one-instruction `Code` body.
    pub fn method(mut self, access: u16, name: &str, descriptor: &str, attrs: &[Attr<'_>]) -> Self {
        let needs_code = access & (ACC_ABSTRACT | ACC_NATIVE) == 0;
        let member = self.member(access, name, descriptor, attrs, needs_code);
        self.methods.push(member);
        self
    }

    fn member(
        &mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        attrs: &[Attr<'_>],
        code: bool,
    ) -> Vec<u8> {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        let mut encoded: Vec<Vec<u8>> = attrs.iter().map(|a| self.encode_attr(*a)).collect();
        if code {
            let mut body = Vec::new();
            put_u16(&mut body, 1);
            put_u16(&mut body, 8);
            put_u32(&mut body, 1);
            body.push(0xB1);
            put_u16(&mut body, 0);
            put_u16(&mut body, 0);
            encoded.push(self.wrap("Code", body));
        }
        let mut out = Vec::new();
        put_u16(&mut out, access);
        put_u16(&mut out, name);
        put_u16(&mut out, descriptor);
        put_u16(&mut out, encoded.len() as u16);
        for attr in encoded {
            out.extend(attr);
        }
        out
    }

    fn wrap(&mut self, name: &str, body: Vec<u8>) -> Vec<u8> {
        let mut out = Vec::new();
        let name = self.utf8(name);
        put_u16(&mut out, name);
        put_u32(&mut out, body.len() as u32);
        out.extend(body);
        out
    }

    fn encode_attr(&mut self, attr: Attr<'_>) -> Vec<u8> {
        let mut body = Vec::new();
        let name = match attr {
            Attr::Signature(signature) => {
                let index = self.utf8(signature);
                put_u16(&mut body, index);
                "Signature"
            }
            Attr::Constant(value) => {
                let index = self.constant(value);
                put_u16(&mut body, index);
                "ConstantValue"
            }
            Attr::Exceptions(names) => {
                put_u16(&mut body, names.len() as u16);
                for name in names {
                    let index = self.class(name);
                    put_u16(&mut body, index);
                }
                "Exceptions"
            }
            Attr::Annotation(descriptor) => {
                let index = self.utf8(descriptor);
                put_u16(&mut body, 1);
                put_u16(&mut body, index);
                put_u16(&mut body, 0);
                "RuntimeVisibleAnnotations"
            }
            Attr::Synthetic => "Synthetic",
        };
        self.wrap(name, body)
    }

    pub fn finish(mut self) -> Vec<u8> {
        if !self.inner_rows.is_empty() {
            let mut body = Vec::new();
            put_u16(&mut body, self.inner_rows.len() as u16);
            for row in &self.inner_rows {
                for value in row {
                    put_u16(&mut body, *value);
                }
            }
            let encoded = self.wrap("InnerClasses", body);
            self.attributes.push(encoded);
        }

        let mut out = Vec::new();
        put_u32(&mut out, 0xCAFE_BABE);
        put_u16(&mut out, 0);
        put_u16(&mut out, 61);
        put_u16(&mut out, self.next_index);
        out.extend(&self.pool);
        put_u16(&mut out, self.access);
        put_u16(&mut out, self.this_class);
        put_u16(&mut out, self.super_class);
        put_u16(&mut out, self.interfaces.len() as u16);
        for index in &self.interfaces {
            put_u16(&mut out, *index);
        }
        for members in [&self.fields, &self.methods] {
            put_u16(&mut out, members.len() as u16);
            for member in members {
                out.extend(member);
            }
        }
        put_u16(&mut out, self.attributes.len() as u16);
        for attr in &self.attributes {
            out.extend(attr);
        }
        out
    }
}
